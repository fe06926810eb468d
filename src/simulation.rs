use crate::flock_state::{Agent, FlockState};
use crate::neighborhood::{BruteForceIndex, NeighborIndex, NeighborQuery};
use crate::placement::place_agents;
use crate::steering::{self, NeighborAggregate};
use crate::wander::{SeededWander, WanderSource};
use anyhow::Result;
use flocking_common::{FlockSnapshot, FlockingConfig, FlockingParams, NeighborIndexKind, Vec2, NEIGHBOR_HISTOGRAM_BINS};
use log::{debug, error, info, trace};
use rand::prelude::*;
use rayon::prelude::*;

/// Runs the flock one tick at a time.
pub struct FlockSimulation {
    /// Parameter set used by `step`. The host may change it between ticks.
    params: FlockingParams,
    /// Parameter set the last committed tick ran with.
    last_tick_params: Option<FlockingParams>,
    /// Double-buffered agent state.
    state: FlockState,
    /// Rebuilt from the committed positions at the start of every tick.
    index: NeighborIndex,
    /// Entropy for isolated agents.
    wander: Box<dyn WanderSource>,
    /// Run the per-agent pass on the rayon pool.
    parallel: bool,
    /// Number of completed ticks.
    tick: u64,
    /// Include raw positions in recorded snapshots.
    positions_in_snapshot: bool,
    recorded_snapshots: Vec<FlockSnapshot>,
}

impl FlockSimulation {
    /// Builds a simulation over a host-supplied population.
    /// Initial positions outside the world are wrapped into it; non-finite state is rejected.
    pub fn from_agents<W>(params: FlockingParams, agents: Vec<Agent>, wander: W) -> Result<Self>
    where
        W: WanderSource + 'static,
    {
        params.validate()?;
        if let Some(bad) = agents.iter().position(|a| !a.is_finite()) {
            anyhow::bail!("agent {} has a non-finite initial state: {:?}", bad, agents[bad]);
        }
        let agents: Vec<Agent> = agents
            .into_iter()
            .map(|a| Agent {
                position: steering::wrap_position(a.position, params.world_width, params.world_height),
                velocity: a.velocity,
            })
            .collect();

        Ok(Self {
            state: FlockState::new(&agents),
            params,
            last_tick_params: None,
            index: NeighborIndex::new(NeighborIndexKind::default()),
            wander: Box::new(wander),
            parallel: true,
            tick: 0,
            positions_in_snapshot: false,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Builds a simulation from configuration, placing the initial flock with a
    /// `StdRng` seeded from `initial_conditions.seed`.
    pub fn new(config: &FlockingConfig) -> Result<Self> {
        config.validate()?;
        let params = config.flocking_params();
        let seed = config.initial_conditions.seed;
        let mut rng = StdRng::seed_from_u64(seed);

        let agents = place_agents(
            &params,
            config.initial_conditions.placement,
            config.initial_conditions.population as usize,
            &mut rng,
        )?;
        info!(
            "Placed {} agents ({:?}) in a {}x{} world.",
            agents.len(),
            config.initial_conditions.placement,
            params.world_width,
            params.world_height
        );

        let sim = Self::from_agents(params, agents, SeededWander::new(seed)?)?
            .with_neighbor_index(config.engine.neighbor_index)
            .with_parallel(config.engine.parallel)
            .with_positions_in_snapshot(config.run.positions_in_snapshot);
        Ok(sim)
    }

    pub fn with_neighbor_index(mut self, kind: NeighborIndexKind) -> Self {
        self.index = NeighborIndex::new(kind);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_positions_in_snapshot(mut self, enabled: bool) -> Self {
        self.positions_in_snapshot = enabled;
        self
    }

    /// Advances the simulation by one tick using the stored parameter set.
    pub fn step(&mut self) -> Result<()> {
        let params = self.params.clone();
        self.step_with(&params)
    }

    /// Advances the simulation by one tick using `params` for this tick only.
    /// An invalid parameter set is rejected before any state changes.
    pub fn step_with(&mut self, params: &FlockingParams) -> Result<()> {
        params.validate()?;
        debug!("Tick {} | {}", self.tick, params);

        // --- 1. Index committed positions ---
        self.index.rebuild(&self.state.positions_in, params);

        // --- 2. Steer every agent from the committed state into the output buffers ---
        let positions_in = &self.state.positions_in;
        let velocities_in = &self.state.velocities_in;
        let index = &self.index;
        let wander = self.wander.as_ref();
        let tick = self.tick;

        let update = |idx: usize, (pos_out, vel_out): (&mut Vec2, &mut Vec2)| {
            let agent = Agent::new(positions_in[idx], velocities_in[idx]);
            let mut neighbors = NeighborAggregate::new(agent.position);
            index.for_each_neighbor(idx, positions_in, params.radius, |n| {
                neighbors.push(positions_in[n], velocities_in[n]);
                true
            });
            let next = steering::steer(agent, &neighbors, params, || wander.wander(idx, tick));
            *pos_out = next.position;
            *vel_out = next.velocity;
        };

        if self.parallel {
            self.state
                .positions_out
                .par_iter_mut()
                .zip(self.state.velocities_out.par_iter_mut())
                .enumerate()
                .for_each(|(idx, out)| update(idx, out));
        } else {
            self.state
                .positions_out
                .iter_mut()
                .zip(self.state.velocities_out.iter_mut())
                .enumerate()
                .for_each(|(idx, out)| update(idx, out));
        }

        // --- 3. Refuse to commit non-finite state ---
        if let Some(bad) = self.state.first_non_finite_output() {
            error!(
                "Agent {} became non-finite at tick {} (position {:?}, velocity {:?}).",
                bad, self.tick, self.state.positions_out[bad], self.state.velocities_out[bad]
            );
            anyhow::bail!("agent {} produced a non-finite state at tick {}", bad, self.tick);
        }

        // --- 4. Commit: output becomes input for the next tick ---
        self.state.swap_buffers();
        self.last_tick_params = Some(params.clone());
        self.tick += 1;
        trace!("Tick {} committed for {} agents.", self.tick, self.state.len());
        Ok(())
    }

    /// Parameters the committed state was produced with: those of the last tick,
    /// or the stored set before the first tick.
    fn observed_params(&self) -> &FlockingParams {
        self.last_tick_params.as_ref().unwrap_or(&self.params)
    }

    /// Neighbors of agent `idx` in the committed state, recomputed on every call.
    pub fn neighbors_of(&self, idx: usize) -> Vec<usize> {
        BruteForceIndex.neighbors(idx, &self.state.positions_in, self.observed_params().radius)
    }

    pub fn agent(&self, idx: usize) -> Option<Agent> {
        self.state.agent(idx)
    }

    pub fn agents(&self) -> impl Iterator<Item = Agent> + '_ {
        self.state.agents()
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.state.positions_in
    }

    pub fn velocities(&self) -> &[Vec2] {
        &self.state.velocities_in
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn params(&self) -> &FlockingParams {
        &self.params
    }

    /// Host access to the parameter set between ticks (e.g. live weight tuning).
    pub fn params_mut(&mut self) -> &mut FlockingParams {
        &mut self.params
    }

    pub fn neighbor_index_kind(&self) -> NeighborIndexKind {
        self.index.kind()
    }

    /// Neighbor count for every agent in the committed state.
    /// Uses its own index so observing never disturbs the one `step` maintains.
    fn neighbor_counts_parallel(&self) -> Vec<u32> {
        let params = self.observed_params();
        let positions = &self.state.positions_in;
        let mut index = NeighborIndex::new(self.index.kind());
        index.rebuild(positions, params);
        let index = &index;
        let radius = params.radius;

        (0..positions.len())
            .into_par_iter()
            .map(|idx| {
                let mut count = 0u32;
                index.for_each_neighbor(idx, positions, radius, |_| {
                    count += 1;
                    true
                });
                count
            })
            .collect()
    }

    /// Observes the committed state.
    pub fn snapshot(&self) -> FlockSnapshot {
        let neighbor_counts = self.neighbor_counts_parallel();
        let mut neighbor_count_histogram = vec![0u32; NEIGHBOR_HISTOGRAM_BINS];
        for &count in &neighbor_counts {
            let bin = (count as usize).min(NEIGHBOR_HISTOGRAM_BINS - 1);
            neighbor_count_histogram[bin] += 1;
        }
        let isolated_agents = neighbor_counts.iter().filter(|&&c| c == 0).count() as u32;

        let velocities = &self.state.velocities_in;
        let population = velocities.len();
        let (speed_sum, max_speed, heading_sum) = velocities.iter().fold(
            (0.0f32, 0.0f32, Vec2::zero()),
            |(sum, max, heading), v| {
                let speed = v.length();
                (sum + speed, max.max(speed), heading + v.normalize_or_zero())
            },
        );
        let (mean_speed, polarization) = if population > 0 {
            (speed_sum / population as f32, (heading_sum / population as f32).length())
        } else {
            (0.0, 0.0)
        };

        let positions = self.positions_in_snapshot.then(|| {
            self.state.positions_in.iter().map(|p| (p.x, p.y)).collect()
        });

        FlockSnapshot {
            tick: self.tick,
            population: population as u32,
            mean_speed,
            max_speed,
            polarization,
            isolated_agents,
            neighbor_count_histogram,
            positions,
        }
    }

    /// Takes a snapshot and keeps it in memory.
    pub fn record_snapshot(&mut self) -> &FlockSnapshot {
        let snapshot = self.snapshot();
        debug!(
            "Snapshot at tick {}: mean speed {:.3}, polarization {:.3}, {} isolated.",
            snapshot.tick, snapshot.mean_speed, snapshot.polarization, snapshot.isolated_agents
        );
        self.recorded_snapshots.push(snapshot);
        &self.recorded_snapshots[self.recorded_snapshots.len() - 1]
    }

    pub fn recorded_snapshots(&self) -> &[FlockSnapshot] {
        &self.recorded_snapshots
    }
}
