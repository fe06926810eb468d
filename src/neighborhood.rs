//! Neighbor discovery: which agents lie within the interaction radius of a query agent.
//!
//! Distances are flat Euclidean; an agent near one world edge does not see agents just
//! across the wrap boundary. The test is inclusive (`distance <= radius`) and never
//! reports the query agent itself.

use flocking_common::{FlockingParams, NeighborIndexKind, Vec2};
use rayon::prelude::*;

/// Upper bound on grid cells along one axis; larger worlds get cells wider than the radius.
const MAX_CELLS_PER_AXIS: u32 = 1024;

/// Cell budget per agent. A tiny radius over a sparse flock gets wider cells instead of
/// a mostly empty grid that every rebuild would have to sweep.
const CELLS_PER_AGENT: usize = 4;

/// Fraction of a cell added to the scan envelope so rounding at cell borders never drops a neighbor.
const ENVELOPE_SLACK: f32 = 1e-3;

/// A structure that answers radius queries over the current agent positions.
pub trait NeighborQuery {
    /// Re-indexes `positions`. Must be called whenever positions or the radius change.
    fn rebuild(&mut self, positions: &[Vec2], params: &FlockingParams);

    /// Calls `f` for each agent within `radius` of `positions[agent_idx]`, excluding the agent itself.
    /// `f` returns `false` to stop the search early.
    fn for_each_neighbor<F>(&self, agent_idx: usize, positions: &[Vec2], radius: f32, f: F)
    where
        F: FnMut(usize) -> bool;

    /// Collects the neighbor set of `agent_idx` in ascending index order.
    fn neighbors(&self, agent_idx: usize, positions: &[Vec2], radius: f32) -> Vec<usize> {
        let mut found = Vec::new();
        self.for_each_neighbor(agent_idx, positions, radius, |n| {
            found.push(n);
            true
        });
        found.sort_unstable();
        found
    }
}

#[inline(always)]
fn within(a: Vec2, b: Vec2, radius_sq: f32) -> bool {
    a.distance_squared(b) <= radius_sq
}

/// Scans every agent for every query. O(n) per query.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceIndex;

impl NeighborQuery for BruteForceIndex {
    fn rebuild(&mut self, _positions: &[Vec2], _params: &FlockingParams) {}

    fn for_each_neighbor<F>(&self, agent_idx: usize, positions: &[Vec2], radius: f32, mut f: F)
    where
        F: FnMut(usize) -> bool,
    {
        let Some(&pos) = positions.get(agent_idx) else { return };
        let radius_sq = radius * radius;
        for (other_idx, &other_pos) in positions.iter().enumerate() {
            if other_idx == agent_idx {
                continue;
            }
            if within(pos, other_pos, radius_sq) && !f(other_idx) {
                return;
            }
        }
    }
}

/// Uniform grid over the world rectangle, rebuilt with a counting sort every tick.
/// Cells are at least `radius` wide so a query touches a small block of cells, and the
/// total cell count stays within a small multiple of the population.
#[derive(Debug, Clone, Default)]
pub struct UniformGrid {
    cell_size: f32,
    inv_cell_size: f32,
    dim_x: u32,
    dim_y: u32,
    // Grid cell index for each agent
    agent_cells: Vec<u32>,
    // Number of agents in each grid cell
    cell_counts: Vec<u32>,
    // Start index in cell_agent_indices for each grid cell (prefix sum)
    cell_starts: Vec<u32>,
    // Agent indices sorted by grid cell
    cell_agent_indices: Vec<u32>,
    // Scatter cursors, refilled from cell_starts on every rebuild
    write_offsets: Vec<u32>,
}

impl UniformGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dims(&self) -> (u32, u32) {
        (self.dim_x, self.dim_y)
    }

    fn configure(&mut self, params: &FlockingParams, num_agents: usize) {
        let longest_side = params.world_width.max(params.world_height);
        let max_cells = (num_agents.max(1) * CELLS_PER_AGENT).min((MAX_CELLS_PER_AXIS * MAX_CELLS_PER_AXIS) as usize);
        let budget_cell_size = (params.world_width * params.world_height / max_cells as f32).sqrt();
        let cell_size = params
            .radius
            .max(longest_side / MAX_CELLS_PER_AXIS as f32)
            .max(budget_cell_size);
        let dim_x = ((params.world_width / cell_size).ceil() as u32).clamp(1, MAX_CELLS_PER_AXIS);
        let dim_y = ((params.world_height / cell_size).ceil() as u32).clamp(1, MAX_CELLS_PER_AXIS);
        if cell_size == self.cell_size && (dim_x, dim_y) == self.dims() && !self.cell_counts.is_empty() {
            return;
        }
        self.cell_size = cell_size;
        self.inv_cell_size = 1.0 / cell_size;
        self.dim_x = dim_x;
        self.dim_y = dim_y;
        let num_cells = (dim_x * dim_y) as usize;
        self.cell_counts = vec![0; num_cells];
        self.cell_starts = vec![0; num_cells];
        self.write_offsets = vec![0; num_cells];
        log::debug!(
            "Neighbor grid resized: {}x{} cells of {:.2} units.",
            self.dim_x,
            self.dim_y,
            cell_size
        );
    }

    /// Cell coordinate along one axis, clamped to the grid.
    #[inline(always)]
    fn axis_cell(&self, v: f32, dim: u32) -> u32 {
        let c = (v * self.inv_cell_size).floor();
        if c <= 0.0 {
            0
        } else {
            (c as u32).min(dim - 1)
        }
    }

    #[inline(always)]
    fn cell_idx(&self, pos: Vec2) -> u32 {
        self.axis_cell(pos.y, self.dim_y) * self.dim_x + self.axis_cell(pos.x, self.dim_x)
    }
}

impl NeighborQuery for UniformGrid {
    fn rebuild(&mut self, positions: &[Vec2], params: &FlockingParams) {
        let num_agents = positions.len();
        self.configure(params, num_agents);

        // Phase 1: assign a grid cell to each agent.
        let mut agent_cells = std::mem::take(&mut self.agent_cells);
        agent_cells.resize(num_agents, 0);
        {
            let grid = &*self;
            agent_cells
                .par_iter_mut()
                .zip(positions.par_iter())
                .for_each(|(cell_out, &pos)| *cell_out = grid.cell_idx(pos));
        }
        self.agent_cells = agent_cells;

        // Phase 2: count agents per cell.
        self.cell_counts.iter_mut().for_each(|c| *c = 0);
        for &cell in &self.agent_cells {
            self.cell_counts[cell as usize] += 1;
        }

        // Phase 3: prefix sum gives each cell's start offset.
        let mut total = 0;
        for (start, &count) in self.cell_starts.iter_mut().zip(self.cell_counts.iter()) {
            *start = total;
            total += count;
        }

        // Phase 4: scatter agent indices into their cell blocks.
        self.write_offsets.copy_from_slice(&self.cell_starts);
        self.cell_agent_indices.resize(num_agents, 0);
        for (agent_idx, &cell) in self.agent_cells.iter().enumerate() {
            let slot = &mut self.write_offsets[cell as usize];
            self.cell_agent_indices[*slot as usize] = agent_idx as u32;
            *slot += 1;
        }
    }

    fn for_each_neighbor<F>(&self, agent_idx: usize, positions: &[Vec2], radius: f32, mut f: F)
    where
        F: FnMut(usize) -> bool,
    {
        if self.cell_counts.is_empty() {
            return;
        }
        let Some(&pos) = positions.get(agent_idx) else { return };
        let radius_sq = radius * radius;
        let reach = radius + self.cell_size * ENVELOPE_SLACK;

        let min_x = self.axis_cell(pos.x - reach, self.dim_x);
        let max_x = self.axis_cell(pos.x + reach, self.dim_x);
        let min_y = self.axis_cell(pos.y - reach, self.dim_y);
        let max_y = self.axis_cell(pos.y + reach, self.dim_y);

        for grid_y in min_y..=max_y {
            for grid_x in min_x..=max_x {
                let cell = (grid_y * self.dim_x + grid_x) as usize;
                let start = self.cell_starts[cell] as usize;
                let end = start + self.cell_counts[cell] as usize;
                for &other in &self.cell_agent_indices[start..end] {
                    let other_idx = other as usize;
                    if other_idx == agent_idx {
                        continue;
                    }
                    match positions.get(other_idx) {
                        Some(&other_pos) => {
                            if within(pos, other_pos, radius_sq) && !f(other_idx) {
                                return;
                            }
                        }
                        None => {
                            log::error!(
                                "Neighbor index {} out of bounds during search for agent {}; grid is stale.",
                                other_idx,
                                agent_idx
                            );
                        }
                    }
                }
            }
        }
    }
}

/// The neighbor index selected by configuration.
#[derive(Debug, Clone)]
pub enum NeighborIndex {
    Grid(UniformGrid),
    BruteForce(BruteForceIndex),
}

impl NeighborIndex {
    pub fn new(kind: NeighborIndexKind) -> Self {
        match kind {
            NeighborIndexKind::Grid => NeighborIndex::Grid(UniformGrid::new()),
            NeighborIndexKind::BruteForce => NeighborIndex::BruteForce(BruteForceIndex),
        }
    }

    pub fn kind(&self) -> NeighborIndexKind {
        match self {
            NeighborIndex::Grid(_) => NeighborIndexKind::Grid,
            NeighborIndex::BruteForce(_) => NeighborIndexKind::BruteForce,
        }
    }
}

impl NeighborQuery for NeighborIndex {
    fn rebuild(&mut self, positions: &[Vec2], params: &FlockingParams) {
        match self {
            NeighborIndex::Grid(grid) => grid.rebuild(positions, params),
            NeighborIndex::BruteForce(brute) => brute.rebuild(positions, params),
        }
    }

    fn for_each_neighbor<F>(&self, agent_idx: usize, positions: &[Vec2], radius: f32, f: F)
    where
        F: FnMut(usize) -> bool,
    {
        match self {
            NeighborIndex::Grid(grid) => grid.for_each_neighbor(agent_idx, positions, radius, f),
            NeighborIndex::BruteForce(brute) => brute.for_each_neighbor(agent_idx, positions, radius, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn params(radius: f32) -> FlockingParams {
        FlockingParams { radius, world_width: 200.0, world_height: 120.0, ..Default::default() }
    }

    fn random_positions(n: usize, seed: u64) -> Vec<Vec2> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| Vec2::new(rng.random_range(0.0..200.0), rng.random_range(0.0..120.0)))
            .collect()
    }

    #[test]
    fn grid_matches_brute_force() {
        for (seed, radius) in [(1, 5.0), (2, 17.5), (3, 60.0), (4, 500.0)] {
            let positions = random_positions(300, seed);
            let p = params(radius);
            let mut grid = UniformGrid::new();
            grid.rebuild(&positions, &p);
            let brute = BruteForceIndex;
            for idx in 0..positions.len() {
                assert_eq!(
                    grid.neighbors(idx, &positions, radius),
                    brute.neighbors(idx, &positions, radius),
                    "agent {idx}, radius {radius}"
                );
            }
        }
    }

    #[test]
    fn boundary_distance_is_inclusive() {
        let positions = vec![Vec2::new(10.0, 10.0), Vec2::new(13.0, 14.0), Vec2::new(16.0, 10.0)];
        let mut grid = UniformGrid::new();
        grid.rebuild(&positions, &params(5.0));
        assert_eq!(grid.neighbors(0, &positions, 5.0), vec![1]);
        assert_eq!(BruteForceIndex.neighbors(0, &positions, 5.0), vec![1]);
    }

    #[test]
    fn never_reports_self_even_when_coincident() {
        let positions = vec![Vec2::new(50.0, 50.0); 4];
        let mut grid = UniformGrid::new();
        grid.rebuild(&positions, &params(1.0));
        for idx in 0..positions.len() {
            let found = grid.neighbors(idx, &positions, 1.0);
            assert_eq!(found.len(), 3);
            assert!(!found.contains(&idx));
        }
    }

    #[test]
    fn single_agent_has_no_neighbors() {
        let positions = vec![Vec2::new(1.0, 1.0)];
        let mut grid = UniformGrid::new();
        grid.rebuild(&positions, &params(1000.0));
        assert!(grid.neighbors(0, &positions, 1000.0).is_empty());
        assert!(BruteForceIndex.neighbors(0, &positions, 1000.0).is_empty());
    }

    #[test]
    fn early_stop_is_honored() {
        let positions = random_positions(50, 9);
        let mut grid = UniformGrid::new();
        grid.rebuild(&positions, &params(500.0));
        let mut visited = 0;
        grid.for_each_neighbor(0, &positions, 500.0, |_| {
            visited += 1;
            false
        });
        assert_eq!(visited, 1);
    }

    #[test]
    fn grid_cells_track_radius_changes() {
        let positions = random_positions(300, 5);
        let mut grid = UniformGrid::new();
        grid.rebuild(&positions, &params(10.0));
        assert_eq!(grid.dims(), (20, 12));
        grid.rebuild(&positions, &params(40.0));
        assert_eq!(grid.dims(), (5, 3));
    }

    #[test]
    fn tiny_radius_keeps_grid_proportional_to_population() {
        let mut positions = random_positions(50, 6);
        positions[1] = positions[0] + Vec2::new(0.005, 0.0);
        let radius = 0.01;
        let mut grid = UniformGrid::new();
        grid.rebuild(&positions, &params(radius));

        let (dim_x, dim_y) = grid.dims();
        assert!(dim_x * dim_y <= 50 * CELLS_PER_AGENT as u32 + dim_x + dim_y + 1, "{dim_x}x{dim_y}");
        assert_eq!(grid.neighbors(0, &positions, radius), vec![1]);
        for idx in 0..positions.len() {
            assert_eq!(
                grid.neighbors(idx, &positions, radius),
                BruteForceIndex.neighbors(idx, &positions, radius),
                "agent {idx}"
            );
        }

        // Growing the flock lets the grid refine again.
        let crowd = random_positions(3000, 7);
        grid.rebuild(&crowd, &params(radius));
        let (dense_x, dense_y) = grid.dims();
        assert!(dense_x * dense_y > dim_x * dim_y);
    }

    #[test]
    fn wrap_boundary_is_not_a_shortcut() {
        // Flat Euclidean metric: agents on opposite edges are far apart.
        let positions = vec![Vec2::new(0.5, 60.0), Vec2::new(199.5, 60.0)];
        let mut grid = UniformGrid::new();
        grid.rebuild(&positions, &params(5.0));
        assert!(grid.neighbors(0, &positions, 5.0).is_empty());
    }
}
