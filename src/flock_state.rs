use flocking_common::Vec2;
use serde::{Deserialize, Serialize};

/// The kinematic state of one agent, as seen by the host.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Agent {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Agent { position, velocity }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// Holds the flock state vectors.
/// Every tick reads the `_in` buffers and writes the `_out` buffers, so no agent observes
/// another agent's already-updated state within the same tick.
#[derive(Debug)]
pub struct FlockState {
    // --- Ping-Pong Buffers ---
    // State at the end of the previous tick (current tick's input)
    pub positions_in: Vec<Vec2>,
    pub velocities_in: Vec<Vec2>,

    // Current tick's output, next tick's input after the swap
    pub positions_out: Vec<Vec2>,
    pub velocities_out: Vec<Vec2>,
}

impl FlockState {
    /// Creates a new FlockState from the initial population.
    pub fn new(agents: &[Agent]) -> Self {
        let num_agents = agents.len();
        Self {
            positions_in: agents.iter().map(|a| a.position).collect(),
            velocities_in: agents.iter().map(|a| a.velocity).collect(),
            positions_out: vec![Vec2::zero(); num_agents],
            velocities_out: vec![Vec2::zero(); num_agents],
        }
    }

    pub fn len(&self) -> usize {
        self.positions_in.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions_in.is_empty()
    }

    /// Committed state of agent `idx`.
    pub fn agent(&self, idx: usize) -> Option<Agent> {
        Some(Agent::new(*self.positions_in.get(idx)?, *self.velocities_in.get(idx)?))
    }

    pub fn agents(&self) -> impl Iterator<Item = Agent> + '_ {
        self.positions_in
            .iter()
            .zip(self.velocities_in.iter())
            .map(|(&position, &velocity)| Agent::new(position, velocity))
    }

    /// Index of the first agent in the output buffers with a non-finite component.
    pub fn first_non_finite_output(&self) -> Option<usize> {
        self.positions_out
            .iter()
            .zip(self.velocities_out.iter())
            .position(|(p, v)| !p.is_finite() || !v.is_finite())
    }

    /// Swaps the input and output buffers, committing the tick.
    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.positions_in, &mut self.positions_out);
        std::mem::swap(&mut self.velocities_in, &mut self.velocities_out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_commits_output() {
        let agents = [Agent::new(Vec2::new(1.0, 2.0), Vec2::new(0.5, 0.0))];
        let mut state = FlockState::new(&agents);
        state.positions_out[0] = Vec2::new(3.0, 4.0);
        state.velocities_out[0] = Vec2::new(0.0, 1.0);
        assert_eq!(state.agent(0), Some(agents[0]));
        state.swap_buffers();
        assert_eq!(state.agent(0), Some(Agent::new(Vec2::new(3.0, 4.0), Vec2::new(0.0, 1.0))));
        assert_eq!(state.agent(1), None);
    }

    #[test]
    fn detects_non_finite_output() {
        let mut state = FlockState::new(&[Agent::default(), Agent::default()]);
        assert_eq!(state.first_non_finite_output(), None);
        state.velocities_out[1] = Vec2::new(f32::NAN, 0.0);
        assert_eq!(state.first_non_finite_output(), Some(1));
    }
}
