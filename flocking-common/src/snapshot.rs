use serde::{Serialize, Deserialize};

/// Number of bins in `FlockSnapshot::neighbor_count_histogram`; the last bin saturates.
pub const NEIGHBOR_HISTOGRAM_BINS: usize = 32;

/// An observation of the flock at the end of a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlockSnapshot {
    /// Number of ticks completed when the snapshot was taken.
    pub tick: u64,
    /// The number of agents in the flock.
    pub population: u32,
    /// Mean velocity magnitude over all agents.
    pub mean_speed: f32,
    /// Largest velocity magnitude in the flock.
    pub max_speed: f32,
    /// Length of the mean unit heading, in [0, 1]. 1 means every agent points the same way.
    pub polarization: f32,
    /// Agents with no neighbor within the interaction radius.
    pub isolated_agents: u32,
    /// `neighbor_count_histogram[n]` counts agents with exactly `n` neighbors.
    pub neighbor_count_histogram: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")] // Don't write "positions": null
    pub positions: Option<Vec<(f32, f32)>>,
}
