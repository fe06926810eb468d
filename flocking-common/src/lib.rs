pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{FlockingConfig, WorldConfig, FlockingSection, InitialConditions, EngineConfig, RunConfig, Placement, NeighborIndexKind};
pub use sim_params::{FlockingParams, WeightSelection};
pub use snapshot::{FlockSnapshot, NEIGHBOR_HISTOGRAM_BINS};
pub use vecmath::{Vec2, angle_to_vec};
