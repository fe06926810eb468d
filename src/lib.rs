//! Headless flocking ("boids") engine.
//!
//! Each tick, every agent gathers the agents within its interaction radius
//! and blends alignment, cohesion and separation into one steering force;
//! agents with no neighbors wander. All agents read the state committed at
//! the end of the previous tick, so results do not depend on update order.

pub mod flock_state;
pub mod neighborhood;
pub mod placement;
pub mod simulation;
pub mod steering;
pub mod wander;

pub use flock_state::Agent;
pub use neighborhood::{BruteForceIndex, NeighborIndex, NeighborQuery, UniformGrid};
pub use simulation::FlockSimulation;
pub use wander::{SeededWander, WanderSource};

pub use flocking_common::{FlockSnapshot, FlockingConfig, FlockingParams, NeighborIndexKind, Vec2, WeightSelection};
