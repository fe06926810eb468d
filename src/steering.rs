//! Per-agent steering: alignment, cohesion and separation blended into one force,
//! with a random wander fallback for isolated agents.
//!
//! Order of operations for one agent:
//! 1. force = (w_a * alignment + w_c * cohesion + w_s * separation) / mass,
//!    or a wander vector when the neighbor set is empty
//! 2. velocity += force, then clamped to `movement_speed`
//! 3. position += velocity * delta_time
//! 4. position wrapped into the world rectangle
//!
//! `delta_time` only scales the position step; the force is never multiplied by it.

use crate::flock_state::Agent;
use flocking_common::{FlockingParams, Vec2};

/// Running sums over one agent's neighbor set.
#[derive(Debug, Clone, Copy)]
pub struct NeighborAggregate {
    own_position: Vec2,
    count: u32,
    velocity_sum: Vec2,
    position_sum: Vec2,
    // Sum of (own position - neighbor position)
    offset_sum: Vec2,
}

impl NeighborAggregate {
    pub fn new(own_position: Vec2) -> Self {
        NeighborAggregate {
            own_position,
            count: 0,
            velocity_sum: Vec2::zero(),
            position_sum: Vec2::zero(),
            offset_sum: Vec2::zero(),
        }
    }

    #[inline]
    pub fn push(&mut self, position: Vec2, velocity: Vec2) {
        self.count += 1;
        self.velocity_sum += velocity;
        self.position_sum += position;
        self.offset_sum += self.own_position - position;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn mean_velocity(&self) -> Option<Vec2> {
        self.mean(self.velocity_sum)
    }

    pub fn mean_position(&self) -> Option<Vec2> {
        self.mean(self.position_sum)
    }

    pub fn mean_offset(&self) -> Option<Vec2> {
        self.mean(self.offset_sum)
    }

    fn mean(&self, sum: Vec2) -> Option<Vec2> {
        (!self.is_empty()).then(|| sum / self.count as f32)
    }
}

/// Steers toward the neighborhood's mean heading.
pub fn alignment(own_velocity: Vec2, mean_velocity: Vec2) -> Vec2 {
    mean_velocity - own_velocity
}

/// Steers toward the neighborhood centroid, net of the current velocity.
pub fn cohesion(own_position: Vec2, own_velocity: Vec2, mean_position: Vec2) -> Vec2 {
    (mean_position - own_position) - own_velocity
}

/// Steers away from crowding. `mean_offset` is the mean of (own - neighbor) positions;
/// it is not distance-weighted.
pub fn separation(mean_offset: Vec2) -> Vec2 {
    mean_offset
}

/// The weighted, mass-divided steering force, or `None` for an empty neighbor set.
pub fn combined_force(agent: Agent, neighbors: &NeighborAggregate, params: &FlockingParams) -> Option<Vec2> {
    let mean_velocity = neighbors.mean_velocity()?;
    let mean_position = neighbors.mean_position()?;
    let mean_offset = neighbors.mean_offset()?;

    let (w_align, w_cohesion, w_separation) = params.weights();
    let total = alignment(agent.velocity, mean_velocity) * w_align
        + cohesion(agent.position, agent.velocity, mean_position) * w_cohesion
        + separation(mean_offset) * w_separation;
    Some(total / params.mass)
}

/// Caps the velocity magnitude at `movement_speed`; zero velocity is left untouched.
#[inline]
pub fn clamp_velocity(velocity: Vec2, movement_speed: f32) -> Vec2 {
    velocity.clamp_length_max(movement_speed)
}

#[inline]
pub fn integrate(position: Vec2, velocity: Vec2, delta_time: f32) -> Vec2 {
    position + velocity * delta_time
}

/// Wraps one coordinate into `[0, extent)`.
#[inline]
fn wrap_axis(v: f32, extent: f32) -> f32 {
    let wrapped = v.rem_euclid(extent);
    // rem_euclid of a tiny negative value can round up to `extent` itself.
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}

/// Toroidal wrap into `[0, width) x [0, height)`.
pub fn wrap_position(position: Vec2, width: f32, height: f32) -> Vec2 {
    Vec2::new(wrap_axis(position.x, width), wrap_axis(position.y, height))
}

/// Computes an agent's state for the next tick.
/// `wander` is only called when the neighbor set is empty.
pub fn steer<W>(agent: Agent, neighbors: &NeighborAggregate, params: &FlockingParams, wander: W) -> Agent
where
    W: FnOnce() -> Vec2,
{
    let force = combined_force(agent, neighbors, params).unwrap_or_else(wander);
    let velocity = clamp_velocity(agent.velocity + force, params.movement_speed);
    let position = wrap_position(
        integrate(agent.position, velocity, params.delta_time),
        params.world_width,
        params.world_height,
    );

    debug_assert!(
        velocity.is_finite() && position.is_finite(),
        "non-finite steering result for {:?} with {:?}",
        agent,
        params
    );
    Agent { position, velocity }
}
