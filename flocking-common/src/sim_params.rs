use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which flocking weight a live-tuning adjustment applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightSelection {
    #[default]
    Alignment,
    Cohesion,
    Separation,
}

/// Simulation parameters read every tick by the steering pass.
/// The host may mutate these between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlockingParams {
    // World
    pub world_width: f32,
    pub world_height: f32,

    // Rule weights (free reals, not normalized)
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    pub separation_weight: f32,

    // Dynamics
    pub mass: f32,       // Divisor applied to the combined steering force
    pub delta_time: f32, // Position integration step scale
    pub radius: f32,     // Neighbor interaction distance (inclusive)
    pub movement_speed: f32, // Hard cap on velocity magnitude
}

impl Default for FlockingParams {
    fn default() -> Self {
        FlockingParams {
            world_width: 750.0,
            world_height: 750.0,
            alignment_weight: 0.5,
            cohesion_weight: 0.5,
            separation_weight: 0.5,
            mass: 20.0,
            delta_time: 3.0,
            radius: 50.0,
            movement_speed: 2.0,
        }
    }
}

impl FlockingParams {
    /// Rejects parameter sets the steering pass cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.radius > 0.0) || !self.radius.is_finite() {
            anyhow::bail!("radius must be a finite positive number (got {}).", self.radius);
        }
        if !(self.mass > 0.0) || !self.mass.is_finite() {
            anyhow::bail!("mass must be a finite positive number (got {}).", self.mass);
        }
        if !(self.movement_speed >= 0.0) || !self.movement_speed.is_finite() {
            anyhow::bail!("movement_speed must be finite and non-negative (got {}).", self.movement_speed);
        }
        if !self.delta_time.is_finite() {
            anyhow::bail!("delta_time must be finite (got {}).", self.delta_time);
        }
        if !(self.world_width > 0.0) || !self.world_width.is_finite() {
            anyhow::bail!("world width must be a finite positive number (got {}).", self.world_width);
        }
        if !(self.world_height > 0.0) || !self.world_height.is_finite() {
            anyhow::bail!("world height must be a finite positive number (got {}).", self.world_height);
        }
        let (a, c, s) = self.weights();
        if !(a.is_finite() && c.is_finite() && s.is_finite()) {
            anyhow::bail!("flocking weights must be finite (got {}).", self);
        }
        Ok(())
    }

    /// The three rule weights in (alignment, cohesion, separation) order.
    pub fn weights(&self) -> (f32, f32, f32) {
        (self.alignment_weight, self.cohesion_weight, self.separation_weight)
    }

    /// Adds `by` to the selected weight. No clamping is applied.
    pub fn adjust_weight(&mut self, selection: WeightSelection, by: f32) {
        match selection {
            WeightSelection::Alignment => self.alignment_weight += by,
            WeightSelection::Cohesion => self.cohesion_weight += by,
            WeightSelection::Separation => self.separation_weight += by,
        }
    }
}

impl fmt::Display for FlockingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, c, s) = self.weights();
        write!(f, "A: {:.1} - C: {:.1} - S: {:.1}", a, c, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(FlockingParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_radius() {
        let params = FlockingParams { radius: 0.0, ..Default::default() };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("radius"), "{err}");
    }

    #[test]
    fn rejects_non_positive_mass() {
        let params = FlockingParams { mass: -1.0, ..Default::default() };
        assert!(params.validate().unwrap_err().to_string().contains("mass"));
    }

    #[test]
    fn zero_movement_speed_is_allowed() {
        let params = FlockingParams { movement_speed: 0.0, ..Default::default() };
        assert!(params.validate().is_ok());
        let params = FlockingParams { movement_speed: -0.1, ..Default::default() };
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_nan_weights() {
        let params = FlockingParams { cohesion_weight: f32::NAN, ..Default::default() };
        assert!(params.validate().is_err());
    }

    #[test]
    fn adjust_weight_targets_selection_only() {
        let mut params = FlockingParams::default();
        params.adjust_weight(WeightSelection::Cohesion, 0.1);
        params.adjust_weight(WeightSelection::Separation, -1.0);
        let (a, c, s) = params.weights();
        assert_eq!(a, 0.5);
        assert!((c - 0.6).abs() < 1e-6);
        assert_eq!(s, -0.5);
    }

    #[test]
    fn display_matches_tuning_line() {
        let mut params = FlockingParams::default();
        params.adjust_weight(WeightSelection::Alignment, 0.26);
        assert_eq!(params.to_string(), "A: 0.8 - C: 0.5 - S: 0.5");
    }
}
