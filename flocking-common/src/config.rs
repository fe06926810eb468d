use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::FlockingParams;
use std::path::Path;

// World rectangle; positions wrap toroidally inside [0, width) x [0, height).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig { width: 750.0, height: 750.0 }
    }
}

// Flocking rule parameters, loaded from the [flocking] table.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct FlockingSection {
    #[serde(default = "default_weight")]
    pub alignment_weight: f32,
    #[serde(default = "default_weight")]
    pub cohesion_weight: f32,
    #[serde(default = "default_weight")]
    pub separation_weight: f32,
    #[serde(default = "default_mass")]
    pub mass: f32,
    #[serde(default = "default_delta_time")]
    pub delta_time: f32,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_movement_speed")]
    pub movement_speed: f32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    #[default]
    Uniform,
    JitteredGrid,
}

// Initial population, placed by the host before the first tick.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InitialConditions {
    #[serde(default = "default_population")]
    pub population: u32,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for InitialConditions {
    fn default() -> Self {
        InitialConditions {
            population: default_population(),
            placement: Placement::default(),
            seed: default_seed(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NeighborIndexKind {
    #[default]
    Grid,
    BruteForce,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EngineConfig {
    #[serde(default)]
    pub neighbor_index: NeighborIndexKind,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { neighbor_index: NeighborIndexKind::default(), parallel: default_parallel() }
    }
}

// Host tick loop settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    #[serde(default = "default_ticks")]
    pub ticks: u32,
    #[serde(default = "default_record_interval")]
    pub record_interval: u32,
    #[serde(default)]
    pub positions_in_snapshot: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            ticks: default_ticks(),
            record_interval: default_record_interval(),
            positions_in_snapshot: false,
        }
    }
}

// Main configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct FlockingConfig {
    #[serde(default)]
    pub world: WorldConfig,
    pub flocking: FlockingSection,
    #[serde(default)]
    pub initial_conditions: InitialConditions,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl FlockingConfig {
    /// Loads the configuration from a TOML file and validates it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: FlockingConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.flocking_params().validate()?;
        if self.initial_conditions.population == 0 {
            anyhow::bail!("population must be greater than 0.");
        }
        if self.run.record_interval == 0 {
            anyhow::bail!("record_interval must be greater than 0.");
        }
        Ok(())
    }

    /// Converts the configuration into the runtime parameter set.
    pub fn flocking_params(&self) -> FlockingParams {
        let f = &self.flocking;
        FlockingParams {
            world_width: self.world.width,
            world_height: self.world.height,
            alignment_weight: f.alignment_weight,
            cohesion_weight: f.cohesion_weight,
            separation_weight: f.separation_weight,
            mass: f.mass,
            delta_time: f.delta_time,
            radius: f.radius,
            movement_speed: f.movement_speed,
        }
    }
}

fn default_weight() -> f32 {
    0.5
}

fn default_mass() -> f32 {
    20.0
}

fn default_delta_time() -> f32 {
    3.0
}

fn default_radius() -> f32 {
    50.0
}

fn default_movement_speed() -> f32 {
    2.0
}

fn default_population() -> u32 {
    50
}

fn default_seed() -> u64 {
    1
}

fn default_parallel() -> bool {
    true
}

fn default_ticks() -> u32 {
    1000
}

fn default_record_interval() -> u32 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = FlockingConfig::from_toml_str("[flocking]\n").unwrap();
        let params = config.flocking_params();
        assert_eq!(params, FlockingParams::default());
        assert_eq!(config.initial_conditions.population, 50);
        assert_eq!(config.initial_conditions.placement, Placement::Uniform);
        assert_eq!(config.engine.neighbor_index, NeighborIndexKind::Grid);
        assert!(config.engine.parallel);
    }

    #[test]
    fn full_config_parses() {
        let text = r#"
            [world]
            width = 400.0
            height = 300.0

            [flocking]
            alignment_weight = 1.0
            cohesion_weight = 0.0
            separation_weight = 2.5
            mass = 1.0
            delta_time = 1.0
            radius = 25.0
            movement_speed = 4.0

            [initial_conditions]
            population = 10
            placement = "jittered_grid"
            seed = 99

            [engine]
            neighbor_index = "brute_force"
            parallel = false

            [run]
            ticks = 20
            record_interval = 5
        "#;
        let config = FlockingConfig::from_toml_str(text).unwrap();
        let params = config.flocking_params();
        assert_eq!(params.world_width, 400.0);
        assert_eq!(params.separation_weight, 2.5);
        assert_eq!(config.initial_conditions.placement, Placement::JitteredGrid);
        assert_eq!(config.engine.neighbor_index, NeighborIndexKind::BruteForce);
        assert!(!config.engine.parallel);
        assert_eq!(config.run.record_interval, 5);
    }

    #[test]
    fn missing_flocking_table_is_rejected() {
        assert!(FlockingConfig::from_toml_str("[world]\nwidth = 10.0\nheight = 10.0\n").is_err());
    }

    #[test]
    fn invalid_radius_fails_fast() {
        let err = FlockingConfig::from_toml_str("[flocking]\nradius = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("radius"), "{err}");
    }

    #[test]
    fn zero_population_is_rejected() {
        let text = "[flocking]\n[initial_conditions]\npopulation = 0\n";
        assert!(FlockingConfig::from_toml_str(text).is_err());
    }
}
