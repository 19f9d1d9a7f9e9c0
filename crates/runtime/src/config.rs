use std::path::Path;

use labscene_common::MaterialTag;
use labscene_kernel::{World, WorldConfig};
use labscene_sync::SpawnBounds;
use serde::{Deserialize, Serialize};

use crate::controller::ControllerConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Fixed-step timing of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Seconds of simulated time per fixed step.
    pub fixed_delta: f32,
    /// Upper bound on fixed steps per tick.
    pub max_sub_steps: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fixed_delta: 1.0 / 60.0,
            max_sub_steps: 3,
        }
    }
}

/// A contact material registered for a pair of tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialPairConfig {
    pub a: MaterialTag,
    pub b: MaterialTag,
    #[serde(default)]
    pub friction: f32,
    #[serde(default)]
    pub restitution: f32,
}

impl MaterialPairConfig {
    /// Pair entry for tags `a` and `b`.
    pub fn new(a: &str, b: &str, friction: f32, restitution: f32) -> Self {
        Self {
            a: MaterialTag::new(a),
            b: MaterialTag::new(b),
            friction,
            restitution,
        }
    }
}

/// Everything a simulation run can be tuned with.
///
/// Every section is optional in YAML; missing fields take their defaults.
///
/// ```yaml
/// world:
///   gravity: [0.0, -9.82, 0.0]
///   solver: { iterations: 10 }
/// timing: { fixed_delta: 0.0166667, max_sub_steps: 3 }
/// controller: { force_magnitude: 100.0, velocity_damping: 0.95 }
/// materials:
///   - { a: default, b: default, friction: 0.1, restitution: 0.6 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub timing: TimingConfig,
    pub controller: ControllerConfig,
    pub spawn: SpawnBounds,
    pub materials: Vec<MaterialPairConfig>,
}

impl SimConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded simulation config");
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject settings the loop cannot run with. Material coefficients are
    /// not checked here; the world clamps them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !self.world.gravity.is_finite() {
            return invalid(format!("gravity must be finite, got {}", self.world.gravity));
        }
        if self.world.solver.iterations == 0 {
            return invalid("solver.iterations must be at least 1".into());
        }
        let dt = self.timing.fixed_delta;
        if !(dt.is_finite() && dt > 0.0) {
            return invalid(format!("timing.fixed_delta must be positive, got {dt}"));
        }
        if self.timing.max_sub_steps == 0 {
            return invalid("timing.max_sub_steps must be at least 1".into());
        }
        let force = self.controller.force_magnitude;
        if !(force.is_finite() && force >= 0.0) {
            return invalid(format!(
                "controller.force_magnitude must be non-negative, got {force}"
            ));
        }
        let damping = self.controller.velocity_damping;
        if !(0.0..=1.0).contains(&damping) {
            return invalid(format!(
                "controller.velocity_damping must lie in [0, 1], got {damping}"
            ));
        }
        self.spawn.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }

    /// A world with this configuration's gravity, solver and material pairs.
    pub fn build_world(&self) -> World {
        let mut world = World::new(self.world);
        for pair in &self.materials {
            world.register_contact_material(&pair.a, &pair.b, pair.friction, pair.restitution);
        }
        world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn empty_document_gives_defaults() {
        let config = SimConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, SimConfig::default());
        assert_eq!(config.timing.max_sub_steps, 3);
        assert_eq!(config.controller.force_magnitude, 100.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = "
world:
  gravity: [0.0, -1.0, 0.0]
timing:
  max_sub_steps: 5
controller:
  force_magnitude: 5.0
materials:
  - { a: default, b: ice, friction: 0.02, restitution: 0.1 }
";
        let config = SimConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.world.gravity, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(config.world.solver.iterations, 10);
        assert_eq!(config.timing.max_sub_steps, 5);
        assert!((config.timing.fixed_delta - 1.0 / 60.0).abs() < 1e-9);
        assert_eq!(config.controller.velocity_damping, 0.95);
        assert_eq!(config.materials.len(), 1);
        assert_eq!(config.materials[0].b, MaterialTag::new("ice"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for yaml in [
            "timing: { fixed_delta: 0.0 }",
            "timing: { max_sub_steps: 0 }",
            "controller: { velocity_damping: 1.5 }",
            "controller: { force_magnitude: -1.0 }",
            "world: { solver: { iterations: 0 } }",
            "spawn: { min_size: 0.0 }",
        ] {
            assert!(
                matches!(SimConfig::from_yaml_str(yaml), Err(ConfigError::Invalid(_))),
                "{yaml}"
            );
        }
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(matches!(
            SimConfig::from_yaml_str("timing: [1, 2"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            SimConfig::load("/nonexistent/labscene.yaml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn build_world_registers_material_pairs() {
        let mut config = SimConfig::default();
        config
            .materials
            .push(MaterialPairConfig::new("default", "default", 0.1, 0.6));
        let world = config.build_world();
        let tag = MaterialTag::default();
        let m = world.contact_material(&tag, &tag);
        assert!((m.friction - 0.1).abs() < 1e-6);
        assert!((m.restitution - 0.6).abs() < 1e-6);
    }

    #[test]
    fn yaml_round_trip_preserves_config() {
        let config = SimConfig::default();
        let text = config.to_yaml_string().unwrap();
        assert_eq!(SimConfig::from_yaml_str(&text).unwrap(), config);
    }
}
