use glam::Vec3;
use labscene_common::{BodyId, MassClass, ShapeDescriptor};
use labscene_render::ProxyRenderer;
use labscene_sync::{ProxyMode, RandomSource, SpawnRequest};
use serde::{Deserialize, Serialize};

use crate::config::{MaterialPairConfig, SimConfig};
use crate::controller::ControllerConfig;
use crate::sim_loop::{LoopError, SimulationLoop};

/// Preset lab scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabScene {
    /// Floor, a ball, a small player box, a wall and invisible barriers.
    /// Bodies are added at runtime through spawn actions.
    Spawner,
    /// Floor and one large box pushed around with the arrow keys.
    Rolling,
}

impl LabScene {
    pub const ALL: [LabScene; 2] = [Self::Spawner, Self::Rolling];

    /// Stable lowercase name, used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Spawner => "spawner",
            Self::Rolling => "rolling",
        }
    }

    /// Configuration the scene was tuned for.
    pub fn default_config(&self) -> SimConfig {
        let controller = match self {
            Self::Spawner => ControllerConfig {
                force_magnitude: 100.0,
                velocity_damping: 0.95,
            },
            Self::Rolling => ControllerConfig {
                force_magnitude: 5.0,
                velocity_damping: 1.0,
            },
        };
        SimConfig {
            controller,
            materials: vec![MaterialPairConfig::new("default", "default", 0.1, 0.6)],
            ..SimConfig::default()
        }
    }

    /// Spawn the scene's bodies into `sim` and make the player controllable.
    /// Returns the player body.
    pub fn populate<R: ProxyRenderer>(
        &self,
        sim: &mut SimulationLoop<R>,
    ) -> Result<BodyId, LoopError> {
        let _span = tracing::info_span!("populate", scene = self.name()).entered();
        sim.spawn_body(SpawnRequest::new(
            ShapeDescriptor::Plane,
            Vec3::ZERO,
            MassClass::Static,
        ))?;

        let player = match self {
            Self::Spawner => {
                sim.spawn_body(SpawnRequest::new(
                    ShapeDescriptor::sphere(0.5),
                    Vec3::new(0.0, 3.0, 0.0),
                    MassClass::dynamic(1.0),
                ))?;
                let player = sim.spawn_body(SpawnRequest::new(
                    ShapeDescriptor::cube(0.5),
                    Vec3::new(0.0, 1.0, 0.0),
                    MassClass::dynamic(1.0),
                ))?;
                sim.spawn_body(
                    SpawnRequest::new(
                        ShapeDescriptor::cuboid(10.0, 10.0, 0.1),
                        Vec3::new(0.0, 0.0, 5.0),
                        MassClass::Static,
                    )
                    .with_proxy(ProxyMode::Auxiliary),
                )?;
                for (size, position) in [
                    (Vec3::new(10.0, 10.0, 0.1), Vec3::new(0.0, 0.0, -5.0)),
                    (Vec3::new(0.1, 10.0, 10.0), Vec3::new(5.0, 0.0, 0.0)),
                    (Vec3::new(0.1, 10.0, 10.0), Vec3::new(-5.0, 0.0, 0.0)),
                ] {
                    sim.spawn_body(
                        SpawnRequest::new(ShapeDescriptor::Box { size }, position, MassClass::Static)
                            .with_proxy(ProxyMode::CollisionOnly),
                    )?;
                }
                player
            }
            Self::Rolling => sim.spawn_body(SpawnRequest::new(
                ShapeDescriptor::cube(2.0),
                Vec3::new(0.0, 3.0, 0.0),
                MassClass::dynamic(1.0),
            ))?,
        };

        sim.set_player(player.body)?;
        tracing::info!(bodies = sim.world().body_count(), player = %player.body, "scene ready");
        Ok(player.body)
    }

    /// A loop over `config` with this scene's bodies in it, not yet started.
    pub fn build<R: ProxyRenderer>(
        &self,
        config: &SimConfig,
        renderer: R,
        rng: Box<dyn RandomSource>,
    ) -> Result<SimulationLoop<R>, LoopError> {
        let mut sim = SimulationLoop::new(config, renderer, rng);
        self.populate(&mut sim)?;
        Ok(sim)
    }
}

impl std::fmt::Display for LabScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
