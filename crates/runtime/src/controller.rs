use glam::Vec3;
use labscene_common::BodyId;
use labscene_input::{InputState, KeyBindings};
use labscene_kernel::World;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Newtons per active direction.
    pub force_magnitude: f32,
    /// Factor applied to horizontal velocity before every fixed step.
    pub velocity_damping: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            force_magnitude: 100.0,
            velocity_damping: 0.95,
        }
    }
}

/// Translates held movement keys into a force on the player body.
#[derive(Debug, Clone, Default)]
pub struct ForceController {
    config: ControllerConfig,
    bindings: KeyBindings,
    player: Option<BodyId>,
}

impl ForceController {
    /// Controller with the default key bindings and no player.
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replace the key bindings.
    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Force and damping settings.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Body pushed by the movement keys, if any.
    pub fn player(&self) -> Option<BodyId> {
        self.player
    }

    /// Choose the body to push, or none.
    pub fn set_player(&mut self, player: Option<BodyId>) {
        self.player = player;
    }

    /// Push the player according to the held keys and damp its horizontal
    /// velocity. Returns the applied force.
    ///
    /// Meant to run once ahead of every fixed step. The force goes through
    /// the world's force accumulator and acts on that step only. Vertical
    /// velocity is left alone.
    pub fn apply(&self, world: &mut World, input: &InputState) -> Vec3 {
        let Some(id) = self.player else {
            return Vec3::ZERO;
        };
        let Some(body) = world.body_mut(id) else {
            return Vec3::ZERO;
        };
        if body.is_static() {
            return Vec3::ZERO;
        }

        let force = self.bindings.movement_axis(input) * self.config.force_magnitude;
        if force != Vec3::ZERO {
            body.apply_force(force);
        }

        let damping = self.config.velocity_damping;
        let v = body.linear_velocity();
        body.set_linear_velocity(Vec3::new(v.x * damping, v.y, v.z * damping));
        force
    }
}
