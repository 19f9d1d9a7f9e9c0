use glam::Vec3;
use labscene_common::{BodyId, MaterialTag};
use serde::{Deserialize, Serialize};

use crate::body::{BodyDesc, RigidBody};
use crate::contact::{self, Contact};
use crate::material::{ContactMaterial, ContactMaterialTable};
use crate::solver::{self, SolverConfig, VelocityState};

/// World construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: Vec3,
    pub solver: SolverConfig,
    /// Contact material used for any pair that was never registered.
    pub default_contact: ContactMaterial,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.82, 0.0),
            solver: SolverConfig::default(),
            default_contact: ContactMaterial::FRICTIONLESS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("fixed time step must be finite and positive, got {0}")]
    InvalidTimeStep(f32),
}

/// Record of a structural change or step, kept for inspection and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    BodyAdded { id: BodyId, mass: f32 },
    BodyRemoved { id: BodyId },
    Stepped { tick: u64 },
}

/// The authoritative simulation state.
///
/// Owns every rigid body. Bodies are kept in insertion order (ids are
/// sequential), which fixes the order of collision detection and solving and
/// makes runs reproducible.
#[derive(Debug, Clone)]
pub struct World {
    config: WorldConfig,
    materials: ContactMaterialTable,
    bodies: Vec<RigidBody>,
    next_id: u64,
    tick: u64,
    time: f64,
    accumulator: f32,
    contacts: Vec<Contact>,
    event_log: Vec<WorldEvent>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl World {
    /// Create an empty world at tick 0.
    pub fn new(config: WorldConfig) -> Self {
        Self {
            materials: ContactMaterialTable::new(config.default_contact),
            config,
            bodies: Vec::new(),
            next_id: 1,
            tick: 0,
            time: 0.0,
            accumulator: 0.0,
            contacts: Vec::new(),
            event_log: Vec::new(),
        }
    }

    /// Parameters the world was built with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Constant acceleration applied to every dynamic body.
    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    /// Number of fixed steps taken so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Elapsed time not yet consumed by a fixed step.
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Registered contact materials.
    pub fn materials(&self) -> &ContactMaterialTable {
        &self.materials
    }

    /// Register the contact material for a pair of tags. Out-of-range
    /// coefficients are clamped to `[0, 1]`.
    pub fn register_contact_material(
        &mut self,
        a: &MaterialTag,
        b: &MaterialTag,
        friction: f32,
        restitution: f32,
    ) -> ContactMaterial {
        self.materials.register(a, b, friction, restitution)
    }

    /// Replace the material used for pairs that were never registered.
    pub fn set_default_contact_material(&mut self, material: ContactMaterial) {
        self.config.default_contact = material.clamped();
        self.materials.set_default(material);
    }

    /// Material that governs contacts between two tags.
    pub fn contact_material(&self, a: &MaterialTag, b: &MaterialTag) -> ContactMaterial {
        self.materials.lookup(a.as_str(), b.as_str())
    }

    /// Add a body. Never fails; an unregistered material uses the default pair.
    pub fn add_body(&mut self, desc: BodyDesc) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        let body = RigidBody::new(id, desc);
        tracing::debug!(%id, mass = body.mass(), material = %body.material(), "body added");
        self.event_log.push(WorldEvent::BodyAdded {
            id,
            mass: body.mass(),
        });
        self.bodies.push(body);
        id
    }

    /// Take back the body returned by the latest [`add_body`](Self::add_body)
    /// as if it had never been added: no event is logged and its id is
    /// handed out again. Returns false if `id` is not the latest body.
    pub fn undo_add_body(&mut self, id: BodyId) -> bool {
        if id.0 + 1 != self.next_id || self.bodies.last().map(|b| b.id()) != Some(id) {
            return false;
        }
        self.bodies.pop();
        if let Some(i) = self
            .event_log
            .iter()
            .rposition(|e| matches!(e, WorldEvent::BodyAdded { id: added, .. } if *added == id))
        {
            self.event_log.remove(i);
        }
        self.next_id = id.0;
        tracing::debug!(%id, "body add undone");
        true
    }

    /// Drop every body and pending time. Registered materials are kept.
    pub fn clear(&mut self) {
        for body in self.bodies.drain(..) {
            self.event_log.push(WorldEvent::BodyRemoved { id: body.id() });
        }
        self.accumulator = 0.0;
        self.contacts.clear();
    }

    fn index_of(&self, id: BodyId) -> Option<usize> {
        self.bodies.binary_search_by_key(&id, |b| b.id()).ok()
    }

    /// Whether `id` names a body in the world.
    pub fn contains(&self, id: BodyId) -> bool {
        self.index_of(id).is_some()
    }

    /// Get a reference to a body.
    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.index_of(id).map(|i| &self.bodies[i])
    }

    /// Get a mutable reference to a body.
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.index_of(id).map(move |i| &mut self.bodies[i])
    }

    /// All bodies in insertion order.
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    /// Number of bodies in the world.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of bodies with positive mass.
    pub fn dynamic_body_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_dynamic()).count()
    }

    /// Add a force at the body's centre of mass for the next fixed step.
    /// Returns false for unknown ids.
    pub fn apply_force(&mut self, id: BodyId, force: Vec3) -> bool {
        match self.body_mut(id) {
            Some(body) => {
                body.apply_force(force);
                true
            }
            None => false,
        }
    }

    /// Discard forces that no fixed step has consumed yet.
    pub fn clear_forces(&mut self) {
        for body in &mut self.bodies {
            body.clear_forces();
        }
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Advance by whole fixed steps covering `elapsed_delta` of real time.
    ///
    /// Elapsed time accumulates across calls. At most `max_sub_steps` fixed
    /// steps run per call; any backlog beyond that is dropped rather than
    /// carried into the next call. Returns the number of steps taken.
    pub fn step(
        &mut self,
        fixed_delta: f32,
        elapsed_delta: f32,
        max_sub_steps: u32,
    ) -> Result<u32, WorldError> {
        self.step_with(fixed_delta, elapsed_delta, max_sub_steps, |_| {})
    }

    /// [`step`](Self::step), calling `before_step` ahead of every fixed step.
    ///
    /// Forces applied from the hook act on the step that follows it.
    pub fn step_with(
        &mut self,
        fixed_delta: f32,
        elapsed_delta: f32,
        max_sub_steps: u32,
        mut before_step: impl FnMut(&mut World),
    ) -> Result<u32, WorldError> {
        check_time_step(fixed_delta)?;
        if elapsed_delta.is_finite() && elapsed_delta > 0.0 {
            self.accumulator += elapsed_delta;
        }

        let mut steps = 0;
        while self.accumulator >= fixed_delta && steps < max_sub_steps {
            before_step(self);
            self.internal_step(fixed_delta);
            self.accumulator -= fixed_delta;
            steps += 1;
        }
        if self.accumulator >= fixed_delta {
            tracing::debug!(
                backlog = self.accumulator,
                max_sub_steps,
                "simulation fell behind, dropping backlog"
            );
        }
        self.accumulator %= fixed_delta;
        Ok(steps)
    }

    /// Run exactly one fixed step, bypassing the accumulator.
    pub fn step_fixed(&mut self, fixed_delta: f32) -> Result<(), WorldError> {
        check_time_step(fixed_delta)?;
        self.internal_step(fixed_delta);
        Ok(())
    }

    fn internal_step(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        for body in self.bodies.iter_mut().filter(|b| b.is_dynamic()) {
            body.linear_velocity += (gravity + body.force * body.inverse_mass()) * dt;
        }

        self.contacts.clear();
        for i in 0..self.bodies.len() {
            for j in (i + 1)..self.bodies.len() {
                contact::collide(i, &self.bodies[i], j, &self.bodies[j], &mut self.contacts);
            }
        }

        if !self.contacts.is_empty() {
            let mut states: Vec<VelocityState> =
                self.bodies.iter().map(VelocityState::from_body).collect();
            solver::solve_contacts(
                &self.contacts,
                &self.bodies,
                &mut states,
                &self.materials,
                &self.config.solver,
                dt,
            );
            for (body, state) in self.bodies.iter_mut().zip(&states) {
                if body.is_dynamic() {
                    body.linear_velocity = state.v;
                    body.angular_velocity = state.w;
                }
            }
        }

        for body in &mut self.bodies {
            if body.is_dynamic() {
                body.integrate(dt);
            }
            body.clear_forces();
        }

        self.tick += 1;
        self.time += f64::from(dt);
        tracing::trace!(tick = self.tick, contacts = self.contacts.len(), "fixed step");
        self.event_log.push(WorldEvent::Stepped { tick: self.tick });
    }

    /// Deterministic hash of tick and body state, for comparing runs.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        for body in &self.bodies {
            mix(&mut h, &body.id().0.to_le_bytes());
            let pose = body.pose();
            let v = body.linear_velocity();
            let w = body.angular_velocity();
            for f in pose.position.to_array() {
                mix(&mut h, &f.to_le_bytes());
            }
            for f in pose.orientation.to_array() {
                mix(&mut h, &f.to_le_bytes());
            }
            for f in v.to_array().into_iter().chain(w.to_array()) {
                mix(&mut h, &f.to_le_bytes());
            }
        }
        h
    }
}

fn check_time_step(fixed_delta: f32) -> Result<(), WorldError> {
    if fixed_delta.is_finite() && fixed_delta > 0.0 {
        Ok(())
    } else {
        Err(WorldError::InvalidTimeStep(fixed_delta))
    }
}
