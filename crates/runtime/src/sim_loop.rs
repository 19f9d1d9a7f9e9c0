use glam::Vec3;
use labscene_common::BodyId;
use labscene_input::{Action, InputState};
use labscene_kernel::{World, WorldError};
use labscene_render::ProxyRenderer;
use labscene_sync::{
    ProxyRegistry, RandomSource, SpawnError, SpawnRequest, Spawned, Spawner, SyncError,
};

use crate::clock::FrameClock;
use crate::config::{SimConfig, TimingConfig};
use crate::controller::ForceController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Whether the host should schedule another tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextFrame {
    Scheduled,
    Cancelled,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Frames completed so far, this one included.
    pub frame: u64,
    pub delta: f32,
    /// Fixed steps the world took.
    pub steps: u32,
    /// Proxies whose pose was updated.
    pub synced: usize,
    /// Force the controller applied before the last fixed step, zero if no
    /// step ran.
    pub force: Vec3,
    pub drawn: bool,
    pub next: NextFrame,
}

impl TickReport {
    fn cancelled(frame: u64) -> Self {
        Self {
            frame,
            delta: 0.0,
            steps: 0,
            synced: 0,
            force: Vec3::ZERO,
            drawn: false,
            next: NextFrame::Cancelled,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("the loop has been stopped")]
    Stopped,
    #[error("{0} is not in the world")]
    UnknownBody(BodyId),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

/// Drives the world, the registry and the renderer one tick at a time.
///
/// Single-threaded and cooperative: the host calls [`tick`](Self::tick) once
/// per frame and keeps calling while the report says
/// [`NextFrame::Scheduled`]. Input handlers only record key state; the
/// controller reads it before each fixed step of the next tick.
pub struct SimulationLoop<R: ProxyRenderer> {
    state: LoopState,
    clock: FrameClock,
    timing: TimingConfig,
    world: World,
    registry: ProxyRegistry,
    spawner: Spawner,
    controller: ForceController,
    input: InputState,
    renderer: R,
    rng: Box<dyn RandomSource>,
    frames: u64,
    draw_failures: u64,
}

impl<R: ProxyRenderer> SimulationLoop<R> {
    /// Loop over an empty world built from `config`. The config is assumed
    /// validated.
    pub fn new(config: &SimConfig, renderer: R, rng: Box<dyn RandomSource>) -> Self {
        Self {
            state: LoopState::Idle,
            clock: FrameClock::new(),
            timing: config.timing,
            world: config.build_world(),
            registry: ProxyRegistry::new(),
            spawner: Spawner::new(config.spawn),
            controller: ForceController::new(config.controller),
            input: InputState::new(),
            renderer,
            rng,
            frames: 0,
            draw_failures: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// True between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Read-only access to the simulated world. Bodies are only added
    /// through [`spawn_body`](Self::spawn_body).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Body/proxy bindings.
    pub fn registry(&self) -> &ProxyRegistry {
        &self.registry
    }

    /// The renderer owning the proxies.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Key state as last reported by the host.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// The controller pushing the player.
    pub fn controller(&self) -> &ForceController {
        &self.controller
    }

    /// Fixed step length and sub-step cap.
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Ticks completed while running.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Draws that failed since the loop was created.
    pub fn draw_failures(&self) -> u64 {
        self.draw_failures
    }

    /// Idle → Running. Starting a running loop does nothing; a stopped loop
    /// cannot be restarted.
    pub fn start(&mut self) -> Result<(), LoopError> {
        match self.state {
            LoopState::Running => Ok(()),
            LoopState::Stopped => Err(LoopError::Stopped),
            LoopState::Idle => {
                self.clock.reset();
                self.state = LoopState::Running;
                tracing::info!(bodies = self.world.body_count(), "simulation loop started");
                Ok(())
            }
        }
    }

    /// Cancel further ticks. Safe to call any number of times.
    pub fn stop(&mut self) {
        if self.state != LoopState::Stopped {
            self.state = LoopState::Stopped;
            tracing::info!(frames = self.frames, "simulation loop stopped");
        }
    }

    /// Stop, destroy every proxy and empty the world.
    pub fn teardown(&mut self) {
        self.stop();
        self.registry.clear(&mut self.renderer);
        self.world.clear();
        self.input.release_all();
        self.controller.set_player(None);
        tracing::info!("simulation torn down");
    }

    /// Run one frame at host time `elapsed` (seconds since start).
    ///
    /// A loop that is not running does nothing and reports
    /// [`NextFrame::Cancelled`]. The controller runs once before every fixed
    /// step, so a tick that takes no step neither pushes nor damps the
    /// player. Forces still pending at the end of the tick are dropped. A
    /// failed draw is counted and logged; the simulation carries on.
    pub fn tick(&mut self, elapsed: f64) -> Result<TickReport, LoopError> {
        if self.state != LoopState::Running {
            return Ok(TickReport::cancelled(self.frames));
        }
        let _span = tracing::trace_span!("tick", frame = self.frames + 1).entered();

        let delta = self.clock.advance(elapsed);
        let controller = &self.controller;
        let input = &self.input;
        let mut force = Vec3::ZERO;
        let stepped = self.world.step_with(
            self.timing.fixed_delta,
            delta,
            self.timing.max_sub_steps,
            |world| force = controller.apply(world, input),
        );
        self.world.clear_forces();
        let steps = stepped?;

        let synced = self.registry.sync_all(&self.world, &mut self.renderer)?;

        let drawn = match self.renderer.draw() {
            Ok(()) => true,
            Err(err) => {
                self.draw_failures += 1;
                tracing::warn!(error = %err, failures = self.draw_failures, "draw failed");
                false
            }
        };

        self.frames += 1;
        tracing::trace!(delta, steps, synced, "tick complete");
        Ok(TickReport {
            frame: self.frames,
            delta,
            steps,
            synced,
            force,
            drawn,
            next: NextFrame::Scheduled,
        })
    }

    /// Record a key press. Takes effect from the next fixed step.
    pub fn on_key_down(&mut self, code: &str) {
        self.input.on_key_down(code);
    }

    /// Record a key release.
    pub fn on_key_up(&mut self, code: &str) {
        self.input.on_key_up(code);
    }

    /// Make `body` the one the movement keys push.
    pub fn set_player(&mut self, body: BodyId) -> Result<(), LoopError> {
        if !self.world.contains(body) {
            return Err(LoopError::UnknownBody(body));
        }
        self.controller.set_player(Some(body));
        Ok(())
    }

    /// Spawn a body/proxy pair. Allowed while idle or running.
    pub fn spawn_body(&mut self, request: SpawnRequest) -> Result<Spawned, LoopError> {
        if self.state == LoopState::Stopped {
            return Err(LoopError::Stopped);
        }
        let spawned = self.spawner.spawn_body(
            &mut self.world,
            &mut self.registry,
            &mut self.renderer,
            request,
        )?;
        Ok(spawned)
    }

    /// Spawn a dynamic box drawn from the configured bounds.
    pub fn spawn_random_box(&mut self) -> Result<Spawned, LoopError> {
        let request = self.spawner.random_box(self.rng.as_mut());
        self.spawn_body(request)
    }

    /// Spawn a dynamic sphere drawn from the configured bounds.
    pub fn spawn_random_sphere(&mut self) -> Result<Spawned, LoopError> {
        let request = self.spawner.random_sphere(self.rng.as_mut());
        self.spawn_body(request)
    }

    /// Apply a host UI request.
    pub fn handle_action(&mut self, action: Action) -> Result<(), LoopError> {
        tracing::debug!(?action, "action");
        match action {
            Action::SpawnRandomBox => {
                self.spawn_random_box()?;
            }
            Action::SpawnRandomSphere => {
                self.spawn_random_sphere()?;
            }
            Action::SetAuxiliaryVisible(visible) => {
                self.registry
                    .set_auxiliary_visible(visible, &mut self.renderer)?;
            }
            Action::Stop => self.stop(),
        }
        Ok(())
    }
}
