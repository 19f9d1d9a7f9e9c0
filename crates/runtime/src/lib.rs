//! Runtime: the per-frame simulation loop and everything it is configured with.
//!
//! # Invariants
//! - Ticks never overlap; every World, Registry and renderer mutation happens
//!   inside a `&mut self` method of [`SimulationLoop`].
//! - A stopped loop never steps the world again.
//! - Forces applied during a tick are consumed or dropped by the end of it.
//! - The controller acts once per fixed step, never per host frame.

mod clock;
pub mod config;
mod controller;
mod host;
mod scene;
mod sim_loop;

pub use clock::FrameClock;
pub use config::{ConfigError, MaterialPairConfig, SimConfig, TimingConfig};
pub use controller::{ControllerConfig, ForceController};
pub use host::{HeadlessHost, HostEvent, HostSummary};
pub use scene::LabScene;
pub use sim_loop::{LoopError, LoopState, NextFrame, SimulationLoop, TickReport};

pub fn crate_info() -> &'static str {
    "labscene-runtime v0.1.0"
}
