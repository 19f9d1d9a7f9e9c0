//! Coupling between the physics world and the renderer's proxies.
//!
//! # Invariants
//! - A body has at most one binding and a proxy belongs to at most one body.
//! - Spawning is atomic: a failed spawn leaves World, Registry and renderer
//!   as they were.
//! - Randomness is injected through [`RandomSource`]; nothing here reads a
//!   global generator.

mod random;
mod registry;
mod spawner;

pub use random::{FixedSequence, RandomSource, SeededRandom};
pub use registry::{ProxyBinding, ProxyRegistry, RegistryError, SyncError};
pub use spawner::{ProxyMode, SpawnBounds, SpawnError, SpawnRequest, Spawned, Spawner};

pub fn crate_info() -> &'static str {
    "labscene-sync v0.1.0"
}
