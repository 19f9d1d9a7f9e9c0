//! Simulation kernel: the authoritative rigid-body world.
//!
//! # Invariants
//! - Static bodies (mass 0) are never integrated, pushed or displaced.
//! - Every pair of material tags resolves to a contact material; unregistered
//!   pairs use the world default.
//! - A fixed step is a pure function of the world state and the forces
//!   applied since the previous step.

mod body;
mod contact;
mod material;
mod solver;
pub mod world;

pub use body::{BodyDesc, RigidBody};
pub use material::{ContactMaterial, ContactMaterialTable};
pub use solver::SolverConfig;
pub use world::{World, WorldConfig, WorldError, WorldEvent};

pub fn crate_info() -> &'static str {
    "labscene-kernel v0.1.0"
}
