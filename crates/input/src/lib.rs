//! Input: raw key state, movement bindings and host actions.
//!
//! # Invariants
//! - Looking up a code that was never seen yields "not pressed".
//! - Handlers only write state; the simulation reads it before each fixed step.

pub mod action;
mod bindings;
mod state;

pub use action::Action;
pub use bindings::{KeyBinding, KeyBindings, MoveDirection};
pub use state::InputState;

pub fn crate_info() -> &'static str {
    "labscene-input v0.1.0"
}
