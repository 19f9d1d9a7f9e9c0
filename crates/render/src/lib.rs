//! Rendering boundary: the calls the simulation core makes into a renderer.
//!
//! # Invariants
//! - The core only creates, poses, shows/hides and destroys proxies, and
//!   requests draws. It never reads geometry back.
//! - Proxies are owned by the renderer; the core holds handles.
//!
//! `DebugTextRenderer` implements the trait without a GPU and is used by the
//! CLI and by tests.

mod renderer;

pub use renderer::{DebugTextRenderer, ProxyRenderer, ProxyRequest, ProxyState, RenderError};

pub fn crate_info() -> &'static str {
    "labscene-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
