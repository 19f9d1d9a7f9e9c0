//! Shared vocabulary for the labscene crates: body and proxy ids, material
//! tags, poses and shape descriptors.

mod types;

pub use types::{BodyId, MassClass, MaterialTag, Pose, ProxyHandle, Shape, ShapeDescriptor};

pub fn crate_info() -> &'static str {
    "labscene-common v0.1.0"
}
