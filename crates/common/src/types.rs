use std::borrow::Borrow;
use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Identifier of a rigid body inside a simulation world.
///
/// Ids are handed out sequentially by the world, so ordering by id is the
/// same as ordering by insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Opaque handle to a visual proxy owned by the external renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProxyHandle(pub u64);

impl fmt::Display for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proxy#{}", self.0)
    }
}

/// Material class of a body. Contact behaviour is looked up per pair of tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialTag(pub String);

impl MaterialTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MaterialTag {
    fn default() -> Self {
        Self::new("default")
    }
}

impl Borrow<str> for MaterialTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MaterialTag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for MaterialTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rigid pose: position and orientation. Bodies and proxies share it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    /// Unrotated pose at `position`.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Transform a point from body-local space into world space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }

    /// Transform a world-space point into body-local space.
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.orientation.inverse() * (world - self.position)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

/// Collision geometry of a rigid body, in body-local space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    /// Infinite plane through the body origin. Its normal is the body's local +Y.
    Plane,
}

impl Shape {
    /// Radius of a sphere enclosing the shape, `None` for unbounded shapes.
    pub fn bounding_radius(&self) -> Option<f32> {
        match self {
            Self::Sphere { radius } => Some(*radius),
            Self::Box { half_extents } => Some(half_extents.length()),
            Self::Plane => None,
        }
    }
}

/// Shape as requested by scene code and handed to the renderer.
///
/// Boxes are described by full extents, the way a mesh geometry is sized;
/// the physical body works with half extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeDescriptor {
    Sphere { radius: f32 },
    Box { size: Vec3 },
    Plane,
}

impl ShapeDescriptor {
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Box with full edge lengths along x, y and z.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        Self::Box {
            size: Vec3::new(width, height, depth),
        }
    }

    pub fn cube(size: f32) -> Self {
        Self::Box {
            size: Vec3::splat(size),
        }
    }

    /// Physical collision shape with matching dimensions.
    pub fn to_shape(&self) -> Shape {
        match *self {
            Self::Sphere { radius } => Shape::Sphere { radius },
            Self::Box { size } => Shape::Box {
                half_extents: size * 0.5,
            },
            Self::Plane => Shape::Plane,
        }
    }
}

/// Static bodies have mass 0 and are never integrated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MassClass {
    Static,
    Dynamic { mass: f32 },
}

impl MassClass {
    /// Dynamic body of `mass` kilograms.
    pub fn dynamic(mass: f32) -> Self {
        Self::Dynamic { mass }
    }

    /// Mass in kilograms; non-positive or non-finite dynamic masses collapse to static.
    pub fn mass(&self) -> f32 {
        match *self {
            Self::Static => 0.0,
            Self::Dynamic { mass } if mass.is_finite() && mass > 0.0 => mass,
            Self::Dynamic { .. } => 0.0,
        }
    }

    pub fn is_static(&self) -> bool {
        self.mass() == 0.0
    }
}
