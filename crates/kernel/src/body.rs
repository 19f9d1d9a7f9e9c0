use glam::{Mat3, Vec3};
use labscene_common::{BodyId, MassClass, MaterialTag, Pose, Shape};
use serde::{Deserialize, Serialize};

/// Everything needed to create a body. The world assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDesc {
    pub shape: Shape,
    pub mass: MassClass,
    pub pose: Pose,
    pub material: MaterialTag,
    pub linear_velocity: Vec3,
}

impl BodyDesc {
    /// Unrotated body at the origin, at rest, with the default material.
    pub fn new(shape: Shape, mass: MassClass) -> Self {
        Self {
            shape,
            mass,
            pose: Pose::default(),
            material: MaterialTag::default(),
            linear_velocity: Vec3::ZERO,
        }
    }

    /// Place the body at `position`, keeping the orientation.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.pose.position = position;
        self
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    pub fn with_material(mut self, material: impl Into<MaterialTag>) -> Self {
        self.material = material.into();
        self
    }

    /// Initial linear velocity. Ignored for static bodies.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }
}

/// A simulated rigid body.
///
/// Static bodies (mass 0) ignore forces, impulses and velocity writes, and
/// the integrator skips them. Planes are always static.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBody {
    id: BodyId,
    shape: Shape,
    mass: f32,
    inv_mass: f32,
    inv_inertia_local: Vec3,
    material: MaterialTag,
    pub(crate) pose: Pose,
    pub(crate) linear_velocity: Vec3,
    pub(crate) angular_velocity: Vec3,
    #[serde(skip)]
    pub(crate) force: Vec3,
}

impl RigidBody {
    pub(crate) fn new(id: BodyId, desc: BodyDesc) -> Self {
        let mass = match desc.shape {
            Shape::Plane => 0.0,
            _ => desc.mass.mass(),
        };
        let inv_mass = if mass > 0.0 { mass.recip() } else { 0.0 };
        let linear_velocity = if mass > 0.0 {
            desc.linear_velocity
        } else {
            Vec3::ZERO
        };
        Self {
            id,
            shape: desc.shape,
            mass,
            inv_mass,
            inv_inertia_local: inverse_inertia(&desc.shape, mass),
            material: desc.material,
            pose: Pose {
                position: desc.pose.position,
                orientation: desc.pose.orientation.normalize(),
            },
            linear_velocity,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
        }
    }

    /// Id assigned by the world.
    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Mass in kilograms, 0 for static bodies.
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Reciprocal of the mass, 0 for static bodies.
    pub fn inverse_mass(&self) -> f32 {
        self.inv_mass
    }

    /// True for bodies with zero mass.
    pub fn is_static(&self) -> bool {
        self.inv_mass == 0.0
    }

    pub fn is_dynamic(&self) -> bool {
        !self.is_static()
    }

    pub fn material(&self) -> &MaterialTag {
        &self.material
    }

    /// Position and orientation in world space.
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Centre of mass in world space.
    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    /// Force accumulated since the last fixed step.
    pub fn force(&self) -> Vec3 {
        self.force
    }

    /// Overwrite the linear velocity. Ignored for static bodies.
    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        if self.is_dynamic() {
            self.linear_velocity = velocity;
        }
    }

    /// Overwrite the angular velocity. Ignored for static bodies.
    pub fn set_angular_velocity(&mut self, velocity: Vec3) {
        if self.is_dynamic() {
            self.angular_velocity = velocity;
        }
    }

    /// Add a force through the centre of mass. It acts for the next fixed
    /// step only, independent of the step length.
    pub fn apply_force(&mut self, force: Vec3) {
        if self.is_dynamic() {
            self.force += force;
        }
    }

    /// Instantaneous change of momentum through the centre of mass.
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        if self.is_dynamic() {
            self.linear_velocity += impulse * self.inv_mass;
        }
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
    }

    /// Inverse inertia tensor rotated into world space.
    pub fn inverse_inertia_world(&self) -> Mat3 {
        if self.is_static() {
            return Mat3::ZERO;
        }
        let r = Mat3::from_quat(self.pose.orientation);
        r * Mat3::from_diagonal(self.inv_inertia_local) * r.transpose()
    }

    /// Velocity of a world-space point rigidly attached to the body.
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.pose.position)
    }

    /// Advance pose by the current velocities.
    pub(crate) fn integrate(&mut self, dt: f32) {
        self.pose.position += self.linear_velocity * dt;
        let w = self.angular_velocity;
        if w != Vec3::ZERO {
            let q = self.pose.orientation;
            let spin = glam::Quat::from_xyzw(w.x, w.y, w.z, 0.0) * q;
            self.pose.orientation = (q + spin * (0.5 * dt)).normalize();
        }
    }
}

/// Diagonal of the inverse inertia tensor for a solid shape in its own frame.
fn inverse_inertia(shape: &Shape, mass: f32) -> Vec3 {
    if mass <= 0.0 {
        return Vec3::ZERO;
    }
    let inertia = match *shape {
        Shape::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
        Shape::Box { half_extents: h } => {
            let sq = h * h;
            Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) * (mass / 3.0)
        }
        Shape::Plane => Vec3::ZERO,
    };
    Vec3::new(recip_or_zero(inertia.x), recip_or_zero(inertia.y), recip_or_zero(inertia.z))
}

fn recip_or_zero(v: f32) -> f32 {
    if v > f32::EPSILON { v.recip() } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(mass: MassClass) -> RigidBody {
        RigidBody::new(BodyId(1), BodyDesc::new(Shape::Sphere { radius: 0.5 }, mass))
    }

    #[test]
    fn static_body_ignores_velocity_and_forces() {
        let mut body = sphere(MassClass::Static);
        body.set_linear_velocity(Vec3::X);
        body.apply_force(Vec3::Y * 10.0);
        body.apply_impulse(Vec3::Z);
        assert_eq!(body.linear_velocity(), Vec3::ZERO);
        assert_eq!(body.force(), Vec3::ZERO);
        assert_eq!(body.inverse_inertia_world(), Mat3::ZERO);
    }

    #[test]
    fn static_body_drops_initial_velocity() {
        let desc = BodyDesc::new(Shape::Sphere { radius: 1.0 }, MassClass::Static)
            .with_velocity(Vec3::new(3.0, 0.0, 0.0));
        let body = RigidBody::new(BodyId(1), desc);
        assert_eq!(body.linear_velocity(), Vec3::ZERO);
    }

    #[test]
    fn planes_are_always_static() {
        let body = RigidBody::new(BodyId(1), BodyDesc::new(Shape::Plane, MassClass::dynamic(5.0)));
        assert!(body.is_static());
        assert_eq!(body.mass(), 0.0);
    }

    #[test]
    fn forces_accumulate_until_cleared() {
        let mut body = sphere(MassClass::dynamic(1.0));
        body.apply_force(Vec3::X);
        body.apply_force(Vec3::X);
        assert_eq!(body.force(), Vec3::new(2.0, 0.0, 0.0));
        body.clear_forces();
        assert_eq!(body.force(), Vec3::ZERO);
    }

    #[test]
    fn impulse_scales_with_inverse_mass() {
        let mut body = sphere(MassClass::dynamic(2.0));
        body.apply_impulse(Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(body.linear_velocity(), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn cube_inertia_matches_closed_form() {
        // Solid unit cube of mass 1: I = m (w^2 + h^2) / 12 = 1/6.
        let inv = inverse_inertia(
            &Shape::Box {
                half_extents: Vec3::splat(0.5),
            },
            1.0,
        );
        assert!((inv - Vec3::splat(6.0)).length() < 1e-4);
    }

    #[test]
    fn integrate_moves_and_spins() {
        let mut body = sphere(MassClass::dynamic(1.0));
        body.set_linear_velocity(Vec3::new(1.0, 0.0, 0.0));
        body.set_angular_velocity(Vec3::new(0.0, 1.0, 0.0));
        body.integrate(0.5);
        assert_eq!(body.position(), Vec3::new(0.5, 0.0, 0.0));
        assert!((body.pose().orientation.length() - 1.0).abs() < 1e-5);
        assert!(body.pose().orientation != glam::Quat::IDENTITY);
    }

    #[test]
    fn velocity_at_includes_rotation() {
        let mut body = sphere(MassClass::dynamic(1.0));
        body.set_angular_velocity(Vec3::new(0.0, 0.0, 1.0));
        let v = body.velocity_at(Vec3::new(1.0, 0.0, 0.0));
        assert!((v - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-6);
    }
}
