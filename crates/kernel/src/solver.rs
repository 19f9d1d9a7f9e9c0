//! Sequential-impulse contact solver.
//!
//! Each fixed step runs `iterations` passes over all contacts. Normal
//! impulses accumulate and never pull bodies together; friction is clamped
//! to the Coulomb cone of the current normal impulse.

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::body::RigidBody;
use crate::contact::Contact;
use crate::material::ContactMaterialTable;

/// Tuning of the contact solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Constraint-resolution passes per fixed step.
    pub iterations: u32,
    /// Fraction of penetration removed per step through the velocity bias.
    pub baumgarte: f32,
    /// Penetration tolerated without correction, in metres.
    pub slop: f32,
    /// Closing speed below which contacts do not bounce, in m/s.
    pub restitution_threshold: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            baumgarte: 0.2,
            slop: 0.01,
            restitution_threshold: 1.0,
        }
    }
}

/// Velocity state copied out of the bodies for the duration of a solve.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VelocityState {
    pub v: Vec3,
    pub w: Vec3,
    inv_mass: f32,
    inv_inertia: Mat3,
}

impl VelocityState {
    pub fn from_body(body: &RigidBody) -> Self {
        Self {
            v: body.linear_velocity(),
            w: body.angular_velocity(),
            inv_mass: body.inverse_mass(),
            inv_inertia: body.inverse_inertia_world(),
        }
    }

    fn apply(&mut self, r: Vec3, impulse: Vec3) {
        self.v += impulse * self.inv_mass;
        self.w += self.inv_inertia * r.cross(impulse);
    }
}

struct ContactConstraint {
    a: usize,
    b: usize,
    ra: Vec3,
    rb: Vec3,
    normal: Vec3,
    tangents: [Vec3; 2],
    normal_mass: f32,
    tangent_mass: [f32; 2],
    bias: f32,
    friction: f32,
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
}

fn relative_velocity(sa: &VelocityState, sb: &VelocityState, ra: Vec3, rb: Vec3) -> Vec3 {
    (sb.v + sb.w.cross(rb)) - (sa.v + sa.w.cross(ra))
}

fn effective_mass(sa: &VelocityState, sb: &VelocityState, ra: Vec3, rb: Vec3, dir: Vec3) -> f32 {
    let rna = ra.cross(dir);
    let rnb = rb.cross(dir);
    let k = sa.inv_mass
        + sb.inv_mass
        + rna.dot(sa.inv_inertia * rna)
        + rnb.dot(sb.inv_inertia * rnb);
    if k > f32::EPSILON { k.recip() } else { 0.0 }
}

fn pair_mut(states: &mut [VelocityState], a: usize, b: usize) -> (&mut VelocityState, &mut VelocityState) {
    debug_assert_ne!(a, b);
    if a < b {
        let (lo, hi) = states.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = states.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

/// Resolve `contacts` by adjusting the velocities in `states`.
pub(crate) fn solve_contacts(
    contacts: &[Contact],
    bodies: &[RigidBody],
    states: &mut [VelocityState],
    materials: &ContactMaterialTable,
    config: &SolverConfig,
    dt: f32,
) {
    let mut constraints: Vec<ContactConstraint> = contacts
        .iter()
        .map(|c| {
            let (body_a, body_b) = (&bodies[c.body_a], &bodies[c.body_b]);
            let (sa, sb) = (&states[c.body_a], &states[c.body_b]);
            let ra = c.point - body_a.position();
            let rb = c.point - body_b.position();
            let material = materials.lookup(body_a.material().as_str(), body_b.material().as_str());

            let vn = relative_velocity(sa, sb, ra, rb).dot(c.normal);
            let bounce = if -vn > config.restitution_threshold {
                -vn * material.restitution
            } else {
                0.0
            };
            let push = config.baumgarte / dt * (c.depth - config.slop).max(0.0);

            let (t1, t2) = c.normal.any_orthonormal_pair();
            ContactConstraint {
                a: c.body_a,
                b: c.body_b,
                ra,
                rb,
                normal: c.normal,
                tangents: [t1, t2],
                normal_mass: effective_mass(sa, sb, ra, rb, c.normal),
                tangent_mass: [
                    effective_mass(sa, sb, ra, rb, t1),
                    effective_mass(sa, sb, ra, rb, t2),
                ],
                bias: bounce.max(push),
                friction: material.friction,
                normal_impulse: 0.0,
                tangent_impulse: [0.0; 2],
            }
        })
        .collect();

    for _ in 0..config.iterations {
        for c in &mut constraints {
            let (sa, sb) = pair_mut(states, c.a, c.b);

            let vn = relative_velocity(sa, sb, c.ra, c.rb).dot(c.normal);
            let old = c.normal_impulse;
            c.normal_impulse = (old + c.normal_mass * (c.bias - vn)).max(0.0);
            let p = c.normal * (c.normal_impulse - old);
            sa.apply(c.ra, -p);
            sb.apply(c.rb, p);

            let limit = c.friction * c.normal_impulse;
            for k in 0..2 {
                let t = c.tangents[k];
                let vt = relative_velocity(sa, sb, c.ra, c.rb).dot(t);
                let old = c.tangent_impulse[k];
                c.tangent_impulse[k] = (old - c.tangent_mass[k] * vt).clamp(-limit, limit);
                let p = t * (c.tangent_impulse[k] - old);
                sa.apply(c.ra, -p);
                sb.apply(c.rb, p);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(inv_mass: f32, v: Vec3) -> VelocityState {
        VelocityState {
            v,
            w: Vec3::ZERO,
            inv_mass,
            inv_inertia: Mat3::ZERO,
        }
    }

    #[test]
    fn pair_mut_returns_requested_order() {
        let mut states = [state(1.0, Vec3::X), state(2.0, Vec3::Y), state(3.0, Vec3::Z)];
        let (a, b) = pair_mut(&mut states, 2, 0);
        assert_eq!(a.v, Vec3::Z);
        assert_eq!(b.v, Vec3::X);
    }

    #[test]
    fn effective_mass_of_two_particles() {
        let a = state(1.0, Vec3::ZERO);
        let b = state(1.0, Vec3::ZERO);
        let m = effective_mass(&a, &b, Vec3::ZERO, Vec3::ZERO, Vec3::Y);
        assert!((m - 0.5).abs() < 1e-6);
    }

    #[test]
    fn two_static_states_have_no_effective_mass() {
        let a = state(0.0, Vec3::ZERO);
        let b = state(0.0, Vec3::ZERO);
        assert_eq!(effective_mass(&a, &b, Vec3::X, Vec3::X, Vec3::Y), 0.0);
    }

    #[test]
    fn default_config_is_stable_for_lab_scenes() {
        let c = SolverConfig::default();
        assert_eq!(c.iterations, 10);
        assert!(c.baumgarte > 0.0 && c.baumgarte < 1.0);
    }
}
