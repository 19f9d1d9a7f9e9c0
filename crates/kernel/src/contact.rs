//! Narrowphase: contact points between pairs of bodies.
//!
//! Every contact normal points from `body_a` towards `body_b`.

use glam::Vec3;
use labscene_common::{Pose, Shape};

use crate::body::RigidBody;

/// A single point of contact between two bodies, indexed into the world's
/// body list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub body_a: usize,
    pub body_b: usize,
    pub point: Vec3,
    pub normal: Vec3,
    pub depth: f32,
}

impl Contact {
    fn new(point: Vec3, normal: Vec3, depth: f32) -> Self {
        Self {
            body_a: 0,
            body_b: 0,
            point,
            normal,
            depth,
        }
    }
}

/// Append the contacts between `a` and `b` to `out`.
///
/// Pairs where neither body can move produce nothing.
pub(crate) fn collide(ia: usize, a: &RigidBody, ib: usize, b: &RigidBody, out: &mut Vec<Contact>) {
    if a.is_static() && b.is_static() {
        return;
    }
    if let (Some(ra), Some(rb)) = (a.shape().bounding_radius(), b.shape().bounding_radius()) {
        let reach = ra + rb;
        if a.position().distance_squared(b.position()) > reach * reach {
            return;
        }
    }

    let start = out.len();
    let flipped = match (*a.shape(), *b.shape()) {
        (Shape::Sphere { radius: r1 }, Shape::Sphere { radius: r2 }) => {
            sphere_sphere(a.pose(), r1, b.pose(), r2, out);
            false
        }
        (Shape::Plane, Shape::Sphere { radius }) => {
            plane_sphere(a.pose(), b.pose(), radius, out);
            false
        }
        (Shape::Sphere { radius }, Shape::Plane) => {
            plane_sphere(b.pose(), a.pose(), radius, out);
            true
        }
        (Shape::Plane, Shape::Box { half_extents }) => {
            plane_box(a.pose(), b.pose(), half_extents, out);
            false
        }
        (Shape::Box { half_extents }, Shape::Plane) => {
            plane_box(b.pose(), a.pose(), half_extents, out);
            true
        }
        (Shape::Box { half_extents }, Shape::Sphere { radius }) => {
            box_sphere(a.pose(), half_extents, b.pose(), radius, out);
            false
        }
        (Shape::Sphere { radius }, Shape::Box { half_extents }) => {
            box_sphere(b.pose(), half_extents, a.pose(), radius, out);
            true
        }
        (Shape::Box { half_extents: ha }, Shape::Box { half_extents: hb }) => {
            box_box(a.pose(), ha, b.pose(), hb, out);
            false
        }
        (Shape::Plane, Shape::Plane) => return,
    };

    for contact in &mut out[start..] {
        contact.body_a = ia;
        contact.body_b = ib;
        if flipped {
            contact.normal = -contact.normal;
        }
    }
}

fn plane_normal(plane: &Pose) -> Vec3 {
    plane.orientation * Vec3::Y
}

fn sphere_sphere(pa: &Pose, ra: f32, pb: &Pose, rb: f32, out: &mut Vec<Contact>) {
    let delta = pb.position - pa.position;
    let reach = ra + rb;
    let dist_sq = delta.length_squared();
    if dist_sq >= reach * reach {
        return;
    }
    let dist = dist_sq.sqrt();
    // Coincident centres: pick an arbitrary but stable separation axis.
    let normal = if dist > 1e-6 { delta / dist } else { Vec3::Y };
    let depth = reach - dist;
    out.push(Contact::new(
        pa.position + normal * (ra - depth * 0.5),
        normal,
        depth,
    ));
}

fn plane_sphere(plane: &Pose, sphere: &Pose, radius: f32, out: &mut Vec<Contact>) {
    let n = plane_normal(plane);
    let separation = (sphere.position - plane.position).dot(n) - radius;
    if separation >= 0.0 {
        return;
    }
    out.push(Contact::new(sphere.position - n * radius, n, -separation));
}

fn box_corners(half_extents: Vec3) -> [Vec3; 8] {
    let h = half_extents;
    [
        Vec3::new(-h.x, -h.y, -h.z),
        Vec3::new(h.x, -h.y, -h.z),
        Vec3::new(-h.x, h.y, -h.z),
        Vec3::new(h.x, h.y, -h.z),
        Vec3::new(-h.x, -h.y, h.z),
        Vec3::new(h.x, -h.y, h.z),
        Vec3::new(-h.x, h.y, h.z),
        Vec3::new(h.x, h.y, h.z),
    ]
}

fn plane_box(plane: &Pose, cuboid: &Pose, half_extents: Vec3, out: &mut Vec<Contact>) {
    let n = plane_normal(plane);
    for corner in box_corners(half_extents) {
        let world = cuboid.transform_point(corner);
        let separation = (world - plane.position).dot(n);
        if separation < 0.0 {
            out.push(Contact::new(world, n, -separation));
        }
    }
}

fn min_axis(v: Vec3) -> usize {
    if v.x <= v.y && v.x <= v.z {
        0
    } else if v.y <= v.z {
        1
    } else {
        2
    }
}

fn axis(index: usize, sign: f32) -> Vec3 {
    let mut n = Vec3::ZERO;
    n[index] = sign;
    n
}

fn sign_of(v: f32) -> f32 {
    if v < 0.0 { -1.0 } else { 1.0 }
}

fn box_sphere(cuboid: &Pose, half_extents: Vec3, sphere: &Pose, radius: f32, out: &mut Vec<Contact>) {
    let local = cuboid.inverse_transform_point(sphere.position);
    let closest = local.clamp(-half_extents, half_extents);
    let offset = local - closest;
    let dist_sq = offset.length_squared();

    if dist_sq > 1e-12 {
        if dist_sq >= radius * radius {
            return;
        }
        let dist = dist_sq.sqrt();
        out.push(Contact::new(
            cuboid.transform_point(closest),
            cuboid.orientation * (offset / dist),
            radius - dist,
        ));
        return;
    }

    // Centre inside the box: push out through the nearest face.
    let gap = half_extents - local.abs();
    let i = min_axis(gap);
    let sign = sign_of(local[i]);
    let mut surface = local;
    surface[i] = half_extents[i] * sign;
    out.push(Contact::new(
        cuboid.transform_point(surface),
        cuboid.orientation * axis(i, sign),
        gap[i] + radius,
    ));
}

/// Separating-axis test over the 15 candidate axes of two oriented boxes.
///
/// A face axis yields up to four points: the incident face of the other box
/// clipped against the sides of the reference face. An edge axis yields one
/// point between the two closest edges. Touching faces (zero overlap) still
/// report contacts.
fn box_box(pa: &Pose, ha: Vec3, pb: &Pose, hb: Vec3, out: &mut Vec<Contact>) {
    let axes_a = box_axes(pa);
    let axes_b = box_axes(pb);
    let d = pb.position - pa.position;

    let mut best: Option<(f32, Vec3, Feature)> = None;
    let mut consider = |n: Vec3, feature: Feature| -> bool {
        let along = d.dot(n);
        let overlap = projected_radius(&axes_a, ha, n) + projected_radius(&axes_b, hb, n) - along.abs();
        if overlap < 0.0 {
            return false;
        }
        let normal = if along < 0.0 { -n } else { n };
        let better = match (&best, feature) {
            (None, _) => true,
            (Some((depth, _, _)), Feature::Edge(..)) => overlap * EDGE_PREFERENCE + EDGE_MARGIN < *depth,
            (Some((depth, _, _)), _) => overlap < *depth,
        };
        if better {
            best = Some((overlap, normal, feature));
        }
        true
    };

    for i in 0..3 {
        if !consider(axes_a[i], Feature::FaceA(i)) || !consider(axes_b[i], Feature::FaceB(i)) {
            return;
        }
    }
    for i in 0..3 {
        for j in 0..3 {
            let n = axes_a[i].cross(axes_b[j]);
            if n.length_squared() < 1e-6 {
                continue;
            }
            if !consider(n.normalize(), Feature::Edge(i, j)) {
                return;
            }
        }
    }

    let Some((depth, normal, feature)) = best else {
        return;
    };
    match feature {
        Feature::FaceA(i) => {
            face_contacts(pa, &axes_a, ha, i, normal, pb, &axes_b, hb, normal, out);
        }
        Feature::FaceB(i) => {
            face_contacts(pb, &axes_b, hb, i, -normal, pa, &axes_a, ha, normal, out);
        }
        Feature::Edge(i, j) => {
            let point = edge_contact(pa, &axes_a, ha, i, pb, &axes_b, hb, j, normal);
            out.push(Contact::new(point, normal, depth));
        }
    }
}

/// Edge axes must beat the best face axis by this much to be chosen.
const EDGE_PREFERENCE: f32 = 1.05;
const EDGE_MARGIN: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feature {
    FaceA(usize),
    FaceB(usize),
    Edge(usize, usize),
}

fn box_axes(pose: &Pose) -> [Vec3; 3] {
    [
        pose.orientation * Vec3::X,
        pose.orientation * Vec3::Y,
        pose.orientation * Vec3::Z,
    ]
}

fn projected_radius(axes: &[Vec3; 3], half_extents: Vec3, n: Vec3) -> f32 {
    (0..3).map(|k| half_extents[k] * axes[k].dot(n).abs()).sum()
}

/// Contacts for a reference face of box `r` with outward normal `face_normal`
/// against the most opposed face of box `inc`. Points lie on the incident box
/// and carry `contact_normal`.
#[allow(clippy::too_many_arguments)]
fn face_contacts(
    pr: &Pose,
    axes_r: &[Vec3; 3],
    hr: Vec3,
    axis_r: usize,
    face_normal: Vec3,
    pi: &Pose,
    axes_i: &[Vec3; 3],
    hi: Vec3,
    contact_normal: Vec3,
    out: &mut Vec<Contact>,
) {
    // Incident face: the face of `inc` most anti-parallel to the reference face.
    let mut k = 0;
    let mut alignment = -1.0;
    for (m, axis) in axes_i.iter().enumerate() {
        let dot = axis.dot(face_normal).abs();
        if dot > alignment {
            alignment = dot;
            k = m;
        }
    }
    let inc_normal = axes_i[k] * -sign_of(axes_i[k].dot(face_normal));
    let centre = pi.position + inc_normal * hi[k];
    let (u, v) = ((k + 1) % 3, (k + 2) % 3);
    let (eu, ev) = (axes_i[u] * hi[u], axes_i[v] * hi[v]);
    let mut polygon = vec![
        centre + eu + ev,
        centre - eu + ev,
        centre - eu - ev,
        centre + eu - ev,
    ];

    for side in [(axis_r + 1) % 3, (axis_r + 2) % 3] {
        for sign in [1.0, -1.0] {
            let n = axes_r[side] * sign;
            let offset = pr.position.dot(n) + hr[side];
            polygon = clip_polygon(&polygon, n, offset);
            if polygon.is_empty() {
                return;
            }
        }
    }

    let face_offset = pr.position.dot(face_normal) + hr[axis_r];
    for point in polygon {
        let separation = point.dot(face_normal) - face_offset;
        if separation <= 0.0 {
            out.push(Contact::new(point, contact_normal, -separation));
        }
    }
}

/// Sutherland-Hodgman: keep the part of `polygon` with `p . n <= offset`.
fn clip_polygon(polygon: &[Vec3], n: Vec3, offset: f32) -> Vec<Vec3> {
    let mut clipped = Vec::with_capacity(polygon.len() + 2);
    for (i, &current) in polygon.iter().enumerate() {
        let next = polygon[(i + 1) % polygon.len()];
        let dc = current.dot(n) - offset;
        let dn = next.dot(n) - offset;
        if dc <= 0.0 {
            clipped.push(current);
        }
        if (dc < 0.0 && dn > 0.0) || (dc > 0.0 && dn < 0.0) {
            clipped.push(current + (next - current) * (dc / (dc - dn)));
        }
    }
    clipped
}

/// Midpoint between the closest points of the two supporting edges.
#[allow(clippy::too_many_arguments)]
fn edge_contact(
    pa: &Pose,
    axes_a: &[Vec3; 3],
    ha: Vec3,
    i: usize,
    pb: &Pose,
    axes_b: &[Vec3; 3],
    hb: Vec3,
    j: usize,
    normal: Vec3,
) -> Vec3 {
    // Edge of `a` furthest along the normal, edge of `b` furthest against it.
    let mut on_a = pa.position;
    let mut on_b = pb.position;
    for k in 0..3 {
        if k != i {
            on_a += axes_a[k] * ha[k] * sign_of(axes_a[k].dot(normal));
        }
        if k != j {
            on_b -= axes_b[k] * hb[k] * sign_of(axes_b[k].dot(normal));
        }
    }

    let (da, db) = (axes_a[i], axes_b[j]);
    let r = on_a - on_b;
    let b = da.dot(db);
    let c = da.dot(r);
    let f = db.dot(r);
    let denom = 1.0 - b * b;
    let (s, t) = if denom > 1e-6 {
        ((b * f - c) / denom, (f - b * c) / denom)
    } else {
        (0.0, f)
    };
    let s = s.clamp(-ha[i], ha[i]);
    let t = t.clamp(-hb[j], hb[j]);
    ((on_a + da * s) + (on_b + db * t)) * 0.5
}
