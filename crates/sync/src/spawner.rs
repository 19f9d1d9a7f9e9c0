use glam::{Quat, Vec3};
use labscene_common::{BodyId, MassClass, MaterialTag, Pose, ProxyHandle, ShapeDescriptor};
use labscene_kernel::{BodyDesc, World};
use labscene_render::{ProxyRenderer, ProxyRequest, RenderError};
use serde::{Deserialize, Serialize};

use crate::random::RandomSource;
use crate::registry::{ProxyRegistry, RegistryError};

/// How a spawned body is represented visually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyMode {
    #[default]
    Visible,
    /// Visible helper that can be hidden as a group.
    Auxiliary,
    /// Invisible barrier: a body with no proxy at all.
    CollisionOnly,
}

/// Everything needed to create one body/proxy pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub shape: ShapeDescriptor,
    pub pose: Pose,
    pub mass: MassClass,
    pub material: MaterialTag,
    pub proxy: ProxyMode,
}

impl SpawnRequest {
    /// Unrotated, default material, visible proxy.
    pub fn new(shape: ShapeDescriptor, position: Vec3, mass: MassClass) -> Self {
        Self {
            shape,
            pose: Pose::from_position(position),
            mass,
            material: MaterialTag::default(),
            proxy: ProxyMode::Visible,
        }
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.pose.orientation = orientation;
        self
    }

    pub fn with_material(mut self, material: impl Into<MaterialTag>) -> Self {
        self.material = material.into();
        self
    }

    /// How the body is shown.
    pub fn with_proxy(mut self, proxy: ProxyMode) -> Self {
        self.proxy = proxy;
        self
    }
}

/// Result of a successful spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawned {
    pub body: BodyId,
    pub proxy: Option<ProxyHandle>,
}

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    #[error("renderer could not create a proxy")]
    Proxy(#[source] RenderError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Ranges for randomized spawns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnBounds {
    /// Smallest box edge and sphere radius.
    pub min_size: f32,
    /// Box edges are drawn from `[min_size, max_size)`.
    pub max_size: f32,
    /// Sphere radii are drawn from `[min_size, max_radius)`.
    pub max_radius: f32,
    /// Horizontal offsets are drawn from `[-extent, extent)` on x and z.
    pub horizontal_extent: f32,
    pub height: f32,
    pub mass: f32,
}

impl Default for SpawnBounds {
    fn default() -> Self {
        Self {
            min_size: 0.05,
            max_size: 1.0,
            max_radius: 0.5,
            horizontal_extent: 1.5,
            height: 3.0,
            mass: 1.0,
        }
    }
}

impl SpawnBounds {
    /// Reject non-finite values, empty size ranges and non-positive mass.
    pub fn validate(&self) -> Result<(), String> {
        let all = [
            self.min_size,
            self.max_size,
            self.max_radius,
            self.horizontal_extent,
            self.height,
            self.mass,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err("spawn bounds must be finite".into());
        }
        if self.min_size <= 0.0 {
            return Err(format!("min_size must be positive, got {}", self.min_size));
        }
        if self.max_size < self.min_size || self.max_radius < self.min_size {
            return Err("max_size and max_radius must not be below min_size".into());
        }
        if self.horizontal_extent < 0.0 {
            return Err("horizontal_extent must not be negative".into());
        }
        if self.mass <= 0.0 {
            return Err(format!("spawn mass must be positive, got {}", self.mass));
        }
        Ok(())
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn validate_shape(shape: &ShapeDescriptor) -> Result<(), SpawnError> {
    match *shape {
        ShapeDescriptor::Sphere { radius } if !(radius.is_finite() && radius > 0.0) => Err(
            SpawnError::InvalidShape(format!("sphere radius must be positive, got {radius}")),
        ),
        ShapeDescriptor::Box { size } if !(size.is_finite() && size.min_element() > 0.0) => Err(
            SpawnError::InvalidShape(format!("box size must be positive, got {size}")),
        ),
        _ => Ok(()),
    }
}

/// Creates body/proxy pairs atomically. Holds only its spawn bounds.
#[derive(Debug, Clone, Default)]
pub struct Spawner {
    bounds: SpawnBounds,
}

impl Spawner {
    /// Spawner drawing random requests from `bounds`.
    pub fn new(bounds: SpawnBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &SpawnBounds {
        &self.bounds
    }

    /// Add a body, create its proxy and bind the two.
    ///
    /// Either all three happen or none: a failed proxy takes the body back,
    /// a failed binding destroys the proxy and takes the body back. A rolled
    /// back body leaves nothing in the world's event log and its id is reused.
    pub fn spawn_body(
        &self,
        world: &mut World,
        registry: &mut ProxyRegistry,
        renderer: &mut dyn ProxyRenderer,
        request: SpawnRequest,
    ) -> Result<Spawned, SpawnError> {
        validate_shape(&request.shape)?;
        let auxiliary = request.proxy == ProxyMode::Auxiliary;

        let desc = BodyDesc::new(request.shape.to_shape(), request.mass)
            .with_pose(request.pose)
            .with_material(request.material);
        let body = world.add_body(desc);

        let proxy = match request.proxy {
            ProxyMode::CollisionOnly => None,
            ProxyMode::Visible | ProxyMode::Auxiliary => {
                let proxy_request = ProxyRequest {
                    shape: request.shape,
                    pose: request.pose,
                    visible: !auxiliary || registry.auxiliary_visible(),
                };
                match renderer.create_proxy(&proxy_request) {
                    Ok(handle) => Some(handle),
                    Err(err) => {
                        world.undo_add_body(body);
                        tracing::warn!(%body, error = %err, "proxy creation failed, spawn rolled back");
                        return Err(SpawnError::Proxy(err));
                    }
                }
            }
        };

        if let Err(err) = registry.bind(world, body, proxy, auxiliary) {
            if let Some(handle) = proxy {
                renderer.destroy_proxy(handle);
            }
            world.undo_add_body(body);
            tracing::warn!(%body, error = %err, "binding failed, spawn rolled back");
            return Err(err.into());
        }

        tracing::debug!(%body, ?proxy, mode = ?request.proxy, "spawned");
        Ok(Spawned { body, proxy })
    }

    /// Dynamic box with random edge lengths and horizontal offset.
    pub fn random_box(&self, rng: &mut dyn RandomSource) -> SpawnRequest {
        let b = &self.bounds;
        let size = Vec3::new(
            lerp(b.min_size, b.max_size, rng.next()),
            lerp(b.min_size, b.max_size, rng.next()),
            lerp(b.min_size, b.max_size, rng.next()),
        );
        let position = self.drop_point(rng, size.y * 0.5);
        SpawnRequest::new(
            ShapeDescriptor::Box { size },
            position,
            MassClass::dynamic(b.mass),
        )
    }

    /// Dynamic sphere with a random radius and horizontal offset.
    pub fn random_sphere(&self, rng: &mut dyn RandomSource) -> SpawnRequest {
        let b = &self.bounds;
        let radius = lerp(b.min_size, b.max_radius, rng.next());
        let position = self.drop_point(rng, radius);
        SpawnRequest::new(
            ShapeDescriptor::sphere(radius),
            position,
            MassClass::dynamic(b.mass),
        )
    }

    fn drop_point(&self, rng: &mut dyn RandomSource, half_height: f32) -> Vec3 {
        let extent = self.bounds.horizontal_extent;
        let x = (rng.next() * 2.0 - 1.0) * extent;
        let z = (rng.next() * 2.0 - 1.0) * extent;
        Vec3::new(x, self.bounds.height.max(half_height), z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{FixedSequence, SeededRandom};
    use labscene_common::Shape;
    use labscene_render::DebugTextRenderer;

    struct Fixture {
        world: World,
        registry: ProxyRegistry,
        renderer: DebugTextRenderer,
        spawner: Spawner,
    }

    impl Fixture {
        fn new(renderer: DebugTextRenderer) -> Self {
            Self {
                world: World::default(),
                registry: ProxyRegistry::new(),
                renderer,
                spawner: Spawner::default(),
            }
        }

        fn spawn(&mut self, request: SpawnRequest) -> Result<Spawned, SpawnError> {
            self.spawner.spawn_body(
                &mut self.world,
                &mut self.registry,
                &mut self.renderer,
                request,
            )
        }
    }

    fn ball_at(y: f32) -> SpawnRequest {
        SpawnRequest::new(
            ShapeDescriptor::sphere(0.5),
            Vec3::new(0.0, y, 0.0),
            MassClass::dynamic(1.0),
        )
    }

    #[test]
    fn n_spawns_give_n_bodies_and_bindings() {
        let mut f = Fixture::new(DebugTextRenderer::new());
        for i in 0..5 {
            f.spawn(ball_at(1.0 + i as f32)).unwrap();
        }
        assert_eq!(f.world.body_count(), 5);
        assert_eq!(f.registry.len(), 5);
        assert_eq!(f.renderer.proxy_count(), 5);
        assert!(f.registry.is_consistent(&f.world));
    }

    #[test]
    fn box_descriptor_becomes_half_extents() {
        let mut f = Fixture::new(DebugTextRenderer::new());
        let spawned = f
            .spawn(SpawnRequest::new(
                ShapeDescriptor::cuboid(2.0, 1.0, 0.5),
                Vec3::ZERO,
                MassClass::Static,
            ))
            .unwrap();
        let body = f.world.body(spawned.body).unwrap();
        assert_eq!(
            *body.shape(),
            Shape::Box {
                half_extents: Vec3::new(1.0, 0.5, 0.25)
            }
        );
        let proxy = f.renderer.proxy(spawned.proxy.unwrap()).unwrap();
        assert_eq!(proxy.shape, ShapeDescriptor::cuboid(2.0, 1.0, 0.5));
    }

    #[test]
    fn proxy_failure_rolls_back_the_body() {
        let mut f = Fixture::new(DebugTextRenderer::with_capacity(1));
        f.spawn(ball_at(1.0)).unwrap();
        let err = f.spawn(ball_at(3.0)).unwrap_err();
        assert!(matches!(err, SpawnError::Proxy(_)));
        assert_eq!(f.world.body_count(), 1);
        assert_eq!(f.registry.len(), 1);
        assert!(f.registry.is_consistent(&f.world));
        assert_eq!(f.world.events().len(), 1);
    }

    #[test]
    fn rolled_back_spawn_hands_its_id_to_the_next_one() {
        let mut f = Fixture::new(DebugTextRenderer::with_capacity(0));
        f.spawn(ball_at(1.0)).unwrap_err();
        let barrier = f
            .spawn(ball_at(1.0).with_proxy(ProxyMode::CollisionOnly))
            .unwrap();
        assert_eq!(barrier.body, BodyId(1));
        assert_eq!(
            f.world.events(),
            &[labscene_kernel::WorldEvent::BodyAdded { id: BodyId(1), mass: 1.0 }]
        );
    }

    #[test]
    fn collision_only_spawn_has_no_proxy() {
        let mut f = Fixture::new(DebugTextRenderer::with_capacity(0));
        let spawned = f
            .spawn(ball_at(1.0).with_proxy(ProxyMode::CollisionOnly))
            .unwrap();
        assert_eq!(spawned.proxy, None);
        assert_eq!(f.registry.binding(spawned.body).unwrap().proxy, None);
        assert_eq!(f.renderer.proxy_count(), 0);
    }

    #[test]
    fn auxiliary_spawn_respects_hidden_group() {
        let mut f = Fixture::new(DebugTextRenderer::new());
        f.registry
            .set_auxiliary_visible(false, &mut f.renderer)
            .unwrap();
        let spawned = f.spawn(ball_at(1.0).with_proxy(ProxyMode::Auxiliary)).unwrap();
        assert!(!f.renderer.proxy(spawned.proxy.unwrap()).unwrap().visible);
    }

    #[test]
    fn invalid_shape_is_rejected_before_anything_is_created() {
        let mut f = Fixture::new(DebugTextRenderer::new());
        let err = f
            .spawn(SpawnRequest::new(
                ShapeDescriptor::sphere(0.0),
                Vec3::ZERO,
                MassClass::dynamic(1.0),
            ))
            .unwrap_err();
        assert!(matches!(err, SpawnError::InvalidShape(_)));
        assert_eq!(f.world.body_count(), 0);
        assert_eq!(f.renderer.proxy_count(), 0);
    }

    #[test]
    fn random_requests_stay_in_bounds() {
        let spawner = Spawner::default();
        let mut rng = SeededRandom::new(3);
        for _ in 0..200 {
            let req = spawner.random_box(&mut rng);
            let ShapeDescriptor::Box { size } = req.shape else {
                panic!("expected a box");
            };
            assert!(size.min_element() >= 0.05 && size.max_element() < 1.0);
            let p = req.pose.position;
            assert!(p.x >= -1.5 && p.x < 1.5 && p.z >= -1.5 && p.z < 1.5);
            assert_eq!(p.y, 3.0);
            assert!(req.mass.mass() > 0.0);

            let req = spawner.random_sphere(&mut rng);
            let ShapeDescriptor::Sphere { radius } = req.shape else {
                panic!("expected a sphere");
            };
            assert!((0.05..0.5).contains(&radius));
        }
    }

    #[test]
    fn random_box_uses_samples_in_order() {
        let spawner = Spawner::default();
        let mut rng = FixedSequence::new([0.0, 0.5, 0.0, 0.5, 0.25]);
        let req = spawner.random_box(&mut rng);
        let ShapeDescriptor::Box { size } = req.shape else {
            panic!("expected a box");
        };
        assert_eq!(size.x, 0.05);
        assert!((size.y - 0.525).abs() < 1e-6);
        assert_eq!(size.z, 0.05);
        assert_eq!(req.pose.position, Vec3::new(0.0, 3.0, -0.75));
    }

    #[test]
    fn drop_height_clears_large_shapes() {
        let spawner = Spawner::new(SpawnBounds {
            height: 0.1,
            ..SpawnBounds::default()
        });
        let req = spawner.random_sphere(&mut FixedSequence::new([0.99, 0.5, 0.5]));
        let ShapeDescriptor::Sphere { radius } = req.shape else {
            panic!("expected a sphere");
        };
        assert!(req.pose.position.y >= radius);
    }

    #[test]
    fn bounds_validation() {
        assert!(SpawnBounds::default().validate().is_ok());
        let bad = SpawnBounds {
            min_size: 0.0,
            ..SpawnBounds::default()
        };
        assert!(bad.validate().is_err());
    }
}
