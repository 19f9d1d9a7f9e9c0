use std::collections::HashMap;

use labscene_common::{BodyId, ProxyHandle};
use labscene_kernel::World;
use labscene_render::{ProxyRenderer, RenderError};

/// Association between a body and its visual proxy.
///
/// `proxy == None` is a collision-only body (invisible barrier); it is a
/// valid binding that synchronization skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyBinding {
    pub body: BodyId,
    pub proxy: Option<ProxyHandle>,
    /// Auxiliary entities can be hidden as a group.
    pub auxiliary: bool,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("{0} is not in the world")]
    UnknownBody(BodyId),
    #[error("{0} is already bound")]
    AlreadyBound(BodyId),
    #[error("{proxy} is already bound to {body}")]
    ProxyInUse { proxy: ProxyHandle, body: BodyId },
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("binding for {0} has no body in the world")]
    MissingBody(BodyId),
    #[error("renderer rejected update of {proxy} for {body}")]
    Render {
        body: BodyId,
        proxy: ProxyHandle,
        #[source]
        source: RenderError,
    },
}

/// One-to-one registry of body/proxy bindings.
///
/// Bindings are kept in insertion order, which is also the order in which
/// poses are pushed to the renderer.
#[derive(Debug)]
pub struct ProxyRegistry {
    bindings: Vec<ProxyBinding>,
    by_body: HashMap<BodyId, usize>,
    by_proxy: HashMap<ProxyHandle, BodyId>,
    auxiliary_visible: bool,
}

impl Default for ProxyRegistry {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
            by_body: HashMap::new(),
            by_proxy: HashMap::new(),
            auxiliary_visible: true,
        }
    }
}

impl ProxyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `body` to `proxy` (or to nothing, for collision-only bodies).
    ///
    /// A body binds exactly once and a proxy belongs to one body. On error
    /// nothing is recorded.
    pub fn bind(
        &mut self,
        world: &World,
        body: BodyId,
        proxy: Option<ProxyHandle>,
        auxiliary: bool,
    ) -> Result<&ProxyBinding, RegistryError> {
        if !world.contains(body) {
            return Err(RegistryError::UnknownBody(body));
        }
        if self.by_body.contains_key(&body) {
            return Err(RegistryError::AlreadyBound(body));
        }
        if let Some(proxy) = proxy {
            if let Some(owner) = self.by_proxy.get(&proxy) {
                return Err(RegistryError::ProxyInUse {
                    proxy,
                    body: *owner,
                });
            }
            self.by_proxy.insert(proxy, body);
        }

        let index = self.bindings.len();
        self.bindings.push(ProxyBinding {
            body,
            proxy,
            auxiliary,
            visible: !auxiliary || self.auxiliary_visible,
        });
        self.by_body.insert(body, index);
        Ok(&self.bindings[index])
    }

    /// Binding for `body`, if it was bound.
    pub fn binding(&self, body: BodyId) -> Option<&ProxyBinding> {
        self.by_body.get(&body).map(|&i| &self.bindings[i])
    }

    /// Proxy of `body`; `None` for unbound and collision-only bodies.
    pub fn proxy_of(&self, body: BodyId) -> Option<ProxyHandle> {
        self.binding(body).and_then(|b| b.proxy)
    }

    /// Body a proxy stands for.
    pub fn body_of(&self, proxy: ProxyHandle) -> Option<BodyId> {
        self.by_proxy.get(&proxy).copied()
    }

    /// Bindings in insertion order.
    pub fn bindings(&self) -> &[ProxyBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Whether auxiliary proxies are currently shown.
    pub fn auxiliary_visible(&self) -> bool {
        self.auxiliary_visible
    }

    /// Every binding points at a live body and every body has a binding.
    pub fn is_consistent(&self, world: &World) -> bool {
        self.bindings.len() == world.body_count()
            && self.bindings.iter().all(|b| world.contains(b.body))
    }

    /// Copy each bound body's current pose into its proxy, in insertion
    /// order. Returns the number of proxies updated.
    pub fn sync_all(
        &self,
        world: &World,
        renderer: &mut dyn ProxyRenderer,
    ) -> Result<usize, SyncError> {
        let mut synced = 0;
        for binding in &self.bindings {
            let body = world
                .body(binding.body)
                .ok_or(SyncError::MissingBody(binding.body))?;
            let Some(proxy) = binding.proxy else {
                continue;
            };
            renderer
                .set_proxy_pose(proxy, body.pose())
                .map_err(|source| SyncError::Render {
                    body: binding.body,
                    proxy,
                    source,
                })?;
            synced += 1;
        }
        Ok(synced)
    }

    /// Show or hide every auxiliary entity. Returns how many proxies changed.
    pub fn set_auxiliary_visible(
        &mut self,
        visible: bool,
        renderer: &mut dyn ProxyRenderer,
    ) -> Result<usize, SyncError> {
        self.auxiliary_visible = visible;
        let mut changed = 0;
        for binding in self.bindings.iter_mut().filter(|b| b.auxiliary) {
            if binding.visible == visible {
                continue;
            }
            binding.visible = visible;
            if let Some(proxy) = binding.proxy {
                renderer
                    .set_proxy_visible(proxy, visible)
                    .map_err(|source| SyncError::Render {
                        body: binding.body,
                        proxy,
                        source,
                    })?;
                changed += 1;
            }
        }
        tracing::debug!(visible, changed, "auxiliary visibility updated");
        Ok(changed)
    }

    /// Drop every binding and destroy the proxies they held.
    pub fn clear(&mut self, renderer: &mut dyn ProxyRenderer) {
        for binding in self.bindings.drain(..) {
            if let Some(proxy) = binding.proxy {
                renderer.destroy_proxy(proxy);
            }
        }
        self.by_body.clear();
        self.by_proxy.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use labscene_common::{MassClass, Shape, ShapeDescriptor};
    use labscene_kernel::BodyDesc;
    use labscene_render::{DebugTextRenderer, ProxyRequest};

    fn ball(world: &mut World, y: f32) -> BodyId {
        world.add_body(
            BodyDesc::new(Shape::Sphere { radius: 0.5 }, MassClass::dynamic(1.0))
                .with_position(Vec3::new(0.0, y, 0.0)),
        )
    }

    fn proxy(renderer: &mut DebugTextRenderer) -> ProxyHandle {
        renderer
            .create_proxy(&ProxyRequest {
                shape: ShapeDescriptor::sphere(0.5),
                pose: Default::default(),
                visible: true,
            })
            .unwrap()
    }

    #[test]
    fn bind_unknown_body_fails() {
        let world = World::default();
        let mut registry = ProxyRegistry::new();
        let err = registry.bind(&world, BodyId(7), None, false).unwrap_err();
        assert_eq!(err, RegistryError::UnknownBody(BodyId(7)));
        assert!(registry.is_empty());
    }

    #[test]
    fn double_bind_fails_without_side_effects() {
        let mut world = World::default();
        let mut renderer = DebugTextRenderer::new();
        let mut registry = ProxyRegistry::new();
        let body = ball(&mut world, 1.0);
        let p1 = proxy(&mut renderer);
        let p2 = proxy(&mut renderer);
        registry.bind(&world, body, Some(p1), false).unwrap();
        let err = registry.bind(&world, body, Some(p2), false).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyBound(body));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.proxy_of(body), Some(p1));
        assert_eq!(registry.body_of(p2), None);
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn proxy_belongs_to_one_body() {
        let mut world = World::default();
        let mut renderer = DebugTextRenderer::new();
        let mut registry = ProxyRegistry::new();
        let a = ball(&mut world, 1.0);
        let b = ball(&mut world, 3.0);
        let p = proxy(&mut renderer);
        registry.bind(&world, a, Some(p), false).unwrap();
        let err = registry.bind(&world, b, Some(p), false).unwrap_err();
        assert_eq!(err, RegistryError::ProxyInUse { proxy: p, body: a });
        assert!(registry.binding(b).is_none());
    }

    #[test]
    fn sync_copies_pose_and_is_idempotent() {
        let mut world = World::default();
        let mut renderer = DebugTextRenderer::new();
        let mut registry = ProxyRegistry::new();
        let body = ball(&mut world, 5.0);
        let p = proxy(&mut renderer);
        registry.bind(&world, body, Some(p), false).unwrap();

        for _ in 0..10 {
            world.step(1.0 / 60.0, 1.0 / 60.0, 3).unwrap();
        }
        assert_eq!(registry.sync_all(&world, &mut renderer).unwrap(), 1);
        let first = renderer.proxy(p).unwrap().pose;
        assert_eq!(first, *world.body(body).unwrap().pose());

        registry.sync_all(&world, &mut renderer).unwrap();
        assert_eq!(renderer.proxy(p).unwrap().pose, first);
    }

    #[test]
    fn collision_only_bindings_are_skipped() {
        let mut world = World::default();
        let mut renderer = DebugTextRenderer::new();
        let mut registry = ProxyRegistry::new();
        let wall = ball(&mut world, 0.0);
        let visible = ball(&mut world, 2.0);
        let p = proxy(&mut renderer);
        registry.bind(&world, wall, None, false).unwrap();
        registry.bind(&world, visible, Some(p), false).unwrap();
        assert_eq!(registry.sync_all(&world, &mut renderer).unwrap(), 1);
        assert!(registry.is_consistent(&world));
    }

    #[test]
    fn sync_reports_missing_body() {
        let mut world = World::default();
        let mut renderer = DebugTextRenderer::new();
        let mut registry = ProxyRegistry::new();
        let body = ball(&mut world, 1.0);
        registry.bind(&world, body, None, false).unwrap();
        assert!(world.undo_add_body(body));
        assert!(!registry.is_consistent(&world));
        assert!(matches!(
            registry.sync_all(&world, &mut renderer),
            Err(SyncError::MissingBody(id)) if id == body
        ));
    }

    #[test]
    fn bindings_keep_insertion_order() {
        let mut world = World::default();
        let mut registry = ProxyRegistry::new();
        let ids: Vec<BodyId> = (0..4).map(|i| ball(&mut world, i as f32 * 2.0)).collect();
        for id in ids.iter().rev() {
            registry.bind(&world, *id, None, false).unwrap();
        }
        let order: Vec<BodyId> = registry.bindings().iter().map(|b| b.body).collect();
        assert_eq!(order, ids.iter().rev().copied().collect::<Vec<_>>());
        assert_eq!(registry.binding(ids[3]).unwrap().body, ids[3]);
    }

    #[test]
    fn auxiliary_visibility_toggles_only_auxiliary_proxies() {
        let mut world = World::default();
        let mut renderer = DebugTextRenderer::new();
        let mut registry = ProxyRegistry::new();
        let regular = ball(&mut world, 1.0);
        let helper = ball(&mut world, 3.0);
        let (p1, p2) = (proxy(&mut renderer), proxy(&mut renderer));
        registry.bind(&world, regular, Some(p1), false).unwrap();
        registry.bind(&world, helper, Some(p2), true).unwrap();

        assert_eq!(registry.set_auxiliary_visible(false, &mut renderer).unwrap(), 1);
        assert!(renderer.proxy(p1).unwrap().visible);
        assert!(!renderer.proxy(p2).unwrap().visible);
        assert!(!registry.binding(helper).unwrap().visible);

        // Repeating the same request changes nothing.
        assert_eq!(registry.set_auxiliary_visible(false, &mut renderer).unwrap(), 0);
    }

    #[test]
    fn new_auxiliary_bindings_follow_current_visibility() {
        let mut world = World::default();
        let mut renderer = DebugTextRenderer::new();
        let mut registry = ProxyRegistry::new();
        registry.set_auxiliary_visible(false, &mut renderer).unwrap();
        let helper = ball(&mut world, 3.0);
        let binding = registry.bind(&world, helper, None, true).unwrap();
        assert!(!binding.visible);
    }

    #[test]
    fn clear_destroys_proxies() {
        let mut world = World::default();
        let mut renderer = DebugTextRenderer::new();
        let mut registry = ProxyRegistry::new();
        let body = ball(&mut world, 1.0);
        let p = proxy(&mut renderer);
        registry.bind(&world, body, Some(p), false).unwrap();
        registry.clear(&mut renderer);
        assert!(registry.is_empty());
        assert_eq!(renderer.proxy_count(), 0);
    }
}
