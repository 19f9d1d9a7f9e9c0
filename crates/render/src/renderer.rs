use std::collections::BTreeMap;
use std::fmt::Write as _;

use labscene_common::{Pose, ProxyHandle, ShapeDescriptor};

/// What the renderer needs to build a visual proxy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProxyRequest {
    pub shape: ShapeDescriptor,
    pub pose: Pose,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("proxy creation failed: {0}")]
    ProxyCreation(String),
    #[error("unknown proxy {0}")]
    UnknownProxy(ProxyHandle),
    #[error("draw failed: {0}")]
    Draw(String),
}

/// Renderer-agnostic proxy interface. Every renderer backend implements it.
///
/// The renderer owns proxies; the simulation core only drives their pose and
/// visibility and asks for a frame.
pub trait ProxyRenderer {
    /// Build a proxy for a new body.
    fn create_proxy(&mut self, request: &ProxyRequest) -> Result<ProxyHandle, RenderError>;

    /// Release a proxy. Unknown handles are ignored.
    fn destroy_proxy(&mut self, handle: ProxyHandle);

    fn set_proxy_pose(&mut self, handle: ProxyHandle, pose: &Pose) -> Result<(), RenderError>;

    fn set_proxy_visible(&mut self, handle: ProxyHandle, visible: bool) -> Result<(), RenderError>;

    /// Draw the current scene.
    fn draw(&mut self) -> Result<(), RenderError>;
}

/// State the debug renderer keeps per proxy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProxyState {
    pub shape: ShapeDescriptor,
    pub pose: Pose,
    pub visible: bool,
}

/// Text renderer: keeps proxies in memory and formats each drawn frame as a
/// human-readable listing.
///
/// An optional capacity emulates resource exhaustion: creating a proxy past
/// it fails.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    proxies: BTreeMap<ProxyHandle, ProxyState>,
    next_handle: u64,
    capacity: Option<usize>,
    frames: u64,
    last_frame: String,
}

impl DebugTextRenderer {
    /// Renderer with no proxy limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer that refuses to hold more than `capacity` proxies.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// State of a live proxy.
    pub fn proxy(&self, handle: ProxyHandle) -> Option<&ProxyState> {
        self.proxies.get(&handle)
    }

    /// Number of live proxies.
    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }

    /// Number of frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Text of the last drawn frame.
    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }

    fn proxy_mut(&mut self, handle: ProxyHandle) -> Result<&mut ProxyState, RenderError> {
        self.proxies
            .get_mut(&handle)
            .ok_or(RenderError::UnknownProxy(handle))
    }
}

impl ProxyRenderer for DebugTextRenderer {
    fn create_proxy(&mut self, request: &ProxyRequest) -> Result<ProxyHandle, RenderError> {
        if let Some(capacity) = self.capacity {
            if self.proxies.len() >= capacity {
                return Err(RenderError::ProxyCreation(format!(
                    "capacity of {capacity} proxies reached"
                )));
            }
        }
        self.next_handle += 1;
        let handle = ProxyHandle(self.next_handle);
        self.proxies.insert(
            handle,
            ProxyState {
                shape: request.shape,
                pose: request.pose,
                visible: request.visible,
            },
        );
        tracing::trace!(%handle, "proxy created");
        Ok(handle)
    }

    fn destroy_proxy(&mut self, handle: ProxyHandle) {
        if self.proxies.remove(&handle).is_some() {
            tracing::trace!(%handle, "proxy destroyed");
        }
    }

    fn set_proxy_pose(&mut self, handle: ProxyHandle, pose: &Pose) -> Result<(), RenderError> {
        self.proxy_mut(handle)?.pose = *pose;
        Ok(())
    }

    fn set_proxy_visible(&mut self, handle: ProxyHandle, visible: bool) -> Result<(), RenderError> {
        self.proxy_mut(handle)?.visible = visible;
        Ok(())
    }

    fn draw(&mut self) -> Result<(), RenderError> {
        self.frames += 1;
        let visible = self.proxies.values().filter(|p| p.visible).count();
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "=== Frame {} (proxies={}, visible={}) ===",
            self.frames,
            self.proxies.len(),
            visible
        );
        for (handle, proxy) in self.proxies.iter().filter(|(_, p)| p.visible) {
            let p = proxy.pose.position;
            let q = proxy.pose.orientation;
            let _ = writeln!(
                out,
                "  [{handle}] {} pos=({:.2}, {:.2}, {:.2}) rot=({:.2}, {:.2}, {:.2}, {:.2})",
                shape_label(&proxy.shape),
                p.x,
                p.y,
                p.z,
                q.x,
                q.y,
                q.z,
                q.w
            );
        }
        self.last_frame = out;
        Ok(())
    }
}

fn shape_label(shape: &ShapeDescriptor) -> String {
    match shape {
        ShapeDescriptor::Sphere { radius } => format!("sphere r={radius:.2}"),
        ShapeDescriptor::Box { size } => {
            format!("box {:.2}x{:.2}x{:.2}", size.x, size.y, size.z)
        }
        ShapeDescriptor::Plane => "plane".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn request(shape: ShapeDescriptor) -> ProxyRequest {
        ProxyRequest {
            shape,
            pose: Pose::default(),
            visible: true,
        }
    }

    #[test]
    fn empty_frame() {
        let mut r = DebugTextRenderer::new();
        r.draw().unwrap();
        assert_eq!(r.frames(), 1);
        assert!(r.last_frame().contains("proxies=0"));
    }

    #[test]
    fn frame_lists_visible_proxies_with_pose() {
        let mut r = DebugTextRenderer::new();
        let ball = r.create_proxy(&request(ShapeDescriptor::sphere(0.5))).unwrap();
        let hidden = r.create_proxy(&request(ShapeDescriptor::cube(1.0))).unwrap();
        r.set_proxy_visible(hidden, false).unwrap();
        r.set_proxy_pose(ball, &Pose::from_position(Vec3::new(1.0, 2.0, 3.0)))
            .unwrap();
        r.draw().unwrap();
        let frame = r.last_frame();
        assert!(frame.contains("visible=1"));
        assert!(frame.contains("sphere r=0.50 pos=(1.00, 2.00, 3.00)"));
        assert!(!frame.contains("box"));
    }

    #[test]
    fn capacity_limits_proxy_creation() {
        let mut r = DebugTextRenderer::with_capacity(1);
        r.create_proxy(&request(ShapeDescriptor::Plane)).unwrap();
        let err = r.create_proxy(&request(ShapeDescriptor::Plane)).unwrap_err();
        assert!(matches!(err, RenderError::ProxyCreation(_)));
        assert_eq!(r.proxy_count(), 1);
    }

    #[test]
    fn unknown_proxy_is_an_error() {
        let mut r = DebugTextRenderer::new();
        let err = r.set_proxy_pose(ProxyHandle(42), &Pose::default()).unwrap_err();
        assert_eq!(err, RenderError::UnknownProxy(ProxyHandle(42)));
    }

    #[test]
    fn destroy_frees_capacity() {
        let mut r = DebugTextRenderer::with_capacity(1);
        let h = r.create_proxy(&request(ShapeDescriptor::Plane)).unwrap();
        r.destroy_proxy(h);
        r.destroy_proxy(h);
        assert!(r.create_proxy(&request(ShapeDescriptor::Plane)).is_ok());
    }
}
