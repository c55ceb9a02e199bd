//! Core backend abstraction traits
//!
//! The render engine is a collaborator of the camera pipeline. These traits are the
//! subset of its interface the pipeline drives: render targets with viewports,
//! renderables with visibility and shader parameters, synchronous target updates,
//! a scoped pixel-buffer read lock and the display surface.

use crate::backend::types::*;
use crate::scene::Camera;
use glam::Vec3;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create render target: {0}")]
    TargetCreationFailed(String),
    #[error("Unknown render target {0:?}")]
    UnknownTarget(TargetHandle),
    #[error("Unknown renderable {0:?}")]
    UnknownRenderable(RenderableHandle),
    #[error("Unknown viewport {0:?}")]
    UnknownViewport(ViewportHandle),
    #[error("Render target {0:?} is locked")]
    TargetLocked(TargetHandle),
    #[error("Render target {0:?} is not locked")]
    TargetNotLocked(TargetHandle),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Failed to present: {0}")]
    PresentFailed(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetHandle(pub(crate) u64);

/// Handle to a renderable object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderableHandle(pub(crate) u64);

/// Handle to a viewport on a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportHandle(pub(crate) u64);

/// Render engine interface driven by the camera pipeline
pub trait RenderBackend {
    /// Human readable backend name
    fn name(&self) -> &'static str;

    // Render targets

    /// Create a render target
    fn create_target(&mut self, desc: &TargetDescriptor) -> BackendResult<TargetHandle>;

    /// Pixel format of a target's color buffer
    fn target_format(&self, target: TargetHandle) -> BackendResult<PixelFormat>;

    /// Size of a target in pixels
    fn target_size(&self, target: TargetHandle) -> BackendResult<(u32, u32)>;

    /// Bind the scene camera to a target
    fn add_viewport(
        &mut self,
        target: TargetHandle,
        desc: &ViewportDescriptor,
    ) -> BackendResult<ViewportHandle>;

    /// Remove a viewport from a target
    fn remove_viewport(&mut self, target: TargetHandle, viewport: ViewportHandle)
        -> BackendResult<()>;

    /// Render every viewport of the target. Blocks until the pixels are written.
    fn update_target(&mut self, target: TargetHandle) -> BackendResult<()>;

    // Pixel access

    /// Acquire the read lock on a target's pixel buffer. Not reentrant.
    ///
    /// Prefer [`PixelReadLock`](crate::backend::PixelReadLock), which releases on drop.
    fn lock_pixels(&mut self, target: TargetHandle) -> BackendResult<()>;

    /// Pixel bytes of a locked target
    fn locked_pixels(&self, target: TargetHandle) -> BackendResult<&[u8]>;

    /// Release the read lock
    fn unlock_pixels(&mut self, target: TargetHandle) -> BackendResult<()>;

    // Scene

    /// Set the camera used by every viewport
    fn set_camera(&mut self, camera: &Camera);

    /// Create a renderable. New renderables start detached from the scene.
    fn create_renderable(&mut self, desc: &RenderableDescriptor)
        -> BackendResult<RenderableHandle>;

    /// Attach a renderable to the scene root
    fn attach(&mut self, renderable: RenderableHandle) -> BackendResult<()>;

    /// Detach a renderable from the scene root
    fn detach(&mut self, renderable: RenderableHandle) -> BackendResult<()>;

    fn is_attached(&self, renderable: RenderableHandle) -> bool;

    fn set_visible(&mut self, renderable: RenderableHandle, visible: bool) -> BackendResult<()>;

    fn is_visible(&self, renderable: RenderableHandle) -> bool;

    /// Set a named numeric shader parameter on the renderable's material
    fn set_parameter(
        &mut self,
        renderable: RenderableHandle,
        name: &'static str,
        value: f32,
    ) -> BackendResult<()>;

    /// Move a renderable
    fn set_position(&mut self, renderable: RenderableHandle, position: Vec3) -> BackendResult<()>;

    /// Set the normalized `[0, 1)` phase of a renderable's looping animation
    fn set_animation_phase(&mut self, renderable: RenderableHandle, phase: f32)
        -> BackendResult<()>;

    // Display surface

    /// Show the target on the display surface (swap buffers)
    fn present(&mut self, target: TargetHandle) -> BackendResult<()>;

    /// Process pending window system messages
    fn pump_messages(&mut self);

    /// Whether the display surface was closed externally
    fn is_surface_closed(&self) -> bool;
}
