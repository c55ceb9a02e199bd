//! Sensor noise passes
//!
//! Two independent collaborators simulate sensor noise. [`NoiseCompositor`] renders a
//! procedural noise quad into a texture through a short-lived viewport.
//! [`ScreenNoiseOverlay`] blends that texture over the primary target, and is only
//! visible while the primary target is being updated. [`SensorNoise`] wires both into
//! the primary target's update as a [`RenderTargetListener`].

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::{
    BackendResult, QuadMaterial, RenderBackend, RenderQueue, RenderableDescriptor,
    RenderableHandle, RenderableKind, ScreenRect, TargetHandle, ViewportDescriptor,
    ViewportHandle,
};
use crate::config::NoiseConfig;
use crate::pipeline::RenderTargetListener;

/// Shader parameter the noise generator material reads its seed from
pub const NOISE_SEED_PARAM: &str = "seed";
/// Seeds are drawn uniformly from `[0, NOISE_SEED_RANGE)`
pub const NOISE_SEED_RANGE: f32 = 10_000_000.0;

/// Background of the noise pass viewport
const NOISE_BACKGROUND: Vec3 = Vec3::new(0.0, 0.0, 1.0);

/// Renders procedural noise into a target on demand
pub struct NoiseCompositor {
    quad: RenderableHandle,
    rng: StdRng,
}

impl NoiseCompositor {
    /// Create the noise quad in `backend`. It stays detached and hidden between passes.
    ///
    /// With a seed the sequence of per-pass noise seeds is reproducible.
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        seed: Option<u64>,
    ) -> BackendResult<Self> {
        let quad = backend.create_renderable(
            &RenderableDescriptor::new(
                "noise_generator",
                RenderableKind::ScreenQuad {
                    rect: ScreenRect::FULL_SCREEN,
                    material: QuadMaterial::NoiseGenerator,
                },
            )
            .with_visible(false),
        )?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { quad, rng })
    }

    pub fn quad(&self) -> RenderableHandle {
        self.quad
    }

    /// Render a fresh noise pattern into `target` and return the seed used.
    ///
    /// On return, successful or not, the temporary viewport is removed and the quad is
    /// hidden and detached.
    pub fn render_noise<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        target: TargetHandle,
    ) -> BackendResult<f32> {
        backend.attach(self.quad)?;
        let mut pass = NoisePass {
            backend,
            target,
            quad: self.quad,
            viewport: None,
        };

        let seed = self.rng.gen_range(0.0..NOISE_SEED_RANGE);
        pass.backend.set_parameter(self.quad, NOISE_SEED_PARAM, seed)?;
        pass.backend.set_visible(self.quad, true)?;
        pass.viewport = Some(pass.backend.add_viewport(
            target,
            &ViewportDescriptor {
                clear_every_frame: true,
                background: NOISE_BACKGROUND,
                overlays_enabled: false,
            },
        )?);
        pass.backend.update_target(target)?;

        log::trace!("noise pass into {:?} with seed {}", target, seed);
        Ok(seed)
    }
}

/// Undoes the noise pass setup when dropped
struct NoisePass<'a, B: RenderBackend + ?Sized> {
    backend: &'a mut B,
    target: TargetHandle,
    quad: RenderableHandle,
    viewport: Option<ViewportHandle>,
}

impl<B: RenderBackend + ?Sized> Drop for NoisePass<'_, B> {
    fn drop(&mut self) {
        if let Some(viewport) = self.viewport.take() {
            if let Err(e) = self.backend.remove_viewport(self.target, viewport) {
                log::warn!("noise pass: failed to remove viewport: {}", e);
            }
        }
        if let Err(e) = self.backend.set_visible(self.quad, false) {
            log::warn!("noise pass: failed to hide quad: {}", e);
        }
        if let Err(e) = self.backend.detach(self.quad) {
            log::warn!("noise pass: failed to detach quad: {}", e);
        }
    }
}

/// Persistent screen-space quad blending the noise texture over a target
pub struct ScreenNoiseOverlay {
    quad: RenderableHandle,
}

impl ScreenNoiseOverlay {
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        noise_texture: TargetHandle,
        config: &NoiseConfig,
    ) -> BackendResult<Self> {
        let quad = backend.create_renderable(
            &RenderableDescriptor::new(
                "screen_noise",
                RenderableKind::ScreenQuad {
                    rect: config.overlay_rect,
                    material: QuadMaterial::TargetOverlay {
                        source: noise_texture,
                        opacity: config.overlay_opacity,
                    },
                },
            )
            .with_queue(RenderQueue::Overlay)
            .with_visible(false),
        )?;
        backend.attach(quad)?;
        Ok(Self { quad })
    }

    pub fn quad(&self) -> RenderableHandle {
        self.quad
    }

    pub fn show<B: RenderBackend + ?Sized>(&self, backend: &mut B) -> BackendResult<()> {
        backend.set_visible(self.quad, true)
    }

    pub fn hide<B: RenderBackend + ?Sized>(&self, backend: &mut B) -> BackendResult<()> {
        backend.set_visible(self.quad, false)
    }
}

/// Sensor noise applied around every update of the primary target
pub struct SensorNoise {
    compositor: NoiseCompositor,
    overlay: ScreenNoiseOverlay,
    noise_texture: TargetHandle,
    refresh_each_frame: bool,
}

impl SensorNoise {
    pub fn new(
        compositor: NoiseCompositor,
        overlay: ScreenNoiseOverlay,
        noise_texture: TargetHandle,
        refresh_each_frame: bool,
    ) -> Self {
        Self {
            compositor,
            overlay,
            noise_texture,
            refresh_each_frame,
        }
    }

    pub fn compositor(&self) -> &NoiseCompositor {
        &self.compositor
    }

    pub fn overlay(&self) -> &ScreenNoiseOverlay {
        &self.overlay
    }

    pub fn noise_texture(&self) -> TargetHandle {
        self.noise_texture
    }
}

impl<B: RenderBackend + ?Sized> RenderTargetListener<B> for SensorNoise {
    fn pre_update(&mut self, backend: &mut B, _target: TargetHandle) -> BackendResult<()> {
        if self.refresh_each_frame {
            self.compositor.render_noise(backend, self.noise_texture)?;
        }
        self.overlay.show(backend)
    }

    fn post_update(&mut self, backend: &mut B, _target: TargetHandle) -> BackendResult<()> {
        self.overlay.hide(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, PixelFormat, SoftwareBackend, TargetDescriptor};
    use crate::pipeline::update_with_listener;

    fn noise_target(backend: &mut SoftwareBackend) -> TargetHandle {
        backend
            .create_target(&TargetDescriptor::new("noise", 8, 6, PixelFormat::Bgrx8))
            .unwrap()
    }

    #[test]
    fn test_quad_idle_between_passes() {
        let mut backend = SoftwareBackend::headless();
        let target = noise_target(&mut backend);
        let mut compositor = NoiseCompositor::new(&mut backend, Some(7)).unwrap();
        assert!(!backend.is_attached(compositor.quad()));
        assert!(!backend.is_visible(compositor.quad()));

        compositor.render_noise(&mut backend, target).unwrap();
        assert_eq!(backend.rendered_during_last_update(target), &[compositor.quad()]);
        assert!(!backend.is_attached(compositor.quad()));
        assert!(!backend.is_visible(compositor.quad()));
        assert_eq!(backend.viewport_count(target), 0);
    }

    #[test]
    fn test_cleanup_after_failed_render() {
        let mut backend = SoftwareBackend::headless();
        let target = noise_target(&mut backend);
        let mut compositor = NoiseCompositor::new(&mut backend, Some(7)).unwrap();

        backend.fail_next_update("device lost");
        let result = compositor.render_noise(&mut backend, target);
        assert_eq!(result, Err(BackendError::RenderFailed("device lost".into())));
        assert!(!backend.is_attached(compositor.quad()));
        assert!(!backend.is_visible(compositor.quad()));
        assert_eq!(backend.viewport_count(target), 0);
    }

    #[test]
    fn test_cleanup_when_target_locked() {
        let mut backend = SoftwareBackend::headless();
        let target = noise_target(&mut backend);
        let mut compositor = NoiseCompositor::new(&mut backend, None).unwrap();

        backend.lock_pixels(target).unwrap();
        assert!(compositor.render_noise(&mut backend, target).is_err());
        assert!(!backend.is_attached(compositor.quad()));
        assert_eq!(backend.viewport_count(target), 0);
    }

    #[test]
    fn test_seed_range_and_binding() {
        let mut backend = SoftwareBackend::headless();
        let target = noise_target(&mut backend);
        let mut compositor = NoiseCompositor::new(&mut backend, Some(42)).unwrap();
        let mut seeds = Vec::new();
        for _ in 0..32 {
            let seed = compositor.render_noise(&mut backend, target).unwrap();
            assert!((0.0..NOISE_SEED_RANGE).contains(&seed));
            assert_eq!(backend.parameter(compositor.quad(), NOISE_SEED_PARAM), Some(seed));
            seeds.push(seed);
        }
        seeds.dedup();
        assert!(seeds.len() > 1, "seed must change between passes");
    }

    #[test]
    fn test_seeded_compositors_agree() {
        let mut a = SoftwareBackend::headless();
        let mut b = SoftwareBackend::headless();
        let (ta, tb) = (noise_target(&mut a), noise_target(&mut b));
        let mut ca = NoiseCompositor::new(&mut a, Some(3)).unwrap();
        let mut cb = NoiseCompositor::new(&mut b, Some(3)).unwrap();
        assert_eq!(
            ca.render_noise(&mut a, ta).unwrap(),
            cb.render_noise(&mut b, tb).unwrap()
        );
    }

    #[test]
    fn test_overlay_visible_only_during_update() {
        let mut backend = SoftwareBackend::headless();
        let noise = noise_target(&mut backend);
        let primary = backend
            .create_target(&TargetDescriptor::new("primary", 8, 6, PixelFormat::Bgrx8))
            .unwrap();
        backend
            .add_viewport(primary, &ViewportDescriptor::default())
            .unwrap();

        let compositor = NoiseCompositor::new(&mut backend, Some(1)).unwrap();
        let overlay =
            ScreenNoiseOverlay::new(&mut backend, noise, &NoiseConfig::default()).unwrap();
        let quad = overlay.quad();
        assert!(backend.is_attached(quad));
        assert!(!backend.is_visible(quad));

        let mut sensor = SensorNoise::new(compositor, overlay, noise, true);
        update_with_listener(&mut backend, primary, &mut sensor).unwrap();
        assert!(backend.rendered_during_last_update(primary).contains(&quad));
        assert!(!backend.is_visible(quad));

        backend.fail_next_update("boom");
        // the refresh pass takes the failure, the primary render is skipped and the
        // overlay still ends up hidden
        let updates = backend.update_count();
        assert!(update_with_listener(&mut backend, primary, &mut sensor).is_err());
        assert!(!backend.is_visible(quad));
        assert_eq!(backend.update_count(), updates);
    }

    #[test]
    fn test_overlay_without_refresh_keeps_texture() {
        let mut backend = SoftwareBackend::headless();
        let noise = noise_target(&mut backend);
        let primary = backend
            .create_target(&TargetDescriptor::new("primary", 8, 6, PixelFormat::Bgrx8))
            .unwrap();
        backend
            .add_viewport(primary, &ViewportDescriptor::default())
            .unwrap();

        let compositor = NoiseCompositor::new(&mut backend, Some(1)).unwrap();
        let overlay =
            ScreenNoiseOverlay::new(&mut backend, noise, &NoiseConfig::default()).unwrap();
        let mut sensor = SensorNoise::new(compositor, overlay, noise, false);

        let before = backend.update_count();
        update_with_listener(&mut backend, primary, &mut sensor).unwrap();
        assert_eq!(backend.update_count(), before + 1);
    }
}
