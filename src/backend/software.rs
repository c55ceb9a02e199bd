//! Software rendering backend.
//!
//! Renders on the CPU so the camera pipeline can run and be tested without GPU
//! hardware. Scene renderables (ground, spheres, flags) are ray cast from the scene
//! camera; screen quads are drawn afterwards in queue order. Pixels are stored as one
//! `u32` word per pixel whose in-memory bytes follow the target's [`PixelFormat`].

use std::collections::HashMap;
use std::f32::consts::TAU;

use glam::Vec3;

use crate::backend::surface::{DisplaySurface, HeadlessSurface};
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::scene::Camera;

/// Direction towards the scene's single light
const LIGHT_DIRECTION: Vec3 = Vec3::new(0.2, 0.8, 0.5);
const AMBIENT: f32 = 0.5;

/// Field markings half width in world units
const LINE_HALF_WIDTH: f32 = 0.06;
const FIELD_HALF_LENGTH: f32 = 30.0;
const FIELD_HALF_WIDTH: f32 = 20.0;
const FIELD_CENTER_Z: f32 = -1.27;
const CENTER_CIRCLE_RADIUS: f32 = 3.0;

/// Radius of the cloth marker at the top of a flag pole
const FLAG_MARKER_RADIUS: f32 = 0.35;
const FLAG_SWAY: f32 = 0.4;

struct SoftTarget {
    desc: TargetDescriptor,
    words: Vec<u32>,
    viewports: Vec<(ViewportHandle, ViewportDescriptor)>,
    locked: bool,
    last_drawn: Vec<RenderableHandle>,
}

impl SoftTarget {
    fn fill(&mut self, color: Vec3) {
        let word = u32::from_ne_bytes(self.desc.format.encode(color));
        self.words.fill(word);
    }

    fn color_at(&self, x: u32, y: u32) -> Vec3 {
        let word = self.words[(y * self.desc.width + x) as usize];
        self.desc.format.decode(word.to_ne_bytes())
    }

    fn put(&mut self, x: u32, y: u32, color: Vec3) {
        let idx = (y * self.desc.width + x) as usize;
        self.words[idx] = u32::from_ne_bytes(self.desc.format.encode(color));
    }
}

struct SoftRenderable {
    desc: RenderableDescriptor,
    attached: bool,
    visible: bool,
    params: HashMap<&'static str, f32>,
    phase: f32,
}

impl SoftRenderable {
    fn drawable(&self) -> bool {
        self.attached && self.visible
    }
}

/// CPU implementation of [`RenderBackend`]
pub struct SoftwareBackend<S: DisplaySurface = HeadlessSurface> {
    surface: S,
    camera: Camera,
    targets: HashMap<TargetHandle, SoftTarget>,
    renderables: Vec<SoftRenderable>,
    next_id: u64,
    present_scratch: Vec<u32>,
    /// Indices of the ray cast renderables, rebuilt on every update
    scene_scratch: Vec<usize>,
    pending_failure: Option<String>,
    lock_count: u64,
    update_count: u64,
}

impl SoftwareBackend<HeadlessSurface> {
    /// Backend presenting to a [`HeadlessSurface`]
    pub fn headless() -> Self {
        Self::with_surface(HeadlessSurface::new())
    }
}

impl Default for SoftwareBackend<HeadlessSurface> {
    fn default() -> Self {
        Self::headless()
    }
}

impl<S: DisplaySurface> SoftwareBackend<S> {
    pub fn with_surface(surface: S) -> Self {
        Self {
            surface,
            camera: Camera::default(),
            targets: HashMap::new(),
            renderables: Vec::new(),
            next_id: 1,
            present_scratch: Vec::new(),
            scene_scratch: Vec::new(),
            pending_failure: None,
            lock_count: 0,
            update_count: 0,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Make the next [`update_target`](RenderBackend::update_target) fail.
    pub fn fail_next_update(&mut self, reason: &str) {
        self.pending_failure = Some(reason.to_string());
    }

    pub fn is_locked(&self, target: TargetHandle) -> bool {
        self.targets.get(&target).is_some_and(|t| t.locked)
    }

    /// Number of successful pixel locks so far
    pub fn lock_count(&self) -> u64 {
        self.lock_count
    }

    /// Number of completed target updates so far
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn viewport_count(&self, target: TargetHandle) -> usize {
        self.targets.get(&target).map_or(0, |t| t.viewports.len())
    }

    /// Renderables drawn by the last update of `target`, in draw order
    pub fn rendered_during_last_update(&self, target: TargetHandle) -> &[RenderableHandle] {
        self.targets
            .get(&target)
            .map_or(&[][..], |t| t.last_drawn.as_slice())
    }

    pub fn parameter(&self, renderable: RenderableHandle, name: &str) -> Option<f32> {
        self.renderable(renderable)
            .ok()
            .and_then(|r| r.params.get(name).copied())
    }

    /// Current kind of a renderable, reflecting any position updates
    pub fn renderable_kind(&self, renderable: RenderableHandle) -> Option<RenderableKind> {
        self.renderable(renderable).ok().map(|r| r.desc.kind)
    }

    /// Fill a target with a solid color, outside of any viewport
    pub fn fill(&mut self, target: TargetHandle, color: Vec3) -> BackendResult<()> {
        let soft = self.target_mut(target)?;
        if soft.locked {
            return Err(BackendError::TargetLocked(target));
        }
        soft.fill(color);
        Ok(())
    }

    fn target(&self, target: TargetHandle) -> BackendResult<&SoftTarget> {
        self.targets
            .get(&target)
            .ok_or(BackendError::UnknownTarget(target))
    }

    fn target_mut(&mut self, target: TargetHandle) -> BackendResult<&mut SoftTarget> {
        self.targets
            .get_mut(&target)
            .ok_or(BackendError::UnknownTarget(target))
    }

    fn renderable(&self, handle: RenderableHandle) -> BackendResult<&SoftRenderable> {
        self.renderables
            .get(handle.0 as usize)
            .ok_or(BackendError::UnknownRenderable(handle))
    }

    fn renderable_mut(&mut self, handle: RenderableHandle) -> BackendResult<&mut SoftRenderable> {
        self.renderables
            .get_mut(handle.0 as usize)
            .ok_or(BackendError::UnknownRenderable(handle))
    }

    fn render_into(&mut self, handle: TargetHandle, target: &mut SoftTarget) -> BackendResult<()> {
        if target.locked {
            return Err(BackendError::TargetLocked(handle));
        }
        if let Some(reason) = self.pending_failure.take() {
            return Err(BackendError::RenderFailed(reason));
        }

        let mut scene = std::mem::take(&mut self.scene_scratch);
        scene.clear();
        scene.extend(self.renderables.iter().enumerate().filter_map(|(i, r)| {
            let ray_cast = !matches!(r.desc.kind, RenderableKind::ScreenQuad { .. });
            (r.drawable() && ray_cast).then_some(i)
        }));
        let result = self.draw_viewports(handle, target, &scene);
        self.scene_scratch = scene;
        result?;

        self.update_count += 1;
        log::trace!(
            "SoftwareBackend: updated {:?} ({} viewports, {} renderables drawn)",
            target.desc.label,
            target.viewports.len(),
            target.last_drawn.len()
        );
        Ok(())
    }

    fn draw_viewports(
        &self,
        handle: TargetHandle,
        target: &mut SoftTarget,
        scene: &[usize],
    ) -> BackendResult<()> {
        target.last_drawn.clear();
        for i in 0..target.viewports.len() {
            let viewport = target.viewports[i].1;
            if viewport.clear_every_frame {
                target.fill(viewport.background);
            }
            self.draw_scene(target, scene);
            self.draw_quads(handle, target, RenderQueue::Main)?;
            if viewport.overlays_enabled {
                self.draw_quads(handle, target, RenderQueue::Overlay)?;
            }
        }
        Ok(())
    }

    fn draw_scene(&self, target: &mut SoftTarget, scene: &[usize]) {
        if scene.is_empty() {
            return;
        }
        target
            .last_drawn
            .extend(scene.iter().map(|&i| RenderableHandle(i as u64)));

        let (width, height) = (target.desc.width, target.desc.height);
        let basis = self.camera.ray_basis(width as f32 / height as f32);
        let light = LIGHT_DIRECTION.normalize();
        for y in 0..height {
            let ndc_y = 1.0 - (y as f32 + 0.5) / height as f32 * 2.0;
            for x in 0..width {
                let ndc_x = (x as f32 + 0.5) / width as f32 * 2.0 - 1.0;
                let dir = basis.ray(ndc_x, ndc_y);
                if let Some(color) = trace(&self.renderables, scene, basis.origin(), dir, light) {
                    target.put(x, y, color);
                }
            }
        }
    }

    fn draw_quads(
        &self,
        handle: TargetHandle,
        target: &mut SoftTarget,
        queue: RenderQueue,
    ) -> BackendResult<()> {
        for (i, renderable) in self.renderables.iter().enumerate() {
            if !renderable.drawable() || renderable.desc.queue != queue {
                continue;
            }
            let RenderableKind::ScreenQuad { rect, material } = renderable.desc.kind else {
                continue;
            };
            let (x0, y0, x1, y1) = rect.to_pixels(target.desc.width, target.desc.height);
            match material {
                QuadMaterial::Solid(color) => {
                    for y in y0..y1 {
                        for x in x0..x1 {
                            target.put(x, y, color);
                        }
                    }
                }
                QuadMaterial::NoiseGenerator => {
                    let seed = renderable.params.get("seed").copied().unwrap_or(0.0);
                    let seed_bits = seed.to_bits();
                    for y in y0..y1 {
                        for x in x0..x1 {
                            target.put(x, y, Vec3::splat(noise_value(x, y, seed_bits)));
                        }
                    }
                }
                QuadMaterial::TargetOverlay { source, opacity } => {
                    if source == handle {
                        return Err(BackendError::RenderFailed(format!(
                            "overlay on {:?} samples its own target",
                            target.desc.label
                        )));
                    }
                    let src = self.target(source)?;
                    let (sw, sh) = (src.desc.width, src.desc.height);
                    let (dw, dh) = (target.desc.width, target.desc.height);
                    for y in y0..y1 {
                        for x in x0..x1 {
                            let sample = src.color_at(x * sw / dw, y * sh / dh);
                            let blended = target.color_at(x, y).lerp(sample, opacity);
                            target.put(x, y, blended);
                        }
                    }
                }
            }
            target.last_drawn.push(RenderableHandle(i as u64));
        }
        Ok(())
    }
}

/// Nearest hit color along a ray, if anything is hit
fn trace(
    renderables: &[SoftRenderable],
    scene: &[usize],
    origin: Vec3,
    dir: Vec3,
    light: Vec3,
) -> Option<Vec3> {
    let mut nearest = f32::INFINITY;
    let mut hit_color = None;

    for renderable in scene.iter().map(|&i| &renderables[i]) {
        let hit = match renderable.desc.kind {
            RenderableKind::Ground {
                height,
                color,
                line_color,
            } => intersect_plane(origin, dir, height).map(|t| {
                let p = origin + dir * t;
                let base = if on_field_line(p.x, p.z) { line_color } else { color };
                (t, base * (AMBIENT + (1.0 - AMBIENT) * light.y.max(0.0)))
            }),
            RenderableKind::Sphere {
                center,
                radius,
                color,
            } => shade_sphere(origin, dir, center, radius, color, light),
            RenderableKind::Flag {
                base,
                height,
                color,
            } => {
                let sway = (renderable.phase * TAU).sin() * FLAG_SWAY;
                let marker = base + Vec3::new(sway, height, 0.0);
                shade_sphere(origin, dir, marker, FLAG_MARKER_RADIUS, color, light)
            }
            RenderableKind::ScreenQuad { .. } => None,
        };
        if let Some((t, color)) = hit {
            if t < nearest {
                nearest = t;
                hit_color = Some(color);
            }
        }
    }

    hit_color
}

fn intersect_plane(origin: Vec3, dir: Vec3, height: f32) -> Option<f32> {
    if dir.y >= -f32::EPSILON {
        return None;
    }
    let t = (height - origin.y) / dir.y;
    (t > 0.0).then_some(t)
}

fn shade_sphere(
    origin: Vec3,
    dir: Vec3,
    center: Vec3,
    radius: f32,
    color: Vec3,
    light: Vec3,
) -> Option<(f32, Vec3)> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    if t <= 0.0 {
        return None;
    }
    let normal = (origin + dir * t - center) / radius;
    let lambert = normal.dot(light).max(0.0);
    Some((t, color * (AMBIENT + (1.0 - AMBIENT) * lambert)))
}

fn on_field_line(x: f32, z: f32) -> bool {
    let z = z - FIELD_CENTER_Z;
    let inside = x.abs() <= FIELD_HALF_LENGTH + LINE_HALF_WIDTH
        && z.abs() <= FIELD_HALF_WIDTH + LINE_HALF_WIDTH;
    if !inside {
        return false;
    }
    let near = |value: f32, line: f32| (value - line).abs() <= LINE_HALF_WIDTH;
    near(x.abs(), FIELD_HALF_LENGTH)
        || near(z.abs(), FIELD_HALF_WIDTH)
        || near(x, 0.0)
        || near((x * x + z * z).sqrt(), CENTER_CIRCLE_RADIUS)
}

/// Hash of pixel coordinates and seed, uniform in `[0, 1)`
fn noise_value(x: u32, y: u32, seed: u32) -> f32 {
    let mut h = x.wrapping_mul(0x8da6_b343)
        ^ y.wrapping_mul(0xd816_3841)
        ^ seed.wrapping_mul(0xcb1a_b31f);
    h ^= h >> 13;
    h = h.wrapping_mul(0x5bd1_e995);
    h ^= h >> 15;
    (h >> 8) as f32 / (1u32 << 24) as f32
}

/// Convert a stored pixel word to `0x00RRGGBB`
fn to_0rgb(format: PixelFormat, word: u32) -> u32 {
    let b = word.to_ne_bytes();
    let (r, g, bl) = match format {
        PixelFormat::Bgrx8 | PixelFormat::Bgra8 => (b[2], b[1], b[0]),
        PixelFormat::Rgba8 | PixelFormat::Rgb8 => (b[0], b[1], b[2]),
    };
    (r as u32) << 16 | (g as u32) << 8 | bl as u32
}

impl<S: DisplaySurface> RenderBackend for SoftwareBackend<S> {
    fn name(&self) -> &'static str {
        "Software Backend"
    }

    fn create_target(&mut self, desc: &TargetDescriptor) -> BackendResult<TargetHandle> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::TargetCreationFailed(format!(
                "{:?}: zero-sized target",
                desc.label
            )));
        }
        if desc.format.bytes_per_pixel() != 4 {
            return Err(BackendError::TargetCreationFailed(format!(
                "{:?}: {:?} is not a 4-byte pixel format",
                desc.label, desc.format
            )));
        }
        log::trace!(
            "SoftwareBackend: creating target {:?} ({}x{} {:?})",
            desc.label,
            desc.width,
            desc.height,
            desc.format
        );

        let handle = TargetHandle(self.next_id);
        self.next_id += 1;
        let pixel_count = desc.width as usize * desc.height as usize;
        self.targets.insert(
            handle,
            SoftTarget {
                desc: desc.clone(),
                words: vec![u32::from_ne_bytes(desc.format.encode(Vec3::ZERO)); pixel_count],
                viewports: Vec::new(),
                locked: false,
                last_drawn: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn target_format(&self, target: TargetHandle) -> BackendResult<PixelFormat> {
        Ok(self.target(target)?.desc.format)
    }

    fn target_size(&self, target: TargetHandle) -> BackendResult<(u32, u32)> {
        let desc = &self.target(target)?.desc;
        Ok((desc.width, desc.height))
    }

    fn add_viewport(
        &mut self,
        target: TargetHandle,
        desc: &ViewportDescriptor,
    ) -> BackendResult<ViewportHandle> {
        let handle = ViewportHandle(self.next_id);
        self.next_id += 1;
        self.target_mut(target)?.viewports.push((handle, *desc));
        log::trace!("SoftwareBackend: added viewport {:?} to {:?}", handle, target);
        Ok(handle)
    }

    fn remove_viewport(
        &mut self,
        target: TargetHandle,
        viewport: ViewportHandle,
    ) -> BackendResult<()> {
        let soft = self.target_mut(target)?;
        let before = soft.viewports.len();
        soft.viewports.retain(|(h, _)| *h != viewport);
        if soft.viewports.len() == before {
            return Err(BackendError::UnknownViewport(viewport));
        }
        log::trace!("SoftwareBackend: removed viewport {:?} from {:?}", viewport, target);
        Ok(())
    }

    fn update_target(&mut self, target: TargetHandle) -> BackendResult<()> {
        let mut soft = self
            .targets
            .remove(&target)
            .ok_or(BackendError::UnknownTarget(target))?;
        let result = self.render_into(target, &mut soft);
        self.targets.insert(target, soft);
        result
    }

    fn lock_pixels(&mut self, target: TargetHandle) -> BackendResult<()> {
        let soft = self.target_mut(target)?;
        if soft.locked {
            return Err(BackendError::TargetLocked(target));
        }
        soft.locked = true;
        self.lock_count += 1;
        Ok(())
    }

    fn locked_pixels(&self, target: TargetHandle) -> BackendResult<&[u8]> {
        let soft = self.target(target)?;
        if !soft.locked {
            return Err(BackendError::TargetNotLocked(target));
        }
        Ok(bytemuck::cast_slice(&soft.words))
    }

    fn unlock_pixels(&mut self, target: TargetHandle) -> BackendResult<()> {
        let soft = self.target_mut(target)?;
        if !soft.locked {
            return Err(BackendError::TargetNotLocked(target));
        }
        soft.locked = false;
        Ok(())
    }

    fn set_camera(&mut self, camera: &Camera) {
        self.camera = camera.clone();
    }

    fn create_renderable(
        &mut self,
        desc: &RenderableDescriptor,
    ) -> BackendResult<RenderableHandle> {
        log::trace!("SoftwareBackend: creating renderable {:?}", desc.label);
        let handle = RenderableHandle(self.renderables.len() as u64);
        self.renderables.push(SoftRenderable {
            desc: desc.clone(),
            attached: false,
            visible: desc.visible,
            params: HashMap::new(),
            phase: 0.0,
        });
        Ok(handle)
    }

    fn attach(&mut self, renderable: RenderableHandle) -> BackendResult<()> {
        self.renderable_mut(renderable)?.attached = true;
        Ok(())
    }

    fn detach(&mut self, renderable: RenderableHandle) -> BackendResult<()> {
        self.renderable_mut(renderable)?.attached = false;
        Ok(())
    }

    fn is_attached(&self, renderable: RenderableHandle) -> bool {
        self.renderable(renderable).is_ok_and(|r| r.attached)
    }

    fn set_visible(&mut self, renderable: RenderableHandle, visible: bool) -> BackendResult<()> {
        self.renderable_mut(renderable)?.visible = visible;
        Ok(())
    }

    fn is_visible(&self, renderable: RenderableHandle) -> bool {
        self.renderable(renderable).is_ok_and(|r| r.visible)
    }

    fn set_parameter(
        &mut self,
        renderable: RenderableHandle,
        name: &'static str,
        value: f32,
    ) -> BackendResult<()> {
        self.renderable_mut(renderable)?.params.insert(name, value);
        Ok(())
    }

    fn set_position(&mut self, renderable: RenderableHandle, position: Vec3) -> BackendResult<()> {
        match &mut self.renderable_mut(renderable)?.desc.kind {
            RenderableKind::Sphere { center, .. } => *center = position,
            RenderableKind::Flag { base, .. } => *base = position,
            RenderableKind::Ground { height, .. } => *height = position.y,
            RenderableKind::ScreenQuad { .. } => {}
        }
        Ok(())
    }

    fn set_animation_phase(
        &mut self,
        renderable: RenderableHandle,
        phase: f32,
    ) -> BackendResult<()> {
        self.renderable_mut(renderable)?.phase = phase;
        Ok(())
    }

    fn present(&mut self, target: TargetHandle) -> BackendResult<()> {
        let soft = self
            .targets
            .get(&target)
            .ok_or(BackendError::UnknownTarget(target))?;
        let format = soft.desc.format;
        self.present_scratch.clear();
        self.present_scratch
            .extend(soft.words.iter().map(|&w| to_0rgb(format, w)));
        self.surface.present(
            &self.present_scratch,
            soft.desc.width as usize,
            soft.desc.height as usize,
        )
    }

    fn pump_messages(&mut self) {
        self.surface.pump_messages();
    }

    fn is_surface_closed(&self) -> bool {
        self.surface.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(material: QuadMaterial) -> RenderableDescriptor {
        RenderableDescriptor::new(
            "quad",
            RenderableKind::ScreenQuad {
                rect: ScreenRect::FULL_SCREEN,
                material,
            },
        )
    }

    fn read(backend: &mut SoftwareBackend, target: TargetHandle) -> Vec<u8> {
        backend.lock_pixels(target).unwrap();
        let bytes = backend.locked_pixels(target).unwrap().to_vec();
        backend.unlock_pixels(target).unwrap();
        bytes
    }

    #[test]
    fn test_rejects_three_byte_targets() {
        let mut backend = SoftwareBackend::headless();
        let result = backend.create_target(&TargetDescriptor::new("rgb", 4, 4, PixelFormat::Rgb8));
        assert!(matches!(result, Err(BackendError::TargetCreationFailed(_))));
    }

    #[test]
    fn test_clear_uses_viewport_background() {
        let mut backend = SoftwareBackend::headless();
        let target = backend
            .create_target(&TargetDescriptor::new("t", 2, 2, PixelFormat::Bgrx8))
            .unwrap();
        backend
            .add_viewport(
                target,
                &ViewportDescriptor {
                    background: Vec3::new(0.0, 0.0, 1.0),
                    ..Default::default()
                },
            )
            .unwrap();
        backend.update_target(target).unwrap();
        assert_eq!(read(&mut backend, target), [255, 0, 0, 255].repeat(4));
    }

    #[test]
    fn test_detached_or_hidden_quads_are_not_drawn() {
        let mut backend = SoftwareBackend::headless();
        let target = backend
            .create_target(&TargetDescriptor::new("t", 2, 2, PixelFormat::Bgrx8))
            .unwrap();
        backend.add_viewport(target, &ViewportDescriptor::default()).unwrap();
        let red = backend
            .create_renderable(&quad(QuadMaterial::Solid(Vec3::X)))
            .unwrap();

        backend.update_target(target).unwrap();
        assert!(backend.rendered_during_last_update(target).is_empty());

        backend.attach(red).unwrap();
        backend.set_visible(red, false).unwrap();
        backend.update_target(target).unwrap();
        assert!(backend.rendered_during_last_update(target).is_empty());

        backend.set_visible(red, true).unwrap();
        backend.update_target(target).unwrap();
        assert_eq!(backend.rendered_during_last_update(target), &[red]);
        assert_eq!(read(&mut backend, target), [0, 0, 255, 255].repeat(4));
    }

    #[test]
    fn test_overlay_queue_respects_viewport_setting() {
        let mut backend = SoftwareBackend::headless();
        let target = backend
            .create_target(&TargetDescriptor::new("t", 2, 2, PixelFormat::Bgrx8))
            .unwrap();
        backend
            .add_viewport(
                target,
                &ViewportDescriptor {
                    overlays_enabled: false,
                    ..Default::default()
                },
            )
            .unwrap();
        let overlay_desc = quad(QuadMaterial::Solid(Vec3::ONE)).with_queue(RenderQueue::Overlay);
        let overlay = backend.create_renderable(&overlay_desc).unwrap();
        backend.attach(overlay).unwrap();
        backend.update_target(target).unwrap();
        assert!(backend.rendered_during_last_update(target).is_empty());
    }

    #[test]
    fn test_scene_list_reused_between_updates() {
        let mut backend = SoftwareBackend::headless();
        let target = backend
            .create_target(&TargetDescriptor::new("t", 4, 4, PixelFormat::Bgrx8))
            .unwrap();
        backend.add_viewport(target, &ViewportDescriptor::default()).unwrap();
        let ground = backend
            .create_renderable(&RenderableDescriptor::new(
                "ground",
                RenderableKind::Ground {
                    height: 0.0,
                    color: Vec3::Y,
                    line_color: Vec3::ONE,
                },
            ))
            .unwrap();
        backend.attach(ground).unwrap();

        backend.update_target(target).unwrap();
        let capacity = backend.scene_scratch.capacity();
        backend.update_target(target).unwrap();
        assert_eq!(backend.scene_scratch.capacity(), capacity);
        assert_eq!(backend.scene_scratch, [ground.0 as usize]);
        assert_eq!(backend.rendered_during_last_update(target), &[ground]);
    }

    #[test]
    fn test_noise_depends_on_seed() {
        let mut backend = SoftwareBackend::headless();
        let target = backend
            .create_target(&TargetDescriptor::new("noise", 8, 8, PixelFormat::Bgrx8))
            .unwrap();
        backend.add_viewport(target, &ViewportDescriptor::default()).unwrap();
        let noise = backend
            .create_renderable(&quad(QuadMaterial::NoiseGenerator))
            .unwrap();
        backend.attach(noise).unwrap();

        backend.set_parameter(noise, "seed", 1.0).unwrap();
        backend.update_target(target).unwrap();
        let first = read(&mut backend, target);
        backend.update_target(target).unwrap();
        assert_eq!(read(&mut backend, target), first);

        backend.set_parameter(noise, "seed", 2.0).unwrap();
        backend.update_target(target).unwrap();
        assert_ne!(read(&mut backend, target), first);
    }

    #[test]
    fn test_overlay_blends_source_target() {
        let mut backend = SoftwareBackend::headless();
        let source = backend
            .create_target(&TargetDescriptor::new("src", 4, 4, PixelFormat::Bgrx8))
            .unwrap();
        let target = backend
            .create_target(&TargetDescriptor::new("dst", 2, 2, PixelFormat::Bgrx8))
            .unwrap();
        backend.fill(source, Vec3::ONE).unwrap();
        backend.add_viewport(target, &ViewportDescriptor::default()).unwrap();
        let overlay = backend
            .create_renderable(&quad(QuadMaterial::TargetOverlay {
                source,
                opacity: 1.0,
            }))
            .unwrap();
        backend.attach(overlay).unwrap();
        backend.update_target(target).unwrap();
        assert_eq!(read(&mut backend, target), [255u8; 4].repeat(4));
    }

    #[test]
    fn test_update_of_locked_target_fails() {
        let mut backend = SoftwareBackend::headless();
        let target = backend
            .create_target(&TargetDescriptor::new("t", 2, 2, PixelFormat::Bgrx8))
            .unwrap();
        backend.lock_pixels(target).unwrap();
        assert_eq!(
            backend.update_target(target),
            Err(BackendError::TargetLocked(target))
        );
        backend.unlock_pixels(target).unwrap();
        assert!(backend.update_target(target).is_ok());
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let mut backend = SoftwareBackend::headless();
        let target = backend
            .create_target(&TargetDescriptor::new("t", 2, 2, PixelFormat::Bgrx8))
            .unwrap();
        backend.fail_next_update("boom");
        assert_eq!(
            backend.update_target(target),
            Err(BackendError::RenderFailed("boom".into()))
        );
        assert!(backend.update_target(target).is_ok());
        assert_eq!(backend.update_count(), 1);
    }

    #[test]
    fn test_camera_sees_sphere_in_front() {
        let mut backend = SoftwareBackend::headless();
        let target = backend
            .create_target(&TargetDescriptor::new("t", 16, 16, PixelFormat::Bgrx8))
            .unwrap();
        backend.add_viewport(target, &ViewportDescriptor::default()).unwrap();
        let camera = Camera::new(Vec3::ZERO, 0.0, 0.0);
        let ball = backend
            .create_renderable(&RenderableDescriptor::new(
                "ball",
                RenderableKind::Sphere {
                    center: camera.direction() * 5.0,
                    radius: 1.0,
                    color: Vec3::ONE,
                },
            ))
            .unwrap();
        backend.attach(ball).unwrap();
        backend.set_camera(&camera);
        backend.update_target(target).unwrap();

        let pixels = read(&mut backend, target);
        let center = ((8 * 16 + 8) * 4) as usize;
        let corner = 0usize;
        assert!(pixels[center] > 0, "ball should cover the image center");
        assert_eq!(pixels[corner], 0, "corner should show the background");
    }

    #[test]
    fn test_present_reaches_surface() {
        let mut backend = SoftwareBackend::headless();
        let target = backend
            .create_target(&TargetDescriptor::new("t", 2, 2, PixelFormat::Bgrx8))
            .unwrap();
        backend.present(target).unwrap();
        assert_eq!(backend.surface().presented(), 1);
        assert!(!backend.is_surface_closed());
        backend.surface_mut().close();
        assert!(backend.is_surface_closed());
    }

    #[test]
    fn test_to_0rgb() {
        let word = u32::from_ne_bytes([0x10, 0x20, 0x30, 0xff]);
        assert_eq!(to_0rgb(PixelFormat::Bgrx8, word), 0x0030_2010);
        assert_eq!(to_0rgb(PixelFormat::Rgba8, word), 0x0010_2030);
    }
}
