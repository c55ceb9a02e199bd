//! Simulator configuration

use std::path::Path;

use glam::Vec3;

use crate::backend::{PixelFormat, ScreenRect};
use crate::error::{SimError, SimResult};
use crate::scene::Camera;

/// Output frame width in pixels
pub const FRAME_WIDTH: u32 = 640;
/// Output frame height in pixels
pub const FRAME_HEIGHT: u32 = 480;

/// Sensor noise settings
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseConfig {
    /// Regenerate the noise texture before every primary target update
    pub refresh_each_frame: bool,
    /// Blend factor of the screen-space noise overlay
    pub overlay_opacity: f32,
    /// Screen area covered by the overlay
    pub overlay_rect: ScreenRect,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            refresh_each_frame: true,
            overlay_opacity: 0.08,
            overlay_rect: ScreenRect::FULL_SCREEN,
        }
    }
}

/// Initial camera pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub position: Vec3,
    pub pitch: f32,
    pub yaw: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(-20.0, 8.0, -5.0),
            pitch: -0.18,
            yaw: 1.8,
        }
    }
}

impl CameraConfig {
    pub fn build(&self, width: u32, height: u32) -> Camera {
        let mut camera = Camera::new(self.position, self.pitch, self.yaw);
        camera.set_aspect(width as f32, height as f32);
        camera
    }
}

/// One entry of the resource location table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocation {
    pub group: String,
    /// Archive kind, e.g. `FileSystem` or `Zip`
    pub kind: String,
    pub path: String,
}

/// Asset search locations, as listed in a `resources.cfg` file.
///
/// ```text
/// # comment
/// [Essential]
/// Zip=media/packs/SdkTrays.zip
/// [General]
/// FileSystem=media/models
/// ```
///
/// Entries before the first section header belong to the `General` group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTable {
    locations: Vec<ResourceLocation>,
}

impl ResourceTable {
    pub fn parse(text: &str) -> SimResult<Self> {
        let mut group = String::from("General");
        let mut locations = Vec::new();

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[') {
                let name = name.strip_suffix(']').ok_or_else(|| {
                    SimError::Config(format!("line {}: unterminated section header", number + 1))
                })?;
                group = name.trim().to_string();
                continue;
            }
            let (kind, path) = line.split_once('=').ok_or_else(|| {
                SimError::Config(format!("line {}: expected `Kind=path`", number + 1))
            })?;
            locations.push(ResourceLocation {
                group: group.clone(),
                kind: kind.trim().to_string(),
                path: path.trim().to_string(),
            });
        }

        Ok(Self { locations })
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn locations(&self) -> &[ResourceLocation] {
        &self.locations
    }

    /// Locations registered for one group
    pub fn group<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ResourceLocation> + 'a {
        self.locations.iter().filter(move |l| l.group == name)
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Configuration for the camera simulator
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Preview window title
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Pixel format of the primary render target
    pub target_format: PixelFormat,
    /// Convert and publish a YUYV frame every tick
    pub publish_frames: bool,
    /// Worker threads of the host scheduler driving the tick loop
    pub scheduler_threads: usize,
    pub noise: NoiseConfig,
    pub camera: CameraConfig,
    /// Enable the slow camera yaw sway
    pub camera_sway: bool,
    /// Seed for the noise RNG. Entropy-seeded when `None`.
    pub noise_seed: Option<u64>,
    pub resources: ResourceTable,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            title: "Camera Simulator".to_string(),
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            target_format: PixelFormat::Bgrx8,
            publish_frames: true,
            scheduler_threads: 4,
            noise: NoiseConfig::default(),
            camera: CameraConfig::default(),
            camera_sway: false,
            noise_seed: None,
            resources: ResourceTable::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_target_format(mut self, format: PixelFormat) -> Self {
        self.target_format = format;
        self
    }

    pub fn with_publish_frames(mut self, publish: bool) -> Self {
        self.publish_frames = publish;
        self
    }

    pub fn with_noise(mut self, noise: NoiseConfig) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_camera_sway(mut self, enabled: bool) -> Self {
        self.camera_sway = enabled;
        self
    }

    pub fn with_noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = Some(seed);
        self
    }

    pub fn with_resources(mut self, resources: ResourceTable) -> Self {
        self.resources = resources;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SimError::Config(format!(
                "resolution {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.width % 2 != 0 {
            return Err(SimError::Config(format!(
                "width {} must be even for 4:2:2 output",
                self.width
            )));
        }
        if !(0.0..=1.0).contains(&self.noise.overlay_opacity) {
            return Err(SimError::Config(format!(
                "noise overlay opacity {} outside [0, 1]",
                self.noise.overlay_opacity
            )));
        }
        if self.scheduler_threads == 0 {
            return Err(SimError::Config("scheduler needs at least one thread".into()));
        }
        Ok(())
    }
}
