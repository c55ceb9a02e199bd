//! Common types shared between backends

use glam::Vec3;

use crate::backend::traits::TargetHandle;

/// Pixel layout of a render target's color buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit blue, green, red, pad. The format the camera pipeline reads.
    Bgrx8,
    /// 8-bit blue, green, red, alpha
    Bgra8,
    /// 8-bit red, green, blue, alpha
    Rgba8,
    /// Packed 8-bit red, green, blue without padding
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Bgrx8 | PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }

    /// Encode a linear color in `[0, 1]` into this format's byte order.
    ///
    /// Only the first `bytes_per_pixel` bytes are meaningful.
    pub fn encode(&self, color: Vec3) -> [u8; 4] {
        let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).to_array();
        let (r, g, b) = (c[0] as u8, c[1] as u8, c[2] as u8);
        match self {
            PixelFormat::Bgrx8 | PixelFormat::Bgra8 => [b, g, r, 0xff],
            PixelFormat::Rgba8 => [r, g, b, 0xff],
            PixelFormat::Rgb8 => [r, g, b, 0],
        }
    }

    /// Decode bytes in this format back into a color in `[0, 1]`.
    pub fn decode(&self, bytes: [u8; 4]) -> Vec3 {
        let (r, g, b) = match self {
            PixelFormat::Bgrx8 | PixelFormat::Bgra8 => (bytes[2], bytes[1], bytes[0]),
            PixelFormat::Rgba8 | PixelFormat::Rgb8 => (bytes[0], bytes[1], bytes[2]),
        };
        Vec3::new(r as f32, g as f32, b as f32) / 255.0
    }
}

/// Render target descriptor
#[derive(Debug, Clone)]
pub struct TargetDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl TargetDescriptor {
    pub fn new(label: &str, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            label: Some(label.to_string()),
            width,
            height,
            format,
        }
    }
}

/// Viewport binding the scene camera to a render target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportDescriptor {
    /// Clear the target to `background` before drawing
    pub clear_every_frame: bool,
    pub background: Vec3,
    /// Draw renderables in the overlay queue
    pub overlays_enabled: bool,
}

impl Default for ViewportDescriptor {
    fn default() -> Self {
        Self {
            clear_every_frame: true,
            background: Vec3::ZERO,
            overlays_enabled: true,
        }
    }
}

/// Rectangle in normalized device coordinates (x right, y up, both in `[-1, 1]`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl ScreenRect {
    pub const FULL_SCREEN: Self = Self {
        left: -1.0,
        top: 1.0,
        right: 1.0,
        bottom: -1.0,
    };

    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Pixel bounds `(x0, y0, x1, y1)`, half-open, clipped to the target.
    pub fn to_pixels(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let to_x = |ndc: f32| (((ndc.clamp(-1.0, 1.0) + 1.0) * 0.5) * width as f32).round() as u32;
        let to_y = |ndc: f32| (((1.0 - ndc.clamp(-1.0, 1.0)) * 0.5) * height as f32).round() as u32;
        let (x0, x1) = (to_x(self.left.min(self.right)), to_x(self.left.max(self.right)));
        let (y0, y1) = (to_y(self.top.max(self.bottom)), to_y(self.top.min(self.bottom)));
        (x0, y0, x1, y1)
    }
}

/// Draw ordering group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderQueue {
    Main,
    /// Drawn last, and only by viewports with overlays enabled
    Overlay,
}

/// Material of a screen-space quad
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadMaterial {
    /// Procedural sensor noise. Reads the `seed` shader parameter.
    NoiseGenerator,
    /// Blends the contents of another render target over the destination.
    TargetOverlay { source: TargetHandle, opacity: f32 },
    Solid(Vec3),
}

/// What a renderable draws
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderableKind {
    /// Infinite horizontal plane with field markings
    Ground {
        height: f32,
        color: Vec3,
        line_color: Vec3,
    },
    Sphere {
        center: Vec3,
        radius: f32,
        color: Vec3,
    },
    /// Corner flag; the cloth marker sways with the animation phase
    Flag {
        base: Vec3,
        height: f32,
        color: Vec3,
    },
    ScreenQuad {
        rect: ScreenRect,
        material: QuadMaterial,
    },
}

/// Renderable descriptor
#[derive(Debug, Clone)]
pub struct RenderableDescriptor {
    pub label: Option<String>,
    pub kind: RenderableKind,
    pub queue: RenderQueue,
    pub visible: bool,
}

impl RenderableDescriptor {
    pub fn new(label: &str, kind: RenderableKind) -> Self {
        Self {
            label: Some(label.to_string()),
            kind,
            queue: RenderQueue::Main,
            visible: true,
        }
    }

    pub fn with_queue(mut self, queue: RenderQueue) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}
