//! Camera system

use glam::Vec3;

/// Perspective projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect: 4.0 / 3.0,
        }
    }
}

/// Camera mounted in the robot's head.
///
/// Orientation is stored as pitch and yaw in radians. Yaw 0 looks down -Z, positive
/// pitch looks up.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub pitch: f32,
    pub yaw: f32,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            pitch: 0.0,
            yaw: 0.0,
            projection: Projection::default(),
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, pitch: f32, yaw: f32) -> Self {
        Self {
            position,
            pitch,
            yaw,
            projection: Projection::default(),
        }
    }

    /// Unit view direction
    pub fn direction(&self) -> Vec3 {
        let (sp, cp) = self.pitch.sin_cos();
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(sy * cp, sp, -cy * cp)
    }

    /// Turn about the world up axis. Positive angles turn left (counter-clockwise
    /// seen from above).
    pub fn yaw_by(&mut self, radians: f32) {
        self.yaw -= radians;
    }

    /// Update aspect ratio for the projection
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        self.projection.aspect = width / height;
    }

    /// Basis for generating primary rays through a target of the given aspect ratio
    pub fn ray_basis(&self, aspect: f32) -> RayBasis {
        let forward = self.direction();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        let tan_half = (self.projection.fov_y * 0.5).tan();
        RayBasis {
            origin: self.position,
            forward,
            right: right * tan_half * aspect,
            up: up * tan_half,
        }
    }
}

/// Precomputed camera frame for per-pixel ray generation
#[derive(Debug, Clone, Copy)]
pub struct RayBasis {
    origin: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
}

impl RayBasis {
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Unit ray direction through a point in normalized device coordinates
    pub fn ray(&self, ndc_x: f32, ndc_y: f32) -> Vec3 {
        (self.forward + self.right * ndc_x + self.up * ndc_y).normalize()
    }
}
