//! Scene management
//!
//! The field content is deliberately minimal: a ground plane with markings, the
//! ball and four corner flags. Their handles are what the frame driver needs to push
//! world state into the backend each tick.

mod camera;

pub use camera::*;

use glam::Vec3;

use crate::backend::{
    BackendResult, RenderBackend, RenderableDescriptor, RenderableHandle, RenderableKind,
};

pub const BALL_RADIUS: f32 = 0.8;
pub const BALL_START: Vec3 = Vec3::new(22.0, BALL_RADIUS, 0.0);

/// Corner flag pole bases
pub const FLAG_POSITIONS: [Vec3; 4] = [
    Vec3::new(30.28, 0.0, -22.76),
    Vec3::new(-30.28, 0.0, -22.76),
    Vec3::new(-30.28, 0.0, 20.26),
    Vec3::new(30.28, 0.0, 20.26),
];
pub const FLAG_HEIGHT: f32 = 3.2;

const GRASS: Vec3 = Vec3::new(0.13, 0.55, 0.13);
const LINES: Vec3 = Vec3::new(0.95, 0.95, 0.95);
const BALL: Vec3 = Vec3::new(0.95, 0.95, 0.95);
const FLAG_CLOTH: Vec3 = Vec3::new(0.9, 0.85, 0.1);

/// Handles of the dynamic field content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldScene {
    pub ground: RenderableHandle,
    pub ball: RenderableHandle,
    pub flags: [RenderableHandle; 4],
}

impl FieldScene {
    /// Create and attach the field content in `backend`
    pub fn populate<B: RenderBackend + ?Sized>(backend: &mut B) -> BackendResult<Self> {
        let ground = spawn(
            backend,
            "ground",
            RenderableKind::Ground {
                height: 0.0,
                color: GRASS,
                line_color: LINES,
            },
        )?;
        let ball = spawn(
            backend,
            "ball",
            RenderableKind::Sphere {
                center: BALL_START,
                radius: BALL_RADIUS,
                color: BALL,
            },
        )?;

        let mut flags = [ball; 4];
        for (i, (slot, base)) in flags.iter_mut().zip(FLAG_POSITIONS).enumerate() {
            *slot = spawn(
                backend,
                &format!("flag{i}"),
                RenderableKind::Flag {
                    base,
                    height: FLAG_HEIGHT,
                    color: FLAG_CLOTH,
                },
            )?;
        }

        log::debug!("field scene populated in {}", backend.name());
        Ok(Self {
            ground,
            ball,
            flags,
        })
    }
}

fn spawn<B: RenderBackend + ?Sized>(
    backend: &mut B,
    label: &str,
    kind: RenderableKind,
) -> BackendResult<RenderableHandle> {
    let handle = backend.create_renderable(&RenderableDescriptor::new(label, kind))?;
    backend.attach(handle)?;
    Ok(handle)
}
