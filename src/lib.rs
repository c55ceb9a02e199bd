//! Camera Simulator - a synthetic robot camera
//!
//! Renders a simulated soccer field through a render backend and emits each frame
//! as packed YUYV 4:2:2, the format real camera drivers deliver to a vision stack.
//!
//! # Features
//! - Explicit per-tick frame driver with a lifecycle state machine
//! - Sensor noise: a procedural noise texture blended over every frame
//! - BGRX to YUYV conversion under a scoped pixel-buffer lock
//! - Frame sinks for in-process consumers, raw dumps and PNG snapshots
//! - CPU software backend, headless or with an optional preview window

pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod publish;
pub mod scene;
pub mod world;

pub use backend::{RenderBackend, SoftwareBackend};
pub use config::{NoiseConfig, SimulatorConfig, FRAME_HEIGHT, FRAME_WIDTH};
pub use driver::{
    Clock, ClosedReason, DriverState, FrameDriver, ManualClock, SystemClock, TickReport,
};
pub use error::{SimError, SimResult};
pub use pipeline::{FrameBuffer, YuyvConverter};
pub use publish::{FrameSink, LatestFrame, PublishedFrame, RawFileSink};
pub use world::{WorldState, WorldUpdater};
