//! Frame driver
//!
//! Owns the backend and the world, and turns every [`FrameDriver::tick`] into one
//! camera frame. The lifecycle is an explicit state machine:
//!
//! ```text
//! Uninitialized --first tick--> Ready <--> Rendering
//!                                 |            |
//!                                 +---> Closed <+
//! ```
//!
//! Resources are created on the first tick and reused afterwards. Fatal errors and
//! a closed display surface move the driver to `Closed`, which is terminal. The cause
//! is kept as a [`ClosedReason`] and reported again by every later tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::backend::{
    PixelFormat, RenderBackend, TargetDescriptor, TargetHandle, ViewportDescriptor,
};
use crate::config::SimulatorConfig;
use crate::error::{SimError, SimResult};
use crate::pipeline::{
    update_with_listener, FrameBuffer, NoiseCompositor, ScreenNoiseOverlay, SensorNoise,
    YuyvConverter,
};
use crate::publish::{FrameSink, PublishedFrame};
use crate::scene::FieldScene;
use crate::world::{CosineSway, WorldState, WorldUpdater};

/// Lifecycle state of a [`FrameDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No resources created yet
    Uninitialized,
    /// Between ticks
    Ready,
    /// Inside a tick
    Rendering,
    /// Terminal
    Closed,
}

/// Why a driver reached [`DriverState::Closed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosedReason {
    SurfaceClosed,
    UnsupportedPixelFormat {
        expected: PixelFormat,
        found: PixelFormat,
    },
    /// Resources could not be created; holds the original error message
    InitializationFailed(String),
}

impl ClosedReason {
    /// The terminal cause behind a fatal error, `None` for recoverable ones
    fn from_fatal(error: &SimError) -> Option<Self> {
        match error {
            SimError::DisplaySurfaceClosed => Some(Self::SurfaceClosed),
            SimError::UnsupportedPixelFormat { expected, found } => {
                Some(Self::UnsupportedPixelFormat {
                    expected: *expected,
                    found: *found,
                })
            }
            SimError::InitializationFailed(message) => {
                Some(Self::InitializationFailed(message.clone()))
            }
            _ => None,
        }
    }

    /// The error a tick on a closed driver returns
    pub fn to_error(&self) -> SimError {
        match self {
            Self::SurfaceClosed => SimError::DisplaySurfaceClosed,
            Self::UnsupportedPixelFormat { expected, found } => SimError::UnsupportedPixelFormat {
                expected: *expected,
                found: *found,
            },
            Self::InitializationFailed(message) => SimError::InitializationFailed(message.clone()),
        }
    }
}

/// Monotonic time source
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Outcome of a successful tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// 1-based tick number
    pub frame_index: u64,
    /// Time since the previous tick, zero on the first
    pub dt: Duration,
    /// Total simulated time
    pub elapsed: Duration,
    /// Whether a frame was converted and handed to the sinks
    pub published: bool,
}

/// Resources created on the first tick
struct Pipeline {
    primary: TargetHandle,
    scene: FieldScene,
    sensor: SensorNoise,
    converter: YuyvConverter,
    frame: FrameBuffer,
}

impl Pipeline {
    fn build<B: RenderBackend>(backend: &mut B, config: &SimulatorConfig) -> SimResult<Self> {
        let (width, height) = (config.width, config.height);

        let primary = backend.create_target(&TargetDescriptor::new(
            "primary",
            width,
            height,
            config.target_format,
        ))?;
        backend.add_viewport(primary, &ViewportDescriptor::default())?;

        let noise_texture = backend.create_target(&TargetDescriptor::new(
            "noise_texture",
            width,
            height,
            PixelFormat::Bgrx8,
        ))?;

        let scene = FieldScene::populate(backend)?;

        let mut compositor = NoiseCompositor::new(backend, config.noise_seed)?;
        compositor.render_noise(backend, noise_texture)?;
        let overlay = ScreenNoiseOverlay::new(backend, noise_texture, &config.noise)?;
        let sensor = SensorNoise::new(
            compositor,
            overlay,
            noise_texture,
            config.noise.refresh_each_frame,
        );

        let converter = YuyvConverter::new(width, height)?;
        let frame = converter.frame();

        Ok(Self {
            primary,
            scene,
            sensor,
            converter,
            frame,
        })
    }

    fn sync_world<B: RenderBackend>(&self, backend: &mut B, world: &WorldState) -> SimResult<()> {
        backend.set_camera(&world.camera);
        backend.set_position(self.scene.ball, world.ball_position)?;
        for (flag, animation) in self.scene.flags.iter().zip(world.flags.iter()) {
            backend.set_animation_phase(*flag, animation.phase())?;
        }
        Ok(())
    }
}

/// Drives the camera simulation one frame per [`tick`](Self::tick)
pub struct FrameDriver<B: RenderBackend, C: Clock = SystemClock> {
    config: SimulatorConfig,
    backend: B,
    clock: C,
    state: DriverState,
    closed_by: Option<ClosedReason>,
    world: WorldState,
    updater: WorldUpdater,
    pipeline: Option<Pipeline>,
    sinks: Vec<Box<dyn FrameSink>>,
    last_tick: Option<Instant>,
    frame_index: u64,
}

impl<B: RenderBackend, C: Clock> FrameDriver<B, C> {
    pub fn new(config: SimulatorConfig, backend: B, clock: C) -> SimResult<Self> {
        config.validate()?;

        let world = WorldState::new(config.camera.build(config.width, config.height));
        let updater = if config.camera_sway {
            WorldUpdater::with_sway(CosineSway::default())
        } else {
            WorldUpdater::new()
        };

        Ok(Self {
            config,
            backend,
            clock,
            state: DriverState::Uninitialized,
            closed_by: None,
            world,
            updater,
            pipeline: None,
            sinks: Vec::new(),
            last_tick: None,
            frame_index: 0,
        })
    }

    /// Register a consumer of converted frames
    pub fn add_sink(&mut self, sink: impl FrameSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// What closed the driver, once it is [`DriverState::Closed`]
    pub fn closed_reason(&self) -> Option<&ClosedReason> {
        self.closed_by.as_ref()
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Mutable world access, e.g. to move the ball from outside the simulation
    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The most recently converted frame
    pub fn frame(&self) -> Option<&FrameBuffer> {
        self.pipeline.as_ref().map(|p| &p.frame)
    }

    pub fn primary_target(&self) -> Option<TargetHandle> {
        self.pipeline.as_ref().map(|p| p.primary)
    }

    pub fn scene(&self) -> Option<&FieldScene> {
        self.pipeline.as_ref().map(|p| &p.scene)
    }

    pub fn sensor_noise(&self) -> Option<&SensorNoise> {
        self.pipeline.as_ref().map(|p| &p.sensor)
    }

    /// Render, present and publish one frame
    pub fn tick(&mut self) -> SimResult<TickReport> {
        if let Some(reason) = &self.closed_by {
            return Err(reason.to_error());
        }

        let pipeline = match &mut self.pipeline {
            Some(pipeline) => pipeline,
            slot @ None => match Pipeline::build(&mut self.backend, &self.config) {
                Ok(pipeline) => {
                    log::info!(
                        "camera pipeline initialized on {} ({}x{} {:?}, {} resource locations, \
                         {} scheduler threads)",
                        self.backend.name(),
                        self.config.width,
                        self.config.height,
                        self.config.target_format,
                        self.config.resources.locations().len(),
                        self.config.scheduler_threads
                    );
                    self.state = DriverState::Ready;
                    slot.insert(pipeline)
                }
                Err(e) => {
                    log::error!("camera pipeline initialization failed: {}", e);
                    self.state = DriverState::Closed;
                    self.closed_by = Some(ClosedReason::InitializationFailed(e.to_string()));
                    return Err(e);
                }
            },
        };

        let now = self.clock.now();
        let dt = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_tick = Some(now);
        self.frame_index += 1;
        self.state = DriverState::Rendering;

        self.updater.advance(&mut self.world, dt);

        let publish = self.config.publish_frames;
        let result = (|| -> SimResult<()> {
            pipeline.sync_world(&mut self.backend, &self.world)?;
            update_with_listener(&mut self.backend, pipeline.primary, &mut pipeline.sensor)?;
            self.backend.present(pipeline.primary)?;

            if publish {
                pipeline
                    .converter
                    .convert_target(&mut self.backend, pipeline.primary, &mut pipeline.frame)?;
                let frame =
                    PublishedFrame::new(self.frame_index, self.world.elapsed(), &pipeline.frame);
                for sink in &mut self.sinks {
                    sink.publish(&frame)?;
                }
            }
            Ok(())
        })();

        self.backend.pump_messages();
        if self.backend.is_surface_closed() {
            log::info!("display surface closed after frame {}", self.frame_index);
            if let Err(e) = &result {
                log::warn!("frame {} failed: {}", self.frame_index, e);
            }
            self.state = DriverState::Closed;
            self.closed_by = Some(ClosedReason::SurfaceClosed);
            return Err(SimError::DisplaySurfaceClosed);
        }

        match result {
            Ok(()) => {
                self.state = DriverState::Ready;
                log::debug!(
                    "frame {} rendered (dt {:?}, elapsed {:?})",
                    self.frame_index,
                    dt,
                    self.world.elapsed()
                );
                Ok(TickReport {
                    frame_index: self.frame_index,
                    dt,
                    elapsed: self.world.elapsed(),
                    published: publish,
                })
            }
            Err(e) => {
                self.closed_by = ClosedReason::from_fatal(&e);
                self.state = if self.closed_by.is_some() {
                    DriverState::Closed
                } else {
                    DriverState::Ready
                };
                log::warn!("frame {} failed: {}", self.frame_index, e);
                Err(e)
            }
        }
    }
}
