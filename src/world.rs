//! Simulated world state and its time integration.
//!
//! The world has no discrete events. Advancing it only accumulates time, moves the
//! looping flag animations forward and optionally sways the camera.

use std::time::Duration;

use glam::Vec3;

use crate::scene::{Camera, BALL_START};

/// Length of the flag cloth animation loop in seconds
pub const FLAG_LOOP_SECONDS: f64 = 2.0;

/// Looping animation clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopingAnimation {
    time: f64,
    length: f64,
}

impl LoopingAnimation {
    pub fn new(length: f64) -> Self {
        Self { time: 0.0, length }
    }

    pub fn add_time(&mut self, seconds: f64) {
        if self.length > 0.0 {
            self.time = (self.time + seconds).rem_euclid(self.length);
        }
    }

    /// Position within the loop in seconds
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Position within the loop in `[0, 1)`
    pub fn phase(&self) -> f32 {
        if self.length > 0.0 {
            (self.time / self.length) as f32
        } else {
            0.0
        }
    }
}

/// Dynamic state read by the renderer each tick
#[derive(Debug, Clone, PartialEq)]
pub struct WorldState {
    pub camera: Camera,
    pub ball_position: Vec3,
    pub last_ball_position: Vec3,
    pub flags: [LoopingAnimation; 4],
    elapsed: Duration,
}

impl WorldState {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ball_position: BALL_START,
            last_ball_position: BALL_START,
            flags: [LoopingAnimation::new(FLAG_LOOP_SECONDS); 4],
            elapsed: Duration::ZERO,
        }
    }

    /// Total simulated time
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Camera yaw perturbation as a function of accumulated time
pub trait CameraSway {
    /// Yaw to apply this tick, in radians
    fn yaw_delta(&self, elapsed: Duration) -> f32;
}

/// No perturbation
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSway;

impl CameraSway for NoSway {
    fn yaw_delta(&self, _elapsed: Duration) -> f32 {
        0.0
    }
}

/// Slow side-to-side head motion, `cos(t * frequency) * amplitude` per tick
#[derive(Debug, Clone, Copy)]
pub struct CosineSway {
    pub frequency: f64,
    pub amplitude: f64,
}

impl Default for CosineSway {
    fn default() -> Self {
        Self {
            frequency: 2.0,
            amplitude: 1.0 / 30.0,
        }
    }
}

impl CameraSway for CosineSway {
    fn yaw_delta(&self, elapsed: Duration) -> f32 {
        ((elapsed.as_secs_f64() * self.frequency).cos() * self.amplitude) as f32
    }
}

/// Advances a [`WorldState`] by elapsed wall time
pub struct WorldUpdater {
    sway: Box<dyn CameraSway>,
}

impl Default for WorldUpdater {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldUpdater {
    /// Updater without camera sway
    pub fn new() -> Self {
        Self {
            sway: Box::new(NoSway),
        }
    }

    pub fn with_sway(sway: impl CameraSway + 'static) -> Self {
        Self {
            sway: Box::new(sway),
        }
    }

    pub fn advance(&self, world: &mut WorldState, dt: Duration) {
        world.elapsed += dt;

        let seconds = dt.as_secs_f64();
        for flag in &mut world.flags {
            flag.add_time(seconds);
        }

        world.last_ball_position = world.ball_position;

        let yaw = self.sway.yaw_delta(world.elapsed);
        if yaw != 0.0 {
            world.camera.yaw_by(yaw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> WorldState {
        WorldState::new(Camera::default())
    }

    #[test]
    fn test_time_accumulation_is_linear() {
        let updater = WorldUpdater::new();
        let (a, b) = (Duration::from_millis(16), Duration::from_micros(33_333));

        let mut split = world();
        updater.advance(&mut split, a);
        updater.advance(&mut split, b);

        let mut once = world();
        updater.advance(&mut once, a + b);

        assert_eq!(split.elapsed(), once.elapsed());
        for (x, y) in split.flags.iter().zip(once.flags.iter()) {
            assert!((x.time() - y.time()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_tick_accumulates_nothing() {
        let updater = WorldUpdater::new();
        let mut state = world();
        for ms in [16, 0, 33] {
            updater.advance(&mut state, Duration::from_millis(ms));
        }
        assert_eq!(state.elapsed(), Duration::from_millis(49));
    }

    #[test]
    fn test_flag_animation_loops() {
        let mut anim = LoopingAnimation::new(2.0);
        anim.add_time(2.5);
        assert!((anim.time() - 0.5).abs() < 1e-12);
        assert!((anim.phase() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_camera_still_without_sway() {
        let updater = WorldUpdater::new();
        let mut state = world();
        let before = state.camera.clone();
        updater.advance(&mut state, Duration::from_secs(3));
        assert_eq!(state.camera, before);
    }

    #[test]
    fn test_cosine_sway_moves_camera() {
        let updater = WorldUpdater::with_sway(CosineSway::default());
        let mut state = world();
        let yaw = state.camera.yaw;
        updater.advance(&mut state, Duration::from_millis(10));
        // cos(0.02) / 30 applied as a left turn
        let expected = yaw - ((0.02f64).cos() / 30.0) as f32;
        assert!((state.camera.yaw - expected).abs() < 1e-6);
    }

    #[test]
    fn test_ball_history_tracks_previous_tick() {
        let updater = WorldUpdater::new();
        let mut state = world();
        state.ball_position = Vec3::new(1.0, 0.8, 2.0);
        updater.advance(&mut state, Duration::from_millis(16));
        assert_eq!(state.last_ball_position, Vec3::new(1.0, 0.8, 2.0));
    }
}
