//! Shared helpers for the integration tests.

#![allow(dead_code)]

use camera_simulator::backend::{HeadlessSurface, SoftwareBackend};
use camera_simulator::{FrameDriver, ManualClock, SimulatorConfig};

/// Small frames keep the software renderer fast in debug builds
pub const TEST_WIDTH: u32 = 64;
pub const TEST_HEIGHT: u32 = 48;

pub type TestDriver = FrameDriver<SoftwareBackend, ManualClock>;

pub fn test_config() -> SimulatorConfig {
    SimulatorConfig::default()
        .with_resolution(TEST_WIDTH, TEST_HEIGHT)
        .with_noise_seed(1234)
}

/// Driver on a headless surface plus a handle to its clock
pub fn headless_driver(config: SimulatorConfig) -> (TestDriver, ManualClock) {
    driver_with_surface(config, HeadlessSurface::new())
}

pub fn driver_with_surface(
    config: SimulatorConfig,
    surface: HeadlessSurface,
) -> (TestDriver, ManualClock) {
    let clock = ManualClock::new();
    let driver = FrameDriver::new(config, SoftwareBackend::with_surface(surface), clock.clone())
        .expect("valid test config");
    (driver, clock)
}
