//! `camera-sim`: run the simulated camera and publish YUYV frames

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use camera_simulator::backend::{DisplaySurface, HeadlessSurface, SoftwareBackend};
use camera_simulator::config::ResourceTable;
use camera_simulator::publish::save_luma_png;
use camera_simulator::{
    DriverState, FrameDriver, LatestFrame, RawFileSink, SimError, SimResult, SimulatorConfig,
    SystemClock,
};
use clap::Parser;

/// Synthetic robot camera.
#[derive(Parser, Debug)]
#[command(
    name = "camera-sim",
    about = "Render a simulated field and emit packed YUYV 4:2:2 frames",
    long_about = "Renders the simulated field through the software backend, applies \
        sensor noise and converts every frame to packed YUYV 4:2:2.\n\n\
        EXIT CODES:\n  \
          0  clean stop after --max-frames\n  \
          1  any other error\n  \
          2  display surface closed\n  \
          3  render target has an unsupported pixel format",
    version
)]
struct Args {
    /// Exit after rendering N frames. Runs until the surface closes otherwise.
    #[arg(long)]
    max_frames: Option<u64>,

    /// Resource location table (Ogre-style resources.cfg).
    #[arg(long)]
    resources: Option<PathBuf>,

    /// Append every raw YUYV frame to this file.
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Save the luma plane of the last frame as a PNG.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Seed the noise generator for reproducible frames.
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads of the host scheduler.
    #[arg(long, default_value = "4")]
    threads: usize,

    /// Render only; skip conversion and publication.
    #[arg(long)]
    no_publish: bool,

    /// Enable the slow camera yaw sway.
    #[arg(long)]
    camera_sway: bool,

    /// Show the primary target in a preview window.
    #[cfg(feature = "window")]
    #[arg(long)]
    window: bool,

    /// Sleep this many milliseconds between ticks. Ticks run back to back otherwise.
    #[arg(long)]
    frame_interval_ms: Option<u64>,
}

impl Args {
    fn config(&self) -> SimResult<SimulatorConfig> {
        let mut config = SimulatorConfig::default()
            .with_publish_frames(!self.no_publish)
            .with_camera_sway(self.camera_sway);
        config.scheduler_threads = self.threads;
        if let Some(seed) = self.seed {
            config = config.with_noise_seed(seed);
        }
        if let Some(path) = &self.resources {
            config = config.with_resources(ResourceTable::load(path)?);
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(args: &Args) -> SimResult<()> {
    let config = args.config()?;

    #[cfg(feature = "window")]
    if args.window {
        let surface = camera_simulator::backend::WindowSurface::new(
            &config.title,
            config.width as usize,
            config.height as usize,
        )?;
        return run_with(args, config, surface);
    }

    run_with(args, config, HeadlessSurface::new())
}

fn run_with<S: DisplaySurface>(args: &Args, config: SimulatorConfig, surface: S) -> SimResult<()> {
    let (width, height) = (config.width, config.height);
    let mut driver = FrameDriver::new(config, SoftwareBackend::with_surface(surface), SystemClock)?;

    let latest = LatestFrame::new(width, height);
    driver.add_sink(latest.clone());
    if let Some(path) = &args.dump {
        driver.add_sink(RawFileSink::create(path)?);
    }

    let interval = args.frame_interval_ms.map(Duration::from_millis);
    let mut ticks = 0u64;
    let result = loop {
        if args.max_frames.is_some_and(|max| ticks >= max) {
            break Ok(());
        }
        ticks += 1;
        match driver.tick() {
            Ok(_) => {}
            Err(e) if e.is_fatal() || driver.state() == DriverState::Closed => break Err(e),
            Err(SimError::Backend(e)) => log::warn!("frame {} dropped: {}", ticks, e),
            Err(e) => break Err(e),
        }
        if let Some(interval) = interval {
            std::thread::sleep(interval);
        }
    };

    log::info!("stopped after {} ticks ({} frames published)", ticks, latest.sequence());
    if let (Some(path), Some(frame)) = (&args.snapshot, driver.frame()) {
        save_luma_png(frame, path)?;
    }
    result
}
