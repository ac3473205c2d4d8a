use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use noise_core::config::{GapPolicy, KEEP_PERIODS, PERIOD_SECONDS, StoreConfig};
use noise_core::storage::NoiseStore;
use noise_core::ui::FrameBuffer;

use noise_meter::app_state::{AppError, NOISE_CHANNEL, publisher, subscriber};
use noise_meter::display_manager::{DisplayManager, SnapshotWriter};
use noise_meter::drive::DriveLoop;
use noise_meter::emitter::{ErrorPanel, LogEmitter};
use noise_meter::form_memory::FormMemory;
use noise_meter::sampler::{Sampler, SyntheticSampler};

#[derive(Parser, Debug)]
#[command(name = "noise-meter", about = "Ambient noise meter with Loki logging")]
struct Args {
    /// Device name attached to every log stream (remembered between runs)
    #[arg(long)]
    device: Option<String>,

    /// Loki credential as `user:password` (remembered between runs)
    #[arg(long)]
    loki_basic_auth: Option<String>,

    /// Relay endpoint receiving the push requests
    #[arg(long, default_value = "http://127.0.0.1:3000/api/save-log")]
    relay_url: String,

    /// Directory holding the remembered form values
    #[arg(long, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    /// Milliseconds between loudness readings
    #[arg(long, default_value = "16")]
    frame_ms: u64,

    /// Length of one aggregation period
    #[arg(long, default_value_t = PERIOD_SECONDS)]
    period_seconds: u32,

    /// Number of completed periods on the chart
    #[arg(long, default_value_t = KEEP_PERIODS)]
    keep_periods: usize,

    /// Write the rendered chart to this PPM file whenever it changes
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Read loudness from the default audio input instead of the synthetic tone
    #[cfg(feature = "microphone")]
    #[arg(long)]
    microphone: bool,

    /// Do not insert empty periods for time without samples
    #[arg(long)]
    collapse_gaps: bool,
}

impl Args {
    fn store_config(&self) -> StoreConfig {
        StoreConfig {
            period_seconds: self.period_seconds.max(1),
            keep_periods: self.keep_periods.max(1),
            gap_policy: if self.collapse_gaps {
                GapPolicy::Collapse
            } else {
                GapPolicy::Fill
            },
            ..StoreConfig::default()
        }
    }

    fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }

    fn sampler(&self) -> Result<Box<dyn Sampler>, AppError> {
        #[cfg(feature = "microphone")]
        if self.microphone {
            let sampler = noise_meter::sampler::MicrophoneSampler::open()?;
            return Ok(Box::new(sampler));
        }

        info!("Using the synthetic tone sampler");
        Ok(Box::new(SyntheticSampler::new(self.frame().as_secs_f64())))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let memory = match &args.state_dir {
        Some(dir) => FormMemory::in_dir(dir),
        None => FormMemory::default_location(),
    };
    let params = memory
        .load()
        .merged(args.device.clone(), args.loki_basic_auth.clone());
    if let Err(e) = memory.save(&params) {
        warn!("Could not remember form params: {}", e);
    }
    if params.device.is_empty() {
        warn!("No device name set, logs will carry an empty device label");
    }
    info!("Measuring as device '{}'", params.device);

    let sampler = args.sampler()?;
    let store = NoiseStore::new(args.store_config());
    let mut drive = DriveLoop::new(store, sampler, publisher(&NOISE_CHANNEL)?);

    let errors = ErrorPanel::default();
    let mut display = DisplayManager::new(FrameBuffer::new(), errors.clone());
    let snapshot = args.snapshot.clone().map(SnapshotWriter::new);
    let present = |frame: &mut FrameBuffer| {
        if let Some(writer) = &snapshot {
            writer.present(frame);
        }
    };

    let emitter = LogEmitter::new(
        args.relay_url.clone(),
        params.device.clone(),
        &params.loki_basic_auth,
        errors,
    );

    let display_events = subscriber(&NOISE_CHANNEL)?;
    let emitter_events = subscriber(&NOISE_CHANNEL)?;

    tokio::select! {
        _ = drive.run(args.frame()) => {}
        _ = display.run(display_events, present) => {}
        _ = emitter.run(emitter_events) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down");
        }
    }

    drive.stop();
    Ok(())
}
