//! Hardware-free bench run of the illumination engine
//!
//! Drives the full per-frame control loop against a simulated scope: a
//! linear-optics plant that turns commanded pulse widths into per-field
//! channel means after a configurable pipeline delay, saturating at the
//! 8-bit ceiling. The serial port may be absent (writes are discarded) and
//! the rotation mount is mocked, so this runs on any desk.
//!
//! The run starts in SYNC, switches to the requested imaging mode once the
//! sync procedure latches, and reports whether autoexposure settled on the
//! target intensity.

use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use hardware::{MockMotion, RotationMount};
use modlink::wire::{PulseCommand, NO_LASER_DIODES};
use modlink::SerialLink;
use lumen::program::{PW_MAX, TARGET_IMG_INTENSITY};
use lumen::{AcqLog, ChannelMeans, IllumConfig, IlluminationController, Mode};

#[derive(Parser, Debug)]
#[command(name = "illum_bench")]
#[command(about = "Illumination engine bench run against a simulated scope")]
struct Args {
    /// Serial port of the light modulation controller (may be absent)
    #[arg(long, default_value = "/dev/ttyACM0")]
    port: String,

    /// Rotation mount serial number
    #[arg(long, default_value_t = 28252094)]
    mount_serial: u32,

    /// Acquisition log output path
    #[arg(long, default_value = "acquisition.log")]
    log: PathBuf,

    /// Number of frames to run after sync
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// Imaging mode to enter once synced
    #[arg(long, value_enum, default_value_t = BenchMode::Wle)]
    mode: BenchMode,

    /// Plant gain: observed mean at full power on every diode
    #[arg(long, default_value_t = 2.0)]
    gain: f64,

    /// Sensor-to-processor pipeline delay in frames
    #[arg(long, default_value_t = 2)]
    delay: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BenchMode {
    Wle,
    Pse,
    Lsci,
    Multi,
    Ssfdi,
    Warmup,
}

impl From<BenchMode> for Mode {
    fn from(mode: BenchMode) -> Self {
        match mode {
            BenchMode::Wle => Mode::Wle,
            BenchMode::Pse => Mode::Pse,
            BenchMode::Lsci => Mode::Lsci,
            BenchMode::Multi => Mode::Multi,
            BenchMode::Ssfdi => Mode::Ssfdi,
            BenchMode::Warmup => Mode::Warmup,
        }
    }
}

/// Linear-optics plant with a fixed pipeline delay.
///
/// The mean a field produces is proportional to the average commanded duty
/// cycle of its 15 diodes, scaled so full power on every diode reads
/// `gain * 255`, then clipped to the 8-bit ceiling. All three color
/// channels read the same value.
struct SimulatedScope {
    delay: usize,
    gain: f64,
    history: VecDeque<PulseCommand>,
}

impl SimulatedScope {
    fn new(delay: usize, gain: f64) -> Self {
        Self {
            delay: delay.max(1),
            gain,
            history: VecDeque::new(),
        }
    }

    /// Channel means of the frame arriving now, produced by the command
    /// issued `delay` frames ago. Dark until the pipeline fills.
    fn observe(&self) -> (ChannelMeans, ChannelMeans) {
        let Some(cmd) = self
            .history
            .len()
            .checked_sub(self.delay)
            .and_then(|idx| self.history.get(idx))
        else {
            return (ChannelMeans::default(), ChannelMeans::default());
        };

        let field_mean = |pws: &[u16]| {
            let duty: f64 = pws.iter().map(|&pw| pw as f64 / PW_MAX).sum::<f64>()
                / NO_LASER_DIODES as f64;
            let mean = (self.gain * 255.0 * duty).min(255.0);
            ChannelMeans::new(mean, mean, mean)
        };

        (
            field_mean(&cmd.pws[..NO_LASER_DIODES]),
            field_mean(&cmd.pws[NO_LASER_DIODES..]),
        )
    }

    fn record(&mut self, cmd: PulseCommand) {
        self.history.push_back(cmd);
        if self.history.len() > 4 * self.delay + 8 {
            self.history.pop_front();
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let target: Mode = args.mode.into();
    let config = IllumConfig {
        serial_port: args.port,
        mount_serial_no: args.mount_serial,
        log_path: args.log,
    };

    let log = AcqLog::create(&config.log_path)
        .with_context(|| format!("cannot open acquisition log {}", config.log_path.display()))?;
    let link = SerialLink::open(&config.serial_port);
    let mount = RotationMount::new(
        Box::new(MockMotion::new(&[config.mount_serial_no])),
        config.mount_serial_no,
    );

    let mut controller = IlluminationController::new(link, mount, log.clone());
    controller
        .initialize()
        .context("rotation mount bring-up failed")?;

    let mut scope = SimulatedScope::new(args.delay, args.gain);

    info!("Synchronizing with the simulated scope...");
    controller.set_mode(Mode::Sync);

    let mut sync_frames = 0u32;
    while !controller.is_synced() {
        let (odd, even) = scope.observe();
        let cmd = controller.advance_frame(odd, even);
        scope.record(cmd);

        sync_frames += 1;
        if sync_frames > 100 {
            anyhow::bail!("sync did not latch within 100 frames");
        }
    }
    info!(
        "Synced after {} frames, buffer offset {} fields",
        sync_frames,
        controller.buffer_offset()
    );

    controller.set_mode(target);
    info!("Running {:?} for {} frames", controller.mode(), args.frames);

    let mut last_means = ChannelMeans::default();
    for _ in 0..args.frames {
        let (odd, even) = scope.observe();
        last_means = odd;
        let cmd = controller.advance_frame(odd, even);
        scope.record(cmd);
    }

    let err = (last_means.mono() - TARGET_IMG_INTENSITY).abs();
    if controller.mode() == target && err <= 2.0 {
        info!(
            "Autoexposure settled: odd-field mean {:.1} (target {})",
            last_means.mono(),
            TARGET_IMG_INTENSITY
        );
    } else {
        warn!(
            "Final odd-field mean {:.1} (target {})",
            last_means.mono(),
            TARGET_IMG_INTENSITY
        );
    }

    controller.shutdown();
    info!("Acquisition log written to {}", config.log_path.display());
    Ok(())
}
