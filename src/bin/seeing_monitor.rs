//! Seeing monitor entry point.
//!
//! # Usage
//!
//! ```bash
//! # Attended focus run: confirm each batch, DS9 display via XPA
//! cargo run --release --bin seeing_monitor -- \
//!     --remote-dir /mnt/telescope_remote --local-dir ~/obs/tonight
//!
//! # Unattended seeing monitoring, no display
//! cargo run --release --bin seeing_monitor -- \
//!     --remote-dir /mnt/telescope_remote --local-dir ~/obs/tonight \
//!     --assume-yes --no-display
//!
//! # Older psfmeasure build with the 5-column table layout
//! cargo run --release --bin seeing_monitor -- \
//!     --remote-dir /mnt/remote --local-dir ~/obs --legacy-output
//! ```
//!
//! The measurement tool is any executable that accepts
//! `<frame> display=... scale=... radius=... coords=markall imagecur=<coo> wcs=...`
//! and prints psfmeasure-style output.

use anyhow::Context;
use clap::Parser;
use seeing_monitor::config::MonitorConfig;
use seeing_monitor::console::{AutoConsole, OperatorConsole, StdinConsole};
use seeing_monitor::display::{FrameDisplay, NullDisplay, XpaDisplay};
use seeing_monitor::pipeline::Pipeline;
use seeing_monitor::psf::{CommandPsfMeasure, OutputSchema, PsfMeasureOptions};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Remote directory holding freshly captured frames
    #[arg(long)]
    remote_dir: PathBuf,

    /// Local directory for mirrored frames, the results log and scratch files
    #[arg(long)]
    local_dir: PathBuf,

    /// Detector pixel scale in arcseconds per pixel
    #[arg(long, default_value = "0.257")]
    pixel_scale: f64,

    /// Seconds to sleep between poll cycles
    #[arg(long, default_value = "3")]
    poll_interval: u64,

    /// Detection threshold in sigma above background
    #[arg(long, default_value = "3.0")]
    detection_sigma: f32,

    /// Local-maximum window side in pixels (odd)
    #[arg(long, default_value = "11")]
    neighborhood: usize,

    /// Saturation ceiling; brighter detections are dropped
    #[arg(long, default_value = "100000")]
    saturation_limit: f64,

    /// Maximum candidates handed to PSF measurement
    #[arg(long, default_value = "15")]
    max_candidates: usize,

    /// External PSF measurement command
    #[arg(long, default_value = "psfmeasure")]
    psf_command: String,

    /// Search radius passed to the measurement tool, pixels
    #[arg(long, default_value = "10.0")]
    psf_radius: f64,

    /// Expect the older 5-column psfmeasure table layout
    #[arg(long)]
    legacy_output: bool,

    /// Process batches without asking (unattended monitoring)
    #[arg(long)]
    assume_yes: bool,

    /// Do not push frames to DS9
    #[arg(long)]
    no_display: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    anyhow::ensure!(
        cli.neighborhood % 2 == 1,
        "neighborhood must be odd, got {}",
        cli.neighborhood
    );
    anyhow::ensure!(
        cli.remote_dir.is_dir(),
        "remote directory {} not found",
        cli.remote_dir.display()
    );

    let mut config = MonitorConfig::new(cli.remote_dir, cli.local_dir);
    config.pixel_scale_arcsec = cli.pixel_scale;
    config.poll_interval = Duration::from_secs(cli.poll_interval);
    config.detection.detection_sigma = cli.detection_sigma;
    config.detection.neighborhood = cli.neighborhood;
    config.selection.saturation_limit = cli.saturation_limit;
    config.selection.max_candidates = cli.max_candidates;

    let schema = if cli.legacy_output {
        OutputSchema::five_column()
    } else {
        OutputSchema::six_column()
    };
    let options = PsfMeasureOptions {
        display: !cli.no_display,
        radius: cli.psf_radius,
        ..Default::default()
    };
    let measurer = CommandPsfMeasure::new(cli.psf_command, options, schema);

    // Both console and display come in two flavors; box the seams so one
    // pipeline type covers all four combinations.
    let console: Box<dyn OperatorConsole> = if cli.assume_yes {
        Box::new(AutoConsole)
    } else {
        Box::new(StdinConsole)
    };
    let display: Box<dyn FrameDisplay> = if cli.no_display {
        Box::new(NullDisplay)
    } else {
        Box::new(XpaDisplay::new("ds9"))
    };

    let mut pipeline = Pipeline::new(config, console, measurer, display)
        .context("failed to set up local store")?;
    pipeline.run();
    Ok(())
}
