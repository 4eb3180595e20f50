//! Poll-loop pipeline driver.
//!
//! Sequences one scan cycle: reconcile the remote inventory against the
//! local store, gate on the operator, then process each pending frame
//! strictly in order. Every per-frame failure is contained, logged and
//! followed by the next frame; only the operator ends the loop.

use crate::config::MonitorConfig;
use crate::console::{Confirm, OperatorConsole};
use crate::detect;
use crate::display::{FrameDisplay, ScaleMode};
use crate::frame::{self, FrameError};
use crate::fwhm_log::{FwhmLog, FwhmRecord, LogError};
use crate::psf::{PsfError, PsfMeasure};
use crate::select::{self, SelectError};
use crate::spe::{self, SpeError};
use crate::store::{self, Action, WorkItem};
use std::fs;
use std::io;
use std::thread;
use thiserror::Error;

/// Failure of a single work item. Never terminates the loop.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("Transfer failed: {0}")]
    Transfer(#[from] io::Error),
    #[error("Decode failed: {0}")]
    Decode(#[from] SpeError),
    #[error("Frame I/O failed: {0}")]
    Frame(#[from] FrameError),
    #[error("Coordinate file failed: {0}")]
    Coord(SelectError),
    #[error("Measurement failed: {0}")]
    Measure(#[from] PsfError),
    #[error("Results log failed: {0}")]
    Log(#[from] LogError),
}

/// What became of a successfully handled work item.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Measured and appended to the results log
    Measured(FwhmRecord),
    /// The tool ran but nothing parseable came back; no row written
    NoParseableResult,
    /// No usable candidates; measurement was skipped entirely
    NoUsableCandidates,
}

/// Whether the poll loop keeps going after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// The pipeline driver. Single-threaded and synchronous throughout.
pub struct Pipeline<C, M, D> {
    config: MonitorConfig,
    console: C,
    measurer: M,
    display: D,
    log: FwhmLog,
}

impl<C, M, D> Pipeline<C, M, D>
where
    C: OperatorConsole,
    M: PsfMeasure,
    D: FrameDisplay,
{
    /// Build a pipeline, creating the local store directory if needed.
    pub fn new(config: MonitorConfig, console: C, measurer: M, display: D) -> io::Result<Self> {
        fs::create_dir_all(&config.local_dir)?;
        let log = FwhmLog::new(config.log_path.clone());
        Ok(Self {
            config,
            console,
            measurer,
            display,
            log,
        })
    }

    /// One fresh reconciliation of remote vs. local. Never cached: both
    /// sides change between cycles.
    pub fn scan_cycle(&self) -> io::Result<Vec<WorkItem>> {
        let remote = store::scan_remote(&self.config.remote_dir)?;
        let local = store::scan_local(&self.config.local_dir)?;
        Ok(store::reconcile(&remote, &local))
    }

    /// Run the poll loop until the operator quits.
    pub fn run(&mut self) {
        log::info!(
            "watching {} for new frames",
            self.config.remote_dir.display()
        );
        loop {
            match self.run_cycle() {
                Ok(LoopControl::Stop) => {
                    log::info!("operator stop, exiting poll loop");
                    return;
                }
                Ok(LoopControl::Continue) => {}
                Err(e) => log::error!("scan cycle failed: {e}"),
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    /// One scan-confirm-process cycle.
    pub fn run_cycle(&mut self) -> io::Result<LoopControl> {
        let items = self.scan_cycle()?;
        if items.is_empty() {
            return Ok(LoopControl::Continue);
        }

        log::info!("found {} new frame(s)", items.len());
        match self
            .console
            .confirm(&format!("Found {} new file(s) to process. Proceed?", items.len()))
        {
            Confirm::Proceed => {}
            Confirm::Skip => {
                log::info!("batch skipped by operator");
                return Ok(LoopControl::Continue);
            }
            Confirm::Quit => return Ok(LoopControl::Stop),
        }

        let mut first = true;
        for item in &items {
            if !first {
                match self.console.confirm("Proceed with next file?") {
                    Confirm::Proceed => {}
                    Confirm::Skip => {
                        log::info!("remaining batch skipped by operator");
                        break;
                    }
                    Confirm::Quit => return Ok(LoopControl::Stop),
                }
            }
            first = false;

            match self.process_item(item) {
                Ok(ProcessOutcome::Measured(record)) => {
                    log::info!(
                        "{}: FWHM {:.2} px / {:.2}\" from {} star(s)",
                        record.filename,
                        record.fwhm_pix,
                        record.fwhm_arcsec,
                        record.n_stars
                    );
                }
                Ok(ProcessOutcome::NoParseableResult) => {
                    log::warn!("{}: no valid FWHM returned, no row written", item.local_name);
                }
                Ok(ProcessOutcome::NoUsableCandidates) => {
                    log::info!("{}: no usable stars, measurement skipped", item.local_name);
                }
                Err(e) => {
                    log::warn!("skipping {}: {e}", item.local_name);
                }
            }
        }

        Ok(LoopControl::Continue)
    }

    /// Transfer, detect, select and measure one frame.
    pub fn process_item(&mut self, item: &WorkItem) -> Result<ProcessOutcome, ItemError> {
        let source_path = self.config.remote_dir.join(&item.source_name);
        let local_path = self.config.local_dir.join(&item.local_name);

        let focus = match item.action {
            Action::Copy => {
                fs::copy(&source_path, &local_path)?;
                log::debug!("copied {} to local store", item.source_name);
                None
            }
            Action::Convert => {
                log::debug!("converting raw dump {}", item.source_name);
                let decoded = spe::read_spe(&source_path)?;
                let focus = self
                    .console
                    .prompt_value(&format!("Enter FOCUS value for {}", item.source_name));
                // The focus setting travels with the frame, not just the log
                match focus.as_deref() {
                    Some(value) => frame::write_fits(&local_path, &decoded, &[("FOCUS", value)])?,
                    None => frame::write_fits(&local_path, &decoded, &[])?,
                }
                focus
            }
        };

        self.display.show(&local_path, ScaleMode::ZScale);

        let image = frame::load_fits(&local_path)?;
        let sources = detect::detect_sources(image.view(), &self.config.detection);
        log::debug!("{}: {} raw detections", item.local_name, sources.len());

        let candidates = match select::select_brightest(sources, &self.config.selection) {
            Ok(list) => list,
            Err(SelectError::NoUsableCandidates) => {
                return Ok(ProcessOutcome::NoUsableCandidates)
            }
            Err(e) => return Err(ItemError::Coord(e)),
        };

        select::write_coord_file(&self.config.coord_path, &candidates)
            .map_err(ItemError::Coord)?;

        let measurement = match self
            .measurer
            .measure(&local_path, &self.config.coord_path)?
        {
            Some(m) => m,
            None => return Ok(ProcessOutcome::NoParseableResult),
        };

        let ut = frame::read_observation_time(&local_path)
            .unwrap_or_else(|| chrono::Local::now().format("%H:%M:%S").to_string());

        let record = FwhmRecord {
            filename: item.local_name.clone(),
            ut,
            focus: focus.unwrap_or_else(|| "N/A".to_string()),
            ellipticity: measurement.avg_ellipticity,
            fwhm_pix: measurement.avg_fwhm_pix,
            fwhm_arcsec: measurement.avg_fwhm_arcsec(self.config.pixel_scale_arcsec),
            n_stars: measurement.n_stars,
        };
        self.log.append(&record)?;

        Ok(ProcessOutcome::Measured(record))
    }
}
