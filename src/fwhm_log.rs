//! Append-only CSV log of seeing measurements.
//!
//! One row per processed frame. Copied frames carry the observation clock
//! time from their header; converted raw frames carry the operator-entered
//! focus value instead, which is what turns the log into a focus V-curve.

use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error on results log: {0}")]
    Io(#[from] std::io::Error),
}

/// One measurement row.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FwhmRecord {
    #[serde(rename = "FILENAME")]
    pub filename: String,
    /// Observation clock time (HH:MM:SS) for copied frames
    #[serde(rename = "UT")]
    pub ut: String,
    /// Operator-entered focus value for converted frames, `N/A` otherwise
    #[serde(rename = "FOCUS")]
    pub focus: String,
    #[serde(rename = "ELLIPTICITY")]
    pub ellipticity: f64,
    #[serde(rename = "FWHM_PIX")]
    pub fwhm_pix: f64,
    #[serde(rename = "FWHM_ARCSEC")]
    pub fwhm_arcsec: f64,
    #[serde(rename = "N_STARS")]
    pub n_stars: usize,
}

/// Appends records to a CSV file, writing the header only when the file is
/// first created.
pub struct FwhmLog {
    path: PathBuf,
}

impl FwhmLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, creating the file (with header) if needed.
    pub fn append(&self, record: &FwhmRecord) -> Result<(), LogError> {
        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}
