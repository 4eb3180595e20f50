//! Configuration for the seeing monitor.
//!
//! Every tunable that was historically a hard-coded constant (saturation
//! ceiling, local-maximum neighborhood, detection sigma, pixel scale) lives
//! in an explicit struct that is passed into each component at construction.
//! There is no process-wide mutable state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the CSV results log inside the local directory.
pub const DEFAULT_LOG_NAME: &str = "live_fwhm_data.csv";

/// Name of the scratch coordinate file inside the local directory.
pub const DEFAULT_COORD_NAME: &str = "temp_sources.coo";

/// Settings for the source detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionConfig {
    /// Detection threshold in sigma above the background level
    pub detection_sigma: f32,
    /// Side length of the local-maximum window in pixels (must be odd)
    pub neighborhood: usize,
    /// Side length of the tiles used for background estimation
    pub background_tile: usize,
    /// Sigma used when clipping outliers inside each background tile
    pub clip_sigma: f32,
    /// Number of clipping passes per tile
    pub clip_iterations: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            detection_sigma: 3.0,
            neighborhood: 11,
            background_tile: 64,
            clip_sigma: 3.0,
            clip_iterations: 3,
        }
    }
}

/// Settings for the candidate selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectionConfig {
    /// Sources at or above this flux are treated as saturated and dropped
    pub saturation_limit: f64,
    /// Upper bound on the number of candidates handed to PSF measurement
    pub max_candidates: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            saturation_limit: 100_000.0,
            max_candidates: 15,
        }
    }
}

/// Top-level monitor configuration.
///
/// `log_path` and `coord_path` normally live inside `local_dir`; use
/// [`MonitorConfig::new`] to get that layout.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Remote directory holding freshly captured frames (read-only)
    pub remote_dir: PathBuf,
    /// Local mirror of processed FITS frames
    pub local_dir: PathBuf,
    /// Append-only CSV results log
    pub log_path: PathBuf,
    /// Scratch coordinate file consumed by the PSF measurement tool
    pub coord_path: PathBuf,
    /// Detector pixel scale in arcseconds per pixel
    pub pixel_scale_arcsec: f64,
    /// Sleep between poll cycles
    pub poll_interval: Duration,
    /// Source detector settings
    pub detection: DetectionConfig,
    /// Candidate selector settings
    pub selection: SelectionConfig,
}

impl MonitorConfig {
    /// Build a configuration with the standard file layout under `local_dir`.
    pub fn new(remote_dir: PathBuf, local_dir: PathBuf) -> Self {
        let log_path = local_dir.join(DEFAULT_LOG_NAME);
        let coord_path = local_dir.join(DEFAULT_COORD_NAME);
        Self {
            remote_dir,
            local_dir,
            log_path,
            coord_path,
            pixel_scale_arcsec: 0.257,
            poll_interval: Duration::from_secs(3),
            detection: DetectionConfig::default(),
            selection: SelectionConfig::default(),
        }
    }
}
