//! Boundary to the external PSF measurement tool.
//!
//! The tool (IRAF `psfmeasure` or a wrapper around it) takes a frame and a
//! coordinate list and prints free-form diagnostic text. That text is the
//! only result channel, so parsing lives here in one narrow module and a
//! parse failure is an ordinary non-fatal outcome (`Ok(None)`), never an
//! error that stops the pipeline.
//!
//! Different tool versions print the per-star table with different column
//! layouts, so the expected layout is data ([`OutputSchema`]) rather than a
//! hard-coded pattern.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// Errors raised while invoking or configuring the measurement tool.
#[derive(Error, Debug)]
pub enum PsfError {
    #[error("Invalid output schema pattern: {0}")]
    Schema(#[from] regex::Error),
    #[error("Failed to launch measurement command `{command}`: {source}")]
    Launch {
        command: String,
        source: io::Error,
    },
    #[error("Measurement command `{command}` exited with status {status}")]
    CommandFailed { command: String, status: String },
}

/// Parsed result of one measurement run.
#[derive(Debug, Clone, PartialEq)]
pub struct PsfMeasurement {
    /// Averaged FWHM in pixels, as reported by the tool
    pub avg_fwhm_pix: f64,
    /// Averaged ellipticity over the per-star rows (0.0 when unavailable)
    pub avg_ellipticity: f64,
    /// Per-star FWHM values in pixels
    pub individual_fwhms: Vec<f64>,
    /// Number of stars that contributed
    pub n_stars: usize,
}

impl PsfMeasurement {
    /// Averaged FWHM converted to arcseconds.
    pub fn avg_fwhm_arcsec(&self, pixel_scale_arcsec: f64) -> f64 {
        self.avg_fwhm_pix * pixel_scale_arcsec
    }
}

/// Expected layout of the tool's terminal output.
///
/// `average_pattern` must capture the averaged FWHM as group 1.
/// `row_pattern` matches one per-star table row; `fwhm_group` and
/// `ellipticity_group` give the capture positions of interest. An optional
/// `fwhm_range` rejects implausible row captures (the legacy layout needs
/// this because its loose pattern also matches coordinate columns).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSchema {
    pub average_pattern: String,
    pub row_pattern: String,
    pub fwhm_group: usize,
    pub ellipticity_group: Option<usize>,
    pub fwhm_range: Option<(f64, f64)>,
}

impl OutputSchema {
    /// Layout of recent psfmeasure builds: `Col Line Mag FWHM Ellip PA`.
    pub fn six_column() -> Self {
        Self {
            average_pattern:
                r"(?:Average full|Full) width at half maximum \(FWHM\) of ([\d.]+)".to_string(),
            row_pattern:
                r"(\d+\.\d+)\s+(\d+\.\d+)\s+(-?\d+\.\d+)\s+(\d+\.\d+)\s+(\d+\.\d+)\s+(-?\d+)"
                    .to_string(),
            fwhm_group: 4,
            ellipticity_group: Some(5),
            fwhm_range: None,
        }
    }

    /// Layout of older builds without the position-angle column.
    pub fn five_column() -> Self {
        Self {
            average_pattern: r"Average full width at half maximum \(FWHM\) of ([\d.]+)"
                .to_string(),
            row_pattern: r"\s+([\d.]+)\s+([\d.]+)\s+([\d.]+)\s+([\d.]+)\s+([\d.]+)".to_string(),
            fwhm_group: 5,
            ellipticity_group: None,
            fwhm_range: Some((1.0, 10.0)),
        }
    }
}

impl Default for OutputSchema {
    fn default() -> Self {
        Self::six_column()
    }
}

/// Parse measurement output according to a schema.
///
/// Returns `Ok(None)` when the text carries no recognizable average line.
/// When the average is present but no per-star rows parse, the average
/// stands in as a single-star result, matching how the tool reports a
/// one-entry coordinate list.
pub fn parse_output(
    text: &str,
    schema: &OutputSchema,
) -> Result<Option<PsfMeasurement>, PsfError> {
    let average_re = Regex::new(&schema.average_pattern)?;
    let row_re = Regex::new(&schema.row_pattern)?;

    let avg_fwhm_pix = match average_re
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        Some(value) => value,
        None => return Ok(None),
    };

    let mut individual_fwhms = Vec::new();
    let mut ellipticities = Vec::new();

    for caps in row_re.captures_iter(text) {
        let fwhm = match caps
            .get(schema.fwhm_group)
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            Some(value) => value,
            None => continue,
        };
        if let Some((lo, hi)) = schema.fwhm_range {
            if fwhm < lo || fwhm > hi {
                continue;
            }
        }
        individual_fwhms.push(fwhm);

        if let Some(group) = schema.ellipticity_group {
            if let Some(e) = caps.get(group).and_then(|m| m.as_str().parse::<f64>().ok()) {
                ellipticities.push(e);
            }
        }
    }

    let avg_ellipticity = if ellipticities.is_empty() {
        0.0
    } else {
        ellipticities.iter().sum::<f64>() / ellipticities.len() as f64
    };

    if individual_fwhms.is_empty() {
        individual_fwhms.push(avg_fwhm_pix);
    }
    let n_stars = individual_fwhms.len();

    Ok(Some(PsfMeasurement {
        avg_fwhm_pix,
        avg_ellipticity,
        individual_fwhms,
        n_stars,
    }))
}

/// The measurement collaborator seam.
///
/// `Ok(None)` means the tool ran but produced nothing parseable; the caller
/// logs and moves on. `Err` means the tool could not be run at all.
pub trait PsfMeasure {
    fn measure(
        &mut self,
        frame_path: &Path,
        coord_path: &Path,
    ) -> Result<Option<PsfMeasurement>, PsfError>;
}

/// Options forwarded to the external tool, IRAF parameter style.
#[derive(Debug, Clone)]
pub struct PsfMeasureOptions {
    /// Ask the tool to display each frame while measuring
    pub display: bool,
    /// Pixel scale parameter handed through verbatim
    pub scale: f64,
    /// Search radius around each starting coordinate, pixels
    pub radius: f64,
    /// Coordinate-system flag (`logical` or `physical`)
    pub wcs: String,
}

impl Default for PsfMeasureOptions {
    fn default() -> Self {
        Self {
            display: false,
            scale: 1.0,
            radius: 10.0,
            wcs: "logical".to_string(),
        }
    }
}

/// Runs an external measurement command synchronously and parses its output.
///
/// No timeout is applied; a hung tool blocks the pipeline, which is the
/// accepted single-operator behavior.
pub struct CommandPsfMeasure {
    program: String,
    options: PsfMeasureOptions,
    schema: OutputSchema,
}

impl CommandPsfMeasure {
    pub fn new(program: String, options: PsfMeasureOptions, schema: OutputSchema) -> Self {
        Self {
            program,
            options,
            schema,
        }
    }
}

impl PsfMeasure for CommandPsfMeasure {
    fn measure(
        &mut self,
        frame_path: &Path,
        coord_path: &Path,
    ) -> Result<Option<PsfMeasurement>, PsfError> {
        let display = if self.options.display { "yes" } else { "no" };
        let output = Command::new(&self.program)
            .arg(frame_path)
            .arg(format!("display={display}"))
            .arg(format!("scale={}", self.options.scale))
            .arg(format!("radius={}", self.options.radius))
            .arg("coords=markall")
            .arg(format!("imagecur={}", coord_path.display()))
            .arg(format!("wcs={}", self.options.wcs))
            .output()
            .map_err(|source| PsfError::Launch {
                command: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(PsfError::CommandFailed {
                command: self.program.clone(),
                status: output.status.to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        parse_output(&text, &self.schema)
    }
}
