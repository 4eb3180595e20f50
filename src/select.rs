//! Candidate selection and the coordinate scratch file.
//!
//! The PSF measurement tool takes a short list of starting coordinates.
//! Saturated detections (cosmic rays, hot pixels, clipped stars) would bias
//! the fit, so anything at or above the saturation ceiling is dropped before
//! ranking by flux.

use crate::config::SelectionConfig;
use crate::detect::Source;
use std::cmp::Ordering;
use std::fs;
use std::io::{self, Write};
use std::num::ParseFloatError;
use std::path::Path;
use thiserror::Error;

/// Errors raised by candidate selection and coordinate file handling.
#[derive(Error, Debug)]
pub enum SelectError {
    #[error("No usable candidates after saturation filtering")]
    NoUsableCandidates,
    #[error("I/O error on coordinate file: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed coordinate line {line}: {source}")]
    MalformedLine {
        line: usize,
        source: ParseFloatError,
    },
}

/// Bounded, flux-descending list of measurement candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateList(Vec<Source>);

impl CandidateList {
    pub fn sources(&self) -> &[Source] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Filter and rank detections into a candidate list.
///
/// Sources with `flux >= saturation_limit` are dropped, the rest sorted
/// flux-descending and truncated to `max_candidates`. An empty result after
/// filtering is reported as [`SelectError::NoUsableCandidates`] so the
/// caller skips PSF measurement instead of handing the tool an empty file.
pub fn select_brightest(
    sources: Vec<Source>,
    config: &SelectionConfig,
) -> Result<CandidateList, SelectError> {
    let mut usable: Vec<Source> = sources
        .into_iter()
        .filter(|s| s.flux < config.saturation_limit)
        .collect();

    if usable.is_empty() {
        return Err(SelectError::NoUsableCandidates);
    }

    usable.sort_by(|a, b| b.flux.partial_cmp(&a.flux).unwrap_or(Ordering::Equal));
    usable.truncate(config.max_candidates);
    Ok(CandidateList(usable))
}

/// Write the candidate list as a coordinate file, one "x y" pair per line
/// with two decimal places, replacing any previous contents.
pub fn write_coord_file(path: &Path, candidates: &CandidateList) -> Result<(), SelectError> {
    let mut file = fs::File::create(path)?;
    for source in candidates.sources() {
        writeln!(file, "{:.2} {:.2}", source.x, source.y)?;
    }
    Ok(())
}

/// Read a two-column coordinate file back as (x, y) pairs.
pub fn read_coord_file(path: &Path) -> Result<Vec<(f64, f64)>, SelectError> {
    let text = fs::read_to_string(path)?;
    let mut coords = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let x = parse_field(fields.next().unwrap_or(""), index)?;
        let y = parse_field(fields.next().unwrap_or(""), index)?;
        coords.push((x, y));
    }
    Ok(coords)
}

fn parse_field(field: &str, index: usize) -> Result<f64, SelectError> {
    field.parse().map_err(|source| SelectError::MalformedLine {
        line: index + 1,
        source,
    })
}
