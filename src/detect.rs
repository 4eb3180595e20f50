//! Star candidate detection.
//!
//! Finds pixels that are both a local maximum within a fixed odd-sized
//! window and brighter than the background by a configurable number of
//! sigma. This is deliberately coarse: the external PSF fit does the precise
//! centroiding, so the detector only needs to supply good starting
//! coordinates.

use crate::background::{self, BackgroundEstimate};
use crate::config::DetectionConfig;
use ndarray::ArrayView2;

/// A detected source in 1-based pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Source {
    /// Column, 1-based
    pub x: f64,
    /// Row, 1-based
    pub y: f64,
    /// Background-subtracted peak intensity
    pub flux: f64,
}

/// True when `frame[row, col]` is the maximum of its neighborhood.
///
/// Plateau pixels (equal to the window maximum) count as maxima, matching a
/// maximum-filter equality test.
fn is_local_max(frame: ArrayView2<f32>, row: usize, col: usize, half: usize) -> bool {
    let (height, width) = frame.dim();
    let value = frame[[row, col]];

    let y_min = row.saturating_sub(half);
    let y_max = (row + half).min(height - 1);
    let x_min = col.saturating_sub(half);
    let x_max = (col + half).min(width - 1);

    for y in y_min..=y_max {
        for x in x_min..=x_max {
            if frame[[y, x]] > value {
                return false;
            }
        }
    }
    true
}

/// Detect sources in a frame.
///
/// Estimates the global background, then keeps local maxima whose
/// background-subtracted value exceeds `level + detection_sigma * rms`.
/// Results are in insertion (row-major scan) order.
pub fn detect_sources(frame: ArrayView2<f32>, config: &DetectionConfig) -> Vec<Source> {
    let bkg = background::estimate(
        frame,
        config.background_tile,
        config.clip_sigma,
        config.clip_iterations,
    );
    detect_with_background(frame, config, bkg)
}

fn detect_with_background(
    frame: ArrayView2<f32>,
    config: &DetectionConfig,
    bkg: BackgroundEstimate,
) -> Vec<Source> {
    let (height, width) = frame.dim();
    if height == 0 || width == 0 {
        return Vec::new();
    }

    // The level term stays in the threshold even though the comparison is
    // against the subtracted image.
    let threshold = bkg.level + config.detection_sigma * bkg.rms;
    let half = config.neighborhood / 2;

    let mut sources = Vec::new();
    for row in 0..height {
        for col in 0..width {
            let subtracted = frame[[row, col]] - bkg.level;
            if subtracted <= threshold {
                continue;
            }
            if !is_local_max(frame, row, col, half) {
                continue;
            }
            sources.push(Source {
                x: (col + 1) as f64,
                y: (row + 1) as f64,
                flux: subtracted as f64,
            });
        }
    }

    log::debug!(
        "detected {} sources (background {:.2} +/- {:.2})",
        sources.len(),
        bkg.level,
        bkg.rms
    );
    sources
}
