//! Global background estimation.
//!
//! The detector needs a sky level and a noise RMS for the whole frame. Both
//! are estimated from spatial tiles: each tile gets a sigma-clipped mean and
//! standard deviation so stars do not drag the statistics upward, and the
//! medians across tiles give robust global values. Tiles at the right and
//! bottom edges may be smaller than the nominal tile size.

use ndarray::ArrayView2;

/// Global background statistics for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundEstimate {
    /// Sky level
    pub level: f32,
    /// Background noise RMS
    pub rms: f32,
}

fn mean_and_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    (mean, var.sqrt())
}

/// Sigma-clipped mean and standard deviation of one tile.
fn clipped_stats(values: &[f32], clip_sigma: f32, iterations: usize) -> (f32, f32) {
    let mut kept: Vec<f32> = values.to_vec();
    let (mut mean, mut std) = mean_and_std(&kept);

    for _ in 0..iterations {
        if std <= 0.0 {
            break;
        }
        let lo = mean - clip_sigma * std;
        let hi = mean + clip_sigma * std;
        let before = kept.len();
        kept.retain(|v| *v >= lo && *v <= hi);
        if kept.is_empty() {
            // Clip removed everything; fall back to the previous pass
            return (mean, std);
        }
        let (m, s) = mean_and_std(&kept);
        mean = m;
        std = s;
        if kept.len() == before {
            break;
        }
    }

    (mean, std)
}

fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values[values.len() / 2]
}

/// Estimate the global background level and noise RMS of a frame.
///
/// `tile` is the nominal tile side in pixels; `clip_sigma`/`iterations`
/// control outlier rejection inside each tile.
pub fn estimate(
    frame: ArrayView2<f32>,
    tile: usize,
    clip_sigma: f32,
    iterations: usize,
) -> BackgroundEstimate {
    let (height, width) = frame.dim();
    if height == 0 || width == 0 {
        return BackgroundEstimate {
            level: 0.0,
            rms: 0.0,
        };
    }

    let tile = tile.max(1);
    let mut levels = Vec::new();
    let mut rmss = Vec::new();

    for ty in (0..height).step_by(tile) {
        for tx in (0..width).step_by(tile) {
            let y_end = (ty + tile).min(height);
            let x_end = (tx + tile).min(width);

            let mut values = Vec::with_capacity((y_end - ty) * (x_end - tx));
            for y in ty..y_end {
                for x in tx..x_end {
                    let v = frame[[y, x]];
                    if v.is_finite() {
                        values.push(v);
                    }
                }
            }
            if values.is_empty() {
                continue;
            }

            let (mean, std) = clipped_stats(&values, clip_sigma, iterations);
            levels.push(mean);
            rmss.push(std);
        }
    }

    BackgroundEstimate {
        level: median(&mut levels),
        rms: median(&mut rmss),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn noisy_flat(height: usize, width: usize, level: f32, spread: f32, seed: u64) -> Array2<f32> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Array2::from_shape_fn((height, width), |_| {
            level + rng.gen_range(-spread..spread)
        })
    }

    #[test]
    fn test_flat_frame() {
        let frame = Array2::from_elem((64, 64), 100.0_f32);
        let bkg = estimate(frame.view(), 32, 3.0, 3);
        assert_relative_eq!(bkg.level, 100.0, epsilon = 1e-4);
        assert_relative_eq!(bkg.rms, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_noisy_frame_level() {
        let frame = noisy_flat(128, 128, 500.0, 10.0, 42);
        let bkg = estimate(frame.view(), 64, 3.0, 3);
        assert_relative_eq!(bkg.level, 500.0, epsilon = 2.0);
        // Uniform(-10, 10) has sigma ~5.77
        assert_relative_eq!(bkg.rms, 5.77, epsilon = 1.0);
    }

    #[test]
    fn test_bright_star_does_not_bias_level() {
        let mut frame = noisy_flat(128, 128, 200.0, 6.0, 7);
        // A very bright compact blob
        for y in 60..66 {
            for x in 60..66 {
                frame[[y, x]] = 50_000.0;
            }
        }
        let bkg = estimate(frame.view(), 64, 3.0, 3);
        assert_relative_eq!(bkg.level, 200.0, epsilon = 3.0);
    }

    #[test]
    fn test_clipped_stats_rejects_outlier() {
        let mut values = vec![10.0_f32; 100];
        values.push(10_000.0);
        let (mean, _) = clipped_stats(&values, 3.0, 3);
        assert_relative_eq!(mean, 10.0, epsilon = 0.5);
    }

    #[test]
    fn test_empty_frame() {
        let frame = Array2::<f32>::zeros((0, 0));
        let bkg = estimate(frame.view(), 64, 3.0, 3);
        assert_eq!(bkg.level, 0.0);
        assert_eq!(bkg.rms, 0.0);
    }
}
