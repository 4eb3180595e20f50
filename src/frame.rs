//! FITS frame ingest and egress.
//!
//! Pre-reduced frames arrive as FITS files; raw conversions leave as FITS
//! files. Loading tolerates 3-D cubes by taking the first plane, which is
//! what some acquisition setups write for single exposures.

use fitsio::compat::fitsfile::FitsFile;
use fitsio::compat::images::{ImageDescription, ImageType, ReadImage, WriteImage};
use ndarray::Array2;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading or writing FITS frames.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("FITS I/O error: {0}")]
    Fits(#[from] fitsio::compat::errors::Error),
    #[error("No 2-D image HDU in {0}")]
    NotAnImage(String),
    #[error("Unsupported image shape {0:?}")]
    BadShape(Vec<usize>),
}

/// Load the first image HDU of a FITS file as a 2-D frame.
///
/// 2-D images load directly; for a 3-D cube the first plane is used. Shape
/// comes from the NAXIS keywords of the HDU being read.
pub fn load_fits(path: &Path) -> Result<Array2<f32>, FrameError> {
    let fptr = FitsFile::open(path)?;

    let mut hdu_idx = 0;
    while let Ok(hdu) = fptr.hdu(hdu_idx) {
        let naxis = hdu.read_key::<i64>(&fptr, "NAXIS").unwrap_or(0);
        if naxis == 2 || naxis == 3 {
            let width = hdu.read_key::<i64>(&fptr, "NAXIS1").unwrap_or(0) as usize;
            let height = hdu.read_key::<i64>(&fptr, "NAXIS2").unwrap_or(0) as usize;
            if width == 0 || height == 0 {
                return Err(FrameError::BadShape(vec![width, height]));
            }

            let data = f32::read_image(&fptr, &hdu)?;
            // Cube: keep the first plane
            let plane: Vec<f32> = data.into_iter().take(height * width).collect();
            return Array2::from_shape_vec((height, width), plane)
                .map_err(|_| FrameError::BadShape(vec![height, width]));
        }
        hdu_idx += 1;
    }

    Err(FrameError::NotAnImage(path.display().to_string()))
}

/// Write a frame as a single-image float FITS file, replacing any existing
/// file. `keys` are written as string-valued header keywords on the image
/// HDU.
pub fn write_fits(
    path: &Path,
    frame: &Array2<f32>,
    keys: &[(&str, &str)],
) -> Result<(), FrameError> {
    let (height, width) = frame.dim();
    let description = ImageDescription {
        data_type: ImageType::Float,
        dimensions: vec![width, height],
    };

    let mut fptr = FitsFile::create(path).overwrite().open()?;
    let hdu = fptr.create_image("PRIMARY", &description)?;

    let values: Vec<f32> = frame.iter().copied().collect();
    f32::write_image(&mut fptr, &hdu, &values)?;

    for &(name, value) in keys {
        hdu.write_key(&mut fptr, name, &value.to_string())?;
    }
    Ok(())
}

/// Read a string-valued header keyword from the first HDU.
///
/// Absent or unreadable keywords yield `None`, never an error: header
/// metadata only decorates the log.
pub fn read_keyword(path: &Path, key: &str) -> Option<String> {
    let fptr = FitsFile::open(path).ok()?;
    let mut hdu_idx = 0;
    while let Ok(hdu) = fptr.hdu(hdu_idx) {
        if let Ok(value) = hdu.read_key::<String>(&fptr, key) {
            return Some(value);
        }
        hdu_idx += 1;
    }
    None
}

/// Read the DATE-OBS keyword and reduce it to a HH:MM:SS clock string.
///
/// DATE-OBS is typically an ISO timestamp like `2025-12-29T21:14:03.2`;
/// older headers carry a bare time.
pub fn read_observation_time(path: &Path) -> Option<String> {
    extract_clock(&read_keyword(path, "DATE-OBS")?)
}

/// Pull the time-of-day component out of a DATE-OBS value.
fn extract_clock(raw: &str) -> Option<String> {
    let cleaned = raw.trim().replace('T', " ");
    let clock = cleaned.split_whitespace().last()?;
    if clock.is_empty() {
        None
    } else {
        Some(clock.to_string())
    }
}
