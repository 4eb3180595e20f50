//! Decoder for Princeton Instruments SPE sensor dumps (v2.x/3.0).
//!
//! The format is a fixed 4100-byte binary header followed by a row-major,
//! little-endian pixel payload. Only the three header fields needed to
//! recover the image are read: width, height and the sample-type code, each
//! at a fixed byte offset.

use ndarray::Array2;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

/// Fixed size of the SPE header region in bytes.
pub const HEADER_LEN: usize = 4100;

/// Byte offset of the image width (u16 LE).
const OFFSET_WIDTH: usize = 42;
/// Byte offset of the sample-type code (i16 LE).
const OFFSET_SAMPLE_TYPE: usize = 108;
/// Byte offset of the image height (u16 LE).
const OFFSET_HEIGHT: usize = 656;

/// Errors raised while decoding an SPE file.
#[derive(Error, Debug)]
pub enum SpeError {
    #[error("Unrecognized SPE sample type code: {0}")]
    UnknownSampleType(i16),
    #[error("SPE header truncated: got {0} bytes, need {HEADER_LEN}")]
    TruncatedHeader(usize),
    #[error("SPE file declares a {0}x{1} image with no complete rows of pixel data")]
    EmptyPayload(usize, usize),
    #[error("I/O error reading SPE file: {0}")]
    Io(#[from] io::Error),
}

/// Pixel sample type declared in the SPE header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    Float32,
    Int32,
    Int16,
    Uint16,
}

impl SampleType {
    /// Map the header's sample-type code to a concrete type.
    pub fn from_code(code: i16) -> Result<Self, SpeError> {
        match code {
            0 => Ok(SampleType::Float32),
            1 => Ok(SampleType::Int32),
            2 => Ok(SampleType::Int16),
            3 => Ok(SampleType::Uint16),
            other => Err(SpeError::UnknownSampleType(other)),
        }
    }

    /// Size of one sample on disk.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleType::Float32 | SampleType::Int32 => 4,
            SampleType::Int16 | SampleType::Uint16 => 2,
        }
    }
}

/// The decoded fixed-layout header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHeader {
    pub width: usize,
    pub height: usize,
    pub sample_type: SampleType,
}

fn read_u16_le(header: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([header[offset], header[offset + 1]])
}

fn read_i16_le(header: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([header[offset], header[offset + 1]])
}

/// Parse the fixed-offset fields out of a full 4100-byte header region.
pub fn parse_header(header: &[u8]) -> Result<RawHeader, SpeError> {
    if header.len() < HEADER_LEN {
        return Err(SpeError::TruncatedHeader(header.len()));
    }

    let width = read_u16_le(header, OFFSET_WIDTH) as usize;
    let height = read_u16_le(header, OFFSET_HEIGHT) as usize;
    let sample_type = SampleType::from_code(read_i16_le(header, OFFSET_SAMPLE_TYPE))?;

    Ok(RawHeader {
        width,
        height,
        sample_type,
    })
}

fn decode_samples(payload: &[u8], sample_type: SampleType) -> Vec<f32> {
    let step = sample_type.bytes_per_sample();
    payload
        .chunks_exact(step)
        .map(|chunk| match sample_type {
            SampleType::Float32 => f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            SampleType::Int32 => i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f32,
            SampleType::Int16 => i16::from_le_bytes([chunk[0], chunk[1]]) as f32,
            SampleType::Uint16 => u16::from_le_bytes([chunk[0], chunk[1]]) as f32,
        })
        .collect()
}

/// Decode an SPE byte stream (header + payload) into a frame.
///
/// A payload shorter than `width * height` samples is logged as a warning
/// and the frame is truncated to the complete rows that were actually read.
/// A payload with no complete rows at all is a decode error.
pub fn decode(bytes: &[u8]) -> Result<Array2<f32>, SpeError> {
    let header = parse_header(bytes)?;
    let expected = header.width * header.height;

    let payload = &bytes[HEADER_LEN..];
    let available = payload.len() / header.sample_type.bytes_per_sample();
    let count = available.min(expected);

    if count < expected {
        log::warn!(
            "SPE payload short: expected {} samples, got {}",
            expected,
            count
        );
    }

    let rows = if header.width == 0 { 0 } else { count / header.width };
    if rows == 0 || header.width == 0 {
        return Err(SpeError::EmptyPayload(header.width, header.height));
    }

    let samples = decode_samples(
        &payload[..rows * header.width * header.sample_type.bytes_per_sample()],
        header.sample_type,
    );

    // Shape is consistent with the slice length by construction.
    Ok(Array2::from_shape_vec((rows, header.width), samples)
        .expect("sample count matches rows * width"))
}

/// Read and decode an SPE file from disk.
pub fn read_spe(path: &Path) -> Result<Array2<f32>, SpeError> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    decode(&bytes)
}
