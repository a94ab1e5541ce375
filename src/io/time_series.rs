//! Time-series file formats
//!
//! Supported encodings:
//! - Raw unsigned bytes, one sample per byte
//! - Headerless little-endian 32-bit floats (PRESTO `.dat` style)
//! - Sigproc/sigpyproc time series: a header ending in `HEADER_END`, then
//!   little-endian 32-bit floats

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use super::sample_buffer::SampleBuffer;
use crate::error::SearchError;

const HEADER_START: &[u8] = b"HEADER_START";
const HEADER_END: &[u8] = b"HEADER_END";

/// Sample encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// One unsigned byte per sample
    Unsigned8,
    /// Little-endian `f32`, no header
    Float32,
    /// Sigproc header followed by little-endian `f32`
    SigpyprocFloat32,
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::Unsigned8 => "u8",
            SampleFormat::Float32 => "f32",
            SampleFormat::SigpyprocFloat32 => "sigproc",
        };
        f.write_str(name)
    }
}

impl FromStr for SampleFormat {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "u8" | "ascii" | "bytes" => Ok(SampleFormat::Unsigned8),
            "f32" | "float" | "presto" => Ok(SampleFormat::Float32),
            "sigproc" | "sigpyproc" | "tim" => Ok(SampleFormat::SigpyprocFloat32),
            other => Err(SearchError::InvalidInput(format!("Unknown sample format '{}'", other))),
        }
    }
}

fn decode_f32(bytes: &[u8]) -> Result<Vec<f64>, SearchError> {
    let trailing = bytes.len() % 4;
    if trailing != 0 {
        return Err(SearchError::DecodingError(format!(
            "Trailing {} bytes do not form a complete 32-bit sample",
            trailing
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f64::from(f32::from_le_bytes([c[0], c[1], c[2], c[3]])))
        .collect())
}

/// Offset of the first byte after the `HEADER_END` marker
fn data_offset(bytes: &[u8]) -> Result<usize, SearchError> {
    bytes
        .windows(HEADER_END.len())
        .position(|w| w == HEADER_END)
        .map(|pos| pos + HEADER_END.len())
        .ok_or_else(|| SearchError::DecodingError("Sigproc header has no HEADER_END marker".to_string()))
}

/// Read every sample from `reader`
///
/// # Errors
///
/// - `SearchError::IoError` if reading fails
/// - `SearchError::DecodingError` on a truncated float or a missing header end
pub fn read_time_series<R: Read>(mut reader: R, format: SampleFormat) -> Result<Vec<f64>, SearchError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let samples = match format {
        SampleFormat::Unsigned8 => bytes.iter().copied().map(f64::from).collect(),
        SampleFormat::Float32 => decode_f32(&bytes)?,
        SampleFormat::SigpyprocFloat32 => {
            let offset = data_offset(&bytes)?;
            log::debug!("Skipping {}-byte sigproc header", offset);
            decode_f32(&bytes[offset..])?
        }
    };

    log::debug!("Read {} samples ({}, {} bytes)", samples.len(), format, bytes.len());
    Ok(samples)
}

/// Read a time series straight into a padded buffer
pub fn load_sample_buffer<R: Read>(
    reader: R,
    format: SampleFormat,
    padding_factor: f64,
) -> Result<SampleBuffer, SearchError> {
    let samples = read_time_series(reader, format)?;
    SampleBuffer::from_samples(samples, padding_factor)
}

fn write_header_string<W: Write>(writer: &mut W, s: &[u8]) -> Result<(), SearchError> {
    writer.write_all(&(s.len() as i32).to_le_bytes())?;
    writer.write_all(s)?;
    Ok(())
}

/// Write samples in `format`
///
/// Bytes are rounded and clamped to `0..=255`. The sigproc format gets a
/// minimal header with no keywords.
pub fn write_time_series<W: Write>(mut writer: W, samples: &[f64], format: SampleFormat) -> Result<(), SearchError> {
    match format {
        SampleFormat::Unsigned8 => {
            let bytes: Vec<u8> = samples.iter().map(|x| x.round().clamp(0.0, 255.0) as u8).collect();
            writer.write_all(&bytes)?;
        }
        SampleFormat::Float32 | SampleFormat::SigpyprocFloat32 => {
            if format == SampleFormat::SigpyprocFloat32 {
                write_header_string(&mut writer, HEADER_START)?;
                write_header_string(&mut writer, HEADER_END)?;
            }
            for &x in samples {
                writer.write_all(&(x as f32).to_le_bytes())?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write every physical element as `index scaled_index value`
///
/// The scaled index is the element's position in original-resolution samples.
pub fn write_padded_listing<W: Write>(mut writer: W, buffer: &SampleBuffer) -> Result<(), SearchError> {
    writeln!(writer, "# Bin number | Scaled bin number | Data value")?;
    for (i, value) in buffer.data().iter().enumerate() {
        writeln!(writer, "{} {} {:.6}", i, i * buffer.scale_factor(), value)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_round_trip_with_clamping() {
        let mut out = Vec::new();
        write_time_series(&mut out, &[-4.0, 0.4, 127.6, 300.0], SampleFormat::Unsigned8).unwrap();
        assert_eq!(out, vec![0, 0, 128, 255]);
        let back = read_time_series(out.as_slice(), SampleFormat::Unsigned8).unwrap();
        assert_eq!(back, vec![0.0, 0.0, 128.0, 255.0]);
    }

    #[test]
    fn test_float_round_trip() {
        let samples = vec![1.5, -2.25, 1e6];
        for format in [SampleFormat::Float32, SampleFormat::SigpyprocFloat32] {
            let mut out = Vec::new();
            write_time_series(&mut out, &samples, format).unwrap();
            let back = read_time_series(out.as_slice(), format).unwrap();
            assert_eq!(back, samples, "Round trip failed for {}", format);
        }
    }

    #[test]
    fn test_rejects_truncated_float() {
        let bytes = [0u8, 0, 128, 63, 1, 2];
        let err = read_time_series(&bytes[..], SampleFormat::Float32).unwrap_err();
        assert!(matches!(err, SearchError::DecodingError(_)));
    }

    #[test]
    fn test_sigproc_requires_header_end() {
        let mut bytes = b"HEADER_START".to_vec();
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        let err = read_time_series(bytes.as_slice(), SampleFormat::SigpyprocFloat32).unwrap_err();
        assert!(matches!(err, SearchError::DecodingError(_)));
    }

    #[test]
    fn test_sigproc_skips_keywords() {
        let mut bytes = Vec::new();
        write_header_string(&mut bytes, HEADER_START).unwrap();
        write_header_string(&mut bytes, b"tsamp").unwrap();
        bytes.extend_from_slice(&6.4e-5f64.to_le_bytes());
        write_header_string(&mut bytes, HEADER_END).unwrap();
        bytes.extend_from_slice(&3.0f32.to_le_bytes());
        bytes.extend_from_slice(&4.0f32.to_le_bytes());

        let samples = read_time_series(bytes.as_slice(), SampleFormat::SigpyprocFloat32).unwrap();
        assert_eq!(samples, vec![3.0, 4.0]);
    }

    #[test]
    fn test_load_sample_buffer() {
        let bytes = [1u8, 2, 3];
        let buffer = load_sample_buffer(&bytes[..], SampleFormat::Unsigned8, 2.0).unwrap();
        assert_eq!(buffer.samples(), &[1.0, 2.0, 3.0]);
        assert_eq!(buffer.physical_len(), 6);
        assert!(load_sample_buffer(&[0u8; 0][..], SampleFormat::Unsigned8, 2.0).is_err());
    }

    #[test]
    fn test_padded_listing() {
        let buffer = SampleBuffer::from_samples([1.0, 2.0, 3.0, 4.0], 1.0).unwrap().downsample();
        let mut out = Vec::new();
        write_padded_listing(&mut out, &buffer).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# Bin number | Scaled bin number | Data value");
        assert_eq!(lines[1], "0 0 3.000000");
        assert_eq!(lines[2], "1 2 7.000000");
        assert_eq!(lines.len(), 1 + buffer.physical_len());
    }

    #[test]
    fn test_format_names() {
        assert_eq!("presto".parse::<SampleFormat>().unwrap(), SampleFormat::Float32);
        assert_eq!("SIGPROC".parse::<SampleFormat>().unwrap(), SampleFormat::SigpyprocFloat32);
        assert!("wav".parse::<SampleFormat>().is_err());
    }
}
