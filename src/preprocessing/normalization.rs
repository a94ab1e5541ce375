//! Robust normalization using the median absolute deviation (MAD)
//!
//! The series is shifted so its median is zero and scaled so that, for Gaussian
//! noise, it has unit standard deviation. Median and MAD ignore the occasional
//! bright pulse or RFI spike that would inflate a mean/standard-deviation pair.
//!
//! # Example
//!
//! ```
//! use stratum_ffa::preprocessing::normalization::mad;
//!
//! let mut samples = vec![1.0, 2.0, 3.0, 4.0, 100.0];
//! let len = samples.len();
//! let stats = mad(&mut samples, len)?;
//! assert_eq!(stats.median, 3.0);
//! assert_eq!(stats.mad, 1.0);
//! assert_eq!(samples[2], 0.0);
//! # Ok::<(), stratum_ffa::SearchError>(())
//! ```

use crate::error::SearchError;

/// Scale turning a MAD into a consistent estimate of the standard deviation
/// for normally distributed data
pub const MAD_SCALE: f64 = 1.4826;

/// A MAD at or below this is treated as zero
const EPSILON: f64 = 1e-12;

/// Statistics measured by a MAD normalization pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MadStats {
    /// Median that was subtracted
    pub median: f64,
    /// Median absolute deviation after subtracting the median
    pub mad: f64,
    /// False when the MAD was zero and no scaling was applied
    pub scaled: bool,
}

/// Upper median: element `floor(n / 2)` of the sorted values
fn upper_median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    values[values.len() / 2]
}

/// MAD-normalize `buffer[..length]` in place
///
/// 1. Median = element `floor(length / 2)` of the sorted values; subtract it
/// 2. MAD = element `floor(length / 2)` of the sorted absolute deviations
/// 3. Divide every element by `MAD * 1.4826`
///
/// If the MAD is zero (more than half the samples share one value) the median is
/// still removed but no scaling is applied, and the returned stats have
/// `scaled == false`.
///
/// # Errors
///
/// Returns `SearchError::InvalidInput` if `length` is zero or exceeds the buffer,
/// `SearchError::NumericalError` if any of the samples is not finite
pub fn mad(buffer: &mut [f64], length: usize) -> Result<MadStats, SearchError> {
    if length == 0 {
        return Err(SearchError::InvalidInput(
            "Cannot MAD-normalize zero samples".to_string(),
        ));
    }
    if length > buffer.len() {
        return Err(SearchError::InvalidInput(format!(
            "MAD length {} exceeds buffer length {}",
            length,
            buffer.len()
        )));
    }

    let samples = &mut buffer[..length];
    if samples.iter().any(|x| !x.is_finite()) {
        return Err(SearchError::NumericalError(
            "Non-finite sample in MAD normalization input".to_string(),
        ));
    }

    let mut scratch = samples.to_vec();
    let median = upper_median(&mut scratch);

    for (x, deviation) in samples.iter_mut().zip(scratch.iter_mut()) {
        *x -= median;
        *deviation = x.abs();
    }
    let mad = upper_median(&mut scratch);

    if mad <= EPSILON {
        log::warn!(
            "MAD is zero over {} samples, median removed without scaling",
            length
        );
        return Ok(MadStats {
            median,
            mad,
            scaled: false,
        });
    }

    let scale = mad * MAD_SCALE;
    for x in samples.iter_mut() {
        *x /= scale;
    }

    log::trace!("MAD normalization: median={:.4}, mad={:.4}", median, mad);

    Ok(MadStats {
        median,
        mad,
        scaled: true,
    })
}
