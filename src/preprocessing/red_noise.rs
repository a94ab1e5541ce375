//! Red-noise suppression ("de-reddening")
//!
//! Slow baseline drift is removed by subtracting a running median of the series.
//! The window is given in original-resolution samples and is converted to the
//! buffer's current resolution, so the filter covers the same stretch of time no
//! matter how often the series has been downsampled.
//!
//! # Example
//!
//! ```
//! use stratum_ffa::io::sample_buffer::SampleBuffer;
//! use stratum_ffa::preprocessing::red_noise::deredden;
//!
//! let drifting = SampleBuffer::from_samples((0..100).map(|i| 0.5 * i as f64), 2.0)?;
//! let flat = deredden(&drifting, 5)?;
//! // Past the filling phase a linear ramp leaves a constant residual
//! assert_eq!(flat.samples()[50], 0.5 * 2.0);
//! # Ok::<(), stratum_ffa::SearchError>(())
//! ```

use super::running_median::running_median;
use crate::error::SearchError;
use crate::io::sample_buffer::SampleBuffer;

/// Window length in stored samples for a window given in original samples
///
/// Rounds up, and never returns zero for a non-zero window.
pub fn scaled_window(window_samples: usize, scale_factor: usize) -> usize {
    window_samples.div_ceil(scale_factor.max(1))
}

/// Subtract a running-median baseline from the logical region of `source`
///
/// Returns a new buffer with the same shape, scale factor and red-noise
/// settings. Padding stays zero and `source` is untouched.
///
/// # Arguments
///
/// * `source` - Series to filter
/// * `window_samples` - Median window in original-resolution samples
///
/// # Errors
///
/// Returns `SearchError::InvalidInput` if `window_samples` is zero
pub fn deredden(source: &SampleBuffer, window_samples: usize) -> Result<SampleBuffer, SearchError> {
    if window_samples == 0 {
        return Err(SearchError::InvalidInput(
            "De-reddening window must be greater than 0".to_string(),
        ));
    }

    let window = scaled_window(window_samples, source.scale_factor());
    log::debug!(
        "De-reddening {} samples: window {} original samples -> {} at scale factor {}",
        source.logical_len(),
        window_samples,
        window,
        source.scale_factor()
    );

    if window > source.logical_len() {
        log::debug!(
            "Median window ({}) exceeds series length ({}), baseline grows over the whole series",
            window,
            source.logical_len()
        );
    }

    let baseline = running_median(source.samples(), window)?;

    let mut output = source.empty_like();
    for ((out, &x), &median) in output
        .samples_mut()
        .iter_mut()
        .zip(source.samples())
        .zip(&baseline)
    {
        *out = x - median;
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(samples: &[f64]) -> SampleBuffer {
        SampleBuffer::from_samples(samples.iter().copied(), 2.0).unwrap()
    }

    #[test]
    fn test_removes_constant_offset() {
        let source = buffer(&[5.0; 40]);
        let output = deredden(&source, 7).unwrap();
        assert!(output.samples().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_keeps_shape_and_padding() {
        let samples: Vec<f64> = (0..30).map(|i| (i % 4) as f64 + 10.0).collect();
        let mut source = buffer(&samples);
        source.set_red_noise(true, 9).unwrap();
        let output = deredden(&source, source.red_noise_window()).unwrap();

        assert_eq!(output.logical_len(), source.logical_len());
        assert_eq!(output.physical_len(), source.physical_len());
        assert_eq!(output.scale_factor(), source.scale_factor());
        assert!(output.red_noise_enabled());
        assert!(output.data()[30..].iter().all(|&x| x == 0.0));
        // Source untouched
        assert_eq!(source.samples()[0], 10.0);
    }

    #[test]
    fn test_first_sample_residual_is_zero() {
        let source = buffer(&[3.0, 1.0, 4.0, 1.0, 5.0]);
        let output = deredden(&source, 3).unwrap();
        assert_eq!(output.samples()[0], 0.0);
        // Second sample: median of [3, 1] is 2
        assert_eq!(output.samples()[1], -1.0);
    }

    #[test]
    fn test_spike_survives_filtering() {
        let mut samples = vec![0.0; 64];
        samples[40] = 10.0;
        let source = buffer(&samples);
        let output = deredden(&source, 9).unwrap();
        assert_eq!(output.samples()[40], 10.0);
    }

    #[test]
    fn test_window_scales_with_resolution() {
        assert_eq!(scaled_window(9, 1), 9);
        assert_eq!(scaled_window(9, 2), 5);
        assert_eq!(scaled_window(9, 4), 3);
        assert_eq!(scaled_window(1, 8), 1);

        // A window of 4 original samples is 2 samples after one downsample
        let source = buffer(&[0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0]);
        let half = source.downsample();
        assert_eq!(half.samples(), &[0.0, 2.0, 4.0, 6.0, 8.0]);
        let output = deredden(&half, 4).unwrap();
        // Trailing pairs: medians 0, 1, 3, 5, 7
        assert_eq!(output.samples(), &[0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_rejects_zero_window() {
        let source = buffer(&[1.0, 2.0]);
        assert!(deredden(&source, 0).is_err());
    }
}
