//! Padded sample buffers and half-resolution downsampling
//!
//! A [`SampleBuffer`] stores more elements than it has real samples. The extra
//! capacity is zero padding reserved for the worst-case power-of-two expansion a
//! fold may need, so that no fold ever reallocates or truncates.
//!
//! # Example
//!
//! ```
//! use stratum_ffa::io::sample_buffer::SampleBuffer;
//!
//! let buffer = SampleBuffer::from_samples((0..10).map(|i| i as f64), 2.0)?;
//! assert_eq!(buffer.logical_len(), 10);
//! assert_eq!(buffer.physical_len(), 20);
//!
//! let half = buffer.downsample();
//! assert_eq!(half.scale_factor(), 2);
//! assert_eq!(half.samples()[0], 0.0 + 1.0);
//! # Ok::<(), stratum_ffa::SearchError>(())
//! ```

use crate::error::SearchError;

/// Default physical/logical length ratio
pub const DEFAULT_PADDING_FACTOR: f64 = 2.0;

/// Value stored in every element beyond the logical length
pub const PADDING_VALUE: f64 = 0.0;

/// Time series with a logical (real) length and a larger, zero-padded physical length
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    /// Buffer data, `physical_len` elements long
    data: Vec<f64>,
    /// Number of real samples at the start of `data`
    logical_len: usize,
    /// One stored element covers this many original-resolution samples
    scale_factor: usize,
    /// Ratio maintained between physical and logical length
    padding_factor: f64,
    /// Whether the search should de-redden this series
    red_noise_enabled: bool,
    /// De-reddening window in original-resolution samples
    red_noise_window: usize,
}

/// Round up to the next even number
fn round_up_even(n: usize) -> usize {
    n + (n % 2)
}

impl SampleBuffer {
    /// Create a zero-filled buffer for `logical_len` samples
    ///
    /// The physical length is `ceil(logical_len * padding_factor)`, rounded up to
    /// an even number so the buffer always downsamples cleanly.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidInput` if `logical_len` is zero or
    /// `padding_factor` is below 1.0
    pub fn new(logical_len: usize, padding_factor: f64) -> Result<Self, SearchError> {
        if logical_len == 0 {
            return Err(SearchError::InvalidInput(
                "Sample buffer needs at least one sample".to_string(),
            ));
        }
        if !padding_factor.is_finite() || padding_factor < 1.0 {
            return Err(SearchError::InvalidInput(format!(
                "Padding factor must be a finite value >= 1.0, got {}",
                padding_factor
            )));
        }

        let physical_len = round_up_even((logical_len as f64 * padding_factor).ceil() as usize);

        Ok(Self {
            data: vec![PADDING_VALUE; physical_len],
            logical_len,
            scale_factor: 1,
            padding_factor,
            red_noise_enabled: false,
            red_noise_window: 1,
        })
    }

    /// Build a buffer from an ordered sequence of samples
    pub fn from_samples<I>(samples: I, padding_factor: f64) -> Result<Self, SearchError>
    where
        I: IntoIterator<Item = f64>,
    {
        let samples: Vec<f64> = samples.into_iter().collect();
        let mut buffer = Self::new(samples.len(), padding_factor)?;
        buffer.data[..samples.len()].copy_from_slice(&samples);

        log::debug!(
            "Sample buffer initialised: logical={} physical={}",
            buffer.logical_len,
            buffer.physical_len()
        );

        Ok(buffer)
    }

    /// Number of real samples
    pub fn logical_len(&self) -> usize {
        self.logical_len
    }

    /// Number of allocated elements, padding included
    pub fn physical_len(&self) -> usize {
        self.data.len()
    }

    /// Original-resolution samples per stored element
    pub fn scale_factor(&self) -> usize {
        self.scale_factor
    }

    /// Override the scale factor (for series that were downsampled upstream)
    pub fn set_scale_factor(&mut self, scale_factor: usize) -> Result<(), SearchError> {
        if scale_factor == 0 {
            return Err(SearchError::InvalidInput(
                "Scale factor must be at least 1".to_string(),
            ));
        }
        self.scale_factor = scale_factor;
        Ok(())
    }

    /// Physical/logical ratio this buffer maintains
    pub fn padding_factor(&self) -> f64 {
        self.padding_factor
    }

    /// Whether the search should de-redden this series
    pub fn red_noise_enabled(&self) -> bool {
        self.red_noise_enabled
    }

    /// De-reddening window in original-resolution samples
    pub fn red_noise_window(&self) -> usize {
        self.red_noise_window
    }

    /// Configure de-reddening for this series
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidInput` if `window` is zero
    pub fn set_red_noise(&mut self, enabled: bool, window: usize) -> Result<(), SearchError> {
        if window == 0 {
            return Err(SearchError::InvalidInput(
                "De-reddening window must be greater than 0".to_string(),
            ));
        }
        self.red_noise_enabled = enabled;
        self.red_noise_window = window;
        Ok(())
    }

    /// Full physical data, padding included
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// The real samples
    pub fn samples(&self) -> &[f64] {
        &self.data[..self.logical_len]
    }

    /// Mutable access to the real samples
    pub fn samples_mut(&mut self) -> &mut [f64] {
        &mut self.data[..self.logical_len]
    }

    /// Iterate over the real samples in order
    pub fn logical_samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples().iter().copied()
    }

    /// Empty buffer of the same shape and settings
    pub(crate) fn empty_like(&self) -> Self {
        Self {
            data: vec![PADDING_VALUE; self.data.len()],
            logical_len: self.logical_len,
            scale_factor: self.scale_factor,
            padding_factor: self.padding_factor,
            red_noise_enabled: self.red_noise_enabled,
            red_noise_window: self.red_noise_window,
        }
    }

    /// Produce a half-resolution copy of this buffer
    ///
    /// Adjacent pairs are summed rather than averaged; later normalization makes
    /// the absolute scale irrelevant and sums compose across repeated passes.
    /// Out-of-range source elements count as padding. The source is untouched.
    pub fn downsample(&self) -> SampleBuffer {
        let logical_len = round_up_even(self.logical_len) / 2;
        let mut physical_len = round_up_even(self.data.len()) / 2;

        // Keep the padding ratio after halving
        while (physical_len as f64) < logical_len as f64 * self.padding_factor {
            physical_len += 2;
        }

        let element = |i: usize| self.data.get(i).copied().unwrap_or(PADDING_VALUE);
        let data: Vec<f64> = (0..physical_len)
            .map(|i| element(2 * i) + element(2 * i + 1))
            .collect();

        log::debug!(
            "Downsampled {} -> {} samples (scale factor {} -> {})",
            self.logical_len,
            logical_len,
            self.scale_factor,
            self.scale_factor * 2
        );

        SampleBuffer {
            data,
            logical_len,
            scale_factor: self.scale_factor * 2,
            padding_factor: self.padding_factor,
            red_noise_enabled: self.red_noise_enabled,
            red_noise_window: self.red_noise_window,
        }
    }
}
