//! Configuration parameters for a period search

use crate::error::SearchError;
use crate::ffa::{ProfileMode, ScanParams};
use crate::io::sample_buffer::DEFAULT_PADDING_FACTOR;

/// Period search configuration parameters
#[derive(Debug, Clone)]
pub struct SearchConfig {
    // Period range
    /// Lowest period to test, in original samples (default: 128)
    pub low_period: usize,

    /// Scan stops before this period, in original samples (default: 256)
    pub high_period: usize,

    /// Downsampling passes applied before the first fold (default: 0)
    /// `low_period` must be a multiple of `2^prelim_downsamples` times the
    /// buffer's initial scale factor
    pub prelim_downsamples: u32,

    // Folding
    /// Boxcar width applied to every folded profile before scoring (default: 0 = off)
    pub matched_filter_width: usize,

    /// Whether profiles forwarded to a profile sink are raw or MAD-normalized
    /// (default: Raw)
    pub profile_mode: ProfileMode,

    // Preprocessing
    /// Enable running-median de-reddening (default: false)
    pub red_noise: bool,

    /// De-reddening window in original samples (default: None = automatic)
    /// The automatic window is `4 * low_period + 1` when the scan spans more than
    /// one octave, otherwise `2 * high_period + 1`
    pub red_noise_window: Option<usize>,

    /// MAD-normalize the series before the scan and after every resolution
    /// change (default: false)
    pub normalize: bool,

    // Loading
    /// Physical/logical length ratio used when buffers are created (default: 2.0)
    pub padding_factor: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            low_period: 128,
            high_period: 256,
            prelim_downsamples: 0,
            matched_filter_width: 0,
            profile_mode: ProfileMode::Raw,
            red_noise: false,
            red_noise_window: None,
            normalize: false,
            padding_factor: DEFAULT_PADDING_FACTOR,
        }
    }
}

impl SearchConfig {
    /// Check the parameters that do not depend on the data
    pub fn validate(&self) -> Result<(), SearchError> {
        self.scan_params().validate()?;
        if let Some(0) = self.red_noise_window {
            return Err(SearchError::InvalidInput(
                "De-reddening window must be greater than 0".to_string(),
            ));
        }
        if !self.padding_factor.is_finite() || self.padding_factor < 1.0 {
            return Err(SearchError::InvalidInput(format!(
                "Padding factor must be at least 1.0, got {}",
                self.padding_factor
            )));
        }
        Ok(())
    }

    /// De-reddening window used during the scan, in original samples
    pub fn scan_red_noise_window(&self) -> usize {
        match self.red_noise_window {
            Some(window) => window,
            None if self.high_period > 2 * self.low_period => 4 * self.low_period + 1,
            None => 2 * self.high_period + 1,
        }
    }

    /// Window of the broad de-reddening pass run once before the scan
    pub fn initial_red_noise_window(&self) -> usize {
        2 * self.high_period + 1
    }

    /// Engine parameters derived from this configuration
    pub fn scan_params(&self) -> ScanParams {
        ScanParams {
            low_period: self.low_period,
            high_period: self.high_period,
            prelim_downsamples: self.prelim_downsamples,
            matched_filter_width: self.matched_filter_width,
            normalize_each_resolution: self.normalize,
            profile_mode: self.profile_mode,
        }
    }
}
