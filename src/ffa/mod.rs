//! Fast folding engine
//!
//! [`scan_periods`] walks integer base periods from the low to the high end of
//! the search range. Each base period is folded at every fractional trial period
//! up to the next integer by the butterfly transform ([`butterfly`]); every
//! trial profile is scored ([`scoring`]) and streamed to the caller's sinks.
//!
//! The series is re-derived from the source at each doubling of the period
//! (`low`, `2 * low`, `4 * low`, ...): downsampled once more, optionally
//! de-reddened and normalized. Between doublings the period advances by the
//! working buffer's scale factor so every base period stays integral.

pub mod butterfly;
pub mod scoring;
pub mod smoothing;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::analysis::result::ScanSummary;
use crate::analysis::sink::{ProfileSink, ResultSink};
use crate::error::SearchError;
use crate::io::sample_buffer::SampleBuffer;
use crate::preprocessing::normalization::mad;
use crate::preprocessing::red_noise::deredden;
use scoring::ProfileScorer;

/// Form in which folded profiles reach the profile sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileMode {
    /// Folded (and smoothed) profile as scored
    Raw,
    /// MAD-normalized copy of the profile
    Mad,
}

/// Engine-level scan parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanParams {
    /// First period searched, in original samples
    pub low_period: usize,
    /// Search stops before this period, in original samples
    pub high_period: usize,
    /// Downsampling passes applied before the first fold
    pub prelim_downsamples: u32,
    /// Boxcar width applied to each profile before scoring (0 = off)
    pub matched_filter_width: usize,
    /// MAD-normalize the series at every resolution change
    pub normalize_each_resolution: bool,
    /// Form of the profiles handed to the profile sink
    pub profile_mode: ProfileMode,
}

impl ScanParams {
    /// Check the period range
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.low_period < 2 {
            return Err(SearchError::InvalidInput(format!(
                "Low period must be at least 2 samples, got {}",
                self.low_period
            )));
        }
        if self.high_period <= self.low_period {
            return Err(SearchError::ConfigurationError(format!(
                "High period ({}) must exceed low period ({})",
                self.high_period, self.low_period
            )));
        }
        Ok(())
    }
}

/// Destinations for the per-trial output stream
pub struct FoldOutput<'a> {
    /// Receives every scored trial
    pub results: &'a mut dyn ResultSink,
    /// Receives every folded profile, if set
    pub profiles: Option<&'a mut dyn ProfileSink>,
}

impl<'a> FoldOutput<'a> {
    /// Output to a result sink only
    pub fn new(results: &'a mut dyn ResultSink) -> Self {
        Self {
            results,
            profiles: None,
        }
    }

    /// Also send profiles to `profiles`
    pub fn with_profiles(mut self, profiles: &'a mut dyn ProfileSink) -> Self {
        self.profiles = Some(profiles);
        self
    }
}

/// Scale factor of the first working buffer: the source's, doubled once per
/// preliminary downsample
fn effective_scale_factor(source: &SampleBuffer, prelim_downsamples: u32) -> Result<usize, SearchError> {
    1usize
        .checked_shl(prelim_downsamples)
        .and_then(|factor| factor.checked_mul(source.scale_factor()))
        .ok_or_else(|| {
            SearchError::ConfigurationError(format!(
                "Too many preliminary downsamples ({})",
                prelim_downsamples
            ))
        })
}

/// Derive the working buffer for resolution `level` from the source
///
/// Downsamples `prelim_downsamples + level` times, de-reddens with the source
/// window scaled by `2^level` when enabled, then MAD-normalizes if requested.
///
/// # Errors
///
/// Returns `SearchError::ConfigurationError` if the scaled window overflows,
/// or any error from de-reddening or normalization
pub fn prepare_resolution<'a>(
    source: &'a SampleBuffer,
    params: &ScanParams,
    level: u32,
) -> Result<Cow<'a, SampleBuffer>, SearchError> {
    let mut working = Cow::Borrowed(source);

    for _ in 0..params.prelim_downsamples + level {
        working = Cow::Owned(working.downsample());
    }

    if working.red_noise_enabled() {
        let window = 1usize
            .checked_shl(level)
            .and_then(|factor| source.red_noise_window().checked_mul(factor))
            .ok_or_else(|| {
                SearchError::ConfigurationError(format!(
                    "De-reddening window overflows at resolution {}",
                    level
                ))
            })?;
        log::debug!("De-reddening resolution {} with window of {} original samples", level, window);
        working = Cow::Owned(deredden(&working, window)?);
    }

    if params.normalize_each_resolution {
        let buffer = working.to_mut();
        let len = buffer.logical_len();
        mad(buffer.samples_mut(), len)?;
        log::debug!("Normalized resolution {} via MAD", level);
    }

    Ok(working)
}

/// Replace `working` with the buffer for resolution `level`
///
/// The previous buffer is released before the next one is built, so only the
/// source and one working buffer are alive across a transition. On error
/// `working` is left borrowing the source.
fn advance_resolution<'a>(
    working: &mut Cow<'a, SampleBuffer>,
    source: &'a SampleBuffer,
    params: &ScanParams,
    level: u32,
) -> Result<(), SearchError> {
    *working = Cow::Borrowed(source);
    *working = prepare_resolution(source, params, level)?;
    Ok(())
}

/// Scan every trial period in `[low_period, high_period)`
///
/// Trials are pushed to `output` in scan order. The source buffer is never
/// modified; downsampled and filtered copies are derived from it as needed.
///
/// # Arguments
///
/// * `source` - Series at its initial resolution, with its red-noise settings
/// * `params` - Period range and per-profile options
/// * `scorer` - Scores each folded profile
/// * `output` - Result and optional profile sinks
///
/// # Errors
///
/// All parameter checks run before the first fold:
/// - `SearchError::InvalidInput` if `low_period < 2`
/// - `SearchError::ConfigurationError` if `high_period <= low_period`, or
///   `low_period` is not a multiple of the source's scale factor after the
///   preliminary downsamples
///
/// Folding errors (`CapacityExceeded`, base period too long) and sink errors
/// stop the scan where they occur.
///
/// # Example
///
/// ```
/// use stratum_ffa::analysis::result::TrialResult;
/// use stratum_ffa::ffa::{scan_periods, scoring::ScoreMethod, FoldOutput, ProfileMode, ScanParams};
/// use stratum_ffa::io::sample_buffer::SampleBuffer;
///
/// let source = SampleBuffer::from_samples((0..256).map(|i| if i % 10 == 0 { 1.0 } else { 0.0 }), 2.0)?;
/// let params = ScanParams {
///     low_period: 8,
///     high_period: 16,
///     prelim_downsamples: 0,
///     matched_filter_width: 0,
///     normalize_each_resolution: false,
///     profile_mode: ProfileMode::Raw,
/// };
/// let mut trials: Vec<TrialResult> = Vec::new();
/// let summary = scan_periods(&source, &params, &ScoreMethod::Peak, &mut FoldOutput::new(&mut trials))?;
///
/// assert_eq!(summary.base_periods, 8);
/// assert_eq!(summary.best.map(|b| b.period), Some(10.0));
/// # Ok::<(), stratum_ffa::SearchError>(())
/// ```
pub fn scan_periods(
    source: &SampleBuffer,
    params: &ScanParams,
    scorer: &dyn ProfileScorer,
    output: &mut FoldOutput<'_>,
) -> Result<ScanSummary, SearchError> {
    params.validate()?;

    if params.low_period % source.scale_factor() != 0 {
        return Err(SearchError::ConfigurationError(format!(
            "Low period ({}) must be a multiple of the initial scale factor ({})",
            params.low_period,
            source.scale_factor()
        )));
    }
    let start_scale = effective_scale_factor(source, params.prelim_downsamples)?;
    if params.low_period % start_scale != 0 {
        return Err(SearchError::ConfigurationError(format!(
            "Low period ({}) must be a multiple of the scale factor after {} preliminary downsamples ({})",
            params.low_period, params.prelim_downsamples, start_scale
        )));
    }

    log::info!(
        "Scanning periods {} to {} over {} samples (scale factor {}, {} preliminary downsamples)",
        params.low_period,
        params.high_period,
        source.logical_len(),
        source.scale_factor(),
        params.prelim_downsamples
    );

    let mut summary = ScanSummary::default();
    let mut working = Cow::Borrowed(source);
    let mut level = 0u32;
    let mut next_transition = params.low_period;
    let mut period = params.low_period;

    while period < params.high_period {
        if period == next_transition {
            advance_resolution(&mut working, source, params, level)?;
            log::debug!(
                "Resolution {} at period {}: scale factor {}, {} samples",
                level,
                period,
                working.scale_factor(),
                working.logical_len()
            );
            summary.resolutions += 1;
            level += 1;
            next_transition = next_transition.saturating_mul(2);
        }

        let scale_factor = working.scale_factor();
        let folded = butterfly::fold_base_period(&working, period / scale_factor, params, scorer, output)?;
        summary.merge(&folded);
        period += scale_factor;
    }

    log::info!(
        "Scan complete: {} trials over {} base periods at {} resolutions",
        summary.trials,
        summary.base_periods,
        summary.resolutions
    );

    Ok(summary)
}
