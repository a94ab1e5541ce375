//! # Stratum FFA
//!
//! A Fast Folding Algorithm (FFA) engine for finding periodic pulsed signals in
//! long, evenly sampled time series, such as pulsar searches in radio telescope
//! data.
//!
//! ## Features
//!
//! - **Fast folding**: Staelin's butterfly folds a series at every trial period
//!   between two integers in `O(N log(N/p))`
//! - **Multi-resolution scan**: the series is downsampled each time the trial
//!   period doubles, keeping folds at a constant number of bins per sample
//! - **Red-noise suppression**: running-median baseline subtraction with an
//!   `O(log W)` two-heap median
//! - **Robust normalization**: median / MAD scaling
//! - **Pluggable scoring**: any `Fn(&[f64]) -> f64`, or the bundled matched-filter,
//!   peak and off-pulse scorers
//!
//! ## Quick Start
//!
//! ```
//! use stratum_ffa::io::synthetic::{pulse_train, WhiteNoise};
//! use stratum_ffa::{search_periods, FoldOutput, ScoreMethod, SearchConfig, TrialResult};
//!
//! // 4096 samples with a 3-sample-wide pulse every 100 samples
//! let mut series = pulse_train(4096, 100, 3, 2.0)?;
//! WhiteNoise::new(1).add_to(&mut series, 0.2, 0.0);
//!
//! let config = SearchConfig {
//!     low_period: 64,
//!     high_period: 128,
//!     ..SearchConfig::default()
//! };
//! let mut trials: Vec<TrialResult> = Vec::new();
//! let summary = search_periods(&series, &config, &ScoreMethod::MatchedFilter, &mut FoldOutput::new(&mut trials))?;
//!
//! let best = summary.best.expect("at least one trial");
//! println!("Best period: {:.3} samples (score {:.2})", best.period, best.score);
//! # Ok::<(), stratum_ffa::SearchError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Time series → SampleBuffer → MAD / de-redden → scan (downsample, fold, score) → sinks
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod ffa;
pub mod io;
pub mod preprocessing;

use std::borrow::Cow;

// Re-export main types
pub use analysis::result::{ScanSummary, TrialResult};
pub use analysis::sink::{ProfileSink, ResultSink, TextProfileWriter, TextResultWriter};
pub use config::SearchConfig;
pub use error::SearchError;
pub use ffa::scoring::{ProfileScorer, ScoreMethod};
pub use ffa::{prepare_resolution, scan_periods, FoldOutput, ProfileMode, ScanParams};
pub use io::sample_buffer::SampleBuffer;

/// Main search function
///
/// Preprocesses a copy of the series as configured and scans the configured
/// period range, streaming every scored trial to `output`.
///
/// Order of operations:
/// 1. Optional MAD normalization of the whole series
/// 2. Optional broad de-reddening pass (window `2 * high_period + 1`), after
///    which the scan's own de-reddening window is set
/// 3. The multi-resolution scan ([`ffa::scan_periods`])
///
/// Steps 1 and 2 are [`prepare_series`].
///
/// # Arguments
///
/// * `source` - Input series; left unmodified
/// * `config` - Search configuration
/// * `scorer` - Scores each folded profile
/// * `output` - Result and optional profile sinks
///
/// # Returns
///
/// `ScanSummary` with trial counts and the best-scoring trial
///
/// # Errors
///
/// Returns `SearchError` if the configuration is invalid, the series is not
/// longer than the high period, or any fold or sink fails
///
/// # Example
///
/// ```
/// use stratum_ffa::{search_periods, FoldOutput, SampleBuffer, ScoreMethod, SearchConfig, TrialResult};
///
/// let series = SampleBuffer::from_samples((0..2048).map(|i| (i % 37 == 0) as u8 as f64), 2.0)?;
/// let config = SearchConfig { low_period: 32, high_period: 48, ..SearchConfig::default() };
///
/// let mut trials: Vec<TrialResult> = Vec::new();
/// let summary = search_periods(&series, &config, &ScoreMethod::Peak, &mut FoldOutput::new(&mut trials))?;
/// assert_eq!(summary.best.map(|b| b.period), Some(37.0));
/// # Ok::<(), stratum_ffa::SearchError>(())
/// ```
pub fn search_periods(
    source: &SampleBuffer,
    config: &SearchConfig,
    scorer: &dyn ProfileScorer,
    output: &mut FoldOutput<'_>,
) -> Result<ScanSummary, SearchError> {
    use std::time::Instant;
    let start_time = Instant::now();

    config.validate()?;

    log::debug!(
        "Starting period search: {} samples, periods {}..{}",
        source.logical_len(),
        config.low_period,
        config.high_period
    );

    if source.logical_len() <= config.high_period {
        return Err(SearchError::InvalidInput(format!(
            "Series of {} samples is too short for a high period of {}",
            source.logical_len(),
            config.high_period
        )));
    }

    let working = prepare_series(source, config)?;

    let summary = ffa::scan_periods(&working, &config.scan_params(), scorer, output)?;

    log::info!(
        "Search finished in {:.1} ms: {} trials",
        start_time.elapsed().as_secs_f64() * 1000.0,
        summary.trials
    );

    Ok(summary)
}

/// Apply the configured whole-series preprocessing
///
/// Returns the series exactly as [`search_periods`] hands it to the scan: MAD
/// normalized if `config.normalize`, and broadly de-reddened with the scan's
/// window set if `config.red_noise`. Borrows `source` when nothing applies.
///
/// # Errors
///
/// Returns `SearchError` if normalization or de-reddening fails
pub fn prepare_series<'a>(
    source: &'a SampleBuffer,
    config: &SearchConfig,
) -> Result<Cow<'a, SampleBuffer>, SearchError> {
    let mut working = Cow::Borrowed(source);

    // 1. Normalization
    if config.normalize {
        let buffer = working.to_mut();
        let len = buffer.logical_len();
        preprocessing::normalization::mad(buffer.samples_mut(), len)?;
        log::debug!("Series normalized via MAD");
    }

    // 2. Broad de-reddening, then the scan's window
    if config.red_noise {
        let broad = config.initial_red_noise_window();
        log::debug!("First-pass de-reddening with window {}", broad);
        let mut dereddened = preprocessing::red_noise::deredden(&working, broad)?;
        dereddened.set_red_noise(true, config.scan_red_noise_window())?;
        working = Cow::Owned(dereddened);
    } else if working.red_noise_enabled() {
        let window = working.red_noise_window();
        working.to_mut().set_red_noise(false, window)?;
    }

    Ok(working)
}
