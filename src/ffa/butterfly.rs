//! Single-base-period fast folding
//!
//! Folds a buffer at every trial period between `base` and `base + 1` samples in
//! one pass. The series is cut into `branches` rows of `base` samples each, and
//! `log2(branches)` shift-and-add stages combine pairs of partial folds until
//! each output row holds the full profile for one trial period.
//!
//! # Example
//!
//! ```
//! use stratum_ffa::ffa::butterfly::fold;
//! use stratum_ffa::io::sample_buffer::SampleBuffer;
//!
//! let buffer = SampleBuffer::from_samples((1..=8).map(f64::from), 2.0)?;
//! let (plan, rows) = fold(&buffer, 2)?;
//! assert_eq!(plan.branches, 4);
//! assert_eq!(&rows[..2], &[16.0, 20.0]);
//! # Ok::<(), stratum_ffa::SearchError>(())
//! ```

use super::scoring::ProfileScorer;
use super::smoothing::box_smooth;
use super::{FoldOutput, ProfileMode, ScanParams};
use crate::analysis::result::{ScanSummary, TrialResult};
use crate::error::SearchError;
use crate::io::sample_buffer::SampleBuffer;
use crate::preprocessing::normalization::mad;

/// Shape of one fold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldPlan {
    /// Row length in buffer samples
    pub base_period: usize,
    /// Number of rows, a power of two
    pub branches: usize,
    /// `base_period * branches`
    pub size: usize,
    /// Number of add stages, `log2(branches)`
    pub stages: u32,
}

impl FoldPlan {
    /// Plan a fold of `logical_len` samples stored in `physical_len`
    ///
    /// `size` is the smallest `base_period * 2^m` covering the logical region.
    ///
    /// # Errors
    ///
    /// - `SearchError::InvalidInput` if `base_period` is zero or leaves fewer than
    ///   two rows
    /// - `SearchError::CapacityExceeded` if `size` exceeds `physical_len`
    pub fn new(logical_len: usize, physical_len: usize, base_period: usize) -> Result<Self, SearchError> {
        if base_period == 0 {
            return Err(SearchError::InvalidInput(
                "Base period must be greater than 0".to_string(),
            ));
        }

        let mut branches = 1usize;
        let mut stages = 0u32;
        while base_period.saturating_mul(branches) < logical_len {
            branches *= 2;
            stages += 1;
        }

        if branches < 2 {
            return Err(SearchError::InvalidInput(format!(
                "Base period ({}) too long for series of {} samples",
                base_period, logical_len
            )));
        }

        let size = base_period * branches;
        if size > physical_len {
            return Err(SearchError::CapacityExceeded {
                required: size,
                available: physical_len,
            });
        }

        Ok(Self {
            base_period,
            branches,
            size,
            stages,
        })
    }

    /// Trial period of output row `row`, in buffer samples
    pub fn trial_period(&self, row: usize) -> f64 {
        self.base_period as f64 + row as f64 / (self.branches - 1) as f64
    }
}

/// Copy `[0, size)` of the buffer into rows, blanking the row that straddles
/// the end of the logical region and everything after it
fn initial_rows(buffer: &SampleBuffer, plan: &FoldPlan) -> Vec<f64> {
    let mut rows = buffer.data()[..plan.size].to_vec();

    let base = plan.base_period;
    let first_blank = (buffer.logical_len() / base) * base;
    rows[first_blank..].fill(0.0);

    rows
}

/// One butterfly stage: merge pairs of half-segments into segments of
/// `segment_rows` rows
fn butterfly_stage(previous: &[f64], current: &mut [f64], base: usize, segment_rows: usize) {
    let half = segment_rows / 2;

    for (segment, block) in current.chunks_exact_mut(segment_rows * base).enumerate() {
        let first_row = segment * segment_rows;

        for (k, dest) in block.chunks_exact_mut(base).enumerate() {
            let shift = ((k + 1) / 2) % base;
            let src = (first_row + k / 2) * base;
            let a = &previous[src..src + base];
            let b = &previous[src + half * base..src + (half + 1) * base];

            let (head, tail) = dest.split_at_mut(base - shift);
            for ((out, x), y) in head.iter_mut().zip(a).zip(&b[shift..]) {
                *out = x + y;
            }
            for ((out, x), y) in tail.iter_mut().zip(&a[base - shift..]).zip(&b[..shift]) {
                *out = x + y;
            }
        }
    }
}

/// Fold `buffer` at all trial periods from `base_period` to `base_period + 1`
///
/// Returns the plan and the final rows, `plan.size` values laid out as
/// `plan.branches` profiles of `base_period` bins; row `k` is the profile at
/// [`FoldPlan::trial_period`]`(k)`. The buffer is not modified.
///
/// # Errors
///
/// See [`FoldPlan::new`]
pub fn fold(buffer: &SampleBuffer, base_period: usize) -> Result<(FoldPlan, Vec<f64>), SearchError> {
    let plan = FoldPlan::new(buffer.logical_len(), buffer.physical_len(), base_period)?;

    log::debug!(
        "Folding base period {} at scale factor {}: {} rows, size {} (logical {})",
        base_period,
        buffer.scale_factor(),
        plan.branches,
        plan.size,
        buffer.logical_len()
    );

    let mut previous = initial_rows(buffer, &plan);
    let mut current = vec![0.0; plan.size];

    for stage in 1..=plan.stages {
        butterfly_stage(&previous, &mut current, base_period, 1 << stage);
        std::mem::swap(&mut previous, &mut current);
    }

    Ok((plan, previous))
}

/// Fold one base period, score every trial and forward it to the sinks
///
/// Rows are smoothed with `params.matched_filter_width` before scoring. The
/// profile sink, if any, gets the smoothed row as-is or MAD-normalized
/// according to `params.profile_mode`.
pub fn fold_base_period(
    buffer: &SampleBuffer,
    base_period: usize,
    params: &ScanParams,
    scorer: &dyn ProfileScorer,
    output: &mut FoldOutput<'_>,
) -> Result<ScanSummary, SearchError> {
    let (plan, mut rows) = fold(buffer, base_period)?;
    let scale_factor = buffer.scale_factor();

    let mut summary = ScanSummary {
        base_periods: 1,
        ..ScanSummary::default()
    };
    let mut scratch = Vec::with_capacity(base_period);
    let mut normalized = Vec::with_capacity(base_period);

    for (row, profile) in rows.chunks_exact_mut(base_period).enumerate() {
        box_smooth(profile, params.matched_filter_width, &mut scratch);

        let downsampled_period = plan.trial_period(row);
        let trial = TrialResult {
            period: downsampled_period * scale_factor as f64,
            scale_factor,
            downsampled_period,
            score: scorer.score(profile),
        };
        output.results.record(&trial)?;

        if let Some(sink) = output.profiles.as_mut() {
            match params.profile_mode {
                ProfileMode::Raw => sink.record_profile(&trial, profile)?,
                ProfileMode::Mad => {
                    normalized.clear();
                    normalized.extend_from_slice(profile);
                    mad(&mut normalized, base_period)?;
                    sink.record_profile(&trial, &normalized)?;
                }
            }
        }

        summary.observe(&trial);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(samples: &[f64]) -> SampleBuffer {
        SampleBuffer::from_samples(samples.iter().copied(), 2.0).unwrap()
    }

    /// Fold by direct summation with a linear drift of `row` bins across all
    /// branches; exact for the first and last rows
    fn brute_force_row(samples: &[f64], plan: &FoldPlan, row: usize) -> Vec<f64> {
        let base = plan.base_period;
        let mut profile = vec![0.0; base];
        for branch in 0..plan.branches {
            let drift = (branch * row + (plan.branches - 1) / 2) / (plan.branches - 1);
            for bin in 0..base {
                let idx = branch * base + (bin + drift) % base;
                profile[bin] += samples.get(idx).copied().unwrap_or(0.0);
            }
        }
        profile
    }

    #[test]
    fn test_worked_example() {
        let (plan, rows) = fold(&buffer(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]), 2).unwrap();
        assert_eq!(plan.branches, 4);
        assert_eq!(plan.stages, 2);
        assert_eq!(plan.size, 8);
        assert_eq!(&rows[0..2], &[16.0, 20.0]);
        assert_eq!(&rows[2..4], &[18.0, 18.0]);
        assert_eq!(&rows[6..8], &[18.0, 18.0]);
        assert_eq!(plan.trial_period(0), 2.0);
        assert_eq!(plan.trial_period(3), 3.0);
    }

    #[test]
    fn test_rows_preserve_total() {
        let samples: Vec<f64> = (0..64).map(|i| ((i * 37) % 11) as f64).collect();
        let total: f64 = samples.iter().sum();
        let (plan, rows) = fold(&buffer(&samples), 4).unwrap();
        for profile in rows.chunks_exact(plan.base_period) {
            let sum: f64 = profile.iter().sum();
            assert!((sum - total).abs() < 1e-9, "Row sum {} != total {}", sum, total);
        }
    }

    #[test]
    fn test_matches_brute_force_drift() {
        let samples: Vec<f64> = (0..40).map(|i| ((i * 13 + 5) % 17) as f64).collect();
        let (plan, rows) = fold(&buffer(&samples), 5).unwrap();
        assert_eq!(plan.branches, 8);
        for row in [0, plan.branches - 1] {
            let expected = brute_force_row(&samples, &plan, row);
            let got = &rows[row * 5..(row + 1) * 5];
            assert_eq!(got, expected.as_slice(), "Row {} mismatch", row);
        }
    }

    #[test]
    fn test_straddling_row_is_zeroed() {
        // 7 samples, base 2: the fourth row holds sample 7 and one padding bin
        let source = buffer(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let plan = FoldPlan::new(source.logical_len(), source.physical_len(), 2).unwrap();
        let rows = initial_rows(&source, &plan);
        assert_eq!(rows, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rows_past_logical_end_are_zeroed() {
        // 9 samples, base 2: row 4 straddles the end, rows 5-7 are padding
        let source = buffer(&[1.0; 9]);
        let plan = FoldPlan::new(source.logical_len(), source.physical_len(), 2).unwrap();
        assert_eq!(plan.size, 16);
        let rows = initial_rows(&source, &plan);
        assert!(rows[..8].iter().all(|&x| x == 1.0));
        assert!(rows[8..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_exact_fit_keeps_last_row() {
        let source = buffer(&[1.0; 8]);
        let plan = FoldPlan::new(source.logical_len(), source.physical_len(), 4).unwrap();
        let rows = initial_rows(&source, &plan);
        assert!(rows.iter().all(|&x| x == 1.0));
    }

    #[test]
    fn test_capacity_exceeded() {
        // 9 samples at padding 1.0 cannot hold a 16-sample fold
        let source = SampleBuffer::from_samples((0..9).map(f64::from), 1.0).unwrap();
        let err = fold(&source, 2).unwrap_err();
        assert!(
            matches!(err, SearchError::CapacityExceeded { required: 16, .. }),
            "Unexpected error: {:?}",
            err
        );
    }

    #[test]
    fn test_base_period_too_long() {
        let source = buffer(&[0.0; 10]);
        assert!(matches!(fold(&source, 10), Err(SearchError::InvalidInput(_))));
        assert!(matches!(fold(&source, 0), Err(SearchError::InvalidInput(_))));
    }

    #[test]
    fn test_source_untouched() {
        let source = buffer(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let before = source.clone();
        fold(&source, 2).unwrap();
        assert_eq!(source, before);
    }

    #[test]
    fn test_fold_base_period_reports_every_row() {
        let source = buffer(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let params = ScanParams {
            low_period: 2,
            high_period: 4,
            prelim_downsamples: 0,
            matched_filter_width: 0,
            normalize_each_resolution: false,
            profile_mode: ProfileMode::Raw,
        };
        let mut results: Vec<TrialResult> = Vec::new();
        let mut profiles: Vec<(TrialResult, Vec<f64>)> = Vec::new();
        let mut output = FoldOutput::new(&mut results).with_profiles(&mut profiles);
        let scorer = |p: &[f64]| p[1] - p[0];

        let summary = fold_base_period(&source, 2, &params, &scorer, &mut output).unwrap();

        assert_eq!(summary.trials, 4);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].score, 4.0);
        assert_eq!(profiles[0].1, vec![16.0, 20.0]);
        assert!(results.windows(2).all(|w| w[0].period < w[1].period));
        assert_eq!(summary.best.map(|b| b.period), Some(2.0));
    }

    #[test]
    fn test_mad_profiles_are_normalized_copies() {
        let samples: Vec<f64> = (0..32).map(|i| ((i * 7) % 5) as f64).collect();
        let source = buffer(&samples);
        let params = ScanParams {
            low_period: 4,
            high_period: 8,
            prelim_downsamples: 0,
            matched_filter_width: 0,
            normalize_each_resolution: false,
            profile_mode: ProfileMode::Mad,
        };
        let mut results: Vec<TrialResult> = Vec::new();
        let mut profiles: Vec<(TrialResult, Vec<f64>)> = Vec::new();
        let mut output = FoldOutput::new(&mut results).with_profiles(&mut profiles);
        let scorer = |p: &[f64]| p.iter().sum::<f64>();

        fold_base_period(&source, 4, &params, &scorer, &mut output).unwrap();

        // Scores see the raw rows: every row sums to the series total
        let total: f64 = samples.iter().sum();
        assert!(results.iter().all(|r| (r.score - total).abs() < 1e-9));
        assert_eq!(profiles.len(), results.len());
    }
}
