//! Profile scoring
//!
//! The engine judges each folded profile through the [`ProfileScorer`]
//! capability and forwards the returned score without interpreting it. Any
//! `Fn(&[f64]) -> f64` closure is a scorer; [`ScoreMethod`] bundles the
//! reference scorers:
//!
//! 1. Boxcar matched filter on a MAD-normalized copy of the profile
//! 2. Boxcar matched filter with off-pulse window statistics
//!    (Kondratiev et al. 2009)
//! 3. Peak value
//! 4. Max-min range in units of the profile's standard deviation
//! 5. Off-pulse window statistic without matched filtering
//! 7. Integral of the MAD-normalized profile
//! 8. Mean of the MAD-normalized profile
//!
//! Number 6 was withdrawn and is not accepted.
//!
//! # Example
//!
//! ```
//! use stratum_ffa::ffa::scoring::{ProfileScorer, ScoreMethod};
//!
//! let profile = [0.0, 0.0, 9.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
//! assert_eq!(ScoreMethod::Peak.score(&profile), 9.0);
//!
//! let total = |p: &[f64]| p.iter().sum::<f64>();
//! assert_eq!(total.score(&profile), 9.0);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::preprocessing::normalization::mad;

/// Widest boxcar tried by the matched-filter scorers, as a fraction of the profile
const MAX_FILTER_FRACTION: f64 = 0.2;

/// Fraction of the profile excluded around the peak by the off-pulse statistic
const OFF_PULSE_EXCLUSION: f64 = 0.2;

/// Scores one folded profile
///
/// Implementations must be pure functions of the profile: the engine calls them
/// once per trial, in scan order, and may share them across threads in batch use.
pub trait ProfileScorer: Sync {
    /// Score a profile; larger means more pulse-like by convention
    fn score(&self, profile: &[f64]) -> f64;
}

impl<F> ProfileScorer for F
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    fn score(&self, profile: &[f64]) -> f64 {
        self(profile)
    }
}

/// Reference scoring methods, numbered as in the FFAncy tooling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreMethod {
    /// 1: MAD-normalized boxcar matched filter, best SNR over widths 1, 2, 4, ...
    MatchedFilter,
    /// 2: Boxcar matched filter scored with the off-pulse statistic
    OffPulseMatchedFilter,
    /// 3: Highest bin (floored at zero)
    Peak,
    /// 4: (max - min) / standard deviation
    MaxMin,
    /// 5: (peak - off-pulse mean) / off-pulse RMS
    OffPulse,
    /// 7: Sum of the MAD-normalized profile
    Integral,
    /// 8: Mean of the MAD-normalized profile
    Average,
}

impl ScoreMethod {
    /// All methods in numeric order
    pub const ALL: [ScoreMethod; 7] = [
        ScoreMethod::MatchedFilter,
        ScoreMethod::OffPulseMatchedFilter,
        ScoreMethod::Peak,
        ScoreMethod::MaxMin,
        ScoreMethod::OffPulse,
        ScoreMethod::Integral,
        ScoreMethod::Average,
    ];

    /// Look up a method by its number
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidInput` for unknown numbers
    pub fn from_code(code: u8) -> Result<Self, SearchError> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.code() == code)
            .ok_or_else(|| SearchError::InvalidInput(format!("Unknown score method {}", code)))
    }

    /// Numeric identifier
    pub fn code(&self) -> u8 {
        match self {
            ScoreMethod::MatchedFilter => 1,
            ScoreMethod::OffPulseMatchedFilter => 2,
            ScoreMethod::Peak => 3,
            ScoreMethod::MaxMin => 4,
            ScoreMethod::OffPulse => 5,
            ScoreMethod::Integral => 7,
            ScoreMethod::Average => 8,
        }
    }

    /// Short name
    pub fn name(&self) -> &'static str {
        match self {
            ScoreMethod::MatchedFilter => "matched-filter",
            ScoreMethod::OffPulseMatchedFilter => "off-pulse-matched-filter",
            ScoreMethod::Peak => "peak",
            ScoreMethod::MaxMin => "max-min",
            ScoreMethod::OffPulse => "off-pulse",
            ScoreMethod::Integral => "integral",
            ScoreMethod::Average => "average",
        }
    }
}

impl fmt::Display for ScoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScoreMethod {
    type Err = SearchError;

    /// Accepts either the number or the short name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.trim().parse::<u8>() {
            return Self::from_code(code);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s.trim())
            .ok_or_else(|| SearchError::InvalidInput(format!("Unknown score method '{}'", s)))
    }
}

impl ProfileScorer for ScoreMethod {
    fn score(&self, profile: &[f64]) -> f64 {
        match self {
            ScoreMethod::MatchedFilter => matched_filter_snr(profile),
            ScoreMethod::OffPulseMatchedFilter => off_pulse_matched_filter(profile),
            ScoreMethod::Peak => peak(profile),
            ScoreMethod::MaxMin => max_min(profile),
            ScoreMethod::OffPulse => off_pulse_snr(profile),
            ScoreMethod::Integral => integral(profile),
            ScoreMethod::Average => average(profile),
        }
    }
}

/// Highest bin, never below zero
pub fn peak(profile: &[f64]) -> f64 {
    profile.iter().copied().fold(0.0, f64::max)
}

/// Range of the profile over its standard deviation; zero for a flat profile
pub fn max_min(profile: &[f64]) -> f64 {
    if profile.is_empty() {
        return 0.0;
    }
    let n = profile.len() as f64;
    let max = profile.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = profile.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = profile.iter().sum::<f64>() / n;
    let sigma = (profile.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();

    if sigma > 0.0 {
        (max - min) / sigma
    } else {
        0.0
    }
}

/// Peak height above the off-pulse mean in units of the off-pulse RMS
///
/// The off-pulse region is everything outside a window of 20% of the profile
/// centred on the peak, wrapping around the profile ends. Returns zero when no
/// off-pulse region is left or it has no spread.
pub fn off_pulse_snr(profile: &[f64]) -> f64 {
    let n = profile.len();
    if n == 0 {
        return 0.0;
    }

    let (peak_pos, peak_value) = profile
        .iter()
        .copied()
        .enumerate()
        .fold((0, profile[0]), |best, (i, x)| if x > best.1 { (i, x) } else { best });

    let half_width = (n as f64 * OFF_PULSE_EXCLUSION / 2.0).ceil() as usize;
    let excluded = (2 * half_width).min(n);
    let remaining = n - excluded;
    if remaining == 0 {
        return 0.0;
    }

    // Off-pulse bins start right after the exclusion window
    let start = (peak_pos + n - half_width % n) % n;
    let off_pulse = || (excluded..n).map(move |j| profile[(start + j) % n]);

    let mean = off_pulse().sum::<f64>() / remaining as f64;
    let rms = (off_pulse().map(|x| (x - mean).powi(2)).sum::<f64>() / remaining as f64).sqrt();

    if rms > 0.0 {
        (peak_value - mean) / rms
    } else {
        0.0
    }
}

/// Number of boxcar doublings so the widest box reaches 20% of the profile
fn filter_layers(n: usize) -> u32 {
    let limit = n as f64 * MAX_FILTER_FRACTION;
    let mut layers = 0;
    while ((1usize << layers) as f64) < limit {
        layers += 1;
    }
    layers
}

/// Add each bin to the one `shift` bins later (circularly), doubling the box width
fn double_boxcar(input: &[f64], shift: usize, output: &mut [f64]) {
    let n = input.len();
    for (j, out) in output.iter_mut().enumerate() {
        *out = input[j] + input[(j + shift) % n];
    }
}

/// Best boxcar SNR of the MAD-normalized profile
///
/// Widths 1, 2, 4, ... up to the first power of two reaching 20% of the profile;
/// a box of width `w` scores `sum / sqrt(w)`. Non-finite input scores NaN.
pub fn matched_filter_snr(profile: &[f64]) -> f64 {
    let n = profile.len();
    if n == 0 {
        return 0.0;
    }

    let mut current = profile.to_vec();
    if mad(&mut current, n).is_err() {
        return f64::NAN;
    }

    let mut best = peak(&current);
    let mut next = vec![0.0; n];

    for layer in 0..filter_layers(n) {
        let shift = 1usize << layer;
        double_boxcar(&current, shift, &mut next);
        let norm = ((2 * shift) as f64).sqrt();
        best = next.iter().fold(best, |acc, &x| acc.max(x / norm));
        std::mem::swap(&mut current, &mut next);
    }

    best
}

/// Sum of the MAD-normalized profile
///
/// Normalization leaves a zero baseline, so the sum is the area the pulse adds
/// above it. Non-finite input scores NaN.
pub fn integral(profile: &[f64]) -> f64 {
    let n = profile.len();
    if n == 0 {
        return 0.0;
    }

    let mut normalized = profile.to_vec();
    if mad(&mut normalized, n).is_err() {
        return f64::NAN;
    }
    normalized.iter().sum()
}

/// Mean of the MAD-normalized profile
pub fn average(profile: &[f64]) -> f64 {
    if profile.is_empty() {
        return 0.0;
    }
    integral(profile) / profile.len() as f64
}

/// Best off-pulse statistic over the boxcar width ladder
pub fn off_pulse_matched_filter(profile: &[f64]) -> f64 {
    let n = profile.len();
    if n == 0 {
        return 0.0;
    }

    let mut current = profile.to_vec();
    let mut best = off_pulse_snr(&current);
    let mut next = vec![0.0; n];

    for layer in 0..filter_layers(n) {
        double_boxcar(&current, 1usize << layer, &mut next);
        best = best.max(off_pulse_snr(&next));
        std::mem::swap(&mut current, &mut next);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_profile(n: usize, at: usize, width: usize, height: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let noise = ((i * 7919) % 13) as f64 * 0.1;
                if (i + n - at) % n < width {
                    height + noise
                } else {
                    noise
                }
            })
            .collect()
    }

    #[test]
    fn test_codes_round_trip() {
        for method in ScoreMethod::ALL {
            assert_eq!(ScoreMethod::from_code(method.code()).unwrap(), method);
            assert_eq!(method.name().parse::<ScoreMethod>().unwrap(), method);
        }
        assert!(ScoreMethod::from_code(6).is_err());
        assert_eq!("2".parse::<ScoreMethod>().unwrap(), ScoreMethod::OffPulseMatchedFilter);
        assert!("bogus".parse::<ScoreMethod>().is_err());
    }

    #[test]
    fn test_peak() {
        assert_eq!(peak(&[-3.0, -1.0]), 0.0);
        assert_eq!(peak(&[1.0, 5.0, 2.0]), 5.0);
    }

    #[test]
    fn test_max_min_flat_profile() {
        assert_eq!(max_min(&[2.0; 10]), 0.0);
        // [0, 2]: sigma 1, range 2
        assert_eq!(max_min(&[0.0, 2.0]), 2.0);
    }

    #[test]
    fn test_off_pulse_wraps_exclusion_window() {
        // Peak in the last bin: its exclusion window spans both ends
        let mut profile = vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        profile[9] = 10.0;
        profile[0] = 10.0;
        // Window of 2 bins centred at index 0 excludes bins 9 and 0
        let snr = off_pulse_snr(&profile);
        // Off-pulse bins 1..=8: mean 0.5, rms 0.5
        assert!((snr - 19.0).abs() < 1e-12, "got {}", snr);
    }

    #[test]
    fn test_off_pulse_degenerate_cases() {
        assert_eq!(off_pulse_snr(&[]), 0.0);
        assert_eq!(off_pulse_snr(&[1.0, 2.0]), 0.0);
        assert_eq!(off_pulse_snr(&[4.0; 20]), 0.0);
    }

    #[test]
    fn test_matched_filter_prefers_pulsed_profile() {
        let pulsed = pulse_profile(100, 40, 6, 5.0);
        let flat = pulse_profile(100, 40, 6, 0.0);
        let pulsed_score = matched_filter_snr(&pulsed);
        let flat_score = matched_filter_snr(&flat);
        assert!(
            pulsed_score > flat_score,
            "Pulsed profile should outscore noise: {:.3} vs {:.3}",
            pulsed_score,
            flat_score
        );
        assert!(pulsed_score.is_finite());
    }

    #[test]
    fn test_matched_filter_constant_profile_is_finite() {
        let score = matched_filter_snr(&[3.0; 32]);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_off_pulse_matched_filter_prefers_wide_pulse() {
        let wide = pulse_profile(64, 10, 8, 2.0);
        let single = off_pulse_snr(&wide);
        let ladder = off_pulse_matched_filter(&wide);
        assert!(ladder >= single);
    }

    #[test]
    fn test_integral_and_average() {
        let pulsed = pulse_profile(50, 20, 4, 10.0);
        let quiet = pulse_profile(50, 20, 4, 0.0);
        assert!(integral(&pulsed) > integral(&quiet));
        assert!(integral(&pulsed) > 0.0);
        assert_eq!(average(&pulsed), integral(&pulsed) / 50.0);

        assert_eq!(integral(&[2.5; 16]), 0.0);
        assert_eq!(average(&[]), 0.0);
        assert!(integral(&[1.0, f64::NAN, 2.0]).is_nan());
        assert_eq!(ScoreMethod::Average.score(&pulsed), average(&pulsed));
    }

    #[test]
    fn test_withdrawn_code_is_rejected() {
        assert!(ScoreMethod::from_code(6).is_err());
        assert!(ScoreMethod::from_code(9).is_err());
        assert_eq!("7".parse::<ScoreMethod>().unwrap(), ScoreMethod::Integral);
        assert_eq!("average".parse::<ScoreMethod>().unwrap(), ScoreMethod::Average);
    }

    #[test]
    fn test_filter_layers() {
        assert_eq!(filter_layers(4), 0);
        assert_eq!(filter_layers(10), 1);
        assert_eq!(filter_layers(100), 5);
    }

    #[test]
    fn test_closures_are_scorers() {
        let scorer = |p: &[f64]| p.len() as f64;
        assert_eq!(scorer.score(&[0.0; 7]), 7.0);
        assert_eq!(ScoreMethod::Peak.to_string(), "peak");
    }
}
