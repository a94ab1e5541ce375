//! Search result types

use serde::{Deserialize, Serialize};

/// One scored trial period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// Trial period in original-resolution samples
    pub period: f64,

    /// Scale factor of the buffer the trial was folded at
    pub scale_factor: usize,

    /// Trial period in samples of the folded (downsampled) buffer
    pub downsampled_period: f64,

    /// Score returned by the profile scorer, forwarded verbatim
    pub score: f64,
}

/// Summary of a completed scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Number of trial periods scored
    pub trials: usize,

    /// Number of base periods folded
    pub base_periods: usize,

    /// Number of resolution transitions performed
    pub resolutions: usize,

    /// Highest-scoring trial (earliest wins ties)
    pub best: Option<TrialResult>,
}

impl ScanSummary {
    /// Account for one scored trial
    pub fn observe(&mut self, trial: &TrialResult) {
        self.trials += 1;
        let better = match &self.best {
            Some(best) => trial.score > best.score,
            None => !trial.score.is_nan(),
        };
        if better {
            self.best = Some(*trial);
        }
    }

    /// Fold another summary into this one
    pub fn merge(&mut self, other: &ScanSummary) {
        self.trials += other.trials;
        self.base_periods += other.base_periods;
        self.resolutions += other.resolutions;
        if let Some(best) = &other.best {
            let better = match &self.best {
                Some(current) => best.score > current.score,
                None => true,
            };
            if better {
                self.best = Some(*best);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(period: f64, score: f64) -> TrialResult {
        TrialResult {
            period,
            scale_factor: 1,
            downsampled_period: period,
            score,
        }
    }

    #[test]
    fn test_best_keeps_earliest_tie() {
        let mut summary = ScanSummary::default();
        summary.observe(&trial(10.0, 1.0));
        summary.observe(&trial(11.0, 3.0));
        summary.observe(&trial(12.0, 3.0));
        summary.observe(&trial(13.0, 2.0));

        assert_eq!(summary.trials, 4);
        assert_eq!(summary.best.map(|b| b.period), Some(11.0));
    }

    #[test]
    fn test_nan_scores_never_win() {
        let mut summary = ScanSummary::default();
        summary.observe(&trial(10.0, f64::NAN));
        assert!(summary.best.is_none());
        summary.observe(&trial(11.0, -5.0));
        summary.observe(&trial(12.0, f64::NAN));
        assert_eq!(summary.best.map(|b| b.period), Some(11.0));
    }

    #[test]
    fn test_merge() {
        let mut a = ScanSummary::default();
        a.observe(&trial(10.0, 1.0));
        a.base_periods = 1;
        let mut b = ScanSummary::default();
        b.observe(&trial(20.0, 2.0));
        b.base_periods = 2;
        a.merge(&b);
        assert_eq!(a.trials, 2);
        assert_eq!(a.base_periods, 3);
        assert_eq!(a.best.map(|t| t.period), Some(20.0));
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_string(&trial(128.5, 4.25)).unwrap();
        assert!(json.contains("\"downsampled_period\":128.5"));
        let back: TrialResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.score, 4.25);
    }
}
