//! Synthetic test series
//!
//! # Example
//!
//! ```
//! use stratum_ffa::io::synthetic::{pulse_train, WhiteNoise};
//!
//! let mut series = pulse_train(1000, 50, 3, 2.0)?;
//! WhiteNoise::new(7).add_to(&mut series, 0.1, 0.0);
//! assert_eq!(series.logical_len(), 1000);
//! # Ok::<(), stratum_ffa::SearchError>(())
//! ```

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::sample_buffer::SampleBuffer;
use crate::error::SearchError;

/// On-pulse sample value
pub const PULSE: f64 = 1.0;
/// Off-pulse sample value
pub const NO_PULSE: f64 = 0.0;

/// Build a noiseless pulse train
///
/// Every sample whose index modulo `period` is below `width` is [`PULSE`], the
/// rest are [`NO_PULSE`].
///
/// # Errors
///
/// Returns `SearchError::InvalidInput` unless `period > width > 0`, plus any
/// error from [`SampleBuffer::new`]
pub fn pulse_train(
    samples: usize,
    period: usize,
    width: usize,
    padding_factor: f64,
) -> Result<SampleBuffer, SearchError> {
    if width == 0 || period <= width {
        return Err(SearchError::InvalidInput(format!(
            "Pulse train needs period > width > 0 (period {}, width {})",
            period, width
        )));
    }

    let mut buffer = SampleBuffer::new(samples, padding_factor)?;
    for (i, x) in buffer.samples_mut().iter_mut().enumerate() {
        *x = if i % period < width { PULSE } else { NO_PULSE };
    }

    log::debug!(
        "Generated {} samples with period {} and width {}",
        samples,
        period,
        width
    );
    Ok(buffer)
}

/// Seeded Gaussian noise source (Box-Muller)
#[derive(Debug, Clone)]
pub struct WhiteNoise {
    rng: StdRng,
    spare: Option<f64>,
}

impl WhiteNoise {
    /// Noise source with a fixed seed; equal seeds give equal sequences
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            spare: None,
        }
    }

    /// Next standard-normal deviate
    fn standard(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }

        let (u1, u2) = loop {
            let u1: f64 = self.rng.random();
            let u2: f64 = self.rng.random();
            if u1 > f64::MIN_POSITIVE {
                break (u1, u2);
            }
        };

        let r = (-2.0 * u1.ln()).sqrt();
        let theta = TAU * u2;
        self.spare = Some(r * theta.sin());
        r * theta.cos()
    }

    /// Draw one sample with standard deviation `sigma` around `mean`
    pub fn sample(&mut self, sigma: f64, mean: f64) -> f64 {
        self.standard() * sigma + mean
    }

    /// Add noise to every logical sample; padding is left alone
    pub fn add_to(&mut self, buffer: &mut SampleBuffer, sigma: f64, mean: f64) {
        for x in buffer.samples_mut() {
            *x += self.sample(sigma, mean);
        }
    }
}
