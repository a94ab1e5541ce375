//! Consumers of the per-trial output stream
//!
//! The engine pushes every scored trial into a [`ResultSink`] and, optionally,
//! every folded profile into a [`ProfileSink`], in scan order: trial periods
//! rise within a base period, base periods rise across the scan, and overlaps
//! between neighbouring base periods are passed through as-is.

use std::io::Write;

use super::result::TrialResult;
use crate::error::SearchError;

/// Receives one record per scored trial
pub trait ResultSink {
    /// Record a trial
    fn record(&mut self, trial: &TrialResult) -> Result<(), SearchError>;
}

/// Receives the folded profile behind each scored trial
pub trait ProfileSink {
    /// Record a profile; `profile.len()` equals the base period
    fn record_profile(&mut self, trial: &TrialResult, profile: &[f64]) -> Result<(), SearchError>;
}

impl ResultSink for Vec<TrialResult> {
    fn record(&mut self, trial: &TrialResult) -> Result<(), SearchError> {
        self.push(*trial);
        Ok(())
    }
}

impl ProfileSink for Vec<(TrialResult, Vec<f64>)> {
    fn record_profile(&mut self, trial: &TrialResult, profile: &[f64]) -> Result<(), SearchError> {
        self.push((*trial, profile.to_vec()));
        Ok(())
    }
}

/// Writes trials as whitespace-separated text, one per line
///
/// Columns: period (original samples), downsample factor, period (downsampled
/// samples), score.
#[derive(Debug)]
pub struct TextResultWriter<W: Write> {
    writer: W,
    header_written: bool,
}

impl<W: Write> TextResultWriter<W> {
    /// Wrap a writer; the header goes out with the first record
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    /// Flush and return the inner writer
    pub fn into_inner(mut self) -> Result<W, SearchError> {
        self.write_header()?;
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_header(&mut self) -> Result<(), SearchError> {
        if !self.header_written {
            writeln!(
                self.writer,
                "# Period (original samples) | Downsample factor | Period (downsampled samples) | Metric"
            )?;
            self.header_written = true;
        }
        Ok(())
    }
}

impl<W: Write> ResultSink for TextResultWriter<W> {
    fn record(&mut self, trial: &TrialResult) -> Result<(), SearchError> {
        self.write_header()?;
        writeln!(
            self.writer,
            "{:.10} {} {:.10} {:.10}",
            trial.period, trial.scale_factor, trial.downsampled_period, trial.score
        )?;
        Ok(())
    }
}

/// Writes each profile as one text line: period, scale factor, then the bins
#[derive(Debug)]
pub struct TextProfileWriter<W: Write> {
    writer: W,
}

impl<W: Write> TextProfileWriter<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Flush and return the inner writer
    pub fn into_inner(mut self) -> Result<W, SearchError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> ProfileSink for TextProfileWriter<W> {
    fn record_profile(&mut self, trial: &TrialResult, profile: &[f64]) -> Result<(), SearchError> {
        write!(self.writer, "{:.10} {}", trial.period, trial.scale_factor)?;
        for bin in profile {
            write!(self.writer, " {:.6}", bin)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}
