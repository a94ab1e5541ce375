//! Time-series I/O modules
//!
//! Padded sample buffers, file formats and synthetic test data.

pub mod sample_buffer;
pub mod synthetic;
pub mod time_series;
