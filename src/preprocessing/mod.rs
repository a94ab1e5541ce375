//! Time-series preprocessing modules
//!
//! This module contains utilities for conditioning a series before folding:
//! - Normalization (median / MAD)
//! - Red-noise suppression (running-median baseline subtraction)
//! - Running median over a sliding window

pub mod normalization;
pub mod red_noise;
pub mod running_median;
