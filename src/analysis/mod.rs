//! Search output modules
//!
//! Types describing what a scan produces and where it goes:
//! - Result types (per-trial records, scan summary)
//! - Sinks (in-memory collectors and text writers)

pub mod result;
pub mod sink;
