//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - daily observations and the positional `Series` fed to the detector
//! - exchange identifiers (`Exchange`)
//! - per-security exchange rows (`DailyQuote`)

pub mod types;

pub use types::*;
