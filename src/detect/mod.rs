//! Anomaly detection over daily amount series.
//!
//! - robust window statistics (`stats`)
//! - the lagged rolling MAD detector (`mad`)

pub mod mad;
pub mod stats;

pub use mad::*;
