//! Input/output helpers.
//!
//! - series CSV ingest (`ingest`)
//! - composite series merge (`composite`)
//! - detection and quote CSV writers (`export`)

pub mod composite;
pub mod export;
pub mod ingest;

pub use composite::*;
pub use export::*;
pub use ingest::*;
