//! `etf-mad` library crate.
//!
//! The binary (`etfmad`) is a thin wrapper around this library so that:
//!
//! - the lagged MAD detector is usable without any process-exit policy
//! - fetching, merging and reporting are testable without spawning processes

pub mod app;
pub mod cli;
pub mod data;
pub mod detect;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod report;
