//! `predint` library crate.
//!
//! The binary (`predint`) is a thin wrapper around this library so that:
//!
//! - the summarizer is usable from other programs without the CLI
//! - core logic is testable without spawning processes
//!
//! The central entry point is [`summarize::summarize`]: give it any
//! [`models::FittedModel`] plus new covariate rows and it returns per-row
//! point estimates and quantile bounds of the posterior predictive draws.

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod summarize;
