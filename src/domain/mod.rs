//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - covariate inputs (`Value`, `NewData`, `GridAxis`)
//! - summary configuration (`IntervalSpec`, `PointEstimate`, `SummaryConfig`)
//! - summary outputs (`PredictionSummary`, `SummaryRow`, `CoverageReport`)
//! - run configuration derived from the CLI (`RunConfig`)

pub mod types;

pub use types::*;
