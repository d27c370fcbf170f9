//! Interval summaries of posterior predictive draws.
//!
//! Responsibilities:
//!
//! - validate levels and required predictors before simulating
//! - reduce each draw column to a point estimate and quantile bounds (parallel)
//! - check interval coverage against observed responses

pub mod coverage;
pub mod summarizer;

pub use coverage::*;
pub use summarizer::*;
