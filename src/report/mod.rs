//! Reporting utilities: terminal tables for summaries and coverage.

pub mod format;

pub use format::*;
