//! Fitted-model implementations.
//!
//! The summarizer only sees the `FittedModel` trait; concrete models live here.

pub mod glm;
pub mod model;

pub use glm::*;
pub use model::*;
