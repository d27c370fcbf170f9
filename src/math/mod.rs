//! Numeric utilities: draw-sample order statistics and multivariate normal sampling.

pub mod mvn;
pub mod quantile;

pub use mvn::*;
pub use quantile::*;
