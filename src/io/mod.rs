//! Input/output helpers.
//!
//! - new-data and draws CSV ingest (`ingest`)
//! - model JSON (`model_file`)
//! - summary/draws CSV exports (`export`)
//! - summary JSON read/write (`summary`)

pub mod export;
pub mod ingest;
pub mod model_file;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use model_file::*;
pub use summary::*;
