//! Error types.
//!
//! - `SummaryError`: everything the library can report to a caller
//! - `AppError`: process-level error carrying the exit code used by `main`

use thiserror::Error;

/// Errors raised while summarizing posterior predictive draws.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SummaryError {
    /// The model handle holds no posterior draws.
    #[error("Model has no posterior draws available; fit or load draws before summarizing.")]
    ModelNotFitted,

    /// `new_data` lacks one or more columns the model needs.
    #[error("New data is missing required predictor column(s): {}", .columns.join(", "))]
    MissingPredictor { columns: Vec<String> },

    /// A requested quantile level is unusable (or none were requested).
    #[error("Invalid interval level {level}: {reason}")]
    InvalidLevel { level: String, reason: String },

    /// Draws matrix (or observed vector) does not line up with the new-data rows.
    #[error("Shape mismatch: expected {expected} column(s), got {actual}.")]
    DrawShape { expected: usize, actual: usize },

    /// A covariate has the wrong kind of value for the term that uses it.
    #[error("Predictor `{column}` must be {expected}.")]
    PredictorType { column: String, expected: &'static str },

    #[error("Invalid new data: {0}")]
    InvalidNewData(String),

    /// The model description itself is inconsistent (terms vs coefficients, link, ...).
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Failure inside the model's own simulation step.
    #[error("Simulation failed: {0}")]
    Simulation(String),
}

impl SummaryError {
    pub fn invalid_level(level: f64, reason: impl Into<String>) -> Self {
        SummaryError::InvalidLevel {
            level: format!("{level}"),
            reason: reason.into(),
        }
    }

    /// Exit code used when this error terminates the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            SummaryError::InvalidLevel { .. }
            | SummaryError::MissingPredictor { .. }
            | SummaryError::PredictorType { .. }
            | SummaryError::InvalidNewData(_)
            | SummaryError::InvalidModel(_) => 2,
            SummaryError::ModelNotFitted => 3,
            SummaryError::DrawShape { .. } | SummaryError::Simulation(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<SummaryError> for AppError {
    fn from(err: SummaryError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_predictor_message_names_every_column() {
        let err = SummaryError::MissingPredictor {
            columns: vec!["mom_iq".to_string(), "mom_hs".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("mom_iq"));
        assert!(msg.contains("mom_hs"));
    }

    #[test]
    fn app_error_keeps_summary_exit_code() {
        let app: AppError = SummaryError::ModelNotFitted.into();
        assert_eq!(app.exit_code(), 3);
        let app: AppError = SummaryError::invalid_level(0.0, "must be > 0").into();
        assert_eq!(app.exit_code(), 2);
        assert!(app.to_string().contains("must be > 0"));
    }
}
