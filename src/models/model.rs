//! The fitted-model capability consumed by the summarizer.
//!
//! Anything that can produce posterior draws of the response for a set of new
//! covariate rows can be summarized: a simulated GLM posterior, draws exported
//! from an MCMC run, or a test double.

use nalgebra::DMatrix;

use crate::domain::NewData;
use crate::error::SummaryError;

/// A previously estimated probabilistic model.
pub trait FittedModel {
    /// Simulate the response for every row of `new_data`.
    ///
    /// Returns an `[n_draws x new_data.len()]` matrix: column `j` holds the
    /// draws for row `j`, on the response's natural scale.
    fn simulate_predictions(&self, new_data: &NewData) -> Result<DMatrix<f64>, SummaryError>;

    /// Number of posterior draws the model can produce. Zero means not fitted.
    fn n_draws(&self) -> usize;

    /// Predictor columns the model's formula reads.
    fn required_predictors(&self) -> Vec<String> {
        Vec::new()
    }

    /// The model's own response-scale point prediction, if it has one.
    fn point_predictions(&self, _new_data: &NewData) -> Result<Option<Vec<f64>>, SummaryError> {
        Ok(None)
    }
}

/// A model backed by a fixed matrix of draws.
///
/// Useful when draws were produced elsewhere (e.g. exported from a sampler)
/// for exactly the rows of a known new-data table.
#[derive(Debug, Clone)]
pub struct DrawsModel {
    draws: DMatrix<f64>,
    required: Vec<String>,
}

impl DrawsModel {
    pub fn new(draws: DMatrix<f64>) -> Self {
        Self {
            draws,
            required: Vec::new(),
        }
    }

    /// Build from per-row draw vectors (one `Vec` per new-data row).
    pub fn from_columns(columns: &[Vec<f64>]) -> Result<Self, SummaryError> {
        let n_draws = columns.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != n_draws) {
            return Err(SummaryError::DrawShape {
                expected: n_draws,
                actual: bad.len(),
            });
        }
        let draws = DMatrix::from_fn(n_draws, columns.len(), |i, j| columns[j][i]);
        Ok(Self::new(draws))
    }

    pub fn with_required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = names.into_iter().map(Into::into).collect();
        self
    }
}

impl FittedModel for DrawsModel {
    fn simulate_predictions(&self, new_data: &NewData) -> Result<DMatrix<f64>, SummaryError> {
        if self.draws.nrows() == 0 {
            return Err(SummaryError::ModelNotFitted);
        }
        if self.draws.ncols() != new_data.len() {
            return Err(SummaryError::DrawShape {
                expected: new_data.len(),
                actual: self.draws.ncols(),
            });
        }
        Ok(self.draws.clone())
    }

    fn n_draws(&self) -> usize {
        self.draws.nrows()
    }

    fn required_predictors(&self) -> Vec<String> {
        self.required.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Value;

    fn rows(n: usize) -> NewData {
        NewData::from_columns(vec![(
            "x".to_string(),
            (0..n).map(|i| Value::Number(i as f64)).collect(),
        )])
        .unwrap()
    }

    #[test]
    fn draws_model_returns_columns_in_order() {
        let model = DrawsModel::from_columns(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        let m = model.simulate_predictions(&rows(3)).unwrap();
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 3);
        assert_eq!(m[(1, 2)], 6.0);
    }

    #[test]
    fn draws_model_rejects_wrong_row_count() {
        let model = DrawsModel::from_columns(&[vec![1.0], vec![2.0]]).unwrap();
        assert_eq!(
            model.simulate_predictions(&rows(3)),
            Err(SummaryError::DrawShape { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn empty_draws_are_not_fitted() {
        let model = DrawsModel::new(DMatrix::zeros(0, 2));
        assert_eq!(model.n_draws(), 0);
        assert_eq!(model.simulate_predictions(&rows(2)), Err(SummaryError::ModelNotFitted));
    }

    #[test]
    fn ragged_columns_are_rejected() {
        assert!(DrawsModel::from_columns(&[vec![1.0, 2.0], vec![3.0]]).is_err());
    }
}
