//! Turn posterior predictive draws into per-row interval summaries.
//!
//! Given:
//! - a fitted model that can simulate the response for new rows
//! - the new rows themselves
//! - interval levels and a point-estimate rule
//!
//! we simulate one `[n_draws x n_rows]` matrix, reduce each column to a point
//! estimate plus one quantile per level, and return the rows in input order
//! next to their untouched covariates.

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{IntervalSpec, NewData, PointEstimate, PredictionSummary, SummaryConfig, SummaryRow};
use crate::error::SummaryError;
use crate::math::{median_sorted, quantile_sorted, sample_mean, sorted_finite};
use crate::models::FittedModel;

/// Reduced draws of a single column.
#[derive(Debug, Clone)]
struct ColumnSummary {
    estimate: f64,
    bounds: Vec<f64>,
    n_finite: usize,
}

/// Summarize the model's predictive draws at every row of `new_data`.
pub fn summarize(
    model: &dyn FittedModel,
    new_data: &NewData,
    config: &SummaryConfig,
) -> Result<PredictionSummary, SummaryError> {
    ensure_predictors(model, new_data, config)?;
    if model.n_draws() == 0 {
        return Err(SummaryError::ModelNotFitted);
    }

    let draws = model.simulate_predictions(new_data)?;
    debug!(n_draws = draws.nrows(), n_rows = draws.ncols(), "simulated predictive draws");

    // A model that asks for its own point prediction but has none falls back
    // to the draw mean.
    let mut point = config.point;
    let model_fit = match point {
        PointEstimate::Model => match model.point_predictions(new_data)? {
            Some(fit) if fit.len() == new_data.len() => Some(fit),
            Some(fit) => {
                return Err(SummaryError::DrawShape {
                    expected: new_data.len(),
                    actual: fit.len(),
                });
            }
            None => {
                warn!("model has no point prediction; using the draw mean");
                point = PointEstimate::Mean;
                None
            }
        },
        _ => None,
    };

    let columns = summarize_draws(&draws, new_data.len(), &config.levels, point)?;

    let rows = new_data
        .rows()
        .iter()
        .zip(columns)
        .enumerate()
        .map(|(j, (covariates, col))| SummaryRow {
            covariates: covariates.clone(),
            estimate: model_fit.as_ref().map_or(col.estimate, |fit| fit[j]),
            bounds: col.bounds,
            n_draws: col.n_finite,
        })
        .collect();

    Ok(PredictionSummary {
        covariate_names: new_data.columns().to_vec(),
        point,
        levels: config.levels.clone(),
        rows,
    })
}

/// Validate `levels` from raw values and summarize with default settings otherwise.
pub fn summarize_at_levels(
    model: &dyn FittedModel,
    new_data: &NewData,
    levels: &[f64],
) -> Result<PredictionSummary, SummaryError> {
    let config = SummaryConfig::default().with_levels(IntervalSpec::new(levels.iter().copied())?);
    summarize(model, new_data, &config)
}

fn ensure_predictors(
    model: &dyn FittedModel,
    new_data: &NewData,
    config: &SummaryConfig,
) -> Result<(), SummaryError> {
    let model_required = model.required_predictors();
    let required = config
        .required_predictors
        .iter()
        .chain(model_required.iter())
        .map(String::as_str);
    let missing = new_data.missing_columns(required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SummaryError::MissingPredictor { columns: missing })
    }
}

/// Reduce every column of `draws` (one per new-data row).
fn summarize_draws(
    draws: &DMatrix<f64>,
    n_rows: usize,
    levels: &IntervalSpec,
    point: PointEstimate,
) -> Result<Vec<ColumnSummary>, SummaryError> {
    if draws.ncols() != n_rows {
        return Err(SummaryError::DrawShape {
            expected: n_rows,
            actual: draws.ncols(),
        });
    }
    if draws.nrows() == 0 {
        return Err(SummaryError::ModelNotFitted);
    }

    // Each column is reduced independently (parallel); indexed collection keeps input order.
    let columns: Vec<ColumnSummary> = (0..n_rows)
        .into_par_iter()
        .map(|j| summarize_column(draws.column(j).iter(), levels.levels(), point))
        .collect();

    for (j, col) in columns.iter().enumerate() {
        if col.n_finite == 0 {
            warn!(row = j, "no finite draws for row; summary is NaN");
        } else if col.n_finite < draws.nrows() {
            debug!(row = j, dropped = draws.nrows() - col.n_finite, "dropped non-finite draws");
        }
    }

    Ok(columns)
}

fn summarize_column<'a>(
    draws: impl IntoIterator<Item = &'a f64>,
    levels: &[f64],
    point: PointEstimate,
) -> ColumnSummary {
    let sorted = sorted_finite(draws);
    let estimate = match point {
        PointEstimate::Median => median_sorted(&sorted),
        // `Model` estimates are substituted by the caller.
        PointEstimate::Mean | PointEstimate::Model => sample_mean(&sorted),
    };
    let bounds = levels.iter().map(|&p| quantile_sorted(&sorted, p)).collect();
    ColumnSummary {
        estimate,
        bounds,
        n_finite: sorted.len(),
    }
}
