//! Shared pipeline logic used by every command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! new data -> model -> draws -> summary -> (optional) coverage
//!
//! The commands can then focus on presentation (printing vs exporting).

use nalgebra::DMatrix;
use tracing::{debug, info, warn};

use crate::domain::{CoverageReport, ModelSource, NewData, NewDataSource, PredictionSummary, RunConfig};
use crate::error::{AppError, SummaryError};
use crate::io::{ModelOverrides, load_draws, load_new_data, read_model_json};
use crate::models::{DrawsModel, FittedModel};
use crate::summarize::{coverage, summarize};

/// A loaded model plus a short label for reports.
pub struct LoadedModel {
    pub model: Box<dyn FittedModel>,
    pub label: String,
}

/// All computed outputs of a single `predint summarize` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub new_data: NewData,
    pub summary: PredictionSummary,
    pub coverage: Option<CoverageReport>,
    pub n_draws: usize,
    pub model_label: String,
}

/// Resolve the new-data rows for a run.
pub fn load_rows(source: &NewDataSource) -> Result<NewData, AppError> {
    match source {
        NewDataSource::Csv(path) => load_new_data(path),
        NewDataSource::Grid { axes, fixed } => {
            let data = NewData::grid(axes, fixed)?;
            debug!(rows = data.len(), "built prediction grid");
            Ok(data)
        }
    }
}

/// Load the model named by the run configuration.
pub fn load_model(config: &RunConfig) -> Result<LoadedModel, AppError> {
    match &config.model {
        ModelSource::Glm(path) => {
            let file = read_model_json(path)?;
            let overrides = ModelOverrides {
                seed: config.seed,
                n_draws: config.n_draws,
                scale: config.scale,
            };
            let label = format!("{} ({:?}, {} term(s))", path.display(), file.family, file.terms.len());
            let model = file.into_model(overrides)?;
            Ok(LoadedModel {
                model: Box::new(model),
                label,
            })
        }
        ModelSource::Draws(path) => {
            if config.scale.is_some() {
                warn!("--scale only applies to --model; precomputed draws are used as-is");
            }
            let draws = load_draws(path)?;
            let model = DrawsModel::new(draws).with_required(config.summary.required_predictors.iter().cloned());
            Ok(LoadedModel {
                model: Box::new(model),
                label: format!("{} (precomputed draws)", path.display()),
            })
        }
    }
}

/// Execute the full summarize pipeline and return the computed outputs.
pub fn run_summary(config: &RunConfig) -> Result<RunOutput, AppError> {
    // 1) New data.
    let new_data = load_rows(&config.new_data)?;

    // 2) Model.
    let loaded = load_model(config)?;

    // 3) Summary.
    let summary = summarize(loaded.model.as_ref(), &new_data, &config.summary)?;
    info!(rows = summary.len(), point = summary.point.label(), "summarized predictive draws");

    // 4) Optional coverage against an observed column.
    let coverage = match &config.observed {
        Some(column) => {
            let observed = new_data.observed_column(column)?;
            Some(coverage(&summary, &observed)?)
        }
        None => None,
    };

    Ok(RunOutput {
        n_draws: loaded.model.n_draws(),
        model_label: loaded.label,
        new_data,
        summary,
        coverage,
    })
}

/// Simulate the raw `[n_draws x n_rows]` predictive matrix without summarizing it.
pub fn simulate_draws(config: &RunConfig) -> Result<DMatrix<f64>, AppError> {
    let new_data = load_rows(&config.new_data)?;
    let loaded = load_model(config)?;

    let missing = new_data.missing_columns(loaded.model.required_predictors().iter().map(String::as_str));
    if !missing.is_empty() {
        return Err(SummaryError::MissingPredictor { columns: missing }.into());
    }
    if loaded.model.n_draws() == 0 {
        return Err(SummaryError::ModelNotFitted.into());
    }

    let draws = loaded.model.simulate_predictions(&new_data)?;
    info!(n_draws = draws.nrows(), n_rows = draws.ncols(), "simulated predictive draws");
    Ok(draws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::domain::{GridAxis, SummaryConfig, Value};

    fn config(model: ModelSource, new_data: NewDataSource) -> RunConfig {
        RunConfig {
            new_data,
            model,
            summary: SummaryConfig::default(),
            seed: None,
            n_draws: Some(200),
            scale: None,
            observed: None,
            digits: 3,
            export_csv: None,
            export_json: None,
        }
    }

    #[test]
    fn grid_with_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("wells.json");
        fs::write(
            &model_path,
            r#"{"family":"binomial","terms":["(Intercept)","dist100"],
                "estimate":[0.61,-0.62],"vcov":[[0.0036,-0.0047],[-0.0047,0.0095]]}"#,
        )
        .unwrap();

        let grid = NewDataSource::Grid {
            axes: vec![GridAxis {
                name: "dist100".to_string(),
                min: 0.0,
                max: 3.0,
                steps: 7,
            }],
            fixed: Vec::new(),
        };
        let run = run_summary(&config(ModelSource::Glm(model_path), grid)).unwrap();

        assert_eq!(run.summary.len(), 7);
        assert_eq!(run.n_draws, 200);
        // Probability of switching falls with distance.
        let est = run.summary.estimates();
        assert!(est.windows(2).all(|w| w[0] > w[1]), "{est:?}");
        assert!(est.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn draws_file_with_observed_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let draws_path = dir.path().join("draws.csv");
        let data_path = dir.path().join("rows.csv");
        fs::write(&draws_path, "row1,row2\n1,10\n2,20\n3,30\n4,40\n5,50\n").unwrap();
        fs::write(&data_path, "x,y\n0,3\n1,100\n").unwrap();

        let mut cfg = config(ModelSource::Draws(draws_path), NewDataSource::Csv(data_path));
        cfg.observed = Some("y".to_string());
        let run = run_summary(&cfg).unwrap();

        assert_eq!(run.new_data.value(1, "x"), Some(&Value::Number(1.0)));
        assert_eq!(run.summary.estimates(), vec![3.0, 30.0]);
        let cov = run.coverage.unwrap();
        assert_eq!(cov.intervals.len(), 2);
        assert!((cov.intervals[0].observed - 0.5).abs() < 1e-12);
    }

    #[test]
    fn missing_observations_are_skipped_in_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let draws_path = dir.path().join("draws.csv");
        let data_path = dir.path().join("rows.csv");
        fs::write(&draws_path, "1,10\n2,20\n3,30\n4,40\n5,50\n").unwrap();
        fs::write(&data_path, "x,y\n0,NA\n1,30\n").unwrap();

        let mut cfg = config(ModelSource::Draws(draws_path), NewDataSource::Csv(data_path));
        cfg.observed = Some("y".to_string());
        let run = run_summary(&cfg).unwrap();

        let cov = run.coverage.unwrap();
        assert!(cov.intervals.iter().all(|iv| iv.n == 1));
        assert!(cov.intervals.iter().all(|iv| iv.observed == 1.0));
    }

    #[test]
    fn scale_is_ignored_for_precomputed_draws() {
        let dir = tempfile::tempdir().unwrap();
        let draws_path = dir.path().join("draws.csv");
        let data_path = dir.path().join("rows.csv");
        fs::write(&draws_path, "1\n2\n3\n").unwrap();
        fs::write(&data_path, "x\n0\n").unwrap();

        let mut cfg = config(ModelSource::Draws(draws_path), NewDataSource::Csv(data_path));
        cfg.scale = Some(crate::domain::ResponseScale::Predictive);
        let run = run_summary(&cfg).unwrap();
        assert_eq!(run.summary.estimates(), vec![2.0]);
    }

    #[test]
    fn missing_required_predictor_maps_to_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let draws_path = dir.path().join("draws.csv");
        let data_path = dir.path().join("rows.csv");
        fs::write(&draws_path, "1\n2\n").unwrap();
        fs::write(&data_path, "x\n0\n").unwrap();

        let mut cfg = config(ModelSource::Draws(draws_path), NewDataSource::Csv(data_path));
        cfg.summary = SummaryConfig::default().requiring(["mom_iq"]);
        let err = run_summary(&cfg).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("mom_iq"));
    }

    #[test]
    fn simulated_draws_follow_the_model_seed() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("kid.json");
        fs::write(
            &model_path,
            r#"{"family":"gaussian","terms":["(Intercept)","mom_iq"],
                "estimate":[26.0,0.6],"vcov":[[35.0,-0.34],[-0.34,0.0034]],
                "sigma":18.3,"df_residual":432,"scale":"predictive","seed":7}"#,
        )
        .unwrap();
        let grid = NewDataSource::Grid {
            axes: vec![GridAxis {
                name: "mom_iq".to_string(),
                min: 80.0,
                max: 120.0,
                steps: 3,
            }],
            fixed: Vec::new(),
        };

        let cfg = config(ModelSource::Glm(model_path), grid);
        let a = simulate_draws(&cfg).unwrap();
        let b = simulate_draws(&cfg).unwrap();
        assert_eq!(a.shape(), (200, 3));
        assert_eq!(a, b);
    }
}
