//! Read fitted-model JSON files.
//!
//! A model file carries what a regression fit reports: family, link, term
//! names, and either coefficient draws or an estimate vector with its
//! covariance matrix. Example:
//!
//! ```json
//! {
//!   "family": "binomial",
//!   "link": "logit",
//!   "terms": ["(Intercept)", "dist100"],
//!   "estimate": [0.61, -0.62],
//!   "vcov": [[0.0036, -0.0047], [-0.0047, 0.0095]],
//!   "n_draws": 4000,
//!   "seed": 42
//! }
//! ```

use std::fs::File;
use std::path::Path;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ResponseScale;
use crate::error::{AppError, SummaryError};
use crate::models::{Family, Link, PosteriorGlm, Term};

fn default_n_draws() -> usize {
    4000
}

fn default_seed() -> u64 {
    42
}

fn default_scale() -> ResponseScale {
    ResponseScale::Expected
}

/// On-disk model description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub family: Family,
    /// Defaults to the family's canonical link.
    #[serde(default)]
    pub link: Option<Link>,
    pub terms: Vec<String>,

    /// Coefficient estimates (normal approximation with `vcov`).
    #[serde(default)]
    pub estimate: Option<Vec<f64>>,
    #[serde(default)]
    pub vcov: Option<Vec<Vec<f64>>>,
    /// Coefficient draws, one inner vector per draw. Takes precedence over `vcov`.
    #[serde(default)]
    pub coef_draws: Option<Vec<Vec<f64>>>,

    /// Residual standard deviation (gaussian).
    #[serde(default)]
    pub sigma: Option<f64>,
    #[serde(default)]
    pub df_residual: Option<f64>,
    /// Binomial trials per row.
    #[serde(default)]
    pub trials: Option<u64>,
    /// Negative-binomial shape.
    #[serde(default)]
    pub phi: Option<f64>,
    /// Column added to the linear predictor.
    #[serde(default)]
    pub offset: Option<String>,

    #[serde(default = "default_scale")]
    pub scale: ResponseScale,
    #[serde(default = "default_n_draws")]
    pub n_draws: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Run-time overrides applied on top of a model file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelOverrides {
    pub seed: Option<u64>,
    pub n_draws: Option<usize>,
    pub scale: Option<ResponseScale>,
}

impl ModelFile {
    /// Build the simulating model described by this file.
    pub fn into_model(self, overrides: ModelOverrides) -> Result<PosteriorGlm, SummaryError> {
        let terms: Vec<Term> = self
            .terms
            .iter()
            .map(|t| t.parse::<Term>().map_err(SummaryError::InvalidModel))
            .collect::<Result<_, _>>()?;
        let p = terms.len();
        let link = self.link.unwrap_or_else(|| self.family.canonical_link());
        let seed = overrides.seed.unwrap_or(self.seed);
        let n_draws = overrides.n_draws.unwrap_or(self.n_draws);

        let mut model = match (&self.coef_draws, &self.estimate, &self.vcov) {
            (Some(draws), _, _) => {
                let matrix = rows_to_matrix(draws, p, "coef_draws")?;
                let model = PosteriorGlm::from_draws(self.family, link, terms, matrix)?;
                match &self.estimate {
                    Some(est) => model.with_estimate(DVector::from_column_slice(est))?,
                    None => model,
                }
            }
            (None, Some(est), Some(vcov)) => {
                if est.len() != p {
                    return Err(SummaryError::InvalidModel(format!(
                        "{} estimate(s) for {p} term(s)",
                        est.len()
                    )));
                }
                let cov = rows_to_matrix(vcov, p, "vcov")?;
                PosteriorGlm::approximate(
                    self.family,
                    link,
                    terms,
                    DVector::from_column_slice(est),
                    &cov,
                    n_draws,
                    seed,
                )?
            }
            // Point estimates alone carry no posterior uncertainty.
            _ => return Err(SummaryError::ModelNotFitted),
        };

        model = model
            .with_seed(seed)
            .with_scale(overrides.scale.unwrap_or(self.scale));
        if let Some(sigma) = self.sigma {
            model = model.with_sigma(sigma, self.df_residual)?;
        }
        if let Some(trials) = self.trials {
            model = model.with_trials(trials);
        }
        if let Some(phi) = self.phi {
            model = model.with_phi(phi)?;
        }
        if let Some(offset) = self.offset {
            model = model.with_offset(offset);
        }
        Ok(model)
    }
}

fn rows_to_matrix(rows: &[Vec<f64>], width: usize, field: &str) -> Result<DMatrix<f64>, SummaryError> {
    if let Some(bad) = rows.iter().find(|r| r.len() != width) {
        return Err(SummaryError::InvalidModel(format!(
            "`{field}` row has {} value(s), expected {width}",
            bad.len()
        )));
    }
    Ok(DMatrix::from_fn(rows.len(), width, |i, j| rows[i][j]))
}

/// Read a model JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let model: ModelFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid model JSON: {e}")))?;
    debug!(path = %path.display(), family = ?model.family, terms = model.terms.len(), "loaded model file");
    Ok(model)
}
