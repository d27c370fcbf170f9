//! Approximate-posterior simulation for generalized linear models.
//!
//! A `PosteriorGlm` holds a matrix of coefficient draws `B` (`n_draws x p`)
//! and a list of formula terms. For new data with design matrix `X`
//! (`n_rows x p`) the linear predictor draws are
//!
//! ```text
//! η = B Xᵀ (+ offset)        [n_draws x n_rows]
//! ```
//!
//! which are mapped through the inverse link to the expected response, and
//! optionally through the family's sampling distribution to a new observation.
//!
//! Coefficient draws either come in directly (e.g. from a sampler) or are
//! generated from a normal approximation `N(β̂, V)` with a fixed seed.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand_distr::{Binomial, ChiSquared, Gamma, Normal, Poisson};
use serde::{Deserialize, Serialize};
use statrs::distribution::ContinuousCDF;

use crate::domain::{NewData, ResponseScale, Value};
use crate::error::SummaryError;
use crate::math::{cholesky_lower, sample_mvn};
use crate::models::FittedModel;

/// Response distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Gaussian,
    Binomial,
    Poisson,
    NegativeBinomial,
}

impl Family {
    pub fn canonical_link(self) -> Link {
        match self {
            Family::Gaussian => Link::Identity,
            Family::Binomial => Link::Logit,
            Family::Poisson | Family::NegativeBinomial => Link::Log,
        }
    }
}

/// Link function `g`, with `E[y] = g⁻¹(η)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    Identity,
    Logit,
    Probit,
    /// Student-t CDF link with `df` degrees of freedom.
    Robit { df: f64 },
    Log,
}

impl Link {
    pub fn inverse(self, eta: f64) -> f64 {
        match self {
            Link::Identity => eta,
            Link::Logit => {
                if eta >= 0.0 {
                    1.0 / (1.0 + (-eta).exp())
                } else {
                    let e = eta.exp();
                    e / (1.0 + e)
                }
            }
            Link::Probit => match statrs::distribution::Normal::new(0.0, 1.0) {
                Ok(d) => d.cdf(eta),
                Err(_) => f64::NAN,
            },
            Link::Robit { df } => match statrs::distribution::StudentsT::new(0.0, 1.0, df) {
                Ok(d) => d.cdf(eta),
                Err(_) => f64::NAN,
            },
            Link::Log => eta.exp(),
        }
    }

    fn validate(self) -> Result<(), SummaryError> {
        match self {
            Link::Robit { df } if !(df.is_finite() && df > 0.0) => Err(SummaryError::InvalidModel(
                format!("robit link needs df > 0, got {df}"),
            )),
            _ => Ok(()),
        }
    }
}

/// One factor of a formula term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Factor {
    /// Numeric covariate, used as-is.
    Numeric(String),
    /// `1` when `column` equals `level`, else `0`.
    Indicator { column: String, level: String },
}

impl Factor {
    pub fn column(&self) -> &str {
        match self {
            Factor::Numeric(c) => c,
            Factor::Indicator { column, .. } => column,
        }
    }

    fn eval(&self, value: &Value) -> Result<f64, SummaryError> {
        match self {
            Factor::Numeric(column) => value.as_number().ok_or_else(|| SummaryError::PredictorType {
                column: column.clone(),
                expected: "numeric",
            }),
            Factor::Indicator { column, level } => match value {
                Value::Category(c) => Ok(if c == level { 1.0 } else { 0.0 }),
                // 0/1 coded columns: `mom_hs[1]` matches the number 1.
                Value::Number(v) => match level.parse::<f64>() {
                    Ok(l) => Ok(if *v == l { 1.0 } else { 0.0 }),
                    Err(_) => Err(SummaryError::PredictorType {
                        column: column.clone(),
                        expected: "categorical",
                    }),
                },
            },
        }
    }
}

/// A product of factors; the empty product is the intercept.
///
/// Text form: `(Intercept)`, `x`, `x:z`, `group[b]`, `x:group[b]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub factors: Vec<Factor>,
}

impl Term {
    pub fn intercept() -> Self {
        Self { factors: Vec::new() }
    }

    pub fn is_intercept(&self) -> bool {
        self.factors.is_empty()
    }
}

impl FromStr for Term {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "(Intercept)" || s == "1" {
            return Ok(Term::intercept());
        }

        let mut factors = Vec::new();
        for part in s.split(':') {
            let part = part.trim();
            if part.is_empty() {
                return Err(format!("empty factor in term '{s}'"));
            }
            let factor = match part.split_once('[') {
                Some((column, rest)) => {
                    let level = rest
                        .strip_suffix(']')
                        .ok_or_else(|| format!("unterminated level in term '{s}'"))?;
                    if column.is_empty() || level.is_empty() {
                        return Err(format!("indicator needs column[level], got '{part}'"));
                    }
                    Factor::Indicator {
                        column: column.to_string(),
                        level: level.to_string(),
                    }
                }
                None => Factor::Numeric(part.to_string()),
            };
            factors.push(factor);
        }
        Ok(Term { factors })
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_intercept() {
            return write!(f, "(Intercept)");
        }
        let parts: Vec<String> = self
            .factors
            .iter()
            .map(|factor| match factor {
                Factor::Numeric(c) => c.clone(),
                Factor::Indicator { column, level } => format!("{column}[{level}]"),
            })
            .collect();
        write!(f, "{}", parts.join(":"))
    }
}

/// Simulated posterior of a fitted GLM.
#[derive(Debug, Clone)]
pub struct PosteriorGlm {
    family: Family,
    link: Link,
    terms: Vec<Term>,
    offset: Option<String>,
    /// `n_draws x p` coefficient draws.
    coef_draws: DMatrix<f64>,
    /// Point estimates, when known (used for the model's own point prediction).
    estimate: Option<DVector<f64>>,
    /// Residual standard deviation per draw (gaussian only).
    sigma_draws: Option<DVector<f64>>,
    trials: u64,
    phi: Option<f64>,
    scale: ResponseScale,
    seed: u64,
}

impl PosteriorGlm {
    /// Wrap coefficient draws produced elsewhere.
    pub fn from_draws(
        family: Family,
        link: Link,
        terms: Vec<Term>,
        coef_draws: DMatrix<f64>,
    ) -> Result<Self, SummaryError> {
        link.validate()?;
        if terms.is_empty() {
            return Err(SummaryError::InvalidModel("model has no terms".to_string()));
        }
        if coef_draws.ncols() != terms.len() {
            return Err(SummaryError::InvalidModel(format!(
                "{} term(s) but {} coefficient column(s)",
                terms.len(),
                coef_draws.ncols()
            )));
        }
        Ok(Self {
            family,
            link,
            terms,
            offset: None,
            coef_draws,
            estimate: None,
            sigma_draws: None,
            trials: 1,
            phi: None,
            scale: ResponseScale::Expected,
            seed: 0,
        })
    }

    /// Draw `n_draws` coefficient vectors from `N(estimate, cov)`.
    pub fn approximate(
        family: Family,
        link: Link,
        terms: Vec<Term>,
        estimate: DVector<f64>,
        cov: &DMatrix<f64>,
        n_draws: usize,
        seed: u64,
    ) -> Result<Self, SummaryError> {
        let p = estimate.len();
        if cov.nrows() != p || cov.ncols() != p {
            return Err(SummaryError::InvalidModel(format!(
                "covariance is {}x{}, expected {p}x{p}",
                cov.nrows(),
                cov.ncols()
            )));
        }
        let lower = cholesky_lower(cov).ok_or_else(|| {
            SummaryError::InvalidModel("covariance matrix is not positive semi-definite".to_string())
        })?;

        let mut rng = StdRng::seed_from_u64(seed);
        let draws = sample_mvn(&mut rng, &estimate, &lower, n_draws);

        let mut model = Self::from_draws(family, link, terms, draws)?;
        model.estimate = Some(estimate);
        model.seed = seed;
        Ok(model)
    }

    /// Residual sigma for gaussian models.
    ///
    /// With `df_residual`, each draw gets `sigma * sqrt(df / χ²(df))`;
    /// without it sigma is held fixed.
    pub fn with_sigma(mut self, sigma: f64, df_residual: Option<f64>) -> Result<Self, SummaryError> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(SummaryError::InvalidModel(format!("sigma must be > 0, got {sigma}")));
        }
        let n = self.coef_draws.nrows();
        let draws = match df_residual {
            None => DVector::from_element(n, sigma),
            Some(df) => {
                let chi = ChiSquared::new(df).map_err(|e| {
                    SummaryError::InvalidModel(format!("invalid residual df {df}: {e}"))
                })?;
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
                DVector::from_fn(n, |_, _| sigma * (df / chi.sample(&mut rng)).sqrt())
            }
        };
        self.sigma_draws = Some(draws);
        Ok(self)
    }

    pub fn with_estimate(mut self, estimate: DVector<f64>) -> Result<Self, SummaryError> {
        if estimate.len() != self.terms.len() {
            return Err(SummaryError::InvalidModel(format!(
                "{} estimate(s) for {} term(s)",
                estimate.len(),
                self.terms.len()
            )));
        }
        self.estimate = Some(estimate);
        Ok(self)
    }

    /// Column added to the linear predictor (e.g. log exposure).
    pub fn with_offset(mut self, column: impl Into<String>) -> Self {
        self.offset = Some(column.into());
        self
    }

    pub fn with_trials(mut self, trials: u64) -> Self {
        self.trials = trials.max(1);
        self
    }

    /// Negative-binomial shape (larger = closer to Poisson).
    pub fn with_phi(mut self, phi: f64) -> Result<Self, SummaryError> {
        if !(phi.is_finite() && phi > 0.0) {
            return Err(SummaryError::InvalidModel(format!("phi must be > 0, got {phi}")));
        }
        self.phi = Some(phi);
        Ok(self)
    }

    pub fn with_scale(mut self, scale: ResponseScale) -> Self {
        self.scale = scale;
        self
    }

    /// Seed for predictive noise (and sigma draws set up afterwards).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn link(&self) -> Link {
        self.link
    }

    /// `n_rows x p` design matrix for `new_data`.
    pub fn design_matrix(&self, new_data: &NewData) -> Result<DMatrix<f64>, SummaryError> {
        let missing = new_data.missing_columns(self.required_predictors().iter().map(String::as_str));
        if !missing.is_empty() {
            return Err(SummaryError::MissingPredictor { columns: missing });
        }

        // Resolve factor columns once.
        let resolved: Vec<Vec<(usize, &Factor)>> = self
            .terms
            .iter()
            .map(|t| {
                t.factors
                    .iter()
                    .filter_map(|f| new_data.column_index(f.column()).map(|idx| (idx, f)))
                    .collect()
            })
            .collect();

        let mut x = DMatrix::<f64>::zeros(new_data.len(), self.terms.len());
        for (i, row) in new_data.rows().iter().enumerate() {
            for (j, factors) in resolved.iter().enumerate() {
                let mut v = 1.0;
                for (idx, factor) in factors {
                    v *= factor.eval(&row.values[*idx])?;
                }
                x[(i, j)] = v;
            }
        }
        Ok(x)
    }

    fn offsets(&self, new_data: &NewData) -> Result<Option<Vec<f64>>, SummaryError> {
        self.offset
            .as_deref()
            .map(|column| new_data.numeric_column(column))
            .transpose()
    }

    fn add_noise(&self, mu: &mut DMatrix<f64>) -> Result<(), SummaryError> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(2));
        let n_draws = mu.nrows();

        match self.family {
            Family::Gaussian => {
                let sigma = self.sigma_draws.as_ref().ok_or_else(|| {
                    SummaryError::InvalidModel("gaussian predictive draws need sigma".to_string())
                })?;
                for j in 0..mu.ncols() {
                    for i in 0..n_draws {
                        let d = Normal::new(mu[(i, j)], sigma[i])
                            .map_err(|e| SummaryError::Simulation(e.to_string()))?;
                        mu[(i, j)] = d.sample(&mut rng);
                    }
                }
            }
            Family::Binomial => {
                for v in mu.iter_mut() {
                    let p = v.clamp(0.0, 1.0);
                    let d = Binomial::new(self.trials, p).map_err(|e| SummaryError::Simulation(e.to_string()))?;
                    *v = d.sample(&mut rng) as f64;
                }
            }
            Family::Poisson => {
                for v in mu.iter_mut() {
                    *v = sample_poisson(&mut rng, *v)?;
                }
            }
            Family::NegativeBinomial => {
                let phi = self.phi.ok_or_else(|| {
                    SummaryError::InvalidModel("negative binomial needs phi".to_string())
                })?;
                for v in mu.iter_mut() {
                    // Gamma-Poisson mixture with mean mu and variance mu + mu²/phi.
                    let lambda = if *v > 0.0 {
                        Gamma::new(phi, *v / phi)
                            .map_err(|e| SummaryError::Simulation(e.to_string()))?
                            .sample(&mut rng)
                    } else {
                        0.0
                    };
                    *v = sample_poisson(&mut rng, lambda)?;
                }
            }
        }
        Ok(())
    }
}

fn sample_poisson(rng: &mut StdRng, lambda: f64) -> Result<f64, SummaryError> {
    if !lambda.is_finite() {
        return Err(SummaryError::Simulation(format!("non-finite poisson rate {lambda}")));
    }
    if lambda <= 0.0 {
        return Ok(0.0);
    }
    let d = Poisson::new(lambda).map_err(|e| SummaryError::Simulation(e.to_string()))?;
    Ok(d.sample(rng))
}

impl FittedModel for PosteriorGlm {
    fn simulate_predictions(&self, new_data: &NewData) -> Result<DMatrix<f64>, SummaryError> {
        if self.coef_draws.nrows() == 0 {
            return Err(SummaryError::ModelNotFitted);
        }

        let x = self.design_matrix(new_data)?;
        let mut eta = &self.coef_draws * x.transpose();
        if let Some(offsets) = self.offsets(new_data)? {
            for (j, off) in offsets.iter().enumerate() {
                eta.column_mut(j).add_scalar_mut(*off);
            }
        }

        let link = self.link;
        let mut mu = eta.map(|e| link.inverse(e));
        if self.scale == ResponseScale::Predictive {
            self.add_noise(&mut mu)?;
        }
        Ok(mu)
    }

    fn n_draws(&self) -> usize {
        self.coef_draws.nrows()
    }

    fn required_predictors(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let columns = self
            .terms
            .iter()
            .flat_map(|t| t.factors.iter().map(Factor::column))
            .chain(self.offset.as_deref());
        for c in columns {
            if !out.iter().any(|o| o == c) {
                out.push(c.to_string());
            }
        }
        out
    }

    fn point_predictions(&self, new_data: &NewData) -> Result<Option<Vec<f64>>, SummaryError> {
        let Some(beta) = &self.estimate else {
            return Ok(None);
        };
        let x = self.design_matrix(new_data)?;
        let mut eta: Vec<f64> = (&x * beta).iter().copied().collect();
        if let Some(offsets) = self.offsets(new_data)? {
            for (e, off) in eta.iter_mut().zip(offsets) {
                *e += off;
            }
        }
        Ok(Some(eta.into_iter().map(|e| self.link.inverse(e)).collect()))
    }
}
