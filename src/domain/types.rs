//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - built by callers in-memory (grids, hand-written rows)
//! - loaded from CSV/JSON
//! - exported next to the computed summaries

use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SummaryError;

/// Default interval levels: a 50% and a 90% central interval.
pub const DEFAULT_LEVELS: [f64; 4] = [0.05, 0.25, 0.75, 0.95];

/// Cell texts read as a missing observation.
const MISSING_MARKERS: [&str; 4] = ["NA", "NaN", "null", "."];

/// A single covariate value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Category(String),
}

impl Value {
    /// Interpret a raw text cell: finite numbers become `Number`, anything else `Category`.
    pub fn parse_cell(raw: &str) -> Value {
        let s = raw.trim();
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Value::Number(v),
            _ => Value::Category(s.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Category(_) => None,
        }
    }

    /// `NA`-style placeholder for a missing value.
    pub fn is_missing_marker(&self) -> bool {
        match self {
            Value::Number(v) => v.is_nan(),
            Value::Category(s) => MISSING_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m)),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v}"),
            Value::Category(s) => write!(f, "{s}"),
        }
    }
}

/// One row of covariates, aligned with `NewData::columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct CovariateRow {
    pub values: Vec<Value>,
}

/// Ordered covariate rows at which predictions are requested.
///
/// Row order is significant: summaries come back in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewData {
    columns: Vec<String>,
    rows: Vec<CovariateRow>,
}

impl NewData {
    /// Build from column names and row-major values.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, SummaryError> {
        let mut seen = HashSet::new();
        for name in &columns {
            if name.is_empty() {
                return Err(SummaryError::InvalidNewData("empty column name".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(SummaryError::InvalidNewData(format!("duplicate column `{name}`")));
            }
        }

        let mut out = Vec::with_capacity(rows.len());
        for (i, values) in rows.into_iter().enumerate() {
            if values.len() != columns.len() {
                return Err(SummaryError::InvalidNewData(format!(
                    "row {} has {} value(s), expected {}",
                    i + 1,
                    values.len(),
                    columns.len()
                )));
            }
            out.push(CovariateRow { values });
        }

        Ok(Self { columns, rows: out })
    }

    /// Build from named columns of equal length.
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Result<Self, SummaryError> {
        let n = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        if let Some((name, v)) = columns.iter().find(|(_, v)| v.len() != n) {
            return Err(SummaryError::InvalidNewData(format!(
                "column `{name}` has {} value(s), expected {n}",
                v.len()
            )));
        }

        let names: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
        let rows = (0..n)
            .map(|i| columns.iter().map(|(_, v)| v[i].clone()).collect())
            .collect();
        Self::new(names, rows)
    }

    /// Cartesian grid over evenly spaced axes, plus constant covariates.
    ///
    /// The first axis varies fastest. Fixed values are appended as extra columns.
    pub fn grid(axes: &[GridAxis], fixed: &[(String, Value)]) -> Result<Self, SummaryError> {
        if axes.is_empty() && fixed.is_empty() {
            return Err(SummaryError::InvalidNewData(
                "grid needs at least one axis or fixed value".to_string(),
            ));
        }

        let n_rows = axes
            .iter()
            .try_fold(1usize, |acc, axis| acc.checked_mul(axis.steps))
            .ok_or_else(|| SummaryError::InvalidNewData("grid has too many rows".to_string()))?;
        let sequences: Vec<Vec<f64>> = axes.iter().map(GridAxis::values).collect::<Result<_, _>>()?;

        let mut columns: Vec<String> = axes.iter().map(|a| a.name.clone()).collect();
        columns.extend(fixed.iter().map(|(name, _)| name.clone()));

        let mut rows = Vec::with_capacity(n_rows);
        for i in 0..n_rows {
            let mut stride = 1usize;
            let mut values = Vec::with_capacity(columns.len());
            for seq in &sequences {
                values.push(Value::Number(seq[(i / stride) % seq.len()]));
                stride *= seq.len();
            }
            values.extend(fixed.iter().map(|(_, v)| v.clone()));
            rows.push(values);
        }

        Self::new(columns, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[CovariateRow] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Required names not present as columns, in the order given (deduplicated).
    pub fn missing_columns<'a>(&self, required: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for name in required {
            if !self.has_column(name) && !out.iter().any(|m| m == name) {
                out.push(name.to_string());
            }
        }
        out
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.values.get(idx))
    }

    /// All values of a numeric column.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, SummaryError> {
        let idx = self.column_index(name).ok_or_else(|| SummaryError::MissingPredictor {
            columns: vec![name.to_string()],
        })?;
        self.rows
            .iter()
            .map(|r| {
                r.values[idx].as_number().ok_or_else(|| SummaryError::PredictorType {
                    column: name.to_string(),
                    expected: "numeric",
                })
            })
            .collect()
    }

    /// Numeric column where `NA`-style cells become `NaN`.
    ///
    /// Used for observed responses, which may have gaps.
    pub fn observed_column(&self, name: &str) -> Result<Vec<f64>, SummaryError> {
        let idx = self.column_index(name).ok_or_else(|| SummaryError::MissingPredictor {
            columns: vec![name.to_string()],
        })?;
        self.rows
            .iter()
            .map(|r| {
                let value = &r.values[idx];
                match value.as_number() {
                    Some(v) => Ok(v),
                    None if value.is_missing_marker() => Ok(f64::NAN),
                    None => Err(SummaryError::PredictorType {
                        column: name.to_string(),
                        expected: "numeric or NA",
                    }),
                }
            })
            .collect()
    }
}

/// One evenly spaced grid axis: `name=min:max:steps`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxis {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub steps: usize,
}

impl GridAxis {
    /// Evenly spaced values from `min` to `max` (inclusive).
    pub fn values(&self) -> Result<Vec<f64>, SummaryError> {
        if !(self.min.is_finite() && self.max.is_finite() && self.max >= self.min) {
            return Err(SummaryError::InvalidNewData(format!(
                "grid axis `{}`: invalid range {}..{}",
                self.name, self.min, self.max
            )));
        }
        match self.steps {
            0 => Err(SummaryError::InvalidNewData(format!(
                "grid axis `{}`: steps must be >= 1",
                self.name
            ))),
            1 => Ok(vec![self.min]),
            n => Ok((0..n)
                .map(|i| {
                    let u = i as f64 / (n as f64 - 1.0);
                    self.min + u * (self.max - self.min)
                })
                .collect()),
        }
    }
}

impl FromStr for GridAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, range) = s
            .split_once('=')
            .ok_or_else(|| format!("expected name=min:max:steps, got '{s}'"))?;
        let parts: Vec<&str> = range.split(':').collect();
        let [min, max, steps] = parts.as_slice() else {
            return Err(format!("expected name=min:max:steps, got '{s}'"));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("missing axis name in '{s}'"));
        }
        Ok(GridAxis {
            name: name.to_string(),
            min: min.trim().parse().map_err(|e| format!("invalid min in '{s}': {e}"))?,
            max: max.trim().parse().map_err(|e| format!("invalid max in '{s}': {e}"))?,
            steps: steps.trim().parse().map_err(|e| format!("invalid steps in '{s}': {e}"))?,
        })
    }
}

/// Parse `name=value` into a fixed covariate.
pub fn parse_fixed(s: &str) -> Result<(String, Value), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() || value.trim().is_empty() {
        return Err(format!("expected name=value, got '{s}'"));
    }
    Ok((name.to_string(), Value::parse_cell(value)))
}

/// Ordered, validated set of quantile levels.
///
/// Levels are kept sorted ascending without duplicates, so bound columns
/// always read left to right in increasing probability.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalSpec {
    levels: Vec<f64>,
}

impl IntervalSpec {
    pub fn new(levels: impl IntoIterator<Item = f64>) -> Result<Self, SummaryError> {
        let mut levels: Vec<f64> = levels.into_iter().collect();
        if levels.is_empty() {
            return Err(SummaryError::InvalidLevel {
                level: "{}".to_string(),
                reason: "at least one level is required".to_string(),
            });
        }
        for &p in &levels {
            if !p.is_finite() || p <= 0.0 || p >= 1.0 {
                return Err(SummaryError::invalid_level(p, "levels must lie strictly between 0 and 1"));
            }
        }
        levels.sort_by(f64::total_cmp);
        levels.dedup();
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.levels.iter().map(|&p| level_label(p)).collect()
    }

    pub fn position(&self, level: f64) -> Option<usize> {
        self.levels.iter().position(|&p| (p - level).abs() < 1e-12)
    }
}

impl Default for IntervalSpec {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS.to_vec(),
        }
    }
}

/// Percentage label for a level: `0.05 -> "5%"`, `0.025 -> "2.5%"`.
pub fn level_label(level: f64) -> String {
    // Round away float noise such as 0.07 * 100 = 7.000000000000001.
    let pct = (level * 100.0 * 1e5).round() / 1e5;
    format!("{pct}%")
}

/// How to summarize the draws of one row into a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PointEstimate {
    /// Arithmetic mean of the draws.
    Mean,
    /// Posterior median (the 50% quantile of the draws).
    Median,
    /// The model's own response-scale prediction, when it offers one.
    Model,
}

impl PointEstimate {
    /// Column label in exported summaries.
    pub fn label(self) -> &'static str {
        match self {
            PointEstimate::Mean => "mean",
            PointEstimate::Median => "median",
            PointEstimate::Model => "fit",
        }
    }
}

/// Which quantity a simulating model draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseScale {
    /// Inverse link of the linear predictor (uncertainty in the mean only).
    Expected,
    /// A new observation: expected value plus family noise.
    Predictive,
}

/// Everything `summarize` needs besides the model and the rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryConfig {
    pub levels: IntervalSpec,
    pub point: PointEstimate,
    /// Predictor names that must be present in the new data.
    ///
    /// Checked together with the model's own requirements.
    pub required_predictors: Vec<String>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            levels: IntervalSpec::default(),
            point: PointEstimate::Mean,
            required_predictors: Vec::new(),
        }
    }
}

impl SummaryConfig {
    pub fn with_levels(mut self, levels: IntervalSpec) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_point(mut self, point: PointEstimate) -> Self {
        self.point = point;
        self
    }

    pub fn requiring<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_predictors.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Summary of one new-data row.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub covariates: CovariateRow,
    pub estimate: f64,
    /// Quantile bounds, aligned with `PredictionSummary::levels`.
    pub bounds: Vec<f64>,
    /// Number of finite draws that went into this row.
    pub n_draws: usize,
}

/// Per-row predictive summary.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSummary {
    pub covariate_names: Vec<String>,
    /// Point rule actually applied (after any fallback).
    pub point: PointEstimate,
    pub levels: IntervalSpec,
    pub rows: Vec<SummaryRow>,
}

impl PredictionSummary {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Full header: covariates, point column, then level columns.
    pub fn header(&self) -> Vec<String> {
        let mut out = self.covariate_names.clone();
        out.push(self.point.label().to_string());
        out.extend(self.levels.labels());
        out
    }

    pub fn estimates(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.estimate).collect()
    }
}

/// Observed share of rows inside one central interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageInterval {
    pub lower_level: f64,
    pub upper_level: f64,
    /// `upper_level - lower_level`.
    pub nominal: f64,
    pub observed: f64,
    /// Rows with a finite observation.
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub intervals: Vec<CoverageInterval>,
}

/// Where the new-data rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum NewDataSource {
    Csv(PathBuf),
    Grid {
        axes: Vec<GridAxis>,
        fixed: Vec<(String, Value)>,
    },
}

/// Where the fitted model comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// Model JSON (`io::ModelFile`), simulated from its approximate posterior.
    Glm(PathBuf),
    /// Precomputed draws CSV.
    Draws(PathBuf),
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults and environment).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub new_data: NewDataSource,
    pub model: ModelSource,
    pub summary: SummaryConfig,

    /// Overrides the model file's seed.
    pub seed: Option<u64>,
    /// Overrides the model file's draw count.
    pub n_draws: Option<usize>,
    /// Overrides the model file's response scale.
    pub scale: Option<ResponseScale>,

    /// New-data column holding observed responses for the coverage check.
    pub observed: Option<String>,

    pub digits: usize,
    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_labels_are_percentages() {
        assert_eq!(level_label(0.05), "5%");
        assert_eq!(level_label(0.025), "2.5%");
        assert_eq!(level_label(0.975), "97.5%");
        assert_eq!(level_label(0.07), "7%");
    }

    #[test]
    fn interval_spec_rejects_bounds_and_empty() {
        assert!(matches!(
            IntervalSpec::new([0.0, 0.5]),
            Err(SummaryError::InvalidLevel { .. })
        ));
        assert!(matches!(IntervalSpec::new([0.5, 1.0]), Err(SummaryError::InvalidLevel { .. })));
        assert!(matches!(IntervalSpec::new([f64::NAN]), Err(SummaryError::InvalidLevel { .. })));
        assert!(matches!(
            IntervalSpec::new(Vec::<f64>::new()),
            Err(SummaryError::InvalidLevel { .. })
        ));
    }

    #[test]
    fn interval_spec_sorts_and_dedups() {
        let levels = IntervalSpec::new([0.9, 0.1, 0.5, 0.1]).unwrap();
        assert_eq!(levels.levels(), &[0.1, 0.5, 0.9]);
        assert_eq!(levels.labels(), vec!["10%", "50%", "90%"]);
    }

    #[test]
    fn grid_first_axis_varies_fastest() {
        let axes = vec![
            "x=0:1:3".parse::<GridAxis>().unwrap(),
            "z=10:20:2".parse::<GridAxis>().unwrap(),
        ];
        let fixed = vec![parse_fixed("group=b").unwrap()];
        let data = NewData::grid(&axes, &fixed).unwrap();

        assert_eq!(data.len(), 6);
        assert_eq!(data.columns(), &["x", "z", "group"]);
        assert_eq!(data.numeric_column("x").unwrap(), vec![0.0, 0.5, 1.0, 0.0, 0.5, 1.0]);
        assert_eq!(data.numeric_column("z").unwrap(), vec![10.0, 10.0, 10.0, 20.0, 20.0, 20.0]);
        assert_eq!(data.value(4, "group"), Some(&Value::Category("b".to_string())));
    }

    #[test]
    fn grid_axis_parse_errors() {
        assert!("x=0:1".parse::<GridAxis>().is_err());
        assert!("=0:1:2".parse::<GridAxis>().is_err());
        assert!("x=a:1:2".parse::<GridAxis>().is_err());
    }

    #[test]
    fn new_data_rejects_ragged_rows() {
        let err = NewData::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![Value::Number(1.0)]],
        )
        .unwrap_err();
        assert!(matches!(err, SummaryError::InvalidNewData(_)));
    }

    #[test]
    fn missing_columns_deduplicates() {
        let data = NewData::from_columns(vec![("x".to_string(), vec![Value::Number(1.0)])]).unwrap();
        assert_eq!(data.missing_columns(["x", "z", "z", "w"]), vec!["z", "w"]);
    }

    #[test]
    fn observed_column_reads_na_as_nan() {
        let data = NewData::from_columns(vec![(
            "y".to_string(),
            vec![
                Value::Number(1.5),
                Value::Category("NA".to_string()),
                Value::Category("nan".to_string()),
            ],
        )])
        .unwrap();
        let y = data.observed_column("y").unwrap();
        assert_eq!(y[0], 1.5);
        assert!(y[1].is_nan() && y[2].is_nan());

        let bad = NewData::from_columns(vec![("y".to_string(), vec![Value::Category("high".to_string())])]).unwrap();
        assert!(matches!(bad.observed_column("y"), Err(SummaryError::PredictorType { .. })));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let axis = |name: &str| GridAxis {
            name: name.to_string(),
            min: 0.0,
            max: 1.0,
            steps: 1 << 40,
        };
        // Rejected before any axis is materialized.
        let err = NewData::grid(&[axis("a"), axis("b")], &[]);
        assert!(matches!(err, Err(SummaryError::InvalidNewData(_))));
    }

    #[test]
    fn numeric_column_rejects_categories() {
        let data = NewData::from_columns(vec![(
            "g".to_string(),
            vec![Value::parse_cell("a"), Value::parse_cell("2")],
        )])
        .unwrap();
        assert!(matches!(
            data.numeric_column("g"),
            Err(SummaryError::PredictorType { .. })
        ));
    }
}
