//! Read/write summary JSON files.
//!
//! Summary JSON is the portable form of a `PredictionSummary`:
//! - run metadata (tool, generation time, point rule, levels)
//! - one record per new-data row, keyed by column name

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{PointEstimate, PredictionSummary, Value};
use crate::error::AppError;

/// One exported summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub covariates: BTreeMap<String, Value>,
    /// Point estimate (`null` when no finite draws were available).
    pub estimate: Option<f64>,
    /// Bounds keyed by level label (`"5%"`, ...).
    pub bounds: BTreeMap<String, Option<f64>>,
    pub n_draws: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub point: PointEstimate,
    pub levels: Vec<f64>,
    pub records: Vec<SummaryRecord>,
}

impl SummaryFile {
    pub fn from_summary(summary: &PredictionSummary) -> Self {
        let labels = summary.levels.labels();
        let records = summary
            .rows
            .iter()
            .map(|row| SummaryRecord {
                covariates: summary
                    .covariate_names
                    .iter()
                    .cloned()
                    .zip(row.covariates.values.iter().cloned())
                    .collect(),
                estimate: finite(row.estimate),
                bounds: labels
                    .iter()
                    .cloned()
                    .zip(row.bounds.iter().map(|&b| finite(b)))
                    .collect(),
                n_draws: row.n_draws,
            })
            .collect();

        Self {
            tool: "predint".to_string(),
            generated_at: Utc::now(),
            point: summary.point,
            levels: summary.levels.levels().to_vec(),
            records,
        }
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Write a summary JSON file.
pub fn write_summary_json(path: &Path, summary: &PredictionSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &SummaryFile::from_summary(summary))
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

/// Read a summary JSON file.
pub fn read_summary_json(path: &Path) -> Result<SummaryFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid summary JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewData, SummaryConfig};
    use crate::models::DrawsModel;
    use crate::summarize::summarize;

    #[test]
    fn summary_json_round_trips_through_file() {
        let data = NewData::from_columns(vec![
            ("x".to_string(), vec![Value::Number(1.0), Value::Number(2.0)]),
            (
                "g".to_string(),
                vec![Value::Category("a".to_string()), Value::Category("b".to_string())],
            ),
        ])
        .unwrap();
        let model = DrawsModel::from_columns(&[vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![f64::NAN; 5]]).unwrap();
        let summary = summarize(&model, &data, &SummaryConfig::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_summary_json(&path, &summary).unwrap();
        let back = read_summary_json(&path).unwrap();

        assert_eq!(back.tool, "predint");
        assert_eq!(back.point, PointEstimate::Mean);
        assert_eq!(back.levels, vec![0.05, 0.25, 0.75, 0.95]);
        assert_eq!(back.records.len(), 2);

        let first = &back.records[0];
        assert_eq!(first.covariates["g"], Value::Category("a".to_string()));
        assert_eq!(first.estimate, Some(3.0));
        assert_eq!(first.bounds["25%"], Some(2.0));

        let second = &back.records[1];
        assert_eq!(second.estimate, None);
        assert_eq!(second.n_draws, 0);
    }
}
