//! CSV exports: summaries and raw draws.
//!
//! Summaries are meant to be dropped straight into a plotting tool: one line
//! per new-data row, covariates first, then the point column and the bounds.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use nalgebra::DMatrix;

use crate::domain::PredictionSummary;
use crate::error::AppError;

/// Write a summary to a CSV file.
pub fn write_summary_csv(path: &Path, summary: &PredictionSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_summary(file, summary)
}

/// Write a summary as CSV to any writer.
pub fn write_summary<W: Write>(writer: W, summary: &PredictionSummary) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(summary.header())
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for row in &summary.rows {
        let mut record: Vec<String> = row.covariates.values.iter().map(ToString::to_string).collect();
        record.push(fmt_num(row.estimate));
        record.extend(row.bounds.iter().map(|&b| fmt_num(b)));
        out.write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write a draws matrix (one line per draw, header `row1..rowN`).
pub fn write_draws_csv(path: &Path, draws: &DMatrix<f64>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create draws CSV '{}': {e}", path.display())))?;
    let mut out = csv::Writer::from_writer(file);

    let header: Vec<String> = (1..=draws.ncols()).map(|j| format!("row{j}")).collect();
    out.write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write draws CSV header: {e}")))?;
    for row in draws.row_iter() {
        let record: Vec<String> = row.iter().map(|&v| fmt_num(v)).collect();
        out.write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write draws CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush draws CSV: {e}")))?;
    Ok(())
}

fn fmt_num(v: f64) -> String {
    if v.is_finite() { format!("{v}") } else { "NA".to_string() }
}
