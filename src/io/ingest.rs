//! CSV ingest for new-data tables and precomputed draws.
//!
//! Design goals:
//! - **Strict shape**: every row must have one cell per header column
//! - **Clear errors** with 1-based line numbers (exit code 2)
//! - **Deterministic typing**: a cell is numeric iff it parses as a finite `f64`

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use nalgebra::DMatrix;
use tracing::debug;

use crate::domain::{NewData, Value};
use crate::error::{AppError, SummaryError};

/// Load a new-data CSV file.
pub fn load_new_data(path: &Path) -> Result<NewData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open new-data CSV '{}': {e}", path.display())))?;
    let data = read_new_data(file)?;
    debug!(path = %path.display(), rows = data.len(), columns = data.columns().len(), "loaded new data");
    Ok(data)
}

/// Parse a new-data table from any reader (header row required).
pub fn read_new_data<R: Read>(reader: R) -> Result<NewData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let columns: Vec<String> = headers.iter().map(normalize_header_name).collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header, lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error on line {line}: {e}")))?;
        rows.push(parse_row(&record, &columns, line)?);
    }

    if rows.is_empty() {
        return Err(SummaryError::InvalidNewData("new-data CSV has no rows".to_string()).into());
    }

    NewData::new(columns, rows).map_err(AppError::from)
}

/// Load a draws CSV: one line per draw, one column per new-data row.
///
/// A first line that does not parse as numbers is treated as a header.
pub fn load_draws(path: &Path) -> Result<DMatrix<f64>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open draws CSV '{}': {e}", path.display())))?;
    let draws = read_draws(file)?;
    debug!(path = %path.display(), n_draws = draws.nrows(), n_rows = draws.ncols(), "loaded draws");
    Ok(draws)
}

pub fn read_draws<R: Read>(reader: R) -> Result<DMatrix<f64>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut values: Vec<f64> = Vec::new();
    let mut width: Option<usize> = None;
    let mut n_draws = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 1;
        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error on line {line}: {e}")))?;

        let parsed: Result<Vec<f64>, _> = record.iter().map(parse_draw).collect();
        let row = match parsed {
            Ok(row) => row,
            Err(_) if line == 1 => continue, // header
            Err(cell) => {
                return Err(AppError::new(2, format!("Invalid draw '{cell}' on line {line}.")));
            }
        };

        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(AppError::new(
                    2,
                    format!("Draws line {line} has {} value(s), expected {w}.", row.len()),
                ));
            }
            Some(_) => {}
        }
        values.extend(row);
        n_draws += 1;
    }

    let width = width.unwrap_or(0);
    Ok(DMatrix::from_row_slice(n_draws, width, &values))
}

fn parse_draw(cell: &str) -> Result<f64, String> {
    // `NA`/`NaN` cells are kept (as NaN) and dropped per column when summarizing.
    match cell {
        "NA" | "NaN" | "nan" => Ok(f64::NAN),
        _ => cell.parse::<f64>().map_err(|_| cell.to_string()),
    }
}

fn parse_row(record: &StringRecord, columns: &[String], line: usize) -> Result<Vec<Value>, AppError> {
    if record.len() != columns.len() {
        return Err(AppError::new(
            2,
            format!(
                "Line {line} has {} cell(s), expected {}.",
                record.len(),
                columns.len()
            ),
        ));
    }
    record
        .iter()
        .zip(columns)
        .map(|(cell, name)| {
            if cell.is_empty() {
                Err(AppError::new(2, format!("Missing value for `{name}` on line {line}.")))
            } else {
                Ok(Value::parse_cell(cell))
            }
        })
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, predictor checks report a missing column.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_data_types_cells() {
        let csv = "\u{feff}mom_iq,mom_hs,group\n100,1,a\n85.5,0,b\n";
        let data = read_new_data(csv.as_bytes()).unwrap();
        assert_eq!(data.columns(), &["mom_iq", "mom_hs", "group"]);
        assert_eq!(data.len(), 2);
        assert_eq!(data.value(1, "mom_iq"), Some(&Value::Number(85.5)));
        assert_eq!(data.value(0, "group"), Some(&Value::Category("a".to_string())));
    }

    #[test]
    fn new_data_rejects_blank_cells() {
        let err = read_new_data("x,z\n1,\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn new_data_requires_rows() {
        let err = read_new_data("x,z\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("no rows"));
    }

    #[test]
    fn draws_skip_header_and_keep_na() {
        let m = read_draws("row1,row2\n1,2\n3,NA\n".as_bytes()).unwrap();
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 2);
        assert_eq!(m[(1, 0)], 3.0);
        assert!(m[(1, 1)].is_nan());
    }

    #[test]
    fn draws_must_be_rectangular() {
        let err = read_draws("1,2\n3\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
