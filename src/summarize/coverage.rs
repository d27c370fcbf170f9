//! Empirical coverage of central predictive intervals.
//!
//! Pairs each level `p < 0.5` with its mirror `1 - p` (when both were
//! summarized) and counts how many observed values fall inside `[q_p, q_{1-p}]`.

use crate::domain::{CoverageInterval, CoverageReport, PredictionSummary};
use crate::error::SummaryError;

/// Coverage of every symmetric interval in `summary` against `observed`.
///
/// Intervals are reported widest first.
///
/// `observed[i]` is the realized response for summary row `i`; non-finite
/// entries are skipped.
pub fn coverage(summary: &PredictionSummary, observed: &[f64]) -> Result<CoverageReport, SummaryError> {
    if observed.len() != summary.len() {
        return Err(SummaryError::DrawShape {
            expected: summary.len(),
            actual: observed.len(),
        });
    }

    let levels = summary.levels.levels();
    let mut intervals = Vec::new();
    for (lo_idx, &lo) in levels.iter().enumerate() {
        if lo >= 0.5 {
            break;
        }
        let Some(hi_idx) = summary.levels.position(1.0 - lo) else {
            continue;
        };

        let mut n = 0usize;
        let mut inside = 0usize;
        for (row, &y) in summary.rows.iter().zip(observed) {
            if !y.is_finite() {
                continue;
            }
            n += 1;
            if row.bounds[lo_idx] <= y && y <= row.bounds[hi_idx] {
                inside += 1;
            }
        }

        let hi = levels[hi_idx];
        intervals.push(CoverageInterval {
            lower_level: lo,
            upper_level: hi,
            nominal: hi - lo,
            observed: if n == 0 { f64::NAN } else { inside as f64 / n as f64 },
            n,
        });
    }

    Ok(CoverageReport { intervals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IntervalSpec, NewData, SummaryConfig, Value};
    use crate::models::DrawsModel;
    use crate::summarize::summarize;

    fn summary() -> PredictionSummary {
        // Every row has draws 0..=100, so q_5 = 5, q_25 = 25, q_75 = 75, q_95 = 95.
        let column: Vec<f64> = (0..=100).map(f64::from).collect();
        let model = DrawsModel::from_columns(&vec![column; 4]).unwrap();
        let data = NewData::from_columns(vec![(
            "x".to_string(),
            (0..4).map(|i| Value::Number(f64::from(i))).collect(),
        )])
        .unwrap();
        let config = SummaryConfig::default().with_levels(IntervalSpec::new([0.05, 0.25, 0.75, 0.95, 0.6]).unwrap());
        summarize(&model, &data, &config).unwrap()
    }

    #[test]
    fn coverage_counts_observations_inside() {
        let report = coverage(&summary(), &[50.0, 10.0, 99.0, f64::NAN]).unwrap();
        assert_eq!(report.intervals.len(), 2);

        let wide = &report.intervals[0];
        assert!((wide.nominal - 0.9).abs() < 1e-12);
        assert_eq!(wide.n, 3);
        assert!((wide.observed - 2.0 / 3.0).abs() < 1e-12);

        let narrow = &report.intervals[1];
        assert!((narrow.nominal - 0.5).abs() < 1e-12);
        assert!((narrow.observed - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn coverage_checks_length() {
        assert!(matches!(
            coverage(&summary(), &[1.0]),
            Err(SummaryError::DrawShape { expected: 4, actual: 1 })
        ));
    }
}
