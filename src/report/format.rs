//! Plain-text formatting of summaries for the terminal.
//!
//! We keep formatting code in one place so:
//! - the summarizer stays free of presentation concerns
//! - output changes are localized

use crate::domain::{CoverageReport, PredictionSummary, RunConfig, level_label};

/// Widest a covariate cell may render before it is truncated.
const MAX_CELL: usize = 16;

/// Format the run header (what was summarized and how).
pub fn format_run_summary(summary: &PredictionSummary, n_draws: usize, model_label: &str, config: &RunConfig) -> String {
    let mut out = String::new();

    out.push_str("=== predint - posterior predictive intervals ===\n");
    out.push_str(&format!("Model: {model_label}\n"));
    out.push_str(&format!("Rows: n={} | draws per row: {n_draws}\n", summary.len()));
    out.push_str(&format!(
        "Point: {} | levels: {}\n",
        summary.point.label(),
        summary.levels.labels().join(", ")
    ));
    if let Some(scale) = config.scale {
        out.push_str(&format!("Scale: {scale:?}\n"));
    }
    out.push('\n');

    out
}

/// Format the per-row table: covariates, point estimate, then bounds.
pub fn format_summary_table(summary: &PredictionSummary, digits: usize) -> String {
    let header = summary.header();
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(summary.len());
    for row in &summary.rows {
        let mut line: Vec<String> = row
            .covariates
            .values
            .iter()
            .map(|v| truncate(&v.to_string(), MAX_CELL))
            .collect();
        line.push(fmt_num(row.estimate, digits));
        line.extend(row.bounds.iter().map(|&b| fmt_num(b, digits)));
        cells.push(line);
    }

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(j, h)| {
            cells
                .iter()
                .map(|line| line[j].chars().count())
                .chain(std::iter::once(truncate(h, MAX_CELL).chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let n_cov = summary.covariate_names.len();
    let mut out = String::new();

    let head: Vec<String> = header
        .iter()
        .zip(&widths)
        .enumerate()
        .map(|(j, (h, &w))| pad(&truncate(h, MAX_CELL), w, j < n_cov))
        .collect();
    out.push_str(head.join("  ").trim_end());
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');

    for line in &cells {
        let padded: Vec<String> = line
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(j, (c, &w))| pad(c, w, j < n_cov))
            .collect();
        out.push_str(padded.join("  ").trim_end());
        out.push('\n');
    }

    out
}

/// Format observed coverage per central interval.
pub fn format_coverage(report: &CoverageReport) -> String {
    let mut out = String::new();
    if report.intervals.is_empty() {
        out.push_str("Coverage: no symmetric level pairs to check.\n");
        return out;
    }

    out.push_str("Coverage (observed share inside central interval):\n");
    for iv in &report.intervals {
        out.push_str(&format!(
            "- {:>5} [{}, {}]: {:>6.1}% of {} row(s)\n",
            level_label(iv.nominal),
            level_label(iv.lower_level),
            level_label(iv.upper_level),
            iv.observed * 100.0,
            iv.n
        ));
    }
    out
}

fn pad(s: &str, width: usize, left: bool) -> String {
    if left {
        format!("{s:<width$}")
    } else {
        format!("{s:>width$}")
    }
}

fn fmt_num(v: f64, digits: usize) -> String {
    if v.is_finite() {
        format!("{v:.digits$}")
    } else {
        "NA".to_string()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CoverageInterval, NewData, SummaryConfig, Value};
    use crate::models::DrawsModel;
    use crate::summarize::summarize;

    #[test]
    fn table_aligns_columns() {
        let data = NewData::from_columns(vec![(
            "dist100".to_string(),
            vec![Value::Number(0.5), Value::Number(1.25)],
        )])
        .unwrap();
        let model = DrawsModel::from_columns(&[vec![0.1, 0.2, 0.3], vec![f64::NAN; 3]]).unwrap();
        let summary = summarize(&model, &data, &SummaryConfig::default()).unwrap();

        let table = format_summary_table(&summary, 3);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("dist100"));
        assert!(lines[0].ends_with("95%"));
        assert!(lines[2].contains("0.200"));
        assert!(lines[3].ends_with("NA"));
    }

    #[test]
    fn coverage_lines_use_percent_labels() {
        let report = CoverageReport {
            intervals: vec![CoverageInterval {
                lower_level: 0.05,
                upper_level: 0.95,
                nominal: 0.9,
                observed: 0.875,
                n: 8,
            }],
        };
        let text = format_coverage(&report);
        assert!(text.contains("90% [5%, 95%]"));
        assert!(text.contains("87.5%"));
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
