//! Command-line parsing for the predictive interval summarizer.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! summarizing code; `app` turns these structs into a `RunConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{GridAxis, PointEstimate, ResponseScale, Value, parse_fixed};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "predint", version, about = "Posterior predictive interval summaries")]
pub struct Cli {
    /// Log debug output to stderr (overrides `PREDINT_LOG`).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Summarize predictive draws at every new-data row and print the table.
    Summarize(SummarizeArgs),
    /// Write the simulated draws matrix (one line per draw) to CSV.
    Draws(DrawsArgs),
}

/// Where new data and the model come from.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// New-data CSV (header row of predictor names).
    #[arg(long, value_name = "CSV", conflicts_with = "grid")]
    pub new_data: Option<PathBuf>,

    /// Grid axis `name=min:max:steps` (repeatable; first axis varies fastest).
    #[arg(long, value_name = "AXIS", value_parser = parse_grid_axis)]
    pub grid: Vec<GridAxis>,

    /// Constant covariate `name=value` added to every grid row (repeatable).
    #[arg(long, value_name = "NAME=VALUE", value_parser = parse_fixed, requires = "grid")]
    pub fix: Vec<(String, Value)>,

    /// Model JSON to simulate from.
    #[arg(long, value_name = "JSON", required_unless_present = "draws", conflicts_with = "draws")]
    pub model: Option<PathBuf>,

    /// Precomputed draws CSV (one line per draw, one column per new-data row).
    #[arg(long, value_name = "CSV")]
    pub draws: Option<PathBuf>,

    /// Simulation seed (overrides the model file).
    #[arg(long, env = "PREDINT_SEED")]
    pub seed: Option<u64>,

    /// Number of posterior draws to simulate (overrides the model file).
    #[arg(long = "n-draws", env = "PREDINT_DRAWS")]
    pub n_draws: Option<usize>,

    /// Simulate expected values or new observations (overrides the model file).
    #[arg(long, value_enum)]
    pub scale: Option<ResponseScale>,
}

#[derive(Debug, Args, Clone)]
pub struct SummarizeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Quantile levels, strictly between 0 and 1.
    #[arg(long, value_delimiter = ',', default_values_t = [0.05, 0.25, 0.75, 0.95])]
    pub levels: Vec<f64>,

    /// Point estimate shown next to the bounds.
    #[arg(long, value_enum, default_value_t = PointEstimate::Mean)]
    pub point: PointEstimate,

    /// Extra predictor columns new data must contain (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub require: Vec<String>,

    /// New-data column with observed responses; prints interval coverage.
    #[arg(long, value_name = "COLUMN")]
    pub observed: Option<String>,

    /// Decimal places in the printed table.
    #[arg(long, default_value_t = 3)]
    pub digits: usize,

    /// Do not print the table (exports only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Export the summary to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the summary to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DrawsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output CSV path.
    #[arg(long, short)]
    pub out: PathBuf,
}

fn parse_grid_axis(s: &str) -> Result<GridAxis, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_defaults() {
        let cli = Cli::parse_from(["predint", "summarize", "--new-data", "grid.csv", "--model", "m.json"]);
        let Command::Summarize(args) = cli.command else {
            panic!("expected summarize");
        };
        assert_eq!(args.levels, vec![0.05, 0.25, 0.75, 0.95]);
        assert_eq!(args.point, PointEstimate::Mean);
        assert_eq!(args.input.model.as_deref(), Some(std::path::Path::new("m.json")));
    }

    #[test]
    fn grid_and_fixed_values_parse() {
        let cli = Cli::parse_from([
            "predint",
            "summarize",
            "--grid",
            "mom_iq=70:140:8",
            "--fix",
            "mom_hs=1",
            "--draws",
            "d.csv",
            "--levels",
            "0.1,0.9",
        ]);
        let Command::Summarize(args) = cli.command else {
            panic!("expected summarize");
        };
        assert_eq!(args.input.grid[0].steps, 8);
        assert_eq!(args.input.fix[0], ("mom_hs".to_string(), Value::Number(1.0)));
        assert_eq!(args.levels, vec![0.1, 0.9]);
    }

    #[test]
    fn model_or_draws_is_required() {
        assert!(Cli::try_parse_from(["predint", "summarize", "--new-data", "g.csv"]).is_err());
        assert!(
            Cli::try_parse_from([
                "predint", "summarize", "--new-data", "g.csv", "--model", "m.json", "--draws", "d.csv"
            ])
            .is_err()
        );
    }
}
