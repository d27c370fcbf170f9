//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads new data and the model
//! - summarizes predictive draws
//! - prints reports
//! - writes optional exports

use clap::Parser;
use tracing::{debug, warn};

use crate::cli::{Cli, Command, DrawsArgs, InputArgs, SummarizeArgs};
use crate::domain::{IntervalSpec, ModelSource, NewDataSource, RunConfig, SummaryConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `predint` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is the normal case.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Summarize(args) => handle_summarize(args),
        Command::Draws(args) => handle_draws(args),
    }
}

/// Install the stderr subscriber. `PREDINT_LOG` wins unless `--verbose` is set.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("predint=debug")
    } else {
        EnvFilter::try_from_env("PREDINT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // Ignore a second init (tests may call `run` more than once).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_summarize(args: SummarizeArgs) -> Result<(), AppError> {
    let config = config_from_args(&args)?;
    let run = pipeline::run_summary(&config)?;

    if !args.quiet {
        println!(
            "{}",
            crate::report::format_run_summary(&run.summary, run.n_draws, &run.model_label, &config)
        );
        println!("{}", crate::report::format_summary_table(&run.summary, config.digits));
        if let Some(report) = &run.coverage {
            println!("{}", crate::report::format_coverage(report));
        }
    }

    let sparse = run.summary.rows.iter().filter(|r| r.n_draws == 0).count();
    if sparse > 0 {
        warn!(rows = sparse, "rows without finite draws were reported as NA");
    }

    // Optional exports.
    if let Some(path) = &config.export_csv {
        crate::io::write_summary_csv(path, &run.summary)?;
        debug!(path = %path.display(), "wrote summary CSV");
    }
    if let Some(path) = &config.export_json {
        crate::io::write_summary_json(path, &run.summary)?;
        debug!(path = %path.display(), "wrote summary JSON");
    }

    Ok(())
}

fn handle_draws(args: DrawsArgs) -> Result<(), AppError> {
    let config = RunConfig {
        new_data: new_data_source(&args.input)?,
        model: model_source(&args.input)?,
        summary: SummaryConfig::default(),
        seed: args.input.seed,
        n_draws: args.input.n_draws,
        scale: args.input.scale,
        observed: None,
        digits: 3,
        export_csv: None,
        export_json: None,
    };

    let draws = pipeline::simulate_draws(&config)?;
    crate::io::write_draws_csv(&args.out, &draws)?;
    println!(
        "Wrote {} draw(s) x {} row(s) to {}",
        draws.nrows(),
        draws.ncols(),
        args.out.display()
    );
    Ok(())
}

/// Build the pipeline configuration from `summarize` flags.
pub fn config_from_args(args: &SummarizeArgs) -> Result<RunConfig, AppError> {
    let levels = IntervalSpec::new(args.levels.iter().copied())?;
    let summary = SummaryConfig::default()
        .with_levels(levels)
        .with_point(args.point)
        .requiring(args.require.iter().map(String::as_str));

    Ok(RunConfig {
        new_data: new_data_source(&args.input)?,
        model: model_source(&args.input)?,
        summary,
        seed: args.input.seed,
        n_draws: args.input.n_draws,
        scale: args.input.scale,
        observed: args.observed.clone(),
        digits: args.digits,
        export_csv: args.export.clone(),
        export_json: args.export_json.clone(),
    })
}

fn new_data_source(input: &InputArgs) -> Result<NewDataSource, AppError> {
    match (&input.new_data, input.grid.is_empty()) {
        (Some(path), _) => Ok(NewDataSource::Csv(path.clone())),
        (None, false) => Ok(NewDataSource::Grid {
            axes: input.grid.clone(),
            fixed: input.fix.clone(),
        }),
        (None, true) => Err(AppError::new(2, "Provide new data with --new-data or at least one --grid axis")),
    }
}

fn model_source(input: &InputArgs) -> Result<ModelSource, AppError> {
    match (&input.model, &input.draws) {
        (Some(path), _) => Ok(ModelSource::Glm(path.clone())),
        (None, Some(path)) => Ok(ModelSource::Draws(path.clone())),
        (None, None) => Err(AppError::new(2, "Provide a model with --model or precomputed --draws")),
    }
}
