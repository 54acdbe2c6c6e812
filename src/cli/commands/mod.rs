//! Subcommands

pub mod dirichlet;
pub mod generate;
pub mod grid;

use anyhow::{Context, Result};
use tracing::info;

use super::{
    config::{CommonArgs, OutputArgs},
    output::print_run_summary,
};
use crate::{
    config::ExperimentConfig,
    pipeline::{JsonlObserver, ObserverSet, ProgressObserver, RunSummary, SummaryObserver, TracingObserver},
    ports::SequentialLearner,
    surprisal::ResultsTable,
};

/// Drive `learner` through progress, logging, summary and optional JSONL
/// observers, then write the results table and print the summary.
pub(crate) fn run_and_report(
    learner: &mut dyn SequentialLearner,
    config: &ExperimentConfig,
    common: &CommonArgs,
    output: &OutputArgs,
    seq_length: usize,
) -> Result<(ResultsTable, RunSummary)> {
    let mut progress = if common.no_progress {
        ProgressObserver::hidden()
    } else {
        ProgressObserver::new()
    };
    let mut logger = TracingObserver::new();
    let mut summary = SummaryObserver::new();
    let mut jsonl = output
        .jsonl
        .as_ref()
        .map(JsonlObserver::new)
        .transpose()
        .context("creating JSONL export")?;

    let table = {
        let mut observers = ObserverSet::new()
            .with(&mut progress)
            .with(&mut logger)
            .with(&mut summary);
        if let Some(jsonl) = jsonl.as_mut() {
            observers.push(jsonl);
        }
        learner.run(&mut observers)?
    };

    let path = output.results_path(config, table.label(), seq_length);
    config
        .output
        .writer()?
        .write(&table, &path)
        .with_context(|| format!("writing results to {}", path.display()))?;

    let summary = summary.summary();
    if let Some(summary_path) = &output.summary {
        summary
            .save(summary_path)
            .with_context(|| format!("writing summary to {}", summary_path.display()))?;
        info!(path = %summary_path.display(), "wrote run summary");
    }
    print_run_summary(&summary);
    println!("\nResults written to {}", path.display());
    Ok((table, summary))
}
