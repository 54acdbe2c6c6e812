//! Console output helpers for the CLI

use crate::{analysis::SequenceStats, pipeline::RunSummary};

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:20} {}", format!("{key}:"), value);
}

/// Format a float with fixed precision, spelling out `nan`.
pub fn format_score(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value:.4}")
    }
}

/// Format an optional mean; `n/a` when no finite value contributed.
pub fn format_mean(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), format_score)
}

pub fn print_sequence_stats(stats: &SequenceStats) {
    print_section("Sequence");
    print_kv("Length", &stats.length.to_string());
    print_kv(
        "Observations 0/1",
        &format!("{}/{}", stats.category_counts[0], stats.category_counts[1]),
    );
    print_kv("Catch trials", &stats.catch_trials().to_string());
    print_kv(
        "Regime occupancy",
        &format!("{}/{}", stats.regime_occupancy[0], stats.regime_occupancy[1]),
    );
    print_kv("Regime switches", &stats.regime_switches.to_string());
    print_kv("Repetition rate", &format_score(stats.repetition_rate()));
    print_kv("Mean run length", &format_score(stats.mean_run_length));
    print_kv("Entropy (nats)", &format_score(stats.observation_entropy));
}

pub fn print_run_summary(summary: &RunSummary) {
    print_section(&format!("Surprisal ({})", summary.label));
    print_kv("Steps", &summary.steps.to_string());
    print_kv("Mean PS", &format_mean(summary.mean_predictive));
    print_kv("Mean BS", &format_mean(summary.mean_bayesian));
    print_kv("Mean CS", &format_mean(summary.mean_corrected));
    print_kv("Degenerate steps", &summary.degenerate_steps.to_string());
    print_kv("Prior resets", &summary.warnings.to_string());
}
