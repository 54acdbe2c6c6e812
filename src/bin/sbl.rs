//! sbl CLI - sample regime-switching sequences and score them with
//! sequential Bayesian learners
//!
//! - `generate`: sample a sequence and store it as MessagePack
//! - `dirichlet`: Categorical-Dirichlet learner (SP, AP, TP)
//! - `grid`: Gaussian random walk grid filter (SP, AP)

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sbl")]
#[command(version, about = "Sequential Bayesian learning with surprise measures", long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample a sequence from the regime-switching generator
    Generate(sbl::cli::commands::generate::GenerateArgs),

    /// Score a sequence with the Categorical-Dirichlet learner
    Dirichlet(Box<sbl::cli::commands::dirichlet::DirichletArgs>),

    /// Score a sequence with the random-walk grid filter
    Grid(Box<sbl::cli::commands::grid::GridArgs>),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sbl=debug" } else { "sbl=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate(args) => sbl::cli::commands::generate::execute(args),
        Commands::Dirichlet(args) => sbl::cli::commands::dirichlet::execute(*args),
        Commands::Grid(args) => sbl::cli::commands::grid::execute(*args),
    }
}
