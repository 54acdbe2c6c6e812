//! Grid command - score a binary sequence with the random-walk grid filter

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use super::run_and_report;
use crate::{
    cli::config::{CommonArgs, OutputArgs, SampleArgs},
    learners::GridFilterLearner,
    types::ModelVariant,
};

#[derive(Parser, Debug)]
#[command(about = "Run the Gaussian random walk grid filter", allow_negative_numbers = true)]
pub struct GridArgs {
    /// Model variant (SP, AP)
    #[arg(long, short = 'm')]
    pub model: Option<ModelVariant>,

    /// Step size of the random walk in latent space
    #[arg(long)]
    pub sigma: Option<f64>,

    /// Lower bound of the latent grid
    #[arg(long = "s-min")]
    pub s_min: Option<f64>,

    /// Upper bound of the latent grid
    #[arg(long = "s-max")]
    pub s_max: Option<f64>,

    /// Number of grid points
    #[arg(long = "s-res")]
    pub s_res: Option<usize>,

    #[command(flatten)]
    pub sample: SampleArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn execute(args: GridArgs) -> Result<()> {
    let mut config = args.common.load_config()?;
    let grid = &mut config.grid;
    if let Some(model) = args.model {
        grid.variant = model;
    }
    if let Some(sigma) = args.sigma {
        grid.sigma = sigma;
    }
    if let Some(s_min) = args.s_min {
        grid.s_min = s_min;
    }
    if let Some(s_max) = args.s_max {
        grid.s_max = s_max;
    }
    if let Some(s_res) = args.s_res {
        grid.s_res = s_res;
    }
    config.grid.validate()?;
    args.output.apply(&mut config);
    config.output.validate()?;

    let sample = args.sample.resolve(&mut config)?;
    let mut sequence = sample.sequence;
    if sequence.catch_count() > 0 {
        warn!(
            catch_trials = sequence.catch_count(),
            "grid filter needs binary observations; dropping catch trials"
        );
        sequence = sequence.without_catch_trials();
    }

    let mut learner = GridFilterLearner::new(&sequence, config.grid)?;
    run_and_report(
        &mut learner,
        &config,
        &args.common,
        &args.output,
        sequence.len(),
    )?;
    Ok(())
}
