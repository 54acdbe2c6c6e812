//! Dirichlet command - score a sequence with the Categorical-Dirichlet learner

use anyhow::Result;
use clap::Parser;

use super::run_and_report;
use crate::{
    cli::config::{CommonArgs, OutputArgs, SampleArgs},
    learners::CategoricalDirichletLearner,
    types::ModelVariant,
};

#[derive(Parser, Debug)]
#[command(
    about = "Run the Categorical-Dirichlet learner",
    allow_negative_numbers = true
)]
pub struct DirichletArgs {
    /// Model variant (SP, AP, TP)
    #[arg(long, short = 'm')]
    pub model: Option<ModelVariant>,

    /// Exponential forgetting rate
    #[arg(long)]
    pub tau: Option<f64>,

    /// Number of timesteps to score; defaults to the whole sequence
    #[arg(long = "max-t")]
    pub max_t: Option<usize>,

    #[command(flatten)]
    pub sample: SampleArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn execute(args: DirichletArgs) -> Result<()> {
    let mut config = args.common.load_config()?;
    if let Some(model) = args.model {
        config.dirichlet.variant = model;
    }
    if let Some(tau) = args.tau {
        config.dirichlet.forgetting_rate = tau;
    }
    args.output.apply(&mut config);
    config.output.validate()?;

    let sample = args.sample.resolve(&mut config)?;
    let sequence = &sample.sequence;
    let mut learner = CategoricalDirichletLearner::new(sequence, config.dirichlet)?;
    if let Some(max_t) = args.max_t {
        learner = learner.with_max_steps(max_t);
    }
    run_and_report(
        &mut learner,
        &config,
        &args.common,
        &args.output,
        sequence.len(),
    )?;
    Ok(())
}
