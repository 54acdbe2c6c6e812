//! Generate command - sample a sequence and store it

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::{
    adapters::MsgPackRepository,
    cli::{
        config::{CommonArgs, GeneratorArgs, SampleArgs},
        output::{print_kv, print_sequence_stats},
    },
    ports::SampleRepository,
};

#[derive(Parser, Debug)]
#[command(about = "Sample a regime-switching sequence", allow_negative_numbers = true)]
pub struct GenerateArgs {
    /// MessagePack file for the sample
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    #[command(flatten)]
    pub generator: GeneratorArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn execute(args: GenerateArgs) -> Result<()> {
    let mut config = args.common.load_config()?;
    let sample_args = SampleArgs {
        input: None,
        generator: args.generator,
    };
    let sample = sample_args.resolve(&mut config)?;

    MsgPackRepository::new()
        .save(&sample, &args.output)
        .with_context(|| format!("saving sample to {}", args.output.display()))?;

    print_sequence_stats(&sample.stats());
    if let Some(seed) = sample.seed {
        print_kv("Seed", &seed.to_string());
    }
    println!("\nSample written to {}", args.output.display());
    Ok(())
}
