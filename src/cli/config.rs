//! Argument groups shared by several commands

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::{
    adapters::MsgPackRepository,
    config::ExperimentConfig,
    ports::SampleRepository,
    sample::SequenceSample,
};

/// Options common to every command.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// JSON experiment config; flags given on the command line take precedence
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Random seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl CommonArgs {
    /// Load the experiment config file, or defaults when none is given.
    pub fn load_config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ExperimentConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        Ok(config)
    }
}

/// Generative process overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct GeneratorArgs {
    /// Markov order of the observation process (1 or 2)
    #[arg(long)]
    pub order: Option<usize>,

    /// Initial probability of regime 0
    #[arg(long = "reg-init")]
    pub regime_init: Option<f64>,

    /// Probability of a regime switch per draw
    #[arg(long = "reg-change")]
    pub regime_change: Option<f64>,

    /// Initial probability of observing 0
    #[arg(long = "obs-init")]
    pub obs_init: Option<f64>,

    /// P(next = 0 | context), comma separated; per regime or shared
    #[arg(long = "obs-change", value_delimiter = ',')]
    pub obs_change: Option<Vec<f64>>,

    /// Probability of a catch trial per step
    #[arg(long = "catch")]
    pub catch_probability: Option<f64>,

    /// Length of the sampled sequence
    #[arg(long = "seq", short = 's')]
    pub seq_length: Option<usize>,
}

impl GeneratorArgs {
    /// Apply the overrides given on the command line.
    pub fn apply(&self, config: &mut ExperimentConfig) {
        let generator = &mut config.generator;
        if let Some(order) = self.order {
            generator.order = order;
        }
        if let Some(p) = self.regime_init {
            generator.regime_init = vec![p, 1.0 - p];
        }
        if let Some(p) = self.regime_change {
            generator.regime_change = p;
        }
        if let Some(p) = self.obs_init {
            generator.obs_init = vec![p, 1.0 - p, 0.0];
        }
        if let Some(obs_change) = &self.obs_change {
            generator.obs_change = obs_change.clone();
        }
        if let Some(p) = self.catch_probability {
            generator.catch_probability = p;
        }
        if let Some(seq_length) = self.seq_length {
            config.seq_length = seq_length;
        }
    }
}

/// Where a learner's input sequence comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct SampleArgs {
    /// Load a MessagePack sample instead of generating one
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub generator: GeneratorArgs,
}

impl SampleArgs {
    /// Load the sample from `--input` or draw a fresh one.
    pub fn resolve(&self, config: &mut ExperimentConfig) -> Result<SequenceSample> {
        self.generator.apply(config);
        if let Some(path) = &self.input {
            return MsgPackRepository::new()
                .load(path)
                .with_context(|| format!("loading sample {}", path.display()));
        }
        if config.seq_length == 0 {
            bail!("sequence length must be positive");
        }
        let seed = *config.seed.get_or_insert_with(rand::random);
        Ok(SequenceSample::generate(
            config.generator.clone(),
            config.seq_length,
            seed,
        )?)
    }
}

/// Options for writing results.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Directory for results files
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Results file; defaults to a name derived from the learner and length
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Column delimiter for results files
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Also export every record as JSON Lines
    #[arg(long)]
    pub jsonl: Option<PathBuf>,

    /// Write the run summary as JSON
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

impl OutputArgs {
    pub fn apply(&self, config: &mut ExperimentConfig) {
        if let Some(dir) = &self.results_dir {
            config.output.results_dir = dir.clone();
        }
        if let Some(delimiter) = self.delimiter {
            config.output.delimiter = delimiter;
        }
    }

    pub fn results_path(&self, config: &ExperimentConfig, label: &str, len: usize) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| config.output.results_path(label, len))
    }
}
