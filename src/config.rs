//! Configuration surface
//!
//! Every config validates fail-fast at construction time; nothing is
//! re-checked while a run is in progress.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

pub use crate::{
    generator::GeneratorConfig,
    learners::{DirichletConfig, GridConfig},
};
use crate::{Error, Result, adapters::DelimitedResultsWriter};

/// Where and how results tables are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: PathBuf,
    /// Column delimiter; must be ASCII.
    pub delimiter: char,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            delimiter: ' ',
        }
    }
}

impl OutputConfig {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.writer().map(|_| ())
    }

    /// Results file for a learner label and sequence length.
    pub fn results_path(&self, label: &str, seq_length: usize) -> PathBuf {
        self.results_dir
            .join(format!("sbl_surprise_{label}_{seq_length}.txt"))
    }

    pub fn writer(&self) -> Result<DelimitedResultsWriter> {
        DelimitedResultsWriter::new(self.delimiter)
    }
}

/// Umbrella configuration for one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub generator: GeneratorConfig,
    pub seq_length: usize,
    pub seed: Option<u64>,
    pub dirichlet: DirichletConfig,
    pub grid: GridConfig,
    pub output: OutputConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            seq_length: 200,
            seed: None,
            dirichlet: DirichletConfig::default(),
            grid: GridConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn with_seq_length(mut self, seq_length: usize) -> Self {
        self.seq_length = seq_length;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// # Errors
    ///
    /// Returns the first configuration error found in any section.
    pub fn validate(&self) -> Result<()> {
        self.generator.validate()?;
        self.dirichlet.validate()?;
        self.grid.validate()?;
        self.output.validate()
    }

    /// Load and validate a JSON config. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid JSON, or does not validate.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Io {
            operation: format!("open config {path:?}"),
            source,
        })?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create config {path:?}"),
            source,
        })?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
