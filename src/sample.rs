//! Persisted sequence samples.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    Result,
    analysis::SequenceStats,
    generator::{GeneratorConfig, SequenceGenerator},
    types::Sequence,
};

/// A sequence plus the generator settings and seed that produced it.
///
/// Sequences loaded from elsewhere carry no generator metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceSample {
    pub sequence: Sequence,
    pub generator: Option<GeneratorConfig>,
    pub seed: Option<u64>,
}

impl SequenceSample {
    pub fn from_sequence(sequence: Sequence) -> Self {
        Self {
            sequence,
            generator: None,
            seed: None,
        }
    }

    /// Sample `seq_length` steps from a freshly built generator.
    ///
    /// # Errors
    ///
    /// Fails if `config` does not validate.
    pub fn generate(config: GeneratorConfig, seq_length: usize, seed: u64) -> Result<Self> {
        let generator = SequenceGenerator::new(config)?;
        let sequence = generator.sample_seeded(seq_length, seed);
        info!(seq_length, seed, catch_trials = sequence.catch_count(), "sampled sequence");
        Ok(Self {
            sequence,
            generator: Some(generator.config().clone()),
            seed: Some(seed),
        })
    }

    pub fn stats(&self) -> SequenceStats {
        SequenceStats::from_sequence(&self.sequence)
    }
}
