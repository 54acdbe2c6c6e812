//! Statistical summary of a sampled sequence

use serde::{Deserialize, Serialize};

use crate::{
    types::{CATCH, Sequence},
    utils::shannon_entropy,
};

/// Descriptive statistics of one sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceStats {
    pub length: usize,
    /// Counts of observations 0, 1 and catch trials.
    pub category_counts: [usize; 3],
    /// Steps spent in regime 0 and regime 1 (catch trials excluded).
    pub regime_occupancy: [usize; 2],
    /// Regime changes between consecutive non-catch steps.
    pub regime_switches: usize,
    /// Repetitions between consecutive non-catch observations.
    pub repetitions: usize,
    /// Alternations between consecutive non-catch observations.
    pub alternations: usize,
    /// Mean length of runs of identical non-catch observations.
    pub mean_run_length: f64,
    /// Entropy (nats) of the empirical distribution over {0, 1}.
    pub observation_entropy: f64,
}

impl SequenceStats {
    pub fn from_sequence(sequence: &Sequence) -> Self {
        let mut stats = SequenceStats {
            length: sequence.len(),
            ..Self::default()
        };

        let mut previous: Option<(u8, u8)> = None;
        let mut runs = 0usize;
        for record in sequence.iter() {
            let slot = (record.observation as usize).min(CATCH as usize);
            stats.category_counts[slot] += 1;
            if record.is_catch() {
                continue;
            }
            if let Some(regime) = stats.regime_occupancy.get_mut(record.hidden as usize) {
                *regime += 1;
            }
            match previous {
                Some((hidden, observation)) => {
                    if hidden != record.hidden {
                        stats.regime_switches += 1;
                    }
                    if observation == record.observation {
                        stats.repetitions += 1;
                    } else {
                        stats.alternations += 1;
                        runs += 1;
                    }
                }
                None => runs = 1,
            }
            previous = Some((record.hidden, record.observation));
        }

        let informative = stats.category_counts[0] + stats.category_counts[1];
        if runs > 0 {
            stats.mean_run_length = informative as f64 / runs as f64;
        }
        if informative > 0 {
            let n = informative as f64;
            stats.observation_entropy = shannon_entropy(
                stats.category_counts[..2]
                    .iter()
                    .map(|&count| count as f64 / n),
            );
        }
        stats
    }

    pub fn catch_trials(&self) -> usize {
        self.category_counts[CATCH as usize]
    }

    /// Fraction of transitions that repeat the previous observation.
    pub fn repetition_rate(&self) -> f64 {
        let transitions = self.repetitions + self.alternations;
        if transitions == 0 {
            0.0
        } else {
            self.repetitions as f64 / transitions as f64
        }
    }
}
