//! Core domain types: observation sequences and model variants.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Observation (and hidden label) used to mark a catch trial.
pub const CATCH: u8 = 2;

/// One timestep of a sampled sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub t: usize,
    /// Active regime (0/1), or [`CATCH`] for catch trials.
    pub hidden: u8,
    /// Observed category (0/1), or [`CATCH`] for catch trials.
    pub observation: u8,
}

impl SequenceRecord {
    pub fn new(t: usize, hidden: u8, observation: u8) -> Self {
        Self {
            t,
            hidden,
            observation,
        }
    }

    pub fn is_catch(&self) -> bool {
        self.observation == CATCH
    }
}

/// Ordered, immutable sequence of `(t, hidden, observation)` records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    records: Vec<SequenceRecord>,
}

impl Sequence {
    /// Build a sequence from records; `t` is re-assigned to the position index.
    pub fn new(records: Vec<SequenceRecord>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(t, record)| SequenceRecord { t, ..record })
            .collect();
        Self { records }
    }

    /// Build a sequence from parallel hidden/observation columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SequenceLengthMismatch`] if the columns differ in length.
    pub fn from_columns(hidden: &[u8], observations: &[u8]) -> Result<Self> {
        if hidden.len() != observations.len() {
            return Err(Error::SequenceLengthMismatch {
                hidden: hidden.len(),
                observations: observations.len(),
            });
        }
        Ok(Self {
            records: hidden
                .iter()
                .zip(observations)
                .enumerate()
                .map(|(t, (&h, &o))| SequenceRecord::new(t, h, o))
                .collect(),
        })
    }

    /// Build a sequence of observations with an all-zero hidden column.
    pub fn from_observations(observations: &[u8]) -> Self {
        Self {
            records: observations
                .iter()
                .enumerate()
                .map(|(t, &o)| SequenceRecord::new(t, 0, o))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SequenceRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequenceRecord> {
        self.records.iter()
    }

    pub fn get(&self, t: usize) -> Option<&SequenceRecord> {
        self.records.get(t)
    }

    pub fn observations(&self) -> Vec<u8> {
        self.records.iter().map(|r| r.observation).collect()
    }

    pub fn hidden(&self) -> Vec<u8> {
        self.records.iter().map(|r| r.hidden).collect()
    }

    /// Whether the observation at `t` repeats the one at `t - 1`; `None` at t = 0.
    pub fn repetition(&self, t: usize) -> Option<bool> {
        if t == 0 || t >= self.records.len() {
            return None;
        }
        Some(self.records[t].observation == self.records[t - 1].observation)
    }

    /// Number of observation categories: the largest observed value plus one, at least two.
    pub fn num_categories(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.observation as usize + 1)
            .max()
            .unwrap_or(0)
            .max(2)
    }

    pub fn catch_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_catch()).count()
    }

    /// Drop catch trials and re-index the remaining records from zero.
    pub fn without_catch_trials(&self) -> Sequence {
        Sequence::new(
            self.records
                .iter()
                .filter(|r| !r.is_catch())
                .copied()
                .collect(),
        )
    }
}

impl FromIterator<SequenceRecord> for Sequence {
    fn from_iter<I: IntoIterator<Item = SequenceRecord>>(iter: I) -> Self {
        Sequence::new(iter.into_iter().collect())
    }
}

/// Which realized signal a learner conditions on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelVariant {
    /// Probability of each stimulus category.
    #[default]
    StimulusProbability,
    /// Probability of repeating versus alternating.
    AlternationProbability,
    /// Probability of each from→to transition.
    TransitionProbability,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 3] = [
        ModelVariant::StimulusProbability,
        ModelVariant::AlternationProbability,
        ModelVariant::TransitionProbability,
    ];

    /// Short label used in file names and logs.
    pub fn short_label(self) -> &'static str {
        match self {
            ModelVariant::StimulusProbability => "SP",
            ModelVariant::AlternationProbability => "AP",
            ModelVariant::TransitionProbability => "TP",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_label())
    }
}

impl FromStr for ModelVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sp" | "stimulus" | "stimulus-probability" | "stimulus_probability" => {
                Ok(ModelVariant::StimulusProbability)
            }
            "ap" | "alternation" | "alternation-probability" | "alternation_probability" => {
                Ok(ModelVariant::AlternationProbability)
            }
            "tp" | "transition" | "transition-probability" | "transition_probability" => {
                Ok(ModelVariant::TransitionProbability)
            }
            _ => Err(Error::InvalidModelVariant {
                input: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_variant_names() {
        assert_eq!(
            "SP".parse::<ModelVariant>().unwrap(),
            ModelVariant::StimulusProbability
        );
        assert_eq!(
            " alternation ".parse::<ModelVariant>().unwrap(),
            ModelVariant::AlternationProbability
        );
        assert_eq!(
            "transition_probability".parse::<ModelVariant>().unwrap(),
            ModelVariant::TransitionProbability
        );
        for variant in ModelVariant::ALL {
            assert_eq!(variant.to_string().parse::<ModelVariant>().unwrap(), variant);
        }
    }

    #[test]
    fn unknown_variant_carries_input() {
        let err = "XP".parse::<ModelVariant>().unwrap_err();
        match err {
            Error::InvalidModelVariant { input } => assert_eq!(input, "XP"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn repetition_is_undefined_at_start() {
        let seq = Sequence::from_observations(&[0, 0, 1, 1, 0]);
        assert_eq!(seq.repetition(0), None);
        assert_eq!(seq.repetition(1), Some(true));
        assert_eq!(seq.repetition(2), Some(false));
        assert_eq!(seq.repetition(5), None);
    }

    #[test]
    fn catch_trials_are_dropped_and_reindexed() {
        let seq = Sequence::from_columns(&[0, 2, 1, 1], &[1, CATCH, 0, 1]).unwrap();
        assert_eq!(seq.num_categories(), 3);
        assert_eq!(seq.catch_count(), 1);

        let binary = seq.without_catch_trials();
        assert_eq!(binary.observations(), vec![1, 0, 1]);
        assert_eq!(binary.hidden(), vec![0, 1, 1]);
        assert_eq!(binary.get(2).map(|r| r.t), Some(2));
        assert_eq!(binary.num_categories(), 2);
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let err = Sequence::from_columns(&[0, 0], &[1]).unwrap_err();
        assert!(err.is_config_error());
    }
}
