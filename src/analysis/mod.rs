//! Descriptive analysis of sampled sequences.

pub mod stats;

pub use stats::SequenceStats;
