//! Sequential Bayesian learning on regime-switching categorical sequences
//!
//! This crate provides:
//! - A higher-order, regime-switching Markov sequence generator with catch trials
//! - A Categorical-Dirichlet learner with exponential forgetting (SP, AP, TP)
//! - A discretized grid filter for a latent Gaussian random walk with
//!   Bernoulli emissions
//! - Predictive, Bayesian and confidence-corrected surprisal for every step
//!
//! ```
//! use sbl::{
//!     GeneratorConfig, ModelVariant, SequenceGenerator,
//!     learners::{CategoricalDirichletLearner, DirichletConfig},
//! };
//!
//! let generator = SequenceGenerator::new(GeneratorConfig::default())?;
//! let sequence = generator.sample_seeded(100, 7);
//! let mut learner = CategoricalDirichletLearner::new(
//!     &sequence,
//!     DirichletConfig::new(ModelVariant::TransitionProbability).with_forgetting_rate(0.05),
//! )?;
//! let table = learner.compute(sequence.len());
//! assert_eq!(table.len(), 100);
//! # Ok::<(), sbl::Error>(())
//! ```

pub mod adapters;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod learners;
pub mod pipeline;
pub mod ports;
pub mod sample;
pub mod surprisal;
pub mod types;
pub mod utils;

pub use analysis::SequenceStats;
pub use config::{ExperimentConfig, OutputConfig};
pub use error::{Error, Result};
pub use generator::{GeneratorConfig, SequenceGenerator, TransitionMatrix};
pub use learners::{
    CategoricalDirichletLearner, DegenerateStateWarning, DirichletConfig, DirichletState,
    GridConfig, GridFilterLearner, GridPosterior,
};
pub use sample::SequenceSample;
pub use surprisal::{ResultsTable, SurprisalRecord};
pub use types::{CATCH, ModelVariant, Sequence, SequenceRecord};
