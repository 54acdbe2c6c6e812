//! Sequential Bayesian learners.
//!
//! Both learners follow the same recursion: observe `o_t`, replace the
//! posterior, score the observation with the three surprise measures and
//! append a [`SurprisalRecord`](crate::surprisal::SurprisalRecord).

pub mod categorical;
pub mod grid;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ModelVariant;

pub use categorical::{
    CategoricalDirichletLearner, DirichletConfig, DirichletState, ForgettingWeights, StateShape,
};
pub use grid::{GridConfig, GridFilterLearner, GridPosterior, JointTable};

/// Recoverable condition: the variant's indicator is undefined at this step
/// and the posterior was reset to the uniform prior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegenerateStateWarning {
    pub variant: ModelVariant,
    pub t: usize,
}

impl fmt::Display for DegenerateStateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: cannot update the posterior at t={} with a single observation; reset to uniform prior",
            self.variant, self.t
        )
    }
}
