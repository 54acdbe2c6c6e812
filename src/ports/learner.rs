//! Learner port - a sequential learner that can be driven by the pipeline
//!
//! Both the Categorical-Dirichlet learner and the grid filter implement this
//! trait, so progress reporting, result export and summaries work the same
//! way for either.

use crate::{Result, ports::Observer, surprisal::ResultsTable};

/// Learner consuming one sequence, one timestep at a time.
///
/// # Examples
///
/// ```
/// use sbl::{
///     ModelVariant, Sequence,
///     learners::{CategoricalDirichletLearner, DirichletConfig},
///     pipeline::SummaryObserver,
///     ports::SequentialLearner,
/// };
///
/// let sequence = Sequence::from_observations(&[0, 1, 1, 0, 1]);
/// let mut learner = CategoricalDirichletLearner::new(
///     &sequence,
///     DirichletConfig::new(ModelVariant::StimulusProbability),
/// )?;
/// let mut summary = SummaryObserver::new();
/// let table = learner.run(&mut summary)?;
/// assert_eq!(table.len(), learner.steps());
/// # Ok::<(), sbl::Error>(())
/// ```
pub trait SequentialLearner {
    /// Identifier used in logs and output file names, e.g. `CD_SP`.
    fn label(&self) -> String;

    /// Number of records a full run produces.
    fn steps(&self) -> usize;

    /// Process the whole sequence, reporting every step to `observer`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the observer fails; numeric problems are
    /// recorded in the table.
    fn run(&mut self, observer: &mut dyn Observer) -> Result<ResultsTable>;
}
