//! Observer port - hooks into a learner run
//!
//! Observers collect progress, logs, exports and summaries without the
//! learners knowing about any output format.

use crate::{Result, learners::DegenerateStateWarning, surprisal::SurprisalRecord};

/// Observer of a single learner run.
///
/// # Event Sequence
///
/// 1. `on_run_start(label, steps)` once
/// 2. For each timestep: `on_warning(...)` if the update was degenerate,
///    then `on_record(record)`
/// 3. `on_run_end()` once
///
/// # Examples
///
/// ```
/// use sbl::{ports::Observer, surprisal::SurprisalRecord};
///
/// struct CountingObserver {
///     records: usize,
/// }
///
/// impl Observer for CountingObserver {
///     fn on_record(&mut self, _record: &SurprisalRecord) -> sbl::Result<()> {
///         self.records += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait Observer: Send {
    /// Called before the first step.
    fn on_run_start(&mut self, _label: &str, _steps: usize) -> Result<()> {
        Ok(())
    }

    /// Called with every completed record.
    fn on_record(&mut self, _record: &SurprisalRecord) -> Result<()> {
        Ok(())
    }

    /// Called when an update had to fall back to the uniform prior.
    fn on_warning(&mut self, _warning: &DegenerateStateWarning) -> Result<()> {
        Ok(())
    }

    /// Called after the last step. Flush files and print summaries here.
    fn on_run_end(&mut self) -> Result<()> {
        Ok(())
    }
}
