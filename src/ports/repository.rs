//! Repository port for sequence sample persistence.

use std::path::Path;

use crate::{Result, sample::SequenceSample};

/// Port for persisting and loading sampled sequences together with the
/// generator settings that produced them.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
///
/// use sbl::{ports::SampleRepository, sample::SequenceSample};
///
/// fn archive<R: SampleRepository>(
///     repo: &R,
///     sample: &SequenceSample,
///     path: &Path,
/// ) -> sbl::Result<()> {
///     repo.save(sample, path)
/// }
/// ```
pub trait SampleRepository {
    /// Save a sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be written or serialization fails.
    fn save(&self, sample: &SequenceSample, path: &Path) -> Result<()>;

    /// Load a sample.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is stored at `path` or the data is corrupted.
    fn load(&self, path: &Path) -> Result<SequenceSample>;
}
