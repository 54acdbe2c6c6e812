//! In-memory sample repository for tests and throwaway runs.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{Result, error::Error, ports::SampleRepository, sample::SequenceSample};

/// Stores MessagePack-encoded samples in a shared map keyed by path.
///
/// Clones share the same storage.
///
/// ```
/// use std::path::Path;
///
/// use sbl::{
///     Sequence, adapters::InMemoryRepository, ports::SampleRepository,
///     sample::SequenceSample,
/// };
///
/// let repo = InMemoryRepository::new();
/// let sample = SequenceSample::from_sequence(Sequence::from_observations(&[0, 1, 1]));
/// repo.save(&sample, Path::new("memory/sample"))?;
/// assert_eq!(repo.load(Path::new("memory/sample"))?, sample);
/// # Ok::<(), sbl::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    storage: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn storage(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored samples.
    pub fn count(&self) -> usize {
        self.storage().len()
    }

    pub fn clear(&self) {
        self.storage().clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.storage().contains_key(path.to_string_lossy().as_ref())
    }
}

impl SampleRepository for InMemoryRepository {
    fn save(&self, sample: &SequenceSample, path: &Path) -> Result<()> {
        let key = path.to_string_lossy().to_string();
        let bytes = rmp_serde::to_vec_named(sample).map_err(|e| Error::SerializationContext {
            operation: "serialize sample for in-memory storage".to_string(),
            message: e.to_string(),
        })?;
        self.storage().insert(key, bytes);
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<SequenceSample> {
        let storage = self.storage();
        let bytes = storage
            .get(path.to_string_lossy().as_ref())
            .ok_or_else(|| Error::Io {
                operation: format!("load sample from in-memory storage at {path:?}"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "key not found in memory"),
            })?;

        rmp_serde::from_slice(bytes).map_err(|e| Error::SerializationContext {
            operation: "deserialize sample from in-memory storage".to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sequence;

    fn sample() -> SequenceSample {
        SequenceSample::from_sequence(Sequence::from_columns(&[0, 1, 2], &[1, 0, 2]).unwrap())
    }

    #[test]
    fn test_in_memory_save_and_load() {
        let repo = InMemoryRepository::new();
        let path = Path::new("sample");
        assert_eq!(repo.count(), 0);
        assert!(!repo.contains(path));

        repo.save(&sample(), path).unwrap();
        assert_eq!(repo.count(), 1);
        assert!(repo.contains(path));
        assert_eq!(repo.load(path).unwrap(), sample());
    }

    #[test]
    fn test_load_nonexistent_returns_error() {
        let repo = InMemoryRepository::new();
        assert!(repo.load(Path::new("nonexistent")).is_err());
    }

    #[test]
    fn test_clone_shares_storage_and_clear_empties_it() {
        let repo = InMemoryRepository::new();
        let other = repo.clone();
        repo.save(&sample(), Path::new("a")).unwrap();
        repo.save(&sample(), Path::new("b")).unwrap();
        assert_eq!(other.count(), 2);
        assert_eq!(other.load(Path::new("a")).unwrap(), sample());

        other.clear();
        assert_eq!(repo.count(), 0);
    }
}
