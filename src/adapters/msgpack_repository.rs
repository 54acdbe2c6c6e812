//! MessagePack implementation of the sample repository.

use std::{fs::File, path::Path};

use crate::{Result, error::Error, ports::SampleRepository, sample::SequenceSample};

/// MessagePack-based sample repository.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
///
/// use sbl::{
///     GeneratorConfig, adapters::MsgPackRepository, ports::SampleRepository,
///     sample::SequenceSample,
/// };
///
/// let repo = MsgPackRepository;
/// let sample = SequenceSample::generate(GeneratorConfig::default(), 200, 42)?;
/// repo.save(&sample, Path::new("sample.msgpack"))?;
/// let loaded = repo.load(Path::new("sample.msgpack"))?;
/// # Ok::<(), sbl::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackRepository;

impl MsgPackRepository {
    pub fn new() -> Self {
        Self
    }
}

impl SampleRepository for MsgPackRepository {
    fn save(&self, sample: &SequenceSample, path: &Path) -> Result<()> {
        let mut file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create file {path:?}"),
            source,
        })?;

        rmp_serde::encode::write_named(&mut file, sample).map_err(|e| {
            Error::SerializationContext {
                operation: "serialize sample to MessagePack".to_string(),
                message: e.to_string(),
            }
        })
    }

    fn load(&self, path: &Path) -> Result<SequenceSample> {
        let file = File::open(path).map_err(|source| Error::Io {
            operation: format!("open file {path:?}"),
            source,
        })?;

        rmp_serde::decode::from_read(file).map_err(|e| Error::SerializationContext {
            operation: "deserialize sample from MessagePack".to_string(),
            message: e.to_string(),
        })
    }
}
