//! Learner run pipeline
//!
//! Learners stream their records through an [`Observer`]; the observers here
//! cover progress display, structured logging, JSONL export and summaries.

pub mod observers;

pub use observers::{
    JsonlObserver, ObserverSet, ProgressObserver, RunSummary, SummaryObserver, TracingObserver,
};

pub use crate::ports::{Observer, SequentialLearner};
