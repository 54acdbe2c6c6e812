//! Ports (trait boundaries) for external collaborators.
//!
//! The learners and the sample type are the domain; progress reporting,
//! exports and storage are adapters behind these traits.

pub mod learner;
pub mod observer;
pub mod repository;

pub use learner::SequentialLearner;
pub use observer::Observer;
pub use repository::SampleRepository;
