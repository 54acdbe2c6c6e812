//! Adapters implementing the ports, plus file exports.

pub mod delimited_results;
pub mod in_memory_repository;
pub mod msgpack_repository;

pub use delimited_results::DelimitedResultsWriter;
pub use in_memory_repository::InMemoryRepository;
pub use msgpack_repository::MsgPackRepository;
