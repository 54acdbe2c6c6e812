//! Command-line interface for sampling sequences and scoring them with the
//! sequential learners.

pub mod commands;
pub mod config;
pub mod output;
