//! # guardian-contracts
//!
//! Shared types for the EV charging guardian: readings, verdicts, audit
//! records, stream events, configuration, and the error type.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions, parsing, and validation.

pub mod audit;
pub mod config;
pub mod error;
pub mod reading;
pub mod stream;
pub mod verdict;
