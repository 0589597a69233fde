//! assessly-core: Assessment orchestration core.
//!
//! This crate holds the parts of the coursework platform that involve real
//! coordination or algorithmic work: the essay evaluation job registry and
//! coordinator, the structured-answer grading state machine, the peer-review
//! assignment engine, the provider response parser, and the peer-review
//! audit.

pub mod audit;
pub mod bank;
pub mod coordinator;
pub mod error;
pub mod grading;
pub mod model;
pub mod parser;
pub mod peer_review;
pub mod prompt;
pub mod registry;
pub mod rounding;
pub mod store;
pub mod summary;
pub mod traits;
