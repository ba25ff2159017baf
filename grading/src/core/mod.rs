//! Deterministic, pure grading logic.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod aggregate;
pub mod applicability;
pub mod budget;
pub mod capability;
pub mod coverage;
pub mod criteria;
pub mod heuristic;
pub mod response;
pub mod types;
