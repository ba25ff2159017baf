//! Grading and multi-run aggregation for evaluation harnesses.
//!
//! Graders turn an artifact (a diff, a task specification, a set of changed
//! files) into a validated [`core::types::GradeResult`]. Repeated trials of
//! the same items are then rolled up into accuracy, consistency and pass@k
//! metrics.
//!
//! - **[`core`]**: Pure, deterministic logic (response parsing, heuristics,
//!   aggregation, capability estimates). No I/O.
//! - **[`io`]**: Side-effecting operations (judge transport, coverage tool,
//!   prompt rendering, config files).
//! - **[`graders`]**: The [`graders::Grader`] trait and its implementations,
//!   which combine the two.

pub mod core;
pub mod graders;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
