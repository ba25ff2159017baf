//! I/O collaborators: judge transport, subprocesses, prompts, configuration.

pub mod config;
pub mod coverage_tool;
pub mod judge;
pub mod process;
pub mod prompt;
