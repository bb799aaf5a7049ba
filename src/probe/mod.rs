//! Detection engine: segment globs, path patterns, the listing-based path
//! resolver, IPC endpoint matching, the per-host orchestrator and the
//! multi-host runner.

pub mod detect;
pub mod fleet;
pub mod glob;
pub mod ipc;
pub mod pattern;
pub mod report;
pub mod resolver;
