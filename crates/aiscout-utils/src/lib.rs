//! Foundation utilities shared across the aiscout workspace.
//!
//! Mirrors the teacher crate's split of cross-cutting concerns (atomic file
//! I/O, a typed error taxonomy, process exit codes, logging setup) into a
//! single low-level crate that every other `aiscout-*` crate depends on.

pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod paths;
pub mod time;
