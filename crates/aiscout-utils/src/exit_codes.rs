//! Process exit codes (spec.md §6, CLI surface).

/// All sources fetched successfully.
pub const SUCCESS: i32 = 0;
/// Some sources failed, some succeeded.
pub const PARTIAL_FAILURE: i32 = 1;
/// Configuration failed validation at startup.
pub const CONFIG_INVALID: i32 = 2;
/// Interrupted (SIGINT/Ctrl-C).
pub const INTERRUPTED: i32 = 130;
