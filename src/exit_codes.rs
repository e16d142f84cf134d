//! Exit code constants for the holefill CLI.
//!
//! - 0: Success (including best-effort runs with unresolved holes)
//! - 1: User error (bad args, unreadable input)
//! - 2: Malformed source (unterminated or empty hole marker)
//! - 3: Configuration error (invalid regen policy, invalid config file)
//! - 4: Fragment cache failure
//! - 5: Generator/critic process failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or unreadable input files.
pub const USER_ERROR: i32 = 1;

/// The source text could not be parsed into a template.
pub const MALFORMED_SOURCE: i32 = 2;

/// A hole or the config file declares an invalid value.
pub const CONFIG_ERROR: i32 = 3;

/// The fragment cache could not be read or written.
pub const CACHE_FAILURE: i32 = 4;

/// The generator or critic process failed.
pub const COLLABORATOR_FAILURE: i32 = 5;
