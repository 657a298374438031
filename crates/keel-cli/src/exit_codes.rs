//! Exit codes for `keel`
//!
//! These follow Unix conventions and sysexits.h where applicable.

/// Rendered output could not be parsed
pub const PARSE_ERROR: i32 = 2;

/// Resources were not ready before the deadline
pub const TIMEOUT: i32 = 3;

/// The cluster could not be reached or queried
pub const CLUSTER_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Interrupted by the user (128 + SIGINT)
pub const CANCELLED: i32 = 130;

/// Usage error - invalid arguments or options
pub const USAGE_ERROR: i32 = 64;
