//! Stable exit codes for `releasecmd`.
//!
//! Precondition failures use errno values; a failed external command exits
//! with that command's own status instead.

/// Release finished (or dry run completed).
pub const OK: i32 = 0;
/// Invalid configuration or an unexpected internal error.
pub const INVALID: i32 = 1;
/// `ENOENT`: output directory, version, or artifacts not found.
pub const NOT_FOUND: i32 = 2;
/// `EEXIST`: the release tag already exists on the remote.
pub const ALREADY_EXISTS: i32 = 17;
/// `EINVAL`: the version string is not a valid version.
pub const INVALID_VERSION: i32 = 22;
