//! Release automation for Python packages.
//!
//! Resolves the project version, tags the current commit with git, pushes the
//! tag, and uploads the already-built packages in `dist/` with twine. The
//! architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (backoff, retry policy, version
//!   grammar, declaration parsing, artifact matching). No I/O.
//! - **[`io`]**: Side-effecting adapters (process spawning, retrying executor,
//!   git, configuration, filesystem scans).
//!
//! [`release`] sequences core logic and adapters into one run; [`error`]
//! defines the failure categories that become process exit codes.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod release;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
