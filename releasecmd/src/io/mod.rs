//! Side-effecting adapters: processes, git, configuration, filesystem scans.

pub mod config;
pub mod dist;
pub mod executor;
pub mod git;
pub mod process;
pub mod version_file;
