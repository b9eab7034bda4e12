//! Deterministic, pure logic shared by the release pipeline.
//!
//! Core modules must be free of I/O side effects. Randomness enters only
//! through an injectable generator in [`backoff`].

pub mod artifacts;
pub mod backoff;
pub mod command;
pub mod declaration;
pub mod retry;
pub mod version;
