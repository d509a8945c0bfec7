//! # scenecache
//!
//! Library half of the `scenecache` binary: CLI definitions, command
//! implementations and TOML filter configuration. Exposed as a library so
//! the commands can be exercised from integration tests.

pub mod cli;
pub mod config;
