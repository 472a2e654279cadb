//! Unit tests for drive-backup components
//!
//! Components are exercised in isolation against the mock executor,
//! filesystem and remote store.

mod archive;
mod config;
mod retention;
