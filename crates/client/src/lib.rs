//! Partner Console bulk-export client.
//!
//! Drives one asynchronous export job against the back-office export
//! backend: submission, fixed-interval status polling, terminal-state
//! detection, and download handoff.

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod download;
pub mod error;
pub mod logging;
