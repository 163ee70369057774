//! Domain layer for the Partner Console export client.
//!
//! This crate contains:
//! - Export data model (formats, tasks, polled status)
//! - Column catalog per exportable record kind
//! - Typed filter dimensions and request validation

pub mod models;
