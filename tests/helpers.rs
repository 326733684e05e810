//! Test helpers for the class-fixtures integration tests.
//!
//! This module provides the shared model schemas the loading and relation
//! suites build their record sets from.

#[path = "helpers/models.rs"]
pub mod models;
