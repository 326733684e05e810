//! Dependency-resolving fixture definitions for Reinhardt-style stores.
//!
//! This crate lets test and seed data be written as plain code instead of
//! serialized fixture files:
//!
//! - **Record Sets**: Declare records per model with
//!   [`RecordSet::add`](record_set::RecordSet::add), in code, close to the
//!   tests that use them
//! - **Relation Placeholders**: Reference records of other sets before they
//!   exist; dependencies load themselves first
//! - **Registry**: Group sets into named bundles and load them by
//!   `"app"` / `"app.bundle"` label
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use class_fixtures::prelude::*;
//! use serde_json::json;
//!
//! let company_schema = Arc::new(ModelSchema::new("hr.Company").scalar("name"));
//! let employee_schema = Arc::new(
//! 	ModelSchema::new("hr.Employee")
//! 		.scalar("name")
//! 		.single_relation("company", "hr.Company"),
//! );
//!
//! let companies = RecordSet::new(company_schema);
//! companies.add(json!(1), [("name", value("Macrohard"))])?;
//!
//! let employees = RecordSet::new(employee_schema);
//! employees.add(
//! 	json!(1),
//! 	[("name", value("Andy Depressant")), ("company", companies.fk(1))],
//! )?;
//!
//! // Loading the employees pulls the referenced company in first.
//! let store = MemoryStore::new();
//! assert_eq!(employees.load(&store)?, 2);
//! # Ok::<(), class_fixtures::FixtureError>(())
//! ```
//!
//! # Architecture
//!
//! - [`ModelSchema`](schema::ModelSchema) - Declared field layout of one
//!   model, including relation fields and an optional natural key
//! - [`RecordSet`](record_set::RecordSet) - Ordered record definitions for
//!   one model, with dependency tracking and idempotent loading
//! - [`FieldInput`](relation::FieldInput) - Field values passed to `add`,
//!   covering plain values, deferred references, and immediate references
//! - [`StoreConnection`](store::StoreConnection) - The persistence seam;
//!   [`MemoryStore`](memory::MemoryStore) is the built-in implementation
//! - [`FixtureRegistry`](registry::FixtureRegistry) - Label-based bundle
//!   registration and batch loading

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
mod loader;
pub mod memory;
pub mod prelude;
pub mod record_set;
pub mod registry;
pub mod relation;
pub mod schema;
pub mod store;

// Re-export commonly used types at crate root
pub use error::{FixtureError, FixtureResult, RelationError, UsageError};
pub use memory::MemoryStore;
pub use record_set::RecordSet;
pub use registry::{FixtureRegistry, LoadSummary, load_all};
pub use relation::{FieldInput, RelationTarget};
pub use schema::{FieldKind, ModelSchema};
pub use store::{StoreConnection, StoredRecord};
