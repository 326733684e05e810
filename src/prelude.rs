//! Convenience re-exports for common usage.
//!
//! This module provides a single import for the most commonly used items
//! from the class-fixtures crate.
//!
//! # Example
//!
//! ```
//! use class_fixtures::prelude::*;
//! ```

// Error types
pub use crate::error::{FixtureError, FixtureResult, RelationError, UsageError};

// Schema types
pub use crate::schema::{FieldKind, ModelSchema};

// Record set and field input types
pub use crate::record_set::RecordSet;
pub use crate::relation::{FieldInput, RelationTarget};

// Field input constructors
pub use crate::relation::{by_pk, instance, many, natural_key, value};

// Store types
pub use crate::memory::{MemoryStore, SaveHook};
pub use crate::store::{StoreConnection, StoredRecord};

// Registry types
pub use crate::registry::{FixtureRegistry, LoadSummary, load_all};
