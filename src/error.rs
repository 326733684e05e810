//! Error types for the class-fixtures crate.
//!
//! Two failure families exist: [`UsageError`] for caller misuse of the
//! fixture API, and [`RelationError`] for problems in the relation graph
//! (cycles, unresolvable references, bad relation arguments). Both are
//! carried by the crate-wide [`FixtureError`].

use serde_json::Value;
use thiserror::Error;

/// Caller misuse of the fixture API.
#[derive(Debug, Error)]
pub enum UsageError {
	/// A record was added to a record set that has already been loaded.
	#[error("cannot add more records to the already loaded record set for {model}")]
	AddAfterLoad {
		/// Model identifier of the record set.
		model: String,
	},

	/// The primary key is already used by another record in the same set.
	#[error("primary key {pk} already added to another record in the record set for {model}")]
	DuplicatePrimaryKey {
		/// Model identifier of the record set.
		model: String,
		/// The duplicated primary key value.
		pk: Value,
	},

	/// A single value was supplied for a multi-valued relation field.
	#[error("non-iterable value {value} passed to the multi-valued relation field \"{field}\"")]
	NonIterableManyValue {
		/// Name of the multi-valued relation field.
		field: String,
		/// Display rendering of the offending value.
		value: String,
	},

	/// A list of values was supplied for a single-valued relation field.
	#[error("list value passed to the single-valued relation field \"{field}\"")]
	ManyValueForSingleField {
		/// Name of the single-valued relation field.
		field: String,
	},

	/// A relation placeholder was supplied for a plain attribute field.
	#[error("relation value passed to the non-relation field \"{field}\" of {model}")]
	RelationValueForScalarField {
		/// Model identifier of the record set.
		model: String,
		/// Name of the plain attribute field.
		field: String,
	},

	/// The field name is not part of the model schema.
	#[error("unknown field \"{field}\" in an add() call for {model}")]
	UnknownField {
		/// Model identifier of the record set.
		model: String,
		/// The unrecognized field name.
		field: String,
	},

	/// A fixture label does not match any registered bundle.
	#[error("no fixtures registered under the label \"{label}\"")]
	UnknownLabel {
		/// The unmatched label.
		label: String,
	},

	/// A fixture label is not of the form "app" or "app.bundle".
	#[error("fixture labels must be of the form \"app\" or \"app.bundle\", got \"{label}\"")]
	InvalidLabel {
		/// The malformed label.
		label: String,
	},
}

/// Relation-graph problems: cycles, bad relation arguments, references
/// that cannot be resolved to a persisted record.
#[derive(Debug, Error)]
pub enum RelationError {
	/// Two record sets reference each other through deferred placeholders.
	#[error("circular dependency between record sets for {a} and {b}")]
	DirectCycle {
		/// Model identifier of the set whose `add` detected the cycle.
		a: String,
		/// Model identifier of the set it points back to.
		b: String,
	},

	/// A dependency chain looped back into a record set already loading.
	#[error("circular dependency detected while loading the record set for {model}")]
	LoadCycle {
		/// Model identifier of the re-entered record set.
		model: String,
	},

	/// A relation was assigned through its reverse descriptor.
	#[error("cannot define a relation to {model} from the target end via \"{field}\"")]
	TargetEndAssignment {
		/// Model identifier on the other end of the relation.
		model: String,
		/// Name of the reverse field that was assigned.
		field: String,
	},

	/// A deferred placeholder points at a key its record set never persisted.
	#[error("no {model} record found with primary key {pk}")]
	MissingDeferredTarget {
		/// Model identifier of the owning record set.
		model: String,
		/// The unresolved primary key.
		pk: Value,
	},

	/// A primary-key reference matched no persisted record.
	#[error("no {model} records with primary key {pk} exist")]
	NoPrimaryKeyMatch {
		/// Target model identifier.
		model: String,
		/// The primary key that matched nothing.
		pk: Value,
	},

	/// A natural-key reference matched no persisted record.
	#[error("no {model} records matching the natural key {key:?} exist")]
	NoNaturalKeyMatch {
		/// Target model identifier.
		model: String,
		/// The natural key parts that matched nothing.
		key: Vec<Value>,
	},

	/// An already-instantiated record was passed for the wrong model.
	#[error("record of {found} supplied where a {expected} record was expected")]
	WrongInstanceModel {
		/// Model identifier the relation field targets.
		expected: String,
		/// Model identifier of the supplied record.
		found: String,
	},

	/// A multi-valued relation field held something other than placeholders
	/// at persistence time.
	#[error("invalid argument {value} to the multi-valued relation field \"{field}\"")]
	InvalidManyValue {
		/// Name of the multi-valued relation field.
		field: String,
		/// Display rendering of the offending value.
		value: String,
	},
}

/// Errors that can occur during fixture definition and loading.
#[derive(Debug, Error)]
pub enum FixtureError {
	/// Caller misuse of the fixture API.
	#[error(transparent)]
	Usage(#[from] UsageError),

	/// Relation-graph problem.
	#[error(transparent)]
	Relation(#[from] RelationError),

	/// The store connection reported a failure.
	#[error("store error: {0}")]
	Store(String),
}

impl FixtureError {
	/// Creates a store-failure error from any displayable message.
	pub fn store(message: impl Into<String>) -> Self {
		Self::Store(message.into())
	}
}

/// Result type alias for fixture operations.
pub type FixtureResult<T> = Result<T, FixtureError>;
