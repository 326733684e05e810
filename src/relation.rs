//! Relation placeholders and caller-facing field values.
//!
//! Values passed to [`RecordSet::add`](crate::record_set::RecordSet::add)
//! are [`FieldInput`]s. Relation fields turn them into placeholders: a
//! *deferred* placeholder points into another record set that has not been
//! persisted yet, an *immediate* placeholder points at a pre-existing or
//! externally identified record through a tagged [`RelationTarget`].
//! Placeholders are consumed during the load resolution pass and never
//! persisted themselves.

use serde_json::Value;

use crate::error::{FixtureResult, RelationError};
use crate::record_set::RecordSet;
use crate::store::{StoreConnection, StoredRecord};

/// How an immediate relation reference identifies its target record.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationTarget {
	/// An already-fetched record of the target model.
	ByInstance(StoredRecord),

	/// The primary key of a pre-existing record.
	ByPrimaryKey(Value),

	/// The natural key of a pre-existing record, as ordered parts.
	ByNaturalKey(Vec<Value>),
}

/// A field value supplied to an `add` call.
///
/// Construct these through the helper functions in this module
/// ([`value`], [`many`], [`by_pk`], [`natural_key`], [`instance`]) and
/// through [`RecordSet::deferred`] and its `fk`/`m2m`/`o2o` aliases.
#[derive(Debug, Clone)]
pub enum FieldInput {
	/// A plain value. On relation fields, non-falsy scalars are interpreted
	/// as primary keys and arrays as natural keys.
	Value(Value),

	/// An explicit immediate reference to a pre-existing record.
	Ref(RelationTarget),

	/// A deferred reference into a record set that loads later.
	Deferred {
		/// The record set that will persist the target record.
		set: RecordSet,
		/// Primary key of the target record within that set.
		pk: Value,
	},

	/// An ordered list of inputs for a multi-valued relation field.
	Many(Vec<FieldInput>),
}

impl FieldInput {
	/// Renders the input for error messages.
	pub(crate) fn render(&self) -> String {
		match self {
			Self::Value(v) => v.to_string(),
			Self::Ref(RelationTarget::ByInstance(record)) => {
				format!("<{} record {}>", record.model, record.pk)
			}
			Self::Ref(RelationTarget::ByPrimaryKey(pk)) => format!("<pk {pk}>"),
			Self::Ref(RelationTarget::ByNaturalKey(key)) => format!("<natural key {key:?}>"),
			Self::Deferred { set, pk } => format!("<deferred {} {}>", set.model(), pk),
			Self::Many(items) => format!("<list of {} values>", items.len()),
		}
	}
}

/// Wraps a plain value.
pub fn value(v: impl Into<Value>) -> FieldInput {
	FieldInput::Value(v.into())
}

/// Wraps an ordered list of inputs for a multi-valued relation field.
pub fn many<I>(items: I) -> FieldInput
where
	I: IntoIterator<Item = FieldInput>,
{
	FieldInput::Many(items.into_iter().collect())
}

/// References a pre-existing record by primary key.
pub fn by_pk(pk: impl Into<Value>) -> FieldInput {
	FieldInput::Ref(RelationTarget::ByPrimaryKey(pk.into()))
}

/// References a pre-existing record by natural key.
pub fn natural_key<I, V>(parts: I) -> FieldInput
where
	I: IntoIterator<Item = V>,
	V: Into<Value>,
{
	FieldInput::Ref(RelationTarget::ByNaturalKey(
		parts.into_iter().map(Into::into).collect(),
	))
}

/// References an already-fetched record.
pub fn instance(record: StoredRecord) -> FieldInput {
	FieldInput::Ref(RelationTarget::ByInstance(record))
}

/// A not-yet-resolved reference stored inside a record-set definition.
#[derive(Debug, Clone)]
pub(crate) enum Placeholder {
	/// Resolved by asking the owning record set after it loads.
	Deferred { set: RecordSet, pk: Value },

	/// Resolved by querying the store directly.
	Immediate { model: String, target: RelationTarget },
}

impl Placeholder {
	/// Resolves the placeholder to a persisted record reference.
	///
	/// # Errors
	///
	/// Returns a [`RelationError`] when no record matches: a deferred
	/// placeholder whose owning set never persisted the key, an instance of
	/// the wrong model, or a primary/natural key that matches nothing.
	pub(crate) fn resolve(&self, store: &dyn StoreConnection) -> FixtureResult<StoredRecord> {
		match self {
			Self::Deferred { set, pk } => set.record_by_pk(pk, store),
			Self::Immediate { model, target } => match target {
				RelationTarget::ByInstance(record) => {
					if record.model == *model {
						Ok(record.clone())
					} else {
						Err(RelationError::WrongInstanceModel {
							expected: model.clone(),
							found: record.model.clone(),
						}
						.into())
					}
				}
				RelationTarget::ByPrimaryKey(pk) => {
					store
						.get(model, pk)?
						.ok_or_else(|| {
							RelationError::NoPrimaryKeyMatch {
								model: model.clone(),
								pk: pk.clone(),
							}
							.into()
						})
				}
				RelationTarget::ByNaturalKey(key) => {
					store
						.get_by_natural_key(model, key)?
						.ok_or_else(|| {
							RelationError::NoNaturalKeyMatch {
								model: model.clone(),
								key: key.clone(),
							}
							.into()
						})
				}
			},
		}
	}

	/// Renders the placeholder for error messages.
	pub(crate) fn render(&self) -> String {
		match self {
			Self::Deferred { set, pk } => format!("<deferred {} {}>", set.model(), pk),
			Self::Immediate { model, target } => match target {
				RelationTarget::ByInstance(record) => {
					format!("<{} record {}>", record.model, record.pk)
				}
				RelationTarget::ByPrimaryKey(pk) => format!("<{model} pk {pk}>"),
				RelationTarget::ByNaturalKey(key) => {
					format!("<{model} natural key {key:?}>")
				}
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::{Map, json};

	use crate::error::FixtureError;
	use crate::memory::MemoryStore;

	fn named(pk: i64, name: &str) -> (Value, Map<String, Value>) {
		let mut fields = Map::new();
		fields.insert("name".to_string(), json!(name));
		(json!(pk), fields)
	}

	#[rstest]
	fn test_resolve_by_primary_key() {
		let store = MemoryStore::new();
		let (pk, fields) = named(1, "Nuns N' Hoses");
		store.create("music.Band", &pk, fields, false).unwrap();

		let placeholder = Placeholder::Immediate {
			model: "music.Band".to_string(),
			target: RelationTarget::ByPrimaryKey(json!(1)),
		};
		let record = placeholder.resolve(&store).unwrap();
		assert_eq!(record.pk, json!(1));
	}

	#[rstest]
	fn test_resolve_missing_primary_key() {
		let store = MemoryStore::new();
		let placeholder = Placeholder::Immediate {
			model: "music.Band".to_string(),
			target: RelationTarget::ByPrimaryKey(json!(99)),
		};
		let error = placeholder.resolve(&store).unwrap_err();
		assert!(matches!(
			error,
			FixtureError::Relation(RelationError::NoPrimaryKeyMatch { .. })
		));
		assert_eq!(
			error.to_string(),
			"no music.Band records with primary key 99 exist"
		);
	}

	#[rstest]
	fn test_resolve_by_instance_checks_model() {
		let store = MemoryStore::new();
		let (pk, fields) = named(1, "Nuns N' Hoses");
		let record = store.create("music.Band", &pk, fields, false).unwrap();

		let good = Placeholder::Immediate {
			model: "music.Band".to_string(),
			target: RelationTarget::ByInstance(record.clone()),
		};
		assert_eq!(good.resolve(&store).unwrap(), record);

		let bad = Placeholder::Immediate {
			model: "music.Roadie".to_string(),
			target: RelationTarget::ByInstance(record),
		};
		assert!(matches!(
			bad.resolve(&store).unwrap_err(),
			FixtureError::Relation(RelationError::WrongInstanceModel { .. })
		));
	}

	#[rstest]
	fn test_natural_key_miss_is_a_hard_error() {
		let store = MemoryStore::new();
		let placeholder = Placeholder::Immediate {
			model: "hr.Competency".to_string(),
			target: RelationTarget::ByNaturalKey(vec![json!("Django"), json!(4)]),
		};
		assert!(matches!(
			placeholder.resolve(&store).unwrap_err(),
			FixtureError::Relation(RelationError::NoNaturalKeyMatch { .. })
		));
	}

	#[rstest]
	fn test_field_input_helpers() {
		assert!(matches!(value("x"), FieldInput::Value(Value::String(_))));
		assert!(matches!(
			by_pk(3),
			FieldInput::Ref(RelationTarget::ByPrimaryKey(_))
		));
		assert!(matches!(
			natural_key([json!("Django"), json!(4)]),
			FieldInput::Ref(RelationTarget::ByNaturalKey(_))
		));
		let FieldInput::Many(items) = many([value(1), value(2)]) else {
			panic!("expected a Many input");
		};
		assert_eq!(items.len(), 2);
	}
}
