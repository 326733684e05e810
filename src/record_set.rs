//! Record sets: ordered collections of record definitions for one model.
//!
//! A [`RecordSet`] is the class-based fixture equivalent. Definitions are
//! captured through [`add`](RecordSet::add) without touching the store;
//! [`load`](RecordSet::load) walks the dependency graph built from deferred
//! placeholders, persists every unresolved set in dependency order, then
//! delegates its own persistence to a throwaway [`RecordLoader`].
//!
//! [`RecordLoader`]: crate::loader::RecordLoader

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{FixtureResult, RelationError, UsageError};
use crate::loader::RecordLoader;
use crate::relation::{FieldInput, Placeholder, RelationTarget};
use crate::schema::{FieldKind, ModelSchema};
use crate::store::{StoreConnection, StoredRecord};

/// A field value as captured in a record-set definition.
#[derive(Debug, Clone)]
pub(crate) enum StoredField {
	/// A plain value, passed through to the store unchanged.
	Scalar(Value),

	/// A single-valued relation, resolved to the target's primary key.
	Single(Placeholder),

	/// A multi-valued relation, deferred into post-save link creation.
	Many(Vec<Placeholder>),
}

/// Load progress of a record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
	Idle,
	Loading,
	Loaded,
}

struct Inner {
	schema: Arc<ModelSchema>,
	raw: bool,
	locked: bool,
	state: LoadState,
	definitions: IndexMap<Value, IndexMap<String, StoredField>>,
	dependencies: Vec<RecordSet>,
	persisted: IndexMap<Value, StoredRecord>,
}

/// An ordered collection of record definitions for one model.
///
/// Handles are cheap to clone and share the same underlying set; identity
/// (for dependency bookkeeping) follows the shared allocation, not the
/// model, so several independent sets over the same model can coexist.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use class_fixtures::memory::MemoryStore;
/// use class_fixtures::record_set::RecordSet;
/// use class_fixtures::relation::value;
/// use class_fixtures::schema::ModelSchema;
/// use serde_json::json;
///
/// let band = RecordSet::new(Arc::new(
/// 	ModelSchema::new("music.Band").scalar("name"),
/// ));
/// band.add(json!(1), [("name", value("Nuns N' Hoses"))]).unwrap();
///
/// let store = MemoryStore::new();
/// assert_eq!(band.load(&store).unwrap(), 1);
/// ```
#[derive(Clone)]
pub struct RecordSet {
	inner: Arc<RwLock<Inner>>,
}

impl RecordSet {
	/// Creates an empty record set for the given schema.
	pub fn new(schema: Arc<ModelSchema>) -> Self {
		Self::with_raw(schema, false)
	}

	/// Creates an empty record set whose records persist in raw mode,
	/// bypassing per-model save hooks.
	pub fn new_raw(schema: Arc<ModelSchema>) -> Self {
		Self::with_raw(schema, true)
	}

	fn with_raw(schema: Arc<ModelSchema>, raw: bool) -> Self {
		Self {
			inner: Arc::new(RwLock::new(Inner {
				schema,
				raw,
				locked: false,
				state: LoadState::Idle,
				definitions: IndexMap::new(),
				dependencies: Vec::new(),
				persisted: IndexMap::new(),
			})),
		}
	}

	/// Returns the model identifier this set is tied to.
	pub fn model(&self) -> String {
		self.inner.read().schema.model().to_string()
	}

	/// Returns the schema this set is tied to.
	pub fn schema(&self) -> Arc<ModelSchema> {
		Arc::clone(&self.inner.read().schema)
	}

	/// Returns true if records persist in raw mode.
	pub fn is_raw(&self) -> bool {
		self.inner.read().raw
	}

	/// Returns the number of captured record definitions.
	pub fn len(&self) -> usize {
		self.inner.read().definitions.len()
	}

	/// Returns true if no records have been added.
	pub fn is_empty(&self) -> bool {
		self.inner.read().definitions.is_empty()
	}

	/// Creates a deferred reference to the record with the given key in
	/// this set, for use as a relation value in another `add` call.
	pub fn deferred(&self, pk: impl Into<Value>) -> FieldInput {
		FieldInput::Deferred {
			set: self.clone(),
			pk: pk.into(),
		}
	}

	/// Alias of [`deferred`](Self::deferred) for foreign-key fields.
	pub fn fk(&self, pk: impl Into<Value>) -> FieldInput {
		self.deferred(pk)
	}

	/// Alias of [`deferred`](Self::deferred) for many-to-many fields.
	pub fn m2m(&self, pk: impl Into<Value>) -> FieldInput {
		self.deferred(pk)
	}

	/// Alias of [`deferred`](Self::deferred) for one-to-one fields.
	pub fn o2o(&self, pk: impl Into<Value>) -> FieldInput {
		self.deferred(pk)
	}

	/// Captures one record definition. Nothing is written to the store
	/// until [`load`](Self::load) runs.
	///
	/// Relation fields accept deferred references ([`deferred`](Self::deferred)),
	/// tagged immediate references, or plain values: non-falsy scalars are
	/// read as primary keys and arrays as natural keys of pre-existing
	/// records. Multi-valued relation fields require a list value.
	///
	/// # Errors
	///
	/// Fails with a [`UsageError`] when the set is already loaded, the
	/// primary key is duplicated, a field name is not in the schema, or a
	/// value has the wrong shape for its field kind; with a
	/// [`RelationError`] when a reverse-end field is assigned or a direct
	/// circular dependency between two sets is created.
	pub fn add<K, S, I>(&self, pk: K, fields: I) -> FixtureResult<()>
	where
		K: Into<Value>,
		S: Into<String>,
		I: IntoIterator<Item = (S, FieldInput)>,
	{
		let pk = pk.into();
		let schema = {
			let inner = self.inner.read();
			if inner.locked {
				return Err(UsageError::AddAfterLoad {
					model: inner.schema.model().to_string(),
				}
				.into());
			}
			if inner.definitions.contains_key(&pk) {
				return Err(UsageError::DuplicatePrimaryKey {
					model: inner.schema.model().to_string(),
					pk,
				}
				.into());
			}
			Arc::clone(&inner.schema)
		};

		let mut definition = IndexMap::new();
		let mut new_deps = Vec::new();
		for (name, input) in fields {
			let name = name.into();
			let stored = self.process_field(&schema, &name, input, &mut new_deps)?;
			definition.insert(name, stored);
		}

		let mut inner = self.inner.write();
		for dep in new_deps {
			if !inner.dependencies.iter().any(|existing| *existing == dep) {
				inner.dependencies.push(dep);
			}
		}
		inner.definitions.insert(pk, definition);
		Ok(())
	}

	/// Classifies one field value against the schema, registering any
	/// deferred targets as dependencies of this set.
	fn process_field(
		&self,
		schema: &ModelSchema,
		field: &str,
		input: FieldInput,
		deps: &mut Vec<RecordSet>,
	) -> FixtureResult<StoredField> {
		let kind = schema.field(field).ok_or_else(|| UsageError::UnknownField {
			model: schema.model().to_string(),
			field: field.to_string(),
		})?;

		match kind {
			FieldKind::ReverseRelation { target } => Err(RelationError::TargetEndAssignment {
				model: target.clone(),
				field: field.to_string(),
			}
			.into()),
			FieldKind::MultiRelation { target } => {
				let items = match input {
					FieldInput::Many(items) => items,
					FieldInput::Value(Value::Array(values)) => {
						values.into_iter().map(FieldInput::Value).collect()
					}
					other => {
						return Err(UsageError::NonIterableManyValue {
							field: field.to_string(),
							value: other.render(),
						}
						.into());
					}
				};
				let mut placeholders = Vec::with_capacity(items.len());
				for item in items {
					match item {
						FieldInput::Deferred { set, pk } => {
							self.register_dependency(schema, &set, deps)?;
							placeholders.push(Placeholder::Deferred { set, pk });
						}
						FieldInput::Ref(reference) => placeholders.push(Placeholder::Immediate {
							model: target.clone(),
							target: reference,
						}),
						FieldInput::Value(v) => placeholders.push(Placeholder::Immediate {
							model: target.clone(),
							target: classify_value(v),
						}),
						nested @ FieldInput::Many(_) => {
							return Err(RelationError::InvalidManyValue {
								field: field.to_string(),
								value: nested.render(),
							}
							.into());
						}
					}
				}
				Ok(StoredField::Many(placeholders))
			}
			FieldKind::SingleRelation { target } => match input {
				FieldInput::Deferred { set, pk } => {
					self.register_dependency(schema, &set, deps)?;
					Ok(StoredField::Single(Placeholder::Deferred { set, pk }))
				}
				FieldInput::Ref(reference) => Ok(StoredField::Single(Placeholder::Immediate {
					model: target.clone(),
					target: reference,
				})),
				FieldInput::Value(v) => {
					if is_falsy(&v) {
						// None-like assignments stay literal, as a nullable
						// relation column would hold them.
						Ok(StoredField::Scalar(v))
					} else {
						Ok(StoredField::Single(Placeholder::Immediate {
							model: target.clone(),
							target: classify_value(v),
						}))
					}
				}
				FieldInput::Many(_) => Err(UsageError::ManyValueForSingleField {
					field: field.to_string(),
				}
				.into()),
			},
			FieldKind::Scalar => match input {
				FieldInput::Value(v) => Ok(StoredField::Scalar(v)),
				_ => Err(UsageError::RelationValueForScalarField {
					model: schema.model().to_string(),
					field: field.to_string(),
				}
				.into()),
			},
		}
	}

	/// Registers `other` as a dependency of this set, rejecting direct
	/// two-way cycles. Self-references need no edge: records within one set
	/// resolve against each other in declaration order.
	fn register_dependency(
		&self,
		schema: &ModelSchema,
		other: &RecordSet,
		deps: &mut Vec<RecordSet>,
	) -> FixtureResult<()> {
		if *self == *other {
			return Ok(());
		}
		if other.depends_on(self) {
			return Err(RelationError::DirectCycle {
				a: schema.model().to_string(),
				b: other.model(),
			}
			.into());
		}
		if !deps.iter().any(|existing| *existing == *other) {
			deps.push(other.clone());
		}
		Ok(())
	}

	/// Returns true if `other` is among this set's registered dependencies.
	pub(crate) fn depends_on(&self, other: &RecordSet) -> bool {
		self.inner
			.read()
			.dependencies
			.iter()
			.any(|dep| *dep == *other)
	}

	/// Persists this set's records and, first, those of every dependency
	/// that is not yet in the store. Returns the total number of records
	/// persisted by this call, dependencies included.
	///
	/// Loading locks the set against further `add` calls and is idempotent:
	/// records already present in the store are not persisted again.
	///
	/// # Errors
	///
	/// Fails with a [`RelationError`] when the dependency graph is cyclic
	/// or a placeholder cannot be resolved to a persisted record. Store
	/// failures propagate unchanged. The caller owns the transaction scope
	/// and is expected to roll back on error.
	pub fn load(&self, store: &dyn StoreConnection) -> FixtureResult<usize> {
		let (model, dependencies, raw) = {
			let mut inner = self.inner.write();
			inner.locked = true;
			if inner.state == LoadState::Loading {
				return Err(RelationError::LoadCycle {
					model: inner.schema.model().to_string(),
				}
				.into());
			}
			inner.state = LoadState::Loading;
			(
				inner.schema.model().to_string(),
				inner.dependencies.clone(),
				inner.raw,
			)
		};

		let result = self.load_guarded(store, &model, &dependencies, raw);
		let mut inner = self.inner.write();
		inner.state = match result {
			Ok(_) => LoadState::Loaded,
			Err(_) => LoadState::Idle,
		};
		result
	}

	fn load_guarded(
		&self,
		store: &dyn StoreConnection,
		model: &str,
		dependencies: &[RecordSet],
		raw: bool,
	) -> FixtureResult<usize> {
		let mut count = 0;
		for dependency in dependencies {
			if !dependency.loaded_to_db(store)? {
				tracing::debug!(
					model,
					dependency = %dependency.model(),
					"loading dependency record set first"
				);
				count += dependency.load(store)?;
			}
		}

		if !self.loaded_to_db(store)? {
			let definitions = self.inner.read().definitions.clone();
			let mut loader = RecordLoader::new(definitions, self.clone(), raw);
			let saved = loader.load(store)?;
			loader.create_relations(store)?;
			count += saved.len();
			tracing::debug!(model, records = saved.len(), "persisted record set");
			self.inner.write().persisted = saved;
		}
		Ok(count)
	}

	/// Checks whether every record definition in this set is already
	/// present in the store. Models not routed to the connection report
	/// false; their persistence pass is skipped separately.
	pub fn loaded_to_db(&self, store: &dyn StoreConnection) -> FixtureResult<bool> {
		let (model, pks) = {
			let inner = self.inner.read();
			(
				inner.schema.model().to_string(),
				inner.definitions.keys().cloned().collect::<Vec<_>>(),
			)
		};
		if !store.allows_model(&model) {
			return Ok(false);
		}
		let stored = store.query_keys(&model)?;
		Ok(pks.iter().all(|pk| stored.contains(pk)))
	}

	/// Returns the records persisted by the most recent load of this set,
	/// keyed by primary key in declaration order.
	pub fn records(&self) -> IndexMap<Value, StoredRecord> {
		self.inner.read().persisted.clone()
	}

	/// Resolves a primary key to this set's persisted record, falling back
	/// to a store lookup for records persisted outside the current load.
	pub(crate) fn record_by_pk(
		&self,
		pk: &Value,
		store: &dyn StoreConnection,
	) -> FixtureResult<StoredRecord> {
		let (model, cached) = {
			let inner = self.inner.read();
			(
				inner.schema.model().to_string(),
				inner.persisted.get(pk).cloned(),
			)
		};
		if let Some(record) = cached {
			return Ok(record);
		}
		store.get(&model, pk)?.ok_or_else(|| {
			RelationError::MissingDeferredTarget {
				model,
				pk: pk.clone(),
			}
			.into()
		})
	}
}

impl PartialEq for RecordSet {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl Eq for RecordSet {}

impl fmt::Debug for RecordSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.inner.read();
		f.debug_struct("RecordSet")
			.field("model", &inner.schema.model())
			.field("records", &inner.definitions.len())
			.field("dependencies", &inner.dependencies.len())
			.field("state", &inner.state)
			.finish()
	}
}

/// Interprets a plain value on a relation field: arrays read as natural
/// keys, everything else as a primary key.
fn classify_value(v: Value) -> RelationTarget {
	match v {
		Value::Array(parts) => RelationTarget::ByNaturalKey(parts),
		other => RelationTarget::ByPrimaryKey(other),
	}
}

/// Mirrors the truthiness rule the original assignment logic used: falsy
/// relation values (None-like) are stored literally instead of becoming
/// lookups.
fn is_falsy(v: &Value) -> bool {
	match v {
		Value::Null => true,
		Value::Bool(b) => !b,
		Value::Number(n) => n.as_f64() == Some(0.0),
		Value::String(s) => s.is_empty(),
		Value::Array(a) => a.is_empty(),
		Value::Object(o) => o.is_empty(),
	}
}
