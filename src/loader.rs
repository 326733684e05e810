//! Persistence worker for a single record set.
//!
//! `RecordLoader` instances are throwaway: one is constructed per
//! [`RecordSet::load`](crate::record_set::RecordSet::load) pass from a
//! snapshot of the captured definitions. It resolves every placeholder to
//! a concrete record reference, persists records in declaration order, and
//! defers many-to-many link creation until every referenced record exists.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{FixtureResult, RelationError};
use crate::record_set::{RecordSet, StoredField};
use crate::store::{StoreConnection, StoredRecord};

/// Stateless-per-invocation worker that writes one record set's
/// definitions to the store.
pub(crate) struct RecordLoader {
	definitions: IndexMap<Value, IndexMap<String, StoredField>>,
	set: RecordSet,
	raw: bool,
	/// Resolved link targets keyed by `(primary key, field name)`, written
	/// after every record of the set has been persisted.
	pending_links: IndexMap<(Value, String), Vec<StoredRecord>>,
	saved: IndexMap<Value, StoredRecord>,
}

impl RecordLoader {
	/// Creates a loader over a snapshot of a record set's definitions.
	pub(crate) fn new(
		definitions: IndexMap<Value, IndexMap<String, StoredField>>,
		set: RecordSet,
		raw: bool,
	) -> Self {
		Self {
			definitions,
			set,
			raw,
			pending_links: IndexMap::new(),
			saved: IndexMap::new(),
		}
	}

	/// Resolves placeholders and persists every record in declaration
	/// order, returning the persisted records keyed by primary key.
	///
	/// Records are resolved one at a time before being written, so a
	/// definition may reference an earlier record of the same set. When
	/// the model is not routed to this connection the whole pass is
	/// skipped and nothing is returned.
	///
	/// Add-time classification guarantees multi-valued fields only hold
	/// placeholder lists; a plain value encountered under one here is
	/// rejected as [`RelationError::InvalidManyValue`].
	pub(crate) fn load(
		&mut self,
		store: &dyn StoreConnection,
	) -> FixtureResult<IndexMap<Value, StoredRecord>> {
		let model = self.set.model();
		if !store.allows_model(&model) {
			tracing::debug!(model = %model, "model not routed to this connection, skipping");
			return Ok(IndexMap::new());
		}

		let definitions = std::mem::take(&mut self.definitions);
		for (pk, definition) in definitions {
			let mut resolved = Map::new();
			for (field, stored) in definition {
				match stored {
					StoredField::Many(placeholders) => {
						let mut targets = Vec::with_capacity(placeholders.len());
						for placeholder in placeholders {
							targets.push(placeholder.resolve(store)?);
						}
						self.pending_links.insert((pk.clone(), field), targets);
					}
					StoredField::Single(placeholder) => {
						let target = placeholder.resolve(store)?;
						resolved.insert(field, target.pk);
					}
					StoredField::Scalar(v) => {
						if self
							.set
							.schema()
							.field(&field)
							.is_some_and(|kind| kind.is_multi())
						{
							return Err(RelationError::InvalidManyValue {
								field,
								value: v.to_string(),
							}
							.into());
						}
						resolved.insert(field, v);
					}
				}
			}

			let record = store.create(&model, &pk, resolved, self.raw)?;
			tracing::trace!(model = %model, pk = %pk, raw = self.raw, "persisted record");
			self.saved.insert(pk, record);
		}
		Ok(self.saved.clone())
	}

	/// Writes every pending many-to-many link, now that both endpoints of
	/// each link are persisted.
	pub(crate) fn create_relations(&self, store: &dyn StoreConnection) -> FixtureResult<()> {
		for ((pk, field), targets) in &self.pending_links {
			let record = match self.saved.get(pk) {
				Some(record) => record.clone(),
				None => self.set.record_by_pk(pk, store)?,
			};
			for target in targets {
				store.add_link(&record, field, target)?;
			}
			tracing::trace!(
				model = %record.model,
				pk = %pk,
				field = %field,
				links = targets.len(),
				"created relation links"
			);
		}
		Ok(())
	}
}
