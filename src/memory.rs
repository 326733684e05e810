//! In-memory reference implementation of [`StoreConnection`].
//!
//! `MemoryStore` backs the crate's test suites and works as a lightweight
//! store for exercising fixture definitions without a database. It keeps
//! per-model tables in declaration order, a link table for multi-valued
//! relations, optional per-model save hooks (bypassed in raw mode), and a
//! deny list modeling multi-database routing.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::FixtureResult;
use crate::schema::ModelSchema;
use crate::store::{StoreConnection, StoredRecord};

/// A per-model save hook, run against the field map before insert unless
/// the record is persisted in raw mode.
pub type SaveHook = Arc<dyn Fn(&mut Map<String, Value>) + Send + Sync>;

/// One row of the many-to-many link table.
#[derive(Debug, Clone, PartialEq)]
struct Link {
	model: String,
	pk: Value,
	field: String,
	target_model: String,
	target_pk: Value,
}

#[derive(Default)]
struct Inner {
	schemas: HashMap<String, Arc<ModelSchema>>,
	tables: HashMap<String, IndexMap<Value, Map<String, Value>>>,
	links: Vec<Link>,
	hooks: HashMap<String, SaveHook>,
	denied: HashSet<String>,
}

/// In-memory store with link tables, natural keys, save hooks and routing.
#[derive(Default)]
pub struct MemoryStore {
	inner: RwLock<Inner>,
}

impl MemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a model schema, enabling natural-key lookup for it.
	pub fn register(&self, schema: &Arc<ModelSchema>) {
		self.inner
			.write()
			.schemas
			.insert(schema.model().to_string(), Arc::clone(schema));
	}

	/// Installs a save hook for the model. The hook runs on every non-raw
	/// `create` call, mutating the field map before the record is stored.
	pub fn set_save_hook<F>(&self, model: impl Into<String>, hook: F)
	where
		F: Fn(&mut Map<String, Value>) + Send + Sync + 'static,
	{
		self.inner.write().hooks.insert(model.into(), Arc::new(hook));
	}

	/// Marks a model as not routable to this connection.
	pub fn deny(&self, model: impl Into<String>) {
		self.inner.write().denied.insert(model.into());
	}

	/// Returns the number of stored records for the model.
	pub fn count(&self, model: &str) -> usize {
		self.inner
			.read()
			.tables
			.get(model)
			.map_or(0, |table| table.len())
	}

	/// Returns the target primary keys linked from the named multi-valued
	/// field of the given record.
	pub fn links_from(&self, model: &str, pk: &Value, field: &str) -> Vec<Value> {
		self.inner
			.read()
			.links
			.iter()
			.filter(|link| link.model == model && link.pk == *pk && link.field == field)
			.map(|link| link.target_pk.clone())
			.collect()
	}

	/// Returns the `(model, primary key)` pairs of every record that links
	/// to the given target. This is the reverse side of the relation.
	pub fn links_to(&self, target_model: &str, target_pk: &Value) -> Vec<(String, Value)> {
		self.inner
			.read()
			.links
			.iter()
			.filter(|link| link.target_model == target_model && link.target_pk == *target_pk)
			.map(|link| (link.model.clone(), link.pk.clone()))
			.collect()
	}
}

impl fmt::Debug for MemoryStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.inner.read();
		f.debug_struct("MemoryStore")
			.field("models", &inner.tables.keys().collect::<Vec<_>>())
			.field("links", &inner.links.len())
			.finish()
	}
}

impl StoreConnection for MemoryStore {
	fn create(
		&self,
		model: &str,
		pk: &Value,
		mut fields: Map<String, Value>,
		raw: bool,
	) -> FixtureResult<StoredRecord> {
		let mut inner = self.inner.write();
		if !raw {
			if let Some(hook) = inner.hooks.get(model) {
				hook(&mut fields);
			}
		}
		inner
			.tables
			.entry(model.to_string())
			.or_default()
			.insert(pk.clone(), fields.clone());
		Ok(StoredRecord {
			model: model.to_string(),
			pk: pk.clone(),
			fields,
		})
	}

	fn get(&self, model: &str, pk: &Value) -> FixtureResult<Option<StoredRecord>> {
		let inner = self.inner.read();
		Ok(inner
			.tables
			.get(model)
			.and_then(|table| table.get(pk))
			.map(|fields| StoredRecord {
				model: model.to_string(),
				pk: pk.clone(),
				fields: fields.clone(),
			}))
	}

	fn get_by_natural_key(&self, model: &str, key: &[Value]) -> FixtureResult<Option<StoredRecord>> {
		let inner = self.inner.read();
		let Some(schema) = inner.schemas.get(model) else {
			return Ok(None);
		};
		let key_fields = schema.natural_key_fields();
		if key_fields.is_empty() || key_fields.len() != key.len() {
			return Ok(None);
		}
		let Some(table) = inner.tables.get(model) else {
			return Ok(None);
		};
		for (pk, fields) in table {
			let matches = key_fields
				.iter()
				.zip(key)
				.all(|(name, part)| fields.get(name.as_str()) == Some(part));
			if matches {
				return Ok(Some(StoredRecord {
					model: model.to_string(),
					pk: pk.clone(),
					fields: fields.clone(),
				}));
			}
		}
		Ok(None)
	}

	fn query_keys(&self, model: &str) -> FixtureResult<Vec<Value>> {
		let inner = self.inner.read();
		Ok(inner
			.tables
			.get(model)
			.map(|table| table.keys().cloned().collect())
			.unwrap_or_default())
	}

	fn add_link(
		&self,
		record: &StoredRecord,
		field: &str,
		target: &StoredRecord,
	) -> FixtureResult<()> {
		let link = Link {
			model: record.model.clone(),
			pk: record.pk.clone(),
			field: field.to_string(),
			target_model: target.model.clone(),
			target_pk: target.pk.clone(),
		};
		let mut inner = self.inner.write();
		// Linking is idempotent, as with a relational join table.
		if !inner.links.contains(&link) {
			inner.links.push(link);
		}
		Ok(())
	}

	fn allows_model(&self, model: &str) -> bool {
		!self.inner.read().denied.contains(model)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn band_fields(name: &str) -> Map<String, Value> {
		let mut fields = Map::new();
		fields.insert("name".to_string(), json!(name));
		fields
	}

	#[rstest]
	fn test_create_and_get() {
		let store = MemoryStore::new();
		let record = store
			.create("music.Band", &json!(1), band_fields("Nuns N' Hoses"), false)
			.unwrap();
		assert_eq!(record.pk, json!(1));

		let fetched = store.get("music.Band", &json!(1)).unwrap().unwrap();
		assert_eq!(fetched, record);
		assert!(store.get("music.Band", &json!(2)).unwrap().is_none());
	}

	#[rstest]
	fn test_create_overwrites_existing_key() {
		let store = MemoryStore::new();
		store
			.create("music.Band", &json!(1), band_fields("Nuns N' Hoses"), false)
			.unwrap();
		store
			.create("music.Band", &json!(1), band_fields("Led Dirigible"), false)
			.unwrap();

		assert_eq!(store.count("music.Band"), 1);
		let fetched = store.get("music.Band", &json!(1)).unwrap().unwrap();
		assert_eq!(fetched.field("name"), Some(&json!("Led Dirigible")));
	}

	#[rstest]
	fn test_save_hook_respects_raw_mode() {
		let store = MemoryStore::new();
		store.set_save_hook("music.Band", |fields| {
			fields.insert("flagged".to_string(), json!(true));
		});

		store
			.create("music.Band", &json!(1), band_fields("Nuns N' Hoses"), false)
			.unwrap();
		store
			.create("music.Band", &json!(2), band_fields("Led Dirigible"), true)
			.unwrap();

		let hooked = store.get("music.Band", &json!(1)).unwrap().unwrap();
		let raw = store.get("music.Band", &json!(2)).unwrap().unwrap();
		assert_eq!(hooked.field("flagged"), Some(&json!(true)));
		assert_eq!(raw.field("flagged"), None);
	}

	#[rstest]
	fn test_natural_key_lookup() {
		let schema = Arc::new(
			ModelSchema::new("hr.Competency")
				.scalar("framework")
				.scalar("level")
				.natural_key(["framework", "level"]),
		);
		let store = MemoryStore::new();
		store.register(&schema);

		let mut fields = Map::new();
		fields.insert("framework".to_string(), json!("Django"));
		fields.insert("level".to_string(), json!(4));
		store
			.create("hr.Competency", &json!(1), fields, false)
			.unwrap();

		let hit = store
			.get_by_natural_key("hr.Competency", &[json!("Django"), json!(4)])
			.unwrap();
		assert_eq!(hit.unwrap().pk, json!(1));

		let miss = store
			.get_by_natural_key("hr.Competency", &[json!("Rails"), json!(1)])
			.unwrap();
		assert!(miss.is_none());
	}

	#[rstest]
	fn test_natural_key_lookup_without_schema() {
		let store = MemoryStore::new();
		let miss = store
			.get_by_natural_key("music.Band", &[json!("Nuns N' Hoses")])
			.unwrap();
		assert!(miss.is_none());
	}

	#[rstest]
	fn test_links_are_queryable_from_both_sides() {
		let store = MemoryStore::new();
		let roadie = store
			.create("music.Roadie", &json!(1), band_fields("Marshall Amp"), false)
			.unwrap();
		let band = store
			.create("music.Band", &json!(1), band_fields("Nuns N' Hoses"), false)
			.unwrap();

		store.add_link(&roadie, "hauls_for", &band).unwrap();
		store.add_link(&roadie, "hauls_for", &band).unwrap();

		assert_eq!(
			store.links_from("music.Roadie", &json!(1), "hauls_for"),
			vec![json!(1)]
		);
		assert_eq!(
			store.links_to("music.Band", &json!(1)),
			vec![("music.Roadie".to_string(), json!(1))]
		);
	}

	#[rstest]
	fn test_routing_deny_list() {
		let store = MemoryStore::new();
		assert!(store.allows_model("gov.Party"));
		store.deny("gov.Party");
		assert!(!store.allows_model("gov.Party"));
	}

	#[rstest]
	fn test_query_keys() {
		let store = MemoryStore::new();
		assert!(store.query_keys("music.Band").unwrap().is_empty());
		store
			.create("music.Band", &json!(1), band_fields("Nuns N' Hoses"), false)
			.unwrap();
		store
			.create("music.Band", &json!(2), band_fields("Led Dirigible"), false)
			.unwrap();
		assert_eq!(
			store.query_keys("music.Band").unwrap(),
			vec![json!(1), json!(2)]
		);
	}
}
