//! The store-connection collaborator interface.
//!
//! The crate does not own a database; it talks to one through
//! [`StoreConnection`], a narrow create/query/link surface. Loading runs
//! against a single connection that the caller has already wrapped in a
//! transaction scope; the crate performs no retries and expects the caller
//! to roll back on any raised error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FixtureResult;

/// A reference to a persisted record, as returned by store operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
	/// Model identifier of the record (e.g. "music.Band").
	pub model: String,

	/// Primary key value of the record.
	pub pk: Value,

	/// Persisted field values.
	pub fields: Map<String, Value>,
}

impl StoredRecord {
	/// Returns a field value by name.
	pub fn field(&self, name: &str) -> Option<&Value> {
		self.fields.get(name)
	}
}

/// Connection to the persistent store that fixture loading writes to.
///
/// Implementations map these operations onto whatever storage they manage.
/// `create` must honor `raw`: in raw mode any per-model save hooks (derived
/// field computation normally run on save) are bypassed, matching the way a
/// deserialized-object load works.
pub trait StoreConnection {
	/// Persists a record, returning a reference to the stored row.
	///
	/// Loading existing primary keys overwrites the previous record, since
	/// fixtures carry hard-coded serialized keys.
	fn create(
		&self,
		model: &str,
		pk: &Value,
		fields: Map<String, Value>,
		raw: bool,
	) -> FixtureResult<StoredRecord>;

	/// Fetches a record by primary key, `None` when absent.
	fn get(&self, model: &str, pk: &Value) -> FixtureResult<Option<StoredRecord>>;

	/// Fetches a record by natural key, `None` when absent or when the
	/// model declares no natural key.
	fn get_by_natural_key(&self, model: &str, key: &[Value]) -> FixtureResult<Option<StoredRecord>>;

	/// Returns every primary key currently stored for the model.
	///
	/// Used for the "already persisted" check that makes loading idempotent.
	fn query_keys(&self, model: &str) -> FixtureResult<Vec<Value>>;

	/// Links `target` into the named multi-valued field of `record`.
	///
	/// Called only after both endpoints have been persisted.
	fn add_link(&self, record: &StoredRecord, field: &str, target: &StoredRecord)
	-> FixtureResult<()>;

	/// Multi-database routing gate: whether this connection accepts records
	/// of the given model. Persistence is skipped entirely when it returns
	/// false. The default accepts everything.
	fn allows_model(&self, model: &str) -> bool {
		let _ = model;
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_stored_record_field_access() {
		let mut fields = Map::new();
		fields.insert("name".to_string(), json!("Nuns N' Hoses"));
		let record = StoredRecord {
			model: "music.Band".to_string(),
			pk: json!(1),
			fields,
		};

		assert_eq!(record.field("name"), Some(&json!("Nuns N' Hoses")));
		assert_eq!(record.field("missing"), None);
	}

	#[rstest]
	fn test_stored_record_round_trips_through_serde() {
		let mut fields = Map::new();
		fields.insert("name".to_string(), json!("Marshall Amp"));
		let record = StoredRecord {
			model: "music.Roadie".to_string(),
			pk: json!(7),
			fields,
		};

		let serialized = serde_json::to_string(&record).unwrap();
		let deserialized: StoredRecord = serde_json::from_str(&serialized).unwrap();
		assert_eq!(record, deserialized);
	}
}
