//! Registration and label-based lookup of record-set bundles.
//!
//! Fixture code registers its record sets as named bundles grouped under an
//! app label, through explicit calls at startup. The loading side resolves
//! labels of the form `"app"` (every bundle of the app) or `"app.bundle"`
//! (one bundle) and batch-loads whatever they match. A process-wide default
//! registry is reachable through [`FixtureRegistry::global`]; nothing is
//! registered as an import-time side effect.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{FixtureResult, UsageError};
use crate::record_set::RecordSet;
use crate::store::StoreConnection;

/// Outcome of a label-driven load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
	/// Total records persisted, dependency loads included.
	pub records_loaded: usize,

	/// Number of record sets visited across all matched bundles.
	pub sets_visited: usize,
}

#[derive(Default)]
struct RegistryInner {
	/// App label to bundle name to record sets, bundles in registration
	/// order.
	apps: HashMap<String, IndexMap<String, Vec<RecordSet>>>,
}

/// Registry of record-set bundles, keyed by app label and bundle name.
#[derive(Clone, Default)]
pub struct FixtureRegistry {
	inner: Arc<RwLock<RegistryInner>>,
}

static GLOBAL_REGISTRY: Lazy<FixtureRegistry> = Lazy::new(FixtureRegistry::new);

impl FixtureRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the process-wide default registry.
	pub fn global() -> &'static FixtureRegistry {
		&GLOBAL_REGISTRY
	}

	/// Registers a bundle of record sets under `app.bundle`, replacing any
	/// bundle previously registered under the same label.
	pub fn register(&self, app: impl Into<String>, bundle: impl Into<String>, sets: Vec<RecordSet>) {
		self.inner
			.write()
			.apps
			.entry(app.into())
			.or_default()
			.insert(bundle.into(), sets);
	}

	/// Returns the record sets registered under `app.bundle`.
	pub fn bundle(&self, app: &str, bundle: &str) -> Option<Vec<RecordSet>> {
		self.inner
			.read()
			.apps
			.get(app)
			.and_then(|bundles| bundles.get(bundle))
			.cloned()
	}

	/// Returns every registered `app.bundle` label.
	pub fn labels(&self) -> Vec<String> {
		let inner = self.inner.read();
		let mut labels: Vec<String> = inner
			.apps
			.iter()
			.flat_map(|(app, bundles)| {
				bundles.keys().map(move |bundle| format!("{app}.{bundle}"))
			})
			.collect();
		labels.sort();
		labels
	}

	/// Removes all registered bundles. Primarily useful for tests.
	pub fn clear(&self) {
		self.inner.write().apps.clear();
	}

	/// Returns true if no bundles are registered.
	pub fn is_empty(&self) -> bool {
		self.inner.read().apps.is_empty()
	}

	/// Resolves a label to the record sets it matches.
	///
	/// `"app"` matches every bundle registered under the app, in
	/// registration order; `"app.bundle"` matches one bundle.
	///
	/// # Errors
	///
	/// Returns a [`UsageError`] for malformed labels and for labels that
	/// match nothing.
	pub fn resolve(&self, label: &str) -> FixtureResult<Vec<RecordSet>> {
		let inner = self.inner.read();
		let mut parts = label.splitn(3, '.');
		match (parts.next(), parts.next(), parts.next()) {
			(Some(app), None, None) if !app.is_empty() => inner
				.apps
				.get(app)
				.map(|bundles| bundles.values().flatten().cloned().collect())
				.ok_or_else(|| {
					UsageError::UnknownLabel {
						label: label.to_string(),
					}
					.into()
				}),
			(Some(app), Some(bundle), None) if !app.is_empty() && !bundle.is_empty() => inner
				.apps
				.get(app)
				.and_then(|bundles| bundles.get(bundle))
				.cloned()
				.ok_or_else(|| {
					UsageError::UnknownLabel {
						label: label.to_string(),
					}
					.into()
				}),
			_ => Err(UsageError::InvalidLabel {
				label: label.to_string(),
			}
			.into()),
		}
	}

	/// Resolves every label and loads the matched record sets against the
	/// store, in match order.
	///
	/// # Errors
	///
	/// Fails on the first unresolvable label or load error; the caller
	/// owns the transaction scope and rolls back on error.
	pub fn load_labels(
		&self,
		store: &dyn StoreConnection,
		labels: &[&str],
	) -> FixtureResult<LoadSummary> {
		let mut sets = Vec::new();
		for label in labels {
			sets.extend(self.resolve(label)?);
		}
		let records_loaded = load_all(store, &sets)?;
		tracing::debug!(
			labels = labels.len(),
			sets = sets.len(),
			records = records_loaded,
			"loaded fixture labels"
		);
		Ok(LoadSummary {
			records_loaded,
			sets_visited: sets.len(),
		})
	}
}

/// Loads every record set in order against the store, returning the total
/// number of records persisted. Sets already in the store contribute zero.
pub fn load_all(store: &dyn StoreConnection, sets: &[RecordSet]) -> FixtureResult<usize> {
	let mut count = 0;
	for set in sets {
		count += set.load(store)?;
	}
	Ok(count)
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use rstest::rstest;
	use serde_json::json;

	use super::*;
	use crate::error::FixtureError;
	use crate::memory::MemoryStore;
	use crate::relation::value;
	use crate::schema::ModelSchema;

	fn band_set(name: &str) -> RecordSet {
		let set = RecordSet::new(Arc::new(ModelSchema::new("music.Band").scalar("name")));
		set.add(json!(1), [("name", value(name))]).unwrap();
		set
	}

	#[rstest]
	fn test_register_and_resolve_bundle() {
		let registry = FixtureRegistry::new();
		let set = band_set("Nuns N' Hoses");
		registry.register("music", "bands", vec![set.clone()]);

		let resolved = registry.resolve("music.bands").unwrap();
		assert_eq!(resolved, vec![set]);
	}

	#[rstest]
	fn test_resolve_app_label_matches_all_bundles() {
		let registry = FixtureRegistry::new();
		registry.register("music", "bands", vec![band_set("Nuns N' Hoses")]);
		registry.register("music", "more_bands", vec![band_set("Led Dirigible")]);

		assert_eq!(registry.resolve("music").unwrap().len(), 2);
		assert_eq!(
			registry.labels(),
			vec!["music.bands".to_string(), "music.more_bands".to_string()]
		);
	}

	#[rstest]
	fn test_unknown_label() {
		let registry = FixtureRegistry::new();
		let error = registry.resolve("nothing").unwrap_err();
		assert!(matches!(
			error,
			FixtureError::Usage(UsageError::UnknownLabel { .. })
		));
	}

	#[rstest]
	fn test_malformed_label() {
		let registry = FixtureRegistry::new();
		registry.register("music", "bands", vec![band_set("Nuns N' Hoses")]);
		let error = registry.resolve("music.bands.extra").unwrap_err();
		assert!(matches!(
			error,
			FixtureError::Usage(UsageError::InvalidLabel { .. })
		));
		assert!(matches!(
			registry.resolve("").unwrap_err(),
			FixtureError::Usage(UsageError::InvalidLabel { .. })
		));
	}

	#[rstest]
	fn test_load_labels() {
		let registry = FixtureRegistry::new();
		registry.register("music", "bands", vec![band_set("Nuns N' Hoses")]);

		let store = MemoryStore::new();
		let summary = registry
			.load_labels(&store, &["music.bands"])
			.unwrap();
		assert_eq!(
			summary,
			LoadSummary {
				records_loaded: 1,
				sets_visited: 1,
			}
		);
		assert_eq!(store.count("music.Band"), 1);

		// Loading the same label again is idempotent.
		let again = registry.load_labels(&store, &["music.bands"]).unwrap();
		assert_eq!(again.records_loaded, 0);
	}

	#[rstest]
	fn test_global_registry_is_shared() {
		let registry = FixtureRegistry::global();
		registry.clear();
		registry.register("shared", "bundle", vec![band_set("Nuns N' Hoses")]);
		assert!(!FixtureRegistry::global().is_empty());
		registry.clear();
	}
}
