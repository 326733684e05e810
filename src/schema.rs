//! Explicit schema descriptions for fixture models.
//!
//! Each record set is tied to a [`ModelSchema`] that classifies every field
//! up front: plain attribute, single-valued relation (foreign key or
//! one-to-one), multi-valued relation (many-to-many), or the reverse end of
//! a relation defined elsewhere. Classification drives how `add` interprets
//! field values, so it is supplied once at schema construction time instead
//! of being re-derived per call.

use indexmap::IndexMap;

/// Classification of a single model field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
	/// A plain attribute with no relation semantics.
	Scalar,

	/// A single-valued relation (foreign key or one-to-one) to `target`.
	SingleRelation {
		/// Model identifier of the related type.
		target: String,
	},

	/// A multi-valued relation (many-to-many) to `target`.
	MultiRelation {
		/// Model identifier of the related collection's element type.
		target: String,
	},

	/// The reverse end of a relation whose field lives on `target`.
	///
	/// Reverse fields exist so that assigning through them can be rejected
	/// with a descriptive error instead of silently misbehaving.
	ReverseRelation {
		/// Model identifier of the type that owns the relation field.
		target: String,
	},
}

impl FieldKind {
	/// Returns true for single- and multi-valued relation kinds.
	pub fn is_relation(&self) -> bool {
		matches!(
			self,
			Self::SingleRelation { .. } | Self::MultiRelation { .. }
		)
	}

	/// Returns true for the multi-valued relation kind.
	pub fn is_multi(&self) -> bool {
		matches!(self, Self::MultiRelation { .. })
	}

	/// Returns the related model identifier, if this is a relation kind.
	pub fn target(&self) -> Option<&str> {
		match self {
			Self::Scalar => None,
			Self::SingleRelation { target }
			| Self::MultiRelation { target }
			| Self::ReverseRelation { target } => Some(target),
		}
	}
}

/// Field classification for one model, keyed by field name.
///
/// # Example
///
/// ```
/// use class_fixtures::schema::ModelSchema;
///
/// let schema = ModelSchema::new("hr.Employee")
/// 	.scalar("name")
/// 	.single_relation("company", "hr.Company")
/// 	.single_relation("manager", "hr.Employee");
/// assert_eq!(schema.model(), "hr.Employee");
/// ```
#[derive(Debug, Clone)]
pub struct ModelSchema {
	model: String,
	fields: IndexMap<String, FieldKind>,
	natural_key: Vec<String>,
}

impl ModelSchema {
	/// Creates a schema for the given model identifier (e.g. "music.Band").
	pub fn new(model: impl Into<String>) -> Self {
		Self {
			model: model.into(),
			fields: IndexMap::new(),
			natural_key: Vec::new(),
		}
	}

	/// Declares a plain attribute field.
	pub fn scalar(mut self, name: impl Into<String>) -> Self {
		self.fields.insert(name.into(), FieldKind::Scalar);
		self
	}

	/// Declares a single-valued relation field (foreign key or one-to-one).
	pub fn single_relation(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
		self.fields.insert(
			name.into(),
			FieldKind::SingleRelation {
				target: target.into(),
			},
		);
		self
	}

	/// Declares a multi-valued relation field (many-to-many).
	pub fn multi_relation(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
		self.fields.insert(
			name.into(),
			FieldKind::MultiRelation {
				target: target.into(),
			},
		);
		self
	}

	/// Declares the reverse end of a relation owned by `target`.
	pub fn reverse_relation(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
		self.fields.insert(
			name.into(),
			FieldKind::ReverseRelation {
				target: target.into(),
			},
		);
		self
	}

	/// Declares the natural key for this model as an ordered field list.
	pub fn natural_key<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.natural_key = fields.into_iter().map(Into::into).collect();
		self
	}

	/// Returns the model identifier.
	pub fn model(&self) -> &str {
		&self.model
	}

	/// Looks up the classification of a field by name.
	pub fn field(&self, name: &str) -> Option<&FieldKind> {
		self.fields.get(name)
	}

	/// Returns the natural-key field names, empty if the model has none.
	pub fn natural_key_fields(&self) -> &[String] {
		&self.natural_key
	}

	/// Returns true if the model declares a natural key.
	pub fn has_natural_key(&self) -> bool {
		!self.natural_key.is_empty()
	}

	/// Iterates over all declared fields in declaration order.
	pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldKind)> {
		self.fields.iter().map(|(name, kind)| (name.as_str(), kind))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_field_classification() {
		let schema = ModelSchema::new("music.Roadie")
			.scalar("name")
			.multi_relation("hauls_for", "music.Band");

		assert_eq!(schema.field("name"), Some(&FieldKind::Scalar));
		assert_eq!(
			schema.field("hauls_for"),
			Some(&FieldKind::MultiRelation {
				target: "music.Band".to_string()
			})
		);
		assert_eq!(schema.field("missing"), None);
	}

	#[rstest]
	fn test_kind_predicates() {
		let single = FieldKind::SingleRelation {
			target: "hr.Company".to_string(),
		};
		let multi = FieldKind::MultiRelation {
			target: "music.Band".to_string(),
		};
		let reverse = FieldKind::ReverseRelation {
			target: "hr.Employee".to_string(),
		};

		assert!(single.is_relation());
		assert!(!single.is_multi());
		assert!(multi.is_multi());
		assert!(!reverse.is_relation());
		assert!(!FieldKind::Scalar.is_relation());
		assert_eq!(FieldKind::Scalar.target(), None);
		assert_eq!(reverse.target(), Some("hr.Employee"));
	}

	#[rstest]
	fn test_natural_key_declaration() {
		let schema = ModelSchema::new("hr.Competency")
			.scalar("framework")
			.scalar("level")
			.natural_key(["framework", "level"]);

		assert!(schema.has_natural_key());
		assert_eq!(schema.natural_key_fields(), ["framework", "level"]);
	}

	#[rstest]
	fn test_fields_preserve_declaration_order() {
		let schema = ModelSchema::new("hr.Employee")
			.scalar("name")
			.single_relation("company", "hr.Company")
			.single_relation("manager", "hr.Employee");

		let names: Vec<&str> = schema.fields().map(|(name, _)| name).collect();
		assert_eq!(names, ["name", "company", "manager"]);
	}
}
