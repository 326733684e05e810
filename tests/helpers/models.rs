//! Model schemas shared by the integration test suites.
//!
//! The schemas mirror a small HR-and-music domain: companies employing
//! employees (with an optional self-referential manager), per-employee
//! history records, competencies identified by a natural key, job postings
//! referencing competencies both singly and in lists, and bands with
//! roadies hauling for them through a many-to-many relation.

use std::sync::Arc;

use class_fixtures::prelude::*;
use serde_json::json;

/// `music.Band`, plain scalars only.
pub fn band() -> Arc<ModelSchema> {
	Arc::new(ModelSchema::new("music.Band").scalar("name"))
}

/// `music.Roadie`, many-to-many `hauls_for` into `music.Band`.
pub fn roadie() -> Arc<ModelSchema> {
	Arc::new(
		ModelSchema::new("music.Roadie")
			.scalar("name")
			.multi_relation("hauls_for", "music.Band"),
	)
}

/// `hr.Company`, plain scalars only.
pub fn company() -> Arc<ModelSchema> {
	Arc::new(ModelSchema::new("hr.Company").scalar("name"))
}

/// `hr.Employee`, foreign key to `hr.Company` and an optional
/// self-referential `manager`. The `cog_in_the_machine` flag is set by the
/// save hook installed through [`install_employee_hook`].
pub fn employee() -> Arc<ModelSchema> {
	Arc::new(
		ModelSchema::new("hr.Employee")
			.scalar("name")
			.scalar("cog_in_the_machine")
			.single_relation("company", "hr.Company")
			.single_relation("manager", "hr.Employee"),
	)
}

/// `hr.EmployeeHistory`, one-to-one into `hr.Employee`.
pub fn employee_history() -> Arc<ModelSchema> {
	Arc::new(
		ModelSchema::new("hr.EmployeeHistory")
			.scalar("average_mood")
			.single_relation("employee", "hr.Employee"),
	)
}

/// `hr.Competency`, identified by the `(framework, level)` natural key.
pub fn competency() -> Arc<ModelSchema> {
	Arc::new(
		ModelSchema::new("hr.Competency")
			.scalar("framework")
			.scalar("level")
			.natural_key(["framework", "level"]),
	)
}

/// `hr.JobPosting`, one required competency plus a list of additional ones.
pub fn job_posting() -> Arc<ModelSchema> {
	Arc::new(
		ModelSchema::new("hr.JobPosting")
			.scalar("title")
			.single_relation("main_competency", "hr.Competency")
			.multi_relation("additional_competencies", "hr.Competency"),
	)
}

/// Installs the `hr.Employee` save hook that marks every non-raw save.
pub fn install_employee_hook(store: &MemoryStore) {
	store.set_save_hook("hr.Employee", |fields| {
		fields.insert("cog_in_the_machine".to_string(), json!(true));
	});
}
