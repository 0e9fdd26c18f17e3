//! References to sibling projects.

use uuid::Uuid;

use super::{NodeOrigin, ReferenceData, ReferenceKind, ReferenceNode, Variant, item_include, metadata, parse_guid, present, write_item};
use crate::config::ResolverConfig;
use crate::engine::{BuildEngine, EvaluatedItem, ItemId};
use crate::error::{ReferenceError, Result};
use crate::paths;
use crate::resolve::ResolutionPlan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReference {
	project_guid: Uuid,
	include: String,
	name: String,
}

impl ProjectReference {
	/// GUID of the referenced project.
	pub fn project_guid(&self) -> Uuid {
		self.project_guid
	}

	/// Path of the referenced project file, relative to this project's folder.
	pub fn include(&self) -> &str {
		&self.include
	}

	pub fn name(&self) -> &str {
		&self.name
	}
}

impl Variant for ProjectReference {
	fn kind(&self) -> ReferenceKind {
		ReferenceKind::Project
	}

	fn check_identity(&self) -> Result<()> {
		let missing = if self.include.is_empty() {
			"a project file"
		} else if self.project_guid.is_nil() {
			"a project GUID"
		} else {
			return Ok(());
		};
		Err(ReferenceError::Unidentified {
			kind: ReferenceKind::Project,
			missing,
		})
	}

	fn create_item(&self, _caption: &str, engine: &mut dyn BuildEngine, config: &ResolverConfig) -> Result<ItemId> {
		let entries = [
			(metadata::PROJECT, self.project_guid.braced().to_string()),
			(metadata::NAME, self.name.clone()),
		];
		write_item(engine, &config.persisted.project_reference, &self.include, &entries)
	}

	fn plan<'c>(&self, config: &'c ResolverConfig) -> ResolutionPlan<'c> {
		ResolutionPlan {
			target: Some(&config.targets.resolve_project_references),
			generated_item_type: Some(&config.generated.resolved_project_paths),
			renames_item: false,
		}
	}

	fn matches(&self, item: &EvaluatedItem) -> bool {
		item.metadata(metadata::ORIGINAL_ITEM_SPEC) == Some(self.include.as_str())
	}
}

impl ReferenceNode {
	/// Builds a project node from a persisted item; the `Project` GUID is required.
	pub fn project_from_item(engine: &dyn BuildEngine, item: ItemId) -> Result<Self> {
		let include = item_include(engine, item)?;
		let guid = present(engine.metadata(item, metadata::PROJECT)).ok_or(ReferenceError::MissingMetadata(metadata::PROJECT))?;
		let project_guid = parse_guid(&guid)?;
		let name = present(engine.metadata(item, metadata::NAME)).unwrap_or_else(|| paths::file_stem(&include).to_string());
		let data = ProjectReference { project_guid, include, name };
		Ok(Self::new(NodeOrigin::Persisted, Some(item), data.name.clone(), ReferenceData::Project(data)))
	}

	/// Builds a project node for the project file at `path`.
	pub fn project_from_path(project_folder: &str, path: &str, project_guid: Uuid, name: Option<&str>) -> Self {
		let name = name.filter(|name| !name.is_empty()).unwrap_or_else(|| paths::file_stem(path)).to_string();
		let data = ProjectReference {
			project_guid,
			include: paths::relative_to(project_folder, path),
			name,
		};
		Self::new(NodeOrigin::Selection, None, data.name.clone(), ReferenceData::Project(data))
	}
}
