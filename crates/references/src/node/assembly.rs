//! Assembly references.

use super::{NodeOrigin, ReferenceData, ReferenceKind, ReferenceNode, Variant, item_include, metadata, present, write_item};
use crate::config::ResolverConfig;
use crate::engine::{BuildEngine, EvaluatedItem, ItemId};
use crate::error::{ReferenceError, Result};
use crate::paths;
use crate::resolve::ResolutionPlan;

/// An assembly reference, by simple or full (fusion) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReference {
	include: String,
	hint_path: Option<String>,
	simple_name: String,
	fusion_name: Option<String>,
}

/// `"Foo, Version=1.0.0.0, Culture=neutral"` -> `"Foo"`.
fn simple_name_of(assembly_name: &str) -> String {
	assembly_name.split(',').next().unwrap_or_default().trim().to_string()
}

impl AssemblyReference {
	fn new(include: String, hint_path: Option<String>) -> Self {
		Self {
			simple_name: simple_name_of(&include),
			include,
			hint_path,
			fusion_name: None,
		}
	}

	/// Include of the backing item, matched against generated `OriginalItemSpec`.
	pub fn include(&self) -> &str {
		&self.include
	}

	pub fn hint_path(&self) -> Option<&str> {
		self.hint_path.as_deref()
	}

	pub fn simple_name(&self) -> &str {
		&self.simple_name
	}

	/// Full name reported by the last resolution.
	pub fn fusion_name(&self) -> Option<&str> {
		self.fusion_name.as_deref()
	}
}

impl Variant for AssemblyReference {
	fn kind(&self) -> ReferenceKind {
		ReferenceKind::Assembly
	}

	fn check_identity(&self) -> Result<()> {
		if self.simple_name.is_empty() {
			return Err(ReferenceError::Unidentified {
				kind: ReferenceKind::Assembly,
				missing: "an assembly name",
			});
		}
		Ok(())
	}

	fn create_item(&self, _caption: &str, engine: &mut dyn BuildEngine, config: &ResolverConfig) -> Result<ItemId> {
		let entries: Vec<_> = self.hint_path.iter().map(|hint| (metadata::HINT_PATH, hint.clone())).collect();
		write_item(engine, &config.persisted.assembly_reference, &self.include, &entries)
	}

	fn plan<'c>(&self, config: &'c ResolverConfig) -> ResolutionPlan<'c> {
		ResolutionPlan {
			target: Some(&config.targets.resolve_assembly_references),
			generated_item_type: Some(&config.generated.reference_paths),
			renames_item: false,
		}
	}

	fn matches(&self, item: &EvaluatedItem) -> bool {
		item.metadata(metadata::ORIGINAL_ITEM_SPEC) == Some(self.include.as_str())
	}

	fn absorb(&mut self, item: &EvaluatedItem) -> Option<String> {
		let fusion_name = item.metadata(metadata::FUSION_NAME).filter(|name| !name.trim().is_empty())?;
		let simple_name = simple_name_of(fusion_name);
		if simple_name.is_empty() {
			return None;
		}
		self.fusion_name = Some(fusion_name.to_string());
		self.simple_name = simple_name.clone();
		Some(simple_name)
	}
}

impl ReferenceNode {
	pub fn assembly_from_item(engine: &dyn BuildEngine, item: ItemId) -> Result<Self> {
		let include = item_include(engine, item)?;
		let data = AssemblyReference::new(include, present(engine.metadata(item, metadata::HINT_PATH)));
		Ok(Self::new(NodeOrigin::Persisted, Some(item), data.simple_name.clone(), ReferenceData::Assembly(data)))
	}

	/// Builds an assembly node from an assembly name, simple or full.
	pub fn assembly_from_name(name: &str) -> Self {
		let data = AssemblyReference::new(name.trim().to_string(), None);
		Self::new(NodeOrigin::Selection, None, data.simple_name.clone(), ReferenceData::Assembly(data))
	}

	/// Builds an assembly node from a file; the hint path is kept relative to
	/// the project folder when the file lies beneath it.
	pub fn assembly_from_path(project_folder: &str, path: &str) -> Self {
		let hint = paths::relative_to(project_folder, path);
		let data = AssemblyReference::new(paths::file_stem(path).to_string(), Some(hint));
		Self::new(NodeOrigin::FilePath, None, data.simple_name.clone(), ReferenceData::Assembly(data))
	}
}
