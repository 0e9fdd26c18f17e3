//! Package references.
//!
//! Packages are declarative: binding writes the name and version, optionally
//! runs a restore target, and never produces a resolved path.

use super::{NodeOrigin, ReferenceData, ReferenceKind, ReferenceNode, Variant, item_include, metadata, write_item};
use crate::config::ResolverConfig;
use crate::engine::{BuildEngine, EvaluatedItem, ItemId};
use crate::error::{ReferenceError, Result};
use crate::resolve::ResolutionPlan;

/// A package picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSelection {
	pub name: String,
	pub version: String,
}

impl PackageSelection {
	pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			version: version.into(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
	name: String,
	version: String,
}

impl PackageReference {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn version(&self) -> &str {
		&self.version
	}
}

impl Variant for PackageReference {
	fn kind(&self) -> ReferenceKind {
		ReferenceKind::Package
	}

	fn check_identity(&self) -> Result<()> {
		let missing = if self.name.is_empty() {
			"a package name"
		} else if self.version.is_empty() {
			"a package version"
		} else {
			return Ok(());
		};
		Err(ReferenceError::Unidentified {
			kind: ReferenceKind::Package,
			missing,
		})
	}

	fn create_item(&self, _caption: &str, engine: &mut dyn BuildEngine, config: &ResolverConfig) -> Result<ItemId> {
		write_item(engine, &config.persisted.package_reference, &self.name, &[(metadata::VERSION, self.version.clone())])
	}

	fn plan<'c>(&self, config: &'c ResolverConfig) -> ResolutionPlan<'c> {
		ResolutionPlan {
			target: config.targets.package_restore.as_deref(),
			generated_item_type: None,
			renames_item: false,
		}
	}

	fn matches(&self, _item: &EvaluatedItem) -> bool {
		false
	}
}

impl ReferenceNode {
	/// Builds a package node from a persisted item; a missing version is read as empty.
	pub fn package_from_item(engine: &dyn BuildEngine, item: ItemId) -> Result<Self> {
		let name = item_include(engine, item)?;
		let version = engine.metadata(item, metadata::VERSION).unwrap_or_default();
		Ok(Self::new(NodeOrigin::Persisted, Some(item), name.clone(), ReferenceData::Package(PackageReference { name, version })))
	}

	pub fn package_from_selection(selection: &PackageSelection) -> Self {
		let data = PackageReference {
			name: selection.name.clone(),
			version: selection.version.clone(),
		};
		Self::new(NodeOrigin::Selection, None, selection.name.clone(), ReferenceData::Package(data))
	}
}
