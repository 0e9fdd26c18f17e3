//! COM type library references.

use uuid::Uuid;

use super::{NodeOrigin, ReferenceData, ReferenceKind, ReferenceNode, Variant, item_include, metadata, parse_guid, parse_locale, parse_version, present, write_item};
use crate::catalog::{ComponentCatalog, InstalledComponent, TypeLibraryLoader, lookup_installed};
use crate::config::ResolverConfig;
use crate::engine::{BuildEngine, EvaluatedItem, ItemId};
use crate::error::{ReferenceError, Result};
use crate::paths;
use crate::resolve::ResolutionPlan;

/// Kind of component picked in a component selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
	TypeLibrary,
	Project,
	ComPlus,
}

/// A component picked by the user, identified by its type library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSelection {
	pub component_type: ComponentType,
	pub title: String,
	pub type_library: Uuid,
	pub major: u16,
	pub minor: u16,
	pub lcid: u32,
}

/// Tool the build uses to produce the interop wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperTool {
	/// A registered primary interop assembly is used as is.
	Primary,
	/// A private wrapper is generated from the type library.
	TlbImp,
}

impl WrapperTool {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Primary => "primary",
			Self::TlbImp => "tlbimp",
		}
	}
}

/// Identity of a COM reference: type library GUID, version and locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComReference {
	type_guid: Uuid,
	major: u16,
	minor: u16,
	lcid: u32,
	installed: InstalledComponent,
}

impl ComReference {
	pub fn type_guid(&self) -> Uuid {
		self.type_guid
	}

	pub fn major(&self) -> u16 {
		self.major
	}

	pub fn minor(&self) -> u16 {
		self.minor
	}

	pub fn lcid(&self) -> u32 {
		self.lcid
	}

	/// Installed file path from the component catalog, if registered.
	pub fn installed_path(&self) -> Option<&str> {
		self.installed.installed_path.as_deref()
	}

	pub fn primary_interop_assembly(&self) -> Option<&str> {
		self.installed.primary_interop_assembly.as_deref()
	}

	pub fn wrapper_tool(&self) -> WrapperTool {
		if self.installed.primary_interop_assembly.is_some() { WrapperTool::Primary } else { WrapperTool::TlbImp }
	}

	fn braced_guid(&self) -> String {
		self.type_guid.braced().to_string()
	}
}

impl Variant for ComReference {
	fn kind(&self) -> ReferenceKind {
		ReferenceKind::Com
	}

	fn check_identity(&self) -> Result<()> {
		if self.type_guid.is_nil() {
			return Err(ReferenceError::Unidentified {
				kind: ReferenceKind::Com,
				missing: "a type library GUID",
			});
		}
		Ok(())
	}

	fn create_item(&self, caption: &str, engine: &mut dyn BuildEngine, config: &ResolverConfig) -> Result<ItemId> {
		let tool = self.wrapper_tool();
		let mut entries = vec![
			(metadata::GUID, self.braced_guid()),
			(metadata::VERSION_MAJOR, self.major.to_string()),
			(metadata::VERSION_MINOR, self.minor.to_string()),
			(metadata::LCID, self.lcid.to_string()),
			(metadata::ISOLATED, "False".to_string()),
			(metadata::WRAPPER_TOOL, tool.as_str().to_string()),
		];
		if tool == WrapperTool::TlbImp {
			entries.push((metadata::PRIVATE, "True".to_string()));
		}
		write_item(engine, &config.persisted.com_reference, caption, &entries)
	}

	fn plan<'c>(&self, config: &'c ResolverConfig) -> ResolutionPlan<'c> {
		ResolutionPlan {
			target: Some(&config.targets.resolve_com_references),
			generated_item_type: Some(&config.generated.com_wrappers),
			renames_item: true,
		}
	}

	fn matches(&self, item: &EvaluatedItem) -> bool {
		item.metadata_eq_ignore_case(metadata::GUID, &self.braced_guid())
			&& item.metadata(metadata::VERSION_MAJOR) == Some(self.major.to_string().as_str())
			&& item.metadata(metadata::VERSION_MINOR) == Some(self.minor.to_string().as_str())
			&& item.metadata(metadata::LCID) == Some(self.lcid.to_string().as_str())
	}
}

impl ReferenceNode {
	/// Builds a COM node from a persisted item.
	///
	/// A catalog miss is tolerated: stale references to uninstalled
	/// components still load, they just never resolve.
	pub fn com_from_item(engine: &dyn BuildEngine, catalog: &dyn ComponentCatalog, item: ItemId) -> Result<Self> {
		let include = item_include(engine, item)?;
		let type_guid = match present(engine.metadata(item, metadata::GUID)) {
			Some(text) => parse_guid(&text)?,
			None => Uuid::nil(),
		};
		let major = parse_version(metadata::VERSION_MAJOR, engine.metadata(item, metadata::VERSION_MAJOR))?;
		let minor = parse_version(metadata::VERSION_MINOR, engine.metadata(item, metadata::VERSION_MINOR))?;
		let lcid = parse_locale(engine.metadata(item, metadata::LCID))?;

		let installed = lookup_installed(catalog, type_guid, major, minor, lcid);
		let caption = if include.is_empty() { installed.display_name.clone().unwrap_or_default() } else { include };
		let data = ComReference {
			type_guid,
			major,
			minor,
			lcid,
			installed,
		};
		Ok(Self::new(NodeOrigin::Persisted, Some(item), caption, ReferenceData::Com(data)))
	}

	/// Builds a COM node from a component selection.
	///
	/// Fails unless the selected type library is installed.
	pub fn com_from_selection(catalog: &dyn ComponentCatalog, selection: &ComponentSelection) -> Result<Self> {
		if matches!(selection.component_type, ComponentType::Project | ComponentType::ComPlus) {
			return Err(ReferenceError::InvalidSelection(format!(
				"'{}' is a {:?} component, not a type library",
				selection.title, selection.component_type
			)));
		}
		let installed = lookup_installed(catalog, selection.type_library, selection.major, selection.minor, selection.lcid);
		if installed.installed_path.is_none() {
			return Err(ReferenceError::NotInstalled(selection.title.clone()));
		}
		let caption = if selection.title.is_empty() { installed.display_name.clone().unwrap_or_default() } else { selection.title.clone() };
		let data = ComReference {
			type_guid: selection.type_library,
			major: selection.major,
			minor: selection.minor,
			lcid: selection.lcid,
			installed,
		};
		Ok(Self::new(NodeOrigin::Selection, None, caption, ReferenceData::Com(data)))
	}

	/// Builds a COM node from a type library file.
	///
	/// Fails when the file cannot be loaded or its library is not installed.
	pub fn com_from_file(catalog: &dyn ComponentCatalog, loader: &dyn TypeLibraryLoader, path: &str) -> Result<Self> {
		let attributes = loader.load(path).map_err(|reason| ReferenceError::TypeLibraryLoad {
			path: path.to_string(),
			reason,
		})?;
		let installed = lookup_installed(catalog, attributes.guid, attributes.major, attributes.minor, attributes.lcid);
		if installed.installed_path.is_none() {
			return Err(ReferenceError::NotInstalled(path.to_string()));
		}
		let caption = installed.display_name.clone().unwrap_or_else(|| paths::file_stem(path).to_string());
		let data = ComReference {
			type_guid: attributes.guid,
			major: attributes.major,
			minor: attributes.minor,
			lcid: attributes.lcid,
			installed,
		};
		Ok(Self::new(NodeOrigin::FilePath, None, caption, ReferenceData::Com(data)))
	}
}
