//! Reference nodes: one uniform node over four structurally different kinds.
//!
//! Every node moves through `Unbound -> Binding -> BoundUnresolved ->
//! BoundResolved` and never returns to `Unbound` once bound. Binding writes
//! the kind's identity into the build description (creating a persisted item
//! when the node did not come from one), then runs the kind's
//! [resolution plan](crate::resolve) to find the generated item describing the
//! node's on-disk file. Kind-specific behavior lives behind the private
//! [`Variant`] trait; duplicate identity is plain data in [`policy`].

use uuid::Uuid;

use crate::config::ResolverConfig;
use crate::engine::{BuildEngine, EngineError, EvaluatedItem, ItemId};
use crate::error::{ReferenceError, Result};
use crate::resolve::{ResolutionPlan, resolve_reference};
use crate::{ComponentCatalog, paths};

mod assembly;
mod com;
mod package;
pub mod policy;
mod project;

pub use assembly::AssemblyReference;
pub use com::{ComReference, ComponentSelection, ComponentType, WrapperTool};
pub use package::{PackageReference, PackageSelection};
pub use policy::{DUPLICATE_POLICIES, DuplicatePolicy};
pub use project::ProjectReference;

/// Metadata keys read from and written to persisted reference items.
pub mod metadata {
	pub const GUID: &str = "Guid";
	pub const VERSION_MAJOR: &str = "VersionMajor";
	pub const VERSION_MINOR: &str = "VersionMinor";
	pub const LCID: &str = "Lcid";
	pub const ISOLATED: &str = "Isolated";
	pub const WRAPPER_TOOL: &str = "WrapperTool";
	pub const PRIVATE: &str = "Private";
	pub const VERSION: &str = "Version";
	pub const HINT_PATH: &str = "HintPath";
	pub const ORIGINAL_ITEM_SPEC: &str = "OriginalItemSpec";
	pub const FUSION_NAME: &str = "FusionName";
	pub const PROJECT: &str = "Project";
	pub const NAME: &str = "Name";
}

/// Container-assigned node handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "node#{}", self.0)
	}
}

/// The four reference kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
	Com,
	Package,
	Assembly,
	Project,
}

impl ReferenceKind {
	/// Every kind, in load order.
	pub const ALL: [ReferenceKind; 4] = [Self::Assembly, Self::Project, Self::Com, Self::Package];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Com => "COM",
			Self::Package => "package",
			Self::Assembly => "assembly",
			Self::Project => "project",
		}
	}

	/// Item type persisted references of this kind are stored under.
	pub fn persisted_item_type(self, config: &ResolverConfig) -> &str {
		match self {
			Self::Com => &config.persisted.com_reference,
			Self::Package => &config.persisted.package_reference,
			Self::Assembly => &config.persisted.assembly_reference,
			Self::Project => &config.persisted.project_reference,
		}
	}
}

impl std::fmt::Display for ReferenceKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Where a node is in the bind/resolve lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
	Unbound,
	Binding,
	BoundUnresolved,
	BoundResolved,
}

impl BindState {
	pub fn is_bound(self) -> bool {
		matches!(self, Self::BoundUnresolved | Self::BoundResolved)
	}
}

/// What a node was constructed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrigin {
	/// An item already present in the build description.
	Persisted,
	/// A user-facing selection structure.
	Selection,
	/// A file on disk.
	FilePath,
}

/// Kind-specific behavior behind a [`ReferenceNode`].
trait Variant {
	fn kind(&self) -> ReferenceKind;

	/// Rejects nodes whose identity is too incomplete to bind.
	fn check_identity(&self) -> Result<()> {
		Ok(())
	}

	/// Writes a new persisted item carrying this node's identity keys.
	fn create_item(&self, caption: &str, engine: &mut dyn BuildEngine, config: &ResolverConfig) -> Result<ItemId>;

	fn plan<'c>(&self, config: &'c ResolverConfig) -> ResolutionPlan<'c>;

	/// Whether a generated item belongs to this node.
	fn matches(&self, item: &EvaluatedItem) -> bool;

	/// Absorbs details from the matched item; returns a replacement caption.
	fn absorb(&mut self, _item: &EvaluatedItem) -> Option<String> {
		None
	}
}

#[derive(Debug, Clone)]
enum ReferenceData {
	Com(ComReference),
	Package(PackageReference),
	Assembly(AssemblyReference),
	Project(ProjectReference),
}

impl ReferenceData {
	fn variant(&self) -> &dyn Variant {
		match self {
			Self::Com(com) => com,
			Self::Package(package) => package,
			Self::Assembly(assembly) => assembly,
			Self::Project(project) => project,
		}
	}

	fn variant_mut(&mut self) -> &mut dyn Variant {
		match self {
			Self::Com(com) => com,
			Self::Package(package) => package,
			Self::Assembly(assembly) => assembly,
			Self::Project(project) => project,
		}
	}
}

/// A reference in the project's dependency graph.
#[derive(Debug, Clone)]
pub struct ReferenceNode {
	item: Option<ItemId>,
	origin: NodeOrigin,
	state: BindState,
	caption: String,
	resolved_path: Option<String>,
	data: ReferenceData,
}

impl ReferenceNode {
	fn new(origin: NodeOrigin, item: Option<ItemId>, caption: String, data: ReferenceData) -> Self {
		Self {
			item,
			origin,
			state: BindState::Unbound,
			caption,
			resolved_path: None,
			data,
		}
	}

	/// Builds a node of `kind` from a persisted item.
	pub fn from_persisted_item(kind: ReferenceKind, engine: &dyn BuildEngine, catalog: &dyn ComponentCatalog, item: ItemId) -> Result<Self> {
		match kind {
			ReferenceKind::Com => Self::com_from_item(engine, catalog, item),
			ReferenceKind::Package => Self::package_from_item(engine, item),
			ReferenceKind::Assembly => Self::assembly_from_item(engine, item),
			ReferenceKind::Project => Self::project_from_item(engine, item),
		}
	}

	pub fn kind(&self) -> ReferenceKind {
		self.data.variant().kind()
	}

	pub fn caption(&self) -> &str {
		&self.caption
	}

	pub fn state(&self) -> BindState {
		self.state
	}

	pub fn origin(&self) -> NodeOrigin {
		self.origin
	}

	/// Backing persisted item, once there is one.
	pub fn item(&self) -> Option<ItemId> {
		self.item
	}

	/// On-disk path found by the last successful resolution.
	pub fn resolved_path(&self) -> Option<&str> {
		self.resolved_path.as_deref()
	}

	/// Unresolved nodes show no resolved icon.
	pub fn can_show_default_icon(&self) -> bool {
		self.resolved_path.is_some()
	}

	pub fn as_com(&self) -> Option<&ComReference> {
		match &self.data {
			ReferenceData::Com(com) => Some(com),
			_ => None,
		}
	}

	pub fn as_package(&self) -> Option<&PackageReference> {
		match &self.data {
			ReferenceData::Package(package) => Some(package),
			_ => None,
		}
	}

	pub fn as_assembly(&self) -> Option<&AssemblyReference> {
		match &self.data {
			ReferenceData::Assembly(assembly) => Some(assembly),
			_ => None,
		}
	}

	pub fn as_project(&self) -> Option<&ProjectReference> {
		match &self.data {
			ReferenceData::Project(project) => Some(project),
			_ => None,
		}
	}

	/// True when `other` is the same kind and has the same kind-specific identity.
	pub fn is_duplicate_of(&self, other: &ReferenceNode) -> bool {
		policy::is_duplicate(self, other)
	}

	/// Writes this node into the build description and resolves it.
	///
	/// Must be called at most once per node; a second call is rejected with
	/// [`ReferenceError::AlreadyBound`]. When the resolve target fails, an item
	/// created by this call is removed again and the node stays unbound.
	pub fn bind_reference_data(&mut self, engine: &mut dyn BuildEngine, config: &ResolverConfig) -> Result<()> {
		if self.state != BindState::Unbound {
			tracing::error!(kind = %self.kind(), caption = %self.caption, state = ?self.state, "bind of a reference that is already bound");
			return Err(ReferenceError::AlreadyBound(self.caption.clone()));
		}
		let variant = self.data.variant();
		variant.check_identity()?;

		tracing::debug!(kind = %variant.kind(), caption = %self.caption, origin = ?self.origin, "reference.bind");
		self.state = BindState::Binding;
		let created = match self.item {
			Some(_) => false,
			None => match variant.create_item(&self.caption, engine, config) {
				Ok(item) => {
					self.item = Some(item);
					true
				}
				Err(err) => {
					self.state = BindState::Unbound;
					return Err(err);
				}
			},
		};

		if let Err(err) = self.run_resolution(engine, config, config.rename_on_bind) {
			if created && let Some(item) = self.item.take() {
				tracing::debug!(%item, caption = %self.caption, "reference.bind rollback");
				if let Err(remove) = engine.remove_item(item) {
					tracing::warn!(%item, error = %remove, "failed to roll back reference item");
				}
			}
			self.state = BindState::Unbound;
			self.resolved_path = None;
			return Err(err);
		}
		Ok(())
	}

	/// Re-resolves a bound node without renaming its item.
	///
	/// Returns whether the node is resolved afterwards. A failing target
	/// leaves the node bound and unresolved.
	pub fn resolve(&mut self, engine: &mut dyn BuildEngine, config: &ResolverConfig) -> Result<bool> {
		if !self.state.is_bound() {
			return Err(ReferenceError::NotBound(self.caption.clone()));
		}
		if let Err(err) = self.run_resolution(engine, config, false) {
			self.state = BindState::BoundUnresolved;
			self.resolved_path = None;
			return Err(err);
		}
		Ok(self.state == BindState::BoundResolved)
	}

	/// Marks a node loaded from the build description as bound, then resolves it.
	///
	/// Failures are logged: a project must load even when a reference can
	/// no longer be resolved.
	pub(crate) fn attach_persisted(&mut self, engine: &mut dyn BuildEngine, config: &ResolverConfig) {
		self.state = BindState::BoundUnresolved;
		if let Err(err) = self.run_resolution(engine, config, false) {
			tracing::warn!(kind = %self.kind(), caption = %self.caption, error = %err, "reference could not be resolved on load");
			self.state = BindState::BoundUnresolved;
			self.resolved_path = None;
		}
	}

	fn run_resolution(&mut self, engine: &mut dyn BuildEngine, config: &ResolverConfig, rename: bool) -> Result<()> {
		let plan = self.data.variant().plan(config);
		let data = &self.data;
		let found = resolve_reference(engine, &plan, |item| data.variant().matches(item))?;

		let Some(found) = found else {
			tracing::debug!(kind = %self.kind(), caption = %self.caption, "reference unresolved");
			self.resolved_path = None;
			self.state = BindState::BoundUnresolved;
			return Ok(());
		};
		if let Some(caption) = self.data.variant_mut().absorb(&found.item) {
			self.caption = caption;
		}
		if rename
			&& plan.renames_item
			&& let Some(item) = self.item
		{
			let stem = paths::file_stem(&found.resolved_path);
			tracing::debug!(%item, include = stem, "reference.rename");
			engine.rename_item(item, stem)?;
		}
		self.resolved_path = Some(found.resolved_path);
		self.state = BindState::BoundResolved;
		Ok(())
	}
}

/// Adds a persisted item and writes its metadata, removing it again if any write fails.
fn write_item(engine: &mut dyn BuildEngine, item_type: &str, include: &str, entries: &[(&str, String)]) -> Result<ItemId> {
	let item = engine.add_item(item_type, include);
	for (key, value) in entries {
		if let Err(err) = engine.set_metadata(item, key, value) {
			let _ = engine.remove_item(item);
			return Err(err.into());
		}
	}
	tracing::trace!(%item, item_type, include, "reference item created");
	Ok(item)
}

fn item_include(engine: &dyn BuildEngine, item: ItemId) -> Result<String> {
	engine.item_include(item).ok_or(ReferenceError::Engine(EngineError::UnknownItem(item)))
}

/// Non-blank metadata value.
fn present(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.trim().is_empty())
}

fn parse_guid(value: &str) -> Result<Uuid> {
	Uuid::parse_str(value.trim()).map_err(|err| ReferenceError::InvalidGuid {
		value: value.to_string(),
		reason: err.to_string(),
	})
}

/// Absent or blank versions are 0; anything else must parse.
fn parse_version(key: &'static str, value: Option<String>) -> Result<u16> {
	match present(value) {
		None => Ok(0),
		Some(text) => text.trim().parse().map_err(|_| ReferenceError::InvalidNumber { key, value: text }),
	}
}

fn parse_locale(value: Option<String>) -> Result<u32> {
	let text = present(value).ok_or(ReferenceError::MissingMetadata(metadata::LCID))?;
	text.trim().parse().map_err(|_| ReferenceError::InvalidNumber { key: metadata::LCID, value: text })
}
