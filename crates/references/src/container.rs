//! The project's reference container.
//!
//! Holds every [`ReferenceNode`] of a project, rejects duplicates on add, and
//! hands out immutable dependency snapshots through
//! [`DependencyEnumerator`]s.

use uuid::Uuid;

use crate::catalog::ComponentCatalog;
use crate::config::ResolverConfig;
use crate::engine::BuildEngine;
use crate::enumerator::DependencyEnumerator;
use crate::error::{ReferenceError, Result};
use crate::node::{NodeId, ReferenceKind, ReferenceNode};

/// Snapshot of one reference, handed across enumeration boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
	pub node: NodeId,
	pub kind: ReferenceKind,
	pub caption: String,
	pub resolved_path: Option<String>,
}

/// A project that must be built before this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDependency {
	pub project_guid: Uuid,
	pub caption: String,
	pub must_update_before: bool,
}

#[derive(Debug, Default)]
pub struct ReferenceContainer {
	next_id: u32,
	nodes: Vec<(NodeId, ReferenceNode)>,
}

impl ReferenceContainer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the container's contents with every persisted reference.
	///
	/// Each node is resolved without renaming its item; resolution failures
	/// are logged and leave the node unresolved. A construction failure
	/// aborts the load and leaves the container unchanged.
	pub fn load(&mut self, engine: &mut dyn BuildEngine, catalog: &dyn ComponentCatalog, config: &ResolverConfig) -> Result<usize> {
		let mut loaded = Vec::new();
		for kind in ReferenceKind::ALL {
			for item in engine.items_of_type(kind.persisted_item_type(config)) {
				loaded.push(ReferenceNode::from_persisted_item(kind, engine, catalog, item)?);
			}
		}
		self.nodes.clear();
		for mut node in loaded {
			node.attach_persisted(engine, config);
			self.insert(node);
		}
		tracing::debug!(count = self.nodes.len(), "references.load");
		Ok(self.nodes.len())
	}

	/// First existing node with the same kind-specific identity.
	pub fn find_duplicate(&self, node: &ReferenceNode) -> Option<(NodeId, &ReferenceNode)> {
		self.nodes.iter().find(|(_, existing)| existing.is_duplicate_of(node)).map(|(id, existing)| (*id, existing))
	}

	/// Binds `node` into the build description and adds it.
	pub fn add(&mut self, mut node: ReferenceNode, engine: &mut dyn BuildEngine, config: &ResolverConfig) -> Result<NodeId> {
		if let Some((id, existing)) = self.find_duplicate(&node) {
			tracing::debug!(kind = %node.kind(), caption = node.caption(), existing = %id, "reference already present");
			return Err(ReferenceError::AlreadyExists {
				caption: node.caption().to_string(),
				existing: existing.caption().to_string(),
			});
		}
		node.bind_reference_data(engine, config)?;
		Ok(self.insert(node))
	}

	/// Removes a node along with its persisted item.
	pub fn remove(&mut self, id: NodeId, engine: &mut dyn BuildEngine) -> Result<ReferenceNode> {
		let index = self.nodes.iter().position(|(node_id, _)| *node_id == id).ok_or(ReferenceError::UnknownNode(id))?;
		if let Some(item) = self.nodes[index].1.item() {
			engine.remove_item(item)?;
		}
		let (_, node) = self.nodes.remove(index);
		tracing::debug!(node = %id, caption = node.caption(), "reference removed");
		Ok(node)
	}

	/// Re-resolves every bound node. Returns how many are resolved afterwards.
	pub fn refresh(&mut self, engine: &mut dyn BuildEngine, config: &ResolverConfig) -> usize {
		let mut resolved = 0;
		for (id, node) in self.nodes.iter_mut().filter(|(_, node)| node.state().is_bound()) {
			match node.resolve(engine, config) {
				Ok(true) => resolved += 1,
				Ok(false) => {}
				Err(err) => tracing::warn!(node = %id, caption = node.caption(), error = %err, "reference refresh failed"),
			}
		}
		resolved
	}

	pub fn get(&self, id: NodeId) -> Option<&ReferenceNode> {
		self.nodes.iter().find(|(node_id, _)| *node_id == id).map(|(_, node)| node)
	}

	pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ReferenceNode)> {
		self.nodes.iter().map(|(id, node)| (*id, node))
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn dependencies(&self) -> DependencyEnumerator<Dependency> {
		let snapshot: Vec<_> = self
			.iter()
			.map(|(id, node)| Dependency {
				node: id,
				kind: node.kind(),
				caption: node.caption().to_string(),
				resolved_path: node.resolved_path().map(str::to_string),
			})
			.collect();
		DependencyEnumerator::new(snapshot)
	}

	/// Projects referenced by this one, in container order.
	pub fn build_dependencies(&self) -> DependencyEnumerator<BuildDependency> {
		let snapshot: Vec<_> = self
			.iter()
			.filter_map(|(_, node)| node.as_project().map(|project| (node, project)))
			.map(|(node, project)| BuildDependency {
				project_guid: project.project_guid(),
				caption: node.caption().to_string(),
				must_update_before: true,
			})
			.collect();
		DependencyEnumerator::new(snapshot)
	}

	fn insert(&mut self, node: ReferenceNode) -> NodeId {
		self.next_id += 1;
		let id = NodeId(self.next_id);
		self.nodes.push((id, node));
		id
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::MemoryCatalog;
	use crate::engine::{EvaluatedItem, MemoryBuildEngine, TargetScript};
	use crate::enumerator::EnumStatus;
	use crate::node::{BindState, PackageSelection};

	fn engine() -> MemoryBuildEngine {
		let mut engine = MemoryBuildEngine::new("/proj");
		engine.define_target(
			"ResolveAssemblyReferences",
			TargetScript::succeeding(vec![EvaluatedItem::new("ReferencePath", "/gac/System.Xml.dll").with_metadata("OriginalItemSpec", "System.Xml")]),
		);
		engine.define_target("ResolveProjectReferences", TargetScript::succeeding(Vec::new()));
		engine.define_target("ResolveComReferences", TargetScript::failing());
		engine
	}

	#[test]
	fn load_resolves_persisted_items_and_tolerates_failures() {
		let mut engine = engine();
		engine.seed_item("Reference", "System.Xml", []);
		engine.seed_item("Reference", "Missing.Lib", []);
		engine.seed_item("ProjectReference", "../lib/Lib.csproj", [("Project", "{00000000-0000-0000-0000-000000000042}")]);
		engine.seed_item("COMReference", "Excel", [("Guid", "{00020813-0000-0000-c000-000000000046}"), ("Lcid", "0")]);
		engine.seed_item("PackageReference", "Serilog", [("Version", "3.1.0")]);

		let mut container = ReferenceContainer::new();
		assert_eq!(container.load(&mut engine, &MemoryCatalog::new(), &ResolverConfig::default()).unwrap(), 5);

		let states: Vec<_> = container.iter().map(|(_, node)| (node.caption().to_string(), node.state())).collect();
		assert_eq!(
			states,
			[
				("System.Xml".to_string(), BindState::BoundResolved),
				("Missing.Lib".to_string(), BindState::BoundUnresolved),
				("Lib".to_string(), BindState::BoundUnresolved),
				("Excel".to_string(), BindState::BoundUnresolved),
				("Serilog".to_string(), BindState::BoundUnresolved),
			]
		);
		let (deps, status) = container.build_dependencies().next(4);
		assert_eq!(status, EnumStatus::Exhausted);
		assert_eq!(deps.len(), 1);
		assert_eq!(deps[0].project_guid, Uuid::from_u128(0x42));
		assert!(deps[0].must_update_before);
	}

	#[test]
	fn load_failure_leaves_container_untouched() {
		let mut engine = engine();
		let mut container = ReferenceContainer::new();
		let id = container.add(ReferenceNode::assembly_from_name("System.Xml"), &mut engine, &ResolverConfig::default()).unwrap();
		engine.seed_item("COMReference", "Broken", [("Guid", "garbage"), ("Lcid", "0")]);

		assert!(container.load(&mut engine, &MemoryCatalog::new(), &ResolverConfig::default()).is_err());
		assert_eq!(container.len(), 1);
		assert!(container.get(id).is_some());
	}

	#[test]
	fn add_rejects_duplicates_without_touching_engine() {
		let mut engine = MemoryBuildEngine::new("/proj");
		let config = ResolverConfig::default();
		let mut container = ReferenceContainer::new();
		container.add(ReferenceNode::package_from_selection(&PackageSelection::new("Foo", "1.0")), &mut engine, &config).unwrap();
		container.add(ReferenceNode::package_from_selection(&PackageSelection::new("foo", "1.0")), &mut engine, &config).unwrap();

		let err = container.add(ReferenceNode::package_from_selection(&PackageSelection::new("Foo", "2.0")), &mut engine, &config).unwrap_err();
		assert!(matches!(err, ReferenceError::AlreadyExists { caption, existing } if caption == "Foo" && existing == "Foo"));
		assert_eq!(engine.count_items("PackageReference"), 2);
	}

	#[test]
	fn remove_drops_backing_item() {
		let mut engine = engine();
		let mut container = ReferenceContainer::new();
		let id = container.add(ReferenceNode::assembly_from_name("System.Xml"), &mut engine, &ResolverConfig::default()).unwrap();
		assert_eq!(engine.count_items("Reference"), 1);

		let removed = container.remove(id, &mut engine).unwrap();
		assert_eq!(removed.caption(), "System.Xml");
		assert_eq!(engine.count_items("Reference"), 0);
		assert!(matches!(container.remove(id, &mut engine), Err(ReferenceError::UnknownNode(gone)) if gone == id));
	}

	#[test]
	fn refresh_picks_up_newly_generated_items() {
		let mut engine = MemoryBuildEngine::new("/proj");
		engine.define_target("ResolveAssemblyReferences", TargetScript::succeeding(Vec::new()));
		let config = ResolverConfig::default();
		let mut container = ReferenceContainer::new();
		let id = container.add(ReferenceNode::assembly_from_name("Late"), &mut engine, &config).unwrap();
		assert_eq!(container.refresh(&mut engine, &config), 0);

		engine.define_target(
			"ResolveAssemblyReferences",
			TargetScript::succeeding(vec![EvaluatedItem::new("ReferencePath", "/lib/Late.dll").with_metadata("OriginalItemSpec", "Late")]),
		);
		assert_eq!(container.refresh(&mut engine, &config), 1);
		assert_eq!(container.get(id).unwrap().resolved_path(), Some("/lib/Late.dll"));
	}

	#[test]
	fn dependency_snapshot_is_detached_from_container() {
		let mut engine = engine();
		let config = ResolverConfig::default();
		let mut container = ReferenceContainer::new();
		let first = container.add(ReferenceNode::assembly_from_name("System.Xml"), &mut engine, &config).unwrap();
		let mut deps = container.dependencies();
		container.add(ReferenceNode::package_from_selection(&PackageSelection::new("Serilog", "3.1.0")), &mut engine, &config).unwrap();

		assert_eq!(deps.len(), 1);
		let (fetched, status) = deps.next(1);
		assert_eq!(status, EnumStatus::Success);
		assert_eq!(fetched[0].node, first);
		assert_eq!(fetched[0].resolved_path.as_deref(), Some("/gac/System.Xml.dll"));
		assert_eq!(container.dependencies().len(), 2);
	}
}
