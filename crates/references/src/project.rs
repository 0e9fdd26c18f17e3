//! Project-level reference state and its thread-safe facade.
//!
//! [`ProjectState`] owns everything a project's references touch: the build
//! engine, the component catalog, the reference container, per-configuration
//! properties and output groups. It is only ever touched on the owner
//! context. [`ProjectReferences`] is the handle other threads hold; every
//! method marshals onto the owner with [`Dispatcher::send_sync`] and blocks
//! until it has run.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use refgraph_worker::Dispatcher;
use uuid::Uuid;

use crate::catalog::{ComponentCatalog, TypeLibraryLoader};
use crate::config::ResolverConfig;
use crate::container::{BuildDependency, Dependency, ReferenceContainer};
use crate::engine::BuildEngine;
use crate::enumerator::DependencyEnumerator;
use crate::error::{ReferenceError, Result};
use crate::node::{BindState, ComponentSelection, NodeId, PackageSelection, ReferenceNode};
use crate::output::{Output, OutputGroup};
use crate::properties::{ConfigurationProperties, StartAction};

/// All reference state of one project.
pub struct ProjectState {
	engine: Box<dyn BuildEngine>,
	catalog: Arc<dyn ComponentCatalog>,
	loader: Option<Arc<dyn TypeLibraryLoader>>,
	config: ResolverConfig,
	references: ReferenceContainer,
	configurations: HashMap<String, ConfigurationProperties>,
	output_groups: Vec<OutputGroup>,
}

impl std::fmt::Debug for ProjectState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProjectState")
			.field("project_folder", &self.engine.project_folder())
			.field("references", &self.references.len())
			.field("configurations", &self.configurations.len())
			.field("output_groups", &self.output_groups.len())
			.finish_non_exhaustive()
	}
}

impl ProjectState {
	pub fn new(engine: impl BuildEngine + 'static, catalog: Arc<dyn ComponentCatalog>, config: ResolverConfig) -> Self {
		Self {
			engine: Box::new(engine),
			catalog,
			loader: None,
			config,
			references: ReferenceContainer::new(),
			configurations: HashMap::new(),
			output_groups: Vec::new(),
		}
	}

	/// Enables adding COM references from type library files.
	pub fn with_type_library_loader(mut self, loader: Arc<dyn TypeLibraryLoader>) -> Self {
		self.loader = Some(loader);
		self
	}

	/// Registers an output group built by `target_name`.
	pub fn with_output_group(mut self, name: impl Into<String>, target_name: impl Into<String>) -> Self {
		self.output_groups.push(OutputGroup::new(name, target_name));
		self
	}

	pub fn engine(&self) -> &dyn BuildEngine {
		self.engine.as_ref()
	}

	pub fn engine_mut(&mut self) -> &mut dyn BuildEngine {
		self.engine.as_mut()
	}

	/// The engine as its concrete type, for engine-specific calls.
	pub fn engine_as_mut<E: BuildEngine>(&mut self) -> Option<&mut E> {
		let engine: &mut dyn Any = self.engine.as_mut();
		engine.downcast_mut()
	}

	pub fn config(&self) -> &ResolverConfig {
		&self.config
	}

	pub fn references(&self) -> &ReferenceContainer {
		&self.references
	}

	pub fn load_references(&mut self) -> Result<usize> {
		self.references.load(self.engine.as_mut(), self.catalog.as_ref(), &self.config)
	}

	/// Adds an already constructed node, binding it into the build description.
	pub fn add_reference(&mut self, node: ReferenceNode) -> Result<NodeId> {
		let id = self.references.add(node, self.engine.as_mut(), &self.config)?;
		tracing::debug!(node = %id, "reference added");
		Ok(id)
	}

	pub fn add_com_selection(&mut self, selection: &ComponentSelection) -> Result<NodeId> {
		let node = ReferenceNode::com_from_selection(self.catalog.as_ref(), selection)?;
		self.add_reference(node)
	}

	pub fn add_com_file(&mut self, path: &str) -> Result<NodeId> {
		let Some(loader) = self.loader.as_deref() else {
			return Err(ReferenceError::TypeLibraryLoad {
				path: path.to_string(),
				reason: "no type library loader configured".to_string(),
			});
		};
		let node = ReferenceNode::com_from_file(self.catalog.as_ref(), loader, path)?;
		self.add_reference(node)
	}

	pub fn add_package(&mut self, selection: &PackageSelection) -> Result<NodeId> {
		self.add_reference(ReferenceNode::package_from_selection(selection))
	}

	pub fn add_assembly_file(&mut self, path: &str) -> Result<NodeId> {
		let node = ReferenceNode::assembly_from_path(self.engine.project_folder(), path);
		self.add_reference(node)
	}

	pub fn add_assembly_name(&mut self, name: &str) -> Result<NodeId> {
		self.add_reference(ReferenceNode::assembly_from_name(name))
	}

	pub fn add_project_reference(&mut self, path: &str, project_guid: Uuid, name: Option<&str>) -> Result<NodeId> {
		let node = ReferenceNode::project_from_path(self.engine.project_folder(), path, project_guid, name);
		self.add_reference(node)
	}

	pub fn remove_reference(&mut self, id: NodeId) -> Result<ReferenceNode> {
		self.references.remove(id, self.engine.as_mut())
	}

	pub fn refresh_references(&mut self) -> usize {
		self.references.refresh(self.engine.as_mut(), &self.config)
	}

	pub fn node(&self, id: NodeId) -> Result<&ReferenceNode> {
		self.references.get(id).ok_or(ReferenceError::UnknownNode(id))
	}

	pub fn configuration_property(&mut self, configuration: &str, name: &str) -> Option<String> {
		properties(&mut self.configurations, configuration).get(self.engine.as_ref(), name)
	}

	pub fn set_configuration_property(&mut self, configuration: &str, name: &str, value: &str) {
		properties(&mut self.configurations, configuration).set(self.engine.as_mut(), name, value);
	}

	pub fn start_action(&mut self, configuration: &str) -> StartAction {
		StartAction::from_property(self.configuration_property(configuration, "StartAction").as_deref())
	}

	pub fn set_start_action(&mut self, configuration: &str, action: StartAction) {
		self.set_configuration_property(configuration, "StartAction", action.as_str());
	}

	/// Refreshes the named output group and returns its outputs.
	pub fn outputs(&mut self, name: &str) -> Result<Vec<Output>> {
		let group = self.output_group(name)?;
		Ok(group.outputs().to_vec())
	}

	/// Refreshes the named output group and returns its key output.
	pub fn key_output(&mut self, name: &str) -> Result<Option<Output>> {
		let group = self.output_group(name)?;
		Ok(group.key_output().cloned())
	}

	fn output_group(&mut self, name: &str) -> Result<&OutputGroup> {
		let group = self
			.output_groups
			.iter_mut()
			.find(|group| group.name() == name)
			.ok_or_else(|| ReferenceError::UnknownOutputGroup(name.to_string()))?;
		group.refresh(self.engine.as_mut())?;
		Ok(group)
	}
}

fn properties<'a>(configurations: &'a mut HashMap<String, ConfigurationProperties>, configuration: &str) -> &'a mut ConfigurationProperties {
	configurations.entry(configuration.to_string()).or_insert_with(|| ConfigurationProperties::new(configuration))
}

/// Reentrant so a nested call on the owning thread reaches the borrow check
/// instead of blocking on itself.
type SharedState = ReentrantMutex<RefCell<ProjectState>>;

/// Cloneable, thread-safe handle to a project's references.
///
/// Closures passed to [`Self::with_state`] run with the state borrowed; a
/// facade call made from inside one fails with [`ReferenceError::Reentrant`].
#[derive(Clone)]
pub struct ProjectReferences {
	dispatcher: Dispatcher,
	state: Arc<SharedState>,
}

impl std::fmt::Debug for ProjectReferences {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProjectReferences").field("dispatcher", &self.dispatcher).finish_non_exhaustive()
	}
}

impl ProjectReferences {
	pub fn new(dispatcher: Dispatcher, state: ProjectState) -> Self {
		Self {
			dispatcher,
			state: Arc::new(ReentrantMutex::new(RefCell::new(state))),
		}
	}

	pub fn dispatcher(&self) -> &Dispatcher {
		&self.dispatcher
	}

	/// Runs `work` against the state on the owner context and waits for it.
	pub fn with_state<R, F>(&self, work: F) -> Result<R>
	where
		F: FnOnce(&mut ProjectState) -> R + Send + 'static,
		R: Send + 'static,
	{
		let state = Arc::clone(&self.state);
		let dispatcher = self.dispatcher.clone();
		self.dispatcher.send_sync(move || -> Result<R> {
			dispatcher.assert_on_owner_context();
			let guard = state.lock();
			let mut borrowed = guard.try_borrow_mut().map_err(|_| ReferenceError::Reentrant)?;
			Ok(work(&mut borrowed))
		})?
	}

	fn try_with_state<R, F>(&self, work: F) -> Result<R>
	where
		F: FnOnce(&mut ProjectState) -> Result<R> + Send + 'static,
		R: Send + 'static,
	{
		self.with_state(work)?
	}

	pub fn load(&self) -> Result<usize> {
		self.try_with_state(ProjectState::load_references)
	}

	pub fn add_com_selection(&self, selection: ComponentSelection) -> Result<NodeId> {
		self.try_with_state(move |state| state.add_com_selection(&selection))
	}

	pub fn add_com_file(&self, path: impl Into<String>) -> Result<NodeId> {
		let path = path.into();
		self.try_with_state(move |state| state.add_com_file(&path))
	}

	pub fn add_package(&self, selection: PackageSelection) -> Result<NodeId> {
		self.try_with_state(move |state| state.add_package(&selection))
	}

	pub fn add_assembly_file(&self, path: impl Into<String>) -> Result<NodeId> {
		let path = path.into();
		self.try_with_state(move |state| state.add_assembly_file(&path))
	}

	pub fn add_assembly_name(&self, name: impl Into<String>) -> Result<NodeId> {
		let name = name.into();
		self.try_with_state(move |state| state.add_assembly_name(&name))
	}

	pub fn add_project_reference(&self, path: impl Into<String>, project_guid: Uuid, name: Option<String>) -> Result<NodeId> {
		let path = path.into();
		self.try_with_state(move |state| state.add_project_reference(&path, project_guid, name.as_deref()))
	}

	pub fn remove(&self, id: NodeId) -> Result<()> {
		self.try_with_state(move |state| state.remove_reference(id).map(drop))
	}

	/// Re-resolves every bound reference and waits for the result.
	pub fn refresh(&self) -> Result<usize> {
		self.with_state(ProjectState::refresh_references)
	}

	/// Queues a refresh on the owner context without waiting for it.
	pub fn post_refresh(&self) {
		let state = Arc::clone(&self.state);
		self.dispatcher.post(move || {
			let guard = state.lock();
			let Ok(mut borrowed) = guard.try_borrow_mut() else {
				tracing::warn!("posted reference refresh skipped: state already borrowed");
				return;
			};
			let resolved = borrowed.refresh_references();
			tracing::debug!(resolved, "posted reference refresh done");
		});
	}

	pub fn caption(&self, id: NodeId) -> Result<String> {
		self.try_with_state(move |state| Ok(state.node(id)?.caption().to_string()))
	}

	pub fn resolved_path(&self, id: NodeId) -> Result<Option<String>> {
		self.try_with_state(move |state| Ok(state.node(id)?.resolved_path().map(str::to_string)))
	}

	pub fn bind_state(&self, id: NodeId) -> Result<BindState> {
		self.try_with_state(move |state| Ok(state.node(id)?.state()))
	}

	/// Snapshot of every reference; safe to hand to any thread.
	pub fn dependencies(&self) -> Result<DependencyEnumerator<Dependency>> {
		self.with_state(|state| state.references().dependencies())
	}

	pub fn build_dependencies(&self) -> Result<DependencyEnumerator<BuildDependency>> {
		self.with_state(|state| state.references().build_dependencies())
	}

	pub fn configuration_property(&self, configuration: impl Into<String>, name: impl Into<String>) -> Result<Option<String>> {
		let (configuration, name) = (configuration.into(), name.into());
		self.with_state(move |state| state.configuration_property(&configuration, &name))
	}

	pub fn set_configuration_property(&self, configuration: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
		let (configuration, name, value) = (configuration.into(), name.into(), value.into());
		self.with_state(move |state| state.set_configuration_property(&configuration, &name, &value))
	}

	pub fn start_action(&self, configuration: impl Into<String>) -> Result<StartAction> {
		let configuration = configuration.into();
		self.with_state(move |state| state.start_action(&configuration))
	}

	pub fn set_start_action(&self, configuration: impl Into<String>, action: StartAction) -> Result<()> {
		let configuration = configuration.into();
		self.with_state(move |state| state.set_start_action(&configuration, action))
	}

	pub fn outputs(&self, group: impl Into<String>) -> Result<Vec<Output>> {
		let group = group.into();
		self.try_with_state(move |state| state.outputs(&group))
	}

	pub fn key_output(&self, group: impl Into<String>) -> Result<Option<Output>> {
		let group = group.into();
		self.try_with_state(move |state| state.key_output(&group))
	}
}
