use std::collections::{BTreeMap, HashMap};

use super::{BuildEngine, EngineError, EvaluatedItem, EvaluationSnapshot, ItemId};

/// Scripted behavior of one target in a [`MemoryBuildEngine`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetScript {
	/// Whether running the target succeeds.
	pub succeeds: bool,
	/// Items the target contributes to later snapshots once it has succeeded.
	pub generates: Vec<EvaluatedItem>,
}

impl TargetScript {
	pub fn succeeding(generates: Vec<EvaluatedItem>) -> Self {
		Self { succeeds: true, generates }
	}

	pub fn failing() -> Self {
		Self::default()
	}
}

#[derive(Debug, Clone)]
struct StoredItem {
	item_type: String,
	include: String,
	metadata: BTreeMap<String, String>,
}

/// In-memory build description with scripted targets.
///
/// Snapshots contain every persisted item followed by the generated items of
/// each target that has succeeded, in the order the targets first ran.
#[derive(Debug, Clone, Default)]
pub struct MemoryBuildEngine {
	project_folder: String,
	next_id: u64,
	items: BTreeMap<ItemId, StoredItem>,
	targets: HashMap<String, TargetScript>,
	built: Vec<String>,
	invocations: Vec<String>,
	properties: HashMap<(String, String), String>,
}

impl MemoryBuildEngine {
	pub fn new(project_folder: impl Into<String>) -> Self {
		Self {
			project_folder: project_folder.into(),
			..Self::default()
		}
	}

	/// Defines or replaces a target.
	pub fn define_target(&mut self, name: impl Into<String>, script: TargetScript) -> &mut Self {
		self.targets.insert(name.into(), script);
		self
	}

	/// Adds a persisted item with metadata in one call.
	pub fn seed_item<'a>(&mut self, item_type: &str, include: &str, metadata: impl IntoIterator<Item = (&'a str, &'a str)>) -> ItemId {
		let id = self.add_item(item_type, include);
		if let Some(item) = self.items.get_mut(&id) {
			item.metadata.extend(metadata.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
		}
		id
	}

	/// Every target invocation so far, in order.
	pub fn invocations(&self) -> &[String] {
		&self.invocations
	}

	/// Number of persisted items of one type.
	pub fn count_items(&self, item_type: &str) -> usize {
		self.items.values().filter(|item| item.item_type == item_type).count()
	}
}

impl BuildEngine for MemoryBuildEngine {
	fn project_folder(&self) -> &str {
		&self.project_folder
	}

	fn has_target(&self, target: &str) -> bool {
		self.targets.contains_key(target)
	}

	fn evaluate_target(&mut self, target: &str) -> Result<bool, EngineError> {
		self.invocations.push(target.to_string());
		let script = self.targets.get(target).ok_or_else(|| EngineError::UnknownTarget(target.to_string()))?;
		if script.succeeds && !self.built.iter().any(|built| built == target) {
			self.built.push(target.to_string());
		}
		Ok(script.succeeds)
	}

	fn create_snapshot(&self) -> Result<EvaluationSnapshot, EngineError> {
		let persisted = self.items.values().map(|item| EvaluatedItem {
			item_type: item.item_type.clone(),
			evaluated_include: item.include.clone(),
			metadata: item.metadata.clone(),
		});
		let generated = self
			.built
			.iter()
			.filter_map(|target| self.targets.get(target))
			.filter(|script| script.succeeds)
			.flat_map(|script| script.generates.iter().cloned());
		Ok(EvaluationSnapshot::new(persisted.chain(generated).collect()))
	}

	fn items_of_type(&self, item_type: &str) -> Vec<ItemId> {
		self.items.iter().filter(|(_, item)| item.item_type == item_type).map(|(id, _)| *id).collect()
	}

	fn add_item(&mut self, item_type: &str, include: &str) -> ItemId {
		self.next_id += 1;
		let id = ItemId(self.next_id);
		self.items.insert(
			id,
			StoredItem {
				item_type: item_type.to_string(),
				include: include.to_string(),
				metadata: BTreeMap::new(),
			},
		);
		id
	}

	fn remove_item(&mut self, item: ItemId) -> Result<(), EngineError> {
		self.items.remove(&item).map(|_| ()).ok_or(EngineError::UnknownItem(item))
	}

	fn item_include(&self, item: ItemId) -> Option<String> {
		self.items.get(&item).map(|stored| stored.include.clone())
	}

	fn rename_item(&mut self, item: ItemId, include: &str) -> Result<(), EngineError> {
		let stored = self.items.get_mut(&item).ok_or(EngineError::UnknownItem(item))?;
		stored.include = include.to_string();
		Ok(())
	}

	fn metadata(&self, item: ItemId, key: &str) -> Option<String> {
		self.items.get(&item)?.metadata.get(key).cloned()
	}

	fn set_metadata(&mut self, item: ItemId, key: &str, value: &str) -> Result<(), EngineError> {
		let stored = self.items.get_mut(&item).ok_or(EngineError::UnknownItem(item))?;
		stored.metadata.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn property(&self, configuration: &str, name: &str) -> Option<String> {
		self.properties.get(&(configuration.to_string(), name.to_string())).cloned()
	}

	fn set_property(&mut self, configuration: &str, name: &str, value: &str) {
		self.properties.insert((configuration.to_string(), name.to_string()), value.to_string());
	}
}
