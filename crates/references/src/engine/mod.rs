//! Surface of the external build engine.
//!
//! The engine owns the authoritative build description. This crate only ever
//! asks it to run a named target, take an evaluation snapshot, and read or
//! write persisted items and their metadata.

use std::any::Any;
use std::collections::BTreeMap;

use thiserror::Error;

mod memory;

pub use memory::{MemoryBuildEngine, TargetScript};

/// Opaque handle to a persisted item in the build description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

impl std::fmt::Display for ItemId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "item#{}", self.0)
	}
}

/// Failures raised by the build engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
	/// The build description defines no target with this name.
	#[error("unknown build target '{0}'")]
	UnknownTarget(String),
	/// The item handle no longer refers to a persisted item.
	#[error("unknown build item {0}")]
	UnknownItem(ItemId),
	/// Any other engine failure.
	#[error("build engine failure: {0}")]
	Failed(String),
}

/// Read-only view of one item in an evaluation snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedItem {
	item_type: String,
	evaluated_include: String,
	metadata: BTreeMap<String, String>,
}

impl EvaluatedItem {
	pub fn new(item_type: impl Into<String>, evaluated_include: impl Into<String>) -> Self {
		Self {
			item_type: item_type.into(),
			evaluated_include: evaluated_include.into(),
			metadata: BTreeMap::new(),
		}
	}

	/// Builder-style metadata insertion.
	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	pub fn item_type(&self) -> &str {
		&self.item_type
	}

	pub fn evaluated_include(&self) -> &str {
		&self.evaluated_include
	}

	/// Returns a metadata value, or `None` when absent.
	pub fn metadata(&self, key: &str) -> Option<&str> {
		self.metadata.get(key).map(String::as_str)
	}

	/// Case-insensitive metadata comparison, treating absent as empty.
	pub fn metadata_eq_ignore_case(&self, key: &str, expected: &str) -> bool {
		self.metadata(key).unwrap_or_default().eq_ignore_ascii_case(expected)
	}
}

/// A fresh, immutable evaluation of the build description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationSnapshot {
	items: Vec<EvaluatedItem>,
}

impl EvaluationSnapshot {
	pub fn new(items: Vec<EvaluatedItem>) -> Self {
		Self { items }
	}

	/// Items of one type, in evaluation order.
	pub fn items_of_type<'a>(&'a self, item_type: &'a str) -> impl Iterator<Item = &'a EvaluatedItem> + 'a {
		self.items.iter().filter(move |item| item.item_type == item_type)
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}

/// The external build engine holding the project's build description.
///
/// Implementations are owned by the owner context; nothing here is called
/// concurrently.
pub trait BuildEngine: Any + Send {
	/// Folder that relative item includes are resolved against.
	fn project_folder(&self) -> &str;

	/// Returns true when the build description defines `target`.
	fn has_target(&self, target: &str) -> bool;

	/// Runs `target` synchronously. `Ok(false)` means the target ran and failed.
	fn evaluate_target(&mut self, target: &str) -> Result<bool, EngineError>;

	/// Evaluates the build description, including items generated by targets run so far.
	fn create_snapshot(&self) -> Result<EvaluationSnapshot, EngineError>;

	/// Persisted items of one type, in document order.
	fn items_of_type(&self, item_type: &str) -> Vec<ItemId>;

	/// Appends a persisted item.
	fn add_item(&mut self, item_type: &str, include: &str) -> ItemId;

	/// Deletes a persisted item.
	fn remove_item(&mut self, item: ItemId) -> Result<(), EngineError>;

	fn item_include(&self, item: ItemId) -> Option<String>;

	/// Changes the include of a persisted item.
	fn rename_item(&mut self, item: ItemId, include: &str) -> Result<(), EngineError>;

	fn metadata(&self, item: ItemId, key: &str) -> Option<String>;

	fn set_metadata(&mut self, item: ItemId, key: &str, value: &str) -> Result<(), EngineError>;

	/// Reads a property under one configuration (e.g. `Debug|AnyCPU`).
	fn property(&self, configuration: &str, name: &str) -> Option<String>;

	fn set_property(&mut self, configuration: &str, name: &str, value: &str);
}
