use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use super::{CatalogEntry, ComponentCatalog, PRIMARY_INTEROP_ASSEMBLY_VALUE, TypeLibAttributes, TypeLibraryLoader, locale_install_path, type_library_path};

#[derive(Debug, Clone, Default)]
struct StoredEntry {
	default: Option<String>,
	values: BTreeMap<String, String>,
}

/// In-memory catalog with registry-style case-insensitive paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
	entries: HashMap<String, StoredEntry>,
}

fn normalize(path: &str) -> String {
	path.trim_matches('\\').to_ascii_lowercase()
}

impl MemoryCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates (or updates) the entry at `path` with a default value.
	pub fn insert(&mut self, path: &str, default: Option<&str>) -> &mut Self {
		let entry = self.entries.entry(normalize(path)).or_default();
		if let Some(default) = default {
			entry.default = Some(default.to_string());
		}
		self
	}

	/// Sets a named value on the entry at `path`, creating it if needed.
	pub fn insert_value(&mut self, path: &str, name: &str, value: &str) -> &mut Self {
		self.entries.entry(normalize(path)).or_default().values.insert(name.to_ascii_lowercase(), value.to_string());
		self
	}

	/// Registers a type library the way an installer would.
	pub fn register_type_library(&mut self, guid: Uuid, major: u16, minor: u16, lcid: u32, name: &str, installed_path: &str) -> &mut Self {
		let library = type_library_path(guid, major, minor);
		self.insert(&library, Some(name));
		self.insert(&format!("{library}\\{}", locale_install_path(lcid)), Some(installed_path));
		self
	}

	/// Marks a registered type library as having a primary interop assembly.
	pub fn register_primary_interop_assembly(&mut self, guid: Uuid, major: u16, minor: u16, assembly: &str) -> &mut Self {
		self.insert_value(&type_library_path(guid, major, minor), PRIMARY_INTEROP_ASSEMBLY_VALUE, assembly)
	}
}

struct MemoryEntry<'a> {
	catalog: &'a MemoryCatalog,
	path: String,
}

impl MemoryEntry<'_> {
	fn stored(&self) -> Option<&StoredEntry> {
		self.catalog.entries.get(&self.path)
	}
}

impl CatalogEntry for MemoryEntry<'_> {
	fn default_value(&self) -> Option<String> {
		self.stored()?.default.clone()
	}

	fn value(&self, name: &str) -> Option<String> {
		self.stored()?.values.get(&name.to_ascii_lowercase()).cloned()
	}

	fn open_sub_entry(&self, path: &str) -> Option<Box<dyn CatalogEntry + '_>> {
		let full = format!("{}\\{}", self.path, normalize(path));
		self.catalog.entries.contains_key(&full).then(|| Box::new(MemoryEntry { catalog: self.catalog, path: full }) as Box<dyn CatalogEntry + '_>)
	}
}

impl ComponentCatalog for MemoryCatalog {
	fn open_entry(&self, path: &str) -> Option<Box<dyn CatalogEntry + '_>> {
		let path = normalize(path);
		self.entries.contains_key(&path).then(|| Box::new(MemoryEntry { catalog: self, path }) as Box<dyn CatalogEntry + '_>)
	}
}

/// Type library loader backed by a fixed path table.
#[derive(Debug, Clone, Default)]
pub struct MemoryTypeLibraryLoader {
	libraries: HashMap<String, TypeLibAttributes>,
}

impl MemoryTypeLibraryLoader {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, path: &str, attributes: TypeLibAttributes) -> &mut Self {
		self.libraries.insert(path.to_string(), attributes);
		self
	}
}

impl TypeLibraryLoader for MemoryTypeLibraryLoader {
	fn load(&self, path: &str) -> Result<TypeLibAttributes, String> {
		self.libraries.get(path).copied().ok_or_else(|| format!("no type library at '{path}'"))
	}
}
