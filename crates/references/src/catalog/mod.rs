//! Installed-component lookup for COM type libraries.
//!
//! The machine-wide registration catalog is hierarchical: a type library is
//! registered at `TYPELIB\{guid}\{major}.{minor}` (versions in lowercase hex),
//! whose default value is the library's display name. Beneath it, the
//! `{lcid}\win32` entry (locale in uppercase hex, no padding) holds the
//! installed file path. The catalog itself is abstract so the concrete store
//! (platform registry, config file, service) can be swapped per target.

use uuid::Uuid;

mod memory;

pub use memory::{MemoryCatalog, MemoryTypeLibraryLoader};

/// Platform marker joined to the locale when descending to the install entry.
pub const PLATFORM_MARKER: &str = "win32";

/// Named value listing a registered primary interop assembly.
pub const PRIMARY_INTEROP_ASSEMBLY_VALUE: &str = "PrimaryInteropAssemblyName";

/// One entry in a hierarchical component catalog.
pub trait CatalogEntry {
	/// The entry's unnamed value.
	fn default_value(&self) -> Option<String>;

	/// A named value on the entry.
	fn value(&self, _name: &str) -> Option<String> {
		None
	}

	/// Opens an entry beneath this one; `path` may span several levels.
	fn open_sub_entry(&self, path: &str) -> Option<Box<dyn CatalogEntry + '_>>;
}

/// Read-only machine-wide component registration catalog.
pub trait ComponentCatalog: Send + Sync {
	fn open_entry(&self, path: &str) -> Option<Box<dyn CatalogEntry + '_>>;
}

/// Attributes read from a type library file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeLibAttributes {
	pub guid: Uuid,
	pub major: u16,
	pub minor: u16,
	pub lcid: u32,
}

/// Reads identity attributes out of a type library file.
pub trait TypeLibraryLoader: Send + Sync {
	/// Loads `path` without registering it. The error is a loader diagnostic.
	fn load(&self, path: &str) -> Result<TypeLibAttributes, String>;
}

/// What the catalog knows about one registered type library.
///
/// Absent fields mean "not installed"; that is an expected state for stale
/// references, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledComponent {
	pub display_name: Option<String>,
	pub installed_path: Option<String>,
	pub primary_interop_assembly: Option<String>,
}

/// Catalog path of a type library version entry.
pub fn type_library_path(guid: Uuid, major: u16, minor: u16) -> String {
	format!("TYPELIB\\{}\\{major:x}.{minor:x}", guid.braced())
}

/// Sub-entry path holding the installed file for one locale.
pub fn locale_install_path(lcid: u32) -> String {
	format!("{lcid:X}\\{PLATFORM_MARKER}")
}

/// Looks up a type library in the catalog.
pub fn lookup_installed(catalog: &dyn ComponentCatalog, guid: Uuid, major: u16, minor: u16, lcid: u32) -> InstalledComponent {
	let path = type_library_path(guid, major, minor);
	let Some(library) = catalog.open_entry(&path) else {
		tracing::debug!(%path, "type library not registered");
		return InstalledComponent::default();
	};
	let installed_path = library.open_sub_entry(&locale_install_path(lcid)).and_then(|install| install.default_value());
	if installed_path.is_none() {
		tracing::debug!(%path, lcid, "type library has no install entry for locale");
	}
	InstalledComponent {
		display_name: library.default_value().filter(|name| !name.is_empty()),
		installed_path: installed_path.filter(|path| !path.is_empty()),
		primary_interop_assembly: library.value(PRIMARY_INTEROP_ASSEMBLY_VALUE).filter(|name| !name.is_empty()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const GUID: &str = "{00020813-0000-0000-c000-000000000046}";

	fn guid() -> Uuid {
		Uuid::parse_str(GUID).unwrap()
	}

	#[test]
	fn paths_use_lowercase_versions_and_uppercase_locale() {
		assert_eq!(type_library_path(guid(), 10, 11), format!("TYPELIB\\{GUID}\\a.b"));
		assert_eq!(locale_install_path(1033), "409\\win32");
		assert_eq!(locale_install_path(0), "0\\win32");
	}

	#[test]
	fn lookup_reads_name_and_path() {
		let mut catalog = MemoryCatalog::new();
		catalog.register_type_library(guid(), 1, 9, 0, "Excel Library", "C:\\Office\\EXCEL.EXE");
		let found = lookup_installed(&catalog, guid(), 1, 9, 0);
		assert_eq!(found.display_name.as_deref(), Some("Excel Library"));
		assert_eq!(found.installed_path.as_deref(), Some("C:\\Office\\EXCEL.EXE"));
		assert_eq!(found.primary_interop_assembly, None);
	}

	#[test]
	fn lookup_miss_is_empty_not_error() {
		let mut catalog = MemoryCatalog::new();
		catalog.register_type_library(guid(), 1, 9, 0, "Excel Library", "C:\\Office\\EXCEL.EXE");
		assert_eq!(lookup_installed(&catalog, guid(), 2, 0, 0), InstalledComponent::default());

		let other_locale = lookup_installed(&catalog, guid(), 1, 9, 1033);
		assert_eq!(other_locale.display_name.as_deref(), Some("Excel Library"));
		assert_eq!(other_locale.installed_path, None);
	}
}
