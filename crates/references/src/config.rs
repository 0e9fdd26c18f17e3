//! Resolver configuration: build target names and item types.
//!
//! Every field has a default matching the conventional MSBuild names, so a
//! TOML document only needs the keys it overrides:
//!
//! ```toml
//! rename_on_bind = false
//!
//! [targets]
//! package_restore = "Restore"
//!
//! [generated]
//! com_wrappers = "ComReferenceWrappers"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading resolver configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A name that must be non-empty was configured empty.
	#[error("configuration key '{0}' must not be empty")]
	Empty(&'static str),
}

/// Names of build targets the resolver invokes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetNames {
	pub resolve_com_references: String,
	pub resolve_assembly_references: String,
	pub resolve_project_references: String,
	/// Optional restore target run when a package reference is bound.
	pub package_restore: Option<String>,
}

impl Default for TargetNames {
	fn default() -> Self {
		Self {
			resolve_com_references: "ResolveComReferences".to_string(),
			resolve_assembly_references: "ResolveAssemblyReferences".to_string(),
			resolve_project_references: "ResolveProjectReferences".to_string(),
			package_restore: None,
		}
	}
}

/// Item types of persisted (hand-authored) references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistedItemTypes {
	pub com_reference: String,
	pub package_reference: String,
	pub assembly_reference: String,
	pub project_reference: String,
}

impl Default for PersistedItemTypes {
	fn default() -> Self {
		Self {
			com_reference: "COMReference".to_string(),
			package_reference: "PackageReference".to_string(),
			assembly_reference: "Reference".to_string(),
			project_reference: "ProjectReference".to_string(),
		}
	}
}

/// Item types the engine generates while resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratedItemTypes {
	pub com_wrappers: String,
	pub reference_paths: String,
	pub resolved_project_paths: String,
}

impl Default for GeneratedItemTypes {
	fn default() -> Self {
		Self {
			com_wrappers: "ComReferenceWrappers".to_string(),
			reference_paths: "ReferencePath".to_string(),
			resolved_project_paths: "_ResolvedProjectReferencePaths".to_string(),
		}
	}
}

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
	pub targets: TargetNames,
	pub persisted: PersistedItemTypes,
	pub generated: GeneratedItemTypes,
	/// Rename a freshly bound item to the resolved file's base name.
	pub rename_on_bind: bool,
}

impl Default for ResolverConfig {
	fn default() -> Self {
		Self {
			targets: TargetNames::default(),
			persisted: PersistedItemTypes::default(),
			generated: GeneratedItemTypes::default(),
			rename_on_bind: true,
		}
	}
}

impl ResolverConfig {
	/// Parses a TOML document over the defaults.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let config = Self::from_toml_str(&input)?;
		tracing::debug!(path = %path.display(), "resolver config loaded");
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		let required = [
			("targets.resolve_com_references", &self.targets.resolve_com_references),
			("targets.resolve_assembly_references", &self.targets.resolve_assembly_references),
			("targets.resolve_project_references", &self.targets.resolve_project_references),
			("persisted.com_reference", &self.persisted.com_reference),
			("persisted.package_reference", &self.persisted.package_reference),
			("persisted.assembly_reference", &self.persisted.assembly_reference),
			("persisted.project_reference", &self.persisted.project_reference),
			("generated.com_wrappers", &self.generated.com_wrappers),
			("generated.reference_paths", &self.generated.reference_paths),
			("generated.resolved_project_paths", &self.generated.resolved_project_paths),
		];
		for (key, value) in required {
			if value.is_empty() {
				return Err(ConfigError::Empty(key));
			}
		}
		if self.targets.package_restore.as_deref() == Some("") {
			return Err(ConfigError::Empty("targets.package_restore"));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let config = ResolverConfig::from_toml_str("").unwrap();
		assert_eq!(config, ResolverConfig::default());
		assert_eq!(config.targets.resolve_com_references, "ResolveComReferences");
		assert!(config.rename_on_bind);
	}

	#[test]
	fn partial_document_overrides_only_named_keys() {
		let config = ResolverConfig::from_toml_str(
			r#"
rename_on_bind = false

[targets]
package_restore = "Restore"
"#,
		)
		.unwrap();
		assert!(!config.rename_on_bind);
		assert_eq!(config.targets.package_restore.as_deref(), Some("Restore"));
		assert_eq!(config.generated.com_wrappers, "ComReferenceWrappers");
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = ResolverConfig::from_toml_str("[targets]\nbogus = \"x\"\n").unwrap_err();
		assert!(matches!(err, ConfigError::Toml(_)));
	}

	#[test]
	fn empty_names_are_rejected() {
		let err = ResolverConfig::from_toml_str("[generated]\ncom_wrappers = \"\"\n").unwrap_err();
		assert!(matches!(err, ConfigError::Empty("generated.com_wrappers")));
	}

	#[test]
	fn load_reads_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[persisted]\ncom_reference = \"ComRef\"").unwrap();
		let config = ResolverConfig::load(file.path()).unwrap();
		assert_eq!(config.persisted.com_reference, "ComRef");
	}

	#[test]
	fn load_reports_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let err = ResolverConfig::load(dir.path().join("absent.toml")).unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}
}
