//! Shared fixtures for the reference integration tests.

use std::sync::Arc;

use refgraph_references::catalog::{MemoryCatalog, MemoryTypeLibraryLoader};
use refgraph_references::engine::{MemoryBuildEngine, TargetScript};
use refgraph_references::node::metadata;
use refgraph_references::{ComponentSelection, ComponentType, EvaluatedItem, ProjectState, ResolverConfig, TypeLibAttributes};
use uuid::Uuid;

/// Type library used throughout: GUID `G`, version 1.0, locale 0.
pub const TYPE_LIBRARY: &str = "{0d7a6c3e-5b2f-4e81-9c0a-3f4b5d6e7a81}";

/// Installed path registered for [`TYPE_LIBRARY`].
pub const INSTALLED_PATH: &str = "C:\\Program Files\\Bar\\bar.tlb";

pub fn type_library() -> Uuid {
	Uuid::parse_str(TYPE_LIBRARY).unwrap()
}

pub fn catalog() -> MemoryCatalog {
	let mut catalog = MemoryCatalog::new();
	catalog.register_type_library(type_library(), 1, 0, 0, "Bar Type Library", INSTALLED_PATH);
	catalog
}

pub fn loader() -> MemoryTypeLibraryLoader {
	let mut loader = MemoryTypeLibraryLoader::new();
	loader.insert(
		INSTALLED_PATH,
		TypeLibAttributes {
			guid: type_library(),
			major: 1,
			minor: 0,
			lcid: 0,
		},
	);
	loader
}

pub fn selection(title: &str) -> ComponentSelection {
	ComponentSelection {
		component_type: ComponentType::TypeLibrary,
		title: title.to_string(),
		type_library: type_library(),
		major: 1,
		minor: 0,
		lcid: 0,
	}
}

/// Generated COM wrapper matching [`TYPE_LIBRARY`] 1.0, locale 0.
pub fn com_wrapper(include: &str) -> EvaluatedItem {
	EvaluatedItem::new("ComReferenceWrappers", include)
		.with_metadata(metadata::GUID, TYPE_LIBRARY)
		.with_metadata(metadata::VERSION_MAJOR, "1")
		.with_metadata(metadata::VERSION_MINOR, "0")
		.with_metadata(metadata::LCID, "0")
}

/// Engine whose COM resolve target generates `wrappers`.
pub fn engine(wrappers: Vec<EvaluatedItem>) -> MemoryBuildEngine {
	let mut engine = MemoryBuildEngine::new("C:\\work\\app");
	engine.define_target("ResolveComReferences", TargetScript::succeeding(wrappers));
	engine.define_target("ResolveAssemblyReferences", TargetScript::succeeding(Vec::new()));
	engine.define_target("ResolveProjectReferences", TargetScript::succeeding(Vec::new()));
	engine
}

#[allow(dead_code, reason = "test helper used by individual test files")]
pub fn project(wrappers: Vec<EvaluatedItem>) -> ProjectState {
	ProjectState::new(engine(wrappers), Arc::new(catalog()), ResolverConfig::default()).with_type_library_loader(Arc::new(loader()))
}

/// Installs a test subscriber so logs show up in failing tests.
#[allow(dead_code, reason = "test helper used by individual test files")]
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
