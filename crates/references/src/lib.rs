//! Project dependency graph kept in sync with an external build engine.
//!
//! A project's references (COM type libraries, packages, assemblies, sibling
//! projects) are modelled as [`ReferenceNode`]s inside a
//! [`ReferenceContainer`]. Binding a node writes its identity into the build
//! description and drives the engine's resolve target; the
//! [resolution driver](resolve) then scans the generated items for the entry
//! that belongs to the node and records its on-disk path.
//!
//! The build engine, the installed-component catalog and the type library
//! loader are external collaborators expressed as traits ([`BuildEngine`],
//! [`ComponentCatalog`], [`TypeLibraryLoader`]); in-memory implementations
//! are provided for hosts without a real engine and for tests.
//!
//! Shared state is owned by one thread. [`ProjectReferences`] is the
//! cloneable, thread-safe entry point that routes every read and write
//! through a [`refgraph_worker::Dispatcher`].

pub mod catalog;
pub mod config;
pub mod container;
pub mod engine;
pub mod enumerator;
pub mod error;
pub mod node;
pub mod output;
mod paths;
pub mod project;
pub mod properties;
pub mod resolve;

pub use catalog::{CatalogEntry, ComponentCatalog, InstalledComponent, TypeLibAttributes, TypeLibraryLoader};
pub use config::ResolverConfig;
pub use container::{BuildDependency, Dependency, ReferenceContainer};
pub use engine::{BuildEngine, EngineError, EvaluatedItem, EvaluationSnapshot, ItemId};
pub use enumerator::{DependencyEnumerator, EnumStatus};
pub use error::{ReferenceError, Result};
pub use node::{BindState, ComponentSelection, ComponentType, NodeId, NodeOrigin, PackageSelection, ReferenceKind, ReferenceNode};
pub use output::{Output, OutputGroup};
pub use project::{ProjectReferences, ProjectState};
pub use properties::{ConfigurationProperties, StartAction};
