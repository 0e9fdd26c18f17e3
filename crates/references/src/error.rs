//! Error types for reference construction, binding and resolution.

use refgraph_worker::DispatchError;
use thiserror::Error;

use crate::engine::EngineError;
use crate::node::{NodeId, ReferenceKind};

/// Errors raised while building, binding or resolving references.
#[derive(Debug, Clone, Error)]
pub enum ReferenceError {
	/// A component selection cannot describe a reference of this kind.
	#[error("invalid component selection: {0}")]
	InvalidSelection(String),

	/// A GUID value could not be parsed.
	#[error("invalid GUID '{value}': {reason}")]
	InvalidGuid {
		/// The offending text.
		value: String,
		/// Parser diagnostic.
		reason: String,
	},

	/// A numeric metadata value could not be parsed.
	#[error("invalid {key} value '{value}'")]
	InvalidNumber {
		/// Metadata key holding the value.
		key: &'static str,
		/// The offending text.
		value: String,
	},

	/// Required metadata is absent from a persisted item.
	#[error("missing required metadata '{0}'")]
	MissingMetadata(&'static str),

	/// A type library file could not be loaded.
	#[error("could not load type library '{path}': {reason}")]
	TypeLibraryLoad {
		/// Path that was loaded.
		path: String,
		/// Loader diagnostic.
		reason: String,
	},

	/// The referenced component is not installed on this machine.
	#[error("reference '{0}' could not be added: component is not installed")]
	NotInstalled(String),

	/// The node is missing identity needed to bind it.
	#[error("{kind} reference cannot be bound without {missing}")]
	Unidentified {
		/// Kind of the node.
		kind: ReferenceKind,
		/// Description of the missing identity.
		missing: &'static str,
	},

	/// The node was already bound.
	#[error("reference '{0}' is already bound")]
	AlreadyBound(String),

	/// The node must be bound before it can be resolved.
	#[error("reference '{0}' is not bound")]
	NotBound(String),

	/// The engine's resolve target reported failure.
	#[error("build target '{0}' failed")]
	ResolutionFailed(String),

	/// An equivalent reference already exists in the container.
	#[error("a reference to '{caption}' already exists as '{existing}'")]
	AlreadyExists {
		/// Caption of the rejected node.
		caption: String,
		/// Caption of the existing node.
		existing: String,
	},

	/// No output group with this name is registered.
	#[error("unknown output group '{0}'")]
	UnknownOutputGroup(String),

	/// No node with this id is in the container.
	#[error("unknown reference node {0}")]
	UnknownNode(NodeId),

	/// A facade call was made while the project state was already borrowed
	/// by an enclosing call on the same thread.
	#[error("project state is already in use by an enclosing call")]
	Reentrant,

	/// The build engine failed outright.
	#[error(transparent)]
	Engine(#[from] EngineError),

	/// Marshaling to the owner context failed.
	#[error(transparent)]
	Dispatch(#[from] DispatchError),
}

/// Result type for reference operations.
pub type Result<T> = std::result::Result<T, ReferenceError>;
