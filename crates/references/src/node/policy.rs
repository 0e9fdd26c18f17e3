//! Per-kind duplicate identity.
//!
//! Each kind decides for itself how strong its identity is: COM compares the
//! type library GUID exactly and the caption case-insensitively, packages
//! compare names case-sensitively, assemblies compare simple names ordinally
//! and projects compare project GUIDs. Nodes of different kinds are never
//! duplicates.

use super::{ReferenceKind, ReferenceNode};

/// Identity comparison between two nodes of the same kind.
pub type IdentityEq = fn(&ReferenceNode, &ReferenceNode) -> bool;

/// Duplicate detection policy for one reference kind.
#[derive(Clone, Copy)]
pub struct DuplicatePolicy {
	pub kind: ReferenceKind,
	/// Human-readable description of the compared identity.
	pub identity: &'static str,
	pub same_identity: IdentityEq,
}

impl std::fmt::Debug for DuplicatePolicy {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DuplicatePolicy").field("kind", &self.kind).field("identity", &self.identity).finish_non_exhaustive()
	}
}

static COM: DuplicatePolicy = DuplicatePolicy {
	kind: ReferenceKind::Com,
	identity: "type library GUID and caption (case-insensitive)",
	same_identity: same_com,
};

static PACKAGE: DuplicatePolicy = DuplicatePolicy {
	kind: ReferenceKind::Package,
	identity: "package name (case-sensitive)",
	same_identity: same_package,
};

static ASSEMBLY: DuplicatePolicy = DuplicatePolicy {
	kind: ReferenceKind::Assembly,
	identity: "assembly simple name (ordinal)",
	same_identity: same_assembly,
};

static PROJECT: DuplicatePolicy = DuplicatePolicy {
	kind: ReferenceKind::Project,
	identity: "project GUID",
	same_identity: same_project,
};

/// Every kind's policy.
pub static DUPLICATE_POLICIES: [&DuplicatePolicy; 4] = [&COM, &PACKAGE, &ASSEMBLY, &PROJECT];

impl ReferenceKind {
	pub fn duplicate_policy(self) -> &'static DuplicatePolicy {
		match self {
			Self::Com => &COM,
			Self::Package => &PACKAGE,
			Self::Assembly => &ASSEMBLY,
			Self::Project => &PROJECT,
		}
	}
}

/// Same kind and same kind-specific identity.
pub fn is_duplicate(a: &ReferenceNode, b: &ReferenceNode) -> bool {
	let kind = a.kind();
	kind == b.kind() && (kind.duplicate_policy().same_identity)(a, b)
}

fn same_com(a: &ReferenceNode, b: &ReferenceNode) -> bool {
	match (a.as_com(), b.as_com()) {
		(Some(x), Some(y)) => x.type_guid() == y.type_guid() && eq_ignore_case(a.caption(), b.caption()),
		_ => false,
	}
}

fn same_package(a: &ReferenceNode, b: &ReferenceNode) -> bool {
	match (a.as_package(), b.as_package()) {
		(Some(x), Some(y)) => x.name() == y.name(),
		_ => false,
	}
}

fn same_assembly(a: &ReferenceNode, b: &ReferenceNode) -> bool {
	match (a.as_assembly(), b.as_assembly()) {
		(Some(x), Some(y)) => x.simple_name() == y.simple_name(),
		_ => false,
	}
}

fn same_project(a: &ReferenceNode, b: &ReferenceNode) -> bool {
	match (a.as_project(), b.as_project()) {
		(Some(x), Some(y)) => x.project_guid() == y.project_guid(),
		_ => false,
	}
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
	a.chars().flat_map(char::to_lowercase).eq(b.chars().flat_map(char::to_lowercase))
}
