//! Resolution driver.
//!
//! Runs a kind's resolve target on the build engine, then takes a fresh
//! evaluation snapshot and scans the generated items of the kind's wrapper
//! type for the first entry matching the node's identity. The whole list is
//! rescanned on every resolution; nothing is indexed between calls, so rapid
//! successive additions always see the engine's latest output.

use crate::engine::{BuildEngine, EvaluatedItem};
use crate::error::{ReferenceError, Result};
use crate::paths;

/// What resolving one reference kind involves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionPlan<'a> {
	/// Target to run first; `None` skips straight to the scan.
	pub target: Option<&'a str>,
	/// Generated item type to scan; `None` means resolution is declarative only.
	pub generated_item_type: Option<&'a str>,
	/// Whether a first bind renames the backing item to the resolved file's stem.
	pub renames_item: bool,
}

/// A generated item matched to a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
	/// The matched item's include, made absolute against the project folder.
	pub resolved_path: String,
	pub item: EvaluatedItem,
}

/// Runs `plan` and returns the first generated item accepted by `matches`.
///
/// A failing target is an error. Finding no match is not: it yields `None`.
pub fn resolve_reference(engine: &mut dyn BuildEngine, plan: &ResolutionPlan<'_>, matches: impl Fn(&EvaluatedItem) -> bool) -> Result<Option<Resolution>> {
	if let Some(target) = plan.target {
		tracing::debug!(target, "resolve.target");
		if !engine.evaluate_target(target)? {
			tracing::debug!(target, "resolve.target failed");
			return Err(ReferenceError::ResolutionFailed(target.to_string()));
		}
	}
	let Some(item_type) = plan.generated_item_type else {
		return Ok(None);
	};

	let snapshot = engine.create_snapshot()?;
	let Some(item) = snapshot.items_of_type(item_type).find(|item| matches(item)) else {
		tracing::debug!(item_type, scanned = snapshot.items_of_type(item_type).count(), "resolve.miss");
		return Ok(None);
	};
	let resolved_path = paths::make_absolute(engine.project_folder(), item.evaluated_include());
	tracing::debug!(item_type, path = %resolved_path, "resolve.hit");
	Ok(Some(Resolution {
		resolved_path,
		item: item.clone(),
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::{MemoryBuildEngine, TargetScript};

	fn plan() -> ResolutionPlan<'static> {
		ResolutionPlan {
			target: Some("Resolve"),
			generated_item_type: Some("Wrapper"),
			renames_item: false,
		}
	}

	#[test]
	fn first_match_wins_and_relative_paths_are_rooted() {
		let mut engine = MemoryBuildEngine::new("C:\\proj");
		engine.define_target(
			"Resolve",
			TargetScript::succeeding(vec![
				EvaluatedItem::new("Wrapper", "obj\\first.dll").with_metadata("Key", "x"),
				EvaluatedItem::new("Wrapper", "obj\\second.dll").with_metadata("Key", "x"),
			]),
		);
		let found = resolve_reference(&mut engine, &plan(), |item| item.metadata("Key") == Some("x")).unwrap().unwrap();
		assert_eq!(found.resolved_path, "C:\\proj\\obj\\first.dll");
	}

	#[test]
	fn failing_target_is_an_error() {
		let mut engine = MemoryBuildEngine::new("/proj");
		engine.define_target("Resolve", TargetScript::failing());
		let err = resolve_reference(&mut engine, &plan(), |_| true).unwrap_err();
		assert!(matches!(err, ReferenceError::ResolutionFailed(target) if target == "Resolve"));
	}

	#[test]
	fn no_match_is_not_an_error() {
		let mut engine = MemoryBuildEngine::new("/proj");
		engine.define_target("Resolve", TargetScript::succeeding(vec![EvaluatedItem::new("Other", "a.dll")]));
		assert_eq!(resolve_reference(&mut engine, &plan(), |_| true).unwrap(), None);
	}

	#[test]
	fn declarative_plan_skips_scan() {
		let mut engine = MemoryBuildEngine::new("/proj");
		let declarative = ResolutionPlan {
			target: None,
			generated_item_type: None,
			renames_item: false,
		};
		assert_eq!(resolve_reference(&mut engine, &declarative, |_| true).unwrap(), None);
		assert!(engine.invocations().is_empty());
	}
}
