//! Build outputs exposed without engine types.

use crate::engine::{BuildEngine, EvaluatedItem};
use crate::error::{ReferenceError, Result};
use crate::paths;

const FINAL_OUTPUT_PATH: &str = "FinalOutputPath";
const TARGET_PATH: &str = "TargetPath";
const IS_KEY_OUTPUT: &str = "IsKeyOutput";
const DEPLOY_SCHEME: &str = "file:///";

/// A build-produced output item.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
	canonical_name: String,
	item: EvaluatedItem,
}

impl Output {
	/// Wraps `item`, rooting a relative include at `project_folder`.
	pub fn new(project_folder: &str, item: EvaluatedItem) -> Self {
		Self {
			canonical_name: paths::make_absolute(project_folder, item.evaluated_include()),
			item,
		}
	}

	/// Absolute path of the output.
	pub fn canonical_name(&self) -> &str {
		&self.canonical_name
	}

	pub fn display_name(&self) -> &str {
		&self.canonical_name
	}

	/// Named metadata of the output item; empty values count as absent.
	///
	/// `OUTPUTLOC` reads `FinalOutputPath`, and `COM2REG` reports `"true"`
	/// whenever the item carries it.
	pub fn property(&self, name: &str) -> Option<String> {
		let key = if name.eq_ignore_ascii_case("OUTPUTLOC") { FINAL_OUTPUT_PATH } else { name };
		let value = self.item.metadata(key).filter(|value| !value.is_empty())?;
		if name.eq_ignore_ascii_case("COM2REG") { Some("true".to_string()) } else { Some(value.to_string()) }
	}

	/// Path relative to the output root, as reported by `TargetPath`.
	pub fn root_relative_url(&self) -> String {
		self.property(TARGET_PATH).unwrap_or_default()
	}

	/// `file:///` URL of the deployed output.
	///
	/// Reads `FinalOutputPath`, falling back to the canonical name. A path
	/// already carrying the scheme keeps it only when something follows it.
	pub fn deploy_source_url(&self) -> String {
		let path = self.property(FINAL_OUTPUT_PATH).unwrap_or_else(|| self.canonical_name.clone());
		let has_scheme = path.len() > DEPLOY_SCHEME.len() && path.get(..DEPLOY_SCHEME.len()).is_some_and(|scheme| scheme.eq_ignore_ascii_case(DEPLOY_SCHEME));
		if has_scheme { path } else { format!("{DEPLOY_SCHEME}{path}") }
	}

	pub fn is_key_output(&self) -> bool {
		self.item.metadata_eq_ignore_case(IS_KEY_OUTPUT, "true")
	}
}

/// Named group of outputs produced by one build target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputGroup {
	name: String,
	target_name: String,
	outputs: Vec<Output>,
	key_output: Option<usize>,
}

impl OutputGroup {
	pub fn new(name: impl Into<String>, target_name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			target_name: target_name.into(),
			outputs: Vec::new(),
			key_output: None,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn target_name(&self) -> &str {
		&self.target_name
	}

	/// Runs the group's target when the engine defines it and collects its
	/// `<target>Output` items.
	///
	/// The key output is the last item flagged `IsKeyOutput`, or the first
	/// output when none is flagged. A failing target empties the group.
	pub fn refresh(&mut self, engine: &mut dyn BuildEngine) -> Result<()> {
		self.outputs.clear();
		self.key_output = None;
		if engine.has_target(&self.target_name) && !engine.evaluate_target(&self.target_name)? {
			tracing::debug!(group = %self.name, target = %self.target_name, "output group target failed");
			return Err(ReferenceError::ResolutionFailed(self.target_name.clone()));
		}

		let item_type = format!("{}Output", self.target_name);
		let snapshot = engine.create_snapshot()?;
		for item in snapshot.items_of_type(&item_type) {
			let output = Output::new(engine.project_folder(), item.clone());
			if self.key_output.is_none() || output.is_key_output() {
				self.key_output = Some(self.outputs.len());
			}
			self.outputs.push(output);
		}
		tracing::debug!(group = %self.name, count = self.outputs.len(), "output group refreshed");
		Ok(())
	}

	pub fn outputs(&self) -> &[Output] {
		&self.outputs
	}

	pub fn key_output(&self) -> Option<&Output> {
		self.outputs.get(self.key_output?)
	}
}
