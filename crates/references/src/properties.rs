//! Per-configuration build properties.

use std::collections::HashMap;

use crate::engine::BuildEngine;

const START_ACTION: &str = "StartAction";

/// What debugging a project launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartAction {
	/// The project's own output.
	#[default]
	Project,
	/// An external program.
	Program,
	/// A URL.
	Url,
}

impl StartAction {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Project => "Project",
			Self::Program => "Program",
			Self::Url => "URL",
		}
	}

	/// Anything other than `Program` or `URL` reads as `Project`.
	pub fn from_property(value: Option<&str>) -> Self {
		match value {
			Some("Program") => Self::Program,
			Some("URL") => Self::Url,
			_ => Self::Project,
		}
	}
}

/// Cached view of one configuration's properties (e.g. `Debug|AnyCPU`).
///
/// Reads are cached per name; any write drops the whole cache, since one
/// property can feed the evaluation of others.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationProperties {
	configuration: String,
	cache: HashMap<String, Option<String>>,
}

impl ConfigurationProperties {
	pub fn new(configuration: impl Into<String>) -> Self {
		Self {
			configuration: configuration.into(),
			cache: HashMap::new(),
		}
	}

	pub fn configuration(&self) -> &str {
		&self.configuration
	}

	pub fn get(&mut self, engine: &dyn BuildEngine, name: &str) -> Option<String> {
		if let Some(cached) = self.cache.get(name) {
			return cached.clone();
		}
		let value = engine.property(&self.configuration, name);
		self.cache.insert(name.to_string(), value.clone());
		value
	}

	/// Reads through to the engine, refreshing the cached value.
	pub fn get_uncached(&mut self, engine: &dyn BuildEngine, name: &str) -> Option<String> {
		self.cache.remove(name);
		self.get(engine, name)
	}

	pub fn set(&mut self, engine: &mut dyn BuildEngine, name: &str, value: &str) {
		tracing::debug!(configuration = %self.configuration, name, value, "configuration property set");
		engine.set_property(&self.configuration, name, value);
		self.cache.clear();
	}

	/// Boolean property; blank or absent is `None`, only `"true"` is true.
	pub fn get_bool(&mut self, engine: &dyn BuildEngine, name: &str) -> Option<bool> {
		let value = self.get(engine, name)?;
		if value.trim().is_empty() {
			return None;
		}
		Some(value == "true")
	}

	pub fn set_bool(&mut self, engine: &mut dyn BuildEngine, name: &str, value: bool) {
		self.set(engine, name, if value { "true" } else { "false" });
	}

	pub fn start_action(&mut self, engine: &dyn BuildEngine) -> StartAction {
		StartAction::from_property(self.get(engine, START_ACTION).as_deref())
	}

	pub fn set_start_action(&mut self, engine: &mut dyn BuildEngine, action: StartAction) {
		self.set(engine, START_ACTION, action.as_str());
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;
	use crate::engine::MemoryBuildEngine;

	const DEBUG: &str = "Debug|AnyCPU";

	#[test]
	fn reads_are_cached_until_a_write() {
		let mut engine = MemoryBuildEngine::new("/proj");
		engine.set_property(DEBUG, "OutputPath", "bin/Debug");
		let mut props = ConfigurationProperties::new(DEBUG);
		assert_eq!(props.get(&engine, "OutputPath").as_deref(), Some("bin/Debug"));

		engine.set_property(DEBUG, "OutputPath", "elsewhere");
		assert_eq!(props.get(&engine, "OutputPath").as_deref(), Some("bin/Debug"));
		assert_eq!(props.get_uncached(&engine, "OutputPath").as_deref(), Some("elsewhere"));

		props.set(&mut engine, "OutputPath", "bin/Custom");
		assert_eq!(props.get(&engine, "OutputPath").as_deref(), Some("bin/Custom"));
		assert_eq!(engine.property("Release|AnyCPU", "OutputPath"), None);
	}

	#[rstest]
	#[case(None, StartAction::Project)]
	#[case(Some("Program"), StartAction::Program)]
	#[case(Some("URL"), StartAction::Url)]
	#[case(Some("url"), StartAction::Project)]
	#[case(Some("Project"), StartAction::Project)]
	fn start_action_mapping(#[case] stored: Option<&str>, #[case] expected: StartAction) {
		assert_eq!(StartAction::from_property(stored), expected);
	}

	#[test]
	fn start_action_round_trips_through_engine() {
		let mut engine = MemoryBuildEngine::new("/proj");
		let mut props = ConfigurationProperties::new(DEBUG);
		assert_eq!(props.start_action(&engine), StartAction::Project);
		props.set_start_action(&mut engine, StartAction::Url);
		assert_eq!(engine.property(DEBUG, "StartAction").as_deref(), Some("URL"));
		assert_eq!(props.start_action(&engine), StartAction::Url);
	}

	#[test]
	fn booleans() {
		let mut engine = MemoryBuildEngine::new("/proj");
		let mut props = ConfigurationProperties::new(DEBUG);
		assert_eq!(props.get_bool(&engine, "Optimize"), None);
		props.set_bool(&mut engine, "Optimize", true);
		assert_eq!(props.get_bool(&engine, "Optimize"), Some(true));
		engine.set_property(DEBUG, "Optimize", "True");
		assert_eq!(props.get_bool(&engine, "Optimize"), Some(true));
		assert_eq!(props.get_uncached(&engine, "Optimize").as_deref(), Some("True"));
		assert_eq!(props.get_bool(&engine, "Optimize"), Some(false));
	}
}
