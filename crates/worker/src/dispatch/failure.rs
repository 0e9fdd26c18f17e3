//! Failures raised by work executed on the owner context.
//!
//! A panic inside dispatched work is caught on the owner thread and carried
//! back to the caller as an [`OwnerFailure`]. The owner-side backtrace is
//! recorded by a process-wide panic hook (installed on first use) and stored
//! in the failure's diagnostics under [`WRAPPED_TRACE_KEY`], so it survives the
//! thread hop even though the caller never saw that stack.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Once;

use thiserror::Error;

/// Diagnostics key under which the owner-side stack trace of a failure is kept.
pub const WRAPPED_TRACE_KEY: &str = "$$refgraph.dispatch.wrapped_stacktrace$$";

thread_local! {
	static CATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
	static LAST_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static TRACE_HOOK: Once = Once::new();

/// A panic raised by dispatched work, captured with its original diagnostics.
#[derive(Debug, Clone, Error)]
#[error("work failed on owner context: {message}")]
pub struct OwnerFailure {
	message: String,
	data: BTreeMap<String, String>,
}

impl OwnerFailure {
	/// Creates a failure with an explicit message and no diagnostics.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			data: BTreeMap::new(),
		}
	}

	/// Returns the panic message.
	pub fn message(&self) -> &str {
		&self.message
	}

	/// Looks up one diagnostics entry.
	pub fn data(&self, key: &str) -> Option<&str> {
		self.data.get(key).map(String::as_str)
	}

	/// Returns the owner-side stack trace, if one was recorded.
	pub fn owner_trace(&self) -> Option<&str> {
		self.data(WRAPPED_TRACE_KEY)
	}

	/// Inserts a diagnostics entry unless the key is already present.
	pub fn insert_data_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.data.entry(key.into()).or_insert_with(|| value.into());
	}

	/// Re-raises this failure as a panic on the current thread.
	///
	/// The payload is the failure itself, so a dispatcher further up the
	/// stack keeps the diagnostics recorded here instead of replacing them.
	pub fn resume(self) -> ! {
		std::panic::resume_unwind(Box::new(self))
	}

	fn from_panic(payload: Box<dyn Any + Send>) -> Self {
		let trace = LAST_TRACE.with(|slot| slot.borrow_mut().take());
		let mut failure = match payload.downcast::<OwnerFailure>() {
			Ok(nested) => *nested,
			Err(payload) => Self::new(panic_message(payload.as_ref())),
		};
		if let Some(trace) = trace {
			failure.insert_data_if_absent(WRAPPED_TRACE_KEY, trace);
		}
		failure
	}
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&'static str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else if let Some(failure) = payload.downcast_ref::<OwnerFailure>() {
		failure.message.clone()
	} else {
		"non-string panic payload".to_string()
	}
}

/// Runs `work`, converting a panic into an [`OwnerFailure`].
pub(crate) fn run_caught<R>(work: impl FnOnce() -> R) -> Result<R, OwnerFailure> {
	install_trace_hook();
	CATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
	let result = std::panic::catch_unwind(AssertUnwindSafe(work));
	CATCH_DEPTH.with(|depth| depth.set(depth.get() - 1));
	result.map_err(OwnerFailure::from_panic)
}

fn install_trace_hook() {
	TRACE_HOOK.call_once(|| {
		let previous = std::panic::take_hook();
		std::panic::set_hook(Box::new(move |info| {
			if CATCH_DEPTH.with(Cell::get) == 0 {
				previous(info);
				return;
			}
			let location = info.location().map(ToString::to_string).unwrap_or_else(|| "<unknown>".to_string());
			let trace = format!("panicked at {location}\n{}", Backtrace::force_capture());
			LAST_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
		}));
	});
}
