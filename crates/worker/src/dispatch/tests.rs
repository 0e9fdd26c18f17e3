use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::*;
use crate::spawn_thread;

fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
	Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn unit_testing_mode_runs_inline() {
	let dispatcher = Dispatcher::unit_testing();
	let log = recorder();
	let sink = Arc::clone(&log);
	dispatcher.post(move || sink.lock().push("posted"));
	assert_eq!(*log.lock(), vec!["posted"]);
	assert_eq!(dispatcher.send_sync(|| 41 + 1).unwrap(), 42);
	dispatcher.assert_on_owner_context();
}

#[test]
fn unit_testing_mode_ignores_capture() {
	let dispatcher = Dispatcher::unit_testing();
	dispatcher.capture_owner_context();
	assert!(!dispatcher.is_owner_context());
}

#[test]
fn send_sync_without_owner_reports_not_captured() {
	let dispatcher = Dispatcher::new();
	let caller = dispatcher.clone();
	let result = spawn_thread(TaskClass::Caller, move || caller.send_sync(|| ())).join().unwrap();
	assert!(matches!(result, Err(DispatchError::NotCaptured)));
}

#[test]
fn send_sync_on_owner_runs_inline_without_deadlock() {
	let dispatcher = Dispatcher::new();
	dispatcher.capture_owner_context();
	let nested = dispatcher.clone();
	let value = dispatcher.send_sync(move || nested.send_sync(|| "inner").unwrap()).unwrap();
	assert_eq!(value, "inner");
}

#[test]
fn recapture_from_same_thread_is_noop() {
	let dispatcher = Dispatcher::new();
	dispatcher.capture_owner_context();
	dispatcher.capture_owner_context();
	assert!(dispatcher.is_owner_context());
}

#[cfg(debug_assertions)]
#[test]
fn recapture_from_foreign_thread_fails_loudly() {
	let dispatcher = Dispatcher::new();
	dispatcher.capture_owner_context();

	let intruder = dispatcher.clone();
	let joined = spawn_thread(TaskClass::Caller, move || intruder.capture_owner_context()).join();

	assert!(joined.is_err());
	assert!(dispatcher.is_owner_context());
}

#[cfg(debug_assertions)]
#[test]
fn owner_assertion_fails_off_the_owner_thread() {
	let dispatcher = Dispatcher::new();
	dispatcher.capture_owner_context();
	dispatcher.assert_on_owner_context();

	let caller = dispatcher.clone();
	let joined = spawn_thread(TaskClass::Caller, move || caller.assert_on_owner_context()).join();

	assert!(joined.is_err());
}

#[test]
fn posts_from_two_callers_drain_in_submission_order() {
	let dispatcher = Dispatcher::new();
	dispatcher.capture_owner_context();
	let log = recorder();

	for label in ["f1", "f2"] {
		let caller = dispatcher.clone();
		let sink = Arc::clone(&log);
		spawn_thread(TaskClass::Caller, move || {
			caller.post(move || {
				sink.lock().push(label);
				std::thread::sleep(Duration::from_millis(5));
				sink.lock().push(label);
			});
		})
		.join()
		.unwrap();
	}

	assert!(log.lock().is_empty(), "nothing runs before the owner pumps");
	assert_eq!(dispatcher.pump(), 2);
	assert_eq!(*log.lock(), vec!["f1", "f1", "f2", "f2"]);
}

#[test]
fn nested_pump_appends_instead_of_draining_recursively() {
	let dispatcher = Dispatcher::new();
	dispatcher.capture_owner_context();
	let log = recorder();

	let outer_dispatcher = dispatcher.clone();
	let outer_log = Arc::clone(&log);
	dispatcher.post(move || {
		outer_log.lock().push("outer-start");
		let inner_log = Arc::clone(&outer_log);
		outer_dispatcher.post(move || inner_log.lock().push("inner"));
		// A nested pump picks the post up but must not run it here.
		assert_eq!(outer_dispatcher.pump(), 1);
		outer_log.lock().push("outer-end");
	});

	dispatcher.pump();
	assert_eq!(*log.lock(), vec!["outer-start", "outer-end", "inner"]);
}

#[test]
fn panicking_post_does_not_stop_the_drain() {
	let dispatcher = Dispatcher::new();
	dispatcher.capture_owner_context();
	let ran = Arc::new(AtomicUsize::new(0));

	dispatcher.post(|| panic!("posted failure"));
	let counter = Arc::clone(&ran);
	dispatcher.post(move || {
		counter.fetch_add(1, Ordering::SeqCst);
	});

	dispatcher.pump();
	assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn send_sync_crosses_to_owner_thread() {
	let owner = Dispatcher::spawn_owner("test-owner").unwrap();
	let dispatcher = owner.dispatcher().clone();
	let name = dispatcher.send_sync(|| std::thread::current().name().map(str::to_string)).unwrap();
	assert_eq!(name.as_deref(), Some("test-owner"));
	assert!(!dispatcher.is_owner_context());
}

#[test]
fn send_sync_panic_returns_failure_with_owner_trace() {
	let owner = Dispatcher::spawn_owner("panicking-owner").unwrap();
	let err = owner.dispatcher().send_sync::<_, ()>(|| panic!("owner exploded")).unwrap_err();
	let DispatchError::Owner(failure) = err else {
		panic!("expected owner failure, got {err:?}");
	};
	assert_eq!(failure.message(), "owner exploded");
	let trace = failure.owner_trace().expect("owner trace attached");
	assert!(trace.contains("tests.rs"), "trace: {trace}");

	// The owner survives and keeps serving.
	assert_eq!(owner.dispatcher().send_sync(|| 5).unwrap(), 5);
}

#[test]
fn send_sync_after_shutdown_reports_owner_gone() {
	let owner = Dispatcher::spawn_owner("short-lived").unwrap();
	let dispatcher = owner.dispatcher().clone();
	owner.shutdown().unwrap();
	assert!(dispatcher.is_closed());
	assert!(matches!(dispatcher.send_sync(|| ()), Err(DispatchError::OwnerGone)));
}

#[test]
fn posts_and_sends_share_owner_fifo() {
	let owner = Dispatcher::spawn_owner("fifo-owner").unwrap();
	let dispatcher = owner.dispatcher().clone();
	let log = recorder();

	for label in ["a", "b", "c"] {
		let sink = Arc::clone(&log);
		dispatcher.post(move || sink.lock().push(label));
	}
	let sink = Arc::clone(&log);
	dispatcher.send_sync(move || sink.lock().push("sync")).unwrap();

	assert_eq!(*log.lock(), vec!["a", "b", "c", "sync"]);
}

#[test]
fn send_async_resolves_on_owner() {
	let owner = Dispatcher::spawn_owner("async-owner").unwrap();
	let dispatcher = owner.dispatcher().clone();
	let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
	let on_owner = rt.block_on(async move {
		let probe = dispatcher.clone();
		dispatcher.send_async(move || probe.is_owner_context()).await
	});
	assert!(on_owner.unwrap());
}
