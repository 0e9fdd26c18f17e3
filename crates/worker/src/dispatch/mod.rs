//! Owner-context dispatch.
//!
//! All shared project state lives on one thread, the owner context. Every
//! other thread reaches that state by handing closures to a [`Dispatcher`]:
//!
//! * [`Dispatcher::post`] enqueues work and returns immediately. Posted work
//!   drains in FIFO order from a private queue. A post that arrives while the
//!   queue is already draining (a nested pump from inside posted work) is
//!   appended, never drained recursively.
//! * [`Dispatcher::send_sync`] blocks the caller until the owner has run the
//!   work and hands back its value. A panic inside the work comes back as an
//!   [`OwnerFailure`] carrying the owner-side trace. Calls made on the owner
//!   context itself run inline.
//!
//! The owner thread must pump the dispatcher, either with [`Dispatcher::run`]
//! or incrementally with [`Dispatcher::pump`]. [`Dispatcher::spawn_owner`]
//! starts a dedicated thread that does both.
//!
//! Unit testing mode ([`Dispatcher::init_unit_testing_mode`]) bypasses the
//! owner entirely and runs every submission inline on the calling thread.

use std::collections::VecDeque;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, mpsc};
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::{TaskClass, spawn_named_thread};

mod failure;
#[cfg(test)]
mod tests;

pub use failure::{OwnerFailure, WRAPPED_TRACE_KEY};
use failure::run_caught;

/// Errors surfaced by [`Dispatcher::send_sync`].
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
	/// No owner context has been captured and unit testing mode is off.
	#[error("owner context has not been captured")]
	NotCaptured,
	/// The owner context shut down before running the work.
	#[error("owner context has shut down")]
	OwnerGone,
	/// The work panicked on the owner context.
	#[error(transparent)]
	Owner(#[from] OwnerFailure),
}

type Work = Box<dyn FnOnce() + Send + 'static>;

struct PostedWork {
	work: Work,
	origin: &'static Location<'static>,
}

enum Job {
	Post(PostedWork),
	Send(Work),
	Shutdown,
}

/// Result of handling one job on the owner context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
	Continue,
	Stop,
}

struct Inner {
	tx: mpsc::Sender<Job>,
	/// Taken on shutdown so queued and future jobs are dropped.
	rx: Mutex<Option<mpsc::Receiver<Job>>>,
	owner: OnceLock<ThreadId>,
	unit_testing: AtomicBool,
	/// Owner-only queue of posted work awaiting drain.
	queue: Mutex<VecDeque<PostedWork>>,
	draining: AtomicBool,
	closed: AtomicBool,
}

/// Cloneable handle that marshals work onto the owner context.
#[derive(Clone)]
pub struct Dispatcher {
	inner: Arc<Inner>,
}

impl std::fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher")
			.field("owner", &self.inner.owner.get())
			.field("unit_testing", &self.is_unit_testing())
			.field("closed", &self.inner.closed.load(Ordering::Acquire))
			.finish()
	}
}

impl Default for Dispatcher {
	fn default() -> Self {
		Self::new()
	}
}

impl Dispatcher {
	/// Creates a dispatcher with no owner context captured yet.
	pub fn new() -> Self {
		let (tx, rx) = mpsc::channel();
		Self {
			inner: Arc::new(Inner {
				tx,
				rx: Mutex::new(Some(rx)),
				owner: OnceLock::new(),
				unit_testing: AtomicBool::new(false),
				queue: Mutex::new(VecDeque::new()),
				draining: AtomicBool::new(false),
				closed: AtomicBool::new(false),
			}),
		}
	}

	/// Creates a dispatcher already in unit testing mode.
	pub fn unit_testing() -> Self {
		let dispatcher = Self::new();
		dispatcher.init_unit_testing_mode();
		dispatcher
	}

	/// Switches to unit testing mode: `post` and `send_sync` run inline.
	///
	/// Must be called before the owner context is captured.
	pub fn init_unit_testing_mode(&self) {
		debug_assert!(self.inner.owner.get().is_none(), "owner context already captured; too late to enter unit testing mode");
		self.inner.unit_testing.store(true, Ordering::Release);
	}

	/// Returns true when submissions run inline on the calling thread.
	pub fn is_unit_testing(&self) -> bool {
		self.inner.unit_testing.load(Ordering::Acquire)
	}

	/// Captures the calling thread as the owner context.
	///
	/// Recapturing from the same thread is a no-op. Capturing from a different
	/// thread violates the single-owner precondition: fatal in debug builds,
	/// logged and ignored in release builds.
	#[track_caller]
	pub fn capture_owner_context(&self) {
		if self.is_unit_testing() {
			return;
		}
		let current = thread::current().id();
		match self.inner.owner.set(current) {
			Ok(()) => {
				tracing::debug!(owner = ?current, at = %Location::caller(), "dispatch.capture");
			}
			Err(_) => {
				let owner = self.inner.owner.get().copied();
				if owner != Some(current) {
					tracing::error!(?owner, attempted = ?current, "dispatch.capture from a different thread ignored");
					debug_assert_eq!(owner, Some(current), "owner context recaptured from a different thread");
				}
			}
		}
	}

	/// Returns true when the calling thread is the captured owner context.
	pub fn is_owner_context(&self) -> bool {
		self.inner.owner.get() == Some(&thread::current().id())
	}

	/// Diagnostic check that the caller runs on the owner context.
	///
	/// Fatal in debug builds when violated; a no-op in release builds and in
	/// unit testing mode.
	#[track_caller]
	pub fn assert_on_owner_context(&self) {
		if self.is_unit_testing() {
			return;
		}
		debug_assert!(self.is_owner_context(), "must be called from the owner context (at {})", Location::caller());
	}

	/// Enqueues `work` for the owner context and returns immediately.
	///
	/// A panic in posted work is logged and swallowed; later work still runs.
	#[track_caller]
	pub fn post<F>(&self, work: F)
	where
		F: FnOnce() + Send + 'static,
	{
		if self.is_unit_testing() {
			work();
			return;
		}
		let origin = Location::caller();
		debug_assert!(self.inner.owner.get().is_some(), "owner context must be captured before posting");
		let job = Job::Post(PostedWork { work: Box::new(work), origin });
		if self.inner.closed.load(Ordering::Acquire) || self.inner.tx.send(job).is_err() {
			tracing::warn!(%origin, "dispatch.post after owner shutdown; work dropped");
		}
	}

	/// Runs `work` on the owner context, blocking until it finishes.
	///
	/// Runs inline when already on the owner context. Must not be called from
	/// inside an async runtime; use [`Self::send_async`] there.
	pub fn send_sync<F, R>(&self, work: F) -> Result<R, DispatchError>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		if self.is_unit_testing() || self.is_owner_context() {
			return run_caught(work).map_err(DispatchError::Owner);
		}
		let reply = self.enqueue_send(work)?;
		match reply.blocking_recv() {
			Ok(result) => result.map_err(DispatchError::Owner),
			Err(_) => Err(DispatchError::OwnerGone),
		}
	}

	/// Async flavor of [`Self::send_sync`] for callers living on a runtime.
	pub async fn send_async<F, R>(&self, work: F) -> Result<R, DispatchError>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		if self.is_unit_testing() || self.is_owner_context() {
			return run_caught(work).map_err(DispatchError::Owner);
		}
		let reply = self.enqueue_send(work)?;
		match reply.await {
			Ok(result) => result.map_err(DispatchError::Owner),
			Err(_) => Err(DispatchError::OwnerGone),
		}
	}

	fn enqueue_send<F, R>(&self, work: F) -> Result<oneshot::Receiver<Result<R, OwnerFailure>>, DispatchError>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		if self.inner.owner.get().is_none() {
			return Err(DispatchError::NotCaptured);
		}
		if self.inner.closed.load(Ordering::Acquire) {
			return Err(DispatchError::OwnerGone);
		}
		let (reply_tx, reply_rx) = oneshot::channel();
		let span = tracing::Span::current();
		let job = Job::Send(Box::new(move || {
			let _guard = span.enter();
			let _ = reply_tx.send(run_caught(work));
		}));
		self.inner.tx.send(job).map_err(|_| DispatchError::OwnerGone)?;
		Ok(reply_rx)
	}

	/// Asks the owner context to stop pumping.
	///
	/// Jobs still queued behind the shutdown request are dropped; blocked
	/// `send_sync` callers receive [`DispatchError::OwnerGone`].
	pub fn shutdown(&self) {
		let _ = self.inner.tx.send(Job::Shutdown);
	}

	/// Returns true once the owner context has stopped pumping.
	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::Acquire)
	}

	/// Pumps jobs on the owner context until [`Self::shutdown`] is requested.
	pub fn run(&self) {
		self.assert_on_owner_context();
		tracing::debug!("dispatch.run");
		loop {
			let job = {
				let rx = self.inner.rx.lock();
				match rx.as_ref().map(mpsc::Receiver::recv) {
					Some(Ok(job)) => job,
					_ => break,
				}
			};
			if self.handle(job) == Flow::Stop {
				break;
			}
		}
		tracing::debug!("dispatch.run finished");
	}

	/// Handles every job already queued, without blocking. Returns the count.
	///
	/// May be called from inside posted work; posts picked up by such a
	/// nested pump join the active drain instead of starting a new one.
	pub fn pump(&self) -> usize {
		self.assert_on_owner_context();
		let mut handled = 0;
		loop {
			let job = {
				let rx = self.inner.rx.lock();
				match rx.as_ref().map(mpsc::Receiver::try_recv) {
					Some(Ok(job)) => job,
					_ => break,
				}
			};
			handled += 1;
			if self.handle(job) == Flow::Stop {
				break;
			}
		}
		handled
	}

	fn handle(&self, job: Job) -> Flow {
		match job {
			Job::Post(posted) => {
				self.inner.queue.lock().push_back(posted);
				if self.inner.draining.swap(true, Ordering::AcqRel) {
					tracing::trace!("dispatch.post appended to active drain");
					return Flow::Continue;
				}
				self.drain();
				self.inner.draining.store(false, Ordering::Release);
				Flow::Continue
			}
			Job::Send(work) => {
				work();
				Flow::Continue
			}
			Job::Shutdown => {
				self.inner.closed.store(true, Ordering::Release);
				self.inner.rx.lock().take();
				tracing::debug!("dispatch.shutdown");
				Flow::Stop
			}
		}
	}

	fn drain(&self) {
		loop {
			let next = self.inner.queue.lock().pop_front();
			let Some(PostedWork { work, origin }) = next else {
				break;
			};
			if let Err(failure) = run_caught(work) {
				tracing::warn!(
					%origin,
					error = %failure,
					trace = failure.owner_trace().unwrap_or_default(),
					"dispatch.post work panicked; continuing drain"
				);
			}
		}
	}

	/// Spawns a named thread that captures itself as the owner and pumps
	/// until the returned [`OwnerThread`] shuts it down.
	pub fn spawn_owner(name: impl Into<String>) -> std::io::Result<OwnerThread> {
		let dispatcher = Self::new();
		let owner = dispatcher.clone();
		let (ready_tx, ready_rx) = mpsc::channel();
		let handle = spawn_named_thread(TaskClass::Owner, name, move || {
			owner.capture_owner_context();
			let _ = ready_tx.send(());
			owner.run();
		})?;
		let _ = ready_rx.recv();
		Ok(OwnerThread {
			dispatcher,
			handle: Some(handle),
		})
	}
}

/// Handle to a dedicated owner thread. Dropping it shuts the thread down.
#[derive(Debug)]
pub struct OwnerThread {
	dispatcher: Dispatcher,
	handle: Option<JoinHandle<()>>,
}

impl OwnerThread {
	/// Returns the dispatcher pumped by this thread.
	pub fn dispatcher(&self) -> &Dispatcher {
		&self.dispatcher
	}

	/// Stops the owner thread and waits for it to exit.
	pub fn shutdown(mut self) -> thread::Result<()> {
		self.stop()
	}

	fn stop(&mut self) -> thread::Result<()> {
		let Some(handle) = self.handle.take() else {
			return Ok(());
		};
		self.dispatcher.shutdown();
		if handle.thread().id() == thread::current().id() {
			return Ok(());
		}
		handle.join()
	}
}

impl Drop for OwnerThread {
	fn drop(&mut self) {
		if self.stop().is_err() {
			tracing::error!("owner thread panicked");
		}
	}
}
