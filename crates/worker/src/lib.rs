//! Shared worker primitives for the reference graph.
//!
//! * [`Dispatcher`]: serializes work onto the single owner context that holds
//!   project state, either fire-and-forget ([`Dispatcher::post`]) or blocking
//!   ([`Dispatcher::send_sync`]).
//! * [`OwnerThread`]: a dedicated named thread that captures itself as the
//!   owner context and pumps a dispatcher until shut down.
//! * [`TaskClass`] and the spawn helpers: thread creation with shared
//!   classification metadata for tracing.

mod class;
pub mod dispatch;
mod spawn;

pub use class::TaskClass;
pub use dispatch::{DispatchError, Dispatcher, OwnerFailure, OwnerThread, WRAPPED_TRACE_KEY};
pub use spawn::{spawn_named_thread, spawn_thread};
