//! Restartable, cloneable enumeration over a fixed dependency snapshot.
//!
//! Used to hand dependency lists across boundaries that speak a
//! fetch-`n`-at-a-time protocol with status codes instead of iterators. The
//! snapshot is immutable once constructed, so enumerators are safe to move to
//! any thread; a changed dependency list needs a new enumerator.

use std::sync::Arc;

/// Status returned by enumeration calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumStatus {
	/// The request was satisfied in full.
	Success,
	/// The sequence ran out before the request was satisfied.
	Exhausted,
}

/// Cursor over an immutable snapshot of dependency handles.
#[derive(Debug)]
pub struct DependencyEnumerator<T> {
	items: Arc<[T]>,
	cursor: usize,
}

/// Clones share the snapshot but get their own cursor, starting where the
/// source currently stands.
impl<T> Clone for DependencyEnumerator<T> {
	fn clone(&self) -> Self {
		Self {
			items: Arc::clone(&self.items),
			cursor: self.cursor,
		}
	}
}

impl<T: Clone> DependencyEnumerator<T> {
	pub fn new(items: impl Into<Arc<[T]>>) -> Self {
		Self { items: items.into(), cursor: 0 }
	}

	/// Returns up to `count` items from the cursor and advances past them.
	///
	/// The status is [`EnumStatus::Success`] only when exactly `count` items
	/// were returned.
	pub fn next(&mut self, count: usize) -> (Vec<T>, EnumStatus) {
		let end = self.cursor.saturating_add(count).min(self.items.len());
		let fetched = self.items[self.cursor..end].to_vec();
		self.cursor = end;
		let status = if fetched.len() == count { EnumStatus::Success } else { EnumStatus::Exhausted };
		(fetched, status)
	}

	/// Advances the cursor by `count`, clamped to the end of the snapshot.
	pub fn skip(&mut self, count: usize) -> EnumStatus {
		let target = self.cursor.saturating_add(count);
		if target > self.items.len() {
			self.cursor = self.items.len();
			EnumStatus::Exhausted
		} else {
			self.cursor = target;
			EnumStatus::Success
		}
	}

	/// Moves the cursor back to the start.
	pub fn reset(&mut self) {
		self.cursor = 0;
	}

	pub fn position(&self) -> usize {
		self.cursor
	}

	/// Total number of items in the snapshot.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Items not yet returned.
	pub fn remaining(&self) -> &[T] {
		&self.items[self.cursor..]
	}
}
