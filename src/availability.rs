//! One-shot-until-reset availability latch, grounded on the
//! `CompoundVariable<T>` helper from the vsomeip handler this bridge
//! replaces: a value behind a mutex, signalled through a condvar, with a
//! timed wait for consumers that can't block forever.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Matches the `CompoundVariable<bool>` default wait used for outbound
/// request gating.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(60_000);

pub struct AvailabilityLatch {
	available: Mutex<bool>,
	changed: Condvar,
}

impl AvailabilityLatch {
	pub fn new() -> Self {
		Self {
			available: Mutex::new(false),
			changed: Condvar::new(),
		}
	}

	/// Sets the latch and wakes every waiter. Only ever called with `true`
	/// by the bridge: a negative availability event is a reason to sit and
	/// keep waiting, not a reason to latch `false` and wake a waiter into
	/// failing early.
	pub fn set_and_notify(&self, value: bool) {
		let mut guard = self.available.lock().expect("availability latch poisoned");
		*guard = value;
		drop(guard);
		self.changed.notify_all();
	}

	pub fn get(&self) -> bool {
		*self.available.lock().expect("availability latch poisoned")
	}

	/// Blocks up to `timeout` for the latch to read `true`. Returns the
	/// value observed when the wait ended, so a caller can tell a timeout
	/// apart from an already-true latch.
	pub fn wait_readable(&self, timeout: Duration) -> bool {
		let guard = self.available.lock().expect("availability latch poisoned");
		if *guard {
			return true;
		}
		let (guard, _timeout_result) = self
			.changed
			.wait_timeout_while(guard, timeout, |available| !*available)
			.expect("availability latch poisoned");
		*guard
	}
}

impl Default for AvailabilityLatch {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::thread;
	use std::time::Duration;

	#[test]
	fn wait_returns_immediately_once_set() {
		let latch = AvailabilityLatch::new();
		latch.set_and_notify(true);
		assert!(latch.wait_readable(Duration::from_millis(10)));
	}

	#[test]
	fn wait_times_out_when_never_set() {
		let latch = AvailabilityLatch::new();
		assert!(!latch.wait_readable(Duration::from_millis(20)));
	}

	#[test]
	fn waiter_is_woken_by_a_later_set() {
		let latch = Arc::new(AvailabilityLatch::new());
		let waiter = Arc::clone(&latch);
		let handle = thread::spawn(move || waiter.wait_readable(Duration::from_secs(5)));

		thread::sleep(Duration::from_millis(20));
		latch.set_and_notify(true);

		assert!(handle.join().unwrap());
	}
}
