//! Injected task-posting abstraction. Production code runs the dispatch
//! loop on a dedicated OS thread; tests pump the queue directly and never
//! need a background thread at all, so the only implementation that ships
//! here is the real one.

pub trait Scheduler: Send + Sync {
	fn post(&self, task: Box<dyn FnOnce() + Send + 'static>);
}

/// Spawns a new named thread per posted task. The handler posts exactly
/// one long-running task (its dispatch loop) per lazy start, so this is
/// one thread per handler instance, not a pool.
pub struct ThreadScheduler {
	thread_name: String,
}

impl ThreadScheduler {
	pub fn new(thread_name: impl Into<String>) -> Self {
		Self {
			thread_name: thread_name.into(),
		}
	}
}

impl Default for ThreadScheduler {
	fn default() -> Self {
		Self::new("someip-bridge-worker")
	}
}

impl Scheduler for ThreadScheduler {
	fn post(&self, task: Box<dyn FnOnce() + Send + 'static>) {
		std::thread::Builder::new()
			.name(self.thread_name.clone())
			.spawn(task)
			.expect("failed to spawn dispatch thread");
	}
}

/// Drops every posted task instead of running it. Pairs with
/// [`crate::handler::SomeipHandler::run_once`] for tests that want to
/// pump the dispatch loop themselves, deterministically, rather than
/// race a real background thread.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct NoopScheduler;

#[cfg(any(test, feature = "test-utils"))]
impl Scheduler for NoopScheduler {
	fn post(&self, _task: Box<dyn FnOnce() + Send + 'static>) {}
}
