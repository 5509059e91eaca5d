// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for queue activity.
#[derive(Debug, Default)]
pub struct QueueMetrics {
	submitted: AtomicU64,
	rejected: AtomicU64,
	settled: AtomicU64,
}
impl QueueMetrics {
	/// Returns the total number of submission attempts.
	pub fn submitted(&self) -> u64 {
		self.submitted.load(Ordering::Relaxed)
	}

	/// Returns the number of submissions refused because the backlog was full.
	pub fn rejected(&self) -> u64 {
		self.rejected.load(Ordering::Relaxed)
	}

	/// Returns the number of jobs that settled, cleanly or not.
	pub fn settled(&self) -> u64 {
		self.settled.load(Ordering::Relaxed)
	}

	pub(crate) fn record_submitted(&self) {
		self.submitted.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rejected(&self) {
		self.rejected.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_settled(&self) {
		self.settled.fetch_add(1, Ordering::Relaxed);
	}
}
