//! Bounded job queue with independent concurrency and backlog caps.
//!
//! Accepted jobs run at most [`max_concurrency`](QueueConfig::max_concurrency) at a time and
//! wait in strict submission order; once the backlog holds
//! [`max_queue_length`](QueueConfig::max_queue_length) jobs, further submissions are refused
//! outright instead of piling up. Scheduling is a single re-entrant pass that runs after
//! every submission and every settlement, entirely under one mutex, so the caps hold at
//! every instant. A job's failure reaches only its own [`JobHandle`]; slot bookkeeping sits
//! in an RAII guard and survives panicking jobs.

mod metrics;
pub use metrics::QueueMetrics;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	obs::{self, GateKind, GateOutcome, GateSpan},
};

const KIND: GateKind = GateKind::JobQueue;

/// Default cap on concurrently running jobs.
pub const DEFAULT_MAX_CONCURRENCY: usize = 2;
/// Default cap on the pending backlog.
pub const DEFAULT_MAX_QUEUE_LENGTH: usize = 3;
/// Environment key overriding [`DEFAULT_MAX_CONCURRENCY`].
pub const ENV_MAX_CONCURRENCY: &str = "FLOODGATE_MAX_CONCURRENCY";
/// Environment key overriding [`DEFAULT_MAX_QUEUE_LENGTH`].
pub const ENV_MAX_QUEUE_LENGTH: &str = "FLOODGATE_MAX_QUEUE_LENGTH";

type QueuedJob = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Errors raised by queue admission or result delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum QueueError {
	/// The pending backlog is at capacity; the job was not accepted.
	#[error("Job queue backlog is full ({limit} pending).")]
	Full {
		/// Backlog limit in force at submission.
		limit: usize,
	},
	/// The job terminated without delivering a result (it panicked).
	#[error("Job settled without delivering a result.")]
	ResultLost,
}

/// Queue limits resolved once at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
	/// Maximum number of jobs running at once.
	pub max_concurrency: usize,
	/// Maximum number of jobs waiting to run.
	pub max_queue_length: usize,
}
impl QueueConfig {
	/// Creates a config; non-positive values fall back to the documented defaults.
	pub fn new(max_concurrency: usize, max_queue_length: usize) -> Self {
		Self {
			max_concurrency: positive_or(max_concurrency, DEFAULT_MAX_CONCURRENCY),
			max_queue_length: positive_or(max_queue_length, DEFAULT_MAX_QUEUE_LENGTH),
		}
	}

	/// Reads limits from [`ENV_MAX_CONCURRENCY`] and [`ENV_MAX_QUEUE_LENGTH`].
	///
	/// Unset, unparsable, or non-positive values fall back to the defaults. The environment
	/// is consulted at this call only; build the config once at the composition root.
	pub fn from_env() -> Self {
		Self::new(env_limit(ENV_MAX_CONCURRENCY), env_limit(ENV_MAX_QUEUE_LENGTH))
	}
}
impl Default for QueueConfig {
	fn default() -> Self {
		Self {
			max_concurrency: DEFAULT_MAX_CONCURRENCY,
			max_queue_length: DEFAULT_MAX_QUEUE_LENGTH,
		}
	}
}

/// Accepted submission: the job's handle plus its backlog position.
#[derive(Debug)]
pub struct Submission<T> {
	/// Handle resolving to the job's own output.
	pub handle: JobHandle<T>,
	/// 1-based position in the pending queue at submission time; informational and
	/// immediately stale.
	pub position: usize,
}

/// Await side of an accepted job.
#[derive(Debug)]
pub struct JobHandle<T> {
	rx: oneshot::Receiver<T>,
}
impl<T> JobHandle<T> {
	/// Waits for the job to settle and returns its output.
	///
	/// A job that panicked never sends a value; that surfaces here as
	/// [`QueueError::ResultLost`] while the queue itself keeps running.
	pub async fn join(self) -> Result<T, QueueError> {
		self.rx.await.map_err(|_| QueueError::ResultLost)
	}
}

/// Point-in-time queue counters; read-only and free of side effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
	/// Jobs currently running.
	pub active: usize,
	/// Jobs waiting to run.
	pub queued: usize,
	/// Concurrency cap in force.
	pub max_concurrency: usize,
	/// Backlog cap in force.
	pub max_queue_length: usize,
}

#[derive(Default)]
struct QueueState {
	pending: VecDeque<QueuedJob>,
	active: usize,
}

struct QueueShared {
	config: QueueConfig,
	metrics: QueueMetrics,
	state: Mutex<QueueState>,
}
impl QueueShared {
	fn pump(self: &Arc<Self>) {
		let ready = {
			let mut state = self.state.lock();

			self.take_ready(&mut state)
		};

		self.launch(ready);
	}

	// One scheduling pass; re-entrant and safe to run after every submission or settlement.
	fn take_ready(&self, state: &mut QueueState) -> Vec<QueuedJob> {
		let mut ready = Vec::new();

		while state.active < self.config.max_concurrency
			&& let Some(job) = state.pending.pop_front()
		{
			state.active += 1;
			ready.push(job);
		}

		ready
	}

	fn launch(self: &Arc<Self>, ready: Vec<QueuedJob>) {
		for job in ready {
			let slot = SlotGuard { shared: Arc::clone(self) };

			tokio::spawn(async move {
				// The guard lives for the job's whole run; its drop refills the queue even
				// when the job panics.
				let _slot = slot;

				job.await;
			});
		}
	}
}

struct SlotGuard {
	shared: Arc<QueueShared>,
}
impl Drop for SlotGuard {
	fn drop(&mut self) {
		self.shared.metrics.record_settled();

		let ready = {
			let mut state = self.shared.state.lock();

			state.active -= 1;

			self.shared.take_ready(&mut state)
		};

		self.shared.launch(ready);
	}
}

/// Bounded FIFO job queue handle.
///
/// Cloning is cheap and shares the same queue. Instances are independent; nothing in this
/// module is process-global. Jobs are spawned onto the ambient Tokio runtime, so
/// [`submit`](Self::submit) must be called from within one.
#[derive(Clone)]
pub struct JobQueue(Arc<QueueShared>);
impl JobQueue {
	/// Creates an empty queue with the provided limits.
	pub fn new(config: QueueConfig) -> Self {
		Self(Arc::new(QueueShared {
			config,
			metrics: QueueMetrics::default(),
			state: Mutex::new(QueueState::default()),
		}))
	}

	/// Creates an empty queue limited per [`QueueConfig::from_env`].
	pub fn from_env() -> Self {
		Self::new(QueueConfig::from_env())
	}

	/// Returns the limits the queue was built with.
	pub fn config(&self) -> QueueConfig {
		self.0.config
	}

	/// Returns the queue's activity counters.
	pub fn metrics(&self) -> &QueueMetrics {
		&self.0.metrics
	}

	/// Returns current counters alongside the configured caps.
	pub fn snapshot(&self) -> QueueSnapshot {
		let state = self.0.state.lock();

		QueueSnapshot {
			active: state.active,
			queued: state.pending.len(),
			max_concurrency: self.0.config.max_concurrency,
			max_queue_length: self.0.config.max_queue_length,
		}
	}

	/// Admits a job, or refuses it when the backlog is full.
	///
	/// The future does not start running before the scheduler grants it a slot; a refused
	/// job is dropped unpolled. Accepted jobs run exactly once, in submission order.
	pub fn submit<J>(&self, job: J) -> Result<Submission<J::Output>, QueueError>
	where
		J: Future + Send + 'static,
		J::Output: Send + 'static,
	{
		let _span = GateSpan::new(KIND, "submit").entered();

		obs::record_gate_outcome(KIND, GateOutcome::Attempt);
		self.0.metrics.record_submitted();

		let (tx, rx) = oneshot::channel();
		let position = {
			let mut state = self.0.state.lock();

			if state.pending.len() >= self.0.config.max_queue_length {
				drop(state);
				self.0.metrics.record_rejected();
				obs::record_gate_outcome(KIND, GateOutcome::Rejected);
				obs::note_rejection(KIND, "queue_full", &self.0.config.max_queue_length);

				return Err(QueueError::Full { limit: self.0.config.max_queue_length });
			}

			state.pending.push_back(Box::pin(async move {
				// The receiver may have been dropped; the job's outcome is then nobody's
				// business.
				let _ = tx.send(job.await);
			}));

			state.pending.len()
		};

		self.0.pump();
		obs::record_gate_outcome(KIND, GateOutcome::Admitted);

		Ok(Submission { handle: JobHandle { rx }, position })
	}
}
impl Default for JobQueue {
	fn default() -> Self {
		Self::new(QueueConfig::default())
	}
}
impl Debug for JobQueue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let snapshot = self.snapshot();

		f.debug_struct("JobQueue")
			.field("active", &snapshot.active)
			.field("queued", &snapshot.queued)
			.field("max_concurrency", &snapshot.max_concurrency)
			.field("max_queue_length", &snapshot.max_queue_length)
			.finish()
	}
}

fn env_limit(key: &str) -> usize {
	std::env::var(key).ok().and_then(|raw| raw.trim().parse().ok()).unwrap_or(0)
}

fn positive_or(value: usize, fallback: usize) -> usize {
	if value == 0 { fallback } else { value }
}
