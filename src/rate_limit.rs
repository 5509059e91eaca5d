//! Fixed-window request throttling keyed by identifier and named policy.
//!
//! Counters live in process memory behind one mutex; a multi-instance deployment rates each
//! instance separately. The window is fixed, not sliding: a full budget at the end of one
//! window plus a full budget at the start of the next can land back-to-back, so callers get
//! at most twice `max_requests` around a boundary. Stale entries are reclaimed inside
//! [`check`](RateLimiter::check) itself (no background task), at most once per
//! [`SWEEP_INTERVAL`].

// self
use crate::{
	_prelude::*,
	obs::{self, GateKind, GateOutcome, GateSpan},
};

const KIND: GateKind = GateKind::RateLimit;

/// Minimum gap between two housekeeping sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::minutes(1);

type LimiterShared = Arc<Mutex<LimiterState>>;

/// Named fixed-window budget declared once per call site.
///
/// Distinct endpoints declare distinct policies; an endpoint wanting a coarse and a burst
/// limit simply calls [`RateLimiter::check`] twice with two policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RatePolicy {
	/// Stable policy label; part of the counter key.
	pub name: &'static str,
	/// Requests admitted per window.
	pub max_requests: u32,
	/// Window length.
	pub window: Duration,
}
impl RatePolicy {
	/// Creates a policy, validating both bounds at construction.
	///
	/// # Panics
	///
	/// Panics when `max_requests` is zero or `window` is not positive; a malformed budget is
	/// a programming error, not a runtime condition. `const` declarations surface the panic
	/// at compile time.
	pub const fn new(name: &'static str, max_requests: u32, window: Duration) -> Self {
		assert!(max_requests > 0, "Rate policy must admit at least one request per window.");
		assert!(window.whole_milliseconds() > 0, "Rate policy window must be positive.");

		Self { name, max_requests, window }
	}
}

/// Outcome of a rate check; being limited is data, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateDecision {
	/// The request fits the current window.
	Allowed {
		/// Budget left in the window after this request.
		remaining: u32,
		/// Instant the window rolls over.
		resets_at: OffsetDateTime,
	},
	/// The window budget is exhausted.
	Limited {
		/// Instant the window rolls over.
		resets_at: OffsetDateTime,
		/// Whole seconds to wait, rounded up; ready for a `Retry-After` header.
		retry_after: Duration,
	},
}
impl RateDecision {
	/// Returns true when the request may proceed.
	pub fn is_allowed(&self) -> bool {
		matches!(self, RateDecision::Allowed { .. })
	}

	/// Returns the remaining budget for an allowed request.
	pub fn remaining(&self) -> Option<u32> {
		match self {
			RateDecision::Allowed { remaining, .. } => Some(*remaining),
			RateDecision::Limited { .. } => None,
		}
	}

	/// Returns the instant the current window rolls over.
	pub fn resets_at(&self) -> OffsetDateTime {
		match self {
			RateDecision::Allowed { resets_at, .. } | RateDecision::Limited { resets_at, .. } =>
				*resets_at,
		}
	}

	/// Returns the suggested wait for a limited request.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			RateDecision::Allowed { .. } => None,
			RateDecision::Limited { retry_after, .. } => Some(*retry_after),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct EntryKey {
	policy: &'static str,
	identifier: String,
}

#[derive(Clone, Copy, Debug)]
struct WindowEntry {
	count: u32,
	window_start: OffsetDateTime,
	window: Duration,
}

#[derive(Debug, Default)]
struct LimiterState {
	entries: HashMap<EntryKey, WindowEntry>,
	last_sweep: Option<OffsetDateTime>,
}

/// Thread-safe fixed-window rate limiter.
///
/// Cloning is cheap and shares the underlying counters. Instances are independent; nothing
/// in this module is process-global.
#[derive(Clone, Debug, Default)]
pub struct RateLimiter(LimiterShared);
impl RateLimiter {
	/// Creates an empty limiter.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a request for `identifier` under `policy` against the wall clock.
	pub fn check(&self, identifier: &str, policy: &RatePolicy) -> RateDecision {
		self.check_at(identifier, policy, OffsetDateTime::now_utc())
	}

	/// Records a request for `identifier` under `policy` at the provided instant.
	///
	/// Exists so tests can pin the clock; [`check`](Self::check) is the wall-clock entry
	/// point. A window expires only when `now` lies strictly past `window_start + window`.
	pub fn check_at(
		&self,
		identifier: &str,
		policy: &RatePolicy,
		now: OffsetDateTime,
	) -> RateDecision {
		let _span = GateSpan::new(KIND, "check").entered();

		obs::record_gate_outcome(KIND, GateOutcome::Attempt);

		let decision = self.evaluate(identifier, policy, now);

		match &decision {
			RateDecision::Allowed { .. } => obs::record_gate_outcome(KIND, GateOutcome::Admitted),
			RateDecision::Limited { .. } => obs::record_gate_outcome(KIND, GateOutcome::Rejected),
		}

		decision
	}

	/// Drops every counter recorded for `identifier`, across all policies.
	pub fn reset(&self, identifier: &str) {
		self.0.lock().entries.retain(|key, _| key.identifier != identifier);
	}

	/// Drops every counter; intended for test isolation.
	pub fn clear_all(&self) {
		let mut state = self.0.lock();

		state.entries.clear();
		state.last_sweep = None;
	}

	/// Number of live counter entries; observability only.
	pub fn tracked(&self) -> usize {
		self.0.lock().entries.len()
	}

	fn evaluate(&self, identifier: &str, policy: &RatePolicy, now: OffsetDateTime) -> RateDecision {
		let mut state = self.0.lock();

		Self::sweep_due(&mut state, now);

		let key = EntryKey { policy: policy.name, identifier: identifier.into() };

		match state.entries.get_mut(&key) {
			// Window still open; strict inequality keeps the boundary instant inside it.
			Some(entry) if now - entry.window_start <= policy.window =>
				if entry.count < policy.max_requests {
					entry.count += 1;

					RateDecision::Allowed {
						remaining: policy.max_requests - entry.count,
						resets_at: entry.window_start + policy.window,
					}
				} else {
					let resets_at = entry.window_start + policy.window;

					RateDecision::Limited { resets_at, retry_after: retry_after(resets_at, now) }
				},
			_ => {
				state.entries.insert(
					key,
					WindowEntry { count: 1, window_start: now, window: policy.window },
				);

				RateDecision::Allowed {
					remaining: policy.max_requests - 1,
					resets_at: now + policy.window,
				}
			},
		}
	}

	fn sweep_due(state: &mut LimiterState, now: OffsetDateTime) {
		match state.last_sweep {
			None => {
				// First observation of the clock; nothing can be stale yet.
				state.last_sweep = Some(now);

				return;
			},
			Some(last) if now - last < SWEEP_INTERVAL => return,
			Some(_) => (),
		}

		state.entries.retain(|_, entry| now - entry.window_start <= entry.window * 2);
		state.last_sweep = Some(now);
	}
}

fn retry_after(resets_at: OffsetDateTime, now: OffsetDateTime) -> Duration {
	// A past `resets_at` clamps to zero through the unsigned conversion.
	let millis = u128::try_from((resets_at - now).whole_milliseconds()).unwrap_or(0);
	let seconds = i64::try_from(millis.div_ceil(1_000)).unwrap_or(i64::MAX);

	Duration::seconds(seconds)
}
