//! Optional observability helpers for admission gates.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `floodgate.gate` with the `gate` (primitive)
//!   and `stage` (call site) fields, plus debug events for rejected admissions.
//! - Enable `metrics` to increment the `floodgate_gate_total` counter for every
//!   attempt/admission/rejection, labeled by `gate` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Admission gates observed by this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateKind {
	/// Bounded job queue admissions.
	JobQueue,
	/// Fixed-window rate limit checks.
	RateLimit,
	/// Grant token issue/verify operations.
	Token,
}
impl GateKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GateKind::JobQueue => "job_queue",
			GateKind::RateLimit => "rate_limit",
			GateKind::Token => "token",
		}
	}
}
impl Display for GateKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each gate pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateOutcome {
	/// Entry to a gate operation.
	Attempt,
	/// The request cleared the gate.
	Admitted,
	/// The request was turned away.
	Rejected,
}
impl GateOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GateOutcome::Attempt => "attempt",
			GateOutcome::Admitted => "admitted",
			GateOutcome::Rejected => "rejected",
		}
	}
}
impl Display for GateOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
