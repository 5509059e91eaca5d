//! Crate-level error types shared across the admission primitives.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by call sites that compose several primitives.
///
/// Rate limiting never appears here: a limited request is a
/// [`RateDecision`](crate::rate_limit::RateDecision) value, not an error.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Job queue admission or settlement failure.
	#[error(transparent)]
	Queue(#[from] crate::queue::QueueError),
	/// Token issuing failure.
	#[error(transparent)]
	Token(#[from] crate::token::TokenError),
}
