//! Admission control for Rust services - bounded job queues, fixed-window rate limits, and
//! HMAC-signed grant passes in one crate built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod error;
pub mod obs;
pub mod queue;
pub mod rate_limit;
pub mod token;

mod _prelude {
	pub use std::{
		collections::{HashMap, VecDeque},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::Result;
}

pub use time;
#[cfg(test)] use color_eyre as _;
