//! Redacting wrapper for the token signing secret.

// self
use crate::{_prelude::*, token::TokenError};

/// Redacted signing secret keeping key material out of logs and error chains.
///
/// The crate never sources or defaults this value; callers load it from their own secret
/// store and hand it in per call.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(String);
impl SigningSecret {
	/// Wraps a secret string, rejecting empty input.
	pub fn new(value: impl Into<String>) -> Result<Self, TokenError> {
		let value = value.into();

		if value.is_empty() {
			return Err(TokenError::EmptySecret);
		}

		Ok(Self(value))
	}

	/// Returns the raw key material. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for SigningSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SigningSecret").field(&"<redacted>").finish()
	}
}
impl Display for SigningSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
