//! Wire-format structures signed into compact grant tokens.

// self
use crate::_prelude::*;

/// Payload version stamped into every issued token.
pub const TOKEN_VERSION: u8 = 1;

/// Fixed JOSE-style header describing how the token is signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TokenHeader {
	/// Signature algorithm label.
	pub alg: &'static str,
	/// Token type label.
	pub typ: &'static str,
}
impl TokenHeader {
	/// Returns the HS256 header carried by every issued token.
	pub const fn hs256() -> Self {
		Self { alg: "HS256", typ: "JWT" }
	}
}

/// Signed claims carried by a grant token.
///
/// Field names are the wire names; the payload segment is exactly this structure as JSON.
/// Nothing here is encrypted - the token claims integrity and authenticity, not secrecy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
	/// Payload format version; must equal [`TOKEN_VERSION`].
	pub v: u8,
	/// Subject identifier the grant was issued for.
	pub sub: String,
	/// Human-readable purpose label.
	pub label: String,
	/// Client fingerprint bound to the grant.
	pub fp: String,
	/// Advisory number of uses remaining; surfaced to callers, never enforced here.
	pub remaining: u32,
	/// Issue instant (Unix seconds).
	pub iat: i64,
	/// Expiry instant (Unix seconds); the token is valid strictly before this.
	pub exp: i64,
}
