//! HMAC-signed compact grant tokens.
//!
//! A token is three unpadded base64url segments, `header.payload.signature`, where the
//! signature is HMAC-SHA256 over `header.payload`. Verification recomputes the signature
//! before touching the payload and compares the encoded forms in constant time, so no
//! unauthenticated JSON is ever parsed. Possession of the signing secret is the only trust
//! anchor: there is no revocation list, and expiry is the sole invalidation mechanism.

pub mod claims;
pub use claims::{TOKEN_VERSION, TokenClaims, TokenHeader};

pub mod secret;
pub use secret::SigningSecret;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
// self
use crate::{
	_prelude::*,
	obs::{self, GateKind, GateOutcome, GateSpan},
};

const KIND: GateKind = GateKind::Token;

type HmacSha256 = Hmac<Sha256>;

/// Errors raised while issuing a token. Verification never errors; it returns a [`Verdict`].
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// The signing secret must not be empty.
	#[error("Signing secret cannot be empty.")]
	EmptySecret,
	/// A token segment could not be serialized to JSON.
	#[error("Token segment could not be encoded.")]
	Encode(#[from] serde_json::Error),
}

/// Issue-side description of the grant to sign. Every field is explicit; the crate supplies
/// no defaults for credential material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantRequest {
	/// Subject identifier the grant is issued for.
	pub subject: String,
	/// Human-readable purpose label.
	pub label: String,
	/// Client fingerprint bound to the grant.
	pub fingerprint: String,
	/// Advisory use budget embedded in the claims.
	pub remaining_uses: u32,
	/// Validity window; clamped to at least one second.
	pub ttl: Duration,
}
impl GrantRequest {
	/// Creates a grant description for the given subject/label/fingerprint tuple.
	pub fn new(
		subject: impl Into<String>,
		label: impl Into<String>,
		fingerprint: impl Into<String>,
		remaining_uses: u32,
		ttl: Duration,
	) -> Self {
		Self {
			subject: subject.into(),
			label: label.into(),
			fingerprint: fingerprint.into(),
			remaining_uses,
			ttl,
		}
	}
}

/// Why a token failed verification.
///
/// Callers treat every variant identically (refuse the request); the split exists for
/// diagnostics and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
	/// Not exactly three non-empty `.`-separated segments.
	InvalidFormat,
	/// Recomputed signature does not match the third segment.
	BadSignature,
	/// Payload failed to decode, parse, or carries an unexpected version.
	InvalidPayload,
	/// Claims parsed but the expiry instant has passed.
	Expired,
}
impl RejectReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RejectReason::InvalidFormat => "invalid_format",
			RejectReason::BadSignature => "bad_signature",
			RejectReason::InvalidPayload => "invalid_payload",
			RejectReason::Expired => "expired",
		}
	}
}
impl Display for RejectReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome of [`verify`]; rejection is data, not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
	/// Signature and claims check out; the parsed claims are returned.
	Valid(TokenClaims),
	/// The token must be refused for the given reason.
	Rejected(RejectReason),
}
impl Verdict {
	/// Returns true when the token passed every check.
	pub fn is_valid(&self) -> bool {
		matches!(self, Verdict::Valid(_))
	}

	/// Returns the parsed claims of a valid token.
	pub fn claims(&self) -> Option<&TokenClaims> {
		match self {
			Verdict::Valid(claims) => Some(claims),
			Verdict::Rejected(_) => None,
		}
	}

	/// Returns the rejection reason of a refused token.
	pub fn reason(&self) -> Option<RejectReason> {
		match self {
			Verdict::Valid(_) => None,
			Verdict::Rejected(reason) => Some(*reason),
		}
	}
}

/// Issues a signed token for the grant at the current instant.
pub fn issue(secret: &SigningSecret, grant: &GrantRequest) -> Result<String, TokenError> {
	issue_at(secret, grant, OffsetDateTime::now_utc())
}

/// Issues a signed token for the grant at the provided instant.
///
/// Exists so tests can pin the clock; [`issue`] is the wall-clock entry point.
pub fn issue_at(
	secret: &SigningSecret,
	grant: &GrantRequest,
	issued_at: OffsetDateTime,
) -> Result<String, TokenError> {
	let _span = GateSpan::new(KIND, "issue").entered();

	obs::record_gate_outcome(KIND, GateOutcome::Attempt);

	let result = encode_token(secret, grant, issued_at);

	match &result {
		Ok(_) => obs::record_gate_outcome(KIND, GateOutcome::Admitted),
		Err(_) => obs::record_gate_outcome(KIND, GateOutcome::Rejected),
	}

	result
}

/// Verifies a token against the secret at the current instant.
pub fn verify(secret: &SigningSecret, token: &str) -> Verdict {
	verify_at(secret, token, OffsetDateTime::now_utc())
}

/// Verifies a token against the secret at the provided instant.
///
/// Checks run in a fixed order: segment shape, then signature, then payload parse and
/// version, then expiry. A token is valid strictly before its `exp` instant.
pub fn verify_at(secret: &SigningSecret, token: &str, now: OffsetDateTime) -> Verdict {
	let _span = GateSpan::new(KIND, "verify").entered();

	obs::record_gate_outcome(KIND, GateOutcome::Attempt);

	let verdict = check_token(secret, token, now);

	match &verdict {
		Verdict::Valid(_) => obs::record_gate_outcome(KIND, GateOutcome::Admitted),
		Verdict::Rejected(_) => obs::record_gate_outcome(KIND, GateOutcome::Rejected),
	}

	verdict
}

fn encode_token(
	secret: &SigningSecret,
	grant: &GrantRequest,
	issued_at: OffsetDateTime,
) -> Result<String, TokenError> {
	let iat = issued_at.unix_timestamp();
	let exp = iat + grant.ttl.whole_seconds().max(1);
	let claims = TokenClaims {
		v: TOKEN_VERSION,
		sub: grant.subject.clone(),
		label: grant.label.clone(),
		fp: grant.fingerprint.clone(),
		remaining: grant.remaining_uses,
		iat,
		exp,
	};
	let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&TokenHeader::hs256())?);
	let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
	let signature_b64 = sign(secret, &header_b64, &payload_b64);

	Ok(format!("{header_b64}.{payload_b64}.{signature_b64}"))
}

fn check_token(secret: &SigningSecret, token: &str, now: OffsetDateTime) -> Verdict {
	let mut segments = token.split('.');
	let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
		(segments.next(), segments.next(), segments.next(), segments.next())
	else {
		return Verdict::Rejected(RejectReason::InvalidFormat);
	};

	if header_b64.is_empty() || payload_b64.is_empty() || signature_b64.is_empty() {
		return Verdict::Rejected(RejectReason::InvalidFormat);
	}

	// The signature segment is attacker-controlled; compare the encoded forms in constant time.
	let expected_b64 = sign(secret, header_b64, payload_b64);

	if !bool::from(expected_b64.as_bytes().ct_eq(signature_b64.as_bytes())) {
		return Verdict::Rejected(RejectReason::BadSignature);
	}

	let payload = match URL_SAFE_NO_PAD.decode(payload_b64) {
		Ok(bytes) => bytes,
		Err(e) => {
			obs::note_rejection(KIND, RejectReason::InvalidPayload.as_str(), &e);

			return Verdict::Rejected(RejectReason::InvalidPayload);
		},
	};
	let mut deserializer = serde_json::Deserializer::from_slice(&payload);
	let claims: TokenClaims = match serde_path_to_error::deserialize(&mut deserializer) {
		Ok(claims) => claims,
		Err(e) => {
			obs::note_rejection(KIND, RejectReason::InvalidPayload.as_str(), &e);

			return Verdict::Rejected(RejectReason::InvalidPayload);
		},
	};

	// The payload must be exactly one JSON document.
	if deserializer.end().is_err() {
		return Verdict::Rejected(RejectReason::InvalidPayload);
	}
	if claims.v != TOKEN_VERSION {
		return Verdict::Rejected(RejectReason::InvalidPayload);
	}
	if now.unix_timestamp() >= claims.exp {
		return Verdict::Rejected(RejectReason::Expired);
	}

	Verdict::Valid(claims)
}

fn sign(secret: &SigningSecret, header_b64: &str, payload_b64: &str) -> String {
	let mut mac = HmacSha256::new_from_slice(secret.expose().as_bytes())
		.expect("HMAC accepts keys of any length.");

	mac.update(header_b64.as_bytes());
	mac.update(b".");
	mac.update(payload_b64.as_bytes());

	URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn anchor() -> OffsetDateTime {
		datetime!(2025-01-01 00:00:00 UTC)
	}

	fn test_secret() -> SigningSecret {
		SigningSecret::new("correct horse battery staple").expect("Secret literal is non-empty.")
	}

	fn test_grant() -> GrantRequest {
		GrantRequest::new("u1", "regrade", "fp-abc123", 3, Duration::seconds(60))
	}

	fn flip_last_char(token: &str) -> String {
		let mut chars: Vec<char> = token.chars().collect();
		let last = chars.last_mut().expect("Token cannot be empty.");

		*last = if *last == 'A' { 'B' } else { 'A' };

		chars.into_iter().collect()
	}

	fn forge_payload(secret: &SigningSecret, payload_json: &str) -> String {
		let header_b64 = URL_SAFE_NO_PAD
			.encode(serde_json::to_vec(&TokenHeader::hs256()).expect("Header serializes."));
		let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json.as_bytes());
		let signature_b64 = sign(secret, &header_b64, &payload_b64);

		format!("{header_b64}.{payload_b64}.{signature_b64}")
	}

	#[test]
	fn issue_then_verify_round_trips() {
		let secret = test_secret();
		let token =
			issue_at(&secret, &test_grant(), anchor()).expect("Failed to issue the token.");

		assert_eq!(token.split('.').count(), 3);

		let verdict = verify_at(&secret, &token, anchor());
		let claims = verdict.claims().expect("Freshly issued token must verify.");

		assert_eq!(claims.v, TOKEN_VERSION);
		assert_eq!(claims.sub, "u1");
		assert_eq!(claims.label, "regrade");
		assert_eq!(claims.fp, "fp-abc123");
		assert_eq!(claims.remaining, 3);
		assert_eq!(claims.iat, anchor().unix_timestamp());
		assert_eq!(claims.exp, claims.iat + 60);
	}

	#[test]
	fn wall_clock_entry_points_round_trip() {
		let secret = test_secret();
		let token = issue(&secret, &test_grant()).expect("Failed to issue the token.");

		assert!(verify(&secret, &token).is_valid());
	}

	#[test]
	fn tampering_with_any_signature_character_is_rejected() {
		let secret = test_secret();
		let token =
			issue_at(&secret, &test_grant(), anchor()).expect("Failed to issue the token.");
		let signature_offset =
			token.rfind('.').expect("Issued tokens contain two separators.") + 1;

		for index in signature_offset..token.len() {
			let mut tampered: Vec<u8> = token.as_bytes().to_vec();

			tampered[index] = if tampered[index] == b'A' { b'B' } else { b'A' };

			let tampered = String::from_utf8(tampered).expect("Flipped byte is ASCII.");

			assert_eq!(
				verify_at(&secret, &tampered, anchor()),
				Verdict::Rejected(RejectReason::BadSignature),
				"flipping signature byte {index} must invalidate the token",
			);
		}
	}

	#[test]
	fn wrong_secret_is_rejected() {
		let token = issue_at(&test_secret(), &test_grant(), anchor())
			.expect("Failed to issue the token.");
		let other = SigningSecret::new("some-other-secret").expect("Secret literal is non-empty.");

		assert_eq!(
			verify_at(&other, &token, anchor()),
			Verdict::Rejected(RejectReason::BadSignature),
		);
	}

	#[test]
	fn expired_token_is_rejected() {
		let secret = test_secret();
		let grant = GrantRequest::new("u1", "regrade", "fp-abc123", 1, Duration::seconds(1));
		let token = issue_at(&secret, &grant, anchor()).expect("Failed to issue the token.");

		// Valid strictly before `exp`; the boundary instant itself is already expired.
		assert!(verify_at(&secret, &token, anchor()).is_valid());
		assert_eq!(
			verify_at(&secret, &token, anchor() + Duration::seconds(1)),
			Verdict::Rejected(RejectReason::Expired),
		);
		assert_eq!(
			verify_at(&secret, &token, anchor() + Duration::seconds(2)),
			Verdict::Rejected(RejectReason::Expired),
		);
	}

	#[test]
	fn signature_check_precedes_expiry() {
		let secret = test_secret();
		let grant = GrantRequest::new("u1", "regrade", "fp-abc123", 1, Duration::seconds(1));
		let token = issue_at(&secret, &grant, anchor()).expect("Failed to issue the token.");
		let tampered = flip_last_char(&token);

		assert_eq!(
			verify_at(&secret, &tampered, anchor() + Duration::hours(1)),
			Verdict::Rejected(RejectReason::BadSignature),
		);
	}

	#[test]
	fn malformed_shapes_are_rejected() {
		let secret = test_secret();

		for token in ["", "a", "a.b", "a.b.c.d", "..sig", "a.b."] {
			assert_eq!(
				verify_at(&secret, token, anchor()),
				Verdict::Rejected(RejectReason::InvalidFormat),
				"shape `{token}` must be rejected as invalid_format",
			);
		}
	}

	#[test]
	fn unparseable_payload_is_rejected() {
		let secret = test_secret();

		let complete_plus_trailing =
			r#"{"v":1,"sub":"u1","label":"l","fp":"f","remaining":1,"iat":0,"exp":4102444800}x"#;

		for payload in ["not json", "{\"v\":1}", "[1,2,3]", complete_plus_trailing] {
			let token = forge_payload(&secret, payload);

			assert_eq!(
				verify_at(&secret, &token, anchor()),
				Verdict::Rejected(RejectReason::InvalidPayload),
			);
		}
	}

	#[test]
	fn unknown_version_is_rejected() {
		let secret = test_secret();
		let token = forge_payload(
			&secret,
			r#"{"v":2,"sub":"u1","label":"l","fp":"f","remaining":1,"iat":0,"exp":4102444800}"#,
		);

		assert_eq!(
			verify_at(&secret, &token, anchor()),
			Verdict::Rejected(RejectReason::InvalidPayload),
		);
	}

	#[test]
	fn ttl_clamps_to_one_second() {
		let secret = test_secret();

		for ttl in [Duration::ZERO, Duration::seconds(-5)] {
			let grant = GrantRequest::new("u1", "regrade", "fp-abc123", 1, ttl);
			let token = issue_at(&secret, &grant, anchor()).expect("Failed to issue the token.");
			let verdict = verify_at(&secret, &token, anchor());
			let claims = verdict.claims().expect("Clamped token must still verify at issue.");

			assert_eq!(claims.exp, claims.iat + 1);
		}
	}

	#[test]
	fn remaining_uses_is_advisory_only() {
		let secret = test_secret();
		let grant = GrantRequest::new("u1", "regrade", "fp-abc123", 0, Duration::seconds(60));
		let token = issue_at(&secret, &grant, anchor()).expect("Failed to issue the token.");
		let verdict = verify_at(&secret, &token, anchor());

		// A zero budget still verifies; usage accounting belongs to the caller.
		assert_eq!(verdict.claims().map(|c| c.remaining), Some(0));
	}

	#[test]
	fn reject_reason_labels_are_stable() {
		assert_eq!(RejectReason::InvalidFormat.as_str(), "invalid_format");
		assert_eq!(RejectReason::BadSignature.as_str(), "bad_signature");
		assert_eq!(RejectReason::InvalidPayload.as_str(), "invalid_payload");
		assert_eq!(RejectReason::Expired.as_str(), "expired");
	}
}
