//! Immutable access token values, freshness math, and builders.

// self
use crate::{
	_prelude::*,
	auth::{Audience, token::secret::Secret},
};

/// Default window before expiry within which a cached token is refreshed proactively.
pub const DEFAULT_FRESHNESS_MARGIN: Duration = Duration::minutes(5);

/// Errors produced by [`AccessTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AccessTokenBuilderError {
	/// Issued when no bearer value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the expiry does not fall strictly after the issue instant.
	#[error("Expiry must be after the issued-at instant.")]
	ExpiryNotAfterIssue,
	/// Issued when the relative expiry overflows the representable calendar range.
	#[error("Expiry falls outside the supported date range.")]
	ExpiryOutOfRange,
}

/// One issued bearer token for a single audience.
///
/// Tokens are value objects: a refresh replaces the cached token wholesale instead of mutating
/// it.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
	/// Bearer value; callers must avoid logging it.
	pub token: Secret,
	/// Audience the token was issued for.
	pub audience: Audience,
	/// Token type reported by the identity provider (normally `Bearer`).
	pub token_type: Option<String>,
	/// Instant the token was received.
	pub issued_at: OffsetDateTime,
	/// Instant the identity provider stops accepting the token.
	pub expires_at: OffsetDateTime,
	/// Instant before which the token must not be used, when reported.
	pub not_before: Option<OffsetDateTime>,
}
impl AccessToken {
	/// Returns a builder for the provided audience.
	pub fn builder(audience: Audience) -> AccessTokenBuilder {
		AccessTokenBuilder::new(audience)
	}

	/// Returns `true` while `expires_at - margin` is still after `instant`.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		self.expires_at.checked_sub(margin).is_some_and(|refresh_at| refresh_at > instant)
	}

	/// Returns `true` while the token is fresh relative to the current clock.
	pub fn is_fresh(&self, margin: Duration) -> bool {
		self.is_fresh_at(OffsetDateTime::now_utc(), margin)
	}

	/// Returns `true` once `instant` reached the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Remaining lifetime at `instant`, clamped at zero.
	pub fn expires_in_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}

	/// Remaining lifetime relative to the current clock, clamped at zero.
	pub fn expires_in(&self) -> Duration {
		self.expires_in_at(OffsetDateTime::now_utc())
	}

	/// Value for an `Authorization` header.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.token.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("token", &"<redacted>")
			.field("audience", &self.audience)
			.field("token_type", &self.token_type)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("not_before", &self.not_before)
			.finish()
	}
}

/// Builder for [`AccessToken`].
#[derive(Clone, Debug)]
pub struct AccessTokenBuilder {
	audience: Audience,
	token: Option<Secret>,
	token_type: Option<String>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	not_before: Option<OffsetDateTime>,
}
impl AccessTokenBuilder {
	fn new(audience: Audience) -> Self {
		Self {
			audience,
			token: None,
			token_type: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
			not_before: None,
		}
	}

	/// Provides the bearer value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(Secret::new(token));

		self
	}

	/// Records the token type.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Sets the not-before instant.
	pub fn not_before(mut self, instant: OffsetDateTime) -> Self {
		self.not_before = Some(instant);

		self
	}

	/// Consumes the builder and produces an [`AccessToken`].
	///
	/// A relative `expires_in` wins over an absolute `expires_at` when both are set, since it
	/// does not depend on clock agreement with the identity provider.
	pub fn build(self) -> Result<AccessToken, AccessTokenBuilderError> {
		let token = self.token.ok_or(AccessTokenBuilderError::MissingAccessToken)?;

		if token.is_empty() {
			return Err(AccessTokenBuilderError::MissingAccessToken);
		}

		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_in, self.expires_at) {
			(Some(delta), _) =>
				issued_at.checked_add(delta).ok_or(AccessTokenBuilderError::ExpiryOutOfRange)?,
			(None, Some(instant)) => instant,
			(None, None) => return Err(AccessTokenBuilderError::MissingExpiry),
		};

		if expires_at <= issued_at {
			return Err(AccessTokenBuilderError::ExpiryNotAfterIssue);
		}

		Ok(AccessToken {
			token,
			audience: self.audience,
			token_type: self.token_type,
			issued_at,
			expires_at,
			not_before: self.not_before,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn token(issued: OffsetDateTime, expires: OffsetDateTime) -> AccessToken {
		AccessToken::builder(Audience::service())
			.access_token("access")
			.issued_at(issued)
			.expires_at(expires)
			.build()
			.expect("Token fixture should build.")
	}

	#[test]
	fn freshness_honors_margin() {
		let record = token(
			macros::datetime!(2025-01-01 00:00 UTC),
			macros::datetime!(2025-01-01 01:00 UTC),
		);

		assert!(record.is_fresh_at(macros::datetime!(2025-01-01 00:54 UTC), DEFAULT_FRESHNESS_MARGIN));
		assert!(!record.is_fresh_at(macros::datetime!(2025-01-01 00:55 UTC), DEFAULT_FRESHNESS_MARGIN));
		assert!(!record.is_fresh_at(macros::datetime!(2025-01-01 02:00 UTC), DEFAULT_FRESHNESS_MARGIN));
		assert!(record.is_fresh_at(macros::datetime!(2025-01-01 00:59 UTC), Duration::ZERO));
	}

	#[test]
	fn builder_handles_relative_expiry() {
		let record = AccessToken::builder(Audience::collections())
			.access_token("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Builder should support relative expiry calculations.");

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 00:30 UTC));
		assert_eq!(
			record.expires_in_at(macros::datetime!(2025-01-01 00:10 UTC)),
			Duration::minutes(20)
		);
		assert_eq!(record.expires_in_at(macros::datetime!(2025-01-01 03:00 UTC)), Duration::ZERO);
		assert!(record.is_expired_at(macros::datetime!(2025-01-01 00:30 UTC)));
	}

	#[test]
	fn builder_rejects_invalid_lifetimes() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let err = AccessToken::builder(Audience::service())
			.access_token("secret")
			.issued_at(issued)
			.expires_at(issued)
			.build()
			.expect_err("Expiry equal to issue must be rejected.");

		assert_eq!(err, AccessTokenBuilderError::ExpiryNotAfterIssue);

		let err = AccessToken::builder(Audience::service())
			.access_token("secret")
			.build()
			.expect_err("Missing expiry must be rejected.");

		assert_eq!(err, AccessTokenBuilderError::MissingExpiry);

		let err = AccessToken::builder(Audience::service())
			.access_token("")
			.expires_in(Duration::hours(1))
			.build()
			.expect_err("Empty bearer values must be rejected.");

		assert_eq!(err, AccessTokenBuilderError::MissingAccessToken);
	}

	#[test]
	fn extreme_lifetimes_and_margins_do_not_overflow() {
		let err = AccessToken::builder(Audience::service())
			.access_token("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::seconds(99_999_999_999_999))
			.build()
			.expect_err("Lifetimes past the calendar range must be rejected.");

		assert_eq!(err, AccessTokenBuilderError::ExpiryOutOfRange);

		let record = token(
			macros::datetime!(2025-01-01 00:00 UTC),
			macros::datetime!(2025-01-01 01:00 UTC),
		);

		assert!(!record.is_fresh_at(macros::datetime!(2025-01-01 00:00 UTC), Duration::MAX));
	}

	#[test]
	fn debug_redacts_bearer() {
		let record = token(OffsetDateTime::now_utc(), OffsetDateTime::now_utc() + Duration::hours(1));
		let rendered = format!("{record:?}");

		assert!(!rendered.contains("access\""));
		assert!(rendered.contains("<redacted>"));
		assert_eq!(record.bearer_header(), "Bearer access");
	}
}
