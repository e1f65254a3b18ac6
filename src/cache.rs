//! Token cache contract and the built-in cache backends.
//!
//! A cache entry carries two independent lifetimes: the store TTL passed to
//! [`TokenCache::set`] decides how long the backend physically retains the value, while the
//! token's own expiry decides how long it is semantically usable. The manager passes the token's
//! remaining lifetime as the TTL, so the two normally coincide.

pub mod file;
pub mod memory;
pub mod noop;

pub use file::FileCache;
pub use memory::MemoryCache;
pub use noop::NoopCache;

// self
use crate::{_prelude::*, auth::AccessToken};

/// Boxed future returned by [`TokenCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Key/value capability used by the token manager, keyed by audience.
///
/// `get` never fails for a missing key; it resolves to `None`. `set` always overwrites.
pub trait TokenCache<V = AccessToken>
where
	Self: Send + Sync,
	V: 'static + Send,
{
	/// Returns the retained value for `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<V>>;

	/// Stores `value` under `key`, retaining it for `ttl`.
	fn set<'a>(&'a self, key: &'a str, value: V, ttl: Duration) -> CacheFuture<'a, ()>;
}

/// Error type produced by [`TokenCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Instant until which an entry stored at `now` with `ttl` is retained; `None` means forever.
pub(crate) fn retain_until(now: OffsetDateTime, ttl: Duration) -> Option<OffsetDateTime> {
	now.checked_add(ttl)
}

/// Returns `true` while an entry retained until `until` is still live at `now`.
pub(crate) fn is_retained(until: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
	until.is_none_or(|until| until > now)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn zero_ttl_is_not_retained() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		assert!(!is_retained(retain_until(now, Duration::ZERO), now));
		assert!(is_retained(retain_until(now, Duration::seconds(1)), now));
		assert!(!is_retained(retain_until(now, Duration::seconds(-5)), now));
	}

	#[test]
	fn overflowing_ttl_retains_forever() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let until = retain_until(now, Duration::MAX);

		assert_eq!(until, None);
		assert!(is_retained(until, now + Duration::weeks(52 * 100)));
	}
}
