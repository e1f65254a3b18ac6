//! Client configuration: endpoints, service identity, timeouts, and refresh/retry policy.

// self
use crate::{
	_prelude::*,
	auth::DEFAULT_FRESHNESS_MARGIN,
	error::ConfigError,
	manager::RefreshMode,
	submissions::RetryPolicy,
};

/// Default Azure AD authority.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
/// Default Collections service base URL.
pub const DEFAULT_COLLECTIONS_BASE: &str = "https://collections.mp.microsoft.com";
/// Default Partner Center (Dev Center) base URL.
pub const DEFAULT_SUBMISSIONS_BASE: &str = "https://manage.devcenter.microsoft.com";
/// `User-Agent` sent when the caller does not identify its service.
pub const DEFAULT_SERVICE_IDENTITY: &str = "UnspecifiedService-Microsoft.StoreServices";
/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(30);

/// Settings shared by the token manager, the Store Services client, and the transport.
///
/// Every field has a default, so partial documents deserialize:
///
/// ```
/// let config: ms_store_services::config::StoreConfig =
/// 	serde_json::from_str(r#"{"service_identity":"Contoso.Fulfillment","request_timeout":10}"#)
/// 		.unwrap();
///
/// assert_eq!(config.request_timeout, time::Duration::seconds(10));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
	/// Azure AD authority; the token endpoint is `{authority}/{tenant}/oauth2/token`.
	pub authority: String,
	/// Collections service base URL.
	pub collections_base: String,
	/// Partner Center base URL; submissions calls go to `{base}/v1.0/my/...`.
	pub submissions_base: String,
	/// Value of the `User-Agent` header sent with every Store Services call.
	pub service_identity: String,
	/// Per-request timeout applied by the transport, in whole seconds when serialized.
	#[serde(with = "seconds")]
	pub request_timeout: Duration,
	/// Window before expiry within which cached tokens are refreshed.
	#[serde(with = "seconds")]
	pub freshness_margin: Duration,
	/// How concurrent cache misses for one audience are coordinated.
	pub refresh_mode: RefreshMode,
	/// Submissions throttling retry policy.
	pub retry: RetryPolicy,
}
impl StoreConfig {
	/// Overrides the Azure AD authority.
	pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
		self.authority = authority.into();

		self
	}

	/// Overrides the Collections base URL.
	pub fn with_collections_base(mut self, base: impl Into<String>) -> Self {
		self.collections_base = base.into();

		self
	}

	/// Overrides the Partner Center base URL.
	pub fn with_submissions_base(mut self, base: impl Into<String>) -> Self {
		self.submissions_base = base.into();

		self
	}

	/// Overrides the `User-Agent` service identity.
	pub fn with_service_identity(mut self, identity: impl Into<String>) -> Self {
		self.service_identity = identity.into();

		self
	}

	/// Overrides the per-request timeout.
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the freshness margin.
	pub fn with_freshness_margin(mut self, margin: Duration) -> Self {
		self.freshness_margin = margin;

		self
	}

	/// Overrides the refresh coordination mode.
	pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
		self.refresh_mode = mode;

		self
	}

	/// Overrides the submissions retry policy.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Checks that every URL parses, durations are sane, and the service identity is present.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.authority_url()?;
		self.collections_url()?;
		self.submissions_url()?;

		if self.request_timeout <= Duration::ZERO {
			return Err(ConfigError::InvalidDuration { field: "request_timeout" });
		}
		if self.freshness_margin.is_negative() {
			return Err(ConfigError::InvalidDuration { field: "freshness_margin" });
		}
		if self.service_identity.trim().is_empty() {
			return Err(ConfigError::MissingServiceIdentity);
		}

		Ok(())
	}

	/// Parsed Azure AD authority.
	pub fn authority_url(&self) -> Result<Url, ConfigError> {
		parse_base("authority", &self.authority)
	}

	/// Parsed Collections base URL.
	pub fn collections_url(&self) -> Result<Url, ConfigError> {
		parse_base("collections_base", &self.collections_base)
	}

	/// Parsed Partner Center base URL.
	pub fn submissions_url(&self) -> Result<Url, ConfigError> {
		parse_base("submissions_base", &self.submissions_base)
	}

	/// Request timeout as a [`std::time::Duration`], falling back to the default when negative.
	pub fn request_timeout_std(&self) -> std::time::Duration {
		std::time::Duration::try_from(self.request_timeout)
			.unwrap_or(std::time::Duration::from_secs(30))
	}
}
impl Default for StoreConfig {
	fn default() -> Self {
		Self {
			authority: DEFAULT_AUTHORITY.into(),
			collections_base: DEFAULT_COLLECTIONS_BASE.into(),
			submissions_base: DEFAULT_SUBMISSIONS_BASE.into(),
			service_identity: DEFAULT_SERVICE_IDENTITY.into(),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			freshness_margin: DEFAULT_FRESHNESS_MARGIN,
			refresh_mode: RefreshMode::default(),
			retry: RetryPolicy::default(),
		}
	}
}

/// Appends path `segments` to `base`, percent-encoding each segment.
pub(crate) fn endpoint<'s, I>(base: &Url, field: &'static str, segments: I) -> Result<Url, ConfigError>
where
	I: IntoIterator<Item = &'s str>,
{
	let mut url = base.clone();

	url.path_segments_mut()
		.map_err(|_| ConfigError::InvalidUrl {
			field,
			source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
		})?
		.pop_if_empty()
		.extend(segments);

	Ok(url)
}

fn parse_base(field: &'static str, value: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(value).map_err(|source| ConfigError::InvalidUrl { field, source })?;

	if url.cannot_be_a_base() {
		return Err(ConfigError::InvalidUrl {
			field,
			source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
		});
	}

	Ok(url)
}

mod seconds {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::seconds)
	}
}
