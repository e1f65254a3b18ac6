//! Client-credentials token acquisition against the Azure AD v1 token endpoint.
//!
//! [`AadTokenFetcher`] performs exactly one form-encoded POST per call and never retries. The
//! response is parsed explicitly because the v1 endpoint reports `expires_in`, `expires_on`, and
//! `not_before` as decimal strings, which generic OAuth2 token-response types refuse.

// crates.io
use oauth2::http::Method;
use serde::{Deserializer, de::Error as _};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Audience, Credentials},
	codec, config,
	error::{ConfigError, HttpResponseError},
	http::{self, StoreHttpClient},
	obs::{self, OpKind, OpOutcome, OpSpan},
};
#[cfg(feature = "reqwest")] use crate::{config::StoreConfig, http::ReqwestHttpClient};

/// Boxed future resolving to an [`AccessToken`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

/// Source of fresh tokens for an audience.
pub trait TokenFetcher
where
	Self: Send + Sync,
{
	/// Acquires a new token for `audience`; the result is never served from a cache.
	fn fetch<'a>(&'a self, audience: &'a Audience) -> TokenFuture<'a>;
}

/// [`TokenFetcher`] that runs the client-credentials grant for the configured application.
pub struct AadTokenFetcher<C>
where
	C: ?Sized + StoreHttpClient,
{
	token_endpoint: Url,
	credentials: Credentials,
	http_client: Arc<C>,
}
impl<C> AadTokenFetcher<C>
where
	C: ?Sized + StoreHttpClient,
{
	/// Creates a fetcher posting to `{authority}/{tenant}/oauth2/token`.
	pub fn new(
		authority: &Url,
		credentials: Credentials,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let token_endpoint =
			config::endpoint(authority, "authority", [credentials.tenant.as_ref(), "oauth2", "token"])?;

		Ok(Self { token_endpoint, credentials, http_client: http_client.into() })
	}

	/// Token endpoint every fetch posts to.
	pub fn token_endpoint(&self) -> &Url {
		&self.token_endpoint
	}

	/// Client-credentials form body for `audience`.
	fn form_body(&self, audience: &Audience) -> String {
		form_urlencoded::Serializer::new(String::new())
			.append_pair("grant_type", "client_credentials")
			.append_pair("client_id", &self.credentials.client_id)
			.append_pair("client_secret", self.credentials.client_secret().expose())
			.append_pair("resource", audience)
			.finish()
	}

	async fn fetch_now(&self, audience: &Audience) -> Result<AccessToken> {
		let request = http::build_request(
			Method::POST,
			self.token_endpoint.as_str(),
			[("Content-Type", "application/x-www-form-urlencoded"), ("Accept", "application/json")],
			self.form_body(audience).into_bytes(),
		)?;
		let issued_at = OffsetDateTime::now_utc();
		let response = http::send(self.http_client.as_ref(), request).await?;
		let status = response.status();

		if !http::is_success(status) {
			let reason = status.canonical_reason().unwrap_or("Unknown");

			return Err(HttpResponseError::new(
				format!("Unable to acquire access token for {audience} : {reason}"),
				status.as_u16(),
				response.body(),
			)
			.into());
		}

		let wire = codec::decode::<TokenEndpointResponse>(response.body(), "TokenEndpointResponse")?;

		wire.into_token(audience, issued_at)
	}
}
#[cfg(feature = "reqwest")]
impl AadTokenFetcher<ReqwestHttpClient> {
	/// Creates a fetcher using the authority and timeout from `config`.
	pub fn from_config(config: &StoreConfig, credentials: Credentials) -> Result<Self> {
		let http_client = ReqwestHttpClient::from_config(config)?;

		Self::new(&config.authority_url()?, credentials, http_client)
	}
}
impl<C> TokenFetcher for AadTokenFetcher<C>
where
	C: ?Sized + StoreHttpClient,
{
	fn fetch<'a>(&'a self, audience: &'a Audience) -> TokenFuture<'a> {
		const KIND: OpKind = OpKind::TokenFetch;

		Box::pin(async move {
			let span = OpSpan::new(KIND, "fetch");

			obs::record_op_outcome(KIND, OpOutcome::Attempt);

			obs::record_result(KIND, span.instrument(self.fetch_now(audience)).await)
		})
	}
}
impl<C> Debug for AadTokenFetcher<C>
where
	C: ?Sized + StoreHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AadTokenFetcher")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("credentials", &self.credentials)
			.finish()
	}
}

/// Azure AD v1 token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
	access_token: String,
	#[serde(default)]
	token_type: Option<String>,
	#[serde(default, deserialize_with = "lenient_seconds")]
	expires_in: Option<i64>,
	#[serde(default, deserialize_with = "lenient_seconds")]
	expires_on: Option<i64>,
	#[serde(default, deserialize_with = "lenient_seconds")]
	not_before: Option<i64>,
	#[serde(default)]
	resource: Option<String>,
}
impl TokenEndpointResponse {
	fn into_token(self, requested: &Audience, issued_at: OffsetDateTime) -> Result<AccessToken> {
		let audience = self
			.resource
			.as_deref()
			.filter(|resource| !resource.is_empty())
			.and_then(|resource| Audience::new(resource).ok())
			.unwrap_or_else(|| requested.clone());
		let mut builder =
			AccessToken::builder(audience).access_token(self.access_token).issued_at(issued_at);

		builder = match (self.expires_in, self.expires_on) {
			(Some(seconds), _) if seconds <= 0 =>
				return Err(ConfigError::NonPositiveExpiresIn.into()),
			(Some(seconds), _) => builder.expires_in(Duration::seconds(seconds)),
			(None, Some(epoch)) => {
				let expires_at = OffsetDateTime::from_unix_timestamp(epoch)
					.map_err(|_| ConfigError::NonPositiveExpiresIn)?;

				if expires_at <= issued_at {
					return Err(ConfigError::NonPositiveExpiresIn.into());
				}

				builder.expires_at(expires_at)
			},
			(None, None) => return Err(ConfigError::MissingExpiresIn.into()),
		};

		if let Some(token_type) = self.token_type.filter(|value| !value.is_empty()) {
			builder = builder.token_type(token_type);
		}
		if let Some(not_before) =
			self.not_before.and_then(|epoch| OffsetDateTime::from_unix_timestamp(epoch).ok())
		{
			builder = builder.not_before(not_before);
		}

		builder.build().map_err(|e| ConfigError::from(e).into())
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
	Number(i64),
	Text(String),
}

/// Accepts seconds encoded either as a JSON number or as a decimal string.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<NumberOrString>::deserialize(deserializer)? {
		None => Ok(None),
		Some(NumberOrString::Number(value)) => Ok(Some(value)),
		Some(NumberOrString::Text(text)) if text.trim().is_empty() => Ok(None),
		Some(NumberOrString::Text(text)) => text
			.trim()
			.parse()
			.map(Some)
			.map_err(|e| D::Error::custom(format!("invalid seconds value {text:?}: {e}"))),
	}
}
