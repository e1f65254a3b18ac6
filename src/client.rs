//! Authorized Store Services client for Collections and User Store ID calls.
//!
//! [`StoreServicesClient`] attaches the service access token, the `User-Agent` service identity,
//! and a JSON content type to each POST. Statuses outside `[200, 300)` become
//! [`HttpResponseError`]s whose message names the URI, request body, and status; consume failures
//! are refined into [`ConsumeDomainError`] when the service describes them.

// crates.io
use oauth2::http::Method;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, UserStoreIdClaims, UserStoreIdRefreshRequest, UserStoreIdRefreshResponse},
	codec, config,
	collections::{
		CollectionsConsumeErrorResponse, CollectionsConsumeRequest, CollectionsConsumeResponse,
		CollectionsQueryRequest, CollectionsQueryResponse,
	},
	config::StoreConfig,
	error::{ConsumeDomainError, HttpResponseError},
	http::{self, HttpResponse, StoreHttpClient},
	manager::AccessTokenProvider,
	obs::{self, OpKind, OpOutcome, OpSpan},
};
#[cfg(feature = "reqwest")]
use crate::{auth::Credentials, cache::TokenCache, http::ReqwestHttpClient, manager::AudienceTokenManager};

const FIELD: &str = "collections_base";

/// Client for the Microsoft Store Services that authenticates every call with the service token.
pub struct StoreServicesClient<C>
where
	C: ?Sized + StoreHttpClient,
{
	tokens: Arc<dyn AccessTokenProvider>,
	http_client: Arc<C>,
	service_identity: String,
	query_endpoint: Url,
	consume_endpoint: Url,
}
impl<C> StoreServicesClient<C>
where
	C: ?Sized + StoreHttpClient,
{
	/// Creates a client using the Collections base URL and service identity from `config`.
	pub fn new(
		config: &StoreConfig,
		tokens: Arc<dyn AccessTokenProvider>,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let base = config.collections_url()?;
		let query_endpoint =
			config::endpoint(&base, FIELD, ["v8.0", "collections", "b2bLicensePreview"])?;
		let consume_endpoint = config::endpoint(&base, FIELD, ["v8.0", "collections", "consume"])?;
		let service_identity = if config.service_identity.trim().is_empty() {
			config::DEFAULT_SERVICE_IDENTITY.to_owned()
		} else {
			config.service_identity.clone()
		};

		Ok(Self {
			tokens,
			http_client: http_client.into(),
			service_identity,
			query_endpoint,
			consume_endpoint,
		})
	}

	/// `User-Agent` value sent with every call.
	pub fn service_identity(&self) -> &str {
		&self.service_identity
	}

	/// Token authorizing Store Services calls.
	pub async fn service_access_token(&self) -> Result<AccessToken> {
		self.tokens.service_access_token().await
	}

	/// Token a client uses to mint a UserCollectionsId.
	pub async fn collections_access_token(&self) -> Result<AccessToken> {
		self.tokens.collections_access_token().await
	}

	/// Token a client uses to mint a UserPurchaseId.
	pub async fn purchase_access_token(&self) -> Result<AccessToken> {
		self.tokens.purchase_access_token().await
	}

	/// POSTs `body` to `uri` with the service token and returns the raw 2xx body.
	///
	/// `extra_headers` are applied after the defaults and replace them on a name match.
	pub async fn issue_request(
		&self,
		uri: &Url,
		body: &str,
		extra_headers: &[(&str, &str)],
	) -> Result<Vec<u8>> {
		let response = self.post(uri, body, extra_headers).await?;
		let status = response.status();

		if !http::is_success(status) {
			return Err(HttpResponseError::new(
				format!(
					"HTTP request {uri} {body} failed with status code {}.",
					status.as_u16()
				),
				status.as_u16(),
				response.body(),
			)
			.into());
		}

		Ok(response.into_body())
	}

	/// Queries the entitlements of the beneficiary named in `request`.
	pub async fn collections_query(
		&self,
		request: &CollectionsQueryRequest,
	) -> Result<CollectionsQueryResponse> {
		const KIND: OpKind = OpKind::CollectionsQuery;

		request.validate()?;

		let body = String::from_utf8_lossy(&codec::encode(request)?).into_owned();
		let span = OpSpan::new(KIND, "collections_query");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		obs::record_result(KIND, span.instrument(self.query_now(&body)).await)
	}

	/// Removes quantity from a consumable balance.
	///
	/// A failed consume whose body carries the service's error payload yields
	/// [`Error::Consume`] with the inner error; an unreadable payload yields a decode error.
	pub async fn collections_consume(
		&self,
		request: &CollectionsConsumeRequest,
	) -> Result<CollectionsConsumeResponse> {
		const KIND: OpKind = OpKind::CollectionsConsume;

		request.validate()?;

		let body = String::from_utf8_lossy(&codec::encode(request)?).into_owned();
		let span = OpSpan::new(KIND, "collections_consume");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		obs::record_result(KIND, span.instrument(self.consume_now(&body)).await)
	}

	/// Exchanges an expired User Store ID for a new one through its refresh URI.
	pub async fn refresh_user_store_id(&self, user_store_id: &str) -> Result<String> {
		const KIND: OpKind = OpKind::UserStoreIdRefresh;

		let claims = UserStoreIdClaims::decode(user_store_id)?;

		if !claims.has_refresh_uri() {
			return Err(Error::invalid_argument("refresh_uri", "User Store ID has no refresh URI"));
		}

		let uri = Url::parse(&claims.refresh_uri)
			.map_err(|e| Error::invalid_argument("refresh_uri", e.to_string()))?;
		let span = OpSpan::new(KIND, "refresh_user_store_id");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		obs::record_result(KIND, span.instrument(self.refresh_now(&uri, user_store_id)).await)
	}

	async fn query_now(&self, body: &str) -> Result<CollectionsQueryResponse> {
		let bytes = self.issue_request(&self.query_endpoint, body, &[]).await?;

		codec::decode(&bytes, "CollectionsQueryResponse")
	}

	async fn consume_now(&self, body: &str) -> Result<CollectionsConsumeResponse> {
		let response = self.post(&self.consume_endpoint, body, &[]).await?;
		let status = response.status();

		if !http::is_success(status) {
			let error = codec::decode::<CollectionsConsumeErrorResponse>(
				response.body(),
				"CollectionsConsumeErrorResponse",
			)?;

			obs::debug_event!(
				status = status.as_u16(),
				code = %error.inner_error.code,
				"Consume rejected."
			);

			return Err(
				ConsumeDomainError { status: status.as_u16(), error: error.inner_error }.into()
			);
		}

		codec::decode(response.body(), "CollectionsConsumeResponse")
	}

	async fn refresh_now(&self, uri: &Url, user_store_id: &str) -> Result<String> {
		let token = self.tokens.service_access_token().await?;
		let body = codec::encode(&UserStoreIdRefreshRequest {
			service_token: token.token.expose().to_owned(),
			user_store_id: user_store_id.to_owned(),
		})?;
		let request = http::build_request(
			Method::POST,
			uri.as_str(),
			[("User-Agent", self.service_identity.as_str()), ("Content-Type", "application/json")],
			body,
		)?;
		let response = http::send(self.http_client.as_ref(), request).await?;
		let status = response.status();

		// The body carries the service token, so it stays out of the message.
		if !http::is_success(status) {
			return Err(HttpResponseError::new(
				format!("User Store ID refresh {uri} failed with status code {}.", status.as_u16()),
				status.as_u16(),
				response.body(),
			)
			.into());
		}

		let refreshed = codec::decode::<UserStoreIdRefreshResponse>(
			response.body(),
			"UserStoreIdRefreshResponse",
		)?;

		Ok(refreshed.user_store_id)
	}

	async fn post(
		&self,
		uri: &Url,
		body: &str,
		extra_headers: &[(&str, &str)],
	) -> Result<HttpResponse> {
		let token = self.tokens.service_access_token().await?;
		let bearer = token.bearer_header();
		let headers = [
			("Authorization", bearer.as_str()),
			("User-Agent", self.service_identity.as_str()),
			("Content-Type", "application/json"),
		]
		.into_iter()
		.chain(extra_headers.iter().copied());
		let request =
			http::build_request(Method::POST, uri.as_str(), headers, body.as_bytes().to_vec())?;

		http::send(self.http_client.as_ref(), request).await
	}
}
#[cfg(feature = "reqwest")]
impl StoreServicesClient<ReqwestHttpClient> {
	/// Builds a client, and the token manager behind it, from configuration and credentials.
	pub fn from_config(
		config: &StoreConfig,
		credentials: Credentials,
		cache: Arc<dyn TokenCache>,
	) -> Result<Self> {
		let manager = AudienceTokenManager::from_config(config, credentials, cache)?;

		Self::new(config, Arc::new(manager), ReqwestHttpClient::from_config(config)?)
	}
}
impl<C> Debug for StoreServicesClient<C>
where
	C: ?Sized + StoreHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StoreServicesClient")
			.field("service_identity", &self.service_identity)
			.field("query_endpoint", &self.query_endpoint.as_str())
			.field("consume_endpoint", &self.consume_endpoint.as_str())
			.finish()
	}
}
