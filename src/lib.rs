//! Async Microsoft Store Services client: audience-scoped client-credential tokens with
//! expiry-aware caching, Collections queries and consumes, and Partner Center add-on submissions.

#![deny(clippy::all, unused_crate_dependencies)]
#![warn(missing_docs)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod codec;
pub mod collections;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod manager;
pub mod obs;
pub mod submissions;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fakes for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use oauth2::http::StatusCode;
	// self
	use crate::{
		auth::{AccessToken, Audience},
		error::ConfigError,
		fetcher::TokenFuture,
		http::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, StoreHttpClient},
		manager::AccessTokenProvider,
	};
	#[cfg(feature = "reqwest")]
	use crate::{
		auth::Credentials,
		cache::{MemoryCache, TokenCache},
		config::StoreConfig,
		fetcher::AadTokenFetcher,
		http::ReqwestHttpClient,
		manager::AudienceTokenManager,
	};

	/// Request captured by [`ScriptedHttpClient`]; header names are lowercased.
	#[derive(Clone, Debug, PartialEq, Eq)]
	pub struct RecordedRequest {
		/// HTTP method.
		pub method: String,
		/// Absolute request URI.
		pub uri: String,
		/// Headers keyed by lowercased name.
		pub headers: BTreeMap<String, String>,
		/// Raw request body.
		pub body: Vec<u8>,
	}
	impl RecordedRequest {
		/// Header value by case-insensitive name.
		pub fn header(&self, name: &str) -> Option<&str> {
			self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
		}
	}

	/// Transport failure reported once the scripted responses run out.
	#[derive(Debug, ThisError)]
	#[error("No scripted response left for {0}.")]
	pub struct ScriptExhausted(pub String);

	#[derive(Debug, Default)]
	struct Script {
		responses: VecDeque<(u16, Vec<u8>)>,
		requests: Vec<RecordedRequest>,
	}

	/// In-process [`StoreHttpClient`] that replays queued responses and records every request.
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedHttpClient {
		script: Arc<Mutex<Script>>,
	}
	impl ScriptedHttpClient {
		/// Queues a response; responses are served in push order.
		pub fn push_response(&self, status: u16, body: impl Into<Vec<u8>>) {
			self.script.lock().responses.push_back((status, body.into()));
		}

		/// Requests received so far, oldest first.
		pub fn requests(&self) -> Vec<RecordedRequest> {
			self.script.lock().requests.clone()
		}
	}
	impl StoreHttpClient for ScriptedHttpClient {
		type Handle = ScriptedHandle;
		type TransportError = ScriptExhausted;

		fn handle(&self) -> Self::Handle {
			ScriptedHandle { script: self.script.clone() }
		}
	}

	/// Handle returned by [`ScriptedHttpClient`].
	#[derive(Debug)]
	pub struct ScriptedHandle {
		script: Arc<Mutex<Script>>,
	}
	impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
		type Error = HttpClientError<ScriptExhausted>;
		type Future =
			Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			let recorded = RecordedRequest {
				method: request.method().to_string(),
				uri: request.uri().to_string(),
				headers: request
					.headers()
					.iter()
					.map(|(name, value)| {
						(name.as_str().to_owned(), value.to_str().unwrap_or_default().to_owned())
					})
					.collect(),
				body: request.body().clone(),
			};
			let target = format!("{} {}", recorded.method, recorded.uri);
			let next = {
				let mut script = self.script.lock();

				script.requests.push(recorded);
				script.responses.pop_front()
			};

			Box::pin(async move {
				let Some((status, body)) = next else {
					return Err(HttpClientError::Reqwest(Box::new(ScriptExhausted(target))));
				};
				let mut response = HttpResponse::new(body);

				*response.status_mut() =
					StatusCode::from_u16(status).expect("Scripted status should be valid.");

				Ok(response)
			})
		}
	}

	/// [`AccessTokenProvider`] that hands out the same bearer value for every audience.
	#[derive(Clone, Debug)]
	pub struct StaticTokenProvider {
		token: String,
	}
	impl StaticTokenProvider {
		/// Provider returning `token`, valid for one hour from each call.
		pub fn new(token: impl Into<String>) -> Self {
			Self { token: token.into() }
		}
	}
	impl AccessTokenProvider for StaticTokenProvider {
		fn access_token<'a>(&'a self, audience: &'a Audience) -> TokenFuture<'a> {
			Box::pin(async move {
				AccessToken::builder(audience.clone())
					.access_token(self.token.clone())
					.token_type("Bearer")
					.expires_in(Duration::hours(1))
					.build()
					.map_err(|e| ConfigError::from(e).into())
			})
		}
	}

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Points every endpoint of a [`StoreConfig`] at the provided mock server base URL.
	#[cfg(feature = "reqwest")]
	pub fn test_config(base: &str) -> StoreConfig {
		StoreConfig::default()
			.with_authority(base)
			.with_collections_base(base)
			.with_submissions_base(base)
	}

	/// Constructs an [`AudienceTokenManager`] backed by an in-memory cache and the reqwest
	/// transport used across tests.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_manager(
		config: &StoreConfig,
		credentials: Credentials,
	) -> (AudienceTokenManager, Arc<MemoryCache<AccessToken>>) {
		let cache_backend = Arc::new(MemoryCache::default());
		let cache: Arc<dyn TokenCache> = cache_backend.clone();
		let authority = config.authority_url().expect("Test authority should parse.");
		let fetcher = AadTokenFetcher::new(&authority, credentials, test_reqwest_http_client())
			.expect("Test fetcher should build.");
		let manager = AudienceTokenManager::new(Arc::new(fetcher), cache).with_config(config);

		(manager, cache_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
