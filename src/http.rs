//! Transport primitives for token exchanges and Store Services calls.
//!
//! The module exposes [`StoreHttpClient`], the crate's only dependency on an HTTP stack. The
//! capability is deliberately small: send a method, URI, headers, and body, and receive a
//! status, headers, and body. Non-2xx statuses are returned as responses, never raised as
//! transport errors, so each caller classifies them with its own message.

// crates.io
use oauth2::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

pub use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};

/// Abstraction over HTTP transports capable of executing Store Services requests.
///
/// Callers provide an implementation (typically behind `Arc<T>`) and the client requests
/// short-lived [`AsyncHttpClient`] handles for each call. Implementations must be
/// `Send + Sync + 'static` so they can be shared across managers and clients, and the handles
/// they return must own whatever state they need so their request futures remain `Send` for the
/// lifetime of the in-flight call.
pub trait StoreHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for a single call.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle for the next request.
	fn handle(&self) -> Self::Handle;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Use [`ReqwestHttpClient::from_config`] to get the crate defaults: redirects are not followed,
/// TLS verification stays on, and the configured request timeout applies to every call.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with the timeout from `config`.
	pub fn from_config(config: &crate::config::StoreConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(config.request_timeout_std())
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl StoreHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(self.0.clone())
	}
}

/// Handle returned by [`ReqwestHttpClient`] that satisfies [`StoreHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle(ReqwestClient);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Returns `true` for statuses in `[200, 300)`.
pub fn is_success(status: StatusCode) -> bool {
	(200..300).contains(&status.as_u16())
}

/// Builds a request; later headers replace earlier ones with the same (case-insensitive) name.
pub(crate) fn build_request<'h, I>(
	method: Method,
	uri: &str,
	headers: I,
	body: Vec<u8>,
) -> Result<HttpRequest>
where
	I: IntoIterator<Item = (&'h str, &'h str)>,
{
	let mut map = HeaderMap::new();

	for (name, value) in headers {
		let name = HeaderName::from_bytes(name.as_bytes())
			.map_err(|e| ConfigError::HttpRequest(e.into()))?;
		let value = HeaderValue::from_str(value).map_err(|e| ConfigError::HttpRequest(e.into()))?;

		map.insert(name, value);
	}

	let mut request = Request::builder()
		.method(method)
		.uri(uri)
		.body(body)
		.map_err(ConfigError::HttpRequest)?;

	*request.headers_mut() = map;

	Ok(request)
}

/// Sends `request` through a fresh handle, mapping transport failures to [`Error::Transport`].
pub(crate) async fn send<C>(client: &C, request: HttpRequest) -> Result<HttpResponse>
where
	C: ?Sized + StoreHttpClient,
{
	let target = format!("{} {}", request.method(), request.uri());
	let handle = client.handle();

	handle.call(request).await.map_err(|e| map_transport_error(&target, e))
}

fn map_transport_error<E>(target: &str, err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) =>
			TransportError::Network { target: target.to_owned(), source: inner }.into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Other { message }.into(),
		#[allow(unreachable_patterns)]
		_ => TransportError::Other { message: format!("unknown failure calling {target}") }.into(),
	}
}
