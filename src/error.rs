//! Client-level error types shared across token acquisition, caching, and service calls.

// self
use crate::{_prelude::*, auth::IdentifierError, collections::ConsumeError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token cache backend failure.
	#[error("{0}")]
	Cache(
		#[from]
		#[source]
		crate::cache::CacheError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS) or an unreadable response body.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Service answered with a status outside `[200, 300)`.
	#[error(transparent)]
	HttpResponse(#[from] HttpResponseError),
	/// Consume call failed and the service described why.
	#[error(transparent)]
	Consume(#[from] ConsumeDomainError),

	/// Required input is missing or malformed; raised before any I/O.
	#[error("Invalid argument `{name}`: {reason}.")]
	InvalidArgument {
		/// Name of the offending argument.
		name: &'static str,
		/// Human-readable explanation.
		reason: String,
	},
}
impl Error {
	/// Shorthand for [`Error::InvalidArgument`].
	pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
		Self::InvalidArgument { name, reason: reason.into() }
	}

	/// Fails with [`Error::InvalidArgument`] when `value` is empty.
	pub(crate) fn require_non_empty(name: &'static str, value: &str) -> Result<()> {
		if value.trim().is_empty() {
			Err(Self::invalid_argument(name, "value must be provided"))
		} else {
			Ok(())
		}
	}

	/// HTTP status attached to the error, when the service produced one.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::HttpResponse(e) => Some(e.status),
			Self::Consume(e) => Some(e.status),
			_ => None,
		}
	}
}
impl From<IdentifierError> for Error {
	fn from(e: IdentifierError) -> Self {
		Self::InvalidArgument { name: e.kind(), reason: e.to_string() }
	}
}

/// Non-2xx response returned by a Store Services endpoint.
#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct HttpResponseError {
	/// Message describing the failed call.
	pub message: String,
	/// HTTP status code.
	pub status: u16,
	/// Reason phrase for the status code.
	pub reason: String,
	/// Raw response body, lossily decoded as UTF-8.
	pub body: String,
}
impl HttpResponseError {
	/// Builds an error for the provided status and body with a caller-supplied message.
	pub fn new(message: impl Into<String>, status: u16, body: &[u8]) -> Self {
		Self {
			message: message.into(),
			status,
			reason: reason_phrase(status).into(),
			body: String::from_utf8_lossy(body).into_owned(),
		}
	}
}

/// Consume failure whose error body parsed into the service's structured error payload.
#[derive(Clone, Debug, ThisError)]
#[error("Consume request failed [{}]: {} ({}).", .status, .error.code, .error.message)]
pub struct ConsumeDomainError {
	/// HTTP status the consume call returned.
	pub status: u16,
	/// Structured error reported by the Collections service.
	pub error: ConsumeError,
}

/// Configuration and validation failures raised locally.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A configured or derived URL is invalid.
	#[error("The {field} URL is invalid.")]
	InvalidUrl {
		/// Which URL failed to parse.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured duration is out of range.
	#[error("The {field} duration is out of range.")]
	InvalidDuration {
		/// Which duration was rejected.
		field: &'static str,
	},
	/// The `User-Agent` service identity is blank.
	#[error("Service identity must be provided.")]
	MissingServiceIdentity,
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	Encode(#[source] serde_json::Error),
	/// Token builder validation failed.
	#[error("Unable to build access token.")]
	TokenBuild(#[from] crate::auth::AccessTokenBuilderError),
	/// Token endpoint response carried neither `expires_in` nor `expires_on`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned a non-positive lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, unreadable payloads).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("HTTP request {target} failed.")]
	Network {
		/// Request target (method + URI) the failure belongs to.
		target: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure without a structured source.
	#[error("HTTP client error occurred: {message}.")]
	Other {
		/// Transport-provided message.
		message: String,
	},
	/// Response body could not be decoded into the expected shape.
	#[error("Unable to parse {what}.")]
	Decode {
		/// Name of the payload that failed to decode.
		what: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(target: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { target: target.into(), source: Box::new(src) }
	}
}

/// Canonical reason phrase for a status code, or `"Unknown"` when there is none.
pub(crate) fn reason_phrase(status: u16) -> &'static str {
	oauth2::http::StatusCode::from_u16(status)
		.ok()
		.and_then(|code| code.canonical_reason())
		.unwrap_or("Unknown")
}
