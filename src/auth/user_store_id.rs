//! User Store ID (UserCollectionsId / UserPurchaseId) claims and refresh payloads.
//!
//! User Store IDs are JWTs minted on the client from a Collections or Purchase access token.
//! The service only needs to read their claims (for example to find the refresh URI), so the
//! payload is decoded without verifying the signature; the Store Services validate it on use.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, codec};

/// Claims carried by a User Store ID.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStoreIdClaims {
	/// Client id of the access token that generated this User Store ID.
	#[serde(rename = "http://schemas.microsoft.com/marketplace/2015/08/claims/key/clientId", default)]
	pub client_id: String,
	/// Publisher-controlled user id supplied when the key was minted; not a verified identity.
	#[serde(rename = "http://schemas.microsoft.com/marketplace/2015/08/claims/key/userId", default)]
	pub user_id: String,
	/// Opaque payload consumed by the Store Services.
	#[serde(rename = "http://schemas.microsoft.com/marketplace/2015/08/claims/key/payload", default)]
	pub payload: String,
	/// URI that refreshes this key after it expires.
	#[serde(
		rename = "http://schemas.microsoft.com/marketplace/2015/08/claims/key/refreshUri",
		default
	)]
	pub refresh_uri: String,
	/// Issuer of the JWT.
	#[serde(rename = "iss", default)]
	pub issuer: String,
	/// Whether this is a collections or purchase key.
	#[serde(rename = "aud", default)]
	pub audience: String,
	/// Seconds since the Unix epoch when the key was generated.
	#[serde(rename = "iat", default)]
	pub epoch_issued_on: i64,
	/// Seconds since the Unix epoch when the key expires.
	#[serde(rename = "exp", default)]
	pub epoch_expires_on: i64,
	/// Seconds since the Unix epoch when the key becomes usable.
	#[serde(rename = "nbf", default)]
	pub epoch_valid_after: i64,
}
impl UserStoreIdClaims {
	/// Decodes the claims segment of a User Store ID.
	pub fn decode(user_store_id: &str) -> Result<Self> {
		Error::require_non_empty("user_store_id", user_store_id)?;

		let mut segments = user_store_id.split('.');
		let payload = match (segments.next(), segments.next()) {
			(Some(_header), Some(payload)) if !payload.is_empty() => payload,
			_ => return Err(Error::invalid_argument("user_store_id", "value is not a JWT")),
		};
		let bytes = URL_SAFE_NO_PAD
			.decode(payload.trim_end_matches('='))
			.map_err(|e| Error::invalid_argument("user_store_id", e.to_string()))?;

		codec::decode(&bytes, "UserStoreIdClaims")
	}

	/// UTC instant when the key was generated.
	pub fn issued_on(&self) -> Result<OffsetDateTime> {
		epoch("iat", self.epoch_issued_on)
	}

	/// UTC instant when the key expires.
	pub fn expires_on(&self) -> Result<OffsetDateTime> {
		epoch("exp", self.epoch_expires_on)
	}

	/// UTC instant when the key becomes usable.
	pub fn valid_after(&self) -> Result<OffsetDateTime> {
		epoch("nbf", self.epoch_valid_after)
	}

	/// Returns `true` when the key carries a refresh URI.
	pub fn has_refresh_uri(&self) -> bool {
		!self.refresh_uri.is_empty()
	}
}

/// Body posted to a User Store ID refresh URI.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserStoreIdRefreshRequest {
	/// Service access token authorizing the refresh.
	#[serde(rename = "serviceTicket")]
	pub service_token: String,
	/// Expired User Store ID.
	#[serde(rename = "key")]
	pub user_store_id: String,
}

/// Response returned by a User Store ID refresh URI.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserStoreIdRefreshResponse {
	/// Newly minted User Store ID.
	#[serde(rename = "key")]
	pub user_store_id: String,
}

fn epoch(name: &'static str, seconds: i64) -> Result<OffsetDateTime> {
	OffsetDateTime::from_unix_timestamp(seconds)
		.map_err(|e| Error::invalid_argument(name, e.to_string()))
}
