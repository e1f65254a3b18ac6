//! JSON encode/decode helpers shared by every service call.
//!
//! Decoding goes through `serde_path_to_error` so a malformed payload reports the JSON path
//! that failed instead of only the serde message.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Decodes `bytes` as JSON into `T`, labelling failures with `what`.
pub fn decode<T>(bytes: &[u8], what: &'static str) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|source| TransportError::Decode { what, source }.into())
}

/// Encodes `value` as a JSON request body.
pub fn encode<T>(value: &T) -> Result<Vec<u8>>
where
	T: ?Sized + Serialize,
{
	serde_json::to_vec(value).map_err(|e| ConfigError::Encode(e).into())
}
