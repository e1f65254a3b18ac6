//! Strongly typed identifiers enforced across the token layer.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $max:expr) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view, $max)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value, $max)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;
const AUDIENCE_MAX_LEN: usize = 2048;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (tenant, client, audience).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (tenant, client, audience).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (tenant, client, audience).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}
impl IdentifierError {
	/// Kind of identifier that failed validation.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Empty { kind } | Self::ContainsWhitespace { kind } | Self::TooLong { kind, .. } =>
				*kind,
		}
	}
}

def_id! { TenantId, "Azure AD tenant the service is registered in.", "Tenant", IDENTIFIER_MAX_LEN }
def_id! { ClientId, "Azure AD application (client) identifier.", "Client", IDENTIFIER_MAX_LEN }
def_id! { Audience, "Resource URI a token is scoped to.", "Audience", AUDIENCE_MAX_LEN }
impl Audience {
	/// Audience of the token that authorizes every Store Services call.
	pub fn service() -> Self {
		AudienceKind::Service.into()
	}

	/// Audience of the token handed to clients to mint UserCollectionsIds.
	pub fn collections() -> Self {
		AudienceKind::Collections.into()
	}

	/// Audience of the token handed to clients to mint UserPurchaseIds.
	pub fn purchase() -> Self {
		AudienceKind::Purchase.into()
	}

	/// Audience of the token that authorizes Partner Center submission calls.
	pub fn submissions() -> Self {
		AudienceKind::Submissions.into()
	}
}

/// Well-known audiences issued by the Store Services.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AudienceKind {
	/// `https://onestore.microsoft.com`.
	Service,
	/// `https://onestore.microsoft.com/b2b/keys/create/collections`.
	Collections,
	/// `https://onestore.microsoft.com/b2b/keys/create/purchase`.
	Purchase,
	/// `https://manage.devcenter.microsoft.com`.
	Submissions,
}
impl AudienceKind {
	/// Returns the audience URI.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Service => "https://onestore.microsoft.com",
			Self::Collections => "https://onestore.microsoft.com/b2b/keys/create/collections",
			Self::Purchase => "https://onestore.microsoft.com/b2b/keys/create/purchase",
			Self::Submissions => "https://manage.devcenter.microsoft.com",
		}
	}
}
impl From<AudienceKind> for Audience {
	fn from(kind: AudienceKind) -> Self {
		Self(kind.as_str().to_owned())
	}
}
impl Display for AudienceKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

fn validate_view(kind: &'static str, view: &str, max: usize) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > max {
		return Err(IdentifierError::TooLong { kind, max });
	}

	Ok(())
}
