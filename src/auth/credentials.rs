//! Azure AD application credentials used for the client-credentials grant.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, Secret, TenantId},
};

/// Immutable tenant/client/secret triple supplied once at construction.
#[derive(Clone)]
pub struct Credentials {
	/// Tenant the application is registered in.
	pub tenant: TenantId,
	/// Application (client) identifier.
	pub client_id: ClientId,
	client_secret: Secret,
}
impl Credentials {
	/// Validates and wraps the provided values; every part must be non-empty.
	pub fn new(
		tenant: impl AsRef<str>,
		client_id: impl AsRef<str>,
		client_secret: impl Into<String>,
	) -> Result<Self> {
		let tenant = TenantId::new(tenant)?;
		let client_id = ClientId::new(client_id)?;
		let client_secret = Secret::new(client_secret);

		if client_secret.is_empty() {
			return Err(Error::invalid_argument("client_secret", "value must be provided"));
		}

		Ok(Self { tenant, client_id, client_secret })
	}

	/// Client secret; transmitted to the token endpoint, never displayed.
	pub fn client_secret(&self) -> &Secret {
		&self.client_secret
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("tenant", &self.tenant)
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn every_part_is_required() {
		for (tenant, client, secret, name) in [
			("", "client", "secret", "Tenant"),
			("tenant", "", "secret", "Client"),
			("tenant", "client", "", "client_secret"),
		] {
			let err = Credentials::new(tenant, client, secret)
				.expect_err("Missing credential parts must be rejected.");

			match err {
				Error::InvalidArgument { name: actual, .. } => assert_eq!(actual, name),
				other => panic!("Unexpected error variant: {other:?}."),
			}
		}
	}

	#[test]
	fn debug_never_prints_secret() {
		let credentials =
			Credentials::new("tenant", "client", "p@ss%25").expect("Credentials should build.");
		let rendered = format!("{credentials:?}");

		assert!(!rendered.contains("p@ss"));
		assert_eq!(credentials.client_secret().expose(), "p@ss%25");
	}
}
