//! Auth-domain identifiers, credentials, access tokens, and User Store ID claims.

pub mod credentials;
pub mod id;
pub mod token;
pub mod user_store_id;

pub use credentials::*;
pub use id::*;
pub use token::{record::*, secret::*};
pub use user_store_id::*;
