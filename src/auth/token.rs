//! Access token values, lifetimes, and the redacting secret wrapper.

pub mod record;
pub mod secret;
