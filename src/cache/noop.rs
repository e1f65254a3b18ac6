//! Cache that never retains anything, for uncached deployments.

// self
use crate::{
	_prelude::*,
	cache::{CacheFuture, TokenCache},
};

/// [`TokenCache`] that drops every write; each lookup misses, so every access fetches.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCache;
impl<V> TokenCache<V> for NoopCache
where
	V: 'static + Send,
{
	fn get<'a>(&'a self, _: &'a str) -> CacheFuture<'a, Option<V>> {
		Box::pin(async { Ok(None) })
	}

	fn set<'a>(&'a self, _: &'a str, _: V, _: Duration) -> CacheFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}
}
