//! Thread-safe in-memory [`TokenCache`] implementation.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	cache::{self, CacheError, CacheFuture, TokenCache},
};

#[derive(Clone, Debug)]
struct Entry<V> {
	value: V,
	retain_until: Option<OffsetDateTime>,
}

type CacheMap<V> = Arc<RwLock<HashMap<String, Entry<V>>>>;

/// In-process cache that keeps entries until their store TTL lapses.
///
/// Lapsed entries are reported absent and evicted lazily on the next lookup.
#[derive(Debug)]
pub struct MemoryCache<V = AccessToken>(CacheMap<V>);
impl<V> MemoryCache<V>
where
	V: Clone,
{
	/// Number of entries currently held, including lapsed ones not yet evicted.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no entries are held.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn get_now(map: &CacheMap<V>, key: &str, now: OffsetDateTime) -> Option<V> {
		{
			let guard = map.read();

			match guard.get(key) {
				Some(entry) if cache::is_retained(entry.retain_until, now) =>
					return Some(entry.value.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		let mut guard = map.write();

		// Another writer may have replaced the entry between the two locks.
		if guard.get(key).is_some_and(|entry| !cache::is_retained(entry.retain_until, now)) {
			guard.remove(key);
		}

		guard.get(key).map(|entry| entry.value.clone())
	}

	fn set_now(map: &CacheMap<V>, key: &str, value: V, ttl: Duration, now: OffsetDateTime) {
		map.write().insert(key.to_owned(), Entry { value, retain_until: cache::retain_until(now, ttl) });
	}
}
impl<V> Default for MemoryCache<V> {
	fn default() -> Self {
		Self(Arc::new(RwLock::new(HashMap::new())))
	}
}
impl<V> Clone for MemoryCache<V> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}
impl<V> TokenCache<V> for MemoryCache<V>
where
	V: 'static + Clone + Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<V>> {
		Box::pin(async move { Ok(Self::get_now(&self.0, key, OffsetDateTime::now_utc())) })
	}

	fn set<'a>(&'a self, key: &'a str, value: V, ttl: Duration) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			Self::set_now(&self.0, key, value, ttl, OffsetDateTime::now_utc());

			Ok::<_, CacheError>(())
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[tokio::test]
	async fn set_overwrites_and_keys_are_isolated() {
		let cache = MemoryCache::<String>::default();

		cache.set("a", "one".into(), Duration::hours(1)).await.expect("Set should succeed.");
		cache.set("a", "two".into(), Duration::hours(1)).await.expect("Set should succeed.");
		cache.set("b", "three".into(), Duration::hours(1)).await.expect("Set should succeed.");

		assert_eq!(cache.get("a").await.expect("Get should succeed."), Some("two".into()));
		assert_eq!(cache.get("b").await.expect("Get should succeed."), Some("three".into()));
		assert_eq!(cache.get("c").await.expect("Missing keys are not errors."), None);
	}

	#[test]
	fn lapsed_entries_are_absent_and_evicted() {
		let cache = MemoryCache::<u32>::default();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		MemoryCache::set_now(&cache.0, "k", 7, Duration::minutes(10), now);

		assert_eq!(MemoryCache::get_now(&cache.0, "k", now + Duration::minutes(9)), Some(7));
		assert_eq!(MemoryCache::get_now(&cache.0, "k", now + Duration::minutes(10)), None);
		assert!(cache.is_empty());
	}

	#[tokio::test]
	async fn clones_share_entries() {
		let cache = MemoryCache::<u32>::default();
		let clone = cache.clone();

		cache.set("k", 1, Duration::hours(1)).await.expect("Set should succeed.");

		assert_eq!(clone.get("k").await.expect("Get should succeed."), Some(1));
		assert_eq!(clone.len(), 1);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_tasks_keep_every_key() {
		let cache = MemoryCache::<u32>::default();
		let tasks = (0..32_u32)
			.map(|i| {
				let cache = cache.clone();

				tokio::spawn(async move {
					let key = format!("k{i}");

					cache.set(&key, i, Duration::hours(1)).await.expect("Set should succeed.");

					assert_eq!(cache.get(&key).await.expect("Get should succeed."), Some(i));
				})
			})
			.collect::<Vec<_>>();

		for task in tasks {
			task.await.expect("Cache task should not panic.");
		}

		assert_eq!(cache.len(), 32);

		for i in 0..32_u32 {
			assert_eq!(cache.get(&format!("k{i}")).await.expect("Get should succeed."), Some(i));
		}
	}
}
