//! File-backed [`TokenCache`] shared by every process pointing at the same path.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	cache::{self, CacheError, CacheFuture, TokenCache},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Entry<V> {
	key: String,
	value: V,
	retain_until: Option<OffsetDateTime>,
}

/// Persists cache entries to a JSON snapshot after each write.
///
/// Lookups re-read the snapshot so writes made by other processes (or by an earlier run) are
/// observed. Lapsed entries are dropped whenever the snapshot is loaded.
#[derive(Debug)]
pub struct FileCache<V = AccessToken> {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<String, Entry<V>>>>,
}
impl<V> FileCache<V>
where
	V: Clone + Serialize + DeserializeOwned,
{
	/// Opens (or creates) a cache at the provided path, eagerly loading existing entries.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path, OffsetDateTime::now_utc())?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the snapshot on disk.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(
		path: &Path,
		now: OffsetDateTime,
	) -> Result<HashMap<String, Entry<V>>, CacheError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| CacheError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		let entries: Vec<Entry<V>> =
			serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(entries
			.into_iter()
			.filter(|entry| cache::is_retained(entry.retain_until, now))
			.map(|entry| (entry.key.clone(), entry))
			.collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), CacheError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| CacheError::Backend {
				message: format!("Failed to create cache directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<String, Entry<V>>) -> Result<(), CacheError> {
		Self::ensure_parent_exists(&self.path)?;

		let snapshot: Vec<_> = contents.values().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| CacheError::Serialization {
				message: format!("Failed to serialize cache snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension(format!("{}.tmp", std::process::id()));

		{
			let mut file = File::create(&tmp_path).map_err(|e| CacheError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| CacheError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| CacheError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn get_now(&self, key: &str, now: OffsetDateTime) -> Result<Option<V>, CacheError> {
		let mut guard = self.inner.write();

		*guard = Self::load_snapshot(&self.path, now)?;

		Ok(guard.get(key).map(|entry| entry.value.clone()))
	}

	fn set_now(
		&self,
		key: &str,
		value: V,
		ttl: Duration,
		now: OffsetDateTime,
	) -> Result<(), CacheError> {
		// Held until persisted; concurrent writers would otherwise drop each other's keys.
		let mut guard = self.inner.write();

		*guard = Self::load_snapshot(&self.path, now)?;
		guard.insert(
			key.to_owned(),
			Entry { key: key.to_owned(), value, retain_until: cache::retain_until(now, ttl) },
		);

		self.persist_locked(&guard)
	}
}
impl<V> Clone for FileCache<V> {
	fn clone(&self) -> Self {
		Self { path: self.path.clone(), inner: self.inner.clone() }
	}
}
impl<V> TokenCache<V> for FileCache<V>
where
	V: 'static + Clone + Send + Sync + Serialize + DeserializeOwned,
{
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<V>> {
		Box::pin(async move { self.get_now(key, OffsetDateTime::now_utc()) })
	}

	fn set<'a>(&'a self, key: &'a str, value: V, ttl: Duration) -> CacheFuture<'a, ()> {
		Box::pin(async move { self.set_now(key, value, ttl, OffsetDateTime::now_utc()) })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::Audience;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"ms_store_services_file_cache_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[tokio::test]
	async fn save_and_reload_round_trip() {
		let path = temp_path("reload");
		let cache = FileCache::<AccessToken>::open(&path).expect("Failed to open file cache.");
		let token = AccessToken::builder(Audience::collections())
			.access_token("access-token")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Failed to build cache fixture token.");

		cache
			.set(Audience::collections().as_ref(), token.clone(), Duration::hours(1))
			.await
			.expect("Failed to write fixture token.");
		drop(cache);

		let reopened = FileCache::<AccessToken>::open(&path).expect("Failed to reopen file cache.");
		let fetched = reopened
			.get(Audience::collections().as_ref())
			.await
			.expect("Failed to read fixture token.")
			.expect("File cache lost token after reopen.");

		assert_eq!(fetched.token.expose(), token.token.expose());
		assert_eq!(fetched.expires_at, token.expires_at);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file cache snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn lapsed_entries_are_dropped_on_load() {
		let path = temp_path("ttl");
		let cache = FileCache::<u32>::open(&path).expect("Failed to open file cache.");
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		cache.set_now("short", 1, Duration::minutes(1), now).expect("Failed to write entry.");
		cache.set_now("long", 2, Duration::hours(1), now).expect("Failed to write entry.");

		let later = now + Duration::minutes(5);

		assert_eq!(cache.get_now("short", later).expect("Read should succeed."), None);
		assert_eq!(cache.get_now("long", later).expect("Read should succeed."), Some(2));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file cache snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn separate_handles_observe_each_other() {
		let path = temp_path("shared");
		let writer = FileCache::<String>::open(&path).expect("Failed to open writer handle.");
		let reader = FileCache::<String>::open(&path).expect("Failed to open reader handle.");
		let now = OffsetDateTime::now_utc();

		writer.set_now("k", "v".into(), Duration::hours(1), now).expect("Failed to write entry.");

		assert_eq!(reader.get_now("k", now).expect("Read should succeed."), Some("v".into()));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file cache snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn concurrent_writers_keep_every_key() {
		let path = temp_path("concurrent");
		let cache = FileCache::<u32>::open(&path).expect("Failed to open file cache.");
		let now = OffsetDateTime::now_utc();

		for round in 0..10_u32 {
			let handles = (0..8_u32)
				.map(|i| {
					let cache = cache.clone();

					std::thread::spawn(move || {
						cache
							.set_now(&format!("k{i}"), round * 100 + i, Duration::hours(1), now)
							.expect("Concurrent write should succeed.");
					})
				})
				.collect::<Vec<_>>();

			for handle in handles {
				handle.join().expect("Writer thread should not panic.");
			}

			for i in 0..8_u32 {
				assert_eq!(
					cache.get_now(&format!("k{i}"), now).expect("Read should succeed."),
					Some(round * 100 + i),
				);
			}
		}

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file cache snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshots_are_serialization_errors() {
		let path = temp_path("corrupt");

		fs::write(&path, b"not json").expect("Failed to write corrupt snapshot.");

		let err = FileCache::<u32>::open(&path).expect_err("Corrupt snapshots must be rejected.");

		assert!(matches!(err, CacheError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file cache snapshot {}: {e}", path.display())
		});
	}
}
