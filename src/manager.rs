//! Audience-scoped get-or-refresh token management.
//!
//! [`AudienceTokenManager`] composes a [`TokenFetcher`] with a [`TokenCache`]. Each call looks
//! the audience up in the cache and returns the cached token while it is fresh; otherwise it
//! fetches a new token, stores it with a TTL equal to the token's remaining lifetime, and returns
//! it. Under [`RefreshMode::SingleFlight`] a per-audience guard makes concurrent misses share a
//! single fetch.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Audience, DEFAULT_FRESHNESS_MARGIN},
	cache::TokenCache,
	config::StoreConfig,
	fetcher::{TokenFetcher, TokenFuture},
	obs::{self, OpKind, OpOutcome, OpSpan},
};
#[cfg(feature = "reqwest")] use crate::{auth::Credentials, fetcher::AadTokenFetcher};

/// Capability to hand out valid tokens per audience.
pub trait AccessTokenProvider
where
	Self: Send + Sync,
{
	/// Returns a token for `audience` that is fresh relative to the provider's margin.
	fn access_token<'a>(&'a self, audience: &'a Audience) -> TokenFuture<'a>;

	/// Token authorizing Store Services calls.
	fn service_access_token(&self) -> TokenFuture<'_> {
		Box::pin(async move { self.access_token(&Audience::service()).await })
	}

	/// Token handed to clients to mint a UserCollectionsId.
	fn collections_access_token(&self) -> TokenFuture<'_> {
		Box::pin(async move { self.access_token(&Audience::collections()).await })
	}

	/// Token handed to clients to mint a UserPurchaseId.
	fn purchase_access_token(&self) -> TokenFuture<'_> {
		Box::pin(async move { self.access_token(&Audience::purchase()).await })
	}

	/// Token authorizing Partner Center submission calls.
	fn submissions_access_token(&self) -> TokenFuture<'_> {
		Box::pin(async move { self.access_token(&Audience::submissions()).await })
	}
}

/// Coordination applied when several callers miss the cache for the same audience.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
	/// Concurrent misses for one audience wait on a single fetch.
	#[default]
	SingleFlight,
	/// Every miss fetches independently; the last write to the cache wins.
	Unsynchronized,
}

/// Thread-safe counters for token lookups.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	cache_hits: AtomicU64,
	fetches: AtomicU64,
	failures: AtomicU64,
}
impl TokenMetrics {
	/// Returns the number of lookups served from the cache.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of successful fetches.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Returns the number of failed fetches or cache writes.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	fn record_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}

/// Get-or-refresh token manager keyed by audience.
#[derive(Clone)]
pub struct AudienceTokenManager {
	fetcher: Arc<dyn TokenFetcher>,
	cache: Arc<dyn TokenCache>,
	freshness_margin: Duration,
	refresh_mode: RefreshMode,
	metrics: Arc<TokenMetrics>,
	flow_guards: Arc<Mutex<HashMap<Audience, Arc<AsyncMutex<()>>>>>,
}
impl AudienceTokenManager {
	/// Creates a manager with the default margin and single-flight refreshes.
	pub fn new(fetcher: Arc<dyn TokenFetcher>, cache: Arc<dyn TokenCache>) -> Self {
		Self {
			fetcher,
			cache,
			freshness_margin: DEFAULT_FRESHNESS_MARGIN,
			refresh_mode: RefreshMode::default(),
			metrics: Default::default(),
			flow_guards: Default::default(),
		}
	}

	/// Applies the freshness margin and refresh mode from `config`.
	pub fn with_config(self, config: &StoreConfig) -> Self {
		self.with_freshness_margin(config.freshness_margin).with_refresh_mode(config.refresh_mode)
	}

	/// Overrides the freshness margin; negative values are clamped to zero.
	pub fn with_freshness_margin(mut self, margin: Duration) -> Self {
		self.freshness_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Overrides the refresh coordination mode.
	pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
		self.refresh_mode = mode;

		self
	}

	/// Configured freshness margin.
	pub fn freshness_margin(&self) -> Duration {
		self.freshness_margin
	}

	/// Shared lookup counters.
	pub fn metrics(&self) -> &TokenMetrics {
		&self.metrics
	}

	/// Validates `audience` and returns a fresh token for it.
	pub async fn access_token_for(&self, audience: &str) -> Result<AccessToken> {
		let audience = Audience::new(audience)?;

		self.access_token(&audience).await
	}

	async fn access_token_now(&self, audience: &Audience) -> Result<AccessToken> {
		if let Some(token) = self.cached(audience).await? {
			return Ok(token);
		}

		match self.refresh_mode {
			RefreshMode::Unsynchronized => self.refresh(audience).await,
			RefreshMode::SingleFlight => {
				let guard = self.flow_guard(audience);
				let _singleflight = guard.lock().await;

				// A concurrent caller may have refreshed while this one waited.
				if let Some(token) = self.cached(audience).await? {
					return Ok(token);
				}

				self.refresh(audience).await
			},
		}
	}

	async fn cached(&self, audience: &Audience) -> Result<Option<AccessToken>> {
		let now = OffsetDateTime::now_utc();
		let cached = self
			.cache
			.get(audience)
			.await?
			.filter(|token| token.is_fresh_at(now, self.freshness_margin));

		if cached.is_some() {
			self.metrics.record_hit();
		}

		Ok(cached)
	}

	async fn refresh(&self, audience: &Audience) -> Result<AccessToken> {
		obs::debug_event!(audience = %audience, "Refreshing access token.");

		let token = match self.fetcher.fetch(audience).await {
			Ok(token) => token,
			Err(e) => {
				self.metrics.record_failure();

				return Err(e);
			},
		};

		self.metrics.record_fetch();

		if let Err(e) = self.cache.set(audience, token.clone(), token.expires_in()).await {
			self.metrics.record_failure();

			return Err(e.into());
		}

		Ok(token)
	}

	fn flow_guard(&self, audience: &Audience) -> Arc<AsyncMutex<()>> {
		let mut guards = self.flow_guards.lock();

		guards.entry(audience.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
#[cfg(feature = "reqwest")]
impl AudienceTokenManager {
	/// Builds a manager backed by an [`AadTokenFetcher`] over reqwest and the provided cache.
	pub fn from_config(
		config: &StoreConfig,
		credentials: Credentials,
		cache: Arc<dyn TokenCache>,
	) -> Result<Self> {
		config.validate()?;

		let fetcher = AadTokenFetcher::from_config(config, credentials)?;

		Ok(Self::new(Arc::new(fetcher), cache).with_config(config))
	}
}
impl AccessTokenProvider for AudienceTokenManager {
	fn access_token<'a>(&'a self, audience: &'a Audience) -> TokenFuture<'a> {
		const KIND: OpKind = OpKind::TokenRefresh;

		Box::pin(async move {
			let span = OpSpan::new(KIND, "access_token");

			obs::record_op_outcome(KIND, OpOutcome::Attempt);

			obs::record_result(KIND, span.instrument(self.access_token_now(audience)).await)
		})
	}
}
impl Debug for AudienceTokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AudienceTokenManager")
			.field("freshness_margin", &self.freshness_margin)
			.field("refresh_mode", &self.refresh_mode)
			.field("metrics", &self.metrics)
			.finish()
	}
}
