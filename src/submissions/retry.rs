//! Authorized Partner Center calls with throttling-aware retries.
//!
//! When the service answers `429 Too Many Requests` with a JSON body whose `message` contains
//! `Try again in N seconds`, the caller waits `N + 1` seconds through its [`RetryDelay`] and
//! re-issues the identical request. The wait is constant per attempt. Retries are unbounded
//! unless [`RetryPolicy::max_attempts`] caps them. Any other failure, or a 429 whose body cannot
//! be interpreted, is terminal.

// std
use std::sync::LazyLock;
// crates.io
use oauth2::http::{Method, StatusCode};
use regex::Regex;
// self
use crate::{
	_prelude::*,
	error::HttpResponseError,
	http::{self, StoreHttpClient},
	manager::AccessTokenProvider,
	obs,
};

static RETRY_AFTER: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"Try again in (\d+) seconds").ok());

/// Boxed future returned by [`RetryDelay::delay`].
pub type DelayFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Waits between throttled attempts.
pub trait RetryDelay
where
	Self: Send + Sync,
{
	/// Resolves once `duration` has elapsed.
	fn delay(&self, duration: Duration) -> DelayFuture<'_>;
}

/// [`RetryDelay`] backed by the tokio timer; suspends only the calling task.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioDelay;
impl RetryDelay for TokioDelay {
	fn delay(&self, duration: Duration) -> DelayFuture<'_> {
		let duration = std::time::Duration::try_from(duration).unwrap_or_default();

		Box::pin(tokio::time::sleep(duration))
	}
}

/// Throttling retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Retry throttled requests at all.
	pub enabled: bool,
	/// Total attempts (including the first) before a 429 becomes terminal; `None` is unbounded.
	pub max_attempts: Option<u32>,
}
impl RetryPolicy {
	/// Policy that never retries.
	pub const fn disabled() -> Self {
		Self { enabled: false, max_attempts: None }
	}

	/// Caps the total number of attempts.
	pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = Some(max_attempts);

		self
	}

	/// Returns `true` when another attempt may follow attempt number `attempt` (1-based).
	pub fn allows_retry_after(&self, attempt: u32) -> bool {
		self.enabled && self.max_attempts.is_none_or(|max| attempt < max)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { enabled: true, max_attempts: None }
	}
}

/// Request issued through a [`RetryingCaller`].
#[derive(Clone, Debug)]
pub struct SubmissionRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub uri: Url,
	/// JSON body; `Content-Type: application/json` is sent only when present.
	pub body: Option<Vec<u8>>,
}
impl SubmissionRequest {
	/// Request without a body.
	pub fn new(method: Method, uri: Url) -> Self {
		Self { method, uri, body: None }
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: Vec<u8>) -> Self {
		self.body = Some(body);

		self
	}
}

/// Issues Partner Center requests authorized with the submissions token, retrying on 429.
pub struct RetryingCaller<C>
where
	C: ?Sized + StoreHttpClient,
{
	tokens: Arc<dyn AccessTokenProvider>,
	http_client: Arc<C>,
	delay: Arc<dyn RetryDelay>,
	policy: RetryPolicy,
}
impl<C> RetryingCaller<C>
where
	C: ?Sized + StoreHttpClient,
{
	/// Creates a caller with the tokio delay and the default (unbounded) policy.
	pub fn new(tokens: Arc<dyn AccessTokenProvider>, http_client: impl Into<Arc<C>>) -> Self {
		Self {
			tokens,
			http_client: http_client.into(),
			delay: Arc::new(TokioDelay),
			policy: RetryPolicy::default(),
		}
	}

	/// Replaces the delay collaborator.
	pub fn with_delay(mut self, delay: Arc<dyn RetryDelay>) -> Self {
		self.delay = delay;

		self
	}

	/// Replaces the retry policy.
	pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Active retry policy.
	pub fn policy(&self) -> RetryPolicy {
		self.policy
	}

	/// Issues `request`, returning the raw body of the first 2xx response.
	///
	/// `description` names the call in error messages, e.g. `add_on(9NBLGGH4R315)`.
	pub async fn call(&self, description: &str, request: &SubmissionRequest) -> Result<Vec<u8>> {
		let mut attempt = 0_u32;

		loop {
			attempt = attempt.saturating_add(1);

			let token = self.tokens.submissions_access_token().await?;
			let bearer = token.bearer_header();
			let mut headers = vec![("Authorization", bearer.as_str())];

			if request.body.is_some() {
				headers.push(("Content-Type", "application/json"));
			}

			let http_request = http::build_request(
				request.method.clone(),
				request.uri.as_str(),
				headers,
				request.body.clone().unwrap_or_default(),
			)?;
			let response = http::send(self.http_client.as_ref(), http_request).await?;
			let status = response.status();

			if http::is_success(status) {
				return Ok(response.into_body());
			}
			if status == StatusCode::TOO_MANY_REQUESTS && self.policy.allows_retry_after(attempt) {
				match parse_retry_seconds(response.body()) {
					Some(seconds) => {
						let wait = Duration::seconds(seconds.saturating_add(1));

						obs::warn_event!(
							call = description,
							attempt,
							wait_seconds = wait.whole_seconds(),
							"Rate limit is exceeded. Retrying."
						);
						obs::record_throttle_retry(description, wait);
						self.delay.delay(wait).await;

						continue;
					},
					None => {
						obs::warn_event!(
							call = description,
							"Throttled response carried no retry hint; giving up."
						);
					},
				}
			}

			return Err(HttpResponseError::new(
				format!(
					"{description} failed [{}] {}",
					status.as_u16(),
					String::from_utf8_lossy(response.body())
				),
				status.as_u16(),
				response.body(),
			)
			.into());
		}
	}
}
impl<C> Debug for RetryingCaller<C>
where
	C: ?Sized + StoreHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryingCaller").field("policy", &self.policy).finish()
	}
}

/// Extracts `N` from a throttling body of the form `{"message": "... Try again in N seconds ..."}`.
pub fn parse_retry_seconds(body: &[u8]) -> Option<i64> {
	let value = serde_json::from_slice::<serde_json::Value>(body).ok()?;
	let message = value.get("message")?.as_str()?;
	let captures = RETRY_AFTER.as_ref()?.captures(message)?;

	captures.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{ScriptedHttpClient, StaticTokenProvider},
		error::HttpResponseError,
	};

	#[derive(Debug, Default)]
	struct RecordingDelay(Mutex<Vec<Duration>>);
	impl RecordingDelay {
		fn waits(&self) -> Vec<Duration> {
			self.0.lock().clone()
		}
	}
	impl RetryDelay for RecordingDelay {
		fn delay(&self, duration: Duration) -> DelayFuture<'_> {
			self.0.lock().push(duration);

			Box::pin(async {})
		}
	}

	const THROTTLED: &[u8] =
		br#"{"statusCode":429,"message":"Rate limit is exceeded. Try again in 2 seconds."}"#;

	fn caller(
		http: &Arc<ScriptedHttpClient>,
		delay: &Arc<RecordingDelay>,
	) -> RetryingCaller<ScriptedHttpClient> {
		let delay: Arc<dyn RetryDelay> = delay.clone();

		RetryingCaller::new(Arc::new(StaticTokenProvider::new("submissions-token")), http.clone())
			.with_delay(delay)
	}

	fn request() -> SubmissionRequest {
		SubmissionRequest::new(
			Method::GET,
			Url::parse("https://manage.devcenter.microsoft.com/v1.0/my/inappproducts/9N")
				.expect("Request fixture URL should parse."),
		)
	}

	#[test]
	fn retry_hint_is_parsed_from_message() {
		assert_eq!(parse_retry_seconds(THROTTLED), Some(2));
		assert_eq!(parse_retry_seconds(br#"{"message":"Slow down."}"#), None);
		assert_eq!(parse_retry_seconds(b"Try again in 5 seconds"), None);
		assert_eq!(parse_retry_seconds(br#"{"error":"Try again in 5 seconds"}"#), None);
	}

	#[test]
	fn policy_caps_attempts() {
		let unbounded = RetryPolicy::default();
		let capped = RetryPolicy::default().with_max_attempts(2);

		assert!(unbounded.allows_retry_after(1_000));
		assert!(capped.allows_retry_after(1));
		assert!(!capped.allows_retry_after(2));
		assert!(!RetryPolicy::disabled().allows_retry_after(1));
	}

	#[tokio::test]
	async fn throttled_requests_wait_and_repeat() {
		let http = Arc::new(ScriptedHttpClient::default());
		let delay = Arc::new(RecordingDelay::default());

		http.push_response(429, THROTTLED);
		http.push_response(429, THROTTLED);
		http.push_response(200, br#"{"id":"9N"}"#);

		let body = caller(&http, &delay)
			.call("add_on(9N)", &request())
			.await
			.expect("Request should succeed after throttling.");
		let requests = http.requests();

		assert_eq!(body, br#"{"id":"9N"}"#);
		assert_eq!(delay.waits(), vec![Duration::seconds(3), Duration::seconds(3)]);
		assert_eq!(requests.len(), 3);
		assert!(requests.iter().all(|r| r == &requests[0]), "Retries must repeat the request.");
		assert_eq!(requests[0].header("authorization"), Some("Bearer submissions-token"));
		assert_eq!(requests[0].header("content-type"), None);
	}

	#[tokio::test]
	async fn unparsable_throttling_is_terminal() {
		let http = Arc::new(ScriptedHttpClient::default());
		let delay = Arc::new(RecordingDelay::default());

		http.push_response(429, br#"{"message":"Slow down."}"#);

		let err = caller(&http, &delay)
			.call("add_on(9N)", &request())
			.await
			.expect_err("A 429 without a retry hint must fail.");

		match err {
			Error::HttpResponse(HttpResponseError { message, status, .. }) => {
				assert_eq!(status, 429);
				assert_eq!(message, r#"add_on(9N) failed [429] {"message":"Slow down."}"#);
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
		assert!(delay.waits().is_empty());
		assert_eq!(http.requests().len(), 1);
	}

	#[tokio::test]
	async fn disabled_or_capped_policies_stop_retrying() {
		let http = Arc::new(ScriptedHttpClient::default());
		let delay = Arc::new(RecordingDelay::default());

		http.push_response(429, THROTTLED);

		let err = caller(&http, &delay)
			.with_policy(RetryPolicy::disabled())
			.call("add_on(9N)", &request())
			.await
			.expect_err("Disabled retries make 429 terminal.");

		assert_eq!(err.status(), Some(429));
		assert!(delay.waits().is_empty());

		for _ in 0..3 {
			http.push_response(429, THROTTLED);
		}

		let err = caller(&http, &delay)
			.with_policy(RetryPolicy::default().with_max_attempts(2))
			.call("add_on(9N)", &request())
			.await
			.expect_err("Capped retries eventually fail.");

		assert_eq!(err.status(), Some(429));
		assert_eq!(delay.waits().len(), 1);
		assert_eq!(http.requests().len(), 3);
	}

	#[tokio::test]
	async fn other_failures_are_not_retried() {
		let http = Arc::new(ScriptedHttpClient::default());
		let delay = Arc::new(RecordingDelay::default());

		http.push_response(500, b"boom");

		let request = request().with_body(b"{}".to_vec());
		let err = caller(&http, &delay)
			.call("update_add_on_submission(9N, 1)", &request)
			.await
			.expect_err("Server errors are terminal.");

		assert_eq!(err.to_string(), "update_add_on_submission(9N, 1) failed [500] boom");
		assert_eq!(http.requests()[0].header("content-type"), Some("application/json"));
		assert!(delay.waits().is_empty());
	}

	#[tokio::test]
	async fn tokio_delay_suspends_for_duration() {
		let started = std::time::Instant::now();

		TokioDelay.delay(Duration::milliseconds(10)).await;

		assert!(started.elapsed() >= std::time::Duration::from_millis(10));
	}
}
