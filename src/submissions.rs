//! Partner Center (Dev Center) management API for add-ons and their submissions.
//!
//! Every call goes through a [`RetryingCaller`] authorized with the submissions audience, so a
//! throttled request is re-issued after the delay the service asks for.

pub mod model;
pub mod retry;

pub use model::*;
pub use retry::*;

// crates.io
use oauth2::http::Method;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	codec, config,
	config::StoreConfig,
	http::StoreHttpClient,
	manager::AccessTokenProvider,
	obs::{self, OpKind, OpOutcome, OpSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

const FIELD: &str = "submissions_base";

/// Add-on and add-on submission operations rooted at `{submissions_base}/v1.0/my/`.
pub struct SubmissionsClient<C>
where
	C: ?Sized + StoreHttpClient,
{
	base: Url,
	caller: RetryingCaller<C>,
}
impl<C> SubmissionsClient<C>
where
	C: ?Sized + StoreHttpClient,
{
	/// Creates a client using the base URL and retry policy from `config`.
	pub fn new(
		config: &StoreConfig,
		tokens: Arc<dyn AccessTokenProvider>,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let base = config::endpoint(&config.submissions_url()?, FIELD, ["v1.0", "my", ""])?;
		let caller = RetryingCaller::new(tokens, http_client).with_policy(config.retry);

		Ok(Self { base, caller })
	}

	/// Replaces the delay used between throttled attempts.
	pub fn with_delay(mut self, delay: Arc<dyn RetryDelay>) -> Self {
		self.caller = self.caller.with_delay(delay);

		self
	}

	/// Root every request URL is derived from.
	pub fn base_url(&self) -> &Url {
		&self.base
	}

	/// Lists the add-ons of an application, optionally paged with `top`/`skip`.
	pub async fn application_add_ons(
		&self,
		application_id: &str,
		top: Option<u32>,
		skip: Option<u32>,
	) -> Result<AppAddOnsResponse> {
		Error::require_non_empty("application_id", application_id)?;

		let mut uri = self.url(["applications", application_id, "listinappproducts"])?;

		if top.is_some() || skip.is_some() {
			let mut query = uri.query_pairs_mut();

			if let Some(top) = top {
				query.append_pair("top", &top.to_string());
			}
			if let Some(skip) = skip {
				query.append_pair("skip", &skip.to_string());
			}
		}

		let description = describe("application_add_ons", &[
			application_id,
			&display_opt(top),
			&display_opt(skip),
		]);

		self.fetch("application_add_ons", &description, SubmissionRequest::new(Method::GET, uri))
			.await
	}

	/// Follows the relative `@nextLink` of a previous [`AppAddOnsResponse`].
	pub async fn application_add_ons_by_link(&self, link: &str) -> Result<AppAddOnsResponse> {
		Error::require_non_empty("link", link)?;

		if Url::parse(link).is_ok() {
			return Err(Error::invalid_argument("link", "absolute links are not followed"));
		}

		let uri = self.base.join(link.trim_start_matches('/')).map_err(|source| {
			crate::error::ConfigError::InvalidUrl { field: "link", source }
		})?;

		// Scheme-relative forms (for example `\\host`) survive the join; keep the bearer on our host.
		if uri.origin() != self.base.origin() {
			return Err(Error::invalid_argument("link", "link leaves the submissions host"));
		}
		let description = describe("application_add_ons_by_link", &[link]);

		self.fetch(
			"application_add_ons_by_link",
			&description,
			SubmissionRequest::new(Method::GET, uri),
		)
		.await
	}

	/// Creates an add-on for `application_id`.
	pub async fn create_add_on(
		&self,
		application_id: &str,
		product_id: &str,
		product_type: &str,
	) -> Result<AddOnResource> {
		Error::require_non_empty("application_id", application_id)?;
		Error::require_non_empty("product_id", product_id)?;
		Error::require_non_empty("product_type", product_type)?;

		let body = codec::encode(&CreateAddOnRequest {
			application_ids: vec![application_id.to_owned()],
			product_id: product_id.to_owned(),
			product_type: product_type.to_owned(),
		})?;
		let request = SubmissionRequest::new(Method::POST, self.url(["inappproducts"])?).with_body(body);
		let description =
			describe("create_add_on", &[application_id, product_id, product_type]);

		self.fetch("create_add_on", &description, request).await
	}

	/// Reads an add-on.
	pub async fn add_on(&self, product_id: &str) -> Result<AddOnResource> {
		Error::require_non_empty("product_id", product_id)?;

		let uri = self.url(["inappproducts", product_id])?;

		self.fetch("add_on", &describe("add_on", &[product_id]), SubmissionRequest::new(Method::GET, uri))
			.await
	}

	/// Deletes an add-on.
	pub async fn delete_add_on(&self, product_id: &str) -> Result<()> {
		Error::require_non_empty("product_id", product_id)?;

		let uri = self.url(["inappproducts", product_id])?;

		self.execute(
			"delete_add_on",
			&describe("delete_add_on", &[product_id]),
			SubmissionRequest::new(Method::DELETE, uri),
		)
		.await
		.map(drop)
	}

	/// Starts a new submission for an add-on.
	pub async fn create_add_on_submission(
		&self,
		product_id: &str,
	) -> Result<AddOnSubmissionResource> {
		Error::require_non_empty("product_id", product_id)?;

		let uri = self.url(["inappproducts", product_id, "submissions"])?;

		self.fetch(
			"create_add_on_submission",
			&describe("create_add_on_submission", &[product_id]),
			SubmissionRequest::new(Method::POST, uri),
		)
		.await
	}

	/// Reads a submission.
	pub async fn add_on_submission(
		&self,
		product_id: &str,
		submission_id: &str,
	) -> Result<AddOnSubmissionResource> {
		let uri = self.submission_url(product_id, submission_id, None)?;

		self.fetch(
			"add_on_submission",
			&describe("add_on_submission", &[product_id, submission_id]),
			SubmissionRequest::new(Method::GET, uri),
		)
		.await
	}

	/// Replaces the editable fields of a submission.
	pub async fn update_add_on_submission(
		&self,
		product_id: &str,
		submission_id: &str,
		update: &UpdateAddOnSubmissionResource,
	) -> Result<AddOnSubmissionResource> {
		let uri = self.submission_url(product_id, submission_id, None)?;
		let request = SubmissionRequest::new(Method::PUT, uri).with_body(codec::encode(update)?);

		self.fetch(
			"update_add_on_submission",
			&describe("update_add_on_submission", &[product_id, submission_id]),
			request,
		)
		.await
	}

	/// Deletes a pending submission.
	pub async fn delete_add_on_submission(&self, product_id: &str, submission_id: &str) -> Result<()> {
		let uri = self.submission_url(product_id, submission_id, None)?;

		self.execute(
			"delete_add_on_submission",
			&describe("delete_add_on_submission", &[product_id, submission_id]),
			SubmissionRequest::new(Method::DELETE, uri),
		)
		.await
		.map(drop)
	}

	/// Commits a submission for certification.
	pub async fn commit_add_on_submission(
		&self,
		product_id: &str,
		submission_id: &str,
	) -> Result<CommitResponse> {
		let uri = self.submission_url(product_id, submission_id, Some("commit"))?;

		self.fetch(
			"commit_add_on_submission",
			&describe("commit_add_on_submission", &[product_id, submission_id]),
			SubmissionRequest::new(Method::POST, uri),
		)
		.await
	}

	fn url<'s, I>(&self, segments: I) -> Result<Url>
	where
		I: IntoIterator<Item = &'s str>,
	{
		Ok(config::endpoint(&self.base, FIELD, segments)?)
	}

	fn submission_url(
		&self,
		product_id: &str,
		submission_id: &str,
		action: Option<&str>,
	) -> Result<Url> {
		Error::require_non_empty("product_id", product_id)?;
		Error::require_non_empty("submission_id", submission_id)?;

		self.url(["inappproducts", product_id, "submissions", submission_id].into_iter().chain(action))
	}

	async fn fetch<T>(
		&self,
		stage: &'static str,
		description: &str,
		request: SubmissionRequest,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let body = self.execute(stage, description, request).await?;

		codec::decode(&body, std::any::type_name::<T>())
	}

	async fn execute(
		&self,
		stage: &'static str,
		description: &str,
		request: SubmissionRequest,
	) -> Result<Vec<u8>> {
		const KIND: OpKind = OpKind::Submissions;

		let span = OpSpan::new(KIND, stage);

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		obs::record_result(KIND, span.instrument(self.caller.call(description, &request)).await)
	}
}
#[cfg(feature = "reqwest")]
impl SubmissionsClient<ReqwestHttpClient> {
	/// Creates a client over a reqwest transport built from `config`.
	pub fn from_config(config: &StoreConfig, tokens: Arc<dyn AccessTokenProvider>) -> Result<Self> {
		config.validate()?;

		Self::new(config, tokens, ReqwestHttpClient::from_config(config)?)
	}
}
impl<C> Debug for SubmissionsClient<C>
where
	C: ?Sized + StoreHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SubmissionsClient")
			.field("base", &self.base.as_str())
			.field("caller", &self.caller)
			.finish()
	}
}

/// Renders a call description such as `add_on_submission(9N, 115)`.
fn describe(name: &str, args: &[&str]) -> String {
	format!("{name}({})", args.join(", "))
}

fn display_opt(value: Option<u32>) -> String {
	value.map(|v| v.to_string()).unwrap_or_default()
}
