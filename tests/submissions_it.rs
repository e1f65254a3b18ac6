// crates.io
use httpmock::prelude::*;
// self
use ms_store_services::{
	_preludet::*,
	auth::Credentials,
	config::StoreConfig,
	http::ReqwestHttpClient,
	submissions::{RetryPolicy, SubmissionsClient, UpdateAddOnSubmissionResource},
};

const SUBMISSIONS_FORM: &str = "grant_type=client_credentials&client_id=client-it&client_secret=secret&resource=https%3A%2F%2Fmanage.devcenter.microsoft.com";

async fn submissions_client(
	server: &MockServer,
	config: StoreConfig,
) -> (SubmissionsClient<ReqwestHttpClient>, httpmock::Mock<'_>) {
	let credentials = Credentials::new("tenant-it", "client-it", "secret")
		.expect("Credentials should be valid for submissions tests.");
	let (manager, _cache) = build_reqwest_test_manager(&config, credentials);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/tenant-it/oauth2/token").body(SUBMISSIONS_FORM);
			then.status(200).header("content-type", "application/json").body(
				"{\"token_type\":\"Bearer\",\"expires_in\":\"3599\",\"access_token\":\"dev-token\"}",
			);
		})
		.await;
	let client = SubmissionsClient::new(&config, Arc::new(manager), test_reqwest_http_client())
		.expect("Submissions client should build against the mock server.");

	(client, token)
}

#[tokio::test]
async fn submission_lifecycle_uses_submissions_token() {
	let server = MockServer::start_async().await;
	let (client, token) = submissions_client(&server, test_config(&server.base_url())).await;
	let create = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1.0/my/inappproducts/9NADDON/submissions")
				.header("authorization", "Bearer dev-token");
			then.status(201).header("content-type", "application/json").body(
				r#"{"id":"115","status":"PendingCommit","friendlyName":"Submission 1","fileUploadUrl":"https://upload.example.com/sas"}"#,
			);
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path("/v1.0/my/inappproducts/9NADDON/submissions/115")
				.header("content-type", "application/json")
				.body(r#"{"keywords":["coins"],"listings":{},"visibility":"Public"}"#);
			then.status(200).header("content-type", "application/json").body(
				r#"{"id":"115","status":"PendingCommit","keywords":["coins"],"visibility":"Public"}"#,
			);
		})
		.await;
	let commit = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1.0/my/inappproducts/9NADDON/submissions/115/commit");
			then.status(202)
				.header("content-type", "application/json")
				.body(r#"{"status":"CommitStarted"}"#);
		})
		.await;
	let created =
		client.create_add_on_submission("9NADDON").await.expect("Submission should be created.");
	let updated = client
		.update_add_on_submission("9NADDON", &created.id, &UpdateAddOnSubmissionResource {
			keywords: vec!["coins".into()],
			visibility: Some("Public".into()),
			..Default::default()
		})
		.await
		.expect("Submission should be updated.");
	let committed = client
		.commit_add_on_submission("9NADDON", &created.id)
		.await
		.expect("Submission should be committed.");

	assert_eq!(created.file_upload_url, "https://upload.example.com/sas");
	assert_eq!(updated.resource.visibility.as_deref(), Some("Public"));
	assert_eq!(committed.status, "CommitStarted");

	create.assert_calls_async(1).await;
	update.assert_calls_async(1).await;
	commit.assert_calls_async(1).await;
	token.assert_calls_async(1).await;
}

#[tokio::test]
async fn throttling_is_terminal_when_retries_are_disabled() {
	let server = MockServer::start_async().await;
	let config = test_config(&server.base_url()).with_retry(RetryPolicy::disabled());
	let (client, _token) = submissions_client(&server, config).await;
	let add_on = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/my/inappproducts/9NADDON");
			then.status(429).header("content-type", "application/json").body(
				r#"{"statusCode":429,"message":"Rate limit is exceeded. Try again in 1 seconds."}"#,
			);
		})
		.await;
	let err = client.add_on("9NADDON").await.expect_err("Throttling must fail the call.");

	assert_eq!(err.status(), Some(429));
	assert_eq!(
		err.to_string(),
		r#"add_on(9NADDON) failed [429] {"statusCode":429,"message":"Rate limit is exceeded. Try again in 1 seconds."}"#
	);

	add_on.assert_calls_async(1).await;
}
