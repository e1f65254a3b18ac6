// crates.io
use httpmock::prelude::*;
// self
use ms_store_services::{
	_preludet::*,
	auth::Credentials,
	client::StoreServicesClient,
	collections::{CollectionsConsumeRequest, CollectionsQueryRequest},
	config::StoreConfig,
	http::ReqwestHttpClient,
};

const TOKEN_BODY: &str =
	"{\"token_type\":\"Bearer\",\"expires_in\":\"3599\",\"access_token\":\"svc-token\"}";

async fn client_with_token(
	server: &MockServer,
) -> (StoreServicesClient<ReqwestHttpClient>, httpmock::Mock<'_>) {
	let config: StoreConfig =
		test_config(&server.base_url()).with_service_identity("Contoso.Fulfillment");
	let credentials = Credentials::new("tenant-it", "client-it", "secret")
		.expect("Credentials should be valid for store client tests.");
	let (manager, _cache) = build_reqwest_test_manager(&config, credentials);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/tenant-it/oauth2/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let client = StoreServicesClient::new(&config, Arc::new(manager), test_reqwest_http_client())
		.expect("Store client should build against the mock server.");

	(client, token)
}

#[tokio::test]
async fn query_is_authorized_and_decoded() {
	let server = MockServer::start_async().await;
	let (client, token) = client_with_token(&server).await;
	let query = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v8.0/collections/b2bLicensePreview")
				.header("authorization", "Bearer svc-token")
				.header("user-agent", "Contoso.Fulfillment")
				.header("content-type", "application/json");
			then.status(200).header("content-type", "application/json").body(
				r#"{"items":[{"id":"item-1","productId":"9NGAME","productKind":"Game","quantity":1,"status":"Active","acquisitionType":"Single","beneficiary":"ucid"}]}"#,
			);
		})
		.await;
	let request = CollectionsQueryRequest::for_user("ucid");
	let first = client.collections_query(&request).await.expect("Query should succeed.");
	let second = client.collections_query(&request).await.expect("Repeat query should succeed.");

	assert!(first.has_items());
	assert_eq!(first.items[0].product_id, "9NGAME");
	assert_eq!(first, second);

	query.assert_calls_async(2).await;
	token.assert_calls_async(1).await;
}

#[tokio::test]
async fn consume_failures_carry_the_inner_error() {
	let server = MockServer::start_async().await;
	let (client, _token) = client_with_token(&server).await;
	let consume = server
		.mock_async(|when, then| {
			when.method(POST).path("/v8.0/collections/consume");
			then.status(400).header("content-type", "application/json").body(
				r#"{"code":"BadRequest","data":null,"details":null,"innererror":{"code":"InsufficientQuantity","data":null,"details":null,"message":"Not enough quantity.","source":"Collections"},"message":"Consume failed.","source":"Collections"}"#,
			);
		})
		.await;
	let err = client
		.collections_consume(&CollectionsConsumeRequest::new("ucid", "9NCOINS", 5, "track-1"))
		.await
		.expect_err("Insufficient quantity must fail the consume.");

	match err {
		Error::Consume(e) => {
			assert_eq!(e.status, 400);
			assert_eq!(e.error.code, "InsufficientQuantity");
			assert_eq!(e.error.source, "Collections");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	consume.assert_calls_async(1).await;
}

#[tokio::test]
async fn consume_success_returns_new_balance() {
	let server = MockServer::start_async().await;
	let (client, _token) = client_with_token(&server).await;
	let consume = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v8.0/collections/consume")
				.header("authorization", "Bearer svc-token");
			then.status(200).header("content-type", "application/json").body(
				r#"{"itemId":"item-7","newQuantity":15,"trackingId":"track-2","productId":"9NCOINS"}"#,
			);
		})
		.await;
	let response = client
		.collections_consume(&CollectionsConsumeRequest::new("ucid", "9NCOINS", 5, "track-2"))
		.await
		.expect("Consume should succeed.");

	assert_eq!(response.new_quantity, 15);
	assert_eq!(response.tracking_id, "track-2");

	consume.assert_calls_async(1).await;
}

#[tokio::test]
async fn token_failures_stop_the_call() {
	let server = MockServer::start_async().await;
	let config = test_config(&server.base_url());
	let credentials = Credentials::new("tenant-it", "client-it", "secret")
		.expect("Credentials should be valid for store client tests.");
	let (manager, _cache) = build_reqwest_test_manager(&config, credentials);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/tenant-it/oauth2/token");
			then.status(400).body("{\"error\":\"invalid_request\"}");
		})
		.await;
	let query = server
		.mock_async(|when, then| {
			when.method(POST).path("/v8.0/collections/b2bLicensePreview");
			then.status(200).body("{}");
		})
		.await;
	let client = StoreServicesClient::new(&config, Arc::new(manager), test_reqwest_http_client())
		.expect("Store client should build against the mock server.");
	let err = client
		.collections_query(&CollectionsQueryRequest::for_user("ucid"))
		.await
		.expect_err("Token failures must reach the caller.");

	assert_eq!(err.status(), Some(400));

	token.assert_calls_async(1).await;
	query.assert_calls_async(0).await;
}
