//! Queries a user's entitlements through a mock Collections service, reusing the cached service
//! token across calls.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use ms_store_services::{
	auth::{AccessToken, Credentials},
	cache::{MemoryCache, TokenCache},
	client::StoreServicesClient,
	collections::CollectionsQueryRequest,
	config::StoreConfig,
	fetcher::AadTokenFetcher,
	http::ReqwestHttpClient,
	manager::AudienceTokenManager,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/tenant-contoso/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"token_type\":\"Bearer\",\"expires_in\":\"3599\",\"access_token\":\"demo-service-token\"}",
			);
		})
		.await;
	let query_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v8.0/collections/b2bLicensePreview")
				.header("authorization", "Bearer demo-service-token");
			then.status(200).header("content-type", "application/json").body(
				r#"{"items":[{"id":"item-1","productId":"9NBLGGH4R315","productKind":"Durable","status":"Active","quantity":1}]}"#,
			);
		})
		.await;
	let config = StoreConfig::default()
		.with_authority(server.base_url())
		.with_collections_base(server.base_url())
		.with_service_identity("Contoso.Fulfillment");

	config.validate()?;

	let credentials = Credentials::new("tenant-contoso", "demo-client", "super-secret")?;
	let http_client = ReqwestHttpClient::from_config(&config)?;
	let fetcher =
		AadTokenFetcher::new(&config.authority_url()?, credentials, http_client.clone())?;
	let cache: Arc<dyn TokenCache> = Arc::new(MemoryCache::<AccessToken>::default());
	let manager = AudienceTokenManager::new(Arc::new(fetcher), cache).with_config(&config);
	let client = StoreServicesClient::new(&config, Arc::new(manager), http_client)?;
	let request = CollectionsQueryRequest::for_user("demo-user-collections-id");

	for _ in 0..2 {
		let page = client.collections_query(&request).await?;

		for item in &page.items {
			println!("Owned {} ({:?}), quantity {}.", item.product_id, item.product_kind, item.quantity);
		}
	}

	token_mock.assert_calls_async(1).await;
	query_mock.assert_calls_async(2).await;

	Ok(())
}
