//! Collections service payloads: entitlement queries and consumable fulfillment.
//!
//! Every enumeration keeps an `Other` variant so values the service adds later still decode.

// crates.io
use serde::Deserializer;
use serde_json::Value;
// self
use crate::_prelude::*;

macro_rules! def_open_enum {
	(
		$(#[$meta:meta])*
		$name:ident { $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)? }
	) => {
		$(#[$meta])*
		#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(from = "String", into = "String")]
		pub enum $name {
			$($(#[$vmeta])* $variant,)+
			/// Value not known to this client.
			Other(String),
		}
		impl $name {
			/// Wire representation.
			pub fn as_str(&self) -> &str {
				match self {
					$(Self::$variant => $wire,)+
					Self::Other(value) => value,
				}
			}
		}
		impl From<String> for $name {
			fn from(value: String) -> Self {
				match value.as_str() {
					$($wire => Self::$variant,)+
					_ => Self::Other(value),
				}
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				match value {
					$name::Other(value) => value,
					known => known.as_str().to_owned(),
				}
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(self.as_str())
			}
		}
	};
}

def_open_enum! {
	/// Product families a query can be filtered to.
	EntitlementFilter {
		/// Games.
		Game => "*:Game",
		/// Applications.
		Application => "*:Application",
		/// Durable add-ons.
		Durable => "*:Durable",
		/// Store-managed consumables.
		Consumable => "*:Consumable",
		/// Developer-managed consumables.
		UnmanagedConsumable => "*:UnmanagedConsumable",
		/// Subscriptions and passes.
		Subscription => "*:Pass",
	}
}
def_open_enum! {
	/// Which entitlements are returned based on their validity window.
	ValidityType {
		/// Every entitlement.
		All => "All",
		/// Currently valid entitlements.
		Valid => "Valid",
		/// Invalid entitlements.
		Invalid => "Invalid",
		/// Entitlements whose end date has not passed.
		NotYetEnded => "NotYetEnded",
		/// Entitlements whose start date is in the future.
		NotYetStarted => "NotYetStarted",
	}
}
def_open_enum! {
	/// How an entitlement was acquired.
	AcquisitionType {
		/// Subscription.
		Recurring => "Recurring",
		/// One-time purchase.
		Single => "Single",
		/// Granted through another product.
		Conditional => "Conditional",
	}
}
def_open_enum! {
	/// Entitlement status.
	ProductStatus {
		/// Usable.
		Active => "Active",
		/// Refunded or charged back.
		Revoked => "Revoked",
		/// Past its end date.
		Expired => "Expired",
		/// Banned by enforcement.
		Banned => "Banned",
		/// Temporarily suspended.
		Suspended => "Suspended",
	}
}
def_open_enum! {
	/// Product kind of an entitlement.
	ProductKind {
		/// Game.
		Game => "Game",
		/// Application.
		Application => "Application",
		/// Durable add-on.
		Durable => "Durable",
		/// Store-managed consumable.
		Consumable => "Consumable",
		/// Developer-managed consumable.
		UnmanagedConsumable => "UnmanagedConsumable",
	}
}

/// User a Collections request acts on behalf of.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsRequestBeneficiary {
	/// Always `b2b` for UserCollectionsId-based requests.
	#[serde(rename = "identitytype")]
	pub identity_type: String,
	/// UserCollectionsId minted by the client.
	pub identity_value: String,
	/// Caller-chosen reference echoed back on each returned item.
	#[serde(default)]
	pub local_ticket_reference: String,
}
impl CollectionsRequestBeneficiary {
	/// Beneficiary identified by a UserCollectionsId.
	pub fn new(user_collections_id: impl Into<String>) -> Self {
		Self {
			identity_type: "b2b".into(),
			identity_value: user_collections_id.into(),
			local_ticket_reference: String::new(),
		}
	}

	/// Sets the local ticket reference.
	pub fn with_local_ticket_reference(mut self, reference: impl Into<String>) -> Self {
		self.local_ticket_reference = reference.into();

		self
	}
}

/// Product/SKU pair used to narrow a query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSkuId {
	/// Store product id.
	pub product_id: String,
	/// SKU id within the product.
	pub sku_id: String,
}

/// Body of a `b2bLicensePreview` query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsQueryRequest {
	/// Maximum items per page (service maximum is 100).
	pub max_page_size: u32,
	/// Return one entitlement per product.
	pub exclude_duplicates: bool,
	/// Product families to include.
	pub entitlement_filters: Vec<EntitlementFilter>,
	/// Restricts results to these product/SKU pairs.
	#[serde(default)]
	pub product_sku_ids: Vec<ProductSkuId>,
	/// Market used for localized results.
	pub market: String,
	/// Include products that satisfy entitlements indirectly (bundles, passes).
	pub expand_satisfying_items: bool,
	/// Exactly one beneficiary must be supplied.
	pub beneficiaries: Vec<CollectionsRequestBeneficiary>,
	/// Validity filter applied by the service.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub validity_type: Option<ValidityType>,
	/// Sandbox to query, for development sandboxes.
	#[serde(rename = "sbx", default, skip_serializing_if = "Option::is_none")]
	pub sandbox_id: Option<String>,
	/// Continuation token from a previous page.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub continuation_token: Option<String>,
}
impl CollectionsQueryRequest {
	/// Query for every entitlement family owned by `user_collections_id`.
	pub fn for_user(user_collections_id: impl Into<String>) -> Self {
		Self {
			beneficiaries: vec![CollectionsRequestBeneficiary::new(user_collections_id)],
			..Default::default()
		}
	}

	/// Checks that exactly one beneficiary with a UserCollectionsId is present.
	pub fn validate(&self) -> Result<()> {
		match self.beneficiaries.as_slice() {
			[beneficiary] if !beneficiary.identity_value.trim().is_empty() => Ok(()),
			_ => Err(Error::invalid_argument(
				"beneficiaries",
				"exactly one beneficiary with a UserCollectionsId must be provided",
			)),
		}
	}
}
impl Default for CollectionsQueryRequest {
	fn default() -> Self {
		Self {
			max_page_size: 100,
			exclude_duplicates: true,
			entitlement_filters: vec![
				EntitlementFilter::Game,
				EntitlementFilter::Consumable,
				EntitlementFilter::UnmanagedConsumable,
				EntitlementFilter::Durable,
				EntitlementFilter::Subscription,
			],
			product_sku_ids: Vec::new(),
			market: "neutral".into(),
			expand_satisfying_items: true,
			beneficiaries: Vec::new(),
			validity_type: None,
			sandbox_id: None,
			continuation_token: None,
		}
	}
}

/// One page of query results.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionsQueryResponse {
	/// Entitlements on this page.
	#[serde(deserialize_with = "nullable")]
	pub items: Vec<CollectionsItem>,
	/// Token for the next page, when more results exist.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub continuation_token: Option<String>,
}
impl CollectionsQueryResponse {
	/// Returns `true` when the page carries at least one item.
	pub fn has_items(&self) -> bool {
		!self.items.is_empty()
	}
}

/// Entitlement returned by a query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionsItem {
	/// When the user acquired the entitlement.
	#[serde(with = "time::serde::rfc3339::option")]
	pub acquired_date: Option<OffsetDateTime>,
	/// How the entitlement was acquired.
	pub acquisition_type: Option<AcquisitionType>,
	/// When the entitlement stops being valid.
	#[serde(with = "time::serde::rfc3339::option")]
	pub end_date: Option<OffsetDateTime>,
	/// Developer-defined offer token of the add-on.
	pub in_app_offer_token: Option<String>,
	/// Entitlement item id, used for consume and recurrence calls.
	pub id: String,
	/// Legacy (Xbox 360 era) offer instance id.
	pub legacy_offer_instance_id: Option<String>,
	/// Legacy product id.
	pub legacy_product_id: Option<String>,
	/// Reference supplied by the caller in the request beneficiary.
	pub local_ticket_reference: Option<String>,
	/// Last time the entitlement changed.
	#[serde(with = "time::serde::rfc3339::option")]
	pub modified_date: Option<OffsetDateTime>,
	/// Market the purchase was made in.
	pub purchased_country: Option<String>,
	/// Product family, e.g. `Games` or `Apps`.
	pub product_family: Option<String>,
	/// Store product id.
	pub product_id: String,
	/// Product kind.
	pub product_kind: Option<ProductKind>,
	/// Subscription recurrence details.
	pub recurrence_data: Option<RecurrenceData>,
	/// Products that satisfy this entitlement (bundles, passes).
	#[serde(deserialize_with = "nullable")]
	pub satisfied_by_product_ids: Vec<String>,
	/// Whether the entitlement is shared with the user (e.g. via a family group).
	pub sharing_source: Option<String>,
	/// SKU id within the product.
	pub sku_id: String,
	/// When the entitlement became valid.
	#[serde(with = "time::serde::rfc3339::option")]
	pub start_date: Option<OffsetDateTime>,
	/// Entitlement status.
	pub status: Option<ProductStatus>,
	/// Service-defined tags.
	#[serde(deserialize_with = "nullable")]
	pub tags: Vec<String>,
	/// Trial state for subscription entitlements.
	pub trial_data: Option<TrialData>,
	/// Developer offer id of the purchased offer.
	pub dev_offer_id: Option<String>,
	/// Remaining balance for consumables.
	pub quantity: i64,
	/// Purchase transaction id.
	pub transaction_id: String,
}

/// Subscription recurrence details.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecurrenceData {
	/// Recurrence (subscription) id.
	pub recurrence_id: String,
}

/// Trial state of a subscription entitlement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrialData {
	/// Trial currently running.
	pub is_in_trial_period: bool,
	/// Entitlement is a trial.
	pub is_trial: bool,
	/// Remaining trial time as reported by the service.
	pub trial_time_remaining: Option<Value>,
}

/// Body of a consume (fulfillment) request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsConsumeRequest {
	/// User whose balance is consumed.
	pub beneficiary: CollectionsRequestBeneficiary,
	/// Consumable product id.
	pub product_id: String,
	/// Quantity to remove; must be positive.
	pub remove_quantity: i64,
	/// Idempotency key; replaying the same id returns the original result.
	pub tracking_id: String,
	/// Ask the service to return the order ids that funded the consume.
	#[serde(default)]
	pub include_order_ids: bool,
}
impl CollectionsConsumeRequest {
	/// Consume `remove_quantity` of `product_id` for `user_collections_id`.
	pub fn new(
		user_collections_id: impl Into<String>,
		product_id: impl Into<String>,
		remove_quantity: i64,
		tracking_id: impl Into<String>,
	) -> Self {
		Self {
			beneficiary: CollectionsRequestBeneficiary::new(user_collections_id),
			product_id: product_id.into(),
			remove_quantity,
			tracking_id: tracking_id.into(),
			include_order_ids: false,
		}
	}

	/// Checks the product, quantity, tracking id, and beneficiary.
	pub fn validate(&self) -> Result<()> {
		Error::require_non_empty("product_id", &self.product_id)?;

		if self.remove_quantity <= 0 {
			return Err(Error::invalid_argument("remove_quantity", "must be greater than 0"));
		}

		Error::require_non_empty("tracking_id", &self.tracking_id)?;
		Error::require_non_empty("beneficiary.identity_value", &self.beneficiary.identity_value)
	}
}

/// Successful consume result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionsConsumeResponse {
	/// Entitlement item the quantity was removed from.
	pub item_id: String,
	/// Balance after the consume.
	pub new_quantity: i64,
	/// Tracking id of the request.
	pub tracking_id: String,
	/// Consumed product id.
	pub product_id: String,
	/// Order ids, when requested.
	#[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
	pub order_ids: Vec<String>,
}

/// Error body returned by a failed consume.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionsConsumeErrorResponse {
	/// Top-level error code.
	pub code: String,
	/// Additional data strings.
	#[serde(deserialize_with = "nullable")]
	pub data: Vec<String>,
	/// Structured details.
	#[serde(deserialize_with = "nullable")]
	pub details: Vec<Value>,
	/// Specific failure reason.
	#[serde(rename = "innererror")]
	pub inner_error: ConsumeError,
	/// Top-level message.
	pub message: String,
	/// Component that produced the error.
	pub source: String,
}

/// Specific consume failure reason.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumeError {
	/// Error code, e.g. `InsufficientQuantity`.
	pub code: String,
	/// Additional data strings.
	#[serde(deserialize_with = "nullable")]
	pub data: Vec<String>,
	/// Structured details.
	#[serde(deserialize_with = "nullable")]
	pub details: Vec<Value>,
	/// Human-readable description.
	pub message: String,
	/// Component that produced the error.
	pub source: String,
}

/// Treats an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn query_defaults_match_service_expectations() {
		let body = serde_json::to_value(CollectionsQueryRequest::for_user("ucid"))
			.expect("Query should serialize.");

		assert_eq!(
			body,
			serde_json::json!({
				"maxPageSize": 100,
				"excludeDuplicates": true,
				"entitlementFilters": ["*:Game", "*:Consumable", "*:UnmanagedConsumable", "*:Durable", "*:Pass"],
				"productSkuIds": [],
				"market": "neutral",
				"expandSatisfyingItems": true,
				"beneficiaries": [{ "identitytype": "b2b", "identityValue": "ucid", "localTicketReference": "" }],
			})
		);
	}

	#[test]
	fn query_requires_single_beneficiary() {
		assert!(CollectionsQueryRequest::for_user("ucid").validate().is_ok());

		let mut request = CollectionsQueryRequest::default();

		assert!(matches!(
			request.validate(),
			Err(Error::InvalidArgument { name: "beneficiaries", .. })
		));

		request.beneficiaries = vec![
			CollectionsRequestBeneficiary::new("a"),
			CollectionsRequestBeneficiary::new("b"),
		];

		assert!(request.validate().is_err());

		request.beneficiaries = vec![CollectionsRequestBeneficiary::new("")];

		assert!(request.validate().is_err());
	}

	#[test]
	fn consume_validation_names_the_bad_field() {
		let cases = [
			(CollectionsConsumeRequest::new("ucid", "", 1, "t"), "product_id"),
			(CollectionsConsumeRequest::new("ucid", "9N", 0, "t"), "remove_quantity"),
			(CollectionsConsumeRequest::new("ucid", "9N", 1, ""), "tracking_id"),
			(CollectionsConsumeRequest::new("", "9N", 1, "t"), "beneficiary.identity_value"),
		];

		for (request, field) in cases {
			match request.validate() {
				Err(Error::InvalidArgument { name, .. }) => assert_eq!(name, field),
				other => panic!("Unexpected validation result: {other:?}."),
			}
		}

		assert!(CollectionsConsumeRequest::new("ucid", "9N", 1, "t").validate().is_ok());
	}

	#[test]
	fn items_decode_with_unknown_values_and_nulls() {
		let page: CollectionsQueryResponse = serde_json::from_str(
			r#"{
				"items": [{
					"acquiredDate": "2021-05-10T22:38:19.3437469+00:00",
					"acquisitionType": "Single",
					"id": "item-1",
					"productId": "9NBLGGH4R315",
					"productKind": "Hologram",
					"quantity": 10,
					"skuId": "0010",
					"status": "Active",
					"tags": null,
					"trialData": { "isInTrialPeriod": false, "isTrial": false, "trialTimeRemaining": "00:00:00" },
					"transactionId": "tx-1"
				}],
				"continuationToken": null
			}"#,
		)
		.expect("Query page should decode.");
		let item = &page.items[0];

		assert!(page.has_items());
		assert_eq!(item.product_kind, Some(ProductKind::Other("Hologram".into())));
		assert_eq!(item.status, Some(ProductStatus::Active));
		assert_eq!(item.acquisition_type, Some(AcquisitionType::Single));
		assert_eq!(item.quantity, 10);
		assert!(item.tags.is_empty());
		assert_eq!(
			item.acquired_date.map(|date| date.date()),
			Some(macros::date!(2021-05-10))
		);
		assert_eq!(page.continuation_token, None);
	}

	#[test]
	fn open_enums_round_trip_unknown_values() {
		let filter: EntitlementFilter =
			serde_json::from_str("\"*:Bundle\"").expect("Unknown filters should decode.");

		assert_eq!(filter, EntitlementFilter::Other("*:Bundle".into()));
		assert_eq!(
			serde_json::to_string(&filter).expect("Unknown filters should encode."),
			"\"*:Bundle\""
		);
		assert_eq!(ValidityType::from(String::from("NotYetEnded")), ValidityType::NotYetEnded);
	}
}
