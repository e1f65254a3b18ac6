//! Partner Center add-on (in-app product) resources.

// self
use crate::_prelude::*;

/// Body of a create-add-on request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddOnRequest {
	/// Applications the add-on belongs to.
	pub application_ids: Vec<String>,
	/// Developer-chosen product id.
	pub product_id: String,
	/// Add-on type, e.g. `Durable` or `Consumable`.
	pub product_type: String,
}

/// Application reference inside an add-on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationData {
	/// Store id of the application.
	pub id: String,
	/// Relative resource location.
	pub resource_location: String,
}

/// Applications an add-on is attached to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationsInfo {
	#[allow(missing_docs)]
	pub value: Vec<ApplicationData>,
	#[allow(missing_docs)]
	pub total_count: u64,
}

/// Pointer to a submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmissionInfo {
	/// Submission id.
	pub id: String,
	/// Relative resource location.
	pub resource_location: String,
}

/// An add-on as returned by Partner Center.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddOnResource {
	/// Applications the add-on belongs to.
	pub applications: ApplicationsInfo,
	/// Store id of the add-on.
	pub id: String,
	/// Developer-chosen product id.
	pub product_id: String,
	/// Add-on type.
	pub product_type: String,
	/// Submission currently in progress, if any.
	pub pending_in_app_product_submission: Option<SubmissionInfo>,
	/// Most recently published submission, if any.
	pub last_published_in_app_product_submission: Option<SubmissionInfo>,
}

/// Add-on id inside an application listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddOnItem {
	/// Store id of the add-on.
	pub in_app_product_id: String,
}

/// One page of an application's add-ons.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppAddOnsResponse {
	/// Relative link to the next page.
	#[serde(rename = "@nextLink", skip_serializing_if = "Option::is_none")]
	pub next_link: Option<String>,
	/// Add-ons on this page.
	pub value: Vec<AddOnItem>,
	/// Total number of add-ons for the application.
	pub total_count: u64,
}

/// Icon attached to a listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IconInfo {
	/// File name inside the uploaded package.
	pub file_name: String,
	/// Upload status, e.g. `Uploaded` or `PendingUpload`.
	pub file_status: String,
}

/// Localized listing of an add-on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingInfo {
	/// Listing description.
	pub description: String,
	/// Listing icon.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub icon: Option<IconInfo>,
	/// Listing title.
	pub title: String,
}

/// Temporary price change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleInfo {
	/// Sale name.
	pub name: String,
	/// Base price tier during the sale.
	pub base_price_id: String,
	/// Sale start.
	#[serde(with = "time::serde::rfc3339")]
	pub start_date: OffsetDateTime,
	/// Sale end.
	#[serde(with = "time::serde::rfc3339")]
	pub end_date: OffsetDateTime,
	/// Per-market price tiers keyed by market code.
	#[serde(default)]
	pub market_specific_pricings: BTreeMap<String, String>,
}

/// Pricing of an add-on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingInfo {
	/// Per-market price tiers keyed by market code.
	pub market_specific_pricings: BTreeMap<String, String>,
	/// Base price tier.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub price_id: Option<String>,
	/// Uses the advanced pricing model.
	pub is_advanced_pricing_model: bool,
	/// Scheduled sales.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub sales: Vec<SaleInfo>,
}
impl Default for PricingInfo {
	fn default() -> Self {
		Self {
			market_specific_pricings: BTreeMap::new(),
			price_id: None,
			is_advanced_pricing_model: true,
			sales: Vec::new(),
		}
	}
}

/// Mutable part of an add-on submission; unset fields are omitted from the request body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateAddOnSubmissionResource {
	/// Content type, e.g. `EMagazine` or `OnlineDataStorage`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub content_type: Option<String>,
	/// Search keywords.
	pub keywords: Vec<String>,
	/// Entitlement lifetime, e.g. `Forever` or `OneMonth`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub lifetime: Option<String>,
	/// Listings keyed by language code.
	pub listings: BTreeMap<String, ListingInfo>,
	/// Pricing.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pricing: Option<PricingInfo>,
	/// Publish date when `target_publish_mode` is `SpecificDate`.
	#[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
	pub target_publish_date: Option<OffsetDateTime>,
	/// Publish mode, e.g. `Immediate` or `Manual`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_publish_mode: Option<String>,
	/// Developer tag.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tag: Option<String>,
	/// Visibility, e.g. `Public` or `Hidden`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub visibility: Option<String>,
}

/// Certification error or warning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorInfo {
	/// Error code.
	pub code: String,
	/// Error details.
	pub details: String,
}

/// Submission status details.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusDetails {
	/// Blocking errors.
	pub errors: Vec<ErrorInfo>,
	/// Non-blocking warnings.
	pub warnings: Vec<ErrorInfo>,
	/// Certification reports, passed through untouched.
	pub certification_reports: Vec<serde_json::Value>,
}

/// An add-on submission.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddOnSubmissionResource {
	/// Submission id.
	pub id: String,
	/// Submission status, e.g. `PendingCommit`.
	pub status: String,
	/// Status details.
	pub status_details: StatusDetails,
	/// SAS URL for uploading the submission package.
	pub file_upload_url: String,
	/// Friendly name.
	pub friendly_name: String,
	/// Editable fields.
	#[serde(flatten)]
	pub resource: UpdateAddOnSubmissionResource,
}

/// Result of committing a submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitResponse {
	/// Status after the commit, normally `CommitStarted`.
	pub status: String,
}
