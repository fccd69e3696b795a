//! Resource families, well-known actions, and per-call request info.

use std::fmt;

use crate::params::Parameters;

/// Top-level API section; forms the first path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Sellers,
    Orders,
    Products,
    FulfillmentInventory,
    Reports,
    Finances,
    Subscriptions,
    Feeds,
    ShipmentInvoicing,
    MerchantFulfillment,
    FulfillmentInboundShipment,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Sellers => "Sellers",
            Resource::Orders => "Orders",
            Resource::Products => "Products",
            Resource::FulfillmentInventory => "FulfillmentInventory",
            Resource::Reports => "Reports",
            Resource::Finances => "Finances",
            Resource::Subscriptions => "Subscriptions",
            Resource::Feeds => "Feeds",
            Resource::ShipmentInvoicing => "ShipmentInvoicing",
            Resource::MerchantFulfillment => "MerchantFulfillment",
            Resource::FulfillmentInboundShipment => "FulfillmentInboundShipment",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions the dispatcher treats specially.
pub mod action {
    /// Feed document travels as the raw request body.
    pub const SUBMIT_FEED: &str = "SubmitFeed";
    /// Returns an opaque report document.
    pub const GET_REPORT: &str = "GetReport";
    /// Returns an opaque processing report.
    pub const GET_FEED_SUBMISSION_RESULT: &str = "GetFeedSubmissionResult";
    /// May report an invalid identifier inside a 200 response.
    pub const GET_MATCHING_PRODUCT_FOR_ID: &str = "GetMatchingProductForId";
    pub const GET_SERVICE_STATUS: &str = "GetServiceStatus";
}

/// Marker text of the in-band invalid identifier failure.
pub const INVALID_UPC_MARKER: &str = "Invalid UPC identifier";

/// What to call: resource, API version, action and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInfo {
    pub resource: Resource,
    pub version: String,
    pub action: String,
    pub parameters: Parameters,
}

impl ResourceInfo {
    pub fn new(resource: Resource, version: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource,
            version: version.into(),
            action: action.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Success body is a caller-defined document, never parsed.
    pub fn is_artifact_retrieval(&self) -> bool {
        self.action == action::GET_REPORT || self.action == action::GET_FEED_SUBMISSION_RESULT
    }

    pub fn is_feed_submission(&self) -> bool {
        self.action == action::SUBMIT_FEED
    }

    pub fn is_lookup_by_id(&self) -> bool {
        self.action == action::GET_MATCHING_PRODUCT_FOR_ID
    }

    /// `/{resource}/{version}`
    pub fn path(&self) -> String {
        format!("/{}/{}", self.resource, self.version)
    }
}
