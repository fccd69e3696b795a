//! Sellers: marketplaces the account participates in.

use serde::Deserialize;

use crate::client::MwsClient;
use crate::codec::{empty_as_default, ensure_string, one_or_many, yes_no};
use crate::error::Result;
use crate::http::{HttpMethod, Transport};
use crate::resource::{Resource, ResourceInfo};
use crate::response::RequestMeta;
use crate::sections::ServiceStatusResult;

pub const SELLERS_API_VERSION: &str = "2011-07-01";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListMarketplaceParticipationsResult {
    #[serde(rename = "NextToken", default, deserialize_with = "ensure_string::option")]
    pub next_token: Option<String>,
    #[serde(rename = "ListParticipations", default, deserialize_with = "empty_as_default")]
    pub participations: ParticipationList,
    #[serde(rename = "ListMarketplaces", default, deserialize_with = "empty_as_default")]
    pub marketplaces: MarketplaceList,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParticipationList {
    #[serde(rename = "Participation", default, deserialize_with = "one_or_many")]
    pub participation: Vec<Participation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Participation {
    #[serde(rename = "MarketplaceId", deserialize_with = "ensure_string::deserialize")]
    pub marketplace_id: String,
    #[serde(rename = "SellerId", deserialize_with = "ensure_string::deserialize")]
    pub seller_id: String,
    #[serde(rename = "HasSellerSuspendedListings", deserialize_with = "yes_no::deserialize")]
    pub has_seller_suspended_listings: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MarketplaceList {
    #[serde(rename = "Marketplace", default, deserialize_with = "one_or_many")]
    pub marketplace: Vec<Marketplace>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Marketplace {
    #[serde(rename = "MarketplaceId", deserialize_with = "ensure_string::deserialize")]
    pub marketplace_id: String,
    #[serde(rename = "Name", deserialize_with = "ensure_string::deserialize")]
    pub name: String,
    #[serde(rename = "DefaultCountryCode")]
    pub default_country_code: String,
    #[serde(rename = "DefaultCurrencyCode")]
    pub default_currency_code: String,
    #[serde(rename = "DefaultLanguageCode")]
    pub default_language_code: String,
    #[serde(rename = "DomainName")]
    pub domain_name: String,
}

pub struct Sellers<'a, T> {
    pub(super) client: &'a MwsClient<T>,
}

impl<T: Transport> Sellers<'_, T> {
    pub async fn list_marketplace_participations(&self) -> Result<(ListMarketplaceParticipationsResult, RequestMeta)> {
        let info = ResourceInfo::new(Resource::Sellers, SELLERS_API_VERSION, "ListMarketplaceParticipations");
        self.client.request_result(HttpMethod::Post, &info, None).await
    }

    pub async fn get_service_status(&self) -> Result<(ServiceStatusResult, RequestMeta)> {
        self.client.get_service_status(Resource::Sellers, SELLERS_API_VERSION).await
    }
}
