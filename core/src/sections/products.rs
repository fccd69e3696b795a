//! Products: catalog lookups.

use serde_json::Value;

use crate::client::MwsClient;
use crate::error::Result;
use crate::http::{HttpMethod, Transport};
use crate::params::Parameters;
use crate::resource::{action, Resource, ResourceInfo};
use crate::response::RequestMeta;

pub const PRODUCTS_API_VERSION: &str = "2011-10-01";

/// Identifier family accepted by `GetMatchingProductForId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdType {
    Asin,
    GCid,
    SellerSku,
    Upc,
    Ean,
    Isbn,
    Jan,
}

impl IdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdType::Asin => "ASIN",
            IdType::GCid => "GCID",
            IdType::SellerSku => "SellerSKU",
            IdType::Upc => "UPC",
            IdType::Ean => "EAN",
            IdType::Isbn => "ISBN",
            IdType::Jan => "JAN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetMatchingProductForIdParameters {
    pub marketplace_id: String,
    pub id_type: IdType,
    pub id_list: Vec<String>,
}

pub struct Products<'a, T> {
    pub(super) client: &'a MwsClient<T>,
}

impl<T: Transport> Products<'_, T> {
    /// Look products up by external identifier.
    ///
    /// Returns the `GetMatchingProductForIdResponse` element as a document;
    /// product attribute sets vary too much by category for a fixed schema.
    /// An invalid identifier fails with `ErrorKind::InvalidUpcIdentifier`.
    pub async fn get_matching_product_for_id(
        &self,
        parameters: &GetMatchingProductForIdParameters,
    ) -> Result<(Value, RequestMeta)> {
        let info = ResourceInfo::new(Resource::Products, PRODUCTS_API_VERSION, action::GET_MATCHING_PRODUCT_FOR_ID)
            .with_parameters(
                Parameters::new()
                    .with("IdList.Id", parameters.id_list.clone())
                    .with("IdType", parameters.id_type.as_str())
                    .with("MarketplaceId", parameters.marketplace_id.as_str()),
            );
        let (document, meta) = self.client.request_document::<Value>(HttpMethod::Post, &info, None).await?;
        let response = match document {
            Value::Object(mut map) => map
                .remove("GetMatchingProductForIdResponse")
                .unwrap_or(Value::Object(map)),
            other => other,
        };
        Ok((response, meta))
    }
}
