//! Thin per-resource wrappers over `MwsClient::request`.
//!
//! Each wrapper fixes the resource, version and action, lays out the call
//! parameters and decodes the `{Action}Result` element of the response into a
//! typed value. Artifact-retrieval actions return the body as text.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::client::MwsClient;
use crate::codec::ServiceStatus;
use crate::error::{MwsError, Result};
use crate::http::{HttpMethod, Transport};
use crate::resource::{action, Resource, ResourceInfo};
use crate::response::{decode_document, RequestMeta};

pub mod feeds;
pub mod products;
pub mod reports;
pub mod sellers;

pub use feeds::Feeds;
pub use products::Products;
pub use reports::Reports;
pub use sellers::Sellers;

/// `GetServiceStatusResult`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceStatusResult {
    #[serde(rename = "Status")]
    pub status: ServiceStatus,
    #[serde(rename = "Timestamp", deserialize_with = "crate::codec::mws_date::deserialize")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> MwsClient<T> {
    pub fn sellers(&self) -> Sellers<'_, T> {
        Sellers { client: self }
    }

    pub fn products(&self) -> Products<'_, T> {
        Products { client: self }
    }

    pub fn reports(&self) -> Reports<'_, T> {
        Reports { client: self }
    }

    pub fn feeds(&self) -> Feeds<'_, T> {
        Feeds { client: self }
    }
}

impl<T: Transport> MwsClient<T> {
    /// Health of one resource family at one API version.
    pub async fn get_service_status(
        &self,
        resource: Resource,
        version: &str,
    ) -> Result<(ServiceStatusResult, RequestMeta)> {
        let info = ResourceInfo::new(resource, version, action::GET_SERVICE_STATUS);
        self.request_result(HttpMethod::Post, &info, None).await
    }

    /// Call `info` and decode its `{Action}Result` element into `R`.
    pub(crate) async fn request_result<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        info: &ResourceInfo,
        body: Option<&str>,
    ) -> Result<(R, RequestMeta)> {
        let (body, meta) = self.request(method, info, body).await?;
        let result = action_result(body.into_document()?, &info.action)?;
        Ok((decode_document(result)?, meta))
    }
}

/// Take `{action}Response.{action}Result` out of a response document.
pub fn action_result(mut document: Value, action: &str) -> Result<Value> {
    document
        .get_mut(format!("{action}Response"))
        .and_then(|response| response.get_mut(format!("{action}Result")))
        .map(Value::take)
        .ok_or_else(|| MwsError::Parsing(format!("missing {action}Response.{action}Result")))
}
