//! Reports: generated report documents.

use crate::client::MwsClient;
use crate::error::Result;
use crate::http::{HttpMethod, Transport};
use crate::params::Parameters;
use crate::resource::{action, Resource, ResourceInfo};
use crate::response::RequestMeta;

pub const REPORTS_API_VERSION: &str = "2009-01-01";

pub struct Reports<'a, T> {
    pub(super) client: &'a MwsClient<T>,
}

impl<T: Transport> Reports<'_, T> {
    /// Report contents exactly as generated; the format depends on the
    /// report type.
    pub async fn get_report(&self, report_id: &str) -> Result<(String, RequestMeta)> {
        let info = ResourceInfo::new(Resource::Reports, REPORTS_API_VERSION, action::GET_REPORT)
            .with_parameters(Parameters::new().with("ReportId", report_id));
        self.client.request_raw(HttpMethod::Post, &info).await
    }
}
