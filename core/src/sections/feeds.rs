//! Feeds: bulk document uploads and their processing reports.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::client::MwsClient;
use crate::codec::{ensure_string, mws_date};
use crate::error::Result;
use crate::http::{HttpMethod, Transport};
use crate::params::Parameters;
use crate::resource::{action, Resource, ResourceInfo};
use crate::response::RequestMeta;

pub const FEEDS_API_VERSION: &str = "2009-01-01";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubmitFeedParameters {
    pub feed_type: String,
    pub marketplace_ids: Vec<String>,
    pub purge_and_replace: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitFeedResult {
    #[serde(rename = "FeedSubmissionInfo")]
    pub feed_submission_info: FeedSubmissionInfo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedSubmissionInfo {
    #[serde(rename = "FeedSubmissionId", deserialize_with = "ensure_string::deserialize")]
    pub feed_submission_id: String,
    #[serde(rename = "FeedType")]
    pub feed_type: String,
    #[serde(rename = "SubmittedDate", deserialize_with = "mws_date::deserialize")]
    pub submitted_date: DateTime<Utc>,
    #[serde(rename = "FeedProcessingStatus")]
    pub feed_processing_status: String,
}

pub struct Feeds<'a, T> {
    pub(super) client: &'a MwsClient<T>,
}

impl<T: Transport> Feeds<'_, T> {
    /// Upload `feed` (an XML document) for asynchronous processing.
    pub async fn submit_feed(
        &self,
        feed: &str,
        parameters: &SubmitFeedParameters,
    ) -> Result<(FeedSubmissionInfo, RequestMeta)> {
        let info = ResourceInfo::new(Resource::Feeds, FEEDS_API_VERSION, action::SUBMIT_FEED).with_parameters(
            Parameters::new()
                .with("FeedType", parameters.feed_type.as_str())
                .with("MarketplaceIdList.Id", parameters.marketplace_ids.clone())
                .with_opt("PurgeAndReplace", parameters.purge_and_replace),
        );
        let (result, meta) = self
            .client
            .request_result::<SubmitFeedResult>(HttpMethod::Post, &info, Some(feed))
            .await?;
        Ok((result.feed_submission_info, meta))
    }

    /// Processing report of a submitted feed, verbatim.
    pub async fn get_feed_submission_result(&self, feed_submission_id: &str) -> Result<(String, RequestMeta)> {
        let info = ResourceInfo::new(Resource::Feeds, FEEDS_API_VERSION, action::GET_FEED_SUBMISSION_RESULT)
            .with_parameters(Parameters::new().with("FeedSubmissionId", feed_submission_id));
        self.client.request_raw(HttpMethod::Post, &info).await
    }
}
