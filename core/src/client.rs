//! Request dispatcher for the signed query-parameter API.
//!
//! # Design
//! `MwsClient` holds immutable configuration and an injected `Transport`; it
//! keeps no state between calls, so one client can serve concurrent calls
//! without locking. Every call is split the same way:
//! - `build_request` canonicalizes and signs parameters and picks the
//!   transport shape. It is pure for a given timestamp.
//! - the transport sends the `SignedRequest`.
//! - `interpret` turns the outcome into a decoded body plus `RequestMeta`, or
//!   a classified/unclassified error.
//!
//! `request` glues the three together. Callers that want to run I/O
//! themselves can call `build_request` and `interpret` directly.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::MwsOptions;
use crate::error::{classify, ErrorKind, MwsError, Result, ServiceError};
use crate::http::{HttpMethod, ResponseEnvelope, SignedRequest, Transport, TransportError};
use crate::params::{canonicalize, CanonicalParams};
use crate::resource::{ResourceInfo, INVALID_UPC_MARKER};
use crate::response::{self, decode_document, RequestMeta, ResponseBody};
use crate::signer::{canonical_query_string, sign, string_to_sign, SIGNATURE_METHOD, SIGNATURE_VERSION};

pub const USER_AGENT: &str = concat!("mws-core/", env!("CARGO_PKG_VERSION"), " (Language=Rust)");

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
const FEED_CONTENT_TYPE: &str = "text/xml";

/// Where the signed parameters travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape<'a> {
    /// Parameters in the URL, no body.
    Query,
    /// Parameters in the URL, feed document as the body.
    Feed(&'a str),
    /// Parameters as a form body, bare URL.
    Form,
}

fn shape<'a>(method: HttpMethod, info: &ResourceInfo, body: Option<&'a str>) -> Shape<'a> {
    match (method, body) {
        (HttpMethod::Get, _) => Shape::Query,
        (HttpMethod::Post, Some(feed)) if info.is_feed_submission() && !feed.is_empty() => Shape::Feed(feed),
        (HttpMethod::Post, _) => Shape::Form,
    }
}

/// Client for one seller account on one marketplace endpoint.
pub struct MwsClient<T> {
    options: MwsOptions,
    transport: T,
}

impl<T> fmt::Debug for MwsClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MwsClient").field("options", &self.options).finish_non_exhaustive()
    }
}

impl<T> MwsClient<T> {
    pub fn new(options: MwsOptions, transport: T) -> Self {
        Self { options, transport }
    }

    pub fn options(&self) -> &MwsOptions {
        &self.options
    }

    /// Fixed fields plus canonicalized call parameters, with `Signature`
    /// computed over everything else.
    pub fn signed_parameters(&self, method: HttpMethod, info: &ResourceInfo, timestamp: DateTime<Utc>) -> CanonicalParams {
        let mut params = CanonicalParams::from([
            ("AWSAccessKeyId".to_string(), self.options.aws_access_key_id.clone()),
            ("Action".to_string(), info.action.clone()),
            ("MWSAuthToken".to_string(), self.options.mws_auth_token.clone()),
            ("SellerId".to_string(), self.options.seller_id.clone()),
            ("SignatureMethod".to_string(), SIGNATURE_METHOD.to_string()),
            ("SignatureVersion".to_string(), SIGNATURE_VERSION.to_string()),
            ("Timestamp".to_string(), timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("Version".to_string(), info.version.clone()),
        ]);
        params.extend(canonicalize(&info.parameters));

        let to_sign = string_to_sign(
            method.as_str(),
            &self.options.host(),
            info.resource.as_str(),
            &info.version,
            &canonical_query_string(&params),
        );
        params.insert("Signature".to_string(), sign(&to_sign, self.options.secret_key()));
        params
    }

    /// Build the signed request for one call.
    ///
    /// `body` is only used by feed submission; any other call ignores it.
    pub fn build_request(
        &self,
        method: HttpMethod,
        info: &ResourceInfo,
        body: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> SignedRequest {
        let query = canonical_query_string(&self.signed_parameters(method, info, timestamp));
        let url = format!("{}{}", self.options.endpoint(), info.path());
        let user_agent = ("user-agent".to_string(), USER_AGENT.to_string());

        match shape(method, info, body) {
            Shape::Query => SignedRequest {
                method,
                url: format!("{url}?{query}"),
                headers: vec![user_agent],
                body: None,
            },
            Shape::Feed(feed) => SignedRequest {
                method,
                url: format!("{url}?{query}"),
                headers: vec![("content-type".to_string(), FEED_CONTENT_TYPE.to_string()), user_agent],
                body: Some(feed.to_string()),
            },
            Shape::Form => SignedRequest {
                method,
                url,
                headers: vec![user_agent, ("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
                body: Some(query),
            },
        }
    }

    /// Interpret the transport outcome of a call built for `info`.
    pub fn interpret(
        &self,
        info: &ResourceInfo,
        outcome: std::result::Result<ResponseEnvelope, TransportError>,
    ) -> Result<(ResponseBody, RequestMeta)> {
        let response = match outcome {
            Ok(response) if response.is_success() => response,
            Ok(response) => return Err(self.failure(info, TransportError::from(response))),
            Err(error) => return Err(self.failure(info, error)),
        };

        // A lookup by external identifier can fail inside a 200 response.
        if info.is_lookup_by_id() && response.body.contains(INVALID_UPC_MARKER) {
            let kind = ErrorKind::InvalidUpcIdentifier;
            warn!(action = %info.action, kind = %kind, "service reported an error in a successful response");
            return Err(ServiceError::new(kind, kind.code(), &info.action, None).into());
        }

        response::decode(&response, info.is_artifact_retrieval())
    }

    fn failure(&self, info: &ResourceInfo, error: TransportError) -> MwsError {
        let error = classify(error, &info.action);
        match &error {
            MwsError::Service(service) => {
                warn!(action = %info.action, kind = %service.kind, code = %service.code, "service error");
            }
            other => debug!(action = %info.action, error = %other, "unclassified transport error"),
        }
        error
    }
}

impl<T: Transport> MwsClient<T> {
    /// Sign, send and interpret one call.
    pub async fn request(
        &self,
        method: HttpMethod,
        info: &ResourceInfo,
        body: Option<&str>,
    ) -> Result<(ResponseBody, RequestMeta)> {
        let request = self.build_request(method, info, body, Utc::now());
        debug!(
            method = %method,
            resource = %info.resource,
            action = %info.action,
            shape = ?shape(method, info, body),
            "dispatching request"
        );
        let outcome = self.transport.send(request).await;
        self.interpret(info, outcome)
    }

    /// Call an action with a structured response and decode it into `R`.
    pub async fn request_document<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        info: &ResourceInfo,
        body: Option<&str>,
    ) -> Result<(R, RequestMeta)> {
        let (body, meta) = self.request(method, info, body).await?;
        Ok((decode_document(body.into_document()?)?, meta))
    }

    /// Call an artifact-retrieval action and return its body verbatim.
    pub async fn request_raw(&self, method: HttpMethod, info: &ResourceInfo) -> Result<(String, RequestMeta)> {
        let (body, meta) = self.request(method, info, None).await?;
        Ok((body.into_raw()?, meta))
    }
}
