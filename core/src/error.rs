//! Error types and the failure-body classifier.
//!
//! # Design
//! Failures come in three tiers:
//! - `MwsError::Transport` carries the transport's own error untouched. It is
//!   used for network failures and for failure bodies that are not a
//!   recognisable `ErrorResponse` document.
//! - `MwsError::Service` is a classified remote failure. Every wire code maps
//!   to one `ErrorKind` through a single exhaustive `match`; codes outside the
//!   table become `ErrorKind::Unclassified` and keep their raw code.
//! - `MwsError::Parsing` is a well-formed success response that did not fit
//!   the caller's schema.
//!
//! Nothing here retries. `ErrorKind::is_throttling` exists for callers that
//! implement their own policy.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::ensure_string;
use crate::http::TransportError;
use crate::xml;

pub type Result<T> = std::result::Result<T, MwsError>;

/// Errors returned by `MwsClient`.
#[derive(Debug, Error)]
pub enum MwsError {
    /// Transport failure that could not be classified. The inner value is
    /// exactly what the transport returned.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service rejected the call with a recognised error document.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The response was structurally valid but did not match the expected
    /// shape.
    #[error("failed to decode response: {0}")]
    Parsing(String),

    /// Call parameters could not be converted into request parameters.
    #[error("invalid request parameters: {0}")]
    Parameters(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl MwsError {
    /// Kind of a classified service error, if this is one.
    pub fn service_kind(&self) -> Option<ErrorKind> {
        match self {
            MwsError::Service(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// A classified failure reported by the service.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} ({kind})")]
pub struct ServiceError {
    pub kind: ErrorKind,
    /// Code exactly as sent by the service.
    pub code: String,
    /// Always `"{action} request failed"`.
    pub message: String,
    /// Decoded error document. `None` for failures detected inside a
    /// successful response.
    pub envelope: Option<ErrorResponse>,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, action: &str, envelope: Option<ErrorResponse>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: format!("{action} request failed"),
            envelope,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human readable message from the service, when one was sent.
    pub fn service_message(&self) -> Option<&str> {
        self.envelope.as_ref().map(|e| e.error.message.as_str())
    }
}

/// `<ErrorResponse>` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "Error")]
    pub error: ErrorDetail,
    #[serde(rename = "RequestId", default, deserialize_with = "ensure_string::option")]
    pub request_id: Option<String>,
}

/// `<ErrorResponse><Error>` element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// `Sender` or `Receiver`.
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(rename = "Code", deserialize_with = "ensure_string::deserialize")]
    pub code: String,
    #[serde(rename = "Message", deserialize_with = "ensure_string::deserialize")]
    pub message: String,
    #[serde(rename = "Detail", default)]
    pub detail: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ErrorDocument {
    #[serde(rename = "ErrorResponse")]
    error_response: ErrorResponse,
}

/// Try to read `body` as an `ErrorResponse` document.
pub fn parse_error_response(body: &str) -> Option<ErrorResponse> {
    let document = xml::parse(body).ok()?;
    serde_json::from_value::<ErrorDocument>(document)
        .ok()
        .map(|d| d.error_response)
}

/// Turn a raw transport failure into a classified `ServiceError`, or hand
/// it back unchanged when its body is not an error document.
pub fn classify(error: TransportError, action: &str) -> MwsError {
    let envelope = match &error {
        TransportError::Status { body, .. } => parse_error_response(body),
        TransportError::Network(_) => None,
    };
    match envelope {
        Some(envelope) => {
            let code = envelope.error.code.clone();
            let kind = ErrorKind::from_code(&code);
            MwsError::Service(ServiceError::new(kind, code, action, Some(envelope)))
        }
        None => MwsError::Transport(error),
    }
}

macro_rules! error_kinds {
    ($($(#[$doc:meta])* $kind:ident),* $(,)?) => {
        /// Closed set of remote failure semantics.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorKind {
            $($(#[$doc])* $kind,)*
            /// Detected in the body of an otherwise successful product
            /// lookup by external identifier.
            InvalidUpcIdentifier,
            /// A code this client does not know. The raw code is kept on
            /// `ServiceError::code`.
            Unclassified,
        }

        impl ErrorKind {
            pub const ALL: &'static [ErrorKind] = &[$(ErrorKind::$kind,)* ErrorKind::InvalidUpcIdentifier];

            /// Resolve a wire code.
            pub fn from_code(code: &str) -> ErrorKind {
                match code {
                    $(stringify!($kind) => ErrorKind::$kind,)*
                    // Subscriptions spells the generic code with a space.
                    "Internal Error" => ErrorKind::InternalError,
                    "InvalidUPCIdentifier" => ErrorKind::InvalidUpcIdentifier,
                    _ => ErrorKind::Unclassified,
                }
            }

            /// Canonical wire code for this kind.
            pub fn code(&self) -> &'static str {
                match self {
                    $(ErrorKind::$kind => stringify!($kind),)*
                    ErrorKind::InvalidUpcIdentifier => "InvalidUPCIdentifier",
                    ErrorKind::Unclassified => "Unclassified",
                }
            }
        }
    };
}

error_kinds! {
    InputStreamDisconnected,
    InvalidParameterValue,
    AccessDenied,
    InvalidAccessKeyId,
    SignatureDoesNotMatch,
    InvalidAddress,
    InternalError,
    /// The hourly request quota is used up.
    QuotaExceeded,
    /// Request rate exceeded the restore rate.
    RequestThrottled,
    ResourceNotFound,
    ScheduledPackageAlreadyExists,
    RegionNotSupported,
    ScheduleWindowExpired,
    InvalidOrderState,
    PickupSlotNotAvailable,
    AccessToFeedProcessingResultDenied,
    ContentMD5Missing,
    ContentMD5DoesNotMatch,
    FeedCanceled,
    FeedProcessingResultNoLongerAvailable,
    FeedProcessingResultNotReady,
    InputDataError,
    InvalidFeedSubmissionId,
    InvalidFeedType,
    InvalidRequest,
    NonRetriableInternalError,
    RetriableInternalError,
    AccessToReportDenied,
    InvalidReportId,
    InvalidReportRequestId,
    InvalidReportType,
    InvalidScheduleFrequency,
    ReportNoLongerAvailable,
    ReportNotReady,
    DependencyFatalException,
    DependencyRetriableException,
    DependencyUnauthorizedException,
    InternalErrorFatalException,
    InvalidInputFatalException,
}

impl ErrorKind {
    /// Rate-limit failures.
    pub fn is_throttling(&self) -> bool {
        matches!(self, ErrorKind::RequestThrottled | ErrorKind::QuotaExceeded)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_body(code: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<ErrorResponse xmlns="https://mws.amazonservices.com/Orders/2013-09-01">
  <Error>
    <Type>Sender</Type>
    <Code>{code}</Code>
    <Message>Something went wrong</Message>
  </Error>
  <RequestId>e71f72f7-0d55-4f03-8d62-0b7e5bbf8c3a</RequestId>
</ErrorResponse>"#
        )
    }

    fn status(code: u16, body: &str) -> TransportError {
        TransportError::Status {
            status: code,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn every_code_round_trips() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::from_code(kind.code()), *kind, "{kind}");
        }
        assert_eq!(ErrorKind::ALL.len(), 40);
    }

    #[test]
    fn space_alias_maps_to_internal_error() {
        assert_eq!(ErrorKind::from_code("Internal Error"), ErrorKind::InternalError);
    }

    #[test]
    fn unknown_codes_are_unclassified() {
        assert_eq!(ErrorKind::from_code("MissingParameter"), ErrorKind::Unclassified);
        assert_eq!(ErrorKind::from_code(""), ErrorKind::Unclassified);
    }

    #[test]
    fn classifies_invalid_parameter_value() {
        let err = classify(status(400, &error_body("InvalidParameterValue")), "ListOrders");
        let MwsError::Service(service) = err else {
            panic!("expected a service error");
        };
        assert_eq!(service.kind, ErrorKind::InvalidParameterValue);
        assert_eq!(service.message, "ListOrders request failed");
        assert_eq!(service.code, "InvalidParameterValue");
        let envelope = service.envelope.as_ref().unwrap();
        assert_eq!(envelope.error.kind.as_deref(), Some("Sender"));
        assert_eq!(envelope.error.message, "Something went wrong");
        assert_eq!(envelope.request_id.as_deref(), Some("e71f72f7-0d55-4f03-8d62-0b7e5bbf8c3a"));
        assert_eq!(service.service_message(), Some("Something went wrong"));
    }

    #[test]
    fn unknown_code_keeps_raw_code() {
        let err = classify(status(400, &error_body("MissingParameter")), "GetOrder");
        let MwsError::Service(service) = err else {
            panic!("expected a service error");
        };
        assert_eq!(service.kind, ErrorKind::Unclassified);
        assert_eq!(service.code, "MissingParameter");
    }

    #[test]
    fn non_xml_body_is_passed_through_unchanged() {
        let original = status(503, "Service Unavailable");
        let err = classify(original.clone(), "ListOrders");
        assert!(matches!(err, MwsError::Transport(ref e) if *e == original));
    }

    #[test]
    fn xml_of_another_shape_is_passed_through_unchanged() {
        let original = status(500, "<Oops><Reason>boom</Reason></Oops>");
        let err = classify(original.clone(), "ListOrders");
        assert!(matches!(err, MwsError::Transport(ref e) if *e == original));
    }

    #[test]
    fn error_without_code_is_passed_through() {
        let original = status(400, "<ErrorResponse><Error><Message>m</Message></Error></ErrorResponse>");
        let err = classify(original.clone(), "ListOrders");
        assert!(matches!(err, MwsError::Transport(ref e) if *e == original));
    }

    #[test]
    fn network_errors_are_passed_through() {
        let original = TransportError::Network("connection refused".to_string());
        let err = classify(original.clone(), "ListOrders");
        assert!(matches!(err, MwsError::Transport(ref e) if *e == original));
    }

    #[test]
    fn numeric_message_is_read_as_text() {
        let body = "<ErrorResponse><Error><Code>AccessDenied</Code><Message>403</Message></Error></ErrorResponse>";
        let envelope = parse_error_response(body).unwrap();
        assert_eq!(envelope.error.message, "403");
        assert!(envelope.request_id.is_none());
    }

    #[test]
    fn throttling_kinds() {
        assert!(ErrorKind::RequestThrottled.is_throttling());
        assert!(ErrorKind::QuotaExceeded.is_throttling());
        assert!(!ErrorKind::RetriableInternalError.is_throttling());
    }

    #[test]
    fn display_includes_kind() {
        let err = ServiceError::new(ErrorKind::ReportNotReady, "ReportNotReady", "GetReport", None);
        assert_eq!(err.to_string(), "GetReport request failed (ReportNotReady)");
    }
}
