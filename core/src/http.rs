//! HTTP transport types and the injected transport boundary.
//!
//! # Design
//! Requests and responses are plain data. The core builds a `SignedRequest`,
//! hands it to a caller-supplied `Transport`, and interprets whatever comes
//! back; it never opens a socket itself. Timeouts, cancellation and
//! connection reuse are the transport's business and surface here only as an
//! ordinary `TransportError`.
//!
//! All fields use owned types so a request can be moved into a blocking
//! task or across threads without lifetime concerns.

use std::fmt;
use std::future::Future;

use thiserror::Error;

/// HTTP method for a request. The service only accepts these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully signed request, built once per call and consumed by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl SignedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Raw response as returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ResponseEnvelope {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Failure reported by the transport.
///
/// This is the "raw" error: when a failure body cannot be classified it is
/// handed back to the caller exactly as the transport produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        status: u16,
        headers: Vec<(String, String)>,
        body: String,
    },

    /// No response was received (connection, TLS, timeout, ...).
    #[error("network error: {0}")]
    Network(String),
}

impl From<ResponseEnvelope> for TransportError {
    fn from(response: ResponseEnvelope) -> Self {
        TransportError::Status {
            status: response.status,
            headers: response.headers,
            body: response.body,
        }
    }
}

/// Sends a signed request and returns the raw response.
///
/// Implementations may report a non-2xx answer either as an `Ok` envelope
/// or as `TransportError::Status`; the client treats both the same way.
///
/// Any `Fn(SignedRequest) -> impl Future` closure is a transport, which keeps
/// test doubles to a single line.
pub trait Transport: Send + Sync {
    fn send(&self, request: SignedRequest) -> impl Future<Output = Result<ResponseEnvelope, TransportError>> + Send;
}

impl<F, Fut> Transport for F
where
    F: Fn(SignedRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ResponseEnvelope, TransportError>> + Send,
{
    fn send(&self, request: SignedRequest) -> impl Future<Output = Result<ResponseEnvelope, TransportError>> + Send {
        self(request)
    }
}
