//! Success-body decoding and per-response request metadata.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{MwsError, Result};
use crate::http::{find_header, ResponseEnvelope};
use crate::xml;

pub const HEADER_REQUEST_ID: &str = "x-mws-request-id";
pub const HEADER_TIMESTAMP: &str = "x-mws-timestamp";
pub const HEADER_QUOTA_MAX: &str = "x-mws-quota-max";
pub const HEADER_QUOTA_REMAINING: &str = "x-mws-quota-remaining";
pub const HEADER_QUOTA_RESETS_ON: &str = "x-mws-quota-resetson";

/// Decoded success body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Structured response, ready for a typed decoder.
    Document(Value),
    /// Caller-defined artifact (report, feed processing result), verbatim.
    Raw(String),
}

impl ResponseBody {
    pub fn into_document(self) -> Result<Value> {
        match self {
            ResponseBody::Document(value) => Ok(value),
            ResponseBody::Raw(_) => Err(MwsError::Parsing("expected a structured document, got raw text".to_string())),
        }
    }

    pub fn into_raw(self) -> Result<String> {
        match self {
            ResponseBody::Raw(text) => Ok(text),
            ResponseBody::Document(_) => Err(MwsError::Parsing("expected raw text, got a structured document".to_string())),
        }
    }
}

/// Rate-limit and request bookkeeping sent with every response.
///
/// Every field is best effort: a missing or malformed header yields `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMeta {
    pub request_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub quota_max: Option<f64>,
    pub quota_remaining: Option<f64>,
    pub quota_resets_on: Option<DateTime<Utc>>,
}

impl RequestMeta {
    pub fn from_headers(headers: &[(String, String)]) -> Self {
        Self {
            request_id: header(headers, HEADER_REQUEST_ID)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            timestamp: header(headers, HEADER_TIMESTAMP).and_then(parse_time),
            quota_max: header(headers, HEADER_QUOTA_MAX).and_then(parse_number),
            quota_remaining: header(headers, HEADER_QUOTA_REMAINING).and_then(parse_number),
            quota_resets_on: header(headers, HEADER_QUOTA_RESETS_ON).and_then(parse_time),
        }
    }
}

fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    find_header(headers, name).map(str::trim)
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc))
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Decode a successful response.
///
/// With `raw` set the body is returned as text without looking at it.
pub fn decode(response: &ResponseEnvelope, raw: bool) -> Result<(ResponseBody, RequestMeta)> {
    let meta = RequestMeta::from_headers(&response.headers);
    if raw {
        return Ok((ResponseBody::Raw(response.body.clone()), meta));
    }
    let document = xml::parse(&response.body).map_err(|e| MwsError::Parsing(e.to_string()))?;
    Ok((ResponseBody::Document(document), meta))
}

/// Decode a structured document into a caller type.
pub fn decode_document<R: DeserializeOwned>(document: Value) -> Result<R> {
    serde_json::from_value(document).map_err(|e| MwsError::Parsing(e.to_string()))
}
