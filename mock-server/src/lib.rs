//! In-process emulation of the signed query-parameter commerce API.
//!
//! Verifies signatures the same way the real service does, tracks a
//! per-seller request quota and answers a handful of actions with canned
//! documents. Nothing here depends on the client crate; signing is
//! re-implemented so the two sides check each other.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::sync::Arc;

use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DurationRound, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use quick_xml::escape::escape;
use sha2::Sha256;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Requests each seller may make before `QuotaExceeded`.
pub const QUOTA_MAX: u32 = 200;
/// Seller id that always gets an unstructured 503.
pub const MAINTENANCE_SELLER: &str = "MAINTENANCE";
/// Report id that is never ready.
pub const NOT_READY_REPORT: &str = "not-ready";

const REQUIRED: [&str; 8] = [
    "AWSAccessKeyId",
    "Action",
    "SellerId",
    "Signature",
    "SignatureMethod",
    "SignatureVersion",
    "Timestamp",
    "Version",
];

const RFC3986: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

const XML: &str = "text/xml";
const TEXT: &str = "text/plain";

#[derive(Debug, Clone)]
pub struct Config {
    pub secret_key: String,
    pub quota_max: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            secret_key: "secret".to_string(),
            quota_max: QUOTA_MAX,
        }
    }
}

pub struct AppState {
    config: Config,
    /// Requests made per seller.
    used: RwLock<HashMap<String, u32>>,
    /// Submitted feeds: id → feed type.
    feeds: RwLock<HashMap<String, String>>,
}

impl AppState {
    async fn remaining(&self, seller: &str) -> u32 {
        let used = self.used.read().await.get(seller).copied().unwrap_or(0);
        self.config.quota_max.saturating_sub(used)
    }
}

pub type Shared = Arc<AppState>;

pub fn app(config: Config) -> Router {
    let state: Shared = Arc::new(AppState {
        config,
        used: RwLock::new(HashMap::new()),
        feeds: RwLock::new(HashMap::new()),
    });
    Router::new()
        .route("/{resource}/{version}", get(handle).post(handle))
        .with_state(state)
}

pub async fn run(listener: TcpListener, config: Config) -> Result<(), std::io::Error> {
    axum::serve(listener, app(config)).await
}

/// Sorted, RFC 3986 encoded `k=v` pairs joined by `&`.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", utf8_percent_encode(k, RFC3986), utf8_percent_encode(v, RFC3986)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Signature the service expects for `params` (without `Signature`).
pub fn signature(secret_key: &str, method: &str, host: &str, path: &str, params: &BTreeMap<String, String>) -> String {
    let to_sign = format!("{method}\n{host}\n{path}\n{}", canonical_query(params));
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

fn decode_params(encoded: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(encoded.as_bytes()).into_owned().collect()
}

struct Reply {
    status: StatusCode,
    content_type: &'static str,
    body: String,
}

impl Reply {
    fn ok(content_type: &'static str, body: String) -> Self {
        Self {
            status: StatusCode::OK,
            content_type,
            body,
        }
    }

    fn text(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            content_type: TEXT,
            body: body.to_string(),
        }
    }

    fn into_response(self, request_id: &str, quota_max: u32, remaining: u32) -> Response {
        let now = Utc::now();
        let resets_on = now.duration_trunc(chrono::Duration::hours(1)).unwrap_or(now) + chrono::Duration::hours(1);

        let mut response = (self.status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response();
        let headers = response.headers_mut();
        for (name, value) in [
            ("x-mws-request-id", request_id.to_string()),
            ("x-mws-timestamp", now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("x-mws-quota-max", format!("{quota_max}.0")),
            ("x-mws-quota-remaining", format!("{remaining}.0")),
            ("x-mws-quota-resetson", resets_on.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ] {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        }
        response
    }
}

/// One incoming call with its parameters already merged.
struct Call {
    request_id: String,
    method: Method,
    host: String,
    resource: String,
    version: String,
    params: BTreeMap<String, String>,
    /// Raw body when it did not carry form parameters.
    document: Option<String>,
}

impl Call {
    fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    fn require(&self, name: &str) -> Result<&str, Reply> {
        self.param(name)
            .ok_or_else(|| self.error(StatusCode::BAD_REQUEST, "MissingParameter", format!("{name} is required")))
    }

    /// Values of `prefix.1`, `prefix.2`, … in order.
    fn list(&self, prefix: &str) -> Vec<&str> {
        (1..).map_while(|n| self.param(&format!("{prefix}.{n}"))).collect()
    }

    fn namespace(&self) -> String {
        format!("https://mws.amazonservices.com/{}/{}", self.resource, self.version)
    }

    fn error(&self, status: StatusCode, code: &str, message: impl Display) -> Reply {
        let kind = if status.is_server_error() { "Receiver" } else { "Sender" };
        let body = format!(
            "<?xml version=\"1.0\"?>\n<ErrorResponse xmlns=\"{}\">\n  <Error>\n    <Type>{kind}</Type>\n    \
             <Code>{code}</Code>\n    <Message>{}</Message>\n  </Error>\n  <RequestId>{}</RequestId>\n</ErrorResponse>\n",
            self.namespace(),
            escape(&message.to_string()),
            self.request_id,
        );
        Reply {
            status,
            content_type: XML,
            body,
        }
    }

    /// Wrap `result` in the `{action}Response` / `{action}Result` envelope.
    fn document(&self, action: &str, result: &str) -> Reply {
        Reply::ok(
            XML,
            format!(
                "<?xml version=\"1.0\"?>\n<{action}Response xmlns=\"{}\">\n  <{action}Result>{result}</{action}Result>\n  \
                 <ResponseMetadata>\n    <RequestId>{}</RequestId>\n  </ResponseMetadata>\n</{action}Response>\n",
                self.namespace(),
                self.request_id,
            ),
        )
    }

    fn verify(&self, secret_key: &str) -> Result<(), Reply> {
        for name in REQUIRED {
            self.require(name)?;
        }
        let version = self.require("Version")?;
        if version != self.version {
            return Err(self.error(
                StatusCode::BAD_REQUEST,
                "InvalidParameterValue",
                format!("Version {version} does not match the request path"),
            ));
        }
        if self.param("SignatureMethod") != Some("HmacSHA256") || self.param("SignatureVersion") != Some("2") {
            return Err(self.error(
                StatusCode::BAD_REQUEST,
                "InvalidParameterValue",
                "Only HmacSHA256 signature version 2 is supported",
            ));
        }

        let mut signed = self.params.clone();
        let provided = signed.remove("Signature").unwrap_or_default();
        let path = format!("/{}/{}", self.resource, self.version);
        let expected = signature(secret_key, self.method.as_str(), &self.host, &path, &signed);
        if provided != expected {
            return Err(self.error(
                StatusCode::FORBIDDEN,
                "SignatureDoesNotMatch",
                "The request signature we calculated does not match the signature you provided.",
            ));
        }
        Ok(())
    }
}

async fn handle(
    State(state): State<Shared>,
    Path((resource, version)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: String,
) -> Response {
    let mut params = decode_params(query.as_deref().unwrap_or_default());
    let form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));
    let document = if form {
        params.extend(decode_params(&body));
        None
    } else {
        Some(body).filter(|b| !b.is_empty())
    };

    let call = Call {
        request_id: Uuid::new_v4().to_string(),
        method,
        host: headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        resource,
        version,
        params,
        document,
    };

    let reply = match process(&state, &call).await {
        Ok(reply) | Err(reply) => reply,
    };

    let seller = call.param("SellerId").unwrap_or_default();
    let action = call.param("Action").unwrap_or_default();
    if reply.status.is_success() {
        info!(method = %call.method, resource = %call.resource, action, seller, "handled request");
    } else {
        warn!(
            method = %call.method,
            resource = %call.resource,
            action,
            seller,
            status = reply.status.as_u16(),
            "rejected request"
        );
    }

    let remaining = state.remaining(seller).await;
    reply.into_response(&call.request_id, state.config.quota_max, remaining)
}

async fn process(state: &AppState, call: &Call) -> Result<Reply, Reply> {
    call.verify(&state.config.secret_key)?;

    let seller = call.require("SellerId")?;
    if seller == MAINTENANCE_SELLER {
        return Err(Reply::text(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable"));
    }

    {
        let mut used = state.used.write().await;
        let count = used.entry(seller.to_string()).or_insert(0);
        if *count >= state.config.quota_max {
            return Err(call.error(
                StatusCode::SERVICE_UNAVAILABLE,
                "QuotaExceeded",
                format!("You exceeded your quota of {} requests per 1 hour", state.config.quota_max),
            ));
        }
        *count += 1;
    }

    match call.require("Action")? {
        "GetServiceStatus" => Ok(service_status(call)),
        "ListMarketplaceParticipations" => Ok(marketplace_participations(call, seller)),
        "GetMatchingProductForId" => matching_product_for_id(call),
        "GetReport" => report(call),
        "SubmitFeed" => submit_feed(state, call).await,
        "GetFeedSubmissionResult" => feed_submission_result(state, call).await,
        other => Err(call.error(
            StatusCode::BAD_REQUEST,
            "InvalidParameterValue",
            format!("Unknown action {other}"),
        )),
    }
}

fn service_status(call: &Call) -> Reply {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    call.document(
        "GetServiceStatus",
        &format!("<Status>GREEN</Status><Timestamp>{now}</Timestamp>"),
    )
}

fn marketplace_participations(call: &Call, seller: &str) -> Reply {
    let seller = escape(seller);
    call.document(
        "ListMarketplaceParticipations",
        &format!(
            "<ListParticipations>\
               <Participation><MarketplaceId>ATVPDKIKX0DER</MarketplaceId><SellerId>{seller}</SellerId>\
                 <HasSellerSuspendedListings>No</HasSellerSuspendedListings></Participation>\
               <Participation><MarketplaceId>A2EUQ1WTGCTBG2</MarketplaceId><SellerId>{seller}</SellerId>\
                 <HasSellerSuspendedListings>Yes</HasSellerSuspendedListings></Participation>\
             </ListParticipations>\
             <ListMarketplaces>\
               <Marketplace><MarketplaceId>ATVPDKIKX0DER</MarketplaceId><Name>Amazon.com</Name>\
                 <DefaultCountryCode>US</DefaultCountryCode><DefaultCurrencyCode>USD</DefaultCurrencyCode>\
                 <DefaultLanguageCode>en_US</DefaultLanguageCode><DomainName>www.amazon.com</DomainName></Marketplace>\
               <Marketplace><MarketplaceId>A2EUQ1WTGCTBG2</MarketplaceId><Name>Amazon.ca</Name>\
                 <DefaultCountryCode>CA</DefaultCountryCode><DefaultCurrencyCode>CAD</DefaultCurrencyCode>\
                 <DefaultLanguageCode>en_CA</DefaultLanguageCode><DomainName>www.amazon.ca</DomainName></Marketplace>\
             </ListMarketplaces>"
        ),
    )
}

fn matching_product_for_id(call: &Call) -> Result<Reply, Reply> {
    let marketplace = escape(call.require("MarketplaceId")?);
    let id_type = call.require("IdType")?;
    let ids = call.list("IdList.Id");
    if ids.is_empty() {
        return Err(call.error(StatusCode::BAD_REQUEST, "MissingParameter", "IdList is required"));
    }

    // The service reports a malformed UPC inside a 200 response.
    if id_type == "UPC" {
        if let Some(bad) = ids.iter().find(|id| !id.bytes().all(|b| b.is_ascii_digit())) {
            return Ok(call.document(
                "GetMatchingProductForId",
                &format!(
                    "<Error><Type>Sender</Type><Code>InvalidParameterValue</Code>\
                     <Message>Invalid UPC identifier</Message></Error><Id>{}</Id>",
                    escape(*bad)
                ),
            ));
        }
    }

    let products: String = ids
        .iter()
        .enumerate()
        .map(|(n, id)| {
            format!(
                "<Product><Identifiers><MarketplaceASIN><MarketplaceId>{marketplace}</MarketplaceId>\
                 <ASIN>B{:09}</ASIN></MarketplaceASIN></Identifiers>\
                 <AttributeSets><ItemAttributes><Title>Sample product {}</Title></ItemAttributes></AttributeSets>\
                 </Product>",
                n + 1,
                escape(*id),
            )
        })
        .collect();
    Ok(call.document("GetMatchingProductForId", &format!("<Products>{products}</Products>")))
}

fn report(call: &Call) -> Result<Reply, Reply> {
    let report_id = call.require("ReportId")?;
    if report_id == NOT_READY_REPORT {
        return Err(call.error(
            StatusCode::BAD_REQUEST,
            "ReportNotReady",
            format!("Report {report_id} is not ready"),
        ));
    }
    Ok(Reply::ok(
        TEXT,
        "sku\tasin\tprice\tquantity\nSKU-1\tB000000001\t12.50\t3\nSKU-2\tB000000002\t7.00\t0\n".to_string(),
    ))
}

async fn submit_feed(state: &AppState, call: &Call) -> Result<Reply, Reply> {
    let feed_type = call.require("FeedType")?;
    let Some(document) = call.document.as_deref() else {
        return Err(call.error(StatusCode::BAD_REQUEST, "InputDataError", "Feed content is missing"));
    };
    if !document.trim_start().starts_with('<') {
        return Err(call.error(StatusCode::BAD_REQUEST, "InputDataError", "Feed content is not XML"));
    }

    let id = {
        let mut feeds = state.feeds.write().await;
        let id = (50_001 + feeds.len()).to_string();
        feeds.insert(id.clone(), feed_type.to_string());
        id
    };
    let submitted = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    Ok(call.document(
        "SubmitFeed",
        &format!(
            "<FeedSubmissionInfo><FeedSubmissionId>{id}</FeedSubmissionId><FeedType>{}</FeedType>\
             <SubmittedDate>{submitted}</SubmittedDate><FeedProcessingStatus>_SUBMITTED_</FeedProcessingStatus>\
             </FeedSubmissionInfo>",
            escape(feed_type)
        ),
    ))
}

async fn feed_submission_result(state: &AppState, call: &Call) -> Result<Reply, Reply> {
    let id = call.require("FeedSubmissionId")?;
    if !state.feeds.read().await.contains_key(id) {
        return Err(call.error(
            StatusCode::BAD_REQUEST,
            "InvalidFeedSubmissionId",
            format!("Feed submission {id} does not exist"),
        ));
    }
    Ok(Reply::ok(
        XML,
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<AmazonEnvelope>\
             <Header><DocumentVersion>1.02</DocumentVersion><MerchantIdentifier>M_EXAMPLE</MerchantIdentifier></Header>\
             <MessageType>ProcessingReport</MessageType><Message><MessageID>1</MessageID><ProcessingReport>\
             <DocumentTransactionID>{}</DocumentTransactionID><StatusCode>Complete</StatusCode>\
             <ProcessingSummary><MessagesProcessed>1</MessagesProcessed><MessagesSuccessful>1</MessagesSuccessful>\
             <MessagesWithError>0</MessagesWithError><MessagesWithWarning>0</MessagesWithWarning></ProcessingSummary>\
             </ProcessingReport></Message></AmazonEnvelope>\n",
            escape(id)
        ),
    ))
}
