//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port, then drives the core
//! client over real HTTP using ureq as the injected transport. Validates that
//! signing, dispatch shapes, decoding and classification agree with an
//! independent implementation of the service side.

use mock_server::Config;
use mws_core::codec::ServiceStatus;
use mws_core::sections::feeds::SubmitFeedParameters;
use mws_core::sections::products::{GetMatchingProductForIdParameters, IdType};
use mws_core::{
    ErrorKind, HttpMethod, MwsClient, MwsError, MwsOptions, Resource, ResourceInfo, ResponseEnvelope, SignedRequest,
    Transport, TransportError,
};

/// Execute a `SignedRequest` using ureq and return a `ResponseEnvelope`.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data rather than `Err`, letting the core
/// client handle status interpretation.
fn execute(req: SignedRequest) -> Result<ResponseEnvelope, TransportError> {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let result = match req.method {
        HttpMethod::Get => {
            let mut builder = agent.get(&req.url);
            for (name, value) in &req.headers {
                builder = builder.header(name, value);
            }
            builder.call()
        }
        HttpMethod::Post => {
            let mut builder = agent.post(&req.url);
            for (name, value) in &req.headers {
                builder = builder.header(name, value);
            }
            builder.send(req.body.unwrap_or_default().as_bytes())
        }
    };
    let mut response = result.map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| (name.as_str().to_string(), value.to_str().unwrap_or_default().to_string()))
        .collect();
    let body = response.body_mut().read_to_string().unwrap_or_default();

    Ok(ResponseEnvelope { status, headers, body })
}

fn ureq_transport() -> impl Transport {
    |req: SignedRequest| async move {
        tokio::task::spawn_blocking(move || execute(req))
            .await
            .unwrap_or_else(|e| Err(TransportError::Network(e.to_string())))
    }
}

/// Start the mock server on a random port and return its base URL.
fn start_server(config: Config) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, config).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn client_for(endpoint: &str, seller_id: &str, secret_key: &str) -> MwsClient<impl Transport> {
    let options = MwsOptions::new(endpoint, "AKIAEXAMPLE", "amzn.mws.example-token", seller_id, secret_key).unwrap();
    MwsClient::new(options, ureq_transport())
}

fn client(endpoint: &str) -> MwsClient<impl Transport> {
    client_for(endpoint, "A1SELLER", "secret")
}

#[tokio::test(flavor = "multi_thread")]
async fn sellers_over_form_post() {
    let endpoint = start_server(Config::default());
    let client = client(&endpoint);

    let (result, meta) = client.sellers().list_marketplace_participations().await.unwrap();
    assert_eq!(result.next_token, None);
    let participations = &result.participations.participation;
    assert_eq!(participations.len(), 2);
    assert!(participations.iter().all(|p| p.seller_id == "A1SELLER"));
    assert!(!participations[0].has_seller_suspended_listings);
    assert!(participations[1].has_seller_suspended_listings);
    let names: Vec<&str> = result.marketplaces.marketplace.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["Amazon.com", "Amazon.ca"]);

    assert!(meta.request_id.is_some());
    assert!(meta.timestamp.is_some());
    assert!(meta.quota_resets_on.is_some());
    assert_eq!(meta.quota_max, Some(200.0));
    assert_eq!(meta.quota_remaining, Some(199.0));
}

#[tokio::test(flavor = "multi_thread")]
async fn service_status_over_get_and_post() {
    let endpoint = start_server(Config::default());
    let client = client(&endpoint);

    let (status, _) = client.sellers().get_service_status().await.unwrap();
    assert_eq!(status.status, ServiceStatus::Green);

    let info = ResourceInfo::new(Resource::Orders, "2013-09-01", "GetServiceStatus");
    let (body, meta) = client.request(HttpMethod::Get, &info, None).await.unwrap();
    let document = body.into_document().unwrap();
    assert_eq!(document["GetServiceStatusResponse"]["GetServiceStatusResult"]["Status"], "GREEN");
    assert_eq!(meta.quota_remaining, Some(198.0));
}

#[tokio::test(flavor = "multi_thread")]
async fn product_lookup_and_in_band_error() {
    let endpoint = start_server(Config::default());
    let client = client(&endpoint);

    let mut parameters = GetMatchingProductForIdParameters {
        marketplace_id: "ATVPDKIKX0DER".to_string(),
        id_type: IdType::Upc,
        id_list: vec!["012345678905".to_string()],
    };
    let (response, _) = client.products().get_matching_product_for_id(&parameters).await.unwrap();
    let product = &response["GetMatchingProductForIdResult"]["Products"]["Product"];
    assert_eq!(product["Identifiers"]["MarketplaceASIN"]["ASIN"], "B000000001");

    parameters.id_list = vec!["not-a-upc".to_string()];
    let err = client.products().get_matching_product_for_id(&parameters).await.unwrap_err();
    assert_eq!(err.service_kind(), Some(ErrorKind::InvalidUpcIdentifier));
    assert_eq!(err.to_string(), "GetMatchingProductForId request failed (InvalidUPCIdentifier)");
}

#[tokio::test(flavor = "multi_thread")]
async fn reports_are_opaque() {
    let endpoint = start_server(Config::default());
    let client = client(&endpoint);

    let (report, meta) = client.reports().get_report("12345").await.unwrap();
    assert!(report.starts_with("sku\tasin\tprice\tquantity\n"));
    assert!(meta.request_id.is_some());

    let err = client.reports().get_report(mock_server::NOT_READY_REPORT).await.unwrap_err();
    let MwsError::Service(service) = err else {
        panic!("expected a service error");
    };
    assert_eq!(service.kind, ErrorKind::ReportNotReady);
    assert_eq!(service.message, "GetReport request failed");
    let envelope = service.envelope.unwrap();
    assert_eq!(envelope.error.kind.as_deref(), Some("Sender"));
    assert!(envelope.request_id.is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn feed_lifecycle() {
    let endpoint = start_server(Config::default());
    let client = client(&endpoint);

    let feed = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
                <AmazonEnvelope><MessageType>Product</MessageType><Message><SKU>a &amp; b</SKU></Message></AmazonEnvelope>";
    let parameters = SubmitFeedParameters {
        feed_type: "_POST_PRODUCT_DATA_".to_string(),
        marketplace_ids: vec!["ATVPDKIKX0DER".to_string()],
        purge_and_replace: Some(false),
    };
    let (info, _) = client.feeds().submit_feed(feed, &parameters).await.unwrap();
    assert_eq!(info.feed_submission_id, "50001");
    assert_eq!(info.feed_type, "_POST_PRODUCT_DATA_");
    assert_eq!(info.feed_processing_status, "_SUBMITTED_");

    let (report, _) = client
        .feeds()
        .get_feed_submission_result(&info.feed_submission_id)
        .await
        .unwrap();
    assert!(report.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(report.contains("<DocumentTransactionID>50001</DocumentTransactionID>"));

    let err = client.feeds().get_feed_submission_result("99999").await.unwrap_err();
    assert_eq!(err.service_kind(), Some(ErrorKind::InvalidFeedSubmissionId));
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_secret_is_classified() {
    let endpoint = start_server(Config::default());
    let client = client_for(&endpoint, "A1SELLER", "not-the-secret");

    let err = client.sellers().get_service_status().await.unwrap_err();
    assert_eq!(err.service_kind(), Some(ErrorKind::SignatureDoesNotMatch));
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_action_is_classified() {
    let endpoint = start_server(Config::default());
    let client = client(&endpoint);

    let info = ResourceInfo::new(Resource::Orders, "2013-09-01", "ListWidgets");
    let err = client.request(HttpMethod::Post, &info, None).await.unwrap_err();
    assert_eq!(err.service_kind(), Some(ErrorKind::InvalidParameterValue));
}

#[tokio::test(flavor = "multi_thread")]
async fn quota_exhaustion_is_throttling() {
    let endpoint = start_server(Config {
        quota_max: 1,
        ..Config::default()
    });
    let client = client(&endpoint);

    let (_, meta) = client.sellers().get_service_status().await.unwrap();
    assert_eq!(meta.quota_remaining, Some(0.0));

    let err = client.sellers().get_service_status().await.unwrap_err();
    let MwsError::Service(service) = err else {
        panic!("expected a service error");
    };
    assert_eq!(service.kind, ErrorKind::QuotaExceeded);
    assert!(service.kind().is_throttling());
}

#[tokio::test(flavor = "multi_thread")]
async fn unstructured_failure_passes_through() {
    let endpoint = start_server(Config::default());
    let client = client_for(&endpoint, mock_server::MAINTENANCE_SELLER, "secret");

    let err = client.sellers().get_service_status().await.unwrap_err();
    match err {
        MwsError::Transport(TransportError::Status { status, body, headers }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "Service Unavailable");
            assert!(headers.iter().any(|(name, _)| name == "x-mws-request-id"));
        }
        other => panic!("expected an unclassified transport error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn network_failure_passes_through() {
    // Bind then drop to get a port with nothing listening.
    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let client = client(&format!("http://127.0.0.1:{port}"));

    let err = client.sellers().get_service_status().await.unwrap_err();
    assert!(matches!(err, MwsError::Transport(TransportError::Network(_))));
}
