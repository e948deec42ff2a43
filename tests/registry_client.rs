//! Integration tests for the registry client
//!
//! A local axum server stands in for ClinicalTrials.gov so status mapping,
//! query parameters and decoding run over real HTTP.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use trialfinder::config::ServiceConfig;
use trialfinder::data::{
    build_query_params, ClinicalTrialsClient, RecruitmentStatus, RegistryError, SearchRequest,
    StudySource,
};
use trialfinder::service::TrialService;

const SEARCH_PAGE: &str = r#"{
    "studies": [
        {
            "protocolSection": {
                "identificationModule": {"nctId": "NCT00000101", "briefTitle": "Gait Training After SCI"},
                "statusModule": {"overallStatus": "RECRUITING"},
                "designModule": {"phases": ["PHASE2"]},
                "eligibilityModule": {"minimumAge": "18 Years", "maximumAge": "70 Years", "sex": "ALL"}
            }
        },
        {
            "protocolSection": {
                "identificationModule": {"nctId": "NCT00000102", "briefTitle": "Observational Registry"},
                "statusModule": {"overallStatus": "NOT_YET_RECRUITING"}
            }
        }
    ],
    "nextPageToken": "NF0g5JGBlPMu",
    "totalCount": 57
}"#;

const SINGLE_STUDY: &str = r#"{
    "protocolSection": {
        "identificationModule": {"nctId": "NCT00000101", "briefTitle": "Gait Training After SCI"},
        "statusModule": {"overallStatus": "RECRUITING"},
        "sponsorCollaboratorsModule": {"leadSponsor": {"name": "Example University", "class": "OTHER"}}
    }
}"#;

type Captured = Arc<Mutex<Option<HashMap<String, String>>>>;

/// Starts `router` on an ephemeral port and returns its studies endpoint
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Test server failed");
    });
    format!("http://{}/api/v2/studies", addr)
}

/// Serves a fixed status and body on both endpoints
async fn serve_fixed(status: StatusCode, body: &'static str) -> String {
    let router = Router::new()
        .route("/api/v2/studies", get(move || async move { (status, body) }))
        .route(
            "/api/v2/studies/{id}",
            get(move || async move { (status, body) }),
        );
    serve(router).await
}

/// Serves the sample page and records the query of every search
async fn serve_recording(captured: Captured, hits: Arc<AtomicUsize>) -> String {
    let search = {
        let captured = Arc::clone(&captured);
        let hits = Arc::clone(&hits);
        move |Query(params): Query<HashMap<String, String>>| {
            let captured = Arc::clone(&captured);
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                *captured.lock().unwrap() = Some(params);
                (StatusCode::OK, SEARCH_PAGE)
            }
        }
    };
    let detail = {
        let hits = Arc::clone(&hits);
        move |Path(id): Path<String>| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                if id == "NCT00000101" {
                    (StatusCode::OK, SINGLE_STUDY)
                } else {
                    (StatusCode::NOT_FOUND, "")
                }
            }
        }
    };

    let router = Router::new()
        .route("/api/v2/studies", get(search))
        .route("/api/v2/studies/{id}", get(detail));
    serve(router).await
}

fn client(base_url: &str) -> ClinicalTrialsClient {
    ClinicalTrialsClient::with_base_url(base_url, Duration::from_secs(5))
        .expect("Failed to build client")
}

#[tokio::test]
async fn test_search_sends_query_parameters() {
    let captured: Captured = Arc::default();
    let base_url = serve_recording(Arc::clone(&captured), Arc::default()).await;

    let request = SearchRequest {
        conditions: vec!["paraplegia".to_string(), "tetraplegia".to_string()],
        status: vec![RecruitmentStatus::Recruiting],
        latitude: Some(49.28),
        longitude: Some(-123.12),
        distance: Some(25),
        page_size: 20,
        page_token: Some("abc".to_string()),
        ..Default::default()
    };
    let page = client(&base_url)
        .search_studies(&build_query_params(&request))
        .await
        .expect("Search should succeed");

    assert_eq!(page.studies.len(), 2);
    assert_eq!(page.total_count, 57);
    assert_eq!(page.next_page_token.as_deref(), Some("NF0g5JGBlPMu"));

    let params = captured.lock().unwrap().clone().expect("No query recorded");
    assert_eq!(params["format"], "json");
    assert_eq!(params["countTotal"], "true");
    assert_eq!(params["query.cond"], "paraplegia OR tetraplegia");
    assert_eq!(params["filter.overallStatus"], "RECRUITING");
    assert_eq!(params["filter.geo"], "distance(49.280000,-123.120000,25mi)");
    assert_eq!(params["pageSize"], "20");
    assert_eq!(params["pageToken"], "abc");
}

#[tokio::test]
async fn test_search_defaults_are_sent() {
    let captured: Captured = Arc::default();
    let base_url = serve_recording(Arc::clone(&captured), Arc::default()).await;

    client(&base_url)
        .search_studies(&build_query_params(&SearchRequest::default()))
        .await
        .expect("Search should succeed");

    let params = captured.lock().unwrap().clone().expect("No query recorded");
    assert_eq!(
        params["query.cond"],
        "spinal cord injury OR quadriplegia OR tetraplegia OR paraplegia"
    );
    assert_eq!(params["filter.overallStatus"], "RECRUITING,NOT_YET_RECRUITING");
    assert_eq!(params["pageSize"], "100");
    assert!(!params.contains_key("filter.geo"));
    assert!(!params.contains_key("pageToken"));
}

#[tokio::test]
async fn test_search_rate_limited() {
    let base_url = serve_fixed(StatusCode::TOO_MANY_REQUESTS, "slow down").await;

    let err = client(&base_url)
        .search_studies(&build_query_params(&SearchRequest::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::RateLimited), "Got {:?}", err);
}

#[tokio::test]
async fn test_search_server_error_carries_status_and_body() {
    let base_url = serve_fixed(StatusCode::SERVICE_UNAVAILABLE, "maintenance window").await;

    let err = client(&base_url)
        .search_studies(&build_query_params(&SearchRequest::default()))
        .await
        .unwrap_err();

    match err {
        RegistryError::Upstream { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance window");
        }
        other => panic!("Expected Upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_search_error_body_is_truncated() {
    const LONG_BODY: &str = concat!(
        "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
        "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
        "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
        "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
        "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
        "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
        "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
        "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
        "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
    );
    let base_url = serve_fixed(StatusCode::BAD_REQUEST, LONG_BODY).await;

    let err = client(&base_url)
        .search_studies(&build_query_params(&SearchRequest::default()))
        .await
        .unwrap_err();

    match err {
        RegistryError::Upstream { status, body } => {
            assert_eq!(status, 400);
            assert!(body.len() < LONG_BODY.len(), "Body should be truncated");
            assert!(body.starts_with("0123456789abcdef"));
        }
        other => panic!("Expected Upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_search_malformed_payload() {
    let base_url = serve_fixed(StatusCode::OK, "<html>not json</html>").await;

    let err = client(&base_url)
        .search_studies(&build_query_params(&SearchRequest::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Decode(_)), "Got {:?}", err);
}

#[tokio::test]
async fn test_fetch_study_success() {
    let base_url = serve_recording(Arc::default(), Arc::default()).await;

    let study = client(&base_url)
        .fetch_study("NCT00000101")
        .await
        .expect("Fetch should succeed");

    assert_eq!(study.nct_id(), "NCT00000101");
}

#[tokio::test]
async fn test_fetch_study_not_found() {
    let base_url = serve_recording(Arc::default(), Arc::default()).await;

    let err = client(&base_url).fetch_study("NCT99999999").await.unwrap_err();

    assert!(
        matches!(&err, RegistryError::NotFound(id) if id == "NCT99999999"),
        "Got {:?}",
        err
    );
    assert!(err.to_string().contains("NCT99999999"));
}

#[tokio::test]
async fn test_fetch_study_id_stays_in_one_path_segment() {
    let base_url = serve_recording(Arc::default(), Arc::default()).await;

    // Unescaped, this would fetch NCT00000101 and drop the rest
    let err = client(&base_url)
        .fetch_study("NCT00000101?x=1#frag")
        .await
        .unwrap_err();

    assert!(
        matches!(&err, RegistryError::NotFound(id) if id == "NCT00000101?x=1#frag"),
        "Got {:?}",
        err
    );
}

#[tokio::test]
async fn test_fetch_study_server_error_is_not_found() {
    let base_url = serve_fixed(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;

    let err = client(&base_url).fetch_study("NCT00000101").await.unwrap_err();

    assert!(matches!(err, RegistryError::NotFound(_)), "Got {:?}", err);
}

#[tokio::test]
async fn test_fetch_study_rate_limited() {
    let base_url = serve_fixed(StatusCode::TOO_MANY_REQUESTS, "").await;

    let err = client(&base_url).fetch_study("NCT00000101").await.unwrap_err();

    assert!(matches!(err, RegistryError::RateLimited), "Got {:?}", err);
}

#[tokio::test]
async fn test_unreachable_registry_is_unavailable() {
    // Bind and release a port so nothing is listening on it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base_url = format!("http://{}/api/v2/studies", addr);
    let err = client(&base_url)
        .search_studies(&build_query_params(&SearchRequest::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Unavailable(_)), "Got {:?}", err);
}

#[tokio::test]
async fn test_slow_registry_times_out() {
    let router = Router::new().route(
        "/api/v2/studies",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::OK, SEARCH_PAGE)
        }),
    );
    let base_url = serve(router).await;

    let client = ClinicalTrialsClient::with_base_url(base_url, Duration::from_millis(200))
        .expect("Failed to build client");
    let err = client
        .search_studies(&build_query_params(&SearchRequest::default()))
        .await
        .unwrap_err();

    match err {
        RegistryError::Unavailable(e) => assert!(e.is_timeout(), "Expected timeout, got {:?}", e),
        other => panic!("Expected Unavailable error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_service_end_to_end_with_cache() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base_url = serve_recording(Arc::default(), Arc::clone(&hits)).await;

    let config = ServiceConfig {
        base_url,
        min_request_interval: Duration::from_millis(10),
        ..Default::default()
    };
    let service = TrialService::new(&config).expect("Failed to build service");

    let request = SearchRequest {
        phase: vec!["PHASE2".to_string()],
        ..Default::default()
    };
    let first = service.search(&request).await.expect("Search should succeed");
    let second = service.search(&request).await.expect("Search should succeed");

    assert_eq!(first.trials.len(), 1);
    assert_eq!(first.trials[0].nct_id, "NCT00000101");
    assert_eq!(first.total_count, 1);
    assert_eq!(first.next_page_token.as_deref(), Some("NF0g5JGBlPMu"));
    assert_eq!(first, second);
    assert_eq!(hits.load(Ordering::SeqCst), 1, "Second search should be cached");

    let trial = service.get_trial("NCT00000101").await.expect("Get should succeed");
    assert_eq!(trial.sponsor.name, "Example University");
    assert_eq!(trial.url, "https://clinicaltrials.gov/study/NCT00000101");
    service.get_trial("NCT00000101").await.expect("Get should succeed");
    assert_eq!(hits.load(Ordering::SeqCst), 2, "Second get should be cached");

    let err = service.get_trial("NCT99999999").await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_service_without_cache_calls_registry_each_time() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base_url = serve_recording(Arc::default(), Arc::clone(&hits)).await;

    let config = ServiceConfig {
        base_url,
        cache_enabled: false,
        min_request_interval: Duration::from_millis(10),
        ..Default::default()
    };
    let service = TrialService::new(&config).expect("Failed to build service");

    service.search(&SearchRequest::default()).await.unwrap();
    service.search(&SearchRequest::default()).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
