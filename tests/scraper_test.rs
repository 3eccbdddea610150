//! CLI product client against a local HTTP server

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use observation_scraper::{
    get_climate_data, CliScraper, CliSettings, ErrorCode, Location, MemorySink, Pipeline,
    ReportSource,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const KNYC_HTML: &str = include_str!("fixtures/knyc_cli.html");

/// Serve `app` on an ephemeral port and return the product URL
async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/product.php", addr)
}

fn settings(base_url: String, max_retries: u32) -> CliSettings {
    let mut default_params = BTreeMap::new();
    default_params.insert("product".to_string(), "CLI".to_string());
    default_params.insert("format".to_string(), "CI".to_string());
    default_params.insert("version".to_string(), "1".to_string());
    default_params.insert("glossary".to_string(), "0".to_string());

    let mut locations = BTreeMap::new();
    locations.insert(
        "KNYC".to_string(),
        Location {
            site: "OKX".to_string(),
            issuedby: "NYC".to_string(),
        },
    );

    CliSettings {
        base_url,
        default_params,
        locations,
        timeout_secs: 5,
        max_retries,
    }
}

fn scraper(base_url: String, max_retries: u32) -> CliScraper {
    CliScraper::new(settings(base_url, max_retries))
        .unwrap()
        .with_retry_delay(Duration::from_millis(5))
}

/// Answers like forecast.weather.gov for OKX/NYC, 404 otherwise
async fn product(Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
    let wanted = [
        ("site", "OKX"),
        ("issuedby", "NYC"),
        ("product", "CLI"),
        ("format", "CI"),
        ("version", "1"),
        ("glossary", "0"),
    ];
    let matches = wanted
        .iter()
        .all(|(k, v)| params.get(*k).map(String::as_str) == Some(*v));

    if matches {
        (StatusCode::OK, KNYC_HTML.to_string())
    } else {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    }
}

/// Fails with `status` for the first `failures` requests, then serves the report
#[derive(Clone)]
struct Flaky {
    hits: Arc<AtomicUsize>,
    failures: usize,
    status: StatusCode,
}

async fn flaky(State(state): State<Flaky>) -> (StatusCode, String) {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst);
    if hit < state.failures {
        (state.status, "try again".to_string())
    } else {
        (StatusCode::OK, KNYC_HTML.to_string())
    }
}

fn flaky_app(failures: usize, status: StatusCode) -> (Router, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new().route("/product.php", get(flaky)).with_state(Flaky {
        hits: hits.clone(),
        failures,
        status,
    });
    (app, hits)
}

#[tokio::test]
async fn test_fetch_report_success() {
    let url = spawn(Router::new().route("/product.php", get(product))).await;

    let body = scraper(url, 0).fetch_report("KNYC").await.unwrap();
    assert!(body.contains("CLIMATE SUMMARY FOR APRIL 17 2025"));
}

#[tokio::test]
async fn test_fetch_and_parse() {
    let url = spawn(Router::new().route("/product.php", get(product))).await;

    let report = get_climate_data(&scraper(url, 0), "KNYC").await.unwrap();
    assert_eq!(report.station_id, "KNYC");
    assert_eq!(report.report_date.as_deref(), Some("APRIL 17 2025"));
    assert_eq!(report.temperature_max, 64.0);
    assert_eq!(report.temperature_min, 42.0);
    assert_eq!(report.humidity_avg, Some(35));
    assert_eq!(report.wind_highest_speed, Some(17.0));
}

#[tokio::test]
async fn test_http_error_is_not_retried() {
    let (app, hits) = flaky_app(usize::MAX, StatusCode::NOT_FOUND);
    let url = spawn(app).await;

    let err = scraper(url, 3).fetch_report("KNYC").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::FetchHttpStatus);
    assert!(err.message.contains("Error fetching CLI report"));
    assert!(err.message.contains("404"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let (app, hits) = flaky_app(2, StatusCode::SERVICE_UNAVAILABLE);
    let url = spawn(app).await;

    let body = scraper(url, 3).fetch_report("KNYC").await.unwrap();
    assert!(body.contains("glossaryProduct"));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_rate_limit_exhausts_retries() {
    let (app, hits) = flaky_app(usize::MAX, StatusCode::TOO_MANY_REQUESTS);
    let url = spawn(app).await;

    let err = scraper(url, 2).fetch_report("KNYC").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::FetchRateLimited);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_blank_body_is_an_error() {
    let app = Router::new().route("/product.php", get(|| async { "   \n  " }));
    let url = spawn(app).await;

    let err = scraper(url, 0).fetch_report("KNYC").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::FetchEmptyResponse);
    assert!(err.message.contains("Empty response received from"));
}

#[tokio::test]
async fn test_connection_refused() {
    // Grab a free port, then close it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = scraper(format!("http://{}/product.php", addr), 1)
        .fetch_report("KNYC")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::FetchConnectionFailed);
    assert!(err.is_retryable());
    assert!(err.message.starts_with("Error fetching CLI report:"));
}

#[tokio::test]
async fn test_unknown_station_makes_no_request() {
    let (app, hits) = flaky_app(0, StatusCode::OK);
    let url = spawn(app).await;

    let err = scraper(url, 0).fetch_report("KXYZ").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigUnknownStation);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pipeline_end_to_end() {
    let url = spawn(Router::new().route("/product.php", get(product))).await;
    let sink = Arc::new(MemorySink::new());
    let pipeline = Pipeline::new(Arc::new(scraper(url, 0)), sink.clone(), "observations");

    let count = pipeline.run_station("KNYC", false).await.unwrap();
    assert_eq!(count, 6);

    let sent = sink.sent();
    assert_eq!(sent.len(), 6);
    assert!(sent.iter().all(|s| s.topic == "observations"));
    assert!(sent.iter().all(|s| s.key.as_deref() == Some("KNYC")));
    assert!(sink.flush_count() >= 1);

    let max = &sent[0].beat;
    assert_eq!(max.measurement_type, "temperature");
    assert_eq!(max.observation_type, "max");
    assert_eq!(max.timestamp, "2025-04-17T15:41:00Z");

    let payload = serde_json::to_value(&sent[2].beat).unwrap();
    assert_eq!(payload["period"], "daily");
    assert_eq!(payload["service"], "CLI");

    // Same report date again is skipped
    assert_eq!(pipeline.run_station("KNYC", false).await.unwrap(), 0);
    assert_eq!(sink.sent().len(), 6);
}
