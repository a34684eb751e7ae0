//! Integration tests for the wait-times gateway router

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    response::IntoResponse,
    routing::get,
};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

use wait_times_gateway::cache::TtlCache;
use wait_times_gateway::config::UpstreamConfig;
use wait_times_gateway::gateway::{AppState, create_router};
use wait_times_gateway::models::{Ride, WaitTimesResponse};
use wait_times_gateway::upstream::UpstreamClient;

fn sample_payload() -> WaitTimesResponse {
    let ride = Ride {
        id: 42,
        name: "Space Mountain".to_string(),
        is_open: true,
        wait_time: 35,
        last_updated: "2026-08-01T12:00:00Z".to_string(),
    };
    WaitTimesResponse {
        all_rides: vec![ride.clone()],
        filtered_rides: vec![ride.clone()],
        sorted_rides: vec![ride],
        flat_rides_history: Vec::new(),
        sorted_ride_history: Vec::new(),
    }
}

/// Serve a fixed payload on an ephemeral port, counting requests.
async fn spawn_stub_upstream(fail: bool) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_for_handler = Arc::clone(&hits);

    let app = Router::new().route(
        "/wait-times",
        get(move || {
            let hits = Arc::clone(&hits_for_handler);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                if fail {
                    (StatusCode::INTERNAL_SERVER_ERROR, "upstream down").into_response()
                } else {
                    Json(sample_payload()).into_response()
                }
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), hits)
}

fn gateway_router(upstream_url: String, ttl: Duration) -> Router {
    let upstream = UpstreamClient::new(&UpstreamConfig {
        base_url: upstream_url,
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    let cache = Arc::new(TtlCache::new(ttl));
    create_router(Arc::new(AppState::new(cache, Arc::new(upstream))))
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value, HeaderMap) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap();
    (status, value, headers)
}

#[tokio::test]
async fn miss_then_hit_serves_from_cache() {
    let (upstream_url, hits) = spawn_stub_upstream(false).await;
    let router = gateway_router(upstream_url, Duration::from_secs(60));

    let (status, body, headers) = get_json(&router, "/wait-times").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_fromCache"], Value::Bool(false));
    assert_eq!(body["all_rides"][0]["name"], "Space Mountain");
    assert_eq!(headers["x-data-source"], "api");
    assert_eq!(
        headers["cache-control"],
        "public, max-age=120, s-maxage=120, stale-while-revalidate=240"
    );

    let (status, body, headers) = get_json(&router, "/wait-times").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_fromCache"], Value::Bool(true));
    assert!(body["_cachedAt"].is_string());
    assert_eq!(headers["x-data-source"], "cache");
    assert_eq!(
        headers["cache-control"],
        "public, max-age=120, s-maxage=120, stale-while-revalidate=240"
    );

    // The upstream was only consulted for the first request
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stats_flag_reports_cache_introspection() {
    let (upstream_url, _hits) = spawn_stub_upstream(false).await;
    let router = gateway_router(upstream_url, Duration::from_secs(60));

    // Populate the cache, then ask for stats
    let _ = get_json(&router, "/wait-times").await;
    let (status, body, _) = get_json(&router, "/wait-times?stats=true").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cache"]["size"], 1);
    assert_eq!(body["cache"]["keys"][0], "ride-wait-times");
    assert_eq!(body["ttl"], 60_000);
    assert_eq!(body["ttlFormatted"], "1m");
}

#[tokio::test]
async fn per_ride_requests_use_distinct_cache_keys() {
    let (upstream_url, hits) = spawn_stub_upstream(false).await;
    let router = gateway_router(upstream_url, Duration::from_secs(60));

    let _ = get_json(&router, "/wait-times?ride_id=42").await;
    let _ = get_json(&router, "/wait-times").await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let (_, body, _) = get_json(&router, "/wait-times?stats=true").await;
    assert_eq!(body["cache"]["size"], 2);
    let keys: Vec<&str> = body["cache"]["keys"]
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k.as_str().unwrap())
        .collect();
    assert!(keys.contains(&"ride-wait-times"));
    assert!(keys.contains(&"ride-wait-times-42"));

    // The per-ride entry is a separate dataset, so another base request is a hit
    let (_, body, _) = get_json(&router, "/wait-times").await;
    assert_eq!(body["_fromCache"], Value::Bool(true));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_misses_fetch_upstream_once() {
    let (upstream_url, hits) = spawn_stub_upstream(false).await;
    let router = gateway_router(upstream_url, Duration::from_secs(60));

    let (a, b) = tokio::join!(
        get_json(&router, "/wait-times"),
        get_json(&router, "/wait-times")
    );
    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);

    // The leader fetched, the follower was served from the populated cache
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    let mut from_cache = [
        a.1["_fromCache"].as_bool().unwrap(),
        b.1["_fromCache"].as_bool().unwrap(),
    ];
    from_cache.sort_unstable();
    assert_eq!(from_cache, [false, true]);
}

#[tokio::test]
async fn upstream_failure_maps_to_bad_gateway() {
    let (upstream_url, hits) = spawn_stub_upstream(true).await;
    let router = gateway_router(upstream_url, Duration::from_secs(60));

    let (status, body, _) = get_json(&router, "/wait-times").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("upstream"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Failures are not cached; the next request tries the upstream again
    let (status, _, _) = get_json(&router, "/wait-times").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn health_reports_ok() {
    let (upstream_url, _hits) = spawn_stub_upstream(false).await;
    let router = gateway_router(upstream_url, Duration::from_secs(60));

    let (status, body, _) = get_json(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["config"]["cache_ttl_ms"], 60_000);
}
