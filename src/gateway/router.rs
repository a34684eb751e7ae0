//! HTTP router and handlers

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, TtlCache};
use crate::models::{AnnotatedWaitTimes, WaitTimesResponse};
use crate::upstream::UpstreamClient;

/// Cache key for the all-rides dataset; per-ride requests append the ride id.
const WAIT_TIMES_CACHE_KEY: &str = "ride-wait-times";

/// Cache-Control served with wait-times payloads, hit and miss alike.
const CACHE_CONTROL_VALUE: &str = "public, max-age=120, s-maxage=120, stale-while-revalidate=240";

/// Shared application state
pub struct AppState {
    /// Response cache for the wait-times dataset
    pub cache: Arc<TtlCache<WaitTimesResponse>>,
    /// Upstream wait-times API client
    pub upstream: Arc<UpstreamClient>,
    /// Per-key guards deduplicating concurrent misses: followers wait for
    /// the leader's fetch and then re-check the cache instead of fetching.
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    /// Bundle the gateway's owned components into handler state.
    pub fn new(cache: Arc<TtlCache<WaitTimesResponse>>, upstream: Arc<UpstreamClient>) -> Self {
        Self {
            cache,
            upstream,
            inflight: DashMap::new(),
        }
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/wait-times", get(wait_times_handler))
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new())
        // The original park feed is browser-consumed from anywhere
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Query parameters accepted by the wait-times route
#[derive(Debug, Deserialize)]
struct WaitTimesParams {
    /// `stats=true` bypasses payload serving and reports cache introspection
    stats: Option<String>,
    /// Restrict the payload to a single ride
    ride_id: Option<i64>,
}

/// GET /wait-times — cache-shielded proxy for the upstream feed
async fn wait_times_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WaitTimesParams>,
) -> Response {
    if params.stats.as_deref() == Some("true") {
        let ttl = state.cache.ttl();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        return Json(json!({
            "cache": state.cache.stats(),
            "ttl": ttl_ms,
            "ttlFormatted": humantime::format_duration(ttl).to_string(),
        }))
        .into_response();
    }

    let cache_key = match params.ride_id {
        Some(id) => format!("{WAIT_TIMES_CACHE_KEY}-{id}"),
        None => WAIT_TIMES_CACHE_KEY.to_string(),
    };

    if let Some(id) = params.ride_id {
        debug!(ride_id = id, "filtering by ride");
    }

    if let Some(entry) = state.cache.get(&cache_key) {
        debug!(key = %cache_key, "serving wait times from cache");
        return cached_response(entry);
    }

    // Single-flight on miss: one upstream fetch per key, concurrent callers
    // wait and are served from the freshly populated cache.
    let guard = {
        let entry = state
            .inflight
            .entry(cache_key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(&entry)
    };
    let permit = guard.lock().await;

    if let Some(entry) = state.cache.get(&cache_key) {
        debug!(key = %cache_key, "populated by concurrent request");
        return cached_response(entry);
    }

    info!(key = %cache_key, "cache miss, fetching from upstream");
    let response = match state.upstream.fetch_wait_times(params.ride_id).await {
        Ok(payload) => {
            state.cache.set(&cache_key, payload.clone());
            fresh_response(payload)
        }
        Err(e) => {
            warn!(key = %cache_key, error = %e, "upstream fetch failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Failed to fetch wait times from upstream" })),
            )
                .into_response()
        }
    };

    drop(permit);
    state.inflight.remove(&cache_key);
    response
}

/// GET /health — liveness and configuration summary
async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let ttl_ms = u64::try_from(state.cache.ttl().as_millis()).unwrap_or(u64::MAX);
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "upstream": true,
        },
        "config": {
            "upstream_url": state.upstream.base_url(),
            "cache_ttl_ms": ttl_ms,
        },
    }))
    .into_response()
}

/// Serve a cache hit with its original storage time.
fn cached_response(entry: CacheEntry<WaitTimesResponse>) -> Response {
    let body = AnnotatedWaitTimes {
        payload: entry.data,
        cached_at: entry.stored_at,
        from_cache: true,
    };
    with_cache_headers(Json(body).into_response(), "cache")
}

/// Serve a payload fetched from the upstream on this request.
fn fresh_response(payload: WaitTimesResponse) -> Response {
    let body = AnnotatedWaitTimes {
        payload,
        cached_at: Utc::now(),
        from_cache: false,
    };
    with_cache_headers(Json(body).into_response(), "api")
}

fn with_cache_headers(mut response: Response, source: &'static str) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL_VALUE),
    );
    headers.insert("x-data-source", HeaderValue::from_static(source));
    response
}
