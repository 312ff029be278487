// Copyright 2026 Skimmer Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API for the scrape engine.
//!
//! One inbound operation: POST /scrape. Partial scrape failures still
//! return 200 with a populated `errors` array; only request-shape
//! violations (missing or non-HTTP(S) `url`) produce a 4xx.

use crate::engine::ScrapeEngine;
use crate::model::{FetchMode, FetchRequest};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use url::Url;

/// Wrapper to assert a future is Send.
///
/// The scrape future contains only Send types, but the compiler cannot
/// always prove it due to higher-ranked lifetime bounds in transitive
/// dependencies (scraper, chromiumoxide).
struct AssertSend<F>(F);

// SAFETY: All concrete types held across await points in the scrape path
// are Send; HTML parsing happens in synchronous scopes between awaits.
unsafe impl<F: std::future::Future> Send for AssertSend<F> {}

impl<F: std::future::Future> std::future::Future for AssertSend<F> {
    type Output = F::Output;
    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let inner = unsafe { self.map_unchecked_mut(|s| &mut s.0) };
        inner.poll(cx)
    }
}

/// State shared by all REST handlers.
pub struct SharedState {
    pub engine: ScrapeEngine,
    pub browser_available: bool,
    pub started_at: Instant,
}

/// Request body for POST /scrape.
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeParams {
    pub url: Option<String>,
    pub mode: Option<FetchMode>,
    pub scrolls: Option<u32>,
    pub clicks: Option<u32>,
    pub pagination_limit: Option<u32>,
}

/// Request-shape violations. These are the only failures that surface as
/// 4xx; everything past validation comes back 200 with `errors[]`.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid request body: {0}")]
    BadBody(String),
    #[error("missing 'url' field")]
    MissingUrl,
    #[error("only HTTP/HTTPS URLs are supported")]
    UnsupportedScheme,
}

/// Validate the request body into a URL string plus options.
fn validate_params(body: Value) -> Result<ScrapeParams, RequestError> {
    let params: ScrapeParams =
        serde_json::from_value(body).map_err(|e| RequestError::BadBody(e.to_string()))?;

    let Some(raw_url) = params.url.as_deref().filter(|u| !u.is_empty()) else {
        return Err(RequestError::MissingUrl);
    };

    match Url::parse(raw_url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(params),
        _ => Err(RequestError::UnsupportedScheme),
    }
}

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<SharedState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/scrape", post(handle_scrape))
        .layer(cors)
        .with_state(state)
}

/// Start the REST server on the given port.
pub async fn start(port: u16, state: Arc<SharedState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("REST API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<Arc<SharedState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
        "browser_available": state.browser_available,
    }))
}

async fn handle_scrape(
    State(state): State<Arc<SharedState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    // Request-shape validation; the engine re-checks the scheme before
    // any I/O.
    let params = match validate_params(body) {
        Ok(p) => p,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            );
        }
    };

    let req = FetchRequest {
        url: params.url.clone().unwrap_or_default(),
        mode: params.mode.unwrap_or(FetchMode::Auto),
        limits: state
            .engine
            .limits(params.scrolls, params.clicks, params.pagination_limit),
    };

    // AssertSend + spawn to satisfy axum's Send requirement; see the
    // wrapper's safety note.
    let task_state = Arc::clone(&state);
    let fut = AssertSend(async move { task_state.engine.scrape(req).await });
    match tokio::task::spawn(fut).await {
        Ok(result) => {
            let value = serde_json::to_value(&result)
                .unwrap_or_else(|_| json!({ "error": "failed to serialize result" }));
            (StatusCode::OK, Json(json!({ "result": value })))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("scrape task panicked: {e}") })),
        ),
    }
}
