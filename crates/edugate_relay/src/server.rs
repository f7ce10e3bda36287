/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use axum::{
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use bytes::Bytes;
use edugate_protocol::ProxyRequest;
use std::sync::atomic::{AtomicU64, Ordering};
use tower_http::trace::TraceLayer;
use tracing::{error, info_span, warn};

use crate::relay::{ErrorKind, Gateway, RelayError, RelayRequest, RelayResponse};

static REQ_ID: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> String {
    let id = REQ_ID.fetch_add(1, Ordering::Relaxed);
    format!("req-{id}")
}

#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
}

pub fn router(gateway: Gateway) -> Router {
    let proxy_path = gateway.config().proxy_path.clone();
    let max_body = gateway.config().max_body_bytes;
    let state = AppState { gateway };
    Router::new()
        .route("/healthz", get(healthz))
        .route(&proxy_path, any(proxy))
        .layer(axum::extract::DefaultBodyLimit::max(max_body))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("req");
                info_span!(
                    "http",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(from_fn(ensure_request_ids))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn proxy(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<RelayResponse, RelayError> {
    let result = match body {
        Ok(body) => relay_inbound(&state, &headers, &body).await,
        Err(rejection) => Err(body_rejection(&state, rejection)),
    };
    if let Err(e) = &result {
        match e.kind() {
            ErrorKind::Client => warn!(kind = %e.kind(), "relay rejected: {e}"),
            ErrorKind::Transport | ErrorKind::Crypto => {
                error!(kind = %e.kind(), "relay failed: {e}")
            }
        }
    }
    result
}

/// Body extraction failures still answer with the JSON failure envelope.
fn body_rejection(state: &AppState, rejection: BytesRejection) -> RelayError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RelayError::PayloadTooLarge(state.gateway.config().max_body_bytes)
    } else {
        RelayError::InvalidBody(rejection.body_text())
    }
}

/// Folds every inbound `Cookie` header into one value; HTTP/2 clients split them.
fn joined_cookies(headers: &HeaderMap) -> Option<HeaderValue> {
    let parts: Vec<&[u8]> = headers
        .get_all(header::COOKIE)
        .iter()
        .map(|v| v.as_bytes())
        .filter(|v| !v.is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }
    HeaderValue::from_bytes(&parts.join(&b"; "[..])).ok()
}

async fn relay_inbound(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<RelayResponse, RelayError> {
    let req: ProxyRequest = if body.iter().all(|b| b.is_ascii_whitespace()) {
        ProxyRequest::default()
    } else {
        serde_json::from_slice(body).map_err(|e| RelayError::InvalidBody(e.to_string()))?
    };
    let cookie = joined_cookies(headers);
    let req = RelayRequest::from_proxy(req, cookie)?;
    state.gateway.relay(req).await
}

/// Guarantees an `x-request-id` on the request and echoes it on the response.
async fn ensure_request_ids(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let headers = req.headers_mut();
    if headers.get("x-request-id").is_none() {
        let request_id = next_request_id();
        headers.insert(
            "x-request-id",
            HeaderValue::from_str(&request_id).unwrap_or_else(|_| HeaderValue::from_static("req")),
        );
    }
    let request_id = headers.get("x-request-id").cloned();
    let mut resp = next.run(req).await;
    if let Some(id) = request_id {
        resp.headers_mut().insert("x-request-id", id);
    }
    resp
}
