/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use edugate_protocol::{
    EncryptedBody, FailureEnvelope, ProxyRequest, RelayMethod, UnknownMethod, API_KEY_HEADER,
    ENCRYPTED_HEADER,
};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::info;

use crate::config::GatewayConfig;
use crate::crypto_envelope::EnvelopeError;

/// Coarse failure class used for log levels and fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Client,
    Transport,
    Crypto,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Client => "client",
            ErrorKind::Transport => "transport",
            ErrorKind::Crypto => "crypto",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Missing path")]
    MissingPath,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error(transparent)]
    InvalidMethod(#[from] UnknownMethod),

    #[error("Invalid upstream url: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Upstream request failed: {0}")]
    Upstream(reqwest::Error),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingPath | RelayError::InvalidBody(_) | RelayError::InvalidMethod(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::MissingPath
            | RelayError::InvalidBody(_)
            | RelayError::PayloadTooLarge(_)
            | RelayError::InvalidMethod(_) => ErrorKind::Client,
            RelayError::InvalidUrl(_) | RelayError::Timeout | RelayError::Upstream(_) => {
                ErrorKind::Transport
            }
            RelayError::Envelope(_) => ErrorKind::Crypto,
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RelayError::Timeout
        } else {
            RelayError::Upstream(e)
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(FailureEnvelope::new(self.to_string()))).into_response()
    }
}

/// One logical backend call, validated.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub target_path: String,
    pub method: RelayMethod,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    pub cookie: Option<HeaderValue>,
}

impl RelayRequest {
    pub fn from_proxy(req: ProxyRequest, cookie: Option<HeaderValue>) -> Result<Self, RelayError> {
        let query = req.query_pairs();
        let target_path = req
            .path
            .filter(|p| !p.trim().is_empty())
            .ok_or(RelayError::MissingPath)?;
        let method = match req.method.as_deref() {
            Some(m) => m.parse::<RelayMethod>()?,
            None => RelayMethod::default(),
        };
        Ok(Self {
            target_path,
            method,
            body: req.data,
            query,
            cookie,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub body: Value,
    pub set_cookies: Vec<HeaderValue>,
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        let body = serde_json::to_vec(&self.body).unwrap_or_else(|_| b"null".to_vec());
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for cookie in self.set_cookies {
            headers.append(header::SET_COOKIE, cookie);
        }
        (self.status, headers, body).into_response()
    }
}

/// Joins base and path with exactly one slash between them.
pub fn resolve_url(base_url: &str, target_path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        target_path.trim_start_matches('/')
    )
}

#[derive(Clone)]
pub struct Gateway {
    cfg: Arc<GatewayConfig>,
    http: reqwest::Client,
}

impl Gateway {
    pub fn new(cfg: Arc<GatewayConfig>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .connect_timeout(Duration::from_secs(cfg.http_connect_timeout_secs))
            .build()?;
        Ok(Self { cfg, http })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.cfg
    }

    pub async fn relay(&self, req: RelayRequest) -> Result<RelayResponse, RelayError> {
        let url_str = resolve_url(&self.cfg.backend_url, &req.target_path);
        let url = reqwest::Url::parse(&url_str)
            .map_err(|e| RelayError::InvalidUrl(format!("{url_str}: {e}")))?;

        let method = match req.method {
            RelayMethod::Get => reqwest::Method::GET,
            RelayMethod::Post => reqwest::Method::POST,
            RelayMethod::Put => reqwest::Method::PUT,
            RelayMethod::Patch => reqwest::Method::PATCH,
            RelayMethod::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self
            .http
            .request(method, url)
            .header(API_KEY_HEADER, self.cfg.api_key.as_str())
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = req.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }

        let encrypt_out = self.cfg.encrypt_requests && req.body.is_some();
        builder = match (&req.body, encrypt_out) {
            (Some(body), true) => {
                let key = self
                    .cfg
                    .backend_public_key
                    .as_ref()
                    .ok_or(EnvelopeError::MissingKey("backend public"))?;
                let sealed = key.encrypt_json(body)?;
                builder.header(ENCRYPTED_HEADER, "1").json(&Value::String(sealed))
            }
            (Some(body), false) => builder.header(ENCRYPTED_HEADER, "0").json(body),
            (None, _) => builder.header(ENCRYPTED_HEADER, "0"),
        };

        let resp = builder.send().await.map_err(RelayError::from_reqwest)?;
        let status = resp.status();
        let set_cookies: Vec<HeaderValue> = resp
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .cloned()
            .collect();
        let encrypted_in = resp
            .headers()
            .get(ENCRYPTED_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "1")
            .unwrap_or(false);
        let raw = resp.bytes().await.map_err(RelayError::from_reqwest)?;
        let mut body = parse_upstream_body(&raw);

        if encrypted_in {
            let key = self
                .cfg
                .private_key
                .as_ref()
                .ok_or(EnvelopeError::MissingKey("gateway private"))?;
            let sealed: EncryptedBody =
                serde_json::from_value(body).map_err(|_| EnvelopeError::MissingCiphertext)?;
            body = key.decrypt_json(&sealed.data)?;
        }

        info!(
            method = %req.method,
            path = %req.target_path,
            status = status.as_u16(),
            encrypted_out = encrypt_out,
            encrypted_in,
            cookies = set_cookies.len(),
            "relayed"
        );

        Ok(RelayResponse {
            status,
            body,
            set_cookies,
        })
    }
}

/// Empty body is `null`; non-JSON text is relayed as a JSON string.
fn parse_upstream_body(raw: &[u8]) -> Value {
    if raw.iter().all(|b| b.is_ascii_whitespace()) {
        return Value::Null;
    }
    serde_json::from_slice(raw)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(raw).into_owned()))
}
