//! Same-origin pass-through to a Casper node's JSON-RPC endpoint.
//!
//! Browsers cannot call the public node directly (no CORS headers), so the
//! dashboard posts to `/api/rpc` here and gets the node's reply back verbatim.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

pub const DEFAULT_UPSTREAM: &str = "https://node.testnet.casper.network/rpc";

pub struct ProxyState {
    client: reqwest::Client,
    upstream: String,
}

impl ProxyState {
    pub fn new(upstream: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upstream: upstream.into(),
        }
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn method_not_allowed() -> HandlerError {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse {
            error: "Method not allowed".into(),
            message: None,
        }),
    )
}

fn proxy_failed(message: impl ToString) -> HandlerError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Failed to proxy RPC request".into(),
            message: Some(message.to_string()),
        }),
    )
}

// ─── Handler ────────────────────────────────────────────────────────────────

async fn rpc_handler(
    State(state): State<Arc<ProxyState>>,
    method: Method,
    body: Bytes,
) -> Result<Response, HandlerError> {
    if method == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }
    if method != Method::POST {
        return Err(method_not_allowed());
    }

    // Re-serialize so the node always sees a JSON body.
    let request: Value = serde_json::from_slice(&body).map_err(proxy_failed)?;
    let rpc_method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("?")
        .to_string();

    let resp = state
        .client
        .post(&state.upstream)
        .json(&request)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(method = %rpc_method, error = %e, "upstream unreachable");
            proxy_failed(e)
        })?;

    let status = StatusCode::from_u16(resp.status().as_u16()).map_err(proxy_failed)?;
    let reply: Value = resp.json().await.map_err(|e| {
        tracing::warn!(method = %rpc_method, %status, error = %e, "upstream reply is not JSON");
        proxy_failed(e)
    })?;

    tracing::info!(method = %rpc_method, %status, "proxied");
    Ok((status, Json(reply)).into_response())
}

// ─── Router ─────────────────────────────────────────────────────────────────

pub fn router(state: ProxyState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", any(rpc_handler))
        .route("/api/rpc", any(rpc_handler))
        .layer(cors)
        .with_state(Arc::new(state))
}
