//! Proxy against a local stand-in node, both on ephemeral ports.

use anyhow::Result;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use fidelity_proxy::{router, ProxyState};
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn fake_node(Json(request): Json<Value>) -> Response {
    let id = request["id"].clone();
    match request["method"].as_str() {
        Some("overloaded") => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "jsonrpc": "2.0", "id": id, "error": { "code": -32000, "message": "busy" } })),
        )
            .into_response(),
        Some("garbled") => (StatusCode::OK, "<html>oops</html>").into_response(),
        method => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": { "echo": method, "params": request["params"] }
        }))
        .into_response(),
    }
}

async fn serve(app: Router) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Ok(format!("http://{addr}"))
}

/// Proxy in front of the fake node; returns the proxy's `/api/rpc` URL.
async fn start() -> Result<String> {
    let node = serve(Router::new().route("/rpc", post(fake_node))).await?;
    let proxy = serve(router(ProxyState::new(format!("{node}/rpc")))).await?;
    Ok(format!("{proxy}/api/rpc"))
}

#[tokio::test]
async fn forwards_body_and_returns_node_reply() -> Result<()> {
    let url = start().await?;
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1712,
        "method": "chain_get_state_root_hash",
        "params": {}
    });

    let resp = reqwest::Client::new().post(&url).json(&body).send().await?;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers()["access-control-allow-origin"].to_str()?,
        "*"
    );
    let reply: Value = resp.json().await?;
    assert_eq!(reply["id"], 1712);
    assert_eq!(reply["result"]["echo"], "chain_get_state_root_hash");
    Ok(())
}

#[tokio::test]
async fn node_error_status_is_passed_through() -> Result<()> {
    let url = start().await?;
    let body = json!({ "jsonrpc": "2.0", "id": 2, "method": "overloaded", "params": {} });

    let resp = reqwest::Client::new().post(&url).json(&body).send().await?;
    assert_eq!(resp.status().as_u16(), 503);
    let reply: Value = resp.json().await?;
    assert_eq!(reply["error"]["message"], "busy");
    Ok(())
}

#[tokio::test]
async fn preflight_is_answered_with_cors_headers() -> Result<()> {
    let url = start().await?;
    let resp = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, &url)
        .header("origin", "https://fidelity.example")
        .header("access-control-request-method", "POST")
        .send()
        .await?;

    assert_eq!(resp.status().as_u16(), 200);
    let headers = resp.headers();
    assert_eq!(headers["access-control-allow-origin"].to_str()?, "*");
    assert!(headers["access-control-allow-methods"].to_str()?.contains("POST"));
    assert!(headers["access-control-allow-headers"]
        .to_str()?
        .to_ascii_lowercase()
        .contains("content-type"));
    Ok(())
}

#[tokio::test]
async fn other_methods_are_refused() -> Result<()> {
    let url = start().await?;
    let resp = reqwest::get(&url).await?;
    assert_eq!(resp.status().as_u16(), 405);
    let reply: Value = resp.json().await?;
    assert_eq!(reply, json!({ "error": "Method not allowed" }));
    Ok(())
}

#[tokio::test]
async fn unreachable_node_is_a_500() -> Result<()> {
    // Grab a free port, then close it so nothing is listening.
    let closed = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;
    let proxy = serve(router(ProxyState::new(format!("http://{closed}/rpc")))).await?;

    let resp = reqwest::Client::new()
        .post(format!("{proxy}/api/rpc"))
        .json(&json!({ "jsonrpc": "2.0", "id": 3, "method": "info_get_status", "params": {} }))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 500);
    let reply: Value = resp.json().await?;
    assert_eq!(reply["error"], "Failed to proxy RPC request");
    assert!(!reply["message"].as_str().unwrap_or_default().is_empty());
    Ok(())
}

#[tokio::test]
async fn non_json_node_reply_is_a_500() -> Result<()> {
    let url = start().await?;
    let body = json!({ "jsonrpc": "2.0", "id": 4, "method": "garbled", "params": {} });

    let resp = reqwest::Client::new().post(&url).json(&body).send().await?;
    assert_eq!(resp.status().as_u16(), 500);
    let reply: Value = resp.json().await?;
    assert_eq!(reply["error"], "Failed to proxy RPC request");
    Ok(())
}
