use fidelity_common::{FidelityError, Result};
use serde_json::Value;

/// Carries one JSON-RPC request body to the node and returns the JSON reply.
#[allow(async_fn_in_trait)]
pub trait RpcTransport {
    async fn post(&self, body: &Value) -> Result<Value>;
}

/// HTTPS POST via reqwest (fetch under wasm).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RpcTransport for HttpTransport {
    async fn post(&self, body: &Value) -> Result<Value> {
        let resp = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| FidelityError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| FidelityError::Transport(e.to_string()))?;

        let http_error = || FidelityError::Transport(format!("HTTP {}: {}", status.as_u16(), text.trim()));
        let value: Value = serde_json::from_str(&text).map_err(|_| http_error())?;
        // A failed status is only trusted if the body is still a JSON-RPC envelope.
        if !status.is_success() && value.get("jsonrpc").is_none() {
            return Err(http_error());
        }
        Ok(value)
    }
}
