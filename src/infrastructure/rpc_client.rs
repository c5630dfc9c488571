//! JSON-RPC 客户端
//!
//! `RpcTransport` 是节点状态查询、连接测试和钱包连接共用的调用接口：
//! - `HttpRpcClient`：reqwest POST
//! - `WsRpcClient`：ethers `Provider<Ws>`

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use ethers::providers::{Provider, ProviderError, Ws};
use serde_json::Value;
use thiserror::Error;

use crate::infrastructure::rpc_validator;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("RPC request failed with status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("RPC error {code}: {message}")]
    JsonRpc { code: i64, message: String },
    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<ProviderError> for RpcError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::JsonRpcClientError(inner) => match inner.as_error_response() {
                Some(resp) => Self::JsonRpc {
                    code: resp.code,
                    message: resp.message.clone(),
                },
                None => Self::Transport(inner.to_string()),
            },
            ProviderError::SerdeJson(e) => Self::InvalidResponse(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// JSON-RPC 调用接口
#[async_trait]
pub trait RpcTransport: Send + Sync + fmt::Debug {
    /// 调用 `method`，返回 `result` 字段
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// 目标 RPC 地址
    fn url(&self) -> &str;
}

/// HTTP JSON-RPC 客户端
#[derive(Debug)]
pub struct HttpRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(http, url)
    }

    /// 复用已有的 reqwest 客户端（共享连接池）
    pub fn with_client(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        });

        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RpcError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let mut json: Value = serde_json::from_str(&body)
            .map_err(|e| RpcError::InvalidResponse(format!("{}: {}", e, body)))?;

        rpc_validator::validate_rpc_response(&json)?;

        Ok(json
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// WebSocket JSON-RPC 客户端
pub struct WsRpcClient {
    provider: Provider<Ws>,
    url: String,
}

impl WsRpcClient {
    pub async fn connect(url: impl Into<String>) -> Result<Self, RpcError> {
        let url = url.into();
        let provider = Provider::<Ws>::connect(url.as_str()).await?;
        Ok(Self { provider, url })
    }
}

impl fmt::Debug for WsRpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsRpcClient").field("url", &self.url).finish()
    }
}

#[async_trait]
impl RpcTransport for WsRpcClient {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let result: Value = self.provider.request(method, params).await?;
        Ok(result)
    }

    fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use axum::{routing::post, Json, Router};
    use serde_json::json;

    use super::*;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_request_returns_result() {
        let url = spawn(Router::new().route(
            "/",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"jsonrpc": "2.0", "id": body["id"], "result": body["method"]}))
            }),
        ))
        .await;

        let client = HttpRpcClient::new(&url, Duration::from_secs(5));
        let result = client.request("eth_mining", json!([])).await.unwrap();
        assert_eq!(result, json!("eth_mining"));
        assert_eq!(client.url(), url);
    }

    #[tokio::test]
    async fn test_http_request_maps_rpc_error() {
        let url = spawn(Router::new().route(
            "/",
            post(|| async {
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": {"code": -32601, "message": "the method rpc_modules does not exist"}
                }))
            }),
        ))
        .await;

        let client = HttpRpcClient::new(&url, Duration::from_secs(5));
        let err = client.request("rpc_modules", json!([])).await.unwrap_err();
        assert!(matches!(err, RpcError::JsonRpc { code: -32601, .. }));
    }

    #[tokio::test]
    async fn test_http_request_maps_status() {
        let url = spawn(Router::new().route(
            "/",
            post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream down") }),
        ))
        .await;

        let client = HttpRpcClient::new(&url, Duration::from_secs(5));
        let err = client.request("eth_chainId", json!([])).await.unwrap_err();
        assert!(matches!(err, RpcError::HttpStatus { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_http_request_unreachable() {
        let client = HttpRpcClient::new("http://127.0.0.1:1", Duration::from_secs(2));
        let err = client.request("eth_chainId", json!([])).await.unwrap_err();
        assert!(matches!(err, RpcError::Transport(_)));
    }

    #[test]
    fn test_provider_error_mapping() {
        let decode = serde_json::from_str::<Value>("{").unwrap_err();
        assert!(matches!(
            RpcError::from(ProviderError::SerdeJson(decode)),
            RpcError::InvalidResponse(_)
        ));
        assert!(matches!(
            RpcError::from(ProviderError::CustomError("ws closed".into())),
            RpcError::Transport(_)
        ));
    }
}
