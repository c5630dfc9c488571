//! 节点连接测试
//!
//! HTTP：POST `eth_blockNumber`，非 2xx 视为失败。
//! WebSocket：建立连接后发送 `eth_blockNumber`，等待第一条消息；
//! JSON-RPC 错误或 socket 错误视为失败，结束后总是关闭连接。
//! 所有失败统一映射为 `ConnectionError::FailedToConnect(url)`，具体原因只记录日志。

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use thiserror::Error;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::domain::{endpoint_type, EndpointType};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Failed to connect to {0}")]
    FailedToConnect(String),
}

fn block_number_request() -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "eth_blockNumber",
        "params": [],
        "id": 1
    })
}

#[derive(Debug, Clone)]
pub struct ConnectionTester {
    http: reqwest::Client,
    timeout: Duration,
}

impl Default for ConnectionTester {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl ConnectionTester {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, timeout }
    }

    pub async fn test(&self, rpc_url: &str) -> Result<(), ConnectionError> {
        let outcome = match endpoint_type(rpc_url) {
            EndpointType::Http => self.test_http(rpc_url).await,
            EndpointType::Ws => {
                match tokio::time::timeout(self.timeout, test_ws(rpc_url)).await {
                    Ok(res) => res,
                    Err(_) => Err(format!("timed out after {:?}", self.timeout)),
                }
            }
        };

        outcome.map_err(|reason| {
            tracing::debug!(rpc_url = %rpc_url, reason = %reason, "rpc connection test failed");
            ConnectionError::FailedToConnect(rpc_url.to_string())
        })
    }

    async fn test_http(&self, rpc_url: &str) -> Result<(), String> {
        let res = self
            .http
            .post(rpc_url)
            .header("Content-Type", "application/json")
            .json(&block_number_request())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            return Err(format!("status {}", res.status()));
        }
        Ok(())
    }
}

async fn test_ws(rpc_url: &str) -> Result<(), String> {
    let (mut socket, _) = connect_async(rpc_url).await.map_err(|e| e.to_string())?;

    let outcome = async {
        socket
            .send(Message::Text(block_number_request().to_string()))
            .await
            .map_err(|e| e.to_string())?;

        while let Some(msg) = socket.next().await {
            let payload = match msg.map_err(|e| e.to_string())? {
                Message::Text(text) => text.into_bytes(),
                Message::Binary(bytes) => bytes,
                Message::Close(_) => return Err("socket closed".to_string()),
                _ => continue,
            };
            let res: Value = serde_json::from_slice(&payload).map_err(|e| e.to_string())?;
            if let Some(err) = res.get("error") {
                return Err(err.to_string());
            }
            return Ok(());
        }
        Err("socket closed".to_string())
    }
    .await;

    let _ = socket.close(None).await;
    outcome
}

/// 使用默认超时测试 RPC 地址
pub async fn test_rpc_connection(rpc_url: &str) -> Result<(), ConnectionError> {
    ConnectionTester::default().test(rpc_url).await
}
