// RPC 事件总线
// 每个节点一个 broadcast 通道，代理的每次 HTTP 往返都会发布请求事件与完成事件

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// 单个通道缓冲的事件数；慢订阅者会收到 `Lagged` 并跳过旧事件
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcEventRequest {
    /// 请求头（JSON 编码的 header map）
    pub headers: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcEventResponse {
    pub headers: String,
    pub body: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcEvent {
    pub id: String,
    pub uri: String,
    #[serde(rename = "rpcURL")]
    pub rpc_url: String,
    pub request: RpcEventRequest,
    pub response: RpcEventResponse,
    /// 耗时（毫秒），请求事件中为空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl RpcEvent {
    pub fn new(rpc_url: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            uri: uri.into(),
            rpc_url: rpc_url.into(),
            request: RpcEventRequest::default(),
            response: RpcEventResponse::default(),
            duration: None,
        }
    }
}

/// 节点 id → 事件通道
#[derive(Default, Clone)]
pub struct RpcEventHub {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<RpcEvent>>>>,
}

impl RpcEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取或创建节点的发送端
    pub async fn sender(&self, node_id: Uuid) -> broadcast::Sender<RpcEvent> {
        if let Some(tx) = self.channels.read().await.get(&node_id) {
            return tx.clone();
        }
        self.channels
            .write()
            .await
            .entry(node_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// 发布事件；没有订阅者时直接丢弃
    pub async fn publish(&self, node_id: Uuid, event: RpcEvent) {
        let tx = self.sender(node_id).await;
        if tx.send(event).is_err() {
            tracing::trace!(node_id = %node_id, "no rpc event subscribers");
        }
    }

    /// 订阅已存在的通道；节点尚未被代理过时返回 None
    pub async fn subscribe(&self, node_id: Uuid) -> Option<broadcast::Receiver<RpcEvent>> {
        self.channels
            .read()
            .await
            .get(&node_id)
            .map(broadcast::Sender::subscribe)
    }

    /// 删除节点通道，现有订阅者随后收到 `Closed`
    pub async fn remove(&self, node_id: Uuid) -> bool {
        self.channels.write().await.remove(&node_id).is_some()
    }
}
