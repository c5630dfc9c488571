//! 仪表盘状态：全局设置、当前 RPC 地址与 provider、选中的节点

use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use tokio::{sync::watch, task::JoinHandle};
use uuid::Uuid;

use super::{storage::StoreError, store::Store};
use crate::{
    domain::{node::Node, settings::Setting},
    infrastructure::rpc_client::{RpcError, RpcTransport, WsRpcClient},
};

pub const SETTINGS_PATH: &str = "/api/v1/settings";
pub const NODES_PATH: &str = "/api/v1/nodes";
pub const NODE_RPC_PATH: &str = "/api/v1/nodes/rpc";

/// `http://<host>/api/v1/nodes/rpc/<id>`
pub fn http_node_rpc_url(host: &str, node_id: Uuid) -> String {
    format!("http://{}{}/{}", host, NODE_RPC_PATH, node_id)
}

/// `ws://<host>/api/v1/nodes/rpc/<id>`
pub fn ws_node_rpc_url(host: &str, node_id: Uuid) -> String {
    format!("ws://{}{}/{}", host, NODE_RPC_PATH, node_id)
}

/// 全局设置（加载成功前为 `None`）
#[derive(Debug, Default)]
pub struct SettingsStore {
    store: Store<Option<Setting>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `GET http://<host>/api/v1/settings`
    pub async fn load(&self, http: &reqwest::Client, host: &str) -> Result<(), StoreError> {
        let response = http
            .get(format!("http://{}{}", host, SETTINGS_PATH))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::Status(response.status().as_u16()));
        }
        let setting: Setting = response.json().await?;
        self.store.set(Some(setting));
        Ok(())
    }

    pub fn get(&self) -> Arc<Option<Setting>> {
        self.store.get()
    }

    pub fn set(&self, setting: Setting) {
        self.store.set(Some(setting));
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Option<Setting>>> {
        self.store.subscribe()
    }
}

/// 当前选择的 RPC 地址
#[derive(Debug, Default)]
pub struct RpcUrlStore {
    store: Store<Option<String>>,
}

impl RpcUrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.store.get().as_ref().clone()
    }

    pub fn set(&self, url: impl Into<String>) {
        self.store.set(Some(url.into()));
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Option<String>>> {
        self.store.subscribe()
    }
}

/// 当前选中的节点
#[derive(Debug, Default)]
pub struct NodeStore {
    store: Store<Option<Node>>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Arc<Option<Node>> {
        self.store.get()
    }

    pub fn set(&self, node: Node) {
        self.store.set(Some(node));
    }

    pub fn clear(&self) {
        self.store.set(None);
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Option<Node>>> {
        self.store.subscribe()
    }
}

/// 按 URL 建立 provider 连接
#[async_trait]
pub trait ProviderConnector: Send + Sync {
    async fn connect(&self, rpc_url: &str) -> Result<Arc<dyn RpcTransport>, RpcError>;
}

/// 使用 ethers WebSocket provider
#[derive(Debug, Default, Clone, Copy)]
pub struct WsProviderConnector;

#[async_trait]
impl ProviderConnector for WsProviderConnector {
    async fn connect(&self, rpc_url: &str) -> Result<Arc<dyn RpcTransport>, RpcError> {
        let client = WsRpcClient::connect(rpc_url).await?;
        Ok(Arc::new(client))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderState {
    pub rpc_url: Option<String>,
    pub provider: Option<Arc<dyn RpcTransport>>,
}

/// provider 状态
///
/// 初始跟随默认节点的 WS 代理地址；第一次显式 `set_rpc_url` 后停止跟随，
/// 之后每次换地址都会丢弃旧 provider 并重建。
pub struct ProviderStore {
    store: Store<ProviderState>,
    connector: Arc<dyn ProviderConnector>,
    follower: Mutex<Option<JoinHandle<()>>>,
}

impl ProviderStore {
    pub fn new(connector: Arc<dyn ProviderConnector>) -> Arc<Self> {
        Arc::new(Self {
            store: Store::default(),
            connector,
            follower: Mutex::new(None),
        })
    }

    pub fn get(&self) -> Arc<ProviderState> {
        self.store.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ProviderState>> {
        self.store.subscribe()
    }

    pub fn is_following(&self) -> bool {
        self.follower_slot()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// 跟随设置中的默认节点
    pub fn follow_default_node(self: &Arc<Self>, settings: &SettingsStore, host: impl Into<String>) {
        let mut rx = settings.subscribe();
        let host = host.into();
        let this: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            loop {
                let default_node = rx
                    .borrow_and_update()
                    .as_ref()
                    .as_ref()
                    .and_then(Setting::default_node_id);

                if let Some(node_id) = default_node {
                    let Some(store) = this.upgrade() else { break };
                    let url = ws_node_rpc_url(&host, node_id);
                    if store.get().rpc_url.as_deref() != Some(url.as_str()) {
                        if let Err(e) = store.apply(url).await {
                            tracing::warn!(node_id = %node_id, error = %e, "default node provider unavailable");
                        }
                    }
                }

                if rx.changed().await.is_err() {
                    break;
                }
            }
        });

        if let Some(previous) = self.follower_slot().replace(handle) {
            previous.abort();
        }
    }

    /// 显式切换 RPC 地址（停止跟随默认节点）
    pub async fn set_rpc_url(&self, rpc_url: impl Into<String>) -> Result<(), RpcError> {
        if let Some(handle) = self.follower_slot().take() {
            handle.abort();
        }
        self.apply(rpc_url.into()).await
    }

    async fn apply(&self, rpc_url: String) -> Result<(), RpcError> {
        let result = self.connector.connect(&rpc_url).await;
        let (provider, outcome) = match result {
            Ok(provider) => (Some(provider), Ok(())),
            Err(e) => (None, Err(e)),
        };
        self.store.set(ProviderState {
            rpc_url: Some(rpc_url),
            provider,
        });
        outcome
    }

    fn follower_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.follower.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ProviderStore {
    fn drop(&mut self) {
        if let Some(handle) = self.follower_slot().take() {
            handle.abort();
        }
    }
}
