//! 节点模型
//!
//! `NodeRecord` 是持久化的节点元数据；`Node` 在其上附加仪表盘实时遥测字段，
//! 由 [`Node::refresh`] 并发查询节点 JSON-RPC 后原地更新。

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use super::network::{NetworkInfo, NodeType};
use crate::infrastructure::{
    rpc_client::{RpcError, RpcTransport},
    rpc_validator,
};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("JsonRpcProvider required")]
    ProviderRequired,
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// 节点 RPC 地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rpc {
    pub http: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws: Option<String>,
}

/// 持久化的节点元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: Uuid,
    pub name: String,
    pub node_type: NodeType,
    #[serde(default)]
    pub is_dev: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub explorer_url: String,
    pub rpc: Rpc,
}

fn default_enabled() -> bool {
    true
}

impl NodeRecord {
    /// 新建远程节点：随机 v4 id，启用，当前 UTC 时间
    pub fn new_remote(name: impl Into<String>, rpc: Rpc) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            node_type: NodeType::RemoteNode,
            is_dev: false,
            enabled: true,
            date_added: Utc::now(),
            explorer_url: String::new(),
            rpc,
        }
    }
}

/// `eth_syncing` 返回的同步进度
///
/// 各客户端字段不一（Erigon 没有 `startingBlock`，而是带 `stages`），
/// 缺失字段为 None，未识别的字段原样保留在 `extra` 中。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_states: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulled_states: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// `eth_syncing`：未同步时为 `false`，同步中为进度对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyncState {
    Idle(bool),
    Syncing(SyncStatus),
}

impl Default for SyncState {
    fn default() -> Self {
        Self::Idle(false)
    }
}

impl SyncState {
    pub fn is_syncing(&self) -> bool {
        match self {
            Self::Idle(flag) => *flag,
            Self::Syncing(_) => true,
        }
    }
}

/// `rpc_modules`：模块名 → 版本
pub type RpcModules = BTreeMap<String, String>;

/// 仪表盘节点
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(flatten)]
    pub record: NodeRecord,

    #[serde(default)]
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkInfo>,
    #[serde(default)]
    pub block: u64,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub syncing: SyncState,
    #[serde(default)]
    pub peers: u64,
    #[serde(default)]
    pub modules: RpcModules,
    #[serde(default)]
    pub mining: bool,
    #[serde(default)]
    pub is_default: bool,

    #[serde(skip)]
    http_provider: Option<Arc<dyn RpcTransport>>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.record.id)
            .field("name", &self.record.name)
            .field("connected", &self.connected)
            .field("block", &self.block)
            .field("version", &self.version)
            .field("peers", &self.peers)
            .field("mining", &self.mining)
            .finish_non_exhaustive()
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        Self {
            record,
            connected: false,
            network: None,
            block: 0,
            version: String::new(),
            syncing: SyncState::default(),
            peers: 0,
            modules: RpcModules::new(),
            mining: false,
            is_default: false,
            http_provider: None,
        }
    }
}

impl Node {
    /// 从 API 响应构造（遥测字段取默认值）
    pub fn from_payload(payload: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<NodeRecord>(payload).map(Self::from)
    }

    pub fn id(&self) -> Uuid {
        self.record.id
    }

    pub fn set_http_provider(&mut self, provider: Arc<dyn RpcTransport>) {
        self.http_provider = Some(provider);
    }

    pub fn http_provider(&self) -> Option<&Arc<dyn RpcTransport>> {
        self.http_provider.as_ref()
    }

    /// 并发查询节点状态并原地更新
    ///
    /// 七个调用全部结束后逐字段合并：成功则覆盖，失败则保留旧值。
    /// `eth_chainId` 成功时同时置 `connected = true`。
    pub async fn refresh(&mut self) -> Result<&mut Self, NodeError> {
        let provider = self.http_provider.clone().ok_or(NodeError::ProviderRequired)?;
        let p = provider.as_ref();

        let (network, block, version, syncing, peers, modules, mining) = tokio::join!(
            p.request("eth_chainId", json!([])),
            p.request("eth_blockNumber", json!([])),
            p.request("web3_clientVersion", json!([])),
            p.request("eth_syncing", json!([])),
            p.request("net_peerCount", json!([])),
            p.request("rpc_modules", json!([])),
            p.request("eth_mining", json!([])),
        );

        let node_id = self.record.id;

        match network.and_then(|v| rpc_validator::quantity_from_value(&v)) {
            Ok(chain_id) => {
                self.network = Some(NetworkInfo::from_chain_id(chain_id));
                self.connected = true;
            }
            Err(e) => tracing::debug!(node_id = %node_id, error = %e, "eth_chainId failed"),
        }
        match block.and_then(|v| rpc_validator::quantity_from_value(&v)) {
            Ok(block) => self.block = block,
            Err(e) => tracing::debug!(node_id = %node_id, error = %e, "eth_blockNumber failed"),
        }
        match version.and_then(decode::<String>) {
            Ok(version) => self.version = version,
            Err(e) => tracing::debug!(node_id = %node_id, error = %e, "web3_clientVersion failed"),
        }
        match syncing.and_then(decode::<SyncState>) {
            Ok(syncing) => self.syncing = syncing,
            Err(e) => tracing::debug!(node_id = %node_id, error = %e, "eth_syncing failed"),
        }
        match peers.and_then(|v| rpc_validator::quantity_from_value(&v)) {
            Ok(peers) => self.peers = peers,
            Err(e) => tracing::debug!(node_id = %node_id, error = %e, "net_peerCount failed"),
        }
        match modules.and_then(decode::<RpcModules>) {
            Ok(modules) => self.modules = modules,
            Err(e) => tracing::debug!(node_id = %node_id, error = %e, "rpc_modules failed"),
        }
        match mining.and_then(decode::<bool>) {
            Ok(mining) => self.mining = mining,
            Err(e) => tracing::debug!(node_id = %node_id, error = %e, "eth_mining failed"),
        }

        Ok(self)
    }

    /// `eth_coinbase`
    pub async fn coinbase(&self) -> Result<String, NodeError> {
        let provider = self.http_provider.as_ref().ok_or(NodeError::ProviderRequired)?;
        let value = provider.request("eth_coinbase", json!([])).await?;
        let address = decode::<String>(value)?;
        Ok(rpc_validator::validate_address(&address)?)
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::InvalidResponse(e.to_string()))
}
