//! 钱包 provider 状态
//!
//! 连接标记保存在 `WEB3_CONNECT_CACHED_PROVIDER`；存在标记时构造即自动连接。

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::watch;

use super::{
    storage::{LocalStorage, StoreError},
    store::Store,
};
use crate::infrastructure::{
    rpc_client::{HttpRpcClient, RpcError, RpcTransport},
    rpc_validator,
};

pub const WALLET_CONNECTION_KEY: &str = "WEB3_CONNECT_CACHED_PROVIDER";

/// 钱包连接器：负责拿到一个可发 JSON-RPC 请求的 provider
#[async_trait]
pub trait WalletConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn RpcTransport>, RpcError>;

    /// 连接器自身缓存的 provider 选择
    fn clear_cached_provider(&self) {}

    /// 写入连接标记时使用的值
    fn cache_value(&self) -> &str {
        "\"injected\""
    }
}

/// 直接连到一个 HTTP JSON-RPC 地址的连接器
#[derive(Debug, Clone)]
pub struct RpcWalletConnector {
    url: String,
    timeout: Duration,
}

impl RpcWalletConnector {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl WalletConnector for RpcWalletConnector {
    async fn connect(&self) -> Result<Arc<dyn RpcTransport>, RpcError> {
        let client = HttpRpcClient::new(self.url.clone(), self.timeout);
        // 确认地址可达
        client.request("eth_chainId", json!([])).await?;
        Ok(Arc::new(client))
    }
}

/// 已连接的钱包
#[derive(Debug, Clone)]
pub struct WalletProvider {
    pub transport: Arc<dyn RpcTransport>,
    pub accounts: Vec<String>,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct WalletState {
    pub provider: Option<WalletProvider>,
}

pub struct WalletProviderStore {
    storage: Arc<dyn LocalStorage>,
    connector: Arc<dyn WalletConnector>,
    store: Store<WalletState>,
}

impl WalletProviderStore {
    /// 构造；本地存在连接标记时自动连接
    pub async fn new(storage: Arc<dyn LocalStorage>, connector: Arc<dyn WalletConnector>) -> Self {
        let this = Self {
            storage,
            connector,
            store: Store::default(),
        };
        if this.storage.get_item(WALLET_CONNECTION_KEY).is_some() {
            this.connect().await;
        }
        this
    }

    pub fn get(&self) -> Arc<WalletState> {
        self.store.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<WalletState>> {
        self.store.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.store.get().provider.is_some()
    }

    /// 连接钱包；失败时告警并断开，返回是否连接成功
    pub async fn connect(&self) -> bool {
        let provider = match self.try_connect().await {
            Ok(provider) => provider,
            Err(e) => {
                tracing::warn!(error = %e, "could not get a wallet connection; disconnecting...");
                self.disconnect();
                return false;
            }
        };

        tracing::info!(
            accounts = ?provider.accounts,
            chain_id = provider.chain_id,
            "wallet connected"
        );

        if let Err(e) = self
            .storage
            .set_item(WALLET_CONNECTION_KEY, self.connector.cache_value())
        {
            tracing::warn!(error = %e, "failed to persist wallet connection flag");
        }
        self.store.set(WalletState {
            provider: Some(provider),
        });
        true
    }

    /// 清除连接标记并重置状态
    pub fn disconnect(&self) {
        self.connector.clear_cached_provider();
        if let Err(e) = self.storage.remove_item(WALLET_CONNECTION_KEY) {
            tracing::warn!(error = %e, "failed to clear wallet connection flag");
        }
        self.store.set(WalletState::default());
    }

    async fn try_connect(&self) -> Result<WalletProvider, StoreError> {
        let transport = self.connector.connect().await?;

        let accounts = match transport.request("eth_requestAccounts", json!([])).await {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::debug!(error = %e, "eth_requestAccounts unavailable, using eth_accounts");
                transport.request("eth_accounts", json!([])).await?
            }
        };
        let accounts: Vec<String> = serde_json::from_value(accounts)?;

        let chain_id = transport.request("eth_chainId", json!([])).await?;
        let chain_id = rpc_validator::quantity_from_value(&chain_id)?;

        Ok(WalletProvider {
            transport,
            accounts,
            chain_id,
        })
    }
}
