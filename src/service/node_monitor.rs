// 节点状态监控 - 后台轮询
// 定期对所有启用的节点执行 Node::refresh，缓存每个节点最近一次的遥测快照

use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::{sync::RwLock, time::interval};
use uuid::Uuid;

use crate::{
    domain::{Node, NodeRecord},
    infrastructure::rpc_client::HttpRpcClient,
    repository::{NodeRepository, SettingsRepository},
};

/// 单个节点的最近状态
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    #[serde(flatten)]
    pub node: Node,
    pub refreshed_at: DateTime<Utc>,
}

/// 节点 id → 最近状态
#[derive(Clone, Default)]
pub struct NodeStatusCache {
    inner: Arc<RwLock<HashMap<Uuid, NodeStatus>>>,
}

impl NodeStatusCache {
    pub async fn get(&self, id: Uuid) -> Option<NodeStatus> {
        self.inner.read().await.get(&id).cloned()
    }

    pub async fn insert(&self, status: NodeStatus) {
        self.inner.write().await.insert(status.node.id(), status);
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.inner.write().await.remove(&id).is_some()
    }

    /// 只保留 `ids` 中的节点
    pub async fn retain(&self, ids: &[Uuid]) {
        self.inner.write().await.retain(|id, _| ids.contains(id));
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

pub struct NodeMonitor {
    nodes: Arc<dyn NodeRepository>,
    settings: Arc<dyn SettingsRepository>,
    cache: NodeStatusCache,
    http: reqwest::Client,
    poll_interval: Duration,
}

impl NodeMonitor {
    pub fn new(
        nodes: Arc<dyn NodeRepository>,
        settings: Arc<dyn SettingsRepository>,
        cache: NodeStatusCache,
        poll_interval: Duration,
        rpc_timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(rpc_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            nodes,
            settings,
            cache,
            http,
            poll_interval,
        }
    }

    pub fn cache(&self) -> &NodeStatusCache {
        &self.cache
    }

    /// 启动后台监控任务（持续运行）
    pub async fn start_background_monitor(self: Arc<Self>) {
        let mut ticker = interval(self.poll_interval);

        tracing::info!(
            "Node monitor started, interval={}s",
            self.poll_interval.as_secs()
        );

        loop {
            ticker.tick().await;

            match self.poll_once().await {
                Ok(refreshed) => {
                    tracing::debug!(count = refreshed, "Refreshed node statuses");
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Failed to refresh node statuses");
                }
            }
        }
    }

    /// 刷新一轮，返回刷新的节点数
    pub async fn poll_once(&self) -> Result<usize> {
        let records: Vec<NodeRecord> = self
            .nodes
            .find_all()
            .await?
            .into_iter()
            .filter(|n| n.enabled)
            .collect();

        let default_id = self
            .settings
            .get()
            .await?
            .and_then(|s| s.default_node_id());

        let statuses = join_all(
            records
                .into_iter()
                .map(|record| self.refresh_record(record, default_id)),
        )
        .await;

        let ids: Vec<Uuid> = statuses.iter().map(|s| s.node.id()).collect();
        self.cache.retain(&ids).await;
        for status in statuses {
            self.cache.insert(status).await;
        }

        Ok(ids.len())
    }

    async fn refresh_record(&self, record: NodeRecord, default_id: Option<Uuid>) -> NodeStatus {
        // 保留上一轮成功的字段
        let mut node = match self.cache.get(record.id).await {
            Some(previous) => {
                let mut node = previous.node;
                node.record = record;
                node
            }
            None => Node::from(record),
        };

        node.is_default = default_id == Some(node.id());
        node.set_http_provider(Arc::new(HttpRpcClient::with_client(
            self.http.clone(),
            node.record.rpc.http.clone(),
        )));

        if let Err(e) = node.refresh().await {
            tracing::warn!(node_id = %node.id(), error = %e, "node refresh failed");
        }

        NodeStatus {
            node,
            refreshed_at: Utc::now(),
        }
    }
}
