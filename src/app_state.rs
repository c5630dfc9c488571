use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    infrastructure::{db::PgPool, rpc_events::RpcEventHub},
    repository::{
        InMemoryNodeRepository, InMemorySettingsRepository, NodeRepository, PgNodeRepository,
        PgSettingsRepository, SettingsRepository,
    },
    service::{ConnectionTester, NodeMonitor, NodeService, NodeStatusCache, SettingsService},
};

/// 应用状态
/// 包含所有共享资源
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub node_service: Arc<NodeService>,
    pub settings_service: Arc<SettingsService>,
    pub monitor: Arc<NodeMonitor>,
    pub events: RpcEventHub,
    pub statuses: NodeStatusCache,
    /// RPC 代理使用的上游客户端
    pub http: reqwest::Client,
}

impl AppState {
    /// 使用 Postgres 存储
    pub fn from_pool(pool: PgPool, config: Arc<Config>) -> Self {
        Self::with_repositories(
            Arc::new(PgNodeRepository::new(pool.clone())),
            Arc::new(PgSettingsRepository::new(pool)),
            config,
        )
    }

    /// 使用进程内存储（测试与 `--memory` 启动）
    pub fn in_memory(config: Arc<Config>) -> Self {
        Self::with_repositories(
            Arc::new(InMemoryNodeRepository::new()),
            Arc::new(InMemorySettingsRepository::new()),
            config,
        )
    }

    pub fn with_repositories(
        nodes: Arc<dyn NodeRepository>,
        settings: Arc<dyn SettingsRepository>,
        config: Arc<Config>,
    ) -> Self {
        let rpc_timeout = Duration::from_secs(config.node.rpc_timeout_secs.max(1));
        let poll_interval = Duration::from_secs(config.node.poll_interval_secs.max(1));

        let events = RpcEventHub::new();
        let statuses = NodeStatusCache::default();

        let node_service = Arc::new(NodeService::new(
            nodes.clone(),
            settings.clone(),
            ConnectionTester::new(rpc_timeout),
            events.clone(),
            statuses.clone(),
        ));
        let settings_service = Arc::new(SettingsService::new(settings.clone(), nodes.clone()));
        let monitor = Arc::new(NodeMonitor::new(
            nodes,
            settings,
            statuses.clone(),
            poll_interval,
            rpc_timeout,
        ));

        let http = reqwest::Client::builder()
            .timeout(rpc_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            node_service,
            settings_service,
            monitor,
            events,
            statuses,
            http,
        }
    }

    /// 首次启动写入默认节点与设置
    pub async fn seed(&self) -> anyhow::Result<bool> {
        self.settings_service
            .seed_if_empty(&self.node_service, &self.config.node)
            .await
    }
}
