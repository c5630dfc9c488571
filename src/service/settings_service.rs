//! 全局设置服务
//!
//! 首次启动时写入默认节点与默认设置；PUT 时校验默认节点存在。

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    config::NodeConfig,
    domain::{NodeRecord, Rpc, Setting},
    error::{AppError, ValidationErrors},
    repository::{NodeRepository, SettingsRepository},
    service::node_service::NodeService,
};

pub struct SettingsService {
    settings: Arc<dyn SettingsRepository>,
    nodes: Arc<dyn NodeRepository>,
}

impl SettingsService {
    pub fn new(settings: Arc<dyn SettingsRepository>, nodes: Arc<dyn NodeRepository>) -> Self {
        Self { settings, nodes }
    }

    pub async fn get(&self) -> Result<Option<Setting>> {
        self.settings.get().await
    }

    /// 替换全局设置；非 nil 的默认节点必须存在
    pub async fn update(&self, setting: Setting) -> Result<Setting, AppError> {
        if let Some(id) = setting.default_node_id() {
            if self.nodes.find_by_id(id).await?.is_none() {
                let mut errors = ValidationErrors::new();
                errors.add(
                    "nodeSettings.defaultNodeID",
                    format!("node {} does not exist", id),
                );
                return Err(AppError::validation(errors));
            }
        }

        self.settings.put(&setting).await?;
        tracing::info!(default_node_id = ?setting.default_node_id(), "settings updated");
        Ok(setting)
    }

    /// 设置不存在时创建默认远程节点并写入默认设置；已初始化返回 false
    pub async fn seed_if_empty(&self, node_service: &NodeService, config: &NodeConfig) -> Result<bool> {
        if self.settings.get().await?.is_some() {
            return Ok(false);
        }

        tracing::info!("Seeding default settings...");

        let existing = self
            .nodes
            .find_all()
            .await?
            .into_iter()
            .find(|n| n.name == config.default_node_name || n.rpc.http == config.default_http_rpc);

        let default_node = match existing {
            Some(node) => node,
            None => node_service
                .insert(
                    NodeRecord::new_remote(
                        config.default_node_name.clone(),
                        Rpc {
                            http: config.default_http_rpc.clone(),
                            ws: config.default_ws_rpc.clone(),
                        },
                    ),
                    false,
                )
                .await
                .context("failed to create default node")?,
        };

        self.settings
            .put(&Setting::seeded(default_node.id))
            .await
            .context("failed to store default settings")?;

        tracing::info!(node_id = %default_node.id, "✅ Default settings seeded");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::{
        domain::NodeType,
        infrastructure::rpc_events::RpcEventHub,
        repository::{InMemoryNodeRepository, InMemorySettingsRepository},
        service::{connection_tester::ConnectionTester, node_monitor::NodeStatusCache},
    };

    fn fixture() -> (SettingsService, NodeService) {
        let nodes: Arc<dyn NodeRepository> = Arc::new(InMemoryNodeRepository::new());
        let settings: Arc<dyn SettingsRepository> = Arc::new(InMemorySettingsRepository::new());
        let node_service = NodeService::new(
            nodes.clone(),
            settings.clone(),
            ConnectionTester::new(Duration::from_secs(1)),
            RpcEventHub::new(),
            NodeStatusCache::default(),
        );
        (SettingsService::new(settings, nodes), node_service)
    }

    fn node_config() -> NodeConfig {
        NodeConfig {
            poll_interval_secs: 15,
            rpc_timeout_secs: 5,
            default_node_name: "Ethereum".into(),
            default_http_rpc: "https://main-light.eth.linkpool.io".into(),
            default_ws_rpc: Some("wss://main-light.eth.linkpool.io/ws".into()),
        }
    }

    #[tokio::test]
    async fn test_seed_if_empty() {
        let (svc, nodes) = fixture();
        assert!(svc.seed_if_empty(&nodes, &node_config()).await.unwrap());

        let setting = svc.get().await.unwrap().unwrap();
        let default_id = setting.default_node_id().unwrap();
        let node = nodes.get(default_id).await.unwrap();
        assert_eq!(node.name, "Ethereum");
        assert_eq!(node.node_type, NodeType::RemoteNode);
        assert_eq!(setting.node_settings.supported_nodes.len(), 2);

        // 第二次启动不重复写入
        assert!(!svc.seed_if_empty(&nodes, &node_config()).await.unwrap());
        assert_eq!(nodes.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_default_node() {
        let (svc, _) = fixture();
        let err = svc.update(Setting::seeded(Uuid::new_v4())).await.unwrap_err();
        assert!(err.validation.is_some());

        assert!(svc.update(Setting::seeded(Uuid::nil())).await.is_ok());
    }
}
