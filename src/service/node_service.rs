//! 节点管理服务
//!
//! 创建 / 查询 / 更新 / 删除节点；负责字段校验、唯一性检查与可选的连接测试。

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{NodeRecord, Rpc},
    error::{AppError, ValidationErrors},
    infrastructure::rpc_events::RpcEventHub,
    repository::{DuplicateNode, NodeRepository, SettingsRepository},
    service::{
        connection_tester::{ConnectionError, ConnectionTester},
        node_monitor::NodeStatusCache,
    },
};

#[derive(Debug, Error)]
pub enum NodeServiceError {
    #[error("validation failed")]
    Validation(ValidationErrors),
    #[error("a node with rpcURL or name already exists")]
    AlreadyExists,
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("node not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

impl NodeServiceError {
    /// 写入时唯一索引冲突视为重复节点
    fn from_write(err: anyhow::Error) -> Self {
        if err.downcast_ref::<DuplicateNode>().is_some() {
            Self::AlreadyExists
        } else {
            Self::Repository(err)
        }
    }
}

impl From<NodeServiceError> for AppError {
    fn from(err: NodeServiceError) -> Self {
        match err {
            NodeServiceError::Validation(errors) => AppError::validation(errors),
            NodeServiceError::AlreadyExists => AppError::node_already_exists(),
            NodeServiceError::Connection(_) => AppError::node_connection_failed(),
            NodeServiceError::NotFound(id) => AppError::not_found(format!("node not found: {}", id)),
            NodeServiceError::Repository(e) => {
                tracing::error!(error = ?e, "node repository failure");
                AppError::database_error("node storage unavailable")
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RpcPayload {
    #[serde(default)]
    pub http: String,
    #[serde(default)]
    pub ws: Option<String>,
}

/// `POST /api/v1/nodes` 请求体
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub explorer_url: String,
    #[serde(default)]
    pub rpc: RpcPayload,
    #[serde(default)]
    pub is_dev: bool,
    /// 保存前测试连接
    #[serde(default)]
    pub test: bool,
}

/// `PUT /api/v1/nodes/:id` 请求体
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub explorer_url: String,
    #[serde(default)]
    pub rpc: RpcPayload,
    #[serde(default)]
    pub is_dev: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub test: bool,
}

fn default_true() -> bool {
    true
}

fn has_scheme(url: &str, schemes: &[&str]) -> bool {
    match reqwest::Url::parse(url) {
        Ok(parsed) => schemes.contains(&parsed.scheme()) && parsed.has_host(),
        Err(_) => false,
    }
}

/// 校验名称与 RPC 地址，返回规范化后的 Rpc（空 ws 视为未设置）
fn validate_node_fields(name: &str, rpc: &RpcPayload) -> Result<Rpc, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if name.trim().is_empty() {
        errors.add("name", "name is required");
    }

    let http = rpc.http.trim();
    if http.is_empty() {
        errors.add("rpc.http", "rpc.http is required");
    } else if !has_scheme(http, &["http", "https"]) {
        errors.add("rpc.http", "rpc.http must be a valid http(s) URL");
    }

    let ws = rpc
        .ws
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(ws) = ws {
        if !has_scheme(ws, &["ws", "wss"]) {
            errors.add("rpc.ws", "rpc.ws must be a valid ws(s) URL");
        }
    }

    errors.into_result()?;
    Ok(Rpc {
        http: http.to_string(),
        ws: ws.map(str::to_string),
    })
}

pub struct NodeService {
    repo: Arc<dyn NodeRepository>,
    settings: Arc<dyn SettingsRepository>,
    tester: ConnectionTester,
    events: RpcEventHub,
    statuses: NodeStatusCache,
}

impl NodeService {
    pub fn new(
        repo: Arc<dyn NodeRepository>,
        settings: Arc<dyn SettingsRepository>,
        tester: ConnectionTester,
        events: RpcEventHub,
        statuses: NodeStatusCache,
    ) -> Self {
        Self {
            repo,
            settings,
            tester,
            events,
            statuses,
        }
    }

    pub async fn create(&self, req: CreateNodeRequest) -> Result<NodeRecord, NodeServiceError> {
        let rpc = validate_node_fields(&req.name, &req.rpc).map_err(NodeServiceError::Validation)?;

        let mut record = NodeRecord::new_remote(req.name.trim(), rpc);
        record.is_dev = req.is_dev;
        record.explorer_url = req.explorer_url.trim().to_string();

        self.insert(record, req.test).await
    }

    /// 写入节点记录（种子数据也走这里）
    pub async fn insert(
        &self,
        record: NodeRecord,
        test_connection: bool,
    ) -> Result<NodeRecord, NodeServiceError> {
        if self
            .repo
            .exists_by_name_or_rpc(&record.name, &record.rpc.http, None)
            .await?
        {
            return Err(NodeServiceError::AlreadyExists);
        }

        if test_connection {
            self.tester.test(&record.rpc.http).await?;
        }

        self.repo
            .insert(&record)
            .await
            .map_err(NodeServiceError::from_write)?;
        tracing::info!(node_id = %record.id, name = %record.name, "node created");
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<NodeRecord, NodeServiceError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(NodeServiceError::NotFound(id))
    }

    pub async fn get_all(&self) -> Result<Vec<NodeRecord>, NodeServiceError> {
        Ok(self.repo.find_all().await?)
    }

    pub async fn update(
        &self,
        id: Uuid,
        req: UpdateNodeRequest,
    ) -> Result<NodeRecord, NodeServiceError> {
        let rpc = validate_node_fields(&req.name, &req.rpc).map_err(NodeServiceError::Validation)?;
        let mut record = self.get(id).await?;

        let name = req.name.trim();
        if self
            .repo
            .exists_by_name_or_rpc(name, &rpc.http, Some(id))
            .await?
        {
            return Err(NodeServiceError::AlreadyExists);
        }

        if req.test {
            self.tester.test(&rpc.http).await?;
        }

        record.name = name.to_string();
        record.explorer_url = req.explorer_url.trim().to_string();
        record.is_dev = req.is_dev;
        record.enabled = req.enabled;
        record.rpc = rpc;

        if !self
            .repo
            .update(&record)
            .await
            .map_err(NodeServiceError::from_write)?
        {
            return Err(NodeServiceError::NotFound(id));
        }
        tracing::info!(node_id = %id, "node updated");
        Ok(record)
    }

    /// 删除节点，同时清除其缓存状态与 RPC 事件通道；若为默认节点则将默认节点置为 nil
    pub async fn delete(&self, id: Uuid) -> Result<(), NodeServiceError> {
        if !self.repo.delete(id).await? {
            return Err(NodeServiceError::NotFound(id));
        }
        self.statuses.remove(id).await;
        self.events.remove(id).await;

        if let Some(mut setting) = self.settings.get().await? {
            if setting.default_node_id() == Some(id) {
                setting.node_settings.default_node_id = Uuid::nil();
                self.settings.put(&setting).await?;
                tracing::info!(node_id = %id, "default node deleted, default cleared");
            }
        }

        tracing::info!(node_id = %id, "node deleted");
        Ok(())
    }
}
