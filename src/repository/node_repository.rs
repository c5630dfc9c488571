// 节点数据访问 Repository

use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    domain::{NodeRecord, NodeType, Rpc},
    infrastructure::db::PgPool,
};

/// 名称或 HTTP RPC 地址与已有节点冲突（唯一索引 / 内存写锁内检查）
#[derive(Debug, thiserror::Error)]
#[error("a node with the same name or rpc http url already exists")]
pub struct DuplicateNode;

// PostgreSQL unique_violation
const UNIQUE_VIOLATION: &str = "23505";

fn map_write_error(err: sqlx::Error, context: &'static str) -> anyhow::Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return DuplicateNode.into();
        }
    }
    anyhow::Error::new(err).context(context)
}

// ============ Repository Trait ============

#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// 根据 ID 查询节点
    async fn find_by_id(&self, id: Uuid) -> Result<Option<NodeRecord>>;

    /// 所有节点，按添加时间排序
    async fn find_all(&self) -> Result<Vec<NodeRecord>>;

    /// 是否存在同名或相同 HTTP RPC 地址的节点（`exclude` 用于更新时排除自身）
    async fn exists_by_name_or_rpc(
        &self,
        name: &str,
        rpc_http: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool>;

    /// 名称或 RPC 冲突时返回 [`DuplicateNode`]
    async fn insert(&self, node: &NodeRecord) -> Result<()>;

    /// 返回是否命中；名称或 RPC 冲突时返回 [`DuplicateNode`]
    async fn update(&self, node: &NodeRecord) -> Result<bool>;

    /// 返回是否命中
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

// ============ PostgreSQL 实现 ============

#[derive(Debug, FromRow)]
struct NodeRow {
    id: Uuid,
    name: String,
    node_type: i32,
    is_dev: bool,
    enabled: bool,
    date_added: DateTime<Utc>,
    explorer_url: String,
    rpc_http: String,
    rpc_ws: Option<String>,
}

impl TryFrom<NodeRow> for NodeRecord {
    type Error = anyhow::Error;

    fn try_from(row: NodeRow) -> Result<Self> {
        Ok(NodeRecord {
            id: row.id,
            name: row.name,
            node_type: NodeType::try_from(row.node_type).map_err(anyhow::Error::msg)?,
            is_dev: row.is_dev,
            enabled: row.enabled,
            date_added: row.date_added,
            explorer_url: row.explorer_url,
            rpc: Rpc {
                http: row.rpc_http,
                ws: row.rpc_ws,
            },
        })
    }
}

const NODE_COLUMNS: &str =
    "id, name, node_type, is_dev, enabled, date_added, explorer_url, rpc_http, rpc_ws";

pub struct PgNodeRepository {
    pool: PgPool,
}

impl PgNodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NodeRepository for PgNodeRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<NodeRecord>> {
        let row = sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {} FROM nodes WHERE id = $1",
            NODE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query node")?;

        row.map(NodeRecord::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<NodeRecord>> {
        let rows = sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {} FROM nodes ORDER BY date_added ASC, name ASC",
            NODE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list nodes")?;

        rows.into_iter().map(NodeRecord::try_from).collect()
    }

    async fn exists_by_name_or_rpc(
        &self,
        name: &str,
        rpc_http: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM nodes
                WHERE (name = $1 OR rpc_http = $2)
                  AND ($3::UUID IS NULL OR id <> $3)
            )",
        )
        .bind(name)
        .bind(rpc_http)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check node uniqueness")?;

        Ok(exists)
    }

    async fn insert(&self, node: &NodeRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO nodes (id, name, node_type, is_dev, enabled, date_added, explorer_url, rpc_http, rpc_ws)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(node.id)
        .bind(&node.name)
        .bind(i32::from(node.node_type))
        .bind(node.is_dev)
        .bind(node.enabled)
        .bind(node.date_added)
        .bind(&node.explorer_url)
        .bind(&node.rpc.http)
        .bind(&node.rpc.ws)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to insert node"))?;

        Ok(())
    }

    async fn update(&self, node: &NodeRecord) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE nodes
             SET name = $2, is_dev = $3, enabled = $4, explorer_url = $5, rpc_http = $6, rpc_ws = $7
             WHERE id = $1",
        )
        .bind(node.id)
        .bind(&node.name)
        .bind(node.is_dev)
        .bind(node.enabled)
        .bind(&node.explorer_url)
        .bind(&node.rpc.http)
        .bind(&node.rpc.ws)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to update node"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM nodes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete node")?;

        Ok(result.rows_affected() > 0)
    }
}

// ============ 内存实现（测试 / 无数据库启动） ============

#[derive(Default, Clone)]
pub struct InMemoryNodeRepository {
    nodes: Arc<RwLock<HashMap<Uuid, NodeRecord>>>,
}

impl InMemoryNodeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn conflicts(nodes: &HashMap<Uuid, NodeRecord>, node: &NodeRecord) -> bool {
    nodes
        .values()
        .any(|n| n.id != node.id && (n.name == node.name || n.rpc.http == node.rpc.http))
}

#[async_trait]
impl NodeRepository for InMemoryNodeRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<NodeRecord>> {
        Ok(self.nodes.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<NodeRecord>> {
        let mut all: Vec<NodeRecord> = self.nodes.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            a.date_added
                .cmp(&b.date_added)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(all)
    }

    async fn exists_by_name_or_rpc(
        &self,
        name: &str,
        rpc_http: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        Ok(self.nodes.read().await.values().any(|n| {
            Some(n.id) != exclude && (n.name == name || n.rpc.http == rpc_http)
        }))
    }

    async fn insert(&self, node: &NodeRecord) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        if nodes.contains_key(&node.id) {
            anyhow::bail!("node {} already exists", node.id);
        }
        if conflicts(&nodes, node) {
            return Err(DuplicateNode.into());
        }
        nodes.insert(node.id, node.clone());
        Ok(())
    }

    async fn update(&self, node: &NodeRecord) -> Result<bool> {
        let mut nodes = self.nodes.write().await;
        if conflicts(&nodes, node) {
            return Err(DuplicateNode.into());
        }
        match nodes.get_mut(&node.id) {
            Some(existing) => {
                // node_type 与 date_added 不可变
                existing.name = node.name.clone();
                existing.is_dev = node.is_dev;
                existing.enabled = node.enabled;
                existing.explorer_url = node.explorer_url.clone();
                existing.rpc = node.rpc.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.nodes.write().await.remove(&id).is_some())
    }
}
