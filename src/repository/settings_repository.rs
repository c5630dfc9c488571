// 全局设置 Repository（单文档）

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::types::Json;
use tokio::sync::RwLock;

use crate::{domain::Setting, infrastructure::db::PgPool};

const SETTINGS_KEY: &str = "settings";

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// 未初始化时返回 None
    async fn get(&self) -> Result<Option<Setting>>;

    async fn put(&self, setting: &Setting) -> Result<()>;
}

pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn get(&self) -> Result<Option<Setting>> {
        let row: Option<(Json<Setting>,)> =
            sqlx::query_as("SELECT value FROM settings WHERE key = $1")
                .bind(SETTINGS_KEY)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to load settings")?;

        Ok(row.map(|(Json(setting),)| setting))
    }

    async fn put(&self, setting: &Setting) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, now())
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(SETTINGS_KEY)
        .bind(Json(setting))
        .execute(&self.pool)
        .await
        .context("Failed to store settings")?;

        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemorySettingsRepository {
    setting: Arc<RwLock<Option<Setting>>>,
}

impl InMemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn get(&self) -> Result<Option<Setting>> {
        Ok(self.setting.read().await.clone())
    }

    async fn put(&self, setting: &Setting) -> Result<()> {
        *self.setting.write().await = Some(setting.clone());
        Ok(())
    }
}
