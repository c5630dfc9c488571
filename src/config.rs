//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub document_db: DocumentDbConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// 静态前端目录（可选）
    #[serde(default)]
    pub ui_dir: Option<String>,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

/// 节点轮询与默认节点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub poll_interval_secs: u64,
    pub rpc_timeout_secs: u64,
    pub default_node_name: String,
    pub default_http_rpc: String,
    pub default_ws_rpc: Option<String>,
}

/// 文档数据库（SurrealDB 风格 /sql 接口）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDbConfig {
    /// 启动时初始化表结构；未设置时由 `SURREAL_URL` 是否存在决定
    #[serde(default)]
    pub enabled: bool,
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:7000".into()),
            ui_dir: std::env::var("UI_DIR").ok().filter(|s| !s.is_empty()),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://postgres@localhost:5432/zeth".into()),
            max_connections: env_or("DB_MAX_CONNS", 16),
            min_connections: env_or("DB_MIN_CONNS", 2),
            acquire_timeout_secs: env_or("DB_ACQ_TIMEOUT_SECS", 5),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            enable_file_logging: std::env::var("LOG_FILE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: env_or("NODE_POLL_INTERVAL_SECS", 15),
            rpc_timeout_secs: env_or("RPC_TIMEOUT_SECS", 10),
            default_node_name: std::env::var("DEFAULT_NODE_NAME")
                .unwrap_or_else(|_| "Ethereum".into()),
            default_http_rpc: std::env::var("DEFAULT_NODE_HTTP_RPC")
                .unwrap_or_else(|_| "http://localhost:8545".into()),
            default_ws_rpc: std::env::var("DEFAULT_NODE_WS_RPC")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}

impl Default for DocumentDbConfig {
    fn default() -> Self {
        Self {
            enabled: std::env::var("SURREAL_URL").is_ok(),
            url: std::env::var("SURREAL_URL").unwrap_or_else(|_| "http://localhost:8000".into()),
            namespace: std::env::var("SURREAL_NS").unwrap_or_else(|_| "zeth".into()),
            database: std::env::var("SURREAL_DB").unwrap_or_else(|_| "zeth".into()),
            user: std::env::var("SURREAL_USER").ok(),
            password: std::env::var("SURREAL_PASS").ok(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            node: NodeConfig::default(),
            document_db: DocumentDbConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        if let Some(path) = path {
            if path.as_ref().exists() {
                return Self::from_file(path);
            }
        }
        Self::from_env()
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if !self.database.url.starts_with("postgres://")
            && !self.database.url.starts_with("postgresql://")
        {
            anyhow::bail!("DATABASE_URL must start with postgres:// or postgresql://");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        if !self.node.default_http_rpc.starts_with("http://")
            && !self.node.default_http_rpc.starts_with("https://")
        {
            anyhow::bail!("DEFAULT_NODE_HTTP_RPC must be an http(s) URL");
        }
        if let Some(ws) = &self.node.default_ws_rpc {
            if !ws.starts_with("ws://") && !ws.starts_with("wss://") {
                anyhow::bail!("DEFAULT_NODE_WS_RPC must be a ws(s) URL");
            }
        }

        if self.node.poll_interval_secs == 0 {
            anyhow::bail!("NODE_POLL_INTERVAL_SECS must be greater than 0");
        }

        Ok(())
    }
}
