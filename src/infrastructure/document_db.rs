//! 文档数据库客户端
//!
//! 通过 HTTP `/sql` 接口执行 SurrealQL，响应为 `[{ time, status, result }]`。

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;

use crate::{config::DocumentDbConfig, domain::endpoint::ENDPOINT_TABLE};

#[derive(Debug, Error)]
pub enum DocumentDbError {
    #[error("document db transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("document db returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode document db response: {0}")]
    Decode(String),
    #[error("no response from document db")]
    EmptyResponse,
    #[error("{0}")]
    Query(String),
}

/// 单条语句的执行结果
#[derive(Debug, Clone, Deserialize)]
pub struct StatementResult<T> {
    #[serde(default)]
    pub time: String,
    pub status: String,
    pub result: Option<T>,
    /// 失败语句的错误描述
    pub detail: Option<String>,
}

impl<T> StatementResult<T> {
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

#[derive(Debug, Clone)]
enum Auth {
    None,
    Basic { user: String, pass: String },
    Bearer(String),
}

#[derive(Debug, Clone)]
pub struct DocumentDb {
    http: reqwest::Client,
    sql_url: String,
    namespace: String,
    database: String,
    auth: Auth,
}

/// `INFO FOR DB;` 的结果（只关心 scope 与 table）
#[derive(Debug, Default, Deserialize)]
struct DbInfo {
    #[serde(default)]
    sc: HashMap<String, Value>,
    #[serde(default)]
    tb: HashMap<String, Value>,
}

const DEFINE_USER_TABLE: &str = r#"
BEGIN TRANSACTION;
DEFINE TABLE user SCHEMAFULL
    PERMISSIONS
        FOR select, update WHERE id = $auth.id,
        FOR create, delete NONE;
DEFINE FIELD user ON user TYPE string ASSERT is::email($value);
DEFINE FIELD pass ON user TYPE string;
DEFINE FIELD tags ON user TYPE array;
DEFINE INDEX idx_user ON user COLUMNS user UNIQUE;
COMMIT TRANSACTION;
"#;

const DEFINE_ALLUSERS_SCOPE: &str = r#"
BEGIN TRANSACTION;
DEFINE SCOPE allusers
    SESSION 14d
    SIGNUP ( CREATE user SET user = string::lowercase(string::trim($user)), pass = crypto::argon2::generate($pass), tags = $tags )
    SIGNIN ( SELECT * FROM user WHERE user = string::lowercase(string::trim($user)) AND crypto::argon2::compare(pass, $pass) );
COMMIT TRANSACTION;
"#;

const DEFINE_ENDPOINT_TABLE: &str = r#"
BEGIN TRANSACTION;
DEFINE TABLE endpoint SCHEMAFULL
    PERMISSIONS
        FOR select, create, update, delete WHERE user = $auth.id;
DEFINE FIELD user ON endpoint TYPE record(user) VALUE $auth.id;
DEFINE FIELD name ON endpoint TYPE string VALUE string::trim($value) ASSERT string::length($value) > 2 AND string::length($value) < 65;
DEFINE FIELD enabled ON endpoint TYPE bool VALUE $value or true;
DEFINE FIELD date_added ON endpoint TYPE datetime VALUE time::now();
DEFINE FIELD rpc_url ON endpoint TYPE string ASSERT $value = /^(http|https|ws|wss):\/\/.+/ AND string::length($value) < 129;
DEFINE FIELD symbol ON endpoint TYPE string ASSERT string::length($value) > 2 AND string::length($value) < 13;
DEFINE FIELD block_explorer_url ON endpoint TYPE string;
DEFINE INDEX idx_endpoint_name ON endpoint COLUMNS user, name UNIQUE;
DEFINE INDEX idx_endpoint_rpc_url ON endpoint COLUMNS user, rpc_url UNIQUE;
COMMIT TRANSACTION;
"#;

impl DocumentDb {
    pub fn new(
        base_url: &str,
        namespace: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            sql_url: format!("{}/sql", base_url.trim_end_matches('/')),
            namespace: namespace.into(),
            database: database.into(),
            auth: Auth::None,
        }
    }

    pub fn from_config(config: &DocumentDbConfig) -> Self {
        let db = Self::new(&config.url, &config.namespace, &config.database);
        match (&config.user, &config.password) {
            (Some(user), Some(pass)) => db.with_basic_auth(user, pass),
            _ => db,
        }
    }

    /// 启动时连接并初始化表结构；未启用时返回 None
    pub async fn connect(config: &DocumentDbConfig) -> Result<Option<Self>, DocumentDbError> {
        if !config.enabled {
            return Ok(None);
        }
        let db = Self::from_config(config);
        db.setup_db().await?;
        Ok(Some(db))
    }

    pub fn with_basic_auth(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.auth = Auth::Basic {
            user: user.into(),
            pass: pass.into(),
        };
        self
    }

    /// 使用登录会话的 token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Bearer(token.into());
        self
    }

    /// 执行 SurrealQL，`vars` 作为查询参数传递（语句中以 `$name` 引用）
    pub async fn query<T: DeserializeOwned>(
        &self,
        sql: &str,
        vars: &[(&str, &str)],
    ) -> Result<Vec<StatementResult<T>>, DocumentDbError> {
        let mut req = self
            .http
            .post(&self.sql_url)
            .query(vars)
            .header("Accept", "application/json")
            .header("NS", &self.namespace)
            .header("DB", &self.database)
            .body(sql.to_owned());

        req = match &self.auth {
            Auth::None => req,
            Auth::Basic { user, pass } => req.header(
                "Authorization",
                format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass))),
            ),
            Auth::Bearer(token) => req.bearer_auth(token),
        };

        let res = req.send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(DocumentDbError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| DocumentDbError::Decode(e.to_string()))
    }

    /// 执行单条语句并返回其结果
    pub async fn query_one<T: DeserializeOwned>(
        &self,
        sql: &str,
        vars: &[(&str, &str)],
    ) -> Result<StatementResult<T>, DocumentDbError> {
        self.query(sql, vars)
            .await?
            .into_iter()
            .next()
            .ok_or(DocumentDbError::EmptyResponse)
    }

    /// 初始化 user 表、allusers scope 与 endpoint 表（已存在则跳过）
    pub async fn setup_db(&self) -> Result<(), DocumentDbError> {
        let info = self
            .query_one::<DbInfo>("INFO FOR DB;", &[])
            .await?
            .result
            .unwrap_or_default();

        if !info.tb.contains_key("user") {
            tracing::info!("creating user table...");
            self.execute(DEFINE_USER_TABLE).await?;
        }
        if !info.sc.contains_key("allusers") {
            tracing::info!("creating allusers scope...");
            self.execute(DEFINE_ALLUSERS_SCOPE).await?;
        }
        if !info.tb.contains_key(ENDPOINT_TABLE) {
            tracing::info!("creating endpoint table...");
            self.execute(DEFINE_ENDPOINT_TABLE).await?;
        }
        Ok(())
    }

    async fn execute(&self, sql: &str) -> Result<(), DocumentDbError> {
        let results = self.query::<Value>(sql, &[]).await?;
        if let Some(failed) = results.iter().find(|r| !r.is_ok()) {
            return Err(DocumentDbError::Query(
                failed
                    .detail
                    .clone()
                    .unwrap_or_else(|| format!("statement failed with status {}", failed.status)),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use serde_json::json;

    use super::*;

    type Seen = Arc<Mutex<Vec<(String, String)>>>;

    async fn spawn_sql(info: Value) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let router = Router::new()
            .route(
                "/sql",
                post(
                    |State((seen, info)): State<(Seen, Value)>, headers: HeaderMap, body: String| async move {
                        let ns = headers
                            .get("NS")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        seen.lock().unwrap().push((ns, body.clone()));
                        if body.starts_with("INFO FOR DB") {
                            Json(json!([{ "time": "1ms", "status": "OK", "result": info }]))
                        } else {
                            Json(json!([{ "time": "1ms", "status": "OK", "result": null }]))
                        }
                    },
                ),
            )
            .with_state((seen.clone(), info));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{}", addr), seen)
    }

    #[tokio::test]
    async fn test_setup_db_creates_missing_definitions() {
        let (url, seen) = spawn_sql(json!({ "sc": {}, "tb": { "user": "DEFINE TABLE user" } })).await;
        let db = DocumentDb::new(&url, "zeth", "zeth").with_basic_auth("root", "root");
        db.setup_db().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|(ns, _)| ns == "zeth"));
        assert!(seen[1].1.contains("DEFINE SCOPE allusers"));
        assert!(seen[2].1.contains("DEFINE TABLE endpoint"));
    }

    #[tokio::test]
    async fn test_setup_db_noop_when_defined() {
        let (url, seen) = spawn_sql(json!({
            "sc": { "allusers": "..." },
            "tb": { "user": "...", "endpoint": "..." }
        }))
        .await;
        DocumentDb::new(&url, "zeth", "zeth").setup_db().await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    fn db_config(url: &str, enabled: bool) -> DocumentDbConfig {
        DocumentDbConfig {
            enabled,
            url: url.to_string(),
            namespace: "zeth".into(),
            database: "zeth".into(),
            user: Some("root".into()),
            password: Some("root".into()),
        }
    }

    #[tokio::test]
    async fn test_connect_runs_setup_when_enabled() {
        let (url, seen) = spawn_sql(json!({ "sc": {}, "tb": {} })).await;

        assert!(DocumentDb::connect(&db_config(&url, false)).await.unwrap().is_none());
        assert!(seen.lock().unwrap().is_empty());

        assert!(DocumentDb::connect(&db_config(&url, true)).await.unwrap().is_some());
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_connect_reports_unreachable_db() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = DocumentDb::connect(&db_config(&url, true)).await.unwrap_err();
        assert!(matches!(err, DocumentDbError::Transport(_)));
    }

    #[derive(Debug, Deserialize)]
    struct Row {
        name: String,
    }

    #[tokio::test]
    async fn test_query_one_decodes_rows_and_missing_result() {
        let (url, _) = spawn_sql(json!({})).await;
        let db = DocumentDb::new(&url, "zeth", "zeth");

        // 非 INFO 语句返回 result: null
        let res = db.query_one::<Vec<Row>>("SELECT * FROM endpoint;", &[]).await.unwrap();
        assert!(res.is_ok());
        assert!(res.result.is_none());

        let failed: StatementResult<Vec<Row>> =
            serde_json::from_value(json!({ "status": "ERR", "detail": "boom" })).unwrap();
        assert!(!failed.is_ok());
        assert!(failed.result.is_none());
        assert_eq!(failed.detail.as_deref(), Some("boom"));

        let ok: StatementResult<Vec<Row>> = serde_json::from_value(json!({
            "time": "1ms",
            "status": "OK",
            "result": [{ "name": "Mainnet" }]
        }))
        .unwrap();
        assert_eq!(ok.result.unwrap()[0].name, "Mainnet");
    }
}
