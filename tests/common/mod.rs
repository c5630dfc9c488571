//! 测试辅助模块
//! 提供模拟 JSON-RPC 节点、模拟文档数据库与内存应用

#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{body::Body, extract::State, http::Request, routing::post, Json, Router};
use serde_json::{json, Value};
use zeth::{api, app_state::AppState, config::Config};

pub const MOCK_CHAIN_ID: &str = "0x1";
pub const MOCK_BLOCK: &str = "0x10";
pub const MOCK_CLIENT_VERSION: &str = "Geth/v1.10.17-stable/linux-amd64/go1.18";
pub const MOCK_COINBASE: &str = "0x00000000219ab540356cbb839cbe05303d7705fa";

/// 模拟节点状态：失败的方法与请求计数
#[derive(Default)]
pub struct MockNode {
    failing: HashSet<&'static str>,
    requests: AtomicUsize,
}

impl MockNode {
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

fn mock_result(method: &str) -> Option<Value> {
    let result = match method {
        "eth_chainId" => json!(MOCK_CHAIN_ID),
        "eth_blockNumber" => json!(MOCK_BLOCK),
        "web3_clientVersion" => json!(MOCK_CLIENT_VERSION),
        "eth_syncing" => json!(false),
        "net_peerCount" => json!("0x5"),
        "rpc_modules" => json!({ "eth": "1.0", "net": "1.0", "web3": "1.0" }),
        "eth_mining" => json!(false),
        "eth_coinbase" => json!(MOCK_COINBASE),
        _ => return None,
    };
    Some(result)
}

async fn rpc_handler(State(node): State<Arc<MockNode>>, Json(req): Json<Value>) -> Json<Value> {
    node.requests.fetch_add(1, Ordering::SeqCst);
    let id = req.get("id").cloned().unwrap_or(Value::Null);
    let method = req.get("method").and_then(Value::as_str).unwrap_or_default();

    let result = if node.failing.contains(method) {
        None
    } else {
        mock_result(method)
    };

    Json(match result {
        Some(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        None => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": format!("the method {} does not exist", method) }
        }),
    })
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// 启动模拟 JSON-RPC 节点，`failing` 中的方法返回 JSON-RPC 错误
pub async fn spawn_rpc_node(failing: &[&'static str]) -> (String, Arc<MockNode>) {
    let node = Arc::new(MockNode {
        failing: failing.iter().copied().collect(),
        requests: AtomicUsize::new(0),
    });
    let router = Router::new()
        .route("/", post(rpc_handler))
        .with_state(node.clone());
    (serve(router).await, node)
}

/// 启动模拟文档数据库，`/sql` 固定返回 `response`
pub async fn spawn_document_db(response: Value) -> String {
    let router = Router::new().route(
        "/sql",
        post(move || {
            let response = response.clone();
            async move { Json(response) }
        }),
    );
    serve(router).await
}

/// 没有监听者的本地地址
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// 测试配置：短超时，无静态目录
pub fn test_config() -> Config {
    let mut config = Config::from_env().unwrap();
    config.server.ui_dir = None;
    config.node.poll_interval_secs = 1;
    config.node.rpc_timeout_secs = 2;
    config.node.default_node_name = "Default".into();
    config.node.default_http_rpc = "http://127.0.0.1:8545".into();
    config.node.default_ws_rpc = None;
    config
}

/// 创建内存存储的测试应用状态
pub fn create_test_app_state() -> Arc<AppState> {
    Arc::new(AppState::in_memory(Arc::new(test_config())))
}

pub fn create_test_app(state: Arc<AppState>) -> Router {
    api::routes(state)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(res: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// 测试数据库URL
pub fn test_database_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://postgres@localhost:5432/zeth_test".into())
}

/// 创建测试数据库连接池并执行迁移
pub async fn create_test_pool() -> zeth::infrastructure::db::PgPool {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_database_url())
        .await
        .expect("Failed to create test database pool");
    zeth::infrastructure::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
