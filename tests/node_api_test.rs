//! 节点与设置 API 集成测试（内存存储）

mod common;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use common::*;

fn node_body(name: &str, http: &str) -> serde_json::Value {
    json!({
        "name": name,
        "explorerUrl": "https://etherscan.io",
        "rpc": { "http": http, "ws": "" },
    })
}

#[tokio::test]
async fn test_health_and_version() {
    let app = create_test_app(create_test_app_state());

    let res = app.clone().oneshot(empty_request("GET", "/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "healthy");

    let res = app.oneshot(empty_request("GET", "/version")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_unknown_route_returns_404_with_trace_id() {
    let app = create_test_app(create_test_app_state());

    let res = app
        .oneshot(empty_request("GET", "/does/not/exist"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.headers().contains_key("x-trace-id"));
    assert_eq!(body_json(res).await["code"], "not_found");
}

#[tokio::test]
async fn test_node_crud_lifecycle() {
    let app = create_test_app(create_test_app_state());

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/nodes",
            node_body("Mainnet", "https://rpc.example.org"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let created = body_json(res).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], "Mainnet");
    assert_eq!(created["nodeType"], 3);
    assert_eq!(created["enabled"], true);
    assert!(created["rpc"].get("ws").is_none());

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/nodes"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let list = body_json(res).await;
    assert_eq!(list["nodes"].as_array().unwrap().len(), 1);

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/nodes/{}", id),
            json!({
                "name": "Mainnet (archive)",
                "rpc": { "http": "https://archive.example.org", "ws": "wss://archive.example.org/ws" },
                "enabled": false,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated = body_json(res).await;
    assert_eq!(updated["name"], "Mainnet (archive)");
    assert_eq!(updated["enabled"], false);
    assert_eq!(updated["rpc"]["ws"], "wss://archive.example.org/ws");

    let res = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/v1/nodes/{}", id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["rpc"]["http"], "https://archive.example.org");

    let res = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/v1/nodes/{}", id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app
        .oneshot(empty_request("GET", &format!("/api/v1/nodes/{}", id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_node_validation_errors() {
    let app = create_test_app(create_test_app_state());

    let res = app
        .oneshot(json_request(
            "POST",
            "/api/v1/nodes",
            json!({ "name": " ", "rpc": { "http": "ftp://node", "ws": "http://node" } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = body_json(res).await;
    let errors = &body["validationErrors"];
    assert!(errors["name"].is_array());
    assert!(errors["rpc.http"].is_array());
    assert!(errors["rpc.ws"].is_array());
}

#[tokio::test]
async fn test_duplicate_node_rejected() {
    let app = create_test_app(create_test_app_state());

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/nodes",
            node_body("Sepolia", "https://sepolia.example.org"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // 同名
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/nodes",
            node_body("Sepolia", "https://other.example.org"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["code"], "node_already_exists");

    // 同 RPC 地址
    let res = app
        .oneshot(json_request(
            "POST",
            "/api/v1/nodes",
            node_body("Another", "https://sepolia.example.org"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["code"], "node_already_exists");
}

#[tokio::test]
async fn test_create_node_with_connection_test() {
    let (rpc_url, mock) = spawn_rpc_node(&[]).await;
    let app = create_test_app(create_test_app_state());

    let mut body = node_body("Local", &rpc_url);
    body["test"] = json!(true);
    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/nodes", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(mock.request_count(), 1);

    let mut body = node_body("Unreachable", &dead_url().await);
    body["test"] = json!(true);
    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/nodes", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["code"], "node_connection_failed");

    // 连接失败的节点不应被保存
    let res = app
        .oneshot(empty_request("GET", "/api/v1/nodes"))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["nodes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_and_unknown_ids() {
    let app = create_test_app(create_test_app_state());

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/nodes/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["code"], "bad_request");

    let unknown = Uuid::new_v4();
    let res = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/v1/nodes/{}", unknown)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .oneshot(empty_request("GET", &format!("/api/v1/nodes/{}/status", unknown)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trace_id_is_propagated_into_error_body() {
    let app = create_test_app(create_test_app_state());

    let mut req = empty_request("GET", &format!("/api/v1/nodes/{}", Uuid::new_v4()));
    req.headers_mut()
        .insert("X-Trace-Id", "trace-abc-123".parse().unwrap());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers().get("x-trace-id").unwrap(), "trace-abc-123");
    assert_eq!(body_json(res).await["trace_id"], "trace-abc-123");
}

#[tokio::test]
async fn test_settings_seed_get_and_update() {
    let state = create_test_app_state();
    let app = create_test_app(state.clone());

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/settings"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    assert!(state.seed().await.unwrap());
    assert!(!state.seed().await.unwrap());

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/settings"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let mut settings = body_json(res).await;
    let default_id = settings["nodeSettings"]["defaultNodeID"]
        .as_str()
        .unwrap()
        .to_string();

    let res = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/v1/nodes/{}", default_id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["name"], "Default");

    // 默认节点必须存在
    settings["nodeSettings"]["defaultNodeID"] = json!(Uuid::new_v4().to_string());
    let res = app
        .clone()
        .oneshot(json_request("PUT", "/api/v1/settings", settings.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(res).await["validationErrors"]["nodeSettings.defaultNodeID"].is_array());

    // nil 表示清除默认节点
    settings["nodeSettings"]["defaultNodeID"] = json!(Uuid::nil().to_string());
    let res = app
        .oneshot(json_request("PUT", "/api/v1/settings", settings))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await["nodeSettings"]["defaultNodeID"],
        Uuid::nil().to_string()
    );
}

#[tokio::test]
async fn test_deleting_default_node_clears_default_setting() {
    let state = create_test_app_state();
    let app = create_test_app(state.clone());
    assert!(state.seed().await.unwrap());

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/settings"))
        .await
        .unwrap();
    let default_id = body_json(res).await["nodeSettings"]["defaultNodeID"]
        .as_str()
        .unwrap()
        .to_string();

    let res = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/v1/nodes/{}", default_id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/settings"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let settings = body_json(res).await;
    assert_eq!(
        settings["nodeSettings"]["defaultNodeID"],
        Uuid::nil().to_string()
    );

    // 清除后的设置可原样写回
    let res = app
        .oneshot(json_request("PUT", "/api/v1/settings", settings))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_openapi_document_lists_node_paths() {
    let app = create_test_app(create_test_app_state());

    let res = app
        .oneshot(empty_request("GET", "/api/v1/openapi.json"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let doc = body_json(res).await;
    assert!(doc["paths"]["/api/v1/nodes"].is_object());
    assert!(doc["paths"]["/api/v1/nodes/rpc/{id}"].is_object());
}
