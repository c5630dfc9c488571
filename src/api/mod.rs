use std::{sync::Arc, time::Instant};

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{api::middleware::trace_id_middleware, app_state::AppState};

pub mod handlers;
pub mod middleware;
pub mod node_api;
pub mod rpc_proxy_api;
pub mod settings_api;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::api_health,
        handlers::api_version,
        node_api::list_nodes,
        node_api::create_node,
        node_api::get_node,
        node_api::update_node,
        node_api::delete_node,
        node_api::get_node_status,
        settings_api::get_settings,
        settings_api::update_settings,
        rpc_proxy_api::proxy_http,
        rpc_proxy_api::rpc_events_sse,
    ),
    components(
        schemas(
            handlers::HealthResponse,
            handlers::VersionResponse,
            crate::service::node_service::CreateNodeRequest,
            crate::service::node_service::UpdateNodeRequest,
            crate::service::node_service::RpcPayload,
            crate::error_body::ErrorBodyDoc,
            crate::error_body::ValidationErrorBodyDoc,
        )
    ),
    tags(
        (name = "zeth", description = "Node registry, status polling and RPC proxy")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn routes(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::api_health))
        .route("/version", get(handlers::api_version))
        .route("/api/v1/openapi.json", get(openapi_json))
        .nest("/api/v1/nodes/rpc", rpc_proxy_api::routes())
        .nest("/api/v1/nodes", node_api::routes())
        .nest("/api/v1/settings", settings_api::routes());

    let api = match state.config.server.ui_dir.as_deref() {
        Some(dir) => {
            tracing::info!(ui_dir = %dir, "serving static UI");
            api.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
        }
        None => api.fallback(handlers::not_found),
    };

    api.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(from_fn(trace_id_middleware))
            .layer(cors_layer())
            .layer(from_fn(add_response_time_header)),
    )
    .with_state(state)
}

/// `CORS_ALLOW_ORIGINS`：逗号分隔的来源列表，`*` 或未设置时放行所有来源
fn cors_layer() -> CorsLayer {
    let origins = std::env::var("CORS_ALLOW_ORIGINS").unwrap_or_else(|_| "*".into());

    let allow_origin = if origins.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            origins
                .split(',')
                .filter_map(|o| HeaderValue::from_str(o.trim()).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([HeaderName::from_static("x-trace-id")])
}

async fn add_response_time_header(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let mut resp = next.run(req).await;
    let elapsed_ms = start.elapsed().as_millis();
    if let Ok(value) = HeaderValue::from_str(&format!("{}ms", elapsed_ms)) {
        resp.headers_mut().insert("x-response-time", value);
    }
    resp
}
