//! 全局设置 API

use std::sync::Arc;

use axum::{extract::State, routing::get, Extension, Json, Router};

use crate::{api::middleware::TraceId, app_state::AppState, domain::Setting, error::AppError};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

#[utoipa::path(
    get,
    path = "/api/v1/settings",
    responses(
        (status = 200, description = "Global settings { nodeSettings: { supportedNodes, defaultNodeID } }"),
        (status = 404, description = "Settings not initialised", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn get_settings(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
) -> Result<Json<Setting>, AppError> {
    st.settings_service
        .get()
        .await
        .map_err(|e| trace_id.attach(e))?
        .map(Json)
        .ok_or_else(|| trace_id.attach(AppError::not_found("settings not initialised")))
}

#[utoipa::path(
    put,
    path = "/api/v1/settings",
    responses(
        (status = 200, description = "Stored settings"),
        (status = 400, description = "Default node does not exist", body = crate::error_body::ValidationErrorBodyDoc)
    )
)]
pub async fn update_settings(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Json(setting): Json<Setting>,
) -> Result<Json<Setting>, AppError> {
    let stored = st
        .settings_service
        .update(setting)
        .await
        .map_err(|e| trace_id.attach(e))?;
    Ok(Json(stored))
}
