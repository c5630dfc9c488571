use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorCode {
    // HTTP 基础错误码
    BadRequest,
    NotFound,
    Internal,

    // 业务错误码
    ValidationFailed,
    NodeAlreadyExists,
    NodeConnectionFailed,
    RpcError,
    DatabaseError,
}

impl AppErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            AppErrorCode::BadRequest => "bad_request",
            AppErrorCode::NotFound => "not_found",
            AppErrorCode::Internal => "internal",
            AppErrorCode::ValidationFailed => "validation_failed",
            AppErrorCode::NodeAlreadyExists => "node_already_exists",
            AppErrorCode::NodeConnectionFailed => "node_connection_failed",
            AppErrorCode::RpcError => "rpc_error",
            AppErrorCode::DatabaseError => "database_error",
        }
    }
}

/// 字段级校验错误：字段名 → 错误消息列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// 无错误时返回 Ok
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
    pub status: StatusCode,
    pub trace_id: Option<String>,
    pub validation: Option<ValidationErrors>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    trace_id: Option<&'a str>,
}

#[derive(Serialize)]
struct ValidationBody<'a> {
    #[serde(rename = "validationErrors")]
    validation_errors: &'a ValidationErrors,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(errors) = &self.validation {
            let body = ValidationBody {
                validation_errors: errors,
            };
            return (self.status, Json(body)).into_response();
        }

        let body = ErrorBody {
            code: self.code.as_str(),
            message: &self.message,
            trace_id: self.trace_id.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    fn new(code: AppErrorCode, status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            status,
            trace_id: None,
            validation: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::BadRequest, StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::NotFound, StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            AppErrorCode::Internal,
            StatusCode::INTERNAL_SERVER_ERROR,
            msg,
        )
    }

    /// 字段校验失败，响应体为 `{ "validationErrors": {...} }`
    pub fn validation(errors: ValidationErrors) -> Self {
        let mut err = Self::new(
            AppErrorCode::ValidationFailed,
            StatusCode::BAD_REQUEST,
            "validation failed",
        );
        err.validation = Some(errors);
        err
    }

    pub fn node_already_exists() -> Self {
        Self::new(
            AppErrorCode::NodeAlreadyExists,
            StatusCode::BAD_REQUEST,
            "a node with rpcURL or name already exists",
        )
    }

    pub fn node_connection_failed() -> Self {
        Self::new(
            AppErrorCode::NodeConnectionFailed,
            StatusCode::BAD_REQUEST,
            "failed to connect to node",
        )
    }

    pub fn rpc_error(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::RpcError, StatusCode::BAD_GATEWAY, msg)
    }

    pub fn database_error(msg: impl Into<String>) -> Self {
        Self::new(
            AppErrorCode::DatabaseError,
            StatusCode::INTERNAL_SERVER_ERROR,
            msg,
        )
    }

    /// 设置追踪ID
    pub fn with_trace_id(mut self, trace_id: String) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(errors)
    }
}

// 从 anyhow 错误转换
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{}", err))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_body() {
        let (status, body) =
            body_json(AppError::not_found("node not found").with_trace_id("t-1".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
        assert_eq!(body["message"], "node not found");
        assert_eq!(body["trace_id"], "t-1");
    }

    #[tokio::test]
    async fn test_validation_body() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "name is required");
        errors.add("rpc.http", "rpc.http is required");
        errors.add("rpc.http", "rpc.http must be a valid http(s) URL");

        let (status, body) = body_json(errors.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["validationErrors"]["name"][0], "name is required");
        assert_eq!(body["validationErrors"]["rpc.http"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_validation_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());
        let mut errors = ValidationErrors::new();
        errors.add("name", "name is required");
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_node_errors_are_bad_request() {
        assert_eq!(AppError::node_already_exists().status, StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::node_connection_failed().message,
            "failed to connect to node"
        );
    }

    #[tokio::test]
    async fn test_repository_failures_are_internal() {
        let (status, body) = body_json(anyhow::anyhow!("pool closed").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "internal");

        let (status, body) = body_json(AppError::database_error("node storage unavailable")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "database_error");
    }
}
