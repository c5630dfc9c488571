//! OpenAPI 文档用的错误响应结构

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

/// 普通错误：`{ code, message, trace_id }`
#[derive(Serialize, ToSchema)]
pub struct ErrorBodyDoc {
    pub code: String,
    pub message: String,
    pub trace_id: Option<String>,
}

/// 校验错误：`{ validationErrors: { field: [messages] } }`
#[derive(Serialize, ToSchema)]
pub struct ValidationErrorBodyDoc {
    #[serde(rename = "validationErrors")]
    pub validation_errors: BTreeMap<String, Vec<String>>,
}
