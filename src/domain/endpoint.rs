//! 文档数据库中的仪表盘端点记录

use serde::{Deserialize, Serialize};

pub const ENDPOINT_TABLE: &str = "endpoint";

/// 端点协议类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointType {
    Http,
    Ws,
}

impl EndpointType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Ws => "ws",
        }
    }
}

/// 以 `http` 开头（含 https）为 HTTP，其余一律视为 WebSocket
pub fn endpoint_type(rpc_url: &str) -> EndpointType {
    if rpc_url.starts_with("http") {
        EndpointType::Http
    } else {
        EndpointType::Ws
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    pub rpc_url: String,
    #[serde(rename = "type")]
    pub endpoint_type: EndpointType,
    pub user: String,
    pub symbol: String,
    pub date_added: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_explorer_url: Option<String>,
}
