//! Zeth - 以太坊兼容节点 RPC 管理后端
//!
//! 节点登记、状态轮询、RPC 代理，以及仪表盘客户端状态层

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod error_body;
pub mod infrastructure;
pub mod repository;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{AppError, AppErrorCode};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        domain::{Node, NodeRecord, Rpc, Setting},
        error::{AppError, AppErrorCode},
    };
}
