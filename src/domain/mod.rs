//! 领域模型：节点、网络常量、全局设置、文档数据库端点

pub mod endpoint;
pub mod network;
pub mod node;
pub mod settings;

pub use endpoint::{endpoint_type, Endpoint, EndpointType};
pub use network::{NetworkId, NetworkInfo, NodeType};
pub use node::{Node, NodeError, NodeRecord, Rpc, SyncState, SyncStatus};
pub use settings::{NodeSettings, NodeTypeSetting, Setting};
