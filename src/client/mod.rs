//! 仪表盘客户端层：状态容器、本地存储、请求辅助、会话与钱包

pub mod fetch;
pub mod queries;
pub mod session;
pub mod storage;
pub mod store;
pub mod stores;
pub mod wallet;

pub use fetch::{fetch_data, FetchData, FetchState, Fetcher};
pub use queries::{get_endpoint, get_endpoints, QueryError, QueryParams, QueryResponse};
pub use session::{LoginState, LoginStore};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StoreError};
pub use store::Store;
pub use stores::{
    http_node_rpc_url, ws_node_rpc_url, NodeStore, ProviderStore, RpcUrlStore, SettingsStore,
};
pub use wallet::{RpcWalletConnector, WalletConnector, WalletProviderStore};
