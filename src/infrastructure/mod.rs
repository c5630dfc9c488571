pub mod db;
pub mod document_db;
pub mod logging;
pub mod rpc_client;
pub mod rpc_events;
pub mod rpc_validator;

pub use document_db::{DocumentDb, DocumentDbError, StatementResult};
pub use rpc_client::{HttpRpcClient, RpcError, RpcTransport, WsRpcClient};
pub use rpc_events::{RpcEvent, RpcEventHub};
