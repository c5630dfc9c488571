pub mod connection_tester;
pub mod node_monitor;
pub mod node_service;
pub mod settings_service;

pub use connection_tester::{test_rpc_connection, ConnectionError, ConnectionTester};
pub use node_monitor::{NodeMonitor, NodeStatus, NodeStatusCache};
pub use node_service::{CreateNodeRequest, NodeService, NodeServiceError, UpdateNodeRequest};
pub use settings_service::SettingsService;
