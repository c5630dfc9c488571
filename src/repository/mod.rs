// Repository 抽象层：trait + Postgres 实现 + 内存实现
pub mod node_repository;
pub mod settings_repository;

pub use node_repository::{
    DuplicateNode, InMemoryNodeRepository, NodeRepository, PgNodeRepository,
};
pub use settings_repository::{
    InMemorySettingsRepository, PgSettingsRepository, SettingsRepository,
};
