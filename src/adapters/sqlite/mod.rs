//! SQLite persistence adapters.

pub mod catalog_repository;
pub mod changelog_repository;
pub mod config_repository;
pub mod connection;
pub mod migrations;
pub mod policy_repository;
pub mod revision_repository;
pub mod task_repository;
mod util;

pub use catalog_repository::{
    SqliteClusterRepository, SqliteConnectionRepository, SqliteDestinationRepository,
    SqliteSourceRepository,
};
pub use changelog_repository::SqliteChangeLogRepository;
pub use config_repository::SqliteConfigRepository;
pub use connection::{open_store, open_test_store};
pub use migrations::{migrate, schema_version};
pub use policy_repository::SqlitePolicyRepository;
pub use revision_repository::SqliteRevisionRepository;
pub use task_repository::SqliteTaskRepository;
