//! Domain ports (interfaces) for the scheduler core.

pub mod catalog_repository;
pub mod changelog_repository;
pub mod clock;
pub mod cluster_driver;
pub mod config_repository;
pub mod notifier;
pub mod policy_repository;
pub mod revision_repository;
pub mod task_repository;
pub mod token;
pub mod workflow_driver;

pub use catalog_repository::{
    ClusterRepository, ConnectionRepository, DestinationRepository, SourceRepository,
};
pub use changelog_repository::ChangeLogRepository;
pub use clock::{Clock, FixedClock, SystemClock};
pub use cluster_driver::{ClusterConnectInfo, ClusterDirectory, ClusterDriver};
pub use config_repository::ConfigRepository;
pub use notifier::Notifier;
pub use policy_repository::PolicyRepository;
pub use revision_repository::RevisionRepository;
pub use task_repository::TaskRepository;
pub use token::ResultTokenIssuer;
pub use workflow_driver::{
    ArchiveDestination, ArchiveParams, Callback, DeleteParams, RebuildParams, TruncateParams,
    WorkflowDriver, WorkflowStatus,
};
