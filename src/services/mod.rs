//! Scheduler services: queues, cron runner, worker loops and the task
//! lifecycle engine.

pub mod admission;
pub mod big_tables;
pub mod changelog;
pub mod cron_runner;
pub mod disk_guard;
pub mod dispatcher;
pub mod jobs;
pub mod policy_admin;
pub mod policy_reconciler;
pub mod queue;
pub mod result_reconciler;
pub mod supplementer;

use std::sync::Arc;

use crate::domain::ports::{
    ChangeLogRepository, Clock, ClusterDirectory, ConfigRepository, ConnectionRepository,
    DestinationRepository, PolicyRepository, ResultTokenIssuer, SourceRepository, TaskRepository,
    WorkflowDriver,
};

pub use big_tables::BigTableRefresher;
pub use changelog::ChangeLogService;
pub use cron_runner::CronRunner;
pub use disk_guard::DiskGuard;
pub use dispatcher::Dispatcher;
pub use policy_admin::PolicyAdminService;
pub use policy_reconciler::PolicyReconciler;
pub use queue::{DedupQueue, PolicyHandle, PolicyQueue, TaskHandle, TaskQueue};
pub use result_reconciler::{ResultReconciler, TaskResultUpdate};
pub use supplementer::TaskSupplementer;

/// Actor name recorded on scheduler-initiated change-log rows.
pub const SYSTEM_USER: &str = "system";
/// The only principal allowed to push task results through the callback.
pub const RESULT_UPDATER_USER: &str = "updater";

/// Everything the scheduler components share: store handles, drivers, the
/// two queues and the clock. One instance per process, threaded through
/// every worker.
pub struct SchedulerContext {
    pub policies: Arc<dyn PolicyRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub sources: Arc<dyn SourceRepository>,
    pub destinations: Arc<dyn DestinationRepository>,
    pub connections: Arc<dyn ConnectionRepository>,
    pub changelog_repo: Arc<dyn ChangeLogRepository>,
    pub config: Arc<dyn ConfigRepository>,
    pub changelog: Arc<ChangeLogService>,
    pub clusters: Arc<dyn ClusterDirectory>,
    pub workflow: Arc<dyn WorkflowDriver>,
    pub tokens: Arc<dyn ResultTokenIssuer>,
    pub clock: Arc<dyn Clock>,
    pub policy_queue: Arc<PolicyQueue>,
    pub task_queue: Arc<TaskQueue>,
    /// Externally reachable base address, used for callback URLs and links.
    pub external_addr: String,
}

impl SchedulerContext {
    /// The callback URL handed to every workflow submission.
    pub fn callback_url(&self) -> String {
        format!("{}/api/v1/task/result", self.external_addr)
    }
}
