//! Shared test harness: in-memory store, mock drivers, pinned clock.

#![allow(dead_code)]

use chrono::Utc;
use std::sync::Arc;

use datasteward::adapters::cluster::{MockClusterDriver, StaticClusterDirectory};
use datasteward::adapters::notify::MockNotifier;
use datasteward::adapters::sqlite::{
    migrate, open_test_store, SqliteChangeLogRepository, SqliteConfigRepository,
    SqliteConnectionRepository, SqliteDestinationRepository, SqlitePolicyRepository,
    SqliteRevisionRepository, SqliteSourceRepository, SqliteTaskRepository,
};
use datasteward::adapters::workflow::MockWorkflowDriver;
use datasteward::domain::models::{
    CleaningSpeed, Connection, Destination, ExecuteWindow, Govern, NotifyPolicy, Period, Policy,
    Source, StorageKind, Task, TaskStatus,
};
use datasteward::domain::ports::{
    ChangeLogRepository, Clock, ClusterConnectInfo, ClusterDirectory, ConfigRepository,
    ConnectionRepository, DestinationRepository, FixedClock, PolicyRepository, ResultTokenIssuer,
    SourceRepository, TaskRepository,
};
use datasteward::infrastructure::auth::JwtService;
use datasteward::services::{ChangeLogService, PolicyQueue, SchedulerContext, TaskQueue};

pub const EXTERNAL_ADDR: &str = "http://steward.test:8080";
pub const JWT_SECRET: &str = "integration-test-secret";
pub const CLUSTER_ID: &str = "cluster-1";

pub struct Harness {
    pub ctx: Arc<SchedulerContext>,
    pub cluster: Arc<MockClusterDriver>,
    pub workflow: Arc<MockWorkflowDriver>,
    pub notifier: Arc<MockNotifier>,
    pub jwt: Arc<JwtService>,
    pub revisions: Arc<SqliteRevisionRepository>,
}

/// Harness with the wall clock pinned to the given instant.
pub async fn harness_at(clock: FixedClock) -> Harness {
    let pool = open_test_store().await.expect("test store");
    migrate(&pool).await.expect("migrations");

    let policies: Arc<dyn PolicyRepository> = Arc::new(SqlitePolicyRepository::new(pool.clone()));
    let tasks: Arc<dyn TaskRepository> = Arc::new(SqliteTaskRepository::new(pool.clone()));
    let sources: Arc<dyn SourceRepository> = Arc::new(SqliteSourceRepository::new(pool.clone()));
    let destinations: Arc<dyn DestinationRepository> =
        Arc::new(SqliteDestinationRepository::new(pool.clone()));
    let connections: Arc<dyn ConnectionRepository> =
        Arc::new(SqliteConnectionRepository::new(pool.clone()));
    let changelog_repo: Arc<dyn ChangeLogRepository> =
        Arc::new(SqliteChangeLogRepository::new(pool.clone()));
    let config_repo: Arc<dyn ConfigRepository> = Arc::new(SqliteConfigRepository::new(pool.clone()));
    let revisions = Arc::new(SqliteRevisionRepository::new(pool.clone()));

    config_repo.load_or_seed().await.expect("seed config");

    let clock: Arc<dyn Clock> = Arc::new(clock);
    let cluster = Arc::new(MockClusterDriver::new(ClusterConnectInfo {
        host: "10.0.0.1".into(),
        port: 3306,
        user: "steward".into(),
        password: "steward-pass".into(),
    }));
    let clusters: Arc<dyn ClusterDirectory> = Arc::new(StaticClusterDirectory::new(cluster.clone()));
    let workflow = Arc::new(MockWorkflowDriver::new());
    let notifier = Arc::new(MockNotifier::new());
    let jwt = Arc::new(JwtService::new(JWT_SECRET));
    let tokens: Arc<dyn ResultTokenIssuer> = jwt.clone();

    let changelog = Arc::new(
        ChangeLogService::new(
            changelog_repo.clone(),
            config_repo.clone(),
            clock.clone(),
            EXTERNAL_ADDR,
        )
        .with_notifier(notifier.clone()),
    );

    let ctx = Arc::new(SchedulerContext {
        policies,
        tasks,
        sources,
        destinations,
        connections,
        changelog_repo,
        config: config_repo,
        changelog,
        clusters,
        workflow: workflow.clone(),
        tokens,
        clock,
        policy_queue: Arc::new(PolicyQueue::new()),
        task_queue: Arc::new(TaskQueue::new()),
        external_addr: EXTERNAL_ADDR.to_string(),
    });

    Harness { ctx, cluster, workflow, notifier, jwt, revisions }
}

pub fn window(start: &str, end: &str) -> ExecuteWindow {
    ExecuteWindow::parse(start, end).expect("valid window")
}

/// Register `shop.orders` on the mock cluster and insert a matching source.
pub async fn seed_source(h: &Harness) -> i64 {
    seed_source_with(h, "shop", &["orders"]).await
}

pub async fn seed_source_with(h: &Harness, database: &str, tables: &[&str]) -> i64 {
    h.cluster.add_database(database, tables);
    for table in tables {
        h.cluster.set_table_size(database, table, 100);
    }
    let now = Utc::now();
    h.ctx
        .sources
        .create(&Source {
            id: 0,
            name: format!("{database}-source"),
            bu: "commerce".into(),
            cluster_id: CLUSTER_ID.into(),
            cluster_name: "primary".into(),
            database_name: database.into(),
            tables_name: tables.join(","),
            creator: "admin".into(),
            editor: String::new(),
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("create source")
}

pub fn base_policy(src_id: i64, period: Period, day: u32) -> Policy {
    let now = Utc::now();
    Policy {
        id: 0,
        name: "orders-cleanup".into(),
        description: String::new(),
        bu: "commerce".into(),
        enable: true,
        period,
        day,
        execute_window: window("02:00:00", "05:00:00"),
        pause: false,
        rebuild_flag: false,
        cleaning_speed: CleaningSpeed::Balanced,
        src_id,
        govern: Govern::Delete,
        condition: "created_at < now() - interval 90 day".into(),
        archive_scope: String::new(),
        retain_src_data: false,
        dest_id: 0,
        relevant: vec!["dba@example.com".into()],
        notify_policy: NotifyPolicy::Silence,
        creator: "admin".into(),
        editor: String::new(),
        created_at: now,
        updated_at: now,
    }
}

pub async fn seed_policy(h: &Harness, policy: Policy) -> Policy {
    let mut policy = policy;
    let id = h.ctx.policies.create(&policy).await.expect("create policy");
    policy.id = id;
    policy
}

pub async fn seed_destination(h: &Harness, table_template: &str) -> i64 {
    let now = Utc::now();
    let connection_id = h
        .ctx
        .connections
        .create(&Connection {
            id: 0,
            name: "archive-conn".into(),
            bu: "commerce".into(),
            storage: StorageKind::Mysql,
            addr: "10.0.0.9".into(),
            port: 3306,
            user: "archiver".into(),
            passwd: String::new(),
            creator: "admin".into(),
            editor: String::new(),
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("create connection");

    h.ctx
        .destinations
        .create(&Destination {
            id: 0,
            name: "orders-archive".into(),
            bu: "commerce".into(),
            storage: StorageKind::Mysql,
            connection_id,
            database_name: String::new(),
            table_name: table_template.into(),
            compress: true,
            creator: "admin".into(),
            editor: String::new(),
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("create destination")
}

/// Insert a task directly, bypassing the reconciler. For admission and
/// result-flow tests that need precise starting states.
pub async fn seed_task(h: &Harness, policy: &Policy, status: TaskStatus, mutate: impl FnOnce(&mut Task)) -> Task {
    let source = h
        .ctx
        .sources
        .get(policy.src_id)
        .await
        .expect("get source")
        .expect("source exists");
    let mut task = Task::materialize(policy, &source, h.ctx.clock.today());
    task.task_status = status;
    mutate(&mut task);
    let id = h.ctx.tasks.create(&task).await.expect("create task");
    task.id = id;
    task
}

pub async fn get_task(h: &Harness, id: i64) -> Task {
    h.ctx.tasks.get(id).await.expect("get task").expect("task exists")
}

pub async fn change_logs(h: &Harness, task_id: i64) -> Vec<datasteward::domain::models::TaskChangeLog> {
    h.ctx.changelog_repo.list_for_task(task_id).await.expect("list change logs")
}
