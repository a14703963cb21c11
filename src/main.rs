//! Datasteward CLI entry point.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

use datasteward::adapters::cluster::StoreClusterDirectory;
use datasteward::adapters::sqlite::{
    migrate, open_store, SqliteChangeLogRepository, SqliteClusterRepository,
    SqliteConfigRepository, SqliteConnectionRepository, SqliteDestinationRepository,
    SqlitePolicyRepository, SqliteSourceRepository, SqliteTaskRepository,
};
use datasteward::adapters::workflow::new_workflow_driver;
use datasteward::api::{router, ApiState};
use datasteward::domain::ports::{
    ChangeLogRepository, Clock, ClusterDirectory, ClusterRepository, ConfigRepository,
    ConnectionRepository, DestinationRepository, PolicyRepository, ResultTokenIssuer,
    SourceRepository, SystemClock, TaskRepository,
};
use datasteward::infrastructure::auth::JwtService;
use datasteward::infrastructure::config::{AppConfig, ConfigLoader};
use datasteward::infrastructure::logging;
use datasteward::services::jobs::{register_jobs, JobSchedules};
use datasteward::services::{
    ChangeLogService, CronRunner, PolicyQueue, PolicyReconciler, SchedulerContext, TaskQueue,
    TaskSupplementer,
};

#[derive(Parser)]
#[command(name = "datasteward", version, about = "Control plane for periodic data-governance jobs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler and callback server.
    Serve {
        /// Config file path; defaults to .datasteward/config.yaml plus env.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Mint a long-lived operator token.
    Token {
        #[arg(long, default_value = "admin")]
        user: String,
        #[arg(long, default_value_t = 365)]
        expire_days: i64,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { config } => serve(config).await,
        Commands::Token { user, expire_days, config } => {
            let config = load_config(config)?;
            let jwt = JwtService::new(&config.auth.jwt_secret);
            let token = jwt
                .issue_operator_token(&user, expire_days)
                .context("failed to mint operator token")?;
            println!("{token}");
            Ok(())
        }
    }
}

async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    logging::init(&config.logging)?;

    let pool = open_store(&config.database.path, config.database.max_connections)
        .await
        .context("failed to open database")?;

    let applied = migrate(&pool).await.context("failed to run database migrations")?;
    if applied > 0 {
        tracing::info!(applied, "database migrations applied");
    }

    // Repositories.
    let policies: Arc<dyn PolicyRepository> = Arc::new(SqlitePolicyRepository::new(pool.clone()));
    let tasks: Arc<dyn TaskRepository> = Arc::new(SqliteTaskRepository::new(pool.clone()));
    let sources: Arc<dyn SourceRepository> = Arc::new(SqliteSourceRepository::new(pool.clone()));
    let destinations: Arc<dyn DestinationRepository> =
        Arc::new(SqliteDestinationRepository::new(pool.clone()));
    let connections: Arc<dyn ConnectionRepository> =
        Arc::new(SqliteConnectionRepository::new(pool.clone()));
    let clusters_repo: Arc<dyn ClusterRepository> = Arc::new(SqliteClusterRepository::new(pool.clone()));
    let changelog_repo: Arc<dyn ChangeLogRepository> =
        Arc::new(SqliteChangeLogRepository::new(pool.clone()));
    let config_repo: Arc<dyn ConfigRepository> = Arc::new(SqliteConfigRepository::new(pool.clone()));

    // Runtime config bootstrap.
    let runtime = config_repo.load_or_seed().await?;
    tracing::info!(
        max_parallel = runtime.task_max_parallel,
        conflict_level = runtime.task_conflict_level.as_str(),
        "runtime configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let jwt = Arc::new(JwtService::new(&config.auth.jwt_secret));
    let tokens: Arc<dyn ResultTokenIssuer> = jwt.clone();

    let changelog = Arc::new(ChangeLogService::new(
        changelog_repo.clone(),
        config_repo.clone(),
        clock.clone(),
        config.server.external_addr.clone(),
    ));

    let clusters: Arc<dyn ClusterDirectory> = Arc::new(StoreClusterDirectory::new(
        clusters_repo.clone(),
        config_repo.clone(),
        &config.auth.jwt_secret,
    ));
    let workflow = new_workflow_driver(
        &config.workflow.driver,
        &config.workflow.argo_url,
        &config.workflow.argo_token,
        config.workflow.argo_templates.clone(),
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
        workflow,
        tokens,
        clock,
        policy_queue: Arc::new(PolicyQueue::new()),
        task_queue: Arc::new(TaskQueue::new()),
        external_addr: config.server.external_addr.clone(),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers: JoinSet<()> = JoinSet::new();

    // Queue workers.
    {
        let reconciler = PolicyReconciler::new(ctx.clone());
        let rx = shutdown_rx.clone();
        workers.spawn(async move { reconciler.run(rx).await });
    }
    {
        let supplementer = TaskSupplementer::new(ctx.clone());
        let rx = shutdown_rx.clone();
        workers.spawn(async move { supplementer.run(rx).await });
    }

    // Cron jobs.
    let mut runner = CronRunner::new();
    register_jobs(
        &mut runner,
        &ctx,
        &JobSchedules {
            reconcile_policies: config.jobs.reconcile_policies_cron.clone(),
            check_scheduled: config.jobs.check_scheduled_cron.clone(),
            clean_workflows: config.jobs.clean_workflows_cron.clone(),
        },
    )?;
    tracing::info!(jobs = ?runner.job_names(), "cron jobs registered");
    {
        let rx = shutdown_rx.clone();
        workers.spawn(runner.run(rx));
    }

    // Callback server.
    let app = router(ApiState { ctx: ctx.clone(), jwt: jwt.clone() });
    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;
    tracing::info!(addr = %config.server.listen_addr, "http server listening");

    let mut http_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = http_shutdown.wait_for(|stop| *stop).await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!("http server error: {e}");
        }
    });

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received, draining");
    let _ = shutdown_tx.send(true);

    // Workers and cron drain first, the HTTP server last. A second signal
    // forces exit.
    let drain = async {
        while workers.join_next().await.is_some() {}
        let _ = server.await;
    };
    tokio::select! {
        _ = drain => tracing::info!("shutdown complete"),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("second signal, forcing exit");
            std::process::exit(1);
        }
    }

    Ok(())
}
