//! Cron runner: one scheduler loop firing registered jobs.
//!
//! Jobs are cron-expression or fixed-interval. Each fire runs the job body
//! as its own tokio task tracked in a join set, so a panicking body takes
//! down only that fire; graceful shutdown drains in-flight bodies before
//! returning.

use chrono::{DateTime, Utc};
use cron::Schedule;
use futures::future::BoxFuture;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::domain::errors::{DomainError, DomainResult};

type JobBody = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

enum JobSchedule {
    Cron(Box<Schedule>),
    Every(Duration),
}

struct RegisteredJob {
    name: &'static str,
    schedule: JobSchedule,
    registered_at: DateTime<Utc>,
    last_fired: Option<DateTime<Utc>>,
    body: JobBody,
}

impl RegisteredJob {
    fn due(&self, now: DateTime<Utc>) -> bool {
        match &self.schedule {
            JobSchedule::Cron(schedule) => {
                let reference = self.last_fired.unwrap_or(self.registered_at);
                schedule.after(&reference).next().is_some_and(|next| now >= next)
            }
            JobSchedule::Every(every) => match self.last_fired {
                None => true,
                Some(last) => {
                    now.signed_duration_since(last)
                        >= chrono::Duration::from_std(*every).unwrap_or(chrono::TimeDelta::MAX)
                }
            },
        }
    }
}

pub struct CronRunner {
    jobs: Vec<RegisteredJob>,
    /// Scheduler tick; shortened in tests.
    tick: Duration,
}

impl Default for CronRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CronRunner {
    pub fn new() -> Self {
        Self { jobs: Vec::new(), tick: Duration::from_secs(1) }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Register a cron-expression job. The expression is validated here.
    pub fn add_cron<F>(&mut self, name: &'static str, expression: &str, body: F) -> DomainResult<()>
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let schedule = Schedule::from_str(expression).map_err(|e| {
            DomainError::ValidationFailed(format!("cron expression '{expression}' for {name}: {e}"))
        })?;
        self.jobs.push(RegisteredJob {
            name,
            schedule: JobSchedule::Cron(Box::new(schedule)),
            registered_at: Utc::now(),
            last_fired: None,
            body: Arc::new(body),
        });
        Ok(())
    }

    /// Register a fixed-interval job; fires immediately on the first tick.
    pub fn add_interval<F>(&mut self, name: &'static str, every: Duration, body: F)
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.jobs.push(RegisteredJob {
            name,
            schedule: JobSchedule::Every(every),
            registered_at: Utc::now(),
            last_fired: None,
            body: Arc::new(body),
        });
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|j| j.name).collect()
    }

    /// Scheduler loop. Returns after shutdown once in-flight job bodies
    /// have drained.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut tick = tokio::time::interval(self.tick);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = tick.tick() => {
                    let now = Utc::now();
                    for job in &mut self.jobs {
                        if !job.due(now) {
                            continue;
                        }
                        job.last_fired = Some(now);
                        let body = job.body.clone();
                        let name = job.name;
                        in_flight.spawn(async move {
                            let started = std::time::Instant::now();
                            tracing::debug!(job = name, "running");
                            body().await;
                            tracing::debug!(job = name, cost = ?started.elapsed(), "done");
                        });
                    }

                    // Reap finished fires; a panic loses one fire, not the loop.
                    while let Some(result) = in_flight.try_join_next() {
                        if let Err(e) = result {
                            tracing::error!("cron job body failed: {e}");
                        }
                    }
                }
            }
        }

        while let Some(result) = in_flight.join_next().await {
            if let Err(e) = result {
                tracing::error!("cron job body failed during drain: {e}");
            }
        }
        tracing::info!("cron runner stopped");
    }
}
