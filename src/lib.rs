//! Datasteward - control plane for periodic data-governance jobs.
//!
//! Declarative policies materialize into dated tasks, which move through
//! pre-flight checks, admission control and workflow dispatch, then have
//! their results reconciled back into durable state:
//! - Policy-to-task scheduler under an execution-window calendar
//! - Two dedup work queues with single-worker drains
//! - Cron-driven producers, dispatcher, timeout and disk-pressure guards
//! - SQLite store with WAL mode
//! - Per-task JWT-authenticated result callback

pub mod adapters;
pub mod api;
pub mod domain;
pub mod infrastructure;
pub mod services;
