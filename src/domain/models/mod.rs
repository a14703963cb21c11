//! Domain models
//!
//! Pure domain entities plus the calendar/window arithmetic the scheduler is
//! built on. No infrastructure concerns.

pub mod changelog;
pub mod cluster;
pub mod config;
pub mod destination;
pub mod exec_window;
pub mod policy;
pub mod revision;
pub mod schedule;
pub mod source;
pub mod task;

pub use changelog::{Message, TaskChangeLog};
pub use cluster::{BigTable, Cluster};
pub use config::{filter_excluded_tables, ConflictLevel, NoticeKind, RuntimeConfig};
pub use destination::{Connection, Destination, StorageKind};
pub use exec_window::{ExecuteWindow, WindowPosition};
pub use policy::{CleaningSpeed, Govern, NotifyPolicy, Policy};
pub use revision::{Revision, RevisionKind};
pub use schedule::{
    days_in_month, format_execute_date, missed_exec_date_and_window, next_schedule_time, Period,
};
pub use source::{check_same_sharding_tables, generate_dest_table_name, Source};
pub use task::{Task, TaskStatus};
