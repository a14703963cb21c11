//! Notifier implementations.
//!
//! The engine treats notification as fire-and-forget; the log notifier is
//! the default transport until an external one is wired in.

pub mod log;
pub mod mock;

use std::sync::Arc;

use crate::domain::models::NoticeKind;
use crate::domain::ports::Notifier;

pub use log::LogNotifier;
pub use mock::MockNotifier;

/// Select a notifier by the runtime-config transport kind.
pub fn new_notifier(kind: NoticeKind) -> Arc<dyn Notifier> {
    match kind {
        NoticeKind::Log => Arc::new(LogNotifier),
        NoticeKind::Email => {
            // No SMTP transport is wired in; deliveries land in the log until
            // one is.
            tracing::warn!("email notification transport not available, using log transport");
            Arc::new(LogNotifier)
        }
    }
}
