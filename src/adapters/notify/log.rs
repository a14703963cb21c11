//! Log-transport notifier.

use async_trait::async_trait;

use crate::domain::errors::{codes, Fault};
use crate::domain::models::Message;
use crate::domain::ports::Notifier;

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &Message) -> Result<(), Fault> {
        tracing::info!(
            task_id = message.task_id,
            task = %message.task_name,
            status = %message.task_status,
            result_size_mb = message.task_result_size,
            recipients = ?message.relevant,
            reason = %message.task_reason,
            "task notification"
        );
        Ok(())
    }

    async fn test(&self, user: &str) -> Result<(), Fault> {
        if user.is_empty() {
            return Err(Fault::new(codes::CONFIG_NOTICE_USER_ERR, "empty test user"));
        }
        tracing::info!(user = %user, "notification test");
        Ok(())
    }
}
