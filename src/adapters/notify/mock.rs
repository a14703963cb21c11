//! Capturing notifier for tests.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::errors::Fault;
use crate::domain::models::Message;
use crate::domain::ports::Notifier;

#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<Message>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, message: &Message) -> Result<(), Fault> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn test(&self, _user: &str) -> Result<(), Fault> {
        Ok(())
    }
}
