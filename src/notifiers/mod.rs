use async_trait::async_trait;

use crate::Result;

pub mod telegram;

pub use telegram::TelegramNotifier;

/// Delivers a plain-text alert. Failures are reported, never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, text: &str) -> Result<()>;
}

/// Used when no messaging credentials are configured; alerts only reach the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, text: &str) -> Result<()> {
        tracing::warn!(alert = %text, "Alert (no notifier configured)");
        Ok(())
    }
}
