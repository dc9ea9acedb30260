use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::Notifier;
use crate::config::TelegramConfig;
use crate::{AppError, Result};

pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    /// `None` when the bot token or chat id is missing.
    pub fn from_config(config: &TelegramConfig) -> Result<Option<Self>> {
        match (&config.bot_token, &config.chat_id) {
            (Some(token), Some(chat_id)) if config.is_configured() => Ok(Some(Self::new(
                &config.api_base,
                token,
                chat_id,
                Duration::from_secs(config.timeout),
            )?)),
            _ => Ok(None),
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.send_message_url())
            .form(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .send()
            .await
            // The request URL carries the bot token
            .map_err(|e| e.without_url())?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(chat_id = %self.chat_id, "Telegram alert delivered");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::Notification(format!(
                "Telegram API returned {}: {}",
                status, body
            )))
        }
    }
}
