use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub scraper: ScraperConfig,
    pub scheduler: SchedulerConfig,
    pub alerts: AlertsConfig,
    pub notifications: NotificationsConfig,
    pub seed: SeedConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub admin_password: String,
    pub secret_key: String,
    pub token_expiry: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub user_agent: String,
    pub chrome_path: Option<String>,
    /// Seconds to wait for the page body to appear.
    pub ready_timeout: u64,
    /// Pause after the body appears so client-side rendering can fill in prices.
    pub settle_delay_ms: u64,
    /// Hard upper bound on a whole fetch, in seconds.
    pub fetch_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Six or seven field cron expression (seconds first).
    pub cron: String,
    pub run_on_startup: bool,
    pub item_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    pub default_threshold: i64,
    pub threshold_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    pub links_file: PathBuf,
    pub prices_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        matches!((&self.bot_token, &self.chat_id), (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty())
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, ignored by git
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("PRICEWATCH").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        config.apply_legacy_env(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Honour the flat variable names used by existing `.env` files.
    fn apply_legacy_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(token) = var("TELEGRAM_BOT_TOKEN") {
            self.notifications.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = var("TELEGRAM_CHAT_ID") {
            self.notifications.telegram.chat_id = Some(chat_id);
        }
        if let Some(password) = var("ADMIN_PASSWORD") {
            self.security.admin_password = password;
        }
        if let Some(raw) = var("PRICE_ALERT_THRESHOLD") {
            self.alerts.default_threshold = raw.trim().parse().map_err(|_| {
                ConfigError::Message(format!("PRICE_ALERT_THRESHOLD must be an integer, got '{}'", raw.trim()))
            })?;
        }
        if self.scraper.chrome_path.is_none() {
            self.scraper.chrome_path = var("CHROME_PATH");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message("Database max_connections must be greater than 0".into()));
        }

        if self.security.secret_key.len() < 32 {
            return Err(ConfigError::Message("Security secret_key must be at least 32 characters".into()));
        }

        if self.security.admin_password.is_empty() {
            return Err(ConfigError::Message("Security admin_password must not be empty".into()));
        }

        if self.scraper.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Scraper user_agent must not be empty".into()));
        }

        if self.scraper.ready_timeout == 0 || self.scraper.fetch_timeout == 0 {
            return Err(ConfigError::Message("Scraper timeouts must be greater than 0".into()));
        }

        if !is_valid_cron(&self.scheduler.cron) {
            return Err(ConfigError::Message("Invalid cron expression in scheduler.cron".into()));
        }

        if self.alerts.default_threshold < 0 {
            return Err(ConfigError::Message("Alert default_threshold cannot be negative".into()));
        }

        match Url::parse(&self.notifications.telegram.api_base) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => return Err(ConfigError::Message("Invalid Telegram api_base URL".into())),
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }
}

/// Cron expressions carry a leading seconds field, optionally a trailing year.
pub fn is_valid_cron(cron_expr: &str) -> bool {
    let parts: Vec<&str> = cron_expr.split_whitespace().collect();
    if parts.len() != 6 && parts.len() != 7 {
        return false;
    }

    parts.iter().all(|part| {
        part.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '*' | '-' | ',' | '/' | '?'))
    })
}
