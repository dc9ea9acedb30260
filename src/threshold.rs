use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;

use crate::{AppError, Result};

/// Process-wide alert threshold, in roubles.
///
/// Readers load the current value without locking; a new value becomes visible only after it
/// was validated and persisted, so a reader sees either the old or the new threshold.
/// Writers are serialized so the file always holds the value in effect.
#[derive(Debug)]
pub struct AlertThreshold {
    value: AtomicI64,
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl AlertThreshold {
    /// In-memory holder; updates are not persisted.
    pub fn new(value: i64) -> Self {
        Self {
            value: AtomicI64::new(value),
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Reads the persisted value from `path`, falling back to `default` when the file is
    /// missing or unreadable.
    pub async fn load(path: impl Into<PathBuf>, default: i64) -> Self {
        let path = path.into();
        let value = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match parse_threshold(&raw) {
                Ok(value) => {
                    tracing::info!(threshold = value, path = %path.display(), "Loaded alert threshold");
                    value
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring persisted threshold");
                    default
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => default,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read persisted threshold");
                default
            }
        };

        Self {
            value: AtomicI64::new(value),
            path: Some(path),
            write_lock: Mutex::new(()),
        }
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Validates and persists `raw`, then publishes it. On any error the previous value stays.
    pub async fn set_from_str(&self, raw: &str) -> Result<i64> {
        let value = parse_threshold(raw)?;
        self.set(value).await
    }

    pub async fn set(&self, value: i64) -> Result<i64> {
        if value < 0 {
            return Err(AppError::Validation("threshold cannot be negative".into()));
        }

        let _writer = self.write_lock.lock().await;
        if let Some(path) = &self.path {
            tokio::fs::write(path, value.to_string()).await?;
        }

        let previous = self.value.swap(value, Ordering::AcqRel);
        tracing::info!(previous, threshold = value, "Alert threshold updated");
        Ok(value)
    }
}

pub fn parse_threshold(raw: &str) -> Result<i64> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("threshold must be an integer, got '{}'", raw.trim())))?;

    if value < 0 {
        return Err(AppError::Validation("threshold cannot be negative".into()));
    }
    Ok(value)
}
