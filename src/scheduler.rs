use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::alerts::{AlertDecision, AlertEvaluator, AlertSubject};
use crate::extractor::StrategyKind;
use crate::models::Product;
use crate::monitor::PriceMonitor;
use crate::store::ProductStore;
use crate::{AppError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassTrigger {
    Scheduled,
    Manual,
    Startup,
}

impl PassTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassTrigger::Scheduled => "scheduled",
            PassTrigger::Manual => "manual",
            PassTrigger::Startup => "startup",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedCheck {
    pub product: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    pub trigger: PassTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub checked: usize,
    pub updated: usize,
    pub failed: Vec<FailedCheck>,
    pub alerts_fired: usize,
    pub alerts_skipped: usize,
}

#[derive(Debug, Clone)]
pub enum PassOutcome {
    Completed(PassReport),
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    Started,
    AlreadyRunning,
}

/// Result of checking one product outside a pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    Priced {
        price: i64,
        strategy: StrategyKind,
        alert: AlertDecision,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub passes_completed: u64,
    pub passes_failed: u64,
    pub passes_rejected: u64,
    pub last_report: Option<PassReport>,
    pub is_running: bool,
    pub uptime_seconds: u64,
}

#[derive(Debug, Default)]
struct PassCounters {
    completed: u64,
    failed: u64,
    rejected: u64,
    last_report: Option<PassReport>,
}

/// Clears the running flag when dropped, so an aborted pass never wedges the scheduler.
struct PassGuard {
    running: Arc<AtomicBool>,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Walks every product through fetch, extract, persist and alert, one at a time.
pub struct MonitorScheduler {
    store: Arc<dyn ProductStore>,
    monitor: PriceMonitor,
    evaluator: AlertEvaluator,
    item_delay: Duration,
    running: Arc<AtomicBool>,
    counters: RwLock<PassCounters>,
    start_time: DateTime<Utc>,
}

impl MonitorScheduler {
    pub fn new(
        store: Arc<dyn ProductStore>,
        monitor: PriceMonitor,
        evaluator: AlertEvaluator,
        item_delay: Duration,
    ) -> Self {
        Self {
            store,
            monitor,
            evaluator,
            item_delay,
            running: Arc::new(AtomicBool::new(false)),
            counters: RwLock::new(PassCounters::default()),
            start_time: Utc::now(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<PassGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard {
                running: Arc::clone(&self.running),
            })
    }

    async fn record_rejection(&self, trigger: PassTrigger) {
        tracing::warn!(trigger = trigger.as_str(), "Pass already running, trigger ignored");
        self.counters.write().await.rejected += 1;
        metrics::counter!(
            "pricewatch_passes_total",
            "trigger" => trigger.as_str(),
            "outcome" => "rejected"
        )
        .increment(1);
    }

    /// Runs a full pass now, or reports `AlreadyRunning` without doing anything.
    /// A store error aborts the pass and is returned.
    pub async fn run_pass(&self, trigger: PassTrigger) -> Result<PassOutcome> {
        let Some(guard) = self.try_acquire() else {
            self.record_rejection(trigger).await;
            return Ok(PassOutcome::AlreadyRunning);
        };

        self.execute_pass(trigger, guard)
            .await
            .map(PassOutcome::Completed)
    }

    /// Starts a pass in the background. The flag is taken before spawning, so the returned
    /// status is accurate when this call returns.
    pub async fn trigger_pass(self: &Arc<Self>, trigger: PassTrigger) -> TriggerStatus {
        let Some(guard) = self.try_acquire() else {
            self.record_rejection(trigger).await;
            return TriggerStatus::AlreadyRunning;
        };

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = scheduler.execute_pass(trigger, guard).await {
                tracing::error!(trigger = trigger.as_str(), error = %e, "Background pass aborted");
            }
        });

        TriggerStatus::Started
    }

    async fn execute_pass(&self, trigger: PassTrigger, _guard: PassGuard) -> Result<PassReport> {
        let timer = Instant::now();
        tracing::info!(trigger = trigger.as_str(), "Starting monitoring pass");

        let result = self.walk_products(trigger).await;
        metrics::histogram!("pricewatch_pass_duration_seconds").record(timer.elapsed().as_secs_f64());

        let mut counters = self.counters.write().await;
        match result {
            Ok(report) => {
                tracing::info!(
                    trigger = trigger.as_str(),
                    checked = report.checked,
                    updated = report.updated,
                    failed = report.failed.len(),
                    alerts_fired = report.alerts_fired,
                    "Monitoring pass completed"
                );
                counters.completed += 1;
                counters.last_report = Some(report.clone());
                metrics::counter!(
                    "pricewatch_passes_total",
                    "trigger" => trigger.as_str(),
                    "outcome" => "completed"
                )
                .increment(1);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(trigger = trigger.as_str(), error = %e, "Monitoring pass aborted");
                counters.failed += 1;
                metrics::counter!(
                    "pricewatch_passes_total",
                    "trigger" => trigger.as_str(),
                    "outcome" => "failed"
                )
                .increment(1);
                Err(e)
            }
        }
    }

    async fn walk_products(&self, trigger: PassTrigger) -> Result<PassReport> {
        let started_at = Utc::now();
        let mut products = self.store.list().await?;
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let mut report = PassReport {
            trigger,
            started_at,
            finished_at: started_at,
            checked: 0,
            updated: 0,
            failed: Vec::new(),
            alerts_fired: 0,
            alerts_skipped: 0,
        };

        let total = products.len();
        for (index, product) in products.iter().enumerate() {
            report.checked += 1;

            match self.check_product(product).await? {
                CheckOutcome::Priced { price, alert, .. } => {
                    report.updated += 1;
                    tracing::debug!(product = %product.name, price, margin = alert.margin(), "Product checked");
                    if alert.is_fired() {
                        report.alerts_fired += 1;
                    } else {
                        report.alerts_skipped += 1;
                    }
                }
                CheckOutcome::Failed { reason } => report.failed.push(FailedCheck {
                    product: product.name.clone(),
                    reason,
                }),
            }

            // Throttle between items only
            if index + 1 < total && !self.item_delay.is_zero() {
                tokio::time::sleep(self.item_delay).await;
            }
        }

        report.finished_at = Utc::now();
        Ok(report)
    }

    /// Fetches, persists and evaluates one product. Extraction problems are part of the
    /// outcome; only store errors are returned as `Err`.
    pub async fn check_product(&self, product: &Product) -> Result<CheckOutcome> {
        let found = match self.monitor.probe(&product.url).await {
            Ok(found) => found,
            Err(failure) => {
                tracing::warn!(product = %product.name, url = %product.url, reason = %failure, "Price not found");
                metrics::counter!("pricewatch_products_checked_total", "result" => "failed").increment(1);
                return Ok(CheckOutcome::Failed {
                    reason: failure.to_string(),
                });
            }
        };

        if !self.store.record_price(&product.id, found.price, Utc::now()).await? {
            tracing::warn!(product = %product.name, "Product removed while being checked");
            metrics::counter!("pricewatch_products_checked_total", "result" => "failed").increment(1);
            return Ok(CheckOutcome::Failed {
                reason: "product no longer exists".to_string(),
            });
        }

        tracing::info!(
            product = %product.name,
            price = found.price,
            reference_price = product.reference_price,
            source = %found.source,
            "Competitor price recorded"
        );
        metrics::counter!("pricewatch_products_checked_total", "result" => "priced").increment(1);

        let alert = self
            .evaluator
            .evaluate(&AlertSubject {
                name: &product.name,
                url: &product.url,
                reference_price: product.reference_price,
                observed_price: found.price,
            })
            .await;

        Ok(CheckOutcome::Priced {
            price: found.price,
            strategy: found.strategy,
            alert,
        })
    }

    /// Registers the recurring pass and starts the cron runner. Keep the returned handle alive
    /// and call `shutdown` on it when stopping.
    pub async fn start_recurring(self: &Arc<Self>, cron: &str) -> Result<JobScheduler> {
        let runner = JobScheduler::new()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create job scheduler: {}", e)))?;

        let scheduler = Arc::clone(self);
        let job = Job::new_async(cron, move |_uuid, _l| {
            let scheduler = Arc::clone(&scheduler);
            Box::pin(async move {
                match scheduler.run_pass(PassTrigger::Scheduled).await {
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Scheduled pass failed"),
                }
            })
        })
        .map_err(|e| AppError::Validation(format!("Invalid cron expression '{}': {}", cron, e)))?;

        runner
            .add(job)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to register recurring pass: {}", e)))?;
        runner
            .start()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start job scheduler: {}", e)))?;

        tracing::info!(cron, "Recurring monitoring pass scheduled");
        Ok(runner)
    }

    pub async fn get_stats(&self) -> SchedulerStats {
        let counters = self.counters.read().await;
        let uptime = Utc::now().signed_duration_since(self.start_time);

        SchedulerStats {
            passes_completed: counters.completed,
            passes_failed: counters.failed,
            passes_rejected: counters.rejected,
            last_report: counters.last_report.clone(),
            is_running: self.is_running(),
            uptime_seconds: uptime.num_seconds().max(0) as u64,
        }
    }

    pub fn threshold(&self) -> i64 {
        self.evaluator.threshold()
    }
}
