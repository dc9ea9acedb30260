use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::notifiers::Notifier;
use crate::threshold::AlertThreshold;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AlertDecision {
    Fired { margin: i64, delivered: bool },
    Skipped { margin: i64 },
}

impl AlertDecision {
    pub fn margin(&self) -> i64 {
        match self {
            AlertDecision::Fired { margin, .. } | AlertDecision::Skipped { margin } => *margin,
        }
    }

    pub fn is_fired(&self) -> bool {
        matches!(self, AlertDecision::Fired { .. })
    }
}

/// What the alert is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertSubject<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub reference_price: i64,
    pub observed_price: i64,
}

/// `margin = reference - observed`; an alert is due when the margin reaches the threshold.
pub fn decide(reference_price: i64, observed_price: i64, threshold: i64) -> AlertDecision {
    let margin = reference_price - observed_price;
    if margin >= threshold {
        AlertDecision::Fired {
            margin,
            delivered: false,
        }
    } else {
        AlertDecision::Skipped { margin }
    }
}

pub fn compose_alert(subject: &AlertSubject<'_>, margin: i64) -> String {
    format!(
        "⚠️ Your price is higher than the competitor's!\n\
         Product: {}\n\
         Link: {}\n\
         Your price: {} ₽\n\
         Competitor price: {} ₽\n\
         Overpricing: {} ₽",
        subject.name, subject.url, subject.reference_price, subject.observed_price, margin
    )
}

pub struct AlertEvaluator {
    notifier: Arc<dyn Notifier>,
    threshold: Arc<AlertThreshold>,
}

impl AlertEvaluator {
    pub fn new(notifier: Arc<dyn Notifier>, threshold: Arc<AlertThreshold>) -> Self {
        Self { notifier, threshold }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold.get()
    }

    /// Reads the threshold afresh, decides, and dispatches when the alert fires.
    /// A failed delivery is logged and reported as `delivered: false`.
    pub async fn evaluate(&self, subject: &AlertSubject<'_>) -> AlertDecision {
        let threshold = self.threshold.get();

        match decide(subject.reference_price, subject.observed_price, threshold) {
            AlertDecision::Fired { margin, .. } => {
                tracing::info!(
                    product = %subject.name,
                    margin,
                    threshold,
                    "Margin reached threshold, sending alert"
                );
                let delivered = match self.notifier.send(&compose_alert(subject, margin)).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(
                            product = %subject.name,
                            notifier = self.notifier.name(),
                            error = %e,
                            "Failed to deliver alert"
                        );
                        false
                    }
                };
                metrics::counter!("pricewatch_alerts_total", "decision" => "fired").increment(1);
                AlertDecision::Fired { margin, delivered }
            }
            skipped @ AlertDecision::Skipped { margin } => {
                tracing::info!(
                    product = %subject.name,
                    margin,
                    threshold,
                    "Margin below threshold"
                );
                metrics::counter!("pricewatch_alerts_total", "decision" => "skipped").increment(1);
                skipped
            }
        }
    }
}
