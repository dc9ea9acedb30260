use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::models::{NewProduct, Product, UpdateProduct};
use crate::scheduler::{CheckOutcome, MonitorScheduler, PassTrigger, SchedulerStats, TriggerStatus};
use crate::store::ProductStore;
use crate::threshold::AlertThreshold;
use crate::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListing {
    pub products: Vec<Product>,
    pub threshold: i64,
}

/// A product after an admin mutation, with the immediate check that followed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductChange {
    pub product: Product,
    pub check: CheckOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub scheduler: SchedulerStats,
    pub threshold: i64,
    pub product_count: i64,
}

/// Admin operations over the product list and the alert threshold.
pub struct ProductManager {
    store: Arc<dyn ProductStore>,
    scheduler: Arc<MonitorScheduler>,
    threshold: Arc<AlertThreshold>,
}

impl ProductManager {
    pub fn new(
        store: Arc<dyn ProductStore>,
        scheduler: Arc<MonitorScheduler>,
        threshold: Arc<AlertThreshold>,
    ) -> Self {
        Self {
            store,
            scheduler,
            threshold,
        }
    }

    pub async fn list_products(&self) -> Result<ProductListing> {
        Ok(ProductListing {
            products: self.store.list().await?,
            threshold: self.threshold.get(),
        })
    }

    pub async fn get_product(&self, id: &str) -> Result<Product> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                resource: format!("product {}", id),
            })
    }

    pub async fn create_product(&self, request: NewProduct) -> Result<ProductChange> {
        let request = request.normalized();
        request.validate()?;

        let product = Product::new(request);
        self.store.insert(&product).await?;
        tracing::info!(product = %product.name, id = %product.id, "Product added");

        self.check_after_change(product).await
    }

    pub async fn update_product(&self, id: &str, update: UpdateProduct) -> Result<ProductChange> {
        let update = update.normalized();
        update.validate()?;
        if update.is_empty() {
            return Err(AppError::Validation("nothing to update".into()));
        }

        let mut product = self.get_product(id).await?;
        product.update(update);
        if !self.store.save(&product).await? {
            return Err(AppError::NotFound {
                resource: format!("product {}", id),
            });
        }
        tracing::info!(product = %product.name, id = %product.id, "Product updated");

        self.check_after_change(product).await
    }

    pub async fn delete_product(&self, id: &str) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(AppError::NotFound {
                resource: format!("product {}", id),
            });
        }
        tracing::info!(id, "Product deleted");
        Ok(())
    }

    /// The mutation has already been stored; a failed check only skips the alert.
    async fn check_after_change(&self, product: Product) -> Result<ProductChange> {
        let check = match self.scheduler.check_product(&product).await {
            Ok(check) => check,
            Err(e) => {
                tracing::error!(product = %product.name, error = %e, "Immediate check failed");
                CheckOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        // Pick up the price the check may have recorded
        let product = match self.store.get(&product.id).await {
            Ok(Some(stored)) => stored,
            _ => product,
        };

        Ok(ProductChange { product, check })
    }

    pub async fn set_threshold(&self, raw: &str) -> Result<i64> {
        self.threshold.set_from_str(raw).await
    }

    pub async fn trigger_check(&self) -> TriggerStatus {
        self.scheduler.trigger_pass(PassTrigger::Manual).await
    }

    pub async fn status(&self) -> Result<StatusReport> {
        Ok(StatusReport {
            scheduler: self.scheduler.get_stats().await,
            threshold: self.threshold.get(),
            product_count: self.store.count().await?,
        })
    }
}
