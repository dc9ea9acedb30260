use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::Product;
use crate::Result;

pub mod sqlite;

pub use sqlite::SqliteProductStore;

/// Product persistence. Each call is atomic on its own row; there are no multi-call transactions.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products, ordered by name then id.
    async fn list(&self) -> Result<Vec<Product>>;

    async fn get(&self, id: &str) -> Result<Option<Product>>;

    async fn insert(&self, product: &Product) -> Result<()>;

    /// Overwrites name, url and reference price. Returns `false` when the id is unknown.
    async fn save(&self, product: &Product) -> Result<bool>;

    async fn delete(&self, id: &str) -> Result<bool>;

    /// Stores a successfully extracted price. Returns `false` when the product is gone.
    async fn record_price(&self, id: &str, price: i64, checked_at: DateTime<Utc>) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}
