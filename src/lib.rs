pub mod alerts;
pub mod config;
pub mod extractor;
pub mod models;
pub mod monitor;
pub mod notifiers;
pub mod product_manager;
pub mod scheduler;
pub mod scraper;
pub mod seed;
pub mod store;
pub mod threshold;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use alerts::{AlertDecision, AlertEvaluator};
pub use config::AppConfig;
pub use extractor::{ExtractionFailure, ExtractionResult, PriceExtractor, PriceMatch};
pub use monitor::PriceMonitor;
pub use product_manager::ProductManager;
pub use scheduler::{MonitorScheduler, PassOutcome, PassReport, PassTrigger, SchedulerStats};
pub use store::{ProductStore, SqliteProductStore};
pub use threshold::AlertThreshold;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
