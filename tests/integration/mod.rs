// Shared fixtures for the integration tests: an in-memory store with the real schema,
// a scripted page fetcher and the admin router driven through `oneshot`.

pub mod api_tests;
pub mod product_lifecycle_tests;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

use pricewatch::config::{DatabaseConfig, SecurityConfig};
use pricewatch::models::{NewProduct, Product};
use pricewatch::notifiers::{LogNotifier, Notifier};
use pricewatch::scraper::{PageFetcher, RenderedPage};
use pricewatch::web::{create_router, AppState};
use pricewatch::{
    AlertEvaluator, AlertThreshold, ExtractionFailure, MonitorScheduler, PriceExtractor, PriceMonitor,
    ProductManager, ProductStore, SqliteProductStore,
};

pub const ADMIN_PASSWORD: &str = "integration-password";

pub fn security_config() -> SecurityConfig {
    SecurityConfig {
        admin_password: ADMIN_PASSWORD.to_string(),
        secret_key: "integration-secret-key-with-enough-length".to_string(),
        token_expiry: 600,
    }
}

/// Serves whatever markup the test scripted for a URL; pages can change between passes.
/// When gated, every fetch waits for `release`.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: Mutex<HashMap<String, Result<String, ExtractionFailure>>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl ScriptedFetcher {
    pub fn gated(entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            pages: Mutex::default(),
            gate: Some((entered, release)),
        }
    }

    pub fn set_price(&self, url: &str, price_text: &str) {
        self.pages.lock().unwrap().insert(url.to_string(), Ok(price_page(price_text)));
    }

    pub fn set_html(&self, url: &str, html: &str) {
        self.pages.lock().unwrap().insert(url.to_string(), Ok(html.to_string()));
    }

    pub fn set_failure(&self, url: &str, failure: ExtractionFailure) {
        self.pages.lock().unwrap().insert(url.to_string(), Err(failure));
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<RenderedPage, ExtractionFailure> {
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }

        let page = self.pages.lock().unwrap().get(url).cloned();
        match page {
            Some(Ok(html)) => Ok(RenderedPage::from_html(url, &html)),
            Some(Err(failure)) => Err(failure),
            None => Err(ExtractionFailure::Navigation(format!("unknown page {}", url))),
        }
    }
}

pub fn price_page(price_text: &str) -> String {
    format!(
        r#"<html><body>
            <h1>Карточка товара</h1>
            <div class="rating">4.8</div>
            <div class="price-block"><span class="price">{}</span></div>
        </body></html>"#,
        price_text
    )
}

pub struct TestApp {
    pub store: Arc<SqliteProductStore>,
    pub scheduler: Arc<MonitorScheduler>,
    pub threshold: Arc<AlertThreshold>,
    pub router: Router,
    pub threshold_dir: TempDir,
}

impl TestApp {
    pub async fn new(fetcher: Arc<dyn PageFetcher>) -> anyhow::Result<Self> {
        Self::with_notifier(fetcher, Arc::new(LogNotifier)).await
    }

    pub async fn with_notifier(
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(create_test_store().await?);
        let threshold_dir = tempfile::tempdir()?;
        let threshold = Arc::new(AlertThreshold::load(threshold_dir.path().join("limit.txt"), 500).await);

        let monitor = PriceMonitor::new(fetcher, PriceExtractor::new(), Duration::from_secs(5));
        let scheduler = Arc::new(MonitorScheduler::new(
            store.clone(),
            monitor,
            AlertEvaluator::new(notifier, Arc::clone(&threshold)),
            Duration::ZERO,
        ));

        let state = AppState {
            product_manager: Arc::new(ProductManager::new(
                store.clone(),
                Arc::clone(&scheduler),
                Arc::clone(&threshold),
            )),
            security: Arc::new(security_config()),
            request_timeout: Duration::from_secs(30),
        };

        Ok(Self {
            store,
            scheduler,
            threshold,
            router: create_router(state),
            threshold_dir,
        })
    }

    pub async fn add_product(&self, name: &str, url: &str, reference_price: i64) -> anyhow::Result<Product> {
        let product = Product::new(NewProduct {
            name: name.to_string(),
            url: url.to_string(),
            reference_price,
        });
        self.store.insert(&product).await?;
        Ok(product)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut request = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if body.is_some() {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }

        let request = request.body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })?;

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok((status, json))
    }

    pub async fn login(&self) -> anyhow::Result<String> {
        let (status, body) = self
            .request(
                Method::POST,
                "/admin/login",
                None,
                Some(serde_json::json!({ "password": ADMIN_PASSWORD })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {}", body);

        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("no token in {}", body))
    }
}

/// In-memory SQLite with the real migrations applied.
pub async fn create_test_store() -> anyhow::Result<SqliteProductStore> {
    let store = SqliteProductStore::connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        acquire_timeout: 5,
    })
    .await?;
    store.migrate().await?;
    Ok(store)
}

/// Polls until `condition` holds or the timeout expires.
pub async fn wait_for_condition<F, Fut>(mut condition: F, timeout_seconds: u64) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_secs(timeout_seconds);

    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    false
}
