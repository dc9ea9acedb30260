use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::ScraperConfig;
use crate::extractor::{ElementQuery, ExtractionFailure};

/// A page after the browser finished rendering it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedPage {
    pub url: String,
    pub final_url: String, // After redirects
    /// Visible text of the body.
    pub text: String,
    pub html: String,
    pub response_time_ms: u64,
}

impl RenderedPage {
    /// Builds a page from raw markup, deriving the visible text from `<body>`.
    pub fn from_html(url: &str, html: &str) -> Self {
        let document = Html::parse_document(html);
        let text = Selector::parse("body")
            .ok()
            .and_then(|body| document.select(&body).next())
            .map(|body| body.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();

        Self {
            url: url.to_string(),
            final_url: url.to_string(),
            text,
            html: html.to_string(),
            response_time_ms: 0,
        }
    }

    pub fn document(&self) -> PageDocument {
        PageDocument {
            document: Html::parse_document(&self.html),
        }
    }
}

/// Parsed DOM used for the structural selector queries.
pub struct PageDocument {
    document: Html,
}

impl ElementQuery for PageDocument {
    fn query(&self, selector: &str) -> Result<Vec<String>, String> {
        let css_selector = Selector::parse(selector)
            .map_err(|e| format!("Invalid CSS selector '{}': {:?}", selector, e))?;

        Ok(self
            .document
            .select(&css_selector)
            .map(|element| element.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .collect())
    }
}

/// Renders a product page. Implementations report failures as values, never panics.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RenderedPage, ExtractionFailure>;
}

pub struct ChromeFetcher {
    config: ScraperConfig,
}

impl ChromeFetcher {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn fetch(&self, url: &str) -> Result<RenderedPage, ExtractionFailure> {
        let config = self.config.clone();
        let url = url.to_string();

        // headless_chrome is a blocking client
        tokio::task::spawn_blocking(move || render_page(&config, &url))
            .await
            .map_err(|e| ExtractionFailure::Browser(format!("render task failed: {}", e)))?
    }
}

fn launch_browser(config: &ScraperConfig) -> Result<Browser, ExtractionFailure> {
    let mut launch_options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false) // Often needed in containerized environments
        .idle_browser_timeout(Duration::from_secs(config.fetch_timeout))
        .args(vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-extensions"),
        ])
        .build()
        .map_err(|e| ExtractionFailure::Browser(format!("Failed to create launch options: {}", e)))?;

    if let Some(chrome_path) = &config.chrome_path {
        launch_options.path = Some(PathBuf::from(chrome_path));
    }

    Browser::new(launch_options)
        .map_err(|e| ExtractionFailure::Browser(format!("Failed to launch browser: {}", e)))
}

/// One browser per page keeps a crashed renderer from leaking into the next product.
fn render_page(config: &ScraperConfig, url: &str) -> Result<RenderedPage, ExtractionFailure> {
    let start_time = Instant::now();
    let browser = launch_browser(config)?;

    let tab = browser
        .new_tab()
        .map_err(|e| ExtractionFailure::Browser(format!("Failed to create tab: {}", e)))?;

    tab.set_user_agent(&config.user_agent, Some("ru-RU,ru"), None)
        .map_err(|e| ExtractionFailure::Browser(format!("Failed to set user agent: {}", e)))?;

    tracing::debug!(url, "Opening product page");
    tab.navigate_to(url)
        .map_err(|e| ExtractionFailure::Navigation(e.to_string()))?;

    let body = tab
        .wait_for_element_with_custom_timeout("body", Duration::from_secs(config.ready_timeout))
        .map_err(|_| ExtractionFailure::Timeout(config.ready_timeout))?;

    // Prices are usually injected by scripts after the body exists
    std::thread::sleep(Duration::from_millis(config.settle_delay_ms));

    let text = body
        .get_inner_text()
        .map_err(|e| ExtractionFailure::Render(format!("Failed to read page text: {}", e)))?;
    let html = tab
        .get_content()
        .map_err(|e| ExtractionFailure::Render(format!("Failed to get page content: {}", e)))?;

    let final_url = {
        let current = tab.get_url();
        if current.is_empty() {
            url.to_string()
        } else {
            current
        }
    };

    let _ = tab.close(true);

    Ok(RenderedPage {
        url: url.to_string(),
        final_url,
        text,
        html,
        response_time_ms: start_time.elapsed().as_millis() as u64,
    })
}
