use std::sync::Arc;
use std::time::Duration;

use crate::extractor::{ExtractionFailure, ExtractionResult, PriceExtractor};
use crate::scraper::{PageFetcher, RenderedPage};

/// Fetch plus extract for a single product URL.
pub struct PriceMonitor {
    fetcher: Arc<dyn PageFetcher>,
    extractor: PriceExtractor,
    fetch_timeout: Duration,
}

impl PriceMonitor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, extractor: PriceExtractor, fetch_timeout: Duration) -> Self {
        Self {
            fetcher,
            extractor,
            fetch_timeout,
        }
    }

    /// Never fails the caller: fetch and parse problems come back as an [`ExtractionFailure`].
    pub async fn probe(&self, url: &str) -> ExtractionResult {
        let page = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(url)).await {
            Ok(page) => page?,
            // The blocking render may keep running; its result is discarded
            Err(_) => return Err(ExtractionFailure::Timeout(self.fetch_timeout.as_secs())),
        };

        tracing::debug!(
            url,
            final_url = %page.final_url,
            response_time_ms = page.response_time_ms,
            "Page rendered"
        );
        self.extract_page(&page)
    }

    pub fn extract_page(&self, page: &RenderedPage) -> ExtractionResult {
        let document = page.document();
        self.extractor.extract(&page.text, &document)
    }
}
