//! Price extraction over a rendered page.
//!
//! Extraction runs an ordered chain of strategies. Text patterns that carry an explicit
//! currency marker come first; structural selector queries are only consulted when none of
//! the patterns produced a plausible value. Every candidate is reduced to its digits and has
//! to land inside [`PlausibilityBound`] before it is accepted, which keeps ratings, review
//! counts and article numbers out of the result.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Closed interval of values accepted as a real price, in roubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlausibilityBound {
    pub min: i64,
    pub max: i64,
}

pub const DEFAULT_BOUND: PlausibilityBound = PlausibilityBound {
    min: 1_000,
    max: 500_000,
};

impl PlausibilityBound {
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl Default for PlausibilityBound {
    fn default() -> Self {
        DEFAULT_BOUND
    }
}

/// Why a product yielded no price. Never escalated beyond the product being checked.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("browser unavailable: {0}")]
    Browser(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("page not ready after {0}s")]
    Timeout(u64),

    #[error("page render failed: {0}")]
    Render(String),

    #[error("no plausible price on page")]
    NoPlausiblePrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    TextPattern,
    Structural,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceMatch {
    pub price: i64,
    pub strategy: StrategyKind,
    /// Pattern name or CSS selector that produced the price.
    pub source: String,
}

pub type ExtractionResult = Result<PriceMatch, ExtractionFailure>;

/// Structural access to a page: element texts for a CSS selector, in document order.
pub trait ElementQuery {
    fn query(&self, selector: &str) -> Result<Vec<String>, String>;
}

#[derive(Debug, Clone)]
pub enum Strategy {
    TextPattern { name: &'static str, pattern: Regex },
    Structural { selector: String },
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::TextPattern { .. } => StrategyKind::TextPattern,
            Strategy::Structural { .. } => StrategyKind::Structural,
        }
    }
}

fn currency_pattern(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("built-in price pattern must compile")
}

static NUMBER_BEFORE_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| currency_pattern(r"(\d{1,3}\s?\d{3}\s?\d{0,3})\s?₽"));
static SYMBOL_BEFORE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| currency_pattern(r"₽\s*(\d{1,3}\s?\d{3}\s?\d{0,3})"));
static NUMBER_CURRENCY_WORD: LazyLock<Regex> =
    LazyLock::new(|| currency_pattern(r"(\d{4,6})\s*руб"));

pub const DEFAULT_SELECTORS: [&str; 7] = [
    "span[class*='price']",
    "div[class*='price']",
    "span[class*='cost']",
    "div[class*='cost']",
    "[data-widget*='price']",
    ".c311-a1",
    ".a3214",
];

pub fn default_strategies() -> Vec<Strategy> {
    let mut strategies = vec![
        Strategy::TextPattern {
            name: "number_before_symbol",
            pattern: Regex::clone(&NUMBER_BEFORE_SYMBOL),
        },
        Strategy::TextPattern {
            name: "symbol_before_number",
            pattern: Regex::clone(&SYMBOL_BEFORE_NUMBER),
        },
        Strategy::TextPattern {
            name: "number_currency_word",
            pattern: Regex::clone(&NUMBER_CURRENCY_WORD),
        },
    ];
    strategies.extend(DEFAULT_SELECTORS.iter().map(|selector| Strategy::Structural {
        selector: selector.to_string(),
    }));
    strategies
}

/// Keeps only ASCII digits; `None` when nothing numeric is left or the value overflows.
pub fn digits_only(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[derive(Debug, Clone)]
pub struct PriceExtractor {
    strategies: Vec<Strategy>,
    bound: PlausibilityBound,
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceExtractor {
    pub fn new() -> Self {
        Self::with_strategies(default_strategies(), DEFAULT_BOUND)
    }

    pub fn with_strategies(strategies: Vec<Strategy>, bound: PlausibilityBound) -> Self {
        Self { strategies, bound }
    }

    pub fn bound(&self) -> PlausibilityBound {
        self.bound
    }

    pub fn extract(&self, page_text: &str, query: &dyn ElementQuery) -> ExtractionResult {
        // Text strategies are tried before structural ones regardless of declaration order
        let text_first = self
            .strategies
            .iter()
            .filter(|s| s.kind() == StrategyKind::TextPattern)
            .chain(self.strategies.iter().filter(|s| s.kind() == StrategyKind::Structural));

        for strategy in text_first {
            let found = match strategy {
                Strategy::TextPattern { name, pattern } => self
                    .match_pattern(pattern, page_text)
                    .map(|price| (price, name.to_string())),
                Strategy::Structural { selector } => self
                    .match_selector(selector, query)
                    .map(|price| (price, selector.clone())),
            };

            if let Some((price, source)) = found {
                tracing::debug!(price, source = %source, "Price candidate accepted");
                return Ok(PriceMatch {
                    price,
                    strategy: strategy.kind(),
                    source,
                });
            }
        }

        Err(ExtractionFailure::NoPlausiblePrice)
    }

    fn match_pattern(&self, pattern: &Regex, page_text: &str) -> Option<i64> {
        pattern
            .captures_iter(page_text)
            .filter_map(|captures| captures.get(1))
            .filter_map(|group| digits_only(group.as_str()))
            .find(|price| self.bound.contains(*price))
    }

    fn match_selector(&self, selector: &str, query: &dyn ElementQuery) -> Option<i64> {
        let texts = match query.query(selector) {
            Ok(texts) => texts,
            Err(e) => {
                tracing::debug!(selector, error = %e, "Skipping unusable selector");
                return None;
            }
        };

        texts
            .iter()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .filter_map(digits_only)
            .find(|price| self.bound.contains(*price))
    }
}
