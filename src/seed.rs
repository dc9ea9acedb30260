use std::path::Path;
use validator::Validate;

use crate::config::SeedConfig;
use crate::models::{NewProduct, Product};
use crate::store::ProductStore;
use crate::Result;

/// One URL per non-blank line.
pub fn parse_links(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `<name> <price>` per line. Names are lowercased; a repeated name keeps its first position
/// and takes the last price. Lines without a whole-number price are skipped.
pub fn parse_prices(raw: &str) -> Vec<(String, i64)> {
    let mut prices: Vec<(String, i64)> = Vec::new();

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((name, price)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let Ok(price) = price.trim().parse::<i64>() else {
            tracing::debug!(line, "Skipping price line");
            continue;
        };

        let name = name.to_lowercase();
        match prices.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = price,
            None => prices.push((name, price)),
        }
    }

    prices
}

/// Pairs the i-th link with the i-th price entry. Links past the end of the price list get a
/// placeholder name and no price, so they are dropped.
pub fn pair_seed(links: &[String], prices: &[(String, i64)]) -> Vec<NewProduct> {
    links
        .iter()
        .enumerate()
        .filter_map(|(i, url)| {
            let (name, reference_price) = match prices.get(i) {
                Some((name, price)) => (name.clone(), *price),
                None => (format!("product_{}", i), 0),
            };
            (reference_price > 0).then(|| NewProduct {
                name,
                url: url.clone(),
                reference_price,
            })
        })
        .collect()
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Fills an empty store from the seed files. Returns how many products were inserted.
pub async fn seed_if_empty(store: &dyn ProductStore, config: &SeedConfig) -> Result<usize> {
    if store.count().await? > 0 {
        return Ok(0);
    }

    let (Some(links), Some(prices)) = (
        read_optional(&config.links_file).await?,
        read_optional(&config.prices_file).await?,
    ) else {
        tracing::info!(
            links = %config.links_file.display(),
            prices = %config.prices_file.display(),
            "Seed files not found, starting with an empty product list"
        );
        return Ok(0);
    };

    let links = parse_links(&links);
    let prices = parse_prices(&prices);
    if links.is_empty() || prices.is_empty() {
        tracing::info!("Seed files are empty, nothing to import");
        return Ok(0);
    }

    let mut inserted = 0;
    for new_product in pair_seed(&links, &prices) {
        let new_product = new_product.normalized();
        if let Err(e) = new_product.validate() {
            tracing::warn!(product = %new_product.name, error = %e, "Skipping invalid seed entry");
            continue;
        }
        store.insert(&Product::new(new_product)).await?;
        inserted += 1;
    }

    tracing::info!(inserted, "Product list seeded from files");
    Ok(inserted)
}
