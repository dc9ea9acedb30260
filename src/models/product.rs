use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::generate_id;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Our own selling price, the baseline competitors are compared against.
    pub reference_price: i64,

    // Only ever written from a successful extraction
    pub last_observed_price: Option<i64>,
    pub last_checked_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(url(message = "url must be an absolute URL"))]
    pub url: String,
    #[validate(range(min = 1, message = "reference_price must be greater than 0"))]
    pub reference_price: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProduct {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(url(message = "url must be an absolute URL"))]
    pub url: Option<String>,
    #[validate(range(min = 1, message = "reference_price must be greater than 0"))]
    pub reference_price: Option<i64>,
}

impl NewProduct {
    /// Trims surrounding whitespace the way form input usually arrives.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            url: self.url.trim().to_string(),
            reference_price: self.reference_price,
        }
    }
}

impl UpdateProduct {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|name| name.trim().to_string()),
            url: self.url.map(|url| url.trim().to_string()),
            reference_price: self.reference_price,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.url.is_none() && self.reference_price.is_none()
    }
}

impl Product {
    pub fn new(new_product: NewProduct) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            name: new_product.name,
            url: new_product.url,
            reference_price: new_product.reference_price,
            last_observed_price: None,
            last_checked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update(&mut self, update: UpdateProduct) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(url) = update.url {
            self.url = url;
        }
        if let Some(reference_price) = update.reference_price {
            self.reference_price = reference_price;
        }

        self.updated_at = Utc::now();
    }
}
