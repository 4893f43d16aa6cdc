use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::{BotError, Result};

pub const DEFAULT_TITLE: &str = "منتج";
pub const DEFAULT_CATEGORY: &str = "منتجات متنوعة";

/// One product of the storefront, normalised from the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub title: String,
    pub sku: String,
    /// Current selling price.
    pub price: f64,
    /// Price before the discount, when the feed carries one.
    pub old_price: Option<f64>,
    pub image: Option<String>,
    pub category: String,
    pub description: String,
}

// Feed exports from different tools disagree on field names, so every
// spelling is read separately and the first non-empty one wins.
#[derive(Debug, Deserialize)]
struct RawProduct {
    title: Option<String>,
    name: Option<String>,
    sku: Option<Value>,
    id: Option<Value>,
    price: Option<Value>,
    sale_price: Option<Value>,
    old_price: Option<Value>,
    compare_at_price: Option<Value>,
    image: Option<String>,
    image_link: Option<String>,
    image_url: Option<String>,
    category: Option<String>,
    description: Option<String>,
}

impl RawProduct {
    fn normalize(self, index: usize) -> Product {
        let title = first_text([self.title, self.name]).unwrap_or_else(|| DEFAULT_TITLE.into());
        let sku = [self.sku, self.id]
            .into_iter()
            .flatten()
            .find_map(|v| value_text(&v))
            .unwrap_or_else(|| format!("PRD-{}", index + 1));

        let price = self.price.as_ref().and_then(number);
        let sale_price = self.sale_price.as_ref().and_then(number);
        let explicit_old = self
            .old_price
            .as_ref()
            .or(self.compare_at_price.as_ref())
            .and_then(number);

        // Older feeds store the list price in `price` and the selling
        // price in `sale_price`.
        let (price, old_price) = match (price, sale_price) {
            (Some(list), Some(sale)) => (sale, explicit_old.or(Some(list))),
            (Some(p), None) => (p, explicit_old),
            (None, Some(sale)) => (sale, explicit_old),
            (None, None) => (0.0, explicit_old),
        };

        Product {
            title,
            sku,
            price,
            old_price,
            image: first_text([self.image, self.image_link, self.image_url]),
            category: first_text([self.category]).unwrap_or_else(|| DEFAULT_CATEGORY.into()),
            description: self.description.unwrap_or_default().trim().to_string(),
        }
    }
}

fn first_text<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts JSON numbers and numeric strings such as `"73,400"`.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && *c != ',')
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    }
}

pub fn parse_products(text: &str) -> Result<Vec<Product>> {
    let raw: Vec<RawProduct> =
        serde_json::from_str(text).map_err(|e| BotError::json("product feed", e))?;

    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(index, product)| product.normalize(index))
        .collect())
}

pub fn load_products(path: impl AsRef<Path>) -> Result<Vec<Product>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| BotError::io(path.display().to_string(), e))?;
    let products = parse_products(&text)?;

    info!(count = products.len(), path = %path.display(), "loaded product feed");
    Ok(products)
}
