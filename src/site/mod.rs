//! Static storefront generation and post-processing of published pages.

pub mod export;
pub mod pages;
pub mod templates;
pub mod theme;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{BotError, Result};
use crate::feed::Product;
use crate::slug::{self, SlugRegistry};

use pages::Entry;
use templates::Layout;

pub const SLUGS_CSV: &str = "products_slugs.csv";

/// A product category and the feed positions of its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub slug: String,
    pub members: Vec<usize>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub products: usize,
    pub categories: usize,
}

/// Product slugs in feed order, unique within the catalog.
pub fn assign_slugs(products: &[Product]) -> Vec<Entry<'_>> {
    let mut registry = SlugRegistry::new();
    products
        .iter()
        .map(|product| Entry {
            product,
            slug: registry.claim(slug::product_slug(&product.title, &product.sku)),
        })
        .collect()
}

/// Categories sorted by name.
pub fn group_categories(products: &[Product]) -> Vec<Category> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, product) in products.iter().enumerate() {
        groups.entry(product.category.as_str()).or_default().push(i);
    }

    let mut registry = SlugRegistry::new();
    groups
        .into_iter()
        .enumerate()
        .map(|(n, (name, members))| {
            let base = slug::slugify(name);
            let base = if base.is_empty() {
                format!("category-{}", n + 1)
            } else {
                base
            };
            Category {
                name: name.to_string(),
                slug: registry.claim(base),
                members,
            }
        })
        .collect()
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    fs::write(path, html).map_err(|e| BotError::io(path.display().to_string(), e))?;
    debug!(page = %path.display(), "wrote page");
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| BotError::io(path.display().to_string(), e))
}

/// Writes the whole storefront into `out_dir`.
pub fn build(config: &Config, products: &[Product], out_dir: &Path) -> Result<BuildReport> {
    if products.is_empty() {
        return Err(BotError::EmptyFeed);
    }

    let entries = assign_slugs(products);
    let categories = group_categories(products);
    let layout = Layout::new(config, &categories);

    let products_dir = out_dir.join("products");
    let categories_dir = out_dir.join("categories");
    create_dir(&products_dir)?;
    create_dir(&categories_dir)?;

    for category in &categories {
        for &i in &category.members {
            let entry = &entries[i];
            let html = pages::product_page(config, &layout, entry, category);
            write_page(&products_dir.join(format!("{}.html", entry.slug)), &html)?;
        }

        let members: Vec<Entry<'_>> = category
            .members
            .iter()
            .map(|&i| Entry {
                product: entries[i].product,
                slug: entries[i].slug.clone(),
            })
            .collect();
        let html = pages::category_page(config, &layout, category, &members);
        write_page(&categories_dir.join(format!("{}.html", category.slug)), &html)?;
    }

    write_page(
        &out_dir.join("categories.html"),
        &pages::categories_page(config, &layout, &categories),
    )?;
    write_page(
        &out_dir.join("index.html"),
        &pages::index_page(config, &layout, &entries),
    )?;
    export::export_slugs_csv(config, &entries, &out_dir.join(SLUGS_CSV))?;

    let report = BuildReport {
        products: entries.len(),
        categories: categories.len(),
    };
    info!(
        products = report.products,
        categories = report.categories,
        out = %out_dir.display(),
        "site built"
    );
    Ok(report)
}

/// Writes only the slug listing, e.g. to check links before publishing.
pub fn write_slugs(config: &Config, products: &[Product], out_dir: &Path) -> Result<usize> {
    if products.is_empty() {
        return Err(BotError::EmptyFeed);
    }
    create_dir(out_dir)?;
    let entries = assign_slugs(products);
    export::export_slugs_csv(config, &entries, &out_dir.join(SLUGS_CSV))?;
    info!(products = entries.len(), "slug listing written");
    Ok(entries.len())
}
