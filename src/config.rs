use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BotError, Result};
use crate::selector::SelectionPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Public root of the storefront, e.g. `https://shop.example.com`.
    pub base_url: String,
    #[serde(default = "default_store_name")]
    pub store_name: String,
    #[serde(default)]
    pub whatsapp_number: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// ISO 4217 code used in structured data.
    #[serde(default = "default_currency_code")]
    pub currency_code: String,
    #[serde(default = "default_products_path")]
    pub products_path: PathBuf,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_history_db")]
    pub history_db: PathBuf,
    #[serde(default)]
    pub selection: SelectionPolicy,
    /// Posts allowed per calendar month; `None` means unlimited.
    #[serde(default)]
    pub monthly_quota: Option<u32>,
    /// Hashtags appended to every post after the title-derived ones.
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default = "default_hashtag_words")]
    pub hashtag_words: usize,
    #[serde(default)]
    pub resolve_via_sitemap: bool,
    #[serde(default)]
    pub shortener: Option<String>,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_visible_products")]
    pub visible_products: usize,
    /// Days to skip an image URL after its download or upload failed.
    #[serde(default = "default_image_retry_days")]
    pub image_retry_days: i64,
    #[serde(default)]
    pub twitter: TwitterConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_upload_base")]
    pub upload_base: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            upload_base: default_upload_base(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeConfig {
    /// Value of the `<base href>` tag; no tag is inserted when unset.
    #[serde(default)]
    pub base_href: Option<String>,
    #[serde(default)]
    pub relative_paths: bool,
    #[serde(default)]
    pub chatbot: bool,
}

fn default_store_name() -> String {
    "متجر نينجا العراق".into()
}

fn default_currency() -> String {
    "د.ع".into()
}

fn default_currency_code() -> String {
    "IQD".into()
}

fn default_products_path() -> PathBuf {
    "products.json".into()
}

fn default_state_path() -> PathBuf {
    "posted_products.json".into()
}

fn default_history_db() -> PathBuf {
    "bot.db".into()
}

fn default_hashtag_words() -> usize {
    3
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_visible_products() -> usize {
    24
}

fn default_image_retry_days() -> i64 {
    3
}

fn default_api_base() -> String {
    "https://api.twitter.com".into()
}

fn default_upload_base() -> String {
    "https://upload.twitter.com".into()
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn product_url(&self, slug: &str) -> String {
        format!("{}/products/{slug}.html", self.base_url())
    }

    fn validate(self) -> Result<Self> {
        if self.base_url.trim().is_empty() {
            return Err(BotError::Config("base_url must not be empty".into()));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(BotError::Config(format!(
                "base_url is not an absolute URL: {}",
                self.base_url
            )));
        }
        if self.visible_products == 0 {
            return Err(BotError::Config("visible_products must be positive".into()));
        }
        Ok(self)
    }
}

pub fn load(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| BotError::io(path.display().to_string(), e))?;
    parse(&text)
}

pub fn parse(text: &str) -> Result<Config> {
    let config: Config = serde_json::from_str(text).map_err(|e| BotError::json("config", e))?;
    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = parse(r#"{"base_url": "https://shop.example.com/"}"#).unwrap();

        assert_eq!(config.base_url(), "https://shop.example.com");
        assert_eq!(config.currency, "د.ع");
        assert_eq!(config.selection, SelectionPolicy::Rotate);
        assert_eq!(config.visible_products, 24);
        assert_eq!(config.twitter.api_base, "https://api.twitter.com");
        assert!(config.monthly_quota.is_none());
        assert!(config.theme.base_href.is_none());
    }

    #[test]
    fn product_url_uses_products_folder() {
        let config = parse(r#"{"base_url": "https://shop.example.com"}"#).unwrap();
        assert_eq!(
            config.product_url("قطاعة-خضار-a001147"),
            "https://shop.example.com/products/قطاعة-خضار-a001147.html"
        );
    }

    #[test]
    fn selection_policy_is_kebab_case() {
        let config = parse(
            r#"{"base_url": "https://shop.example.com", "selection": "random-cycle", "monthly_quota": 450}"#,
        )
        .unwrap();
        assert_eq!(config.selection, SelectionPolicy::RandomCycle);
        assert_eq!(config.monthly_quota, Some(450));
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let err = parse(r#"{"base_url": "shop.example.com"}"#).unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
    }

    #[test]
    fn missing_base_url_is_a_json_error() {
        let err = parse("{}").unwrap_err();
        assert!(matches!(err, BotError::Json { .. }));
    }
}
