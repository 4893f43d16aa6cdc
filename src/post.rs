//! One run of the auto-poster: pick a product, compose, publish, persist.

use chrono::{DateTime, Utc};
use reqwest::Client;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::compose;
use crate::config::Config;
use crate::error::{BotError, Result};
use crate::feed::{self, Product};
use crate::history;
use crate::oauth::Credentials;
use crate::poster::{self, PostedTweet, TwitterClient};
use crate::selector;
use crate::shortener;
use crate::sitemap;
use crate::slug;
use crate::tracker::{TrackerLock, TrackingState};

#[derive(Debug, PartialEq, Eq)]
pub enum PostOutcome {
    Posted(PostedTweet),
    /// Composed but not sent; the tracker was left untouched.
    DryRun(String),
    QuotaReached { posts_this_month: u32 },
}

/// Hashtags for a product: title words, its category, then the fixed list.
pub fn hashtags_for(product: &Product, config: &Config) -> Vec<String> {
    let mut tags = slug::title_hashtags(&product.title, config.hashtag_words);
    tags.extend(slug::hashtag(&product.category));
    tags.extend(config.hashtags.iter().filter_map(|t| slug::hashtag(t.trim_start_matches('#'))));
    tags
}

async fn product_link(client: &Client, config: &Config, product: &Product) -> String {
    let slug = slug::product_slug(&product.title, &product.sku);
    let mut url = config.product_url(&slug);

    if config.resolve_via_sitemap {
        match sitemap::fetch_locations(client, config.base_url()).await {
            Ok(locations) => match sitemap::resolve_product_url(&locations, &slug, &product.sku) {
                Some(found) => url = found,
                None => warn!(%slug, "product not in sitemap, using the generated link"),
            },
            Err(e) => warn!(error = %e, "sitemap unavailable, using the generated link"),
        }
    }

    shortener::shorten_or_keep(client, config.shortener.as_deref(), &url).await
}

async fn attach_image(
    conn: &Connection,
    http: &Client,
    twitter: &TwitterClient,
    config: &Config,
    image_url: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>> {
    if history::should_skip_image(conn, image_url, now)? {
        info!(image_url, "image failed recently, posting without it");
        return Ok(None);
    }

    let uploaded = async {
        let mut image = poster::download_image(http, image_url).await?;
        let data = image.bytes()?;
        twitter.upload_media(data, &image.mime).await
    }
    .await;

    match uploaded {
        Ok(media_id) => Ok(Some(media_id)),
        Err(e) => {
            warn!(error = %e, image_url, "image unavailable, posting without it");
            history::register_image_failure(conn, image_url, &e.to_string(), config.image_retry_days, now)?;
            Ok(None)
        }
    }
}

/// Runs the poster once.
///
/// Without `credentials` the post is only composed and logged. The tracker
/// is advanced and saved only after the post was accepted.
pub async fn run(
    config: &Config,
    credentials: Option<Credentials>,
    now: DateTime<Utc>,
) -> Result<PostOutcome> {
    let products = feed::load_products(&config.products_path)?;
    if products.is_empty() {
        return Err(BotError::EmptyFeed);
    }

    let _lock = match credentials {
        Some(_) => Some(TrackerLock::acquire(&config.state_path)?),
        None => None,
    };

    let state = TrackingState::load(&config.state_path, now)?;
    if state.quota_reached(config.monthly_quota) {
        info!(
            posts = state.posts_this_month,
            quota = ?config.monthly_quota,
            "monthly quota reached, nothing to do"
        );
        return Ok(PostOutcome::QuotaReached {
            posts_this_month: state.posts_this_month,
        });
    }

    let (selection, mut next) =
        selector::select(config.selection, &state, &products, &mut rand::rng())?;
    let product = &products[selection.index];
    info!(
        title = %product.title,
        sku = %product.sku,
        position = selection.index + 1,
        total = products.len(),
        "selected product"
    );

    let http = poster::http_client(config.http_timeout_secs)?;
    let link = product_link(&http, config, product).await;
    let text = compose::compose(product, &link, &hashtags_for(product, config), &config.currency);
    info!(chars = text.chars().count(), "composed post:\n{text}");

    let Some(credentials) = credentials else {
        return Ok(PostOutcome::DryRun(text));
    };

    let conn = Connection::open(&config.history_db)?;
    history::init(&conn)?;

    let twitter = TwitterClient::new(http.clone(), credentials, &config.twitter);
    let mut media_ids = Vec::new();
    if let Some(image_url) = &product.image {
        if let Some(id) = attach_image(&conn, &http, &twitter, config, image_url, now).await? {
            media_ids.push(id);
        }
    }

    let posted = twitter.create_post(&text, &media_ids).await?;
    info!(id = %posted.id, "post published");

    next.advance(&selection);
    next.save(&config.state_path)?;
    // The post is already public; a missing audit row must not fail the run.
    if let Err(e) = history::record_post(&conn, &posted.id, &selection.product_id, &posted.text, now) {
        warn!(error = %e, id = %posted.id, "could not record the post in history");
    }

    Ok(PostOutcome::Posted(posted))
}
