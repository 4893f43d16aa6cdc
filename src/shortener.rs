use reqwest::Client;
use tracing::{info, warn};

use crate::error::{BotError, Result};

/// Asks `endpoint` (`GET {endpoint}?url=…`, plain-text answer) for a short link.
pub async fn shorten(client: &Client, endpoint: &str, long_url: &str) -> Result<String> {
    let response = client.get(endpoint).query(&[("url", long_url)]).send().await?;

    if !response.status().is_success() {
        return Err(BotError::HttpStatus {
            status: response.status(),
            url: endpoint.to_string(),
        });
    }

    let short = response.text().await?.trim().to_string();
    if !short.starts_with("http") {
        return Err(BotError::Config(format!(
            "shortener returned something other than a URL: {short}"
        )));
    }

    Ok(short)
}

/// Short link when an endpoint is configured and answers, the long one otherwise.
pub async fn shorten_or_keep(client: &Client, endpoint: Option<&str>, long_url: &str) -> String {
    let Some(endpoint) = endpoint else {
        return long_url.to_string();
    };

    match shorten(client, endpoint, long_url).await {
        Ok(short) => {
            info!(%short, "shortened product link");
            short
        }
        Err(e) => {
            warn!(error = %e, "shortener failed, using the full link");
            long_url.to_string()
        }
    }
}
