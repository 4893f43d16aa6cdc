use std::io::{Read, Seek, SeekFrom, Write};
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::TwitterConfig;
use crate::error::{BotError, Result};
use crate::oauth::{self, Credentials};

/// Refuse anything bigger than the API accepts for a still image.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedTweet {
    pub id: String,
    pub text: String,
}

#[derive(Deserialize)]
struct TweetResponseWrapper {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
}

/// A product image held in a temporary file, removed when dropped.
pub struct DownloadedImage {
    file: NamedTempFile,
    pub mime: String,
    len: u64,
}

impl DownloadedImage {
    pub fn bytes(&mut self) -> Result<Vec<u8>> {
        let path = self.file.path().display().to_string();
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(0)).map_err(|e| BotError::io(&path, e))?;

        let mut data = Vec::with_capacity(self.len as usize);
        file.read_to_end(&mut data).map_err(|e| BotError::io(&path, e))?;
        Ok(data)
    }
}

pub fn http_client(timeout_secs: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("storefront-bot/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

fn mime_from_url(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    if path.ends_with(".png") {
        "image/png"
    } else if path.ends_with(".gif") {
        "image/gif"
    } else if path.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Streams the image at `url` into a temporary file.
pub async fn download_image(client: &Client, url: &str) -> Result<DownloadedImage> {
    let mut response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(BotError::HttpStatus {
            status: response.status(),
            url: url.to_string(),
        });
    }

    let mime = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().trim().to_string())
        .filter(|v| v.starts_with("image/"))
        .unwrap_or_else(|| mime_from_url(url).to_string());

    let mut file = NamedTempFile::new().map_err(|e| BotError::io("temporary image", e))?;
    let mut len = 0u64;
    while let Some(chunk) = response.chunk().await? {
        len += chunk.len() as u64;
        if len > MAX_IMAGE_BYTES {
            return Err(BotError::ImageTooLarge {
                url: url.to_string(),
                limit: MAX_IMAGE_BYTES,
            });
        }
        file.write_all(&chunk)
            .map_err(|e| BotError::io(file.path().display().to_string(), e))?;
    }

    debug!(bytes = len, %mime, path = %file.path().display(), "downloaded product image");
    Ok(DownloadedImage { file, mime, len })
}

/// Client for the X/Twitter API, signed with OAuth 1.0a user credentials.
#[derive(Clone)]
pub struct TwitterClient {
    http: Client,
    credentials: Credentials,
    api_base: String,
    upload_base: String,
}

impl TwitterClient {
    pub fn new(http: Client, credentials: Credentials, config: &TwitterConfig) -> Self {
        Self {
            http,
            credentials,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
        }
    }

    fn authorization(&self, method: &str, url: &str) -> String {
        oauth::authorization_header(
            method,
            url,
            &[],
            &self.credentials,
            &oauth::nonce(),
            &oauth::timestamp(),
        )
    }

    /// Uploads an image and returns its media id.
    pub async fn upload_media(&self, data: Vec<u8>, mime: &str) -> Result<String> {
        let url = format!("{}/1.1/media/upload.json", self.upload_base);

        let part = reqwest::multipart::Part::bytes(data)
            .file_name("product")
            .mime_str(mime)
            .map_err(|e| BotError::Config(format!("invalid mime type {mime}: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("media_category", "tweet_image")
            .part("media", part);

        let resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.authorization("POST", &url))
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(BotError::PostRejected { status, body });
        }

        let parsed: MediaUploadResponse =
            serde_json::from_str(&body).map_err(|e| BotError::json("media upload response", e))?;
        info!(media_id = %parsed.media_id_string, "uploaded product image");
        Ok(parsed.media_id_string)
    }

    /// Publishes `text`, attaching `media_ids` when there are any.
    pub async fn create_post(&self, text: &str, media_ids: &[String]) -> Result<PostedTweet> {
        let url = format!("{}/2/tweets", self.api_base);

        let mut body = serde_json::json!({ "text": text });
        if !media_ids.is_empty() {
            body["media"] = serde_json::json!({ "media_ids": media_ids });
        }

        let resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.authorization("POST", &url))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            return Err(BotError::PostRejected { status, body: raw });
        }

        let wrapper: TweetResponseWrapper =
            serde_json::from_str(&raw).map_err(|e| BotError::json("create post response", e))?;
        let text = if wrapper.data.text.is_empty() {
            text.to_string()
        } else {
            wrapper.data.text
        };

        Ok(PostedTweet {
            id: wrapper.data.id,
            text,
        })
    }
}
