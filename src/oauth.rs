//! OAuth 1.0a request signing (HMAC-SHA1, RFC 5849).

use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::Rng;
use sha1::Sha1;

use crate::error::{BotError, Result};

/// RFC 3986 unreserved characters stay as they are; everything else is encoded.
const OAUTH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[redacted]")
            .field("api_secret", &"[redacted]")
            .field("access_token", &"[redacted]")
            .field("access_token_secret", &"[redacted]")
            .finish()
    }
}

impl Credentials {
    /// Reads the four values from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Each entry lists the accepted variable names, preferred first.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        const NAMES: [&[&str]; 4] = [
            &["TWITTER_API_KEY"],
            &["TWITTER_API_SECRET", "TWITTER_API_KEY_SECRET"],
            &["TWITTER_ACCESS_TOKEN"],
            &["TWITTER_ACCESS_TOKEN_SECRET", "TWITTER_ACCESS_SECRET"],
        ];

        let mut missing = Vec::new();
        let mut values = Vec::with_capacity(4);
        for names in NAMES {
            let value = names
                .iter()
                .filter_map(|n| lookup(n))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty());
            match value {
                Some(v) => values.push(v),
                None => missing.push(names[0]),
            }
        }

        if !missing.is_empty() {
            return Err(BotError::MissingCredentials(missing));
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            api_key: next(),
            api_secret: next(),
            access_token: next(),
            access_token_secret: next(),
        })
    }
}

pub fn encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE).to_string()
}

pub fn nonce() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// `Authorization` header for a request to `url` (without query string).
///
/// `params` holds the query and form parameters that take part in the
/// signature; JSON and multipart bodies contribute none.
pub fn authorization_header(
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    credentials: &Credentials,
    nonce: &str,
    timestamp: &str,
) -> String {
    let oauth_params = [
        ("oauth_consumer_key", credentials.api_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];

    let mut all: Vec<(String, String)> = oauth_params
        .iter()
        .chain(params.iter())
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    all.sort();

    let param_string = all
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&param_string)
    );
    let signature = sign(&base, &credentials.api_secret, &credentials.access_token_secret);

    let header_params = oauth_params
        .iter()
        .map(|(k, v)| (*k, (*v).to_string()))
        .chain(std::iter::once(("oauth_signature", signature)))
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(&v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {header_params}")
}

fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    // HMAC accepts keys of any length.
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes()).expect("HMAC takes any key size");
    mac.update(base.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}
