use reqwest::StatusCode;
use thiserror::Error;

/// Every failure the bot and the site builder can report.
///
/// Transient network problems around images, the sitemap and the shortener
/// are logged and swallowed by their callers; everything that reaches `main`
/// ends the run with a nonzero exit code.
#[derive(Debug, Error)]
pub enum BotError {
    /// The configuration file is missing a value or holds an invalid one.
    #[error("config error: {0}")]
    Config(String),

    /// One or more of the four posting credentials is not set.
    #[error("missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("product feed is empty")]
    EmptyFeed,

    /// Another run holds the tracker lock file.
    #[error("tracker is locked by another run: {0}")]
    Lock(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Network or TLS failure from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} {url}")]
    HttpStatus { status: StatusCode, url: String },

    /// A downloaded image exceeded the size the posting API accepts.
    #[error("image larger than {limit} bytes: {url}")]
    ImageTooLarge { url: String, limit: u64 },

    /// The posting API answered with a non-success status.
    #[error("post rejected with {status}: {body}")]
    PostRejected { status: StatusCode, body: String },
}

impl BotError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
