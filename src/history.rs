use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, params};

use crate::error::Result;

// One posted message, newest first when listed
#[derive(Debug, PartialEq)]
pub struct PostRecord {
    pub tweet_id: String,
    pub product_id: String,
    pub text: String,
    pub posted_at: String,
}

// Initialize database and tables
pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;

        -- Successful posts
        CREATE TABLE IF NOT EXISTS posts (
            tweet_id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL,
            text TEXT NOT NULL,
            posted_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_product
            ON posts (product_id);

        -- Product images that recently failed to download or upload
        CREATE TABLE IF NOT EXISTS image_failures (
            image_url TEXT PRIMARY KEY,
            last_error_at TEXT NOT NULL,
            retry_after TEXT NOT NULL,
            error_message TEXT
        );
        ",
    )?;

    Ok(())
}

pub fn record_post(
    conn: &Connection,
    tweet_id: &str,
    product_id: &str,
    text: &str,
    posted_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "
        INSERT OR REPLACE INTO posts (tweet_id, product_id, text, posted_at)
        VALUES (?1, ?2, ?3, ?4)
        ",
        params![tweet_id, product_id, text, posted_at.to_rfc3339()],
    )?;

    Ok(())
}

pub fn recent_posts(conn: &Connection, limit: usize) -> Result<Vec<PostRecord>> {
    let mut stmt = conn.prepare(
        "
        SELECT tweet_id, product_id, text, posted_at
        FROM posts
        ORDER BY posted_at DESC
        LIMIT ?1
        ",
    )?;

    let rows = stmt.query_map([limit as i64], |row| {
        Ok(PostRecord {
            tweet_id: row.get(0)?,
            product_id: row.get(1)?,
            text: row.get(2)?,
            posted_at: row.get(3)?,
        })
    })?;

    let mut records = Vec::new();
    for record in rows {
        records.push(record?);
    }

    Ok(records)
}

pub fn register_image_failure(
    conn: &Connection,
    image_url: &str,
    message: &str,
    retry_days: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    let retry_after = now + Duration::days(retry_days);

    conn.execute(
        "
        INSERT INTO image_failures (image_url, last_error_at, retry_after, error_message)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(image_url) DO UPDATE SET
            last_error_at = excluded.last_error_at,
            retry_after = excluded.retry_after,
            error_message = excluded.error_message
        ",
        params![image_url, now.to_rfc3339(), retry_after.to_rfc3339(), message],
    )?;

    Ok(())
}

// True while the image is inside its back-off window
pub fn should_skip_image(conn: &Connection, image_url: &str, now: DateTime<Utc>) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT retry_after FROM image_failures WHERE image_url = ?1")?;
    let mut rows = stmt.query([image_url])?;

    if let Some(row) = rows.next()? {
        let retry_after: String = row.get(0)?;
        // An unreadable timestamp just means the image gets another try.
        if let Ok(retry_time) = DateTime::parse_from_rfc3339(&retry_after) {
            return Ok(now < retry_time.with_timezone(&Utc));
        }
    }

    Ok(false)
}
