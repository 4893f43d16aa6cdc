use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BotError, Result};
use crate::selector::Selection;

/// Persisted posting cursor.
///
/// `last_index` drives the rotating policy; `posted_products` and
/// `cycle_count` drive the random policy. The monthly counter is shared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    #[serde(default, alias = "lastIndex")]
    pub last_index: Option<usize>,
    #[serde(default)]
    pub posted_products: Vec<String>,
    #[serde(default)]
    pub current_month: String,
    #[serde(default)]
    pub posts_this_month: u32,
    #[serde(default)]
    pub cycle_count: u32,
}

pub fn month_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

impl TrackingState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current_month: month_key(now),
            ..Self::default()
        }
    }

    /// Reads the state at `path`, or a fresh one when the file is absent.
    ///
    /// Crossing into a new month resets the monthly counter. A file that
    /// does not parse is an error; it is never overwritten here.
    pub fn load(path: impl AsRef<Path>, now: DateTime<Utc>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no tracking file yet, starting fresh");
            return Ok(Self::new(now));
        }

        let text = fs::read_to_string(path).map_err(|e| BotError::io(path.display().to_string(), e))?;
        let mut state: Self =
            serde_json::from_str(&text).map_err(|e| BotError::json(path.display().to_string(), e))?;
        state.roll_month(now);
        Ok(state)
    }

    fn roll_month(&mut self, now: DateTime<Utc>) {
        let month = month_key(now);
        if self.current_month != month {
            debug!(from = %self.current_month, to = %month, "new month, resetting post counter");
            self.current_month = month;
            self.posts_this_month = 0;
        }
    }

    pub fn quota_reached(&self, quota: Option<u32>) -> bool {
        quota.is_some_and(|q| self.posts_this_month >= q)
    }

    /// Records a successful post of `selection`.
    pub fn advance(&mut self, selection: &Selection) {
        self.last_index = Some(selection.index);
        if !self.posted_products.contains(&selection.product_id) {
            self.posted_products.push(selection.product_id.clone());
        }
        self.posts_this_month += 1;
    }

    /// Writes the state next to `path` and renames it into place.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| BotError::json("tracking state", e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| BotError::io(dir.display().to_string(), e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| BotError::io(tmp.path().display().to_string(), e))?;
        tmp.persist(path)
            .map_err(|e| BotError::io(path.display().to_string(), e.error))?;
        Ok(())
    }
}

/// Exclusive lock file held for the whole read-modify-write of a run.
#[derive(Debug)]
pub struct TrackerLock {
    path: PathBuf,
}

impl TrackerLock {
    pub fn acquire(state_path: impl AsRef<Path>) -> Result<Self> {
        let mut path = state_path.as_ref().as_os_str().to_owned();
        path.push(".lock");
        let path = PathBuf::from(path);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => BotError::Lock(path.display().to_string()),
                _ => BotError::io(path.display().to_string(), e),
            })?;
        // The pid only helps a human clean up a stale lock.
        let _ = writeln!(file, "{}", std::process::id());

        Ok(Self { path })
    }
}

impl Drop for TrackerLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
