//! # Cache Module
//!
//! On-disk cache of the usage API response, one file per session in the shared
//! temp dir. Freshness is judged by file mtime so nothing inside the body has to
//! be trusted for it.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::models::UsageSnapshot;
use crate::utils::sanitize_session_id;

/// How long a fetched response is reused before the API is asked again.
pub const CACHE_TTL_SECONDS: u64 = 60;
const CACHE_FILE_PREFIX: &str = "claude_usage_cache_";

#[derive(Debug, Clone)]
pub struct UsageCache {
    dir: PathBuf,
    ttl: Duration,
}

impl Default for UsageCache {
    fn default() -> Self {
        Self::new(std::env::temp_dir(), Duration::from_secs(CACHE_TTL_SECONDS))
    }
}

impl UsageCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// `<dir>/claude_usage_cache_<session>.json`, with the session id sanitized.
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!(
            "{CACHE_FILE_PREFIX}{}.json",
            sanitize_session_id(session_id)
        ))
    }

    /// Cached usage for `session_id` if the file is younger than the TTL and
    /// holds a valid usage document. Anything else is a miss.
    pub fn load_fresh(&self, session_id: &str) -> Option<UsageSnapshot> {
        let path = self.path_for(session_id);
        let age = file_age(&path)?;
        if age >= self.ttl {
            tracing::debug!("usage cache stale ({}s old)", age.as_secs());
            return None;
        }
        let raw = fs::read_to_string(&path).ok()?;
        let doc: Value = match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::debug!("usage cache corrupt, refetching: {err}");
                return None;
            }
        };
        let snapshot = UsageSnapshot::from_document(&doc);
        if snapshot.is_none() {
            tracing::debug!("usage cache lacks five_hour, refetching");
        }
        snapshot
    }

    /// Replace the cache file wholesale. The temp file is created owner-only
    /// (0600 on Unix) and renamed into place, so readers never see a partial body.
    pub fn store(&self, session_id: &str, doc: &Value) -> Result<PathBuf> {
        let path = self.path_for(session_id);
        let body = serde_json::to_vec(doc).context("serialize usage response")?;

        let mut tmp = tempfile::Builder::new()
            .prefix(CACHE_FILE_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .with_context(|| format!("create temp file in {}", self.dir.display()))?;
        tmp.write_all(&body).context("write usage cache")?;
        restrict_permissions(tmp.path())?;
        tmp.persist(&path)
            .with_context(|| format!("persist {}", path.display()))?;
        Ok(path)
    }
}

fn file_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    // A file stamped in the future counts as brand new.
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    )
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("chmod {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
