use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::io::lock::{DEFAULT_WAIT, KeyLock};
use crate::io::storage::atomic_write;

/// Log size above which the next append trims old entries
const MAX_LOG_SIZE: u64 = 1_048_576;

/// Entries younger than this survive a trim unless the log is still too big
pub const PRUNE_AGE_DAYS: i64 = 30;

/// Why a payload was set aside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryCategory {
    /// A stored value failed to decode and was set aside
    Decode,
    /// A write to storage failed; the body is what should have been written
    Write,
    /// Records removed by an explicit delete
    Delete,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryCategory::Decode => write!(f, "decode"),
            RecoveryCategory::Write => write!(f, "write"),
            RecoveryCategory::Delete => write!(f, "delete"),
        }
    }
}

/// One line of the recovery log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    /// Storage key the body belongs to
    pub key: String,
    pub description: String,
    #[serde(default)]
    pub body: String,
}

impl RecoveryEntry {
    pub fn new(category: RecoveryCategory, key: &str, description: String, body: String) -> Self {
        RecoveryEntry {
            timestamp: Utc::now(),
            category,
            key: key.to_string(),
            description,
            body,
        }
    }
}

/// The log lives next to the stored keys, one JSON object per line
pub fn recovery_log_path(dir: &Path) -> PathBuf {
    dir.join(".recovery.log")
}

/// Append an entry to the log. Failures are logged and otherwise ignored.
pub fn log_recovery(dir: &Path, entry: RecoveryEntry) {
    if let Err(e) = append_entry(dir, &entry) {
        tracing::warn!(error = %e, key = %entry.key, "could not write to recovery log");
    }
}

fn append_entry(dir: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    let _lock = KeyLock::acquire(dir, "recovery.log", DEFAULT_WAIT).map_err(io::Error::other)?;
    let path = recovery_log_path(dir);
    let existing = match std::fs::read(&path) {
        Ok(bytes) => parse_entries(&String::from_utf8_lossy(&bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e),
    };
    if repeats_latest(&existing, entry) {
        tracing::debug!(key = %entry.key, category = %entry.category, "payload already set aside");
        return Ok(());
    }

    if std::fs::metadata(&path).is_ok_and(|m| m.len() > MAX_LOG_SIZE) {
        let cutoff = Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS);
        let before = existing.len();
        let kept = trim_entries(existing, cutoff, MAX_LOG_SIZE / 2);
        tracing::info!(dropped = before - kept.len(), "trimmed recovery log");
        let mut text = String::new();
        for e in &kept {
            text.push_str(&serde_json::to_string(e)?);
            text.push('\n');
        }
        atomic_write(&path, text.as_bytes())?;
    }

    let mut line = serde_json::to_string(entry)?;
    line.push('\n');
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(line.as_bytes())
}

/// True when the newest entry for the same key already holds this payload
fn repeats_latest(entries: &[RecoveryEntry], entry: &RecoveryEntry) -> bool {
    entries
        .iter()
        .rev()
        .find(|e| e.key == entry.key)
        .is_some_and(|last| last.category == entry.category && last.body == entry.body)
}

/// Drop entries older than `cutoff`, then the oldest of the rest until the
/// serialized log fits in `max_bytes`
fn trim_entries(
    entries: Vec<RecoveryEntry>,
    cutoff: DateTime<Utc>,
    max_bytes: u64,
) -> Vec<RecoveryEntry> {
    let mut kept: Vec<(u64, RecoveryEntry)> = entries
        .into_iter()
        .filter(|e| e.timestamp >= cutoff)
        .map(|e| {
            let size = serde_json::to_string(&e).map_or(0, |s| s.len() as u64 + 1);
            (size, e)
        })
        .collect();
    let mut total: u64 = kept.iter().map(|(size, _)| size).sum();
    let mut first = 0;
    while total > max_bytes && first < kept.len() {
        total -= kept[first].0;
        first += 1;
    }
    kept.drain(..first);
    kept.into_iter().map(|(_, e)| e).collect()
}

/// Read entries from the log, most recent first, keeping at most `limit`.
/// Lines that do not parse are skipped.
pub fn read_recovery_entries(dir: &Path, limit: Option<usize>) -> Vec<RecoveryEntry> {
    let content = match std::fs::read_to_string(recovery_log_path(dir)) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    let mut entries = parse_entries(&content);
    entries.reverse();
    if let Some(n) = limit {
        entries.truncate(n);
    }
    entries
}

fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable recovery log line");
                None
            }
        })
        .collect()
}
