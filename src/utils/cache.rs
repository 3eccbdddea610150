//! Published-report cache
//!
//! Remembers which station/date summaries were already published so a
//! scheduler retry or a manual `publish` does not emit duplicate beats.
//! DashMap keeps it lock-free for concurrent station runs. Entries can be
//! saved to and loaded from a JSON state file so separate `publish`
//! invocations see each other.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::models::errors::AppResult;
use crate::utils::constants::PUBLISHED_TTL_SECS;

/// When a report was published and how many beats it produced
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub beats: usize,
    pub published_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(beats: usize) -> Self {
        Self {
            beats,
            published_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::days(36_500));
        Utc::now() - self.published_at > ttl
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Clone)]
pub struct PublishedCache {
    /// "STATION|YYYY-MM-DD" -> entry
    store: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl Default for PublishedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishedCache {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(PUBLISHED_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cache seeded from a state file. A missing file gives an empty cache;
    /// expired entries are skipped.
    pub fn load(path: &Path, ttl: Duration) -> AppResult<Self> {
        let cache = Self::with_ttl(ttl);

        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(cache),
            Err(e) => return Err(e.into()),
        };

        let entries: Vec<(String, CacheEntry)> = serde_json::from_str(&raw)?;
        for (key, entry) in entries {
            if !entry.is_expired(ttl) {
                cache.store.insert(key, entry);
            }
        }

        debug!("📦 Loaded {} published entries from {}", cache.store.len(), path.display());
        Ok(cache)
    }

    /// Write fresh entries to `path`, replacing it atomically
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let mut entries: Vec<(String, CacheEntry)> = self
            .store
            .iter()
            .filter(|e| !e.value().is_expired(self.ttl))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&entries)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    #[inline]
    fn key(station_id: &str, date: NaiveDate) -> String {
        format!("{}|{}", station_id.to_uppercase(), date)
    }

    /// Beat count of a previous publish, if still fresh
    pub fn get(&self, station_id: &str, date: NaiveDate) -> Option<usize> {
        let key = Self::key(station_id, date);
        let ttl = self.ttl;

        if let Some(entry) = self.store.get(&key) {
            if !entry.is_expired(ttl) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("📦 Already published: {}", key);
                return Some(entry.beats);
            }
        }

        // Expired entries are dropped lazily
        self.store.remove_if(&key, |_, entry| entry.is_expired(ttl));
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn insert(&self, station_id: &str, date: NaiveDate, beats: usize) {
        let key = Self::key(station_id, date);
        self.store.insert(key, CacheEntry::new(beats));
    }

    /// Remove expired entries, returning how many were dropped
    pub fn cleanup(&self) -> usize {
        let before = self.store.len();
        let ttl = self.ttl;
        self.store.retain(|_, entry| !entry.is_expired(ttl));
        before - self.store.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.store.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
