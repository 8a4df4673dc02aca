//! In-memory answer cache keyed by a normalized question prefix.
//!
//! Keys are the question lowercased, trimmed and cut to its first
//! [`KEY_CHARS`] characters, so two questions that only differ after that
//! prefix share one slot. Stale entries are never returned but keep their
//! slot until the size cap evicts them.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

pub const KEY_CHARS: usize = 100;
pub const DEFAULT_TTL_SECS: i64 = 3600;
pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
struct CacheEntry {
    full_response: String,
    summary: String,
    created_at: DateTime<Utc>,
}

/// A cached answer pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAnswer {
    pub full_response: String,
    pub summary: String,
}

#[derive(Debug)]
pub struct ResponseCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
    capacity: usize,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::with_limits(Duration::seconds(DEFAULT_TTL_SECS), DEFAULT_CAPACITY)
    }

    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            capacity,
        }
    }

    /// Lowercase, trim, then keep the first `KEY_CHARS` characters.
    pub fn normalize_key(question: &str) -> String {
        question
            .to_lowercase()
            .trim()
            .chars()
            .take(KEY_CHARS)
            .collect()
    }

    pub fn lookup(&self, question: &str) -> Option<CachedAnswer> {
        self.lookup_at(question, Utc::now())
    }

    pub fn lookup_at(&self, question: &str, now: DateTime<Utc>) -> Option<CachedAnswer> {
        let key = Self::normalize_key(question);
        let entry = self.entries.get(&key)?;

        if now - entry.created_at >= self.ttl {
            debug!("Cache entry for {:?} is stale", key);
            return None;
        }

        Some(CachedAnswer {
            full_response: entry.full_response.clone(),
            summary: entry.summary.clone(),
        })
    }

    pub fn store(&mut self, question: &str, full_response: &str, summary: &str) {
        self.store_at(question, full_response, summary, Utc::now());
    }

    pub fn store_at(
        &mut self,
        question: &str,
        full_response: &str,
        summary: &str,
        now: DateTime<Utc>,
    ) {
        let key = Self::normalize_key(question);
        self.entries.insert(
            key,
            CacheEntry {
                full_response: full_response.to_string(),
                summary: summary.to_string(),
                created_at: now,
            },
        );

        if self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                debug!("Evicting oldest cache entry {:?}", oldest);
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    fn contains_key(&self, question: &str) -> bool {
        self.entries.contains_key(&Self::normalize_key(question))
    }
}
