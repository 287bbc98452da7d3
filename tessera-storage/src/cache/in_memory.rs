//! Process-local stand-in for the distributed tier.
//!
//! `InMemoryScanTier` enforces TTLs and supports cursor scans with Redis-style
//! glob patterns, so single-instance deployments and tests get the full
//! distributed-tier contract without a Redis server.
//!
//! # Cursor Semantics
//!
//! Every key is assigned an insertion sequence number (starting at 1) that it
//! keeps across overwrites. A cursor is the next sequence number to examine,
//! so deleting already-returned keys between pages never causes keys to be
//! skipped. Cursor `0` starts a scan and signals its end.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tessera_core::{Tier, TierError};
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::traits::{CacheTier, ScanTier};

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug)]
struct Inner {
    entries: HashMap<String, Entry>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 1,
        }
    }
}

impl Inner {
    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.order.remove(&entry.seq);
                true
            }
            None => false,
        }
    }
}

/// TTL-enforcing, scannable in-memory tier. Cloning shares the key-space.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScanTier {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryScanTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let inner = self.inner.read().await;
        inner.entries.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All live keys, sorted. Intended for tests and diagnostics.
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let inner = self.inner.read().await;
        let mut keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Remaining time to live for a key, if it exists and has an expiry.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let inner = self.inner.read().await;
        inner
            .entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            inner.remove(key);
        }
        expired.len()
    }
}

#[async_trait]
impl CacheTier for InMemoryScanTier {
    fn tier(&self) -> Tier {
        Tier::Distributed
    }

    async fn get(&self, key: &str) -> Result<Option<String>, TierError> {
        let now = Instant::now();
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), TierError> {
        // A TTL past the clock's range never expires.
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        let mut inner = self.inner.write().await;

        if let Some(entry) = inner.entries.get_mut(key) {
            entry.value = value;
            entry.expires_at = expires_at;
            return Ok(());
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.to_string());
        inner.entries.insert(
            key.to_string(),
            Entry {
                seq,
                value,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), TierError> {
        self.inner.write().await.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), TierError> {
        Ok(())
    }
}

#[async_trait]
impl ScanTier for InMemoryScanTier {
    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(u64, Vec<String>), TierError> {
        let now = Instant::now();
        let inner = self.inner.read().await;

        let mut page = inner.order.range(cursor.max(1)..);
        let mut keys = Vec::new();
        for (_, key) in page.by_ref().take(count.max(1)) {
            let live = inner.entries.get(key).is_some_and(|e| !e.is_expired(now));
            if live && glob_match(pattern, key) {
                keys.push(key.clone());
            }
        }
        let next_cursor = page.next().map_or(0, |(seq, _)| *seq);

        Ok((next_cursor, keys))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, TierError> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        let mut removed = 0;
        for key in keys {
            let live = inner.entries.get(key).is_some_and(|e| !e.is_expired(now));
            if inner.remove(key) && live {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Redis-style glob match: `*`, `?`, `[...]` classes (with `^` negation and
/// ranges) and `\` escapes.
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() {
            if p[pi] == '*' {
                star = Some((pi, ti));
                pi += 1;
                continue;
            }
            let step = match p[pi] {
                '?' => Some(pi + 1),
                '[' => match_class(&p, pi, t[ti]),
                '\\' if pi + 1 < p.len() => (p[pi + 1] == t[ti]).then_some(pi + 2),
                c => (c == t[ti]).then_some(pi + 1),
            };
            if let Some(next) = step {
                pi = next;
                ti += 1;
                continue;
            }
        }
        match star {
            Some((star_pi, star_ti)) => {
                pi = star_pi + 1;
                ti = star_ti + 1;
                star = Some((star_pi, star_ti + 1));
            }
            None => return false,
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Match `c` against the class opening at `p[start] == '['`. Returns the index
/// after the class on a match. An unterminated class is a literal `[`.
fn match_class(p: &[char], start: usize, c: char) -> Option<usize> {
    let mut i = start + 1;
    let negate = p.get(i) == Some(&'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < p.len() && p[i] != ']' {
        if p[i] == '\\' && i + 1 < p.len() {
            i += 1;
        }
        let lo = p[i];
        if i + 2 < p.len() && p[i + 1] == '-' && p[i + 2] != ']' {
            let hi = p[i + 2];
            if lo <= c && c <= hi {
                matched = true;
            }
            i += 3;
        } else {
            if lo == c {
                matched = true;
            }
            i += 1;
        }
    }

    if i >= p.len() {
        return (c == '[').then_some(start + 1);
    }
    (matched != negate).then_some(i + 1)
}
