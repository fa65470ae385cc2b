use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

use crate::metrics::{COMMENT_CACHE_HITS, COMMENT_CACHE_MISSES, COMMENT_CACHE_SIZE};
use crate::models::{CommentRequest, CommentResponse};

// inserts sweep expired entries once the map holds this many
const SWEEP_THRESHOLD: usize = 256;

// Cache entry with timestamp
#[derive(Clone)]
pub struct CacheEntry {
    pub response: CommentResponse,
    pub created_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() < ttl
    }
}

// Create a cache key (hash of context + room type + description)
pub fn make_cache_key(req: &CommentRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(req.context.as_str());
    // separators keep ("ab", "c") and ("a", "bc") apart
    hasher.update([0u8]);
    hasher.update(&req.room_type);
    hasher.update([0u8]);
    hasher.update(&req.room_description);
    format!("{:x}", hasher.finalize())
}

pub struct CommentCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl CommentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<CommentResponse> {
        let hit = self
            .entries
            .get(key)
            .filter(|entry| entry.is_live(self.ttl))
            .map(|entry| entry.response.clone());

        match hit {
            Some(response) => {
                COMMENT_CACHE_HITS.inc();
                Some(response)
            }
            None => {
                // the read guard is gone, safe to touch the shard again
                if self.entries.remove_if(key, |_, e| !e.is_live(self.ttl)).is_some() {
                    COMMENT_CACHE_SIZE.set(self.entries.len() as f64);
                }
                COMMENT_CACHE_MISSES.inc();
                None
            }
        }
    }

    pub fn insert(&self, key: String, response: CommentResponse) {
        if self.entries.len() >= SWEEP_THRESHOLD {
            self.purge_expired();
        }
        self.entries.insert(
            key,
            CacheEntry {
                response,
                created_at: Instant::now(),
            },
        );
        COMMENT_CACHE_SIZE.set(self.entries.len() as f64);
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_live(self.ttl));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!("comment cache evicted {removed} expired entries");
        }
        COMMENT_CACHE_SIZE.set(self.entries.len() as f64);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
