//! Per-session call quota.
//!
//! One mutex guards the whole map, so every check-and-increment is totally
//! ordered across sessions. Entries are never removed unless a sweep
//! threshold is configured.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

// Quota entry - calls seen in the current window
#[derive(Debug, Clone, Copy)]
pub struct QuotaEntry {
    pub count: u32,
    pub window_start: Instant,
}

impl QuotaEntry {
    fn expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("session `{session_id}` exceeded {max_calls} call(s) per {}s, retry in {}s",
    .window.as_secs(), .retry_after.as_secs() + 1)]
pub struct QuotaExceeded {
    pub session_id: String,
    pub max_calls: u32,
    pub window: Duration,
    /// Time left until the current window closes.
    pub retry_after: Duration,
}

impl QuotaExceeded {
    /// Whole seconds a client must wait to land past the window end.
    ///
    /// The window includes its end, so this is always strictly greater
    /// than `retry_after`.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after.as_secs() + 1
    }
}

/// Limits resolved once at startup.
#[derive(Debug, Clone, Copy)]
pub struct QuotaPolicy {
    pub max_calls: u32,
    pub window: Duration,
}

#[derive(Debug, Default)]
pub struct QuotaTracker {
    entries: Mutex<HashMap<String, QuotaEntry>>,
    sweep_threshold: usize,
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evict expired entries when a new session arrives and at least
    /// `threshold` sessions are tracked. Zero disables eviction.
    pub fn with_sweep_threshold(threshold: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            sweep_threshold: threshold,
        }
    }

    pub fn check_and_record(
        &self,
        session_id: Option<&str>,
        max_calls: u32,
        window: Duration,
    ) -> Result<(), QuotaExceeded> {
        self.check_and_record_at(session_id, max_calls, window, Instant::now())
    }

    /// Same as [`check_and_record`](Self::check_and_record) with an explicit
    /// clock reading.
    pub fn check_and_record_at(
        &self,
        session_id: Option<&str>,
        max_calls: u32,
        window: Duration,
        now: Instant,
    ) -> Result<(), QuotaExceeded> {
        // anonymous callers are not tracked
        let Some(session_id) = session_id.filter(|s| !s.is_empty()) else {
            return Ok(());
        };

        let mut entries = self.lock();

        match entries.get_mut(session_id) {
            Some(entry) if !entry.expired(now, window) => {
                // a denied attempt still counts
                entry.count = entry.count.saturating_add(1);
                if entry.count > max_calls {
                    let elapsed = now.saturating_duration_since(entry.window_start);
                    return Err(QuotaExceeded {
                        session_id: session_id.to_string(),
                        max_calls,
                        window,
                        retry_after: window.saturating_sub(elapsed),
                    });
                }
                Ok(())
            }
            Some(entry) => {
                entry.count = 1;
                entry.window_start = now;
                Ok(())
            }
            None => {
                if self.sweep_threshold > 0 && entries.len() >= self.sweep_threshold {
                    let before = entries.len();
                    entries.retain(|_, e| !e.expired(now, window));
                    tracing::debug!(
                        "quota sweep evicted {} of {} sessions",
                        before - entries.len(),
                        before
                    );
                }
                entries.insert(
                    session_id.to_string(),
                    QuotaEntry {
                        count: 1,
                        window_start: now,
                    },
                );
                Ok(())
            }
        }
    }

    pub fn tracked_sessions(&self) -> usize {
        self.lock().len()
    }

    pub fn entry(&self, session_id: &str) -> Option<QuotaEntry> {
        self.lock().get(session_id).copied()
    }

    // the map is always left consistent, a panic elsewhere can't corrupt it
    fn lock(&self) -> MutexGuard<'_, HashMap<String, QuotaEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
