use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::{Duration, interval};

use crate::errors::{Error, Result};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

// Single inference server
pub struct Backend {
    pub url: String,
    healthy: AtomicBool,
    // one job at a time per GPU
    slot: Semaphore,
}

impl Backend {
    pub fn new(url: String) -> Self {
        Self {
            url,
            healthy: AtomicBool::new(true),
            slot: Semaphore::new(1),
        }
    }

    /// Waits until no other job holds this backend.
    pub async fn reserve(&self) -> Result<SemaphorePermit<'_>> {
        self.slot.acquire().await.map_err(|_| Error::QueueClosed)
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }
}

// Round-robin pool of interchangeable backends serving one model
pub struct BackendPool {
    pub name: &'static str,
    backends: Vec<Arc<Backend>>,
    current: AtomicUsize,
}

impl BackendPool {
    // Create from comma-separated urls "localhost:8001, localhost:8011"
    pub fn new(name: &'static str, backends_str: &str) -> Result<Self> {
        let backends: Vec<Arc<Backend>> = crate::config::split_list(backends_str)
            .into_iter()
            .map(|url| {
                let full_url = if url.starts_with("http://") || url.starts_with("https://") {
                    url
                } else {
                    format!("http://{url}")
                };
                Arc::new(Backend::new(full_url.trim_end_matches('/').to_string()))
            })
            .collect();

        if backends.is_empty() {
            return Err(Error::Config(format!("at least one {name} backend required")));
        }

        tracing::info!("{name} pool initialized with {} backends", backends.len());
        for (i, b) in backends.iter().enumerate() {
            tracing::info!("  [{}] {}", i + 1, b.url);
        }

        Ok(Self {
            name,
            backends,
            current: AtomicUsize::new(0),
        })
    }

    // Get next healthy backend (round-robin)
    pub fn get_backend(&self) -> Option<Arc<Backend>> {
        let len = self.backends.len();
        let start = self.current.fetch_add(1, Ordering::Relaxed) % len;

        (0..len)
            .map(|i| &self.backends[(start + i) % len])
            .find(|b| b.is_healthy())
            .map(Arc::clone)
    }

    pub fn require_backend(&self) -> Result<Arc<Backend>> {
        self.get_backend().ok_or(Error::NoHealthyBackend(self.name))
    }

    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn healthy_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_healthy()).count()
    }
}

// Probe every backend's /health endpoint forever
pub async fn health_checker(
    pool: Arc<BackendPool>,
    client: reqwest::Client,
    check_interval: Duration,
) {
    let mut interval = interval(check_interval);

    tracing::info!("{} health checker started (interval: {:?})", pool.name, check_interval);

    loop {
        interval.tick().await;
        check_pool(&pool, &client).await;
    }
}

pub async fn check_pool(pool: &BackendPool, client: &reqwest::Client) {
    for backend in pool.all_backends() {
        let url = format!("{}/health", backend.url);
        let was_healthy = backend.is_healthy();

        let is_healthy = match client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(res) => res.status().is_success(),
            Err(_) => false,
        };
        backend.set_healthy(is_healthy);

        // Log status changes only
        if was_healthy != is_healthy {
            if is_healthy {
                tracing::info!("{} backend {} is now healthy", pool.name, backend.url);
            } else {
                tracing::warn!("{} backend {} is now unhealthy", pool.name, backend.url);
            }
        }
    }
}
