use std::sync::Arc;
use tokio::sync::mpsc;

use crate::cache::CommentCache;
use crate::chat::ChatClient;
use crate::config::Args;
use crate::errors::{Error, Result};
use crate::load_balancer::BackendPool;
use crate::models::QueuedJob;
use crate::quota::{QuotaPolicy, QuotaTracker};

// app's shared state
pub struct AppState {
    pub client: reqwest::Client,
    pub diffusion: Arc<BackendPool>,
    pub vision: Arc<BackendPool>,
    pub chat: ChatClient,
    pub quota: QuotaTracker,
    pub quota_policy: QuotaPolicy, // resolved once at startup
    pub comments: CommentCache,
    pub max_prompt_chars: usize,
    pub jobs_tx: mpsc::Sender<QueuedJob>,
}

impl AppState {
    /// Builds the state and the receiving end of the generation queue.
    pub fn new(args: &Args) -> Result<(Self, mpsc::Receiver<QueuedJob>)> {
        let client = reqwest::Client::builder()
            .timeout(args.request_timeout())
            .build()
            .map_err(Error::HttpClient)?;

        let (jobs_tx, jobs_rx) = mpsc::channel(args.queue_capacity.max(1));

        let state = Self {
            diffusion: Arc::new(BackendPool::new("diffusion", &args.diffusion_backends)?),
            vision: Arc::new(BackendPool::new("vision", &args.vision_backends)?),
            chat: ChatClient::new(
                client.clone(),
                &args.chat_api_url,
                args.chat_api_key.clone(),
                args.chat_model.clone(),
            ),
            quota: QuotaTracker::with_sweep_threshold(args.quota_sweep_threshold),
            quota_policy: QuotaPolicy {
                max_calls: args.max_analysis_calls,
                window: args.analysis_window(),
            },
            comments: CommentCache::new(args.cache_ttl()),
            max_prompt_chars: args.max_prompt_chars,
            client,
            jobs_tx,
        };
        Ok((state, jobs_rx))
    }
}
