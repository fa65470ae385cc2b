use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, TextEncoder, register_counter,
    register_counter_vec, register_gauge, register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: CounterVec = register_counter_vec!(
        "aura_requests_total",
        "Total number of requests per endpoint",
        &["endpoint"]
    )
    .unwrap();
    pub static ref QUOTA_REJECTIONS: Counter = register_counter!(
        "aura_quota_rejections_total",
        "Analysis calls denied by session quota"
    )
    .unwrap();
    pub static ref QUOTA_SESSIONS: Gauge = register_gauge!(
        "aura_quota_sessions",
        "Sessions currently held by the quota tracker"
    )
    .unwrap();
    pub static ref ANALYSIS_FALLBACKS: Counter = register_counter!(
        "aura_analysis_fallbacks_total",
        "Room analyses answered with the fallback"
    )
    .unwrap();
    pub static ref COMMENT_CACHE_HITS: Counter =
        register_counter!("aura_comment_cache_hits_total", "Total comment cache hits").unwrap();
    pub static ref COMMENT_CACHE_MISSES: Counter =
        register_counter!("aura_comment_cache_misses_total", "Total comment cache misses").unwrap();
    pub static ref COMMENT_CACHE_SIZE: Gauge =
        register_gauge!("aura_comment_cache_size", "Current number of cached comments").unwrap();
    pub static ref GENERATION_LATENCY: Histogram = register_histogram!(
        "aura_generation_latency_seconds",
        "Image generation latency in seconds",
        vec![1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 80.0, 160.0, 320.0]
    )
    .unwrap();
}

pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    // the text encoder only ever writes utf-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
