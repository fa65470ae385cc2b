use clap::Parser;
use std::time::Duration;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "aura-gateway")]
#[command(about = "Gateway for interior image generation and room analysis backends")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Diffusion backends (comma-separated)
    // Example: "localhost:8001,localhost:8011"
    #[arg(short, long, env = "DIFFUSION_BACKENDS", default_value = "localhost:8001")]
    pub diffusion_backends: String,

    // Vision-language backends (comma-separated)
    #[arg(short, long, env = "VISION_BACKENDS", default_value = "localhost:8002")]
    pub vision_backends: String,

    // OpenAI-compatible chat completion base url
    #[arg(long, env = "CHAT_API_URL", default_value = "https://api.groq.com/openai/v1")]
    pub chat_api_url: String,

    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub chat_api_key: Option<String>,

    #[arg(long, env = "CHAT_MODEL", default_value = "llama-3.3-70b-versatile")]
    pub chat_model: String,

    // Room analyses allowed per session per window
    #[arg(long, env = "MAX_ANALYSIS_CALLS", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_analysis_calls: u32,

    // Quota window in seconds
    #[arg(long, env = "ANALYSIS_WINDOW_SECONDS", default_value_t = 3600)]
    pub analysis_window: u64,

    // Evict expired quota entries once this many are tracked (0 = never)
    #[arg(long, env = "QUOTA_SWEEP_THRESHOLD", default_value_t = 0)]
    pub quota_sweep_threshold: usize,

    // Comment cache TTL in seconds
    #[arg(short, long, env = "CACHE_TTL", default_value_t = 300)]
    pub cache_ttl: u64,

    // Health check interval in seconds
    #[arg(long, env = "HEALTH_INTERVAL", default_value_t = 30)]
    pub health_interval: u64,

    // Timeout for a single backend call in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 300)]
    pub request_timeout: u64,

    // Pending generation jobs before callers start waiting
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 100)]
    pub queue_capacity: usize,

    #[arg(long, env = "MAX_PROMPT_CHARS", default_value_t = 1500)]
    pub max_prompt_chars: usize,

    // Base64 images are large, axum's default body limit is not enough
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 32 * 1024 * 1024)]
    pub max_body_bytes: usize,

    // Allowed CORS origins (comma-separated, "*" for any)
    #[arg(long, env = "CORS_ORIGINS", default_value = "http://localhost:3000")]
    pub cors_origins: String,
}

impl Args {
    pub fn analysis_window(&self) -> Duration {
        Duration::from_secs(self.analysis_window)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn cors_origins(&self) -> Vec<String> {
        split_list(&self.cors_origins)
    }
}

// "a, b,,c" -> ["a", "b", "c"]
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
