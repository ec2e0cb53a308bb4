use std::env;

/// Application configuration loaded from environment variables once at
/// startup and passed explicitly into the scheduler, runner, and API.
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub api_host: String,
    pub api_port: u16,

    // Postgres
    pub database_url: String,

    // Redis (locks, pub/sub, health cache)
    pub redis_url: String,

    // Pub/sub channel for new-item fanout
    pub sse_channel: String,

    // Dev environments only: generate synthetic records when a batch is empty
    pub enable_synthetic_fallback: bool,
}

impl Config {
    /// Load configuration for the API server.
    pub fn api_from_env() -> Self {
        Self {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("API_PORT must be a number"),
            database_url: database_url_from_env(),
            redis_url: redis_url_from_env(),
            sse_channel: sse_channel_from_env(),
            enable_synthetic_fallback: synthetic_flag_from_env(),
        }
    }

    /// Load configuration for the ingest worker (no web server fields needed).
    pub fn worker_from_env() -> Self {
        Self {
            api_host: String::new(),
            api_port: 0,
            database_url: database_url_from_env(),
            redis_url: redis_url_from_env(),
            sse_channel: sse_channel_from_env(),
            enable_synthetic_fallback: synthetic_flag_from_env(),
        }
    }
}

fn database_url_from_env() -> String {
    env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://ai_pulse:ai_pulse@db:5432/ai_pulse".to_string())
}

fn redis_url_from_env() -> String {
    env::var("REDIS_URL").unwrap_or_else(|_| "redis://redis:6379/0".to_string())
}

fn sse_channel_from_env() -> String {
    env::var("SSE_CHANNEL").unwrap_or_else(|_| "ai_developments:new".to_string())
}

fn synthetic_flag_from_env() -> bool {
    env::var("ENABLE_SYNTHETIC_FALLBACK")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
