use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Optional outbound webhook hit once per new signup. Fire-and-forget.
    pub signup_webhook_url: Option<String>,
    pub supabase_email: Option<String>,
    pub supabase_password: Option<String>,
    pub cache_dir: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            supabase_url: require_env("SUPABASE_URL")?,
            supabase_anon_key: require_env("SUPABASE_ANON_KEY")?,
            signup_webhook_url: std::env::var("SIGNUP_WEBHOOK_URL").ok(),
            supabase_email: std::env::var("SUPABASE_EMAIL").ok(),
            supabase_password: std::env::var("SUPABASE_PASSWORD").ok(),
            cache_dir: std::env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".careersync-cache")),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
