mod cache;
mod config;
mod errors;
mod models;
mod remote;
mod retry;
mod services;
mod session;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::disk::DiskStore;
use crate::config::Config;
use crate::remote::supabase::SupabaseClient;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CareerSync v{}", env!("CARGO_PKG_VERSION"));

    // Durable local cache
    let cache = Arc::new(
        DiskStore::open(&config.cache_dir)
            .with_context(|| format!("Failed to open cache dir {}", config.cache_dir.display()))?,
    );
    info!("Cache directory: {}", config.cache_dir.display());

    // Remote client
    let client = Arc::new(SupabaseClient::new(
        &config.supabase_url,
        &config.supabase_anon_key,
    ));

    let email = config
        .supabase_email
        .as_deref()
        .context("SUPABASE_EMAIL is required to run a sync")?;
    let password = config
        .supabase_password
        .as_deref()
        .context("SUPABASE_PASSWORD is required to run a sync")?;
    let session = session::sign_in(
        &client,
        config.signup_webhook_url.as_deref(),
        email,
        password,
    )
    .await?;
    let user_id = session.user.id;

    let state = AppState {
        cache: cache.clone(),
        remote: client.clone(),
    };

    // Full refresh: the "open the app" pull across every entity.
    let resumes = services::resumes::get_resumes(&state, user_id).await;
    let applications = services::applications::get_applications(&state, user_id).await;
    let goals = services::goals::get_goals(&state, user_id).await;
    let activities = services::activity::recent_activities(&state, user_id).await;
    let stats = services::stats::get_stats(&state, user_id).await;

    info!(
        "Synced {} resumes, {} applications, {} goals, {} activity entries",
        resumes.len(),
        applications.len(),
        goals.len(),
        activities.len()
    );
    info!(
        "Stats: {} resumes / {} applications / {} interviews / {} offers (dark mode: {})",
        stats.resumes_count,
        stats.applications_count,
        stats.interviews_completed,
        stats.job_offers,
        services::prefs::dark_mode(cache.as_ref(), user_id)
    );

    Ok(())
}
