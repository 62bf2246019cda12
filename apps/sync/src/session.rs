//! Session lifecycle. Sign-in detects brand-new accounts and fires the
//! signup webhook; sign-out backs the job-application cache up to a durable
//! key before tearing down session-scoped state. Local teardown always
//! completes, whether or not the remote sign-out succeeds.

use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{self, CacheOptions, CacheStore};
use crate::errors::AppError;
use crate::models::JobApplication;
use crate::remote::session::Session;
use crate::remote::supabase::SupabaseClient;

/// Cross-session backup key for job applications, written at sign-out.
const PERSISTENT_APPLICATIONS_KEY: &str = "persistent_job_applications";

/// Session-scoped collection keys torn down at sign-out. Dark mode is a
/// device preference and survives.
const SESSION_KEYS: &[&str] = &["resumes", "job_applications", "goals", "activities", "user_stats"];

pub async fn sign_in(
    client: &SupabaseClient,
    webhook_url: Option<&str>,
    email: &str,
    password: &str,
) -> Result<Session, AppError> {
    let session = client.sign_in(email, password).await?;

    if session.user.is_new_signup() {
        info!("New signup detected for user {}", session.user.id);
        if let Some(url) = webhook_url {
            notify_signup(url.to_string(), email.to_string());
        }
    }

    Ok(session)
}

/// Fire-and-forget webhook: one embed-formatted message, no retry, failures
/// swallowed.
fn notify_signup(url: String, email: String) {
    tokio::spawn(async move {
        let payload = json!({
            "embeds": [{
                "title": "New signup",
                "description": email,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }]
        });
        match reqwest::Client::new().post(&url).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                debug!("Signup webhook returned {}", response.status());
            }
            Ok(_) => {}
            Err(e) => debug!("Signup webhook failed: {e}"),
        }
    });
}

pub async fn sign_out(client: &SupabaseClient, cache: &dyn CacheStore, user_id: Uuid) {
    backup_applications(cache, user_id);
    clear_user_cache(cache, user_id);
    client.sign_out().await;
    info!("Signed out user {user_id}");
}

/// Copies the cached application list to the durable backup key so it
/// survives the session teardown.
pub fn backup_applications(cache: &dyn CacheStore, user_id: Uuid) {
    let apps: Option<Vec<JobApplication>> =
        cache::load(cache, "job_applications", Some(user_id), CacheOptions::entity());
    match apps {
        Some(apps) if !apps.is_empty() => {
            cache::save(cache, PERSISTENT_APPLICATIONS_KEY, &apps, None, CacheOptions::default());
            debug!("Backed up {} applications before sign-out", apps.len());
        }
        _ => warn!("No cached applications to back up at sign-out"),
    }
}

/// Removes the user's session-scoped collections (canonical and legacy
/// keys) plus their pull stamps.
pub fn clear_user_cache(cache: &dyn CacheStore, user_id: Uuid) {
    for key in SESSION_KEYS {
        cache::remove(cache, key, Some(user_id), CacheOptions::entity());
        cache.remove_raw(&format!("{user_id}:last_{key}_pull"));
    }
}
