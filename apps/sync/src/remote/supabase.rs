use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::remote::session::{Session, TokenResponse};
use crate::remote::Remote;

/// Coarse outer timeout on every HTTP request. Entity services layer their
/// own tighter per-call deadlines on top via `RetryPolicy`.
const FETCH_TIMEOUT_SECS: u64 = 60;

/// Client for the Supabase REST (PostgREST) and auth (GoTrue) surfaces.
/// Holds the current session behind a lock and refreshes it in place when
/// the access token lapses.
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
}

impl SupabaseClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session: RwLock::new(None),
        }
    }

    /// Authenticates with an email/password grant and stores the session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!("sign-in failed ({status}): {body}")));
        }

        let token: TokenResponse = response.json().await?;
        let session: Session = token.into();
        info!("Signed in as user {}", session.user.id);
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    /// Returns a valid session, refreshing the access token if it has
    /// passed `expires_at`. Errors when there is no session or the refresh
    /// grant fails — the only place auth failures surface as errors.
    pub async fn ensure_authenticated(&self) -> Result<Session, AppError> {
        let current = self.session.read().await.clone();
        let session = current.ok_or_else(|| AppError::Auth("no active session".to_string()))?;
        if !session.is_expired() {
            return Ok(session);
        }

        debug!("Access token expired, refreshing session");
        let url = format!("{}/auth/v1/token?grant_type=refresh_token", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": session.refresh_token }))
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("session refresh failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!("session refresh rejected ({status}): {body}")));
        }

        let token: TokenResponse = response.json().await?;
        let refreshed: Session = token.into();
        *self.session.write().await = Some(refreshed.clone());
        Ok(refreshed)
    }

    /// Best-effort remote sign-out; the local session is cleared regardless.
    pub async fn sign_out(&self) {
        let session = self.session.write().await.take();
        if let Some(session) = session {
            let url = format!("{}/auth/v1/logout", self.base_url);
            let result = self
                .http
                .post(&url)
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await;
            if let Err(e) = result {
                warn!("Remote sign-out failed (session cleared locally anyway): {e}");
            }
        }
    }

    /// Request builder for `/rest/v1/{table}` carrying the api key and an
    /// explicit bearer header. An expired session is refreshed here, before
    /// any request that depends on row-level-security identity goes out.
    /// Without a session the anon key is used and RLS limits visibility to
    /// public rows.
    async fn rest(&self, method: Method, table: &str, query: &str) -> RequestBuilder {
        let bearer = match self.ensure_authenticated().await {
            Ok(session) => session.access_token,
            Err(_) => self.anon_key.clone(),
        };
        let url = format!("{}/rest/v1/{table}{query}", self.base_url);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::from_api_response(status.as_u16(), body))
    }
}

fn prefer(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static(value));
    headers
}

#[async_trait]
impl Remote for SupabaseClient {
    async fn select_owned(&self, table: &str, user_id: Uuid) -> Result<Vec<Value>, AppError> {
        let query = format!("?select=*&user_id=eq.{user_id}");
        let response = self.rest(Method::GET, table, &query).await.send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn upsert(
        &self,
        table: &str,
        rows: &[Value],
        on_conflict: &str,
    ) -> Result<(), AppError> {
        let query = format!("?on_conflict={on_conflict}");
        let response = self
            .rest(Method::POST, table, &query)
            .await
            .headers(prefer("resolution=merge-duplicates,return=minimal"))
            .json(&rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn insert_ignore(&self, table: &str, rows: &[Value]) -> Result<(), AppError> {
        let response = self
            .rest(Method::POST, table, "?on_conflict=id")
            .await
            .headers(prefer("resolution=ignore-duplicates,return=minimal"))
            .json(&rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_by_id(&self, table: &str, id: &str, patch: &Value) -> Result<(), AppError> {
        let query = format!("?id=eq.{id}");
        let response = self
            .rest(Method::PATCH, table, &query)
            .await
            .headers(prefer("return=minimal"))
            .json(patch)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> Result<u64, AppError> {
        let query = format!("?id=eq.{id}");
        let response = self
            .rest(Method::DELETE, table, &query)
            .await
            .headers(prefer("return=representation"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        let response = Self::check(response).await?;
        let deleted: Vec<Value> = response.json().await.unwrap_or_default();
        Ok(deleted.len() as u64)
    }
}
