use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// The authenticated user as reported by GoTrue.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuthUser {
    /// Heuristic new-signup detection: the account was created within the
    /// last 60 seconds. Used to decide whether to fire the signup webhook.
    pub fn is_new_signup(&self) -> bool {
        Utc::now().signed_duration_since(self.created_at) < Duration::seconds(60)
    }
}

/// An access/refresh token pair plus its owner. Held behind a lock in the
/// client; refreshed in place when the access token lapses.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Wire shape of GoTrue token grants (`grant_type=password` and
/// `grant_type=refresh_token` return the same structure).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: AuthUser,
}

impl From<TokenResponse> for Session {
    fn from(t: TokenResponse) -> Self {
        Session {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            expires_at: Utc::now() + Duration::seconds(t.expires_in),
            user: t.user,
        }
    }
}
