use thiserror::Error;

/// Application-level error type.
///
/// Almost nothing here is allowed to reach the caller of an entity service:
/// the read paths degrade to cached or default values and log instead. The
/// variants exist so the fallback dispatch can tell *why* a call failed —
/// in particular `SchemaMismatch`, which selects the alternate write strategy
/// instead of aborting the batch.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Remote call timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for failures that should trigger the reduced-field insert +
    /// per-row update fallback rather than a retry of the same upsert.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, AppError::SchemaMismatch(_))
    }

    /// Classifies a PostgREST error body. The backend signals an absent
    /// column with a PGRST204 message naming it; older deployments lack the
    /// `updated_at` column entirely.
    pub fn from_api_response(status: u16, message: String) -> Self {
        if message.contains("updated_at") || message.contains("PGRST204") {
            AppError::SchemaMismatch(message)
        } else {
            AppError::Api { status, message }
        }
    }
}
