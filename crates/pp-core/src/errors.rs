/// Core error type for the collector.
///
/// Adapter crates should map their specific errors into this type so the core
/// can tell recoverable conditions (rate limits, per-item failures) apart from
/// run-level failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Flood-wait signal from the platform. Absorbed by the governor.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("platform error: {0}")]
    Platform(String),

    #[error("could not resolve {identifier}: {reason}")]
    Resolution { identifier: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("collection cancelled")]
    Cancelled,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn resolution(identifier: impl Into<String>, reason: impl ToString) -> Self {
        Self::Resolution {
            identifier: identifier.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures that only concern a single message, reply or profile.
    ///
    /// Local i/o, serialization and cancellation are never item-scoped.
    pub fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            Error::Platform(_)
                | Error::Resolution { .. }
                | Error::NotFound(_)
                | Error::External(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
