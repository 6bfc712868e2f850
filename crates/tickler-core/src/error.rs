use uuid::Uuid;

/// Engine error taxonomy.
///
/// Unknown ids are deliberately not an error: concurrent deletion is
/// expected, so operations referencing a missing task report `Ok(false)`
/// instead. Notification failures never surface here at all; emission is
/// best-effort by contract.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected before any in-memory or durable state changed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A durable read or write failed. The in-memory store is the
    /// authority for the current session; callers get this error but the
    /// in-memory mutation is not rolled back.
    #[error("persistence failed: {source}")]
    Persistence {
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn persistence(source: anyhow::Error) -> Self {
        Self::Persistence { source }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Marker used in log lines when an operation hit a missing id.
pub(crate) fn log_not_found(op: &str, id: Uuid) {
    tracing::debug!(op, id = %id, "task not in store; treating as no-op");
}
