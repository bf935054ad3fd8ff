//! Error taxonomy surfaced by a synchronizer run.
//!
//! Only an authorization failure propagates as a hard error requiring
//! caller intervention. Everything else degrades: transient failures
//! abort the run but keep all persisted progress valid, so re-invoking
//! the synchronizer resumes rather than restarts. Parse misses and
//! cache failures never reach this enum at all.

use thiserror::Error;

use crate::source::SourceError;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The credential lacks a required scope. Fatal; surfaced verbatim
    /// so the user knows which permission to add. Never retried
    /// automatically.
    #[error("missing API permission for '{scope}' ({message})")]
    Authorization {
        code: u16,
        scope: String,
        message: String,
    },

    /// Request failure, malformed response, rate-limit rejection or
    /// timeout. The run aborts but is safely retryable; progress
    /// persisted so far remains valid.
    #[error("sync interrupted: {0}")]
    Transient(String),
}

impl SyncError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<SourceError> for SyncError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Authorization {
                code,
                scope,
                message,
            } => Self::Authorization {
                code,
                scope,
                message,
            },
            other => Self::Transient(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_is_not_retryable() {
        let err: SyncError = SourceError::Authorization {
            code: 16,
            scope: "armorynews".to_string(),
            message: "access level too low".to_string(),
        }
        .into();

        assert!(!err.is_retryable());
        assert!(err.to_string().contains("armorynews"));
    }

    #[test]
    fn test_everything_else_is_retryable() {
        for source in [
            SourceError::Timeout,
            SourceError::Transport("connection reset".to_string()),
            SourceError::Malformed("truncated body".to_string()),
            SourceError::Api {
                code: 5,
                message: "too many requests".to_string(),
            },
        ] {
            let err: SyncError = source.into();
            assert!(err.is_retryable(), "{err}");
        }
    }
}
