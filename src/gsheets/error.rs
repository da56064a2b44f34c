use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Invalid cell reference: '{0}'")]
    InvalidReference(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Remote error{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Remote {
        status: Option<u16>,
        message: String,
    },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("{source} ({completed} of {total} operations were applied and have not been rolled back)")]
    Aborted {
        completed: usize,
        total: usize,
        /// Spreadsheet touched before the failure, if one was created or opened.
        url: Option<String>,
        #[source]
        source: Box<SheetsError>,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SheetsError>;

impl SheetsError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SheetsError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        SheetsError::Remote {
            status,
            message: message.into(),
        }
    }

    /// The caller-facing category of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            SheetsError::MissingField(_) => FailureKind::MissingField,
            SheetsError::InvalidField { .. } | SheetsError::InvalidReference(_) => {
                FailureKind::InvalidField
            }
            SheetsError::Authentication(_) => FailureKind::AuthenticationError,
            SheetsError::NotFound(_) => FailureKind::NotFound,
            SheetsError::RateLimited { .. } => FailureKind::RateLimited,
            SheetsError::Timeout(_) => FailureKind::Timeout,
            SheetsError::Aborted { source, .. } => source.kind(),
            SheetsError::Remote { .. }
            | SheetsError::Config(_)
            | SheetsError::Io(_)
            | SheetsError::Serialization(_) => FailureKind::RemoteError,
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Rate limits are always retryable. Remote failures are retryable when they
    /// carry no status (transport) or a 5xx status.
    pub fn is_retryable(&self) -> bool {
        match self {
            SheetsError::RateLimited { .. } => true,
            SheetsError::Remote { status, .. } => match status {
                None => true,
                Some(code) => *code >= 500,
            },
            _ => false,
        }
    }

    /// URL of a spreadsheet left partially modified by this failure.
    pub fn partial_url(&self) -> Option<&str> {
        match self {
            SheetsError::Aborted { url, .. } => url.as_deref(),
            _ => None,
        }
    }

    /// Server-provided wait hint, if any.
    pub fn wait_hint(&self) -> Option<Duration> {
        match self {
            SheetsError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    MissingField,
    InvalidField,
    AuthenticationError,
    NotFound,
    RateLimited,
    RemoteError,
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::MissingField => "MissingField",
            FailureKind::InvalidField => "InvalidField",
            FailureKind::AuthenticationError => "AuthenticationError",
            FailureKind::NotFound => "NotFound",
            FailureKind::RateLimited => "RateLimited",
            FailureKind::RemoteError => "RemoteError",
            FailureKind::Timeout => "Timeout",
        };
        f.write_str(name)
    }
}

/// Flattened, inspectable view of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub kind: FailureKind,
    pub message: String,
    pub retryable: bool,
}

impl From<&SheetsError> for FailureRecord {
    fn from(err: &SheetsError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_takes_kind_of_source() {
        let err = SheetsError::Aborted {
            completed: 2,
            total: 5,
            url: None,
            source: Box::new(SheetsError::NotFound("spreadsheet abc".into())),
        };
        assert_eq!(err.kind(), FailureKind::NotFound);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("2 of 5 operations"));
        assert!(err.to_string().contains("not been rolled back"));
    }

    #[test]
    fn remote_retryability_follows_status() {
        assert!(SheetsError::remote(None, "connection reset").is_retryable());
        assert!(SheetsError::remote(Some(500), "backend").is_retryable());
        assert!(!SheetsError::remote(Some(400), "bad request").is_retryable());
    }

    #[test]
    fn remote_display_includes_status() {
        let err = SheetsError::remote(Some(502), "bad gateway");
        assert_eq!(err.to_string(), "Remote error (HTTP 502): bad gateway");
        let err = SheetsError::remote(None, "reset");
        assert_eq!(err.to_string(), "Remote error: reset");
    }

    #[test]
    fn record_from_error() {
        let err = SheetsError::RateLimited {
            message: "quota".into(),
            retry_after: Some(Duration::from_secs(3)),
        };
        let record = FailureRecord::from(&err);
        assert_eq!(record.kind, FailureKind::RateLimited);
        assert!(record.retryable);
        assert_eq!(err.wait_hint(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn invalid_reference_is_invalid_field_for_callers() {
        let err = SheetsError::InvalidReference("4B".into());
        assert_eq!(err.kind(), FailureKind::InvalidField);
    }
}
