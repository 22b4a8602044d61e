use serde::{Deserialize, Serialize};
use std::fmt;

/// Main result type for Sentinela core operations.
pub type SentinelaResult<T> = Result<T, SentinelaError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorKind {
    // Store
    NotFound,
    UniqueViolation,
    StoreUnavailable,

    // Queue
    QueueUnavailable,
    MessageMalformed,

    // Monitor execution
    MonitorNotFound,
    MonitorDisabled,
    MonitorAlreadyRunning,
    MonitorTimeout,
    MonitorExecutionFailed,
    TooManyIssuesCreated,

    // Monitor registration / validation
    MonitorValidation,

    // Reactions
    ReactionTimeout,
    ReactionFailed,

    // Requests
    RequestTimeout,
    RequestTargetNotFound,
    RequestValidation,

    // Config / init
    ConfigError,
    InitializationFailed,

    // Catch-all
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCategory {
    Store,
    Queue,
    Execution,
    Validation,
    Configuration,
    Network,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct SentinelaError {
    pub kind: ErrorKind,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub message: String,
}

impl SentinelaError {
    pub fn new(
        kind: ErrorKind,
        category: ErrorCategory,
        severity: ErrorSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            category,
            severity,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::NotFound,
            ErrorCategory::Store,
            ErrorSeverity::Low,
            what,
        )
    }

    pub fn monitor_not_found(monitor_id: i64) -> Self {
        Self::new(
            ErrorKind::MonitorNotFound,
            ErrorCategory::Execution,
            ErrorSeverity::Medium,
            format!("monitor '{monitor_id}' not found"),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::RequestValidation,
            ErrorCategory::Validation,
            ErrorSeverity::Low,
            message,
        )
    }

    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::StoreUnavailable | ErrorKind::QueueUnavailable | ErrorKind::Network
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::MonitorTimeout | ErrorKind::ReactionTimeout | ErrorKind::RequestTimeout
        )
    }
}

impl fmt::Display for SentinelaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}/{:?}] {}", self.category, self.kind, self.message)
    }
}

impl From<serde_json::Error> for SentinelaError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(
            ErrorKind::MessageMalformed,
            ErrorCategory::Validation,
            ErrorSeverity::Low,
            format!("json (de)serialization failed: {error}"),
        )
    }
}
