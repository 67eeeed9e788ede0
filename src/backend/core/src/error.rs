//! Error type shared by every module in the crate.
//!
//! All fallible operations return [`Result`]. The error carries a stable
//! [`ErrorCode`] so callers can branch on failure kind without string
//! matching, a message that is safe to surface to clients, and an optional
//! internal message plus source chain for the logs. Constructing an error
//! also bumps the `hirestream_errors_total` counter.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, error, warn};

pub type Result<T> = std::result::Result<T, HirestreamError>;

/// Stable, machine-readable failure kind.
///
/// Variants serialize as SCREAMING_SNAKE_CASE strings; the numeric codes
/// exist for dashboards that group by range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RecordNotFound,
    DuplicateRecord,
    StorageError,

    InvalidStateTransition,
    ValidationError,

    PublishFailed,
    QueueNotFound,
    ExchangeNotFound,

    SerializationError,

    AiUnavailable,
    AiResponseInvalid,

    ConfigurationError,

    InternalError,
}

impl ErrorCode {
    /// Numeric code, one block of ten per category.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::RecordNotFound => 10,
            Self::DuplicateRecord => 11,
            Self::StorageError => 12,
            Self::InvalidStateTransition => 20,
            Self::ValidationError => 21,
            Self::PublishFailed => 30,
            Self::QueueNotFound => 31,
            Self::ExchangeNotFound => 32,
            Self::SerializationError => 40,
            Self::AiUnavailable => 50,
            Self::AiResponseInvalid => 51,
            Self::ConfigurationError => 60,
            Self::InternalError => 99,
        }
    }

    /// Whether retrying the same call can reasonably succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PublishFailed | Self::AiUnavailable | Self::StorageError
        )
    }

    /// Coarse grouping label used in logs and metrics.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::RecordNotFound | Self::DuplicateRecord | Self::StorageError => "storage",
            Self::InvalidStateTransition | Self::ValidationError => "domain",
            Self::PublishFailed | Self::QueueNotFound | Self::ExchangeNotFound => "messaging",
            Self::SerializationError => "serialization",
            Self::AiUnavailable | Self::AiResponseInvalid => "ai_gateway",
            Self::ConfigurationError => "configuration",
            Self::InternalError => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// How loudly an error should be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Caller mistakes: bad input, missing or duplicate records.
    Low,
    /// Degraded dependencies that the pipeline is built to tolerate.
    Medium,
    /// Broken invariants: storage, topology, serialization, config.
    High,
    /// Bugs. Should never fire in a healthy deployment.
    Critical,
}

impl ErrorSeverity {
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::RecordNotFound
            | ErrorCode::DuplicateRecord
            | ErrorCode::InvalidStateTransition
            | ErrorCode::ValidationError => Self::Low,

            ErrorCode::AiUnavailable | ErrorCode::PublishFailed => Self::Medium,

            ErrorCode::StorageError
            | ErrorCode::SerializationError
            | ErrorCode::AiResponseInvalid
            | ErrorCode::QueueNotFound
            | ErrorCode::ExchangeNotFound
            | ErrorCode::ConfigurationError => Self::High,

            ErrorCode::InternalError => Self::Critical,
        }
    }
}

/// Structured payload attached to an error: the entity involved, arbitrary
/// context pairs, and an optional retry hint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Seconds the caller should wait before retrying, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Attach a context pair. Values that fail to serialize are dropped
    /// silently rather than turning one error into two.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.context.insert(key.into(), value);
        }
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_secs = Some(seconds);
        self
    }
}

/// The crate-wide error.
///
/// `user_message` is safe to hand to clients; `internal_message` and the
/// source chain are for logs only.
#[derive(Debug)]
pub struct HirestreamError {
    code: ErrorCode,
    user_message: Cow<'static, str>,
    internal_message: Option<String>,
    details: ErrorDetails,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for HirestreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl std::error::Error for HirestreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl HirestreamError {
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let err = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
            source: None,
        };
        err.record_metrics();
        err
    }

    /// Like [`new`](Self::new), with a separate log-only message.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        Self::new(code, user_message).with_internal_message(internal_message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::InternalError, "Unexpected internal error", message)
    }

    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        let entity_id = entity_id.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("{} not found: {}", entity_type, entity_id),
        )
        .with_details(ErrorDetails::new().with_entity(&entity_type, &entity_id))
    }

    pub fn duplicate(entity_type: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::DuplicateRecord,
            format!("{} already exists", entity_type.into()),
            detail,
        )
    }

    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::StorageError, "Storage operation failed", message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message.into())
    }

    /// Rejected lifecycle move, e.g. activating an already closed job.
    pub fn invalid_transition(
        entity: &'static str,
        from: impl fmt::Debug,
        to: impl fmt::Debug,
    ) -> Self {
        Self::new(
            ErrorCode::InvalidStateTransition,
            format!("Invalid {} transition: {:?} -> {:?}", entity, from, to),
        )
        .with_context("from_state", format!("{:?}", from))
        .with_context("to_state", format!("{:?}", to))
    }

    pub fn publish_failed(routing_key: impl Into<String>, reason: impl Into<String>) -> Self {
        let key = routing_key.into();
        Self::with_internal(
            ErrorCode::PublishFailed,
            format!("Failed to publish event: {}", key),
            reason,
        )
        .with_context("routing_key", &key)
    }

    /// The AI provider is down or its breaker is open. Carries a retry
    /// hint for operations that cannot degrade to a placeholder result.
    pub fn ai_unavailable(operation: impl Into<String>, retry_after_secs: u64) -> Self {
        let operation = operation.into();
        Self::new(
            ErrorCode::AiUnavailable,
            format!(
                "AI service unavailable for {}: retry after {}s",
                operation, retry_after_secs
            ),
        )
        .with_context("operation", &operation)
        .with_details(ErrorDetails::new().with_retry_after(retry_after_secs))
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    pub fn with_internal_message(mut self, message: impl Into<String>) -> Self {
        self.internal_message = Some(message.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.details = self.details.with_context(key, value);
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        self.details.retry_after_secs
    }

    /// Emit a structured log line at the level the severity calls for.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();
        match self.severity() {
            ErrorSeverity::Critical => error!(
                error_code = %code,
                category,
                user_message = %self.user_message,
                internal_message = ?self.internal_message,
                details = ?self.details,
                source = ?self.source,
                "critical error"
            ),
            ErrorSeverity::High => error!(
                error_code = %code,
                category,
                user_message = %self.user_message,
                internal_message = ?self.internal_message,
                "high severity error"
            ),
            ErrorSeverity::Medium => warn!(
                error_code = %code,
                category,
                user_message = %self.user_message,
                "medium severity error"
            ),
            ErrorSeverity::Low => debug!(
                error_code = %code,
                category,
                user_message = %self.user_message,
                "low severity error"
            ),
        }
    }

    fn record_metrics(&self) {
        counter!(
            "hirestream_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
            "severity" => format!("{:?}", self.severity()),
            "retryable" => self.is_retryable().to_string(),
        )
        .increment(1);
    }
}

/// Converts foreign results and `Option`s into [`Result`] with a message.
pub trait ErrorContext<T> {
    /// Wrap the failure as an internal error carrying `message`.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Wrap the failure under an explicit [`ErrorCode`].
    fn with_error_code(self, code: ErrorCode) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| HirestreamError::internal(message.into()).with_source(e))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.map_err(|e| HirestreamError::new(code, e.to_string()).with_source(e))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| HirestreamError::new(ErrorCode::RecordNotFound, message.into()))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.ok_or_else(|| HirestreamError::new(code, "Resource not found"))
    }
}

impl From<serde_json::Error> for HirestreamError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_internal(
            ErrorCode::SerializationError,
            "Malformed JSON payload",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<tokio::sync::AcquireError> for HirestreamError {
    fn from(error: tokio::sync::AcquireError) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "Semaphore closed during shutdown",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<tokio::time::error::Elapsed> for HirestreamError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "Timed out waiting for operation",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<anyhow::Error> for HirestreamError {
    fn from(error: anyhow::Error) -> Self {
        // Unwrap rather than re-wrap when the chain already bottoms out here.
        match error.downcast::<HirestreamError>() {
            Ok(inner) => inner,
            Err(other) => Self::internal(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for HirestreamError {
    fn from(error: config::ConfigError) -> Self {
        Self::with_internal(
            ErrorCode::ConfigurationError,
            "Invalid configuration",
            error.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_codes() {
        assert!(ErrorCode::AiUnavailable.is_retryable());
        assert!(ErrorCode::PublishFailed.is_retryable());
        assert!(ErrorCode::StorageError.is_retryable());
        assert!(!ErrorCode::ValidationError.is_retryable());
        assert!(!ErrorCode::RecordNotFound.is_retryable());
    }

    #[test]
    fn not_found_records_entity() {
        let err = HirestreamError::not_found("resume", uuid::Uuid::new_v4().to_string());
        assert_eq!(err.code(), ErrorCode::RecordNotFound);
        assert!(!err.is_retryable());
        assert_eq!(err.details().entity_type.as_deref(), Some("resume"));
    }

    #[test]
    fn context_pairs_accumulate() {
        let err = HirestreamError::validation("Invalid input")
            .with_context("field", "email")
            .with_context("reason", "invalid format");

        assert!(err.details().context.contains_key("field"));
        assert!(err.details().context.contains_key("reason"));
    }

    #[test]
    fn details_builder() {
        let details = ErrorDetails::new()
            .with_entity("job", "abc-123")
            .with_retry_after(30)
            .with_context("extra", "info");

        assert_eq!(details.entity_type, Some("job".to_string()));
        assert_eq!(details.entity_id, Some("abc-123".to_string()));
        assert_eq!(details.retry_after_secs, Some(30));
        assert!(details.context.contains_key("extra"));
    }

    #[test]
    fn ai_unavailable_carries_retry_hint() {
        let err = HirestreamError::ai_unavailable("generate_questions", 30);
        assert_eq!(err.code(), ErrorCode::AiUnavailable);
        assert_eq!(err.retry_after_secs(), Some(30));
        assert!(err.is_retryable());
    }

    #[test]
    fn severity_tracks_code() {
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::ValidationError),
            ErrorSeverity::Low
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::AiUnavailable),
            ErrorSeverity::Medium
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::StorageError),
            ErrorSeverity::High
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::InternalError),
            ErrorSeverity::Critical
        );
    }

    #[test]
    fn display_includes_internal_message() {
        let err = HirestreamError::storage("connection refused: localhost:5432");

        let rendered = err.to_string();
        assert!(rendered.contains("StorageError"));
        assert!(rendered.contains("Storage operation failed"));
        assert!(rendered.contains("connection refused"));
    }

    #[test]
    fn option_context_maps_to_not_found() {
        let missing: Option<u32> = None;
        let err = missing.context("no such row").unwrap_err();
        assert_eq!(err.code(), ErrorCode::RecordNotFound);
        assert_eq!(err.user_message(), "no such row");
    }
}
