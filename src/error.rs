//! # Error Taxonomy
//!
//! Structured error types for the orchestration core using thiserror
//! instead of `Box<dyn Error>` patterns.
//!
//! The retry executor distinguishes transient from fatal causes by type,
//! never by string inspection: [`CoreError::is_transient`] is the single
//! predicate that drives retries.

use thiserror::Error;

/// Errors surfaced by the orchestration core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or referentially-inconsistent input (unknown key, unknown
    /// job/task/step id). Never retried.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// An operation was attempted from a status that does not permit it.
    /// Never retried; callers should treat this as a race to investigate.
    #[error("invalid state transition for {entity}: {from} -> {attempted}")]
    InvalidStateTransition {
        entity: String,
        from: String,
        attempted: String,
    },

    /// Storage conflict or connectivity hiccup. Absorbed by the retry
    /// executor; surfaced only after the attempt budget is exhausted.
    #[error("transient failure in {operation}: {message}")]
    Transient { operation: String, message: String },

    /// Any other storage-reported error (constraint violation, permission).
    /// Never retried.
    #[error("operation {operation} failed: {message}")]
    Operation { operation: String, message: String },

    /// Invalid process configuration (environment variables, pool settings).
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Event payload or parameter blob could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an invalid-state-transition error.
    pub fn invalid_transition(
        entity: impl Into<String>,
        from: impl std::fmt::Display,
        attempted: impl Into<String>,
    ) -> Self {
        Self::InvalidStateTransition {
            entity: entity.into(),
            from: from.to_string(),
            attempted: attempted.into(),
        }
    }

    /// Create an operation error.
    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the retry executor may re-run the unit of work that
    /// produced this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Classify a storage error into the core taxonomy.
///
/// Serialization failures and deadlocks (SQLSTATE 40001 / 40P01) as well as
/// connectivity problems are transient: the aborted transaction can be
/// re-run from scratch with fresh reads. Everything else is a fatal
/// operation failure carrying the underlying diagnostic.
pub fn classify_storage_error(operation: &str, err: sqlx::Error) -> CoreError {
    let transient = match &err {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
        }
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
        _ => false,
    };

    if transient {
        CoreError::Transient {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    } else {
        CoreError::Operation {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
