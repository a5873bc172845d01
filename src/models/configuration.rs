//! # Configuration Model
//!
//! Hierarchical key/value configuration: globally unique keys with optional
//! per-job overrides. An override shadows the global value for its key but
//! never mutates the global entry. Batch updates report one outcome per
//! input action because a configuration batch is a bulk edit of independent
//! keys, not an atomic invariant.

use serde::{Deserialize, Serialize};

/// Full description of one configuration parameter, for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationParameterInfo {
    pub key: String,
    pub category: String,
    pub friendly_name: String,
    pub data_type: String,
    /// Current global value, if one is set
    pub value: Option<String>,
    /// Advanced parameters may only be edited with administrative rights
    pub is_advanced: bool,
}

/// A resolved (key, value) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationParameterValue {
    pub key: String,
    pub value: String,
}

/// One upsert (`value: Some`) or delete (`value: None`) in a batch update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationUpdateAction {
    pub key: String,
    pub value: Option<String>,
}

impl ConfigurationUpdateAction {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// Per-key outcome of a batch update; `error: None` means the action was
/// applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedMessage {
    pub key: String,
    pub error: Option<String>,
}

impl KeyedMessage {
    pub fn ok(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            error: None,
        }
    }

    pub fn error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
