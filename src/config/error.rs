//! Error types for the configuration store and the binding layer

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use super::listeners::ListenerId;

/// Storage read/write failure
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to {operation} config file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config document at {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("failed to encode config document")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    /// The temp file was written but could not replace the target
    #[error("failed to replace {target_path} with {temp_path}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },
}

impl PersistenceError {
    /// Short message suitable for a status line in the settings window
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("Could not {} {}", operation, path.display()),
            Self::InvalidFormat { path, reason } => {
                format!("{} is not a valid config file: {}", path.display(), reason)
            }
            Self::Json { .. } => "The configuration could not be encoded.".to_string(),
            Self::AtomicWriteFailed { target_path, .. } => format!(
                "Could not save to {}. Check disk space and permissions.",
                target_path.display()
            ),
            Self::Unavailable { reason } => format!("Storage unavailable: {reason}"),
        }
    }
}

/// A user-entered value rejected by a binding's validator
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid value for '{key}': expected {expected}, got {found}")]
pub struct ValidationError {
    pub key: String,
    pub expected: String,
    pub found: String,
}

/// One failed listener invocation, collected while the remaining listeners run
#[derive(Debug)]
pub struct ListenerFailure {
    pub listener: ListenerId,
    pub error: ConfigError,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config key '{key}': {reason}")]
    InvalidPath { key: String, reason: &'static str },

    #[error("config key not found: {key}")]
    KeyNotFound { key: String },

    /// An intermediate segment exists but is not a mapping
    #[error("cannot traverse '{segment}' while resolving '{key}': not a mapping")]
    PathConflict { key: String, segment: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("config key '{key}' should be {expected}, found {found}")]
    BindingType {
        key: String,
        expected: String,
        found: Value,
    },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("{} change listener(s) failed after updating '{key}'", .failures.len())]
    Listeners {
        key: String,
        failures: Vec<ListenerFailure>,
    },

    #[error("container '{node}' was already materialized")]
    AlreadyMaterialized { node: String },

    #[error("cannot {operation} while the window is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("builder for tab '{tab}' failed")]
    Builder {
        tab: String,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("{0}")]
    Custom(String),
}

impl ConfigError {
    /// Innermost error, looking through builder context
    pub fn root_cause(&self) -> &ConfigError {
        match self {
            Self::Builder { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Message for the settings window status line
    pub fn user_message(&self) -> String {
        match self {
            Self::Persistence(err) => err.user_message(),
            Self::Builder { tab, source } => format!("{tab}: {}", source.user_message()),
            Self::Listeners { failures, .. } => failures
                .iter()
                .map(|failure| failure.error.user_message())
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
