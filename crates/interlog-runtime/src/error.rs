#![forbid(unsafe_code)]

//! Error type for the few fallible entry points.
//!
//! Capture, flush, and retention never fail: they degrade and log. Only
//! configuration is rejected up front.

use std::fmt;

/// Errors returned when building an aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterlogError {
    /// An option value is outside its valid range.
    InvalidOption {
        /// Option field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl InterlogError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InterlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOption { field, reason } => write!(f, "invalid option `{field}`: {reason}"),
        }
    }
}

impl std::error::Error for InterlogError {}

/// Result type for interlog configuration.
pub type Result<T> = std::result::Result<T, InterlogError>;
