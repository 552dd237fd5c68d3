#![forbid(unsafe_code)]

//! Aggregator options.
//!
//! Options are static for the lifetime of an aggregator except visibility,
//! which presentation layers toggle at runtime.
//!
//! | Field | Default |
//! |-------|---------|
//! | `idle_threshold` | 100 ms |
//! | `retention_max` | 1000 lines |
//! | `retention_interval` | 30 s |
//! | `tail_follow` | on |
//! | `visibility` | everything |
//! | `key_column` / `command_column` | 20 / 30 columns |
//!
//! # Environment overlay
//!
//! [`Options::from_env`] reads `INTERLOG_IDLE_MS`, `INTERLOG_RETENTION_MAX`
//! (`0` or `unlimited` for no bound), `INTERLOG_RETENTION_SECS`, and
//! `INTERLOG_TAIL_FOLLOW`. Unparsable values are ignored with a warning.

use std::time::Duration;

use interlog_core::Visibility;

use crate::error::{InterlogError, Result};

/// Default idle time before pending entries are rendered.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_millis(100);

/// Default maximum number of output lines kept.
pub const DEFAULT_RETENTION_MAX: usize = 1000;

/// Default period of the retention tick.
pub const DEFAULT_RETENTION_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for an [`Aggregator`](crate::Aggregator).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Options {
    /// How long the host must be idle before a flush.
    #[cfg_attr(feature = "serde", serde(rename = "idle_ms", with = "duration_ms"))]
    pub idle_threshold: Duration,

    /// Maximum output lines; `None` keeps everything.
    pub retention_max: Option<usize>,

    /// Period of the retention tick.
    #[cfg_attr(feature = "serde", serde(rename = "retention_ms", with = "duration_ms"))]
    pub retention_interval: Duration,

    /// Advance views that sit at the end of the log after each flush.
    pub tail_follow: bool,

    /// Initial visibility.
    pub visibility: Visibility,

    /// Display column where the command name starts.
    pub key_column: usize,

    /// Display column where the context label starts.
    pub command_column: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            retention_max: Some(DEFAULT_RETENTION_MAX),
            retention_interval: DEFAULT_RETENTION_INTERVAL,
            tail_follow: true,
            visibility: Visibility::default(),
            key_column: 20,
            command_column: 30,
        }
    }
}

impl Options {
    /// Set the idle threshold.
    #[must_use]
    pub fn with_idle_threshold(mut self, threshold: Duration) -> Self {
        self.idle_threshold = threshold;
        self
    }

    /// Set the retention bound (`None` = unlimited).
    #[must_use]
    pub fn with_retention_max(mut self, max: Option<usize>) -> Self {
        self.retention_max = max;
        self
    }

    /// Set the retention period.
    #[must_use]
    pub fn with_retention_interval(mut self, interval: Duration) -> Self {
        self.retention_interval = interval;
        self
    }

    /// Enable or disable tail-follow.
    #[must_use]
    pub fn with_tail_follow(mut self, follow: bool) -> Self {
        self.tail_follow = follow;
        self
    }

    /// Set the initial visibility.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Set the key and command column widths.
    #[must_use]
    pub fn with_columns(mut self, key_column: usize, command_column: usize) -> Self {
        self.key_column = key_column;
        self.command_column = command_column;
        self
    }

    /// Defaults overlaid with `INTERLOG_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Overlay values from a variable lookup.
    #[must_use]
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup("INTERLOG_IDLE_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.idle_threshold = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %raw, "ignoring INTERLOG_IDLE_MS"),
            }
        }
        if let Some(raw) = lookup("INTERLOG_RETENTION_MAX") {
            let raw_trimmed = raw.trim();
            if raw_trimmed.eq_ignore_ascii_case("unlimited") {
                self.retention_max = None;
            } else {
                match raw_trimmed.parse::<usize>() {
                    Ok(0) => self.retention_max = None,
                    Ok(max) => self.retention_max = Some(max),
                    Err(_) => tracing::warn!(value = %raw, "ignoring INTERLOG_RETENTION_MAX"),
                }
            }
        }
        if let Some(raw) = lookup("INTERLOG_RETENTION_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.retention_interval = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %raw, "ignoring INTERLOG_RETENTION_SECS"),
            }
        }
        if let Some(raw) = lookup("INTERLOG_TAIL_FOLLOW") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => self.tail_follow = true,
                "0" | "false" | "off" | "no" => self.tail_follow = false,
                _ => tracing::warn!(value = %raw, "ignoring INTERLOG_TAIL_FOLLOW"),
            }
        }
        self
    }

    /// Reject values the timers and layout cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.idle_threshold.is_zero() {
            return Err(InterlogError::invalid(
                "idle_threshold",
                "must be greater than zero",
            ));
        }
        if self.retention_interval.is_zero() {
            return Err(InterlogError::invalid(
                "retention_interval",
                "must be greater than zero",
            ));
        }
        if self.command_column == 0 || self.key_column == 0 {
            return Err(InterlogError::invalid(
                if self.key_column == 0 {
                    "key_column"
                } else {
                    "command_column"
                },
                "must be at least one column",
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
