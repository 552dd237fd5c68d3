#![forbid(unsafe_code)]

//! Periodic bounding of the output log.

use crate::output::OutputLog;
use crate::views::ViewRegistry;

/// What a retention pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionOutcome {
    /// No bound is configured.
    Unbounded,
    /// The log view is focused; nothing was touched.
    Focused,
    /// The log has not been created yet.
    NoLog,
    /// The oldest `n` lines were removed (possibly zero).
    Trimmed(usize),
}

/// Trims the oldest lines beyond a maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionManager {
    max_lines: Option<usize>,
}

impl RetentionManager {
    /// Create a manager; `None` never trims.
    #[must_use]
    pub fn new(max_lines: Option<usize>) -> Self {
        Self { max_lines }
    }

    /// Configured bound.
    #[must_use]
    pub fn max_lines(&self) -> Option<usize> {
        self.max_lines
    }

    /// Scheduled pass: skipped while the log is focused.
    pub fn on_tick(
        &self,
        log: Option<&mut OutputLog>,
        views: &mut ViewRegistry,
        focused: bool,
    ) -> RetentionOutcome {
        if self.max_lines.is_none() {
            return RetentionOutcome::Unbounded;
        }
        if focused {
            tracing::trace!("retention skipped, log focused");
            return RetentionOutcome::Focused;
        }
        self.trim(log, views)
    }

    /// Manual pass: ignores focus.
    pub fn trim(&self, log: Option<&mut OutputLog>, views: &mut ViewRegistry) -> RetentionOutcome {
        let Some(max) = self.max_lines else {
            return RetentionOutcome::Unbounded;
        };
        let Some(log) = log else {
            return RetentionOutcome::NoLog;
        };
        let removed = log.trim_front(max);
        if removed > 0 {
            views.shift_for_trim(removed);
            tracing::debug!(removed, remaining = log.len(), max, "trimmed output log");
        }
        RetentionOutcome::Trimmed(removed)
    }
}
