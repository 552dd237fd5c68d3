#![forbid(unsafe_code)]

//! Predicates the aggregator asks the host about.
//!
//! Capture hooks push data in; these are the few questions the aggregator
//! pulls answers for. Implementations must be cheap and must not call back
//! into the aggregator.

use std::time::Duration;

/// Host state queried during capture, flush, and retention.
pub trait HostProbe {
    /// True while the host is reading input that must not be logged
    /// (passwords, passphrases).
    fn sensitive_input(&self) -> bool {
        false
    }

    /// How long the host has been continuously idle.
    ///
    /// `None` means the host cannot tell; it is treated as busy.
    fn idle_for(&self) -> Option<Duration>;

    /// True while a user is reading the output log.
    fn log_focused(&self) -> bool {
        false
    }
}

impl<T: HostProbe + ?Sized> HostProbe for &T {
    fn sensitive_input(&self) -> bool {
        (**self).sensitive_input()
    }

    fn idle_for(&self) -> Option<Duration> {
        (**self).idle_for()
    }

    fn log_focused(&self) -> bool {
        (**self).log_focused()
    }
}
