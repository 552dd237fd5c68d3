#![forbid(unsafe_code)]

//! Cooperative timers for the flush and retention ticks.
//!
//! Timers never block and never spawn threads. The host's event loop calls
//! [`Timers::due`] with the current instant and its idle duration; whatever is
//! due is returned and re-armed. "Suspended" simply means "scheduled, not yet
//! due".
//!
//! # Kinds
//!
//! - [`TimerKind::Every`]: fires each `interval`. A timer that fell behind
//!   fires once and re-arms at `now + interval`; missed periods are not
//!   replayed.
//! - [`TimerKind::Idle`]: fires when the host has been idle for at least
//!   `threshold`, at most once per `threshold`, never while busy.
//!
//! # Cancellation
//!
//! Each timer hands out a [`CancelToken`]. Cancelling through the token is
//! observed on the next poll; [`Timers::cancel_all`] takes effect at once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A unique identifier for a timer.
pub type TimerId = u64;

/// Shared flag that stops a timer.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a live token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the timer.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether the timer has been stopped.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// When a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fixed period, regardless of activity.
    Every(Duration),
    /// After this much continuous idleness, repeating while idle.
    Idle(Duration),
}

#[derive(Debug)]
struct ScheduledTimer {
    id: TimerId,
    kind: TimerKind,
    token: CancelToken,
    next_due: Option<Instant>,
    last_fired: Option<Instant>,
}

impl ScheduledTimer {
    fn poll(&mut self, now: Instant, idle_for: Option<Duration>) -> bool {
        match self.kind {
            TimerKind::Every(interval) => {
                let due = self.next_due.unwrap_or(now);
                if now < due {
                    return false;
                }
                let mut next = due + interval;
                if next <= now {
                    next = now + interval;
                }
                self.next_due = Some(next);
                true
            }
            TimerKind::Idle(threshold) => {
                let Some(idle) = idle_for else {
                    return false;
                };
                if idle < threshold {
                    return false;
                }
                if let Some(last) = self.last_fired
                    && now.saturating_duration_since(last) < threshold
                {
                    return false;
                }
                self.last_fired = Some(now);
                true
            }
        }
    }
}

/// The set of armed timers.
#[derive(Debug, Default)]
pub struct Timers {
    timers: Vec<ScheduledTimer>,
    next_id: TimerId,
}

impl Timers {
    /// Create an empty timer set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a periodic timer, first due at `now + interval`.
    pub fn every(&mut self, interval: Duration, now: Instant) -> (TimerId, CancelToken) {
        self.arm(TimerKind::Every(interval), Some(now + interval))
    }

    /// Arm an idle timer.
    pub fn idle_every(&mut self, threshold: Duration) -> (TimerId, CancelToken) {
        self.arm(TimerKind::Idle(threshold), None)
    }

    fn arm(&mut self, kind: TimerKind, next_due: Option<Instant>) -> (TimerId, CancelToken) {
        let id = self.next_id;
        self.next_id += 1;
        let token = CancelToken::new();
        crate::debug_trace!("arming timer: id={}, kind={:?}", id, kind);
        tracing::debug!(timer_id = id, ?kind, "timer armed");
        self.timers.push(ScheduledTimer {
            id,
            kind,
            token: token.clone(),
            next_due,
            last_fired: None,
        });
        (id, token)
    }

    /// Timers that fire at `now`, in arming order.
    ///
    /// Cancelled timers are dropped here.
    pub fn due(&mut self, now: Instant, idle_for: Option<Duration>) -> Vec<TimerId> {
        self.timers.retain(|t| !t.token.is_cancelled());
        let mut fired = Vec::new();
        for timer in &mut self.timers {
            if timer.poll(now, idle_for) {
                fired.push(timer.id);
            }
        }
        if !fired.is_empty() {
            tracing::trace!(fired = ?fired, "timers due");
        }
        fired
    }

    /// Stop one timer. Returns `false` if it was not armed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| {
            if t.id == id {
                t.token.cancel();
                false
            } else {
                true
            }
        });
        before != self.timers.len()
    }

    /// Stop every timer.
    pub fn cancel_all(&mut self) {
        for timer in self.timers.drain(..) {
            timer.token.cancel();
            tracing::debug!(timer_id = timer.id, "timer cancelled");
        }
    }

    /// Whether `id` is armed and not cancelled.
    #[must_use]
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers
            .iter()
            .any(|t| t.id == id && !t.token.is_cancelled())
    }

    /// Number of armed timers (cancelled tokens included until next poll).
    #[inline]
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}
