#![forbid(unsafe_code)]

//! Deterministic host simulator for testing.
//!
//! [`SimHost`] is a host with a virtual clock: idleness is measured from the
//! last simulated activity, and time only moves when the test says so.
//! [`Simulator`] wires a `SimHost` to an enabled [`Aggregator`] and drives it
//! the way an editor loop would.
//!
//! # Example
//!
//! ```
//! use interlog_runtime::Options;
//! use interlog_runtime::simulator::Simulator;
//!
//! let mut sim = Simulator::new(Options::default())?;
//! sim.command(&["C-n"], "next-line", "main.rs").finish();
//! sim.command(&["C-n"], "next-line", "main.rs").finish();
//! sim.settle();
//! assert_eq!(
//!     sim.output_text(),
//!     vec!["2 x C-n             next-line                     [main.rs]"]
//! );
//! # Ok::<(), interlog_runtime::InterlogError>(())
//! ```

use std::ops::Range;
use std::time::{Duration, Instant};

use interlog_core::{ChangeState, HostProbe, MessageBuffer, MessageStream};

use crate::aggregator::{Aggregator, TickReport};
use crate::config::Options;
use crate::error::Result;
use crate::pending::RecordOutcome;

/// Host with a virtual clock and an in-memory message stream.
#[derive(Debug, Clone)]
pub struct SimHost {
    messages: MessageBuffer,
    now: Instant,
    last_activity: Instant,
    sensitive: bool,
    focused: bool,
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    /// Create a host whose clock starts now, idle from the start.
    #[must_use]
    pub fn new() -> Self {
        Self::with_messages(MessageBuffer::new())
    }

    /// Create a host over an existing message buffer.
    #[must_use]
    pub fn with_messages(messages: MessageBuffer) -> Self {
        let now = Instant::now();
        Self {
            messages,
            now,
            last_activity: now,
            sensitive: false,
            focused: false,
        }
    }

    /// The message stream.
    #[must_use]
    pub fn messages(&self) -> &MessageBuffer {
        &self.messages
    }

    /// Append a message line without counting as activity.
    pub fn message(&self, line: &str) {
        self.messages.message(line);
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Move the clock forward.
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Mark activity at the current time; idleness restarts from zero.
    pub fn touch(&mut self) {
        self.last_activity = self.now;
    }

    /// Toggle the sensitive-input predicate.
    pub fn set_sensitive(&mut self, sensitive: bool) {
        self.sensitive = sensitive;
    }

    /// Toggle the log-focused predicate.
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

impl MessageStream for SimHost {
    fn end(&self) -> Option<usize> {
        self.messages.end()
    }

    fn start(&self) -> Option<usize> {
        self.messages.start()
    }

    fn read(&self, range: Range<usize>) -> Option<String> {
        self.messages.read(range)
    }
}

impl HostProbe for SimHost {
    fn sensitive_input(&self) -> bool {
        self.sensitive
    }

    fn idle_for(&self) -> Option<Duration> {
        Some(self.now.saturating_duration_since(self.last_activity))
    }

    fn log_focused(&self) -> bool {
        self.focused
    }
}

/// An enabled aggregator over a [`SimHost`], driven by virtual time.
#[derive(Debug)]
pub struct Simulator {
    aggregator: Aggregator<SimHost>,
}

impl Simulator {
    /// Create and enable an aggregator over a fresh host.
    ///
    /// # Errors
    ///
    /// Returns an error if `options` fails validation.
    pub fn new(options: Options) -> Result<Self> {
        Self::with_host(SimHost::new(), options)
    }

    /// Create and enable an aggregator over `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if `options` fails validation.
    pub fn with_host(host: SimHost, options: Options) -> Result<Self> {
        let now = host.now();
        let mut aggregator = Aggregator::new(host, options)?;
        aggregator.enable(now);
        Ok(Self { aggregator })
    }

    /// The aggregator under test.
    #[must_use]
    pub fn aggregator(&self) -> &Aggregator<SimHost> {
        &self.aggregator
    }

    /// Mutable access to the aggregator.
    pub fn aggregator_mut(&mut self) -> &mut Aggregator<SimHost> {
        &mut self.aggregator
    }

    /// The simulated host.
    #[must_use]
    pub fn host(&self) -> &SimHost {
        self.aggregator.host()
    }

    /// Mutable access to the simulated host.
    pub fn host_mut(&mut self) -> &mut SimHost {
        self.aggregator.host_mut()
    }

    /// Start a command: activity plus `record`.
    ///
    /// Finish it with [`CommandScope::finish`] to run the post-command phase.
    pub fn command(&mut self, keys: &[&str], command: &str, context: &str) -> CommandScope<'_> {
        self.host_mut().touch();
        let outcome = self
            .aggregator
            .record(keys.iter().copied(), Some(command), context);
        CommandScope {
            sim: self,
            outcome,
            change: ChangeState::None,
        }
    }

    /// Append a message line outside of any command.
    pub fn message(&mut self, line: &str) {
        self.host().message(line);
    }

    /// Move virtual time forward and tick once.
    pub fn advance(&mut self, by: Duration) -> TickReport {
        self.host_mut().advance(by);
        let now = self.host().now();
        self.aggregator.tick(now)
    }

    /// Advance by the idle threshold so a pending flush fires.
    pub fn settle(&mut self) -> TickReport {
        let threshold = self.aggregator.options().idle_threshold;
        self.advance(threshold)
    }

    /// Visible output text.
    #[must_use]
    pub fn output_text(&self) -> Vec<String> {
        self.aggregator.visible_text()
    }
}

/// A command between `record` and `post_command`.
#[derive(Debug)]
#[must_use = "call finish() to run the post-command phase"]
pub struct CommandScope<'a> {
    sim: &'a mut Simulator,
    outcome: Option<RecordOutcome>,
    change: ChangeState,
}

impl CommandScope<'_> {
    /// What `record` did with the occurrence.
    pub fn outcome(&self) -> Option<RecordOutcome> {
        self.outcome
    }

    /// Emit a message while the command runs.
    pub fn message(self, line: &str) -> Self {
        self.sim.host().message(line);
        self
    }

    /// Load a resource while the command runs.
    pub fn load(self, parent: Option<&str>, child: &str) -> Self {
        self.sim.aggregator.note_load(parent, child);
        self
    }

    /// Set the command's observable effect.
    pub fn change(mut self, change: ChangeState) -> Self {
        self.change = change;
        self
    }

    /// Run the post-command phase. Returns `false` if nothing was finalized.
    pub fn finish(self) -> bool {
        self.sim.aggregator.post_command(self.change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_measured_from_last_activity() {
        let mut host = SimHost::new();
        host.advance(Duration::from_millis(30));
        assert_eq!(host.idle_for(), Some(Duration::from_millis(30)));
        host.touch();
        assert_eq!(host.idle_for(), Some(Duration::ZERO));
    }

    #[test]
    fn command_then_settle_renders() {
        let mut sim = Simulator::new(Options::default()).expect("valid");
        assert!(sim.command(&["C-n"], "next-line", "main.rs").finish());
        let report = sim.settle();
        assert!(report.flush.is_some());
        assert_eq!(
            sim.output_text(),
            vec!["C-n                 next-line                     [main.rs]"]
        );
    }

    #[test]
    fn messages_inside_command_become_post_text() {
        let mut sim = Simulator::new(Options::default()).expect("valid");
        sim.command(&["C-x", "C-s"], "save-buffer", "main.rs")
            .message("Wrote main.rs")
            .change(ChangeState::Echoed)
            .finish();
        let entry = &sim.aggregator().pending().entries()[0];
        assert_eq!(entry.post_text, "Wrote main.rs\n");
        assert_eq!(entry.change, ChangeState::Echoed);
    }

    #[test]
    fn busy_host_does_not_flush() {
        let mut sim = Simulator::new(Options::default()).expect("valid");
        for _ in 0..5 {
            sim.command(&["a"], "self-insert", "buf").finish();
            assert!(sim.advance(Duration::from_millis(40)).flush.is_none());
        }
        assert_eq!(sim.aggregator().pending().entries()[0].repeat_count, 5);
    }
}
