#![forbid(unsafe_code)]

//! The aggregator: capture, idle flush, and retention on one loop.
//!
//! An [`Aggregator`] owns every piece of mutable state (message cursor,
//! pending buffer, renderer, output log, views, timers) and a host value that
//! supplies the message stream and the idle/focus/sensitivity predicates.
//! Several aggregators can coexist; nothing is global.
//!
//! # Lifecycle
//!
//! ```text
//! enable(now) ─► record ─► [note_load]* ─► post_command ─► … ─► tick(now)
//!                                                             │
//!                         idle timer due ─► flush ◄───────────┤
//!                    retention timer due ─► trim ◄────────────┘
//! disable()  cancels both timers and drops pending entries
//! ```
//!
//! # Reentrancy
//!
//! With plain `&mut` access no call can start while a flush is rendering.
//! Hosts that share the aggregator between hooks use [`SharedAggregator`],
//! whose borrow check turns a nested call into a counted no-op.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

use interlog_core::{
    ChangeState, CommandId, HostProbe, KeyToken, LoadEvent, MessageCursor, MessageStream,
    Visibility,
};

use crate::config::Options;
use crate::error::Result;
use crate::output::{Block, LineLayout, OutputLog};
use crate::pending::{PendingBuffer, RecordOutcome};
use crate::render::{Renderer, message_lines};
use crate::retention::{RetentionManager, RetentionOutcome};
use crate::timer::{TimerId, Timers};
use crate::views::{ViewId, ViewRegistry};

/// What one flush did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Blocks appended to the log, in order.
    pub blocks: Vec<Block>,
    /// Lines erased because the first entry replaced the previous one.
    pub erased_lines: usize,
    /// Views moved to the new end of the log.
    pub followed_views: Vec<ViewId>,
    /// True if the first entry was folded into the previous flush's entry.
    pub merged_across_flush: bool,
}

impl FlushReport {
    /// True if the flush changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.erased_lines == 0
    }
}

/// What one [`Aggregator::tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Set when the idle timer fired.
    pub flush: Option<FlushReport>,
    /// Set when the retention timer fired.
    pub retention: Option<RetentionOutcome>,
}

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    /// Occurrences accepted by `record`.
    pub recorded: u64,
    /// Occurrences folded into a pending entry.
    pub merged: u64,
    /// Occurrences recorded while input was sensitive.
    pub masked: u64,
    /// Flushes that ran.
    pub flushes: u64,
    /// Entries rendered.
    pub entries_rendered: u64,
    /// Entries that replaced the previous flush's entry.
    pub merged_across_flush: u64,
    /// Lines removed by retention.
    pub lines_trimmed: u64,
}

/// Interaction event aggregator over a host `H`.
#[derive(Debug)]
pub struct Aggregator<H> {
    host: H,
    options: Options,
    visibility: Visibility,
    cursor: MessageCursor,
    pending: PendingBuffer,
    loads: Vec<LoadEvent>,
    renderer: Renderer,
    retention: RetentionManager,
    output: Option<OutputLog>,
    views: ViewRegistry,
    timers: Timers,
    flush_timer: Option<TimerId>,
    retention_timer: Option<TimerId>,
    enabled: bool,
    stats: AggregatorStats,
}

impl<H: MessageStream + HostProbe> Aggregator<H> {
    /// Create a disabled aggregator.
    ///
    /// # Errors
    ///
    /// Returns [`InterlogError::InvalidOption`](crate::InterlogError) if
    /// `options` fails validation.
    pub fn new(host: H, options: Options) -> Result<Self> {
        options.validate()?;
        let layout = LineLayout {
            key_column: options.key_column,
            command_column: options.command_column,
        };
        Ok(Self {
            host,
            visibility: options.visibility,
            cursor: MessageCursor::new(),
            pending: PendingBuffer::new(),
            loads: Vec::new(),
            renderer: Renderer::new(layout),
            retention: RetentionManager::new(options.retention_max),
            output: None,
            views: ViewRegistry::new(),
            timers: Timers::new(),
            flush_timer: None,
            retention_timer: None,
            enabled: false,
            stats: AggregatorStats::default(),
            options,
        })
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Start capturing and arm both timers.
    ///
    /// Messages already in the stream are not attributed to the first event.
    pub fn enable(&mut self, now: Instant) {
        if self.enabled {
            return;
        }
        self.cursor.skip_to_end(&self.host);
        let (flush, _) = self.timers.idle_every(self.options.idle_threshold);
        let (retention, _) = self.timers.every(self.options.retention_interval, now);
        self.flush_timer = Some(flush);
        self.retention_timer = Some(retention);
        self.enabled = true;
        tracing::debug!(
            idle_ms = self.options.idle_threshold.as_millis() as u64,
            retention_max = ?self.options.retention_max,
            "aggregator enabled"
        );
    }

    /// Stop capturing, cancel both timers, and drop pending entries.
    ///
    /// The output log and open views are kept.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.timers.cancel_all();
        self.flush_timer = None;
        self.retention_timer = None;
        let dropped = self.pending.len();
        self.pending.clear();
        self.loads.clear();
        self.renderer.forget();
        self.enabled = false;
        tracing::debug!(dropped, "aggregator disabled");
    }

    /// Whether capture is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // ── Capture ─────────────────────────────────────────────────────────

    /// Capture one event before it executes.
    ///
    /// Messages since the previous capture point become the entry's pre-text.
    /// While the host reports sensitive input, keys and command are replaced
    /// by the masked sentinel. Returns `None` when capture is off.
    pub fn record<K: Into<KeyToken>>(
        &mut self,
        keys: impl IntoIterator<Item = K>,
        command: Option<&str>,
        context: &str,
    ) -> Option<RecordOutcome> {
        if !self.enabled {
            return None;
        }
        let (keys, command) = if self.host.sensitive_input() {
            self.stats.masked += 1;
            (vec![KeyToken::Masked], CommandId::Masked)
        } else {
            let keys: Vec<KeyToken> = keys.into_iter().map(Into::into).collect();
            let command = CommandId::from_host(command);
            if keys.is_empty() && command == CommandId::Unbound {
                tracing::debug!(context, "event with no keys and no command");
            }
            (keys, command)
        };
        let pre_text = self.cursor.drain(&self.host);
        let outcome = self.pending.record(keys, command, context, pre_text);
        self.stats.recorded += 1;
        if let RecordOutcome::Merged(count) = outcome {
            self.stats.merged += 1;
            crate::debug_trace!("record: merged into pending tail, count={}", count);
        }
        Some(outcome)
    }

    /// Note a resource load triggered by the running event.
    ///
    /// The load is stamped with the current end of the message stream, so the
    /// first message line written after this call is the load's own line.
    pub fn note_load(&mut self, parent: Option<&str>, child: &str) {
        if !self.enabled {
            return;
        }
        self.loads.push(LoadEvent {
            parent: parent.map(str::to_owned),
            child: child.to_owned(),
            offset: self.host.end(),
        });
    }

    /// Attach post-execution data to the newest pending entry.
    ///
    /// Messages since `record` become its post-text. Load offsets are
    /// absolute stream offsets and are rebased onto that text. With no pending
    /// entry nothing is drained, so the text later renders as a standalone
    /// block.
    pub fn finalize_last(&mut self, change: ChangeState, loads: Vec<LoadEvent>) -> bool {
        if !self.enabled {
            return false;
        }
        if self.pending.is_empty() {
            tracing::debug!(loads = loads.len(), "finalize with no pending entry");
            return false;
        }
        let post_text = self.cursor.drain(&self.host);
        let origin = self.cursor.position().saturating_sub(post_text.len());
        let loads = loads
            .into_iter()
            .map(|load| load.relative_to(origin, post_text.len()))
            .collect();
        self.pending.finalize_last(&post_text, change, loads)
    }

    /// Finalize the newest entry with the loads noted since the last call.
    pub fn post_command(&mut self, change: ChangeState) -> bool {
        let loads = std::mem::take(&mut self.loads);
        self.finalize_last(change, loads)
    }

    // ── Flush ───────────────────────────────────────────────────────────

    /// Flush now, regardless of idle state.
    ///
    /// Returns `None` when capture is off.
    pub fn flush_now(&mut self) -> Option<FlushReport> {
        if !self.enabled {
            return None;
        }
        Some(self.flush())
    }

    /// Poll the timers and run whatever is due: flush first, then retention.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        if !self.enabled {
            return report;
        }
        let due = self.timers.due(now, self.host.idle_for());
        if due.is_empty() {
            return report;
        }
        crate::debug_trace!("tick: due={:?}", due);
        if self.flush_timer.is_some_and(|id| due.contains(&id)) {
            report.flush = Some(self.flush());
        }
        if self.retention_timer.is_some_and(|id| due.contains(&id)) {
            let outcome =
                self.retention
                    .on_tick(self.output.as_mut(), &mut self.views, self.host.log_focused());
            self.note_trim(outcome);
            report.retention = Some(outcome);
        }
        report
    }

    fn flush(&mut self) -> FlushReport {
        let report = self.render_pending();
        self.stats.flushes += 1;
        if !report.is_empty() {
            tracing::debug!(
                blocks = report.blocks.len(),
                erased = report.erased_lines,
                followed = report.followed_views.len(),
                "flushed"
            );
        }
        report
    }

    fn render_pending(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        let entries = self.pending.drain_all();
        let standalone = if entries.is_empty() {
            let text = self.cursor.drain(&self.host);
            if message_lines(&text).next().is_none() {
                return report;
            }
            Some(text)
        } else {
            None
        };

        let log = self.output.get_or_insert_with(|| {
            tracing::trace!("creating output log");
            OutputLog::new()
        });
        let following = if self.options.tail_follow {
            self.views.at_end(log.len())
        } else {
            Vec::new()
        };

        match standalone {
            Some(text) => {
                report.blocks.extend(self.renderer.render_standalone(log, &text));
            }
            None => {
                self.stats.entries_rendered += entries.len() as u64;
                let rendered = self.renderer.render_entries(log, entries);
                if rendered.folded {
                    self.stats.merged_across_flush += 1;
                }
                report.blocks = rendered.blocks;
                report.erased_lines = rendered.erased_lines;
                report.merged_across_flush = rendered.folded;
            }
        }

        let len = log.len();
        self.views.clamp(len);
        report.followed_views = self.views.follow(&following, len);
        crate::debug_trace!(
            "flush: blocks={}, erased={}, log_len={}",
            report.blocks.len(),
            report.erased_lines,
            len
        );
        report
    }

    // ── Retention ───────────────────────────────────────────────────────

    /// Trim to the retention bound now, even while the log is focused.
    ///
    /// Returns the number of removed lines.
    pub fn trim_now(&mut self) -> usize {
        let outcome = self.retention.trim(self.output.as_mut(), &mut self.views);
        self.note_trim(outcome)
    }

    fn note_trim(&mut self, outcome: RetentionOutcome) -> usize {
        match outcome {
            RetentionOutcome::Trimmed(removed) => {
                self.stats.lines_trimmed += removed as u64;
                removed
            }
            _ => 0,
        }
    }

    // ── Views ───────────────────────────────────────────────────────────

    /// Open a view positioned at the end of the log.
    pub fn open_view(&mut self) -> ViewId {
        let len = self.output_len();
        self.views.open(len)
    }

    /// Close a view. Returns `false` if it was not open.
    pub fn close_view(&mut self, id: ViewId) -> bool {
        self.views.close(id)
    }

    /// Move a view to `line`, clamped to the log length.
    pub fn scroll_view(&mut self, id: ViewId, line: usize) -> bool {
        let len = self.output_len();
        self.views.scroll_to(id, line, len)
    }

    /// Move a view to the end of the log.
    pub fn scroll_view_to_end(&mut self, id: ViewId) -> bool {
        let len = self.output_len();
        self.views.scroll_to_end(id, len)
    }

    /// Open views.
    #[must_use]
    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    fn output_len(&self) -> usize {
        self.output.as_ref().map_or(0, OutputLog::len)
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// The output log, once anything has been rendered.
    #[must_use]
    pub fn output(&self) -> Option<&OutputLog> {
        self.output.as_ref()
    }

    /// Visible output text, one string per shown line.
    #[must_use]
    pub fn visible_text(&self) -> Vec<String> {
        self.output
            .as_ref()
            .map(|log| log.to_plain_lines(self.visibility))
            .unwrap_or_default()
    }

    /// Entries awaiting the next flush.
    #[must_use]
    pub fn pending(&self) -> &PendingBuffer {
        &self.pending
    }

    /// Current visibility.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Replace the visibility.
    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    /// Flip the given visibility flags.
    pub fn toggle_visibility(&mut self, flags: Visibility) {
        self.visibility.toggle(flags);
    }

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Counters since creation.
    #[must_use]
    pub fn stats(&self) -> AggregatorStats {
        self.stats
    }

    /// The host.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

/// Clonable, non-reentrant handle for host hooks.
///
/// Every method borrows the aggregator for the duration of the call. A call
/// made while another is in progress (a hook fired from inside a flush)
/// returns `None` without effect and is counted in
/// [`rejected_calls`](Self::rejected_calls).
#[derive(Debug)]
pub struct SharedAggregator<H> {
    inner: Rc<RefCell<Aggregator<H>>>,
    rejected: Rc<Cell<u64>>,
}

impl<H> Clone for SharedAggregator<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            rejected: Rc::clone(&self.rejected),
        }
    }
}

impl<H: MessageStream + HostProbe> SharedAggregator<H> {
    /// Wrap an aggregator.
    #[must_use]
    pub fn new(aggregator: Aggregator<H>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(aggregator)),
            rejected: Rc::new(Cell::new(0)),
        }
    }

    /// Run `f` with exclusive access, or return `None` if already borrowed.
    pub fn with<R>(&self, f: impl FnOnce(&mut Aggregator<H>) -> R) -> Option<R> {
        match self.inner.try_borrow_mut() {
            Ok(mut aggregator) => Some(f(&mut aggregator)),
            Err(_) => {
                let rejected = self.rejected.get() + 1;
                self.rejected.set(rejected);
                tracing::trace!(rejected, "nested aggregator call ignored");
                None
            }
        }
    }

    /// Nested calls ignored so far, across all clones of this handle.
    #[must_use]
    pub fn rejected_calls(&self) -> u64 {
        self.rejected.get()
    }

    /// See [`Aggregator::record`].
    pub fn record<K: Into<KeyToken>>(
        &self,
        keys: impl IntoIterator<Item = K>,
        command: Option<&str>,
        context: &str,
    ) -> Option<RecordOutcome> {
        self.with(|a| a.record(keys, command, context)).flatten()
    }

    /// See [`Aggregator::note_load`].
    pub fn note_load(&self, parent: Option<&str>, child: &str) {
        self.with(|a| a.note_load(parent, child));
    }

    /// See [`Aggregator::post_command`].
    pub fn post_command(&self, change: ChangeState) -> bool {
        self.with(|a| a.post_command(change)).unwrap_or(false)
    }

    /// See [`Aggregator::tick`].
    pub fn tick(&self, now: Instant) -> Option<TickReport> {
        self.with(|a| a.tick(now))
    }

    /// See [`Aggregator::flush_now`].
    pub fn flush_now(&self) -> Option<FlushReport> {
        self.with(Aggregator::flush_now).flatten()
    }

    /// See [`Aggregator::trim_now`].
    pub fn trim_now(&self) -> Option<usize> {
        self.with(Aggregator::trim_now)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use interlog_core::MessageBuffer;

    use super::*;
    use crate::output::LineKind;

    #[derive(Debug, Default)]
    struct Host {
        messages: MessageBuffer,
        idle: Option<Duration>,
        sensitive: bool,
        focused: bool,
    }

    impl MessageStream for Host {
        fn end(&self) -> Option<usize> {
            self.messages.end()
        }

        fn start(&self) -> Option<usize> {
            self.messages.start()
        }

        fn read(&self, range: std::ops::Range<usize>) -> Option<String> {
            self.messages.read(range)
        }
    }

    impl HostProbe for Host {
        fn sensitive_input(&self) -> bool {
            self.sensitive
        }

        fn idle_for(&self) -> Option<Duration> {
            self.idle
        }

        fn log_focused(&self) -> bool {
            self.focused
        }
    }

    fn enabled(options: Options) -> (Aggregator<Host>, Instant) {
        let t0 = Instant::now();
        let mut agg = Aggregator::new(Host::default(), options).expect("valid options");
        agg.enable(t0);
        (agg, t0)
    }

    #[test]
    fn invalid_options_rejected() {
        let opts = Options::default().with_idle_threshold(Duration::ZERO);
        assert!(Aggregator::new(Host::default(), opts).is_err());
    }

    #[test]
    fn disabled_aggregator_ignores_capture() {
        let mut agg = Aggregator::new(Host::default(), Options::default()).expect("valid");
        assert_eq!(agg.record(["a"], Some("x"), ""), None);
        assert!(agg.pending().is_empty());
        assert!(agg.flush_now().is_none());
    }

    #[test]
    fn enable_skips_existing_messages() {
        let host = Host::default();
        host.messages.message("old");
        let mut agg = Aggregator::new(host, Options::default()).expect("valid");
        agg.enable(Instant::now());
        agg.record(["a"], Some("x"), "");
        assert_eq!(agg.pending().entries()[0].pre_text, "");
    }

    #[test]
    fn record_collects_pre_text() {
        let (mut agg, _) = enabled(Options::default());
        agg.host().messages.message("hello");
        agg.record(["a"], Some("x"), "");
        assert_eq!(agg.pending().entries()[0].pre_text, "hello\n");
    }

    #[test]
    fn sensitive_input_is_masked() {
        let (mut agg, _) = enabled(Options::default());
        agg.host_mut().sensitive = true;
        agg.record(["s", "e", "c"], Some("self-insert"), "pw");
        let entry = &agg.pending().entries()[0];
        assert_eq!(entry.keys, vec![KeyToken::Masked]);
        assert_eq!(entry.command, CommandId::Masked);
        assert_eq!(agg.stats().masked, 1);
    }

    #[test]
    fn post_command_attaches_noted_loads() {
        let (mut agg, _) = enabled(Options::default());
        agg.host().messages.message("before");
        agg.record(["a"], Some("x"), "");
        agg.note_load(None, "outer");
        agg.host().messages.message("Loading outer");
        agg.note_load(Some("outer"), "inner");
        agg.host().messages.message("Loading inner");
        assert!(agg.post_command(ChangeState::Mutated));
        let entry = &agg.pending().entries()[0];
        let depths: Vec<usize> = entry.loads.iter().map(|l| l.depth).collect();
        assert_eq!(depths, vec![0, 1]);
        let offsets: Vec<usize> = entry.loads.iter().map(|l| l.offset).collect();
        assert_eq!(offsets, vec![0, 14]);
        assert_eq!(entry.post_text, "Loading outer\nLoading inner\n");
        assert_eq!(entry.change, ChangeState::Mutated);
    }

    #[test]
    fn finalize_without_entry_leaves_text_for_standalone() {
        let (mut agg, _) = enabled(Options::default());
        agg.host().messages.message("stray");
        assert!(!agg.finalize_last(ChangeState::None, Vec::new()));
        let report = agg.flush_now().expect("flush");
        assert_eq!(report.blocks.len(), 1);
        assert_eq!(agg.visible_text(), vec!["  stray"]);
    }

    #[test]
    fn output_log_is_created_lazily() {
        let (mut agg, _) = enabled(Options::default());
        assert!(agg.flush_now().expect("flush").is_empty());
        assert!(agg.output().is_none());
        agg.record(["a"], Some("x"), "");
        agg.flush_now();
        assert_eq!(agg.output().map(OutputLog::len), Some(1));
    }

    #[test]
    fn tick_flushes_only_when_idle() {
        let (mut agg, t0) = enabled(Options::default());
        agg.record(["a"], Some("x"), "");
        agg.host_mut().idle = Some(Duration::from_millis(20));
        assert!(agg.tick(t0 + Duration::from_millis(20)).flush.is_none());
        assert_eq!(agg.pending().len(), 1);
        agg.host_mut().idle = Some(Duration::from_millis(100));
        let report = agg.tick(t0 + Duration::from_millis(100));
        assert!(report.flush.is_some());
        assert!(agg.pending().is_empty());
    }

    #[test]
    fn unknown_idle_state_counts_as_busy() {
        let (mut agg, t0) = enabled(Options::default());
        agg.record(["a"], Some("x"), "");
        assert!(agg.tick(t0 + Duration::from_secs(1)).flush.is_none());
    }

    #[test]
    fn retention_tick_respects_focus() {
        let opts = Options::default()
            .with_retention_max(Some(2))
            .with_retention_interval(Duration::from_secs(1));
        let (mut agg, t0) = enabled(opts);
        for key in ["a", "b", "c", "d"] {
            agg.record([key], Some("x"), "");
        }
        agg.flush_now();
        agg.host_mut().focused = true;
        let report = agg.tick(t0 + Duration::from_secs(1));
        assert_eq!(report.retention, Some(RetentionOutcome::Focused));
        assert_eq!(agg.output().map(OutputLog::len), Some(4));
        agg.host_mut().focused = false;
        let report = agg.tick(t0 + Duration::from_secs(2));
        assert_eq!(report.retention, Some(RetentionOutcome::Trimmed(2)));
        assert_eq!(agg.stats().lines_trimmed, 2);
    }

    #[test]
    fn trim_now_ignores_focus() {
        let (mut agg, _) = enabled(Options::default().with_retention_max(Some(1)));
        agg.record(["a"], Some("x"), "");
        agg.record(["b"], Some("x"), "");
        agg.flush_now();
        agg.host_mut().focused = true;
        assert_eq!(agg.trim_now(), 1);
    }

    #[test]
    fn disable_drops_pending_and_stops_ticks() {
        let (mut agg, t0) = enabled(Options::default());
        agg.record(["a"], Some("x"), "");
        agg.disable();
        assert!(agg.pending().is_empty());
        agg.host_mut().idle = Some(Duration::from_secs(1));
        assert_eq!(agg.tick(t0 + Duration::from_secs(1)), TickReport::default());
        agg.disable();
        agg.enable(t0);
        assert!(agg.is_enabled());
    }

    #[test]
    fn tail_follow_moves_only_views_at_end() {
        let (mut agg, _) = enabled(Options::default());
        agg.record(["a"], Some("x"), "");
        agg.record(["b"], Some("x"), "");
        agg.flush_now();
        let tail = agg.open_view();
        let back = agg.open_view();
        agg.scroll_view(back, 0);
        agg.record(["c"], Some("x"), "");
        let report = agg.flush_now().expect("flush");
        assert_eq!(report.followed_views, vec![tail]);
        assert_eq!(agg.views().cursor(tail), Some(3));
        assert_eq!(agg.views().cursor(back), Some(0));
    }

    #[test]
    fn tail_follow_can_be_disabled() {
        let (mut agg, _) = enabled(Options::default().with_tail_follow(false));
        let view = agg.open_view();
        agg.record(["a"], Some("x"), "");
        let report = agg.flush_now().expect("flush");
        assert!(report.followed_views.is_empty());
        assert_eq!(agg.views().cursor(view), Some(0));
    }

    #[test]
    fn visibility_toggles_hide_lines() {
        let (mut agg, _) = enabled(Options::default());
        agg.host().messages.message("note");
        agg.record(["a"], Some("x"), "");
        agg.flush_now();
        assert_eq!(agg.visible_text().len(), 2);
        agg.toggle_visibility(Visibility::MESSAGES);
        assert_eq!(agg.visible_text().len(), 1);
        let kinds: Vec<bool> = agg
            .output()
            .map(|log| log.lines().map(|l| l.kind == LineKind::Message).collect())
            .unwrap_or_default();
        assert_eq!(kinds, vec![true, false]);
    }

    #[test]
    fn shared_handle_rejects_nested_calls() {
        let (agg, _) = enabled(Options::default());
        let shared = SharedAggregator::new(agg);
        let nested = shared.with(|_| shared.record(["a"], Some("x"), ""));
        assert_eq!(nested, Some(None));
        assert_eq!(shared.rejected_calls(), 1);
        assert_eq!(shared.record(["a"], Some("x"), ""), Some(RecordOutcome::Appended));
        assert_eq!(shared.clone().rejected_calls(), 1);
    }
}
