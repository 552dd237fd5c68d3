#![forbid(unsafe_code)]

//! Pending entries awaiting the next flush.
//!
//! Entries are kept oldest-first. Only the tail is ever mutated: a new
//! occurrence either bumps the tail's count or is appended, and the
//! post-execution phase finalizes the tail.
//!
//! The buffer does not read the message stream itself; the aggregator drains
//! its cursor and hands the text in, so each capture point drains exactly
//! once.

use interlog_core::{ChangeState, CommandId, KeyToken, LoadEvent, LogEntry};

/// What [`PendingBuffer::record`] did with an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Folded into the tail entry, which now has this count.
    Merged(u32),
    /// Appended as a new entry.
    Appended,
}

/// Ordered, not-yet-rendered entries.
#[derive(Debug, Clone, Default)]
pub struct PendingBuffer {
    entries: Vec<LogEntry>,
}

impl PendingBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending entries (not occurrences).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Add one occurrence, merging with the tail when allowed.
    pub fn record(
        &mut self,
        keys: Vec<KeyToken>,
        command: CommandId,
        context: &str,
        pre_text: String,
    ) -> RecordOutcome {
        if let Some(tail) = self.entries.last_mut()
            && tail.absorbs(&keys, &command, context, &pre_text)
        {
            tail.bump();
            return RecordOutcome::Merged(tail.repeat_count);
        }
        self.entries
            .push(LogEntry::new(keys, command, context, pre_text));
        RecordOutcome::Appended
    }

    /// Attach post-execution data to the tail entry.
    ///
    /// Returns `false` if there is no entry to finalize.
    pub fn finalize_last(
        &mut self,
        post_text: &str,
        change: ChangeState,
        loads: Vec<LoadEvent>,
    ) -> bool {
        match self.entries.last_mut() {
            Some(tail) => {
                tail.finalize(post_text, change, loads);
                true
            }
            None => false,
        }
    }

    /// Take every pending entry, oldest first.
    #[must_use]
    pub fn drain_all(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Discard every pending entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(k: &str) -> Vec<KeyToken> {
        vec![KeyToken::from(k)]
    }

    fn record(buf: &mut PendingBuffer, k: &str, pre: &str) -> RecordOutcome {
        buf.record(keys(k), CommandId::from("cmd"), "ctx", pre.to_owned())
    }

    #[test]
    fn identical_records_merge() {
        let mut buf = PendingBuffer::new();
        assert_eq!(record(&mut buf, "a", ""), RecordOutcome::Appended);
        assert_eq!(record(&mut buf, "a", ""), RecordOutcome::Merged(2));
        assert_eq!(record(&mut buf, "a", ""), RecordOutcome::Merged(3));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.entries()[0].repeat_count, 3);
    }

    #[test]
    fn pre_text_starts_new_entry() {
        let mut buf = PendingBuffer::new();
        record(&mut buf, "a", "");
        assert_eq!(record(&mut buf, "a", "msg\n"), RecordOutcome::Appended);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.entries()[1].pre_text, "msg\n");
    }

    #[test]
    fn post_text_blocks_merge() {
        let mut buf = PendingBuffer::new();
        record(&mut buf, "a", "");
        buf.finalize_last("saved\n", ChangeState::Mutated, Vec::new());
        assert_eq!(record(&mut buf, "a", ""), RecordOutcome::Appended);
    }

    #[test]
    fn loads_block_merge() {
        let mut buf = PendingBuffer::new();
        record(&mut buf, "a", "");
        buf.finalize_last("", ChangeState::None, vec![LoadEvent::top_level("lib")]);
        assert_eq!(record(&mut buf, "a", ""), RecordOutcome::Appended);
    }

    #[test]
    fn different_keys_do_not_merge() {
        let mut buf = PendingBuffer::new();
        record(&mut buf, "a", "");
        record(&mut buf, "b", "");
        record(&mut buf, "a", "");
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn finalize_targets_tail() {
        let mut buf = PendingBuffer::new();
        record(&mut buf, "a", "");
        record(&mut buf, "b", "");
        assert!(buf.finalize_last("out\n", ChangeState::Echoed, Vec::new()));
        assert_eq!(buf.entries()[0].post_text, "");
        assert_eq!(buf.entries()[1].post_text, "out\n");
        assert_eq!(buf.entries()[1].change, ChangeState::Echoed);
    }

    #[test]
    fn finalize_on_empty_buffer_reports_false() {
        let mut buf = PendingBuffer::new();
        assert!(!buf.finalize_last("x", ChangeState::None, Vec::new()));
    }

    #[test]
    fn drain_all_preserves_order_and_empties() {
        let mut buf = PendingBuffer::new();
        for k in ["a", "b", "c"] {
            record(&mut buf, k, "");
        }
        let drained = buf.drain_all();
        let order: Vec<String> = drained.iter().map(LogEntry::key_description).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(buf.is_empty());
    }
}
