#![forbid(unsafe_code)]

//! Turning drained entries into output lines.
//!
//! The renderer owns the only state that survives a flush: the most recently
//! rendered entry, kept so a later identical occurrence can replace its line
//! with a combined count instead of appending a duplicate.
//!
//! # Per-flush procedure
//!
//! 1. If the first entry folds into the remembered entry and that entry's
//!    block is still the tail of the log, erase the block and add its count.
//! 2. Emit one block per entry: pre-text message lines, the command line,
//!    then post-text lines. A line written right after a load was noted is
//!    tagged with that load's depth; loads that printed nothing get a line
//!    showing their id.
//! 3. Remember the last entry if its post-text was empty.
//!
//! Message-only flushes emit a standalone block and forget the remembered
//! entry.

use std::iter::Peekable;
use std::slice;

use interlog_core::{LoadedResource, LogEntry};

use crate::output::{Block, BlockKind, LineLayout, LogLine, OutputLog};

/// The last entry written to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntry {
    /// The entry as rendered, with its displayed count.
    pub entry: LogEntry,
    /// Absolute line number of the block's first line.
    pub start: usize,
}

/// Result of rendering a batch of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Blocks appended, in order.
    pub blocks: Vec<Block>,
    /// Lines erased by a cross-flush merge.
    pub erased_lines: usize,
    /// True if the first entry replaced the previously rendered one.
    pub folded: bool,
}

/// Formats entries and tracks the cross-flush merge candidate.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    layout: LineLayout,
    last: Option<RenderedEntry>,
}

impl Renderer {
    /// Create a renderer with the given column layout.
    #[must_use]
    pub fn new(layout: LineLayout) -> Self {
        Self { layout, last: None }
    }

    /// Column layout in use.
    #[must_use]
    pub fn layout(&self) -> LineLayout {
        self.layout
    }

    /// The remembered entry, if any.
    #[must_use]
    pub fn last_rendered(&self) -> Option<&RenderedEntry> {
        self.last.as_ref()
    }

    /// Forget the remembered entry.
    pub fn forget(&mut self) {
        self.last = None;
    }

    /// Render drained entries into `log`.
    pub fn render_entries(&mut self, log: &mut OutputLog, mut entries: Vec<LogEntry>) -> Rendered {
        let mut rendered = Rendered::default();
        if let Some(prev) = self.last.take()
            && let Some(first) = entries.first_mut()
            && first.folds_into(&prev.entry)
        {
            match log.erase_from_absolute(prev.start) {
                Some(erased) => {
                    first.repeat_count = first.repeat_count.saturating_add(prev.entry.repeat_count);
                    rendered.erased_lines = erased;
                    rendered.folded = true;
                    tracing::trace!(
                        erased,
                        repeat = first.repeat_count,
                        "folded entry into previous flush"
                    );
                }
                None => {
                    tracing::debug!(start = prev.start, "previous block trimmed, not folding");
                }
            }
        }

        let count = entries.len();
        for (i, entry) in entries.into_iter().enumerate() {
            let start_abs = log.end_absolute();
            let block = self.emit_entry(log, &entry);
            rendered.blocks.push(block);
            if i + 1 == count && entry.post_text.is_empty() {
                self.last = Some(RenderedEntry {
                    entry,
                    start: start_abs,
                });
            }
        }
        rendered
    }

    /// Render message text seen with no pending entry.
    ///
    /// Returns `None`, leaving the remembered entry alone, if `text` has no
    /// non-blank lines.
    pub fn render_standalone(&mut self, log: &mut OutputLog, text: &str) -> Option<Block> {
        let lines: Vec<LogLine> = message_lines(text).map(LogLine::message).collect();
        if lines.is_empty() {
            return None;
        }
        self.last = None;
        let start = log.len();
        for line in &lines {
            log.push(line.clone());
        }
        Some(Block {
            kind: BlockKind::Standalone,
            start,
            lines,
        })
    }

    fn emit_entry(&self, log: &mut OutputLog, entry: &LogEntry) -> Block {
        let start = log.len();
        let mut lines = Vec::new();
        lines.extend(message_lines(&entry.pre_text).map(LogLine::message));
        lines.push(self.layout.command_line(entry));
        let mut placer = LoadPlacer::new(&entry.loads);
        for (at, text) in message_spans(&entry.post_text) {
            let line = match placer.claim(at, &mut lines) {
                Some(depth) => LogLine::load(text, depth),
                None => LogLine::message(text),
            };
            lines.push(line);
        }
        placer.finish(&mut lines);
        for line in &lines {
            log.push(line.clone());
        }
        Block {
            kind: BlockKind::Entry,
            start,
            lines,
        }
    }
}

/// Non-blank lines of message text, trailing whitespace removed.
pub(crate) fn message_lines(text: &str) -> impl Iterator<Item = &str> {
    message_spans(text).map(|(_, line)| line)
}

/// Non-blank lines with the byte offset where each starts.
fn message_spans(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_inclusive('\n')
        .scan(0, |pos, raw| {
            let start = *pos;
            *pos += raw.len();
            Some((start, raw.trim_end()))
        })
        .filter(|(_, line)| !line.is_empty())
}

/// Places loads among post-text lines by message position.
///
/// A line starting at byte `s` belongs to the newest unplaced load noted at
/// or before `s`. Older unplaced loads in that range printed nothing of their
/// own and get a line showing their id. Loads noted after the last line are
/// placed at the end.
struct LoadPlacer<'a> {
    loads: Peekable<slice::Iter<'a, LoadedResource>>,
}

impl<'a> LoadPlacer<'a> {
    fn new(loads: &'a [LoadedResource]) -> Self {
        Self {
            loads: loads.iter().peekable(),
        }
    }

    /// Depth of the load owning the line at `start`, if any.
    fn claim(&mut self, start: usize, lines: &mut Vec<LogLine>) -> Option<usize> {
        let mut owner = None;
        while let Some(load) = self.loads.next_if(|load| load.offset <= start) {
            if let Some(silent) = owner.replace(load) {
                lines.extend(id_line(silent));
            }
        }
        owner.map(|load| load.depth)
    }

    fn finish(self, lines: &mut Vec<LogLine>) {
        lines.extend(self.loads.filter_map(id_line));
    }
}

fn id_line(load: &LoadedResource) -> Option<LogLine> {
    (!load.id.is_empty()).then(|| LogLine::load(&load.id, load.depth))
}

#[cfg(test)]
mod tests {
    use interlog_core::{ChangeState, CommandId, KeyToken, LoadEvent, Visibility};

    use super::*;
    use crate::output::LineKind;

    fn entry(key: &str) -> LogEntry {
        LogEntry::new(vec![KeyToken::from(key)], CommandId::from("cmd"), "ctx", "")
    }

    fn kinds(log: &OutputLog) -> Vec<LineKind> {
        log.lines().map(|l| l.kind).collect()
    }

    #[test]
    fn renders_pre_command_post_in_order() {
        let mut log = OutputLog::new();
        let mut r = Renderer::default();
        let mut e = LogEntry::new(vec![KeyToken::from("a")], CommandId::from("x"), "c", "before\n");
        e.finalize("after\n", ChangeState::Mutated, Vec::new());
        let out = r.render_entries(&mut log, vec![e]);
        assert_eq!(out.blocks.len(), 1);
        assert_eq!(
            kinds(&log),
            vec![
                LineKind::Message,
                LineKind::Command {
                    repeat: 1,
                    change: ChangeState::Mutated
                },
                LineKind::Message,
            ]
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut log = OutputLog::new();
        let mut r = Renderer::default();
        let e = LogEntry::new(vec![KeyToken::from("a")], CommandId::from("x"), "c", "\n  \nhi\n");
        r.render_entries(&mut log, vec![e]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn second_flush_replaces_line() {
        let mut log = OutputLog::new();
        let mut r = Renderer::default();
        r.render_entries(&mut log, vec![entry("a")]);
        let out = r.render_entries(&mut log, vec![entry("a")]);
        assert_eq!(out.erased_lines, 1);
        assert!(out.folded);
        assert_eq!(log.len(), 1);
        assert_eq!(
            log.line(0).map(|l| l.kind),
            Some(LineKind::Command {
                repeat: 2,
                change: ChangeState::None
            })
        );
    }

    #[test]
    fn post_text_clears_candidate() {
        let mut log = OutputLog::new();
        let mut r = Renderer::default();
        let mut e = entry("a");
        e.finalize("msg\n", ChangeState::None, Vec::new());
        r.render_entries(&mut log, vec![e]);
        assert!(r.last_rendered().is_none());
    }

    #[test]
    fn change_state_mismatch_appends() {
        let mut log = OutputLog::new();
        let mut r = Renderer::default();
        r.render_entries(&mut log, vec![entry("a")]);
        let mut e = entry("a");
        e.change = ChangeState::Mutated;
        let out = r.render_entries(&mut log, vec![e]);
        assert_eq!(out.erased_lines, 0);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn trimmed_candidate_is_not_folded() {
        let mut log = OutputLog::new();
        let mut r = Renderer::default();
        r.render_entries(&mut log, vec![entry("a")]);
        log.trim_front(0);
        let out = r.render_entries(&mut log, vec![entry("a")]);
        assert_eq!(out.erased_lines, 0);
        assert_eq!(
            log.line(0).map(|l| l.kind),
            Some(LineKind::Command {
                repeat: 1,
                change: ChangeState::None
            })
        );
    }

    #[test]
    fn standalone_forgets_candidate() {
        let mut log = OutputLog::new();
        let mut r = Renderer::default();
        r.render_entries(&mut log, vec![entry("a")]);
        let block = r.render_standalone(&mut log, "note\n").expect("block");
        assert_eq!(block.kind, BlockKind::Standalone);
        assert!(r.last_rendered().is_none());
        r.render_entries(&mut log, vec![entry("a")]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn standalone_ignores_blank_text() {
        let mut log = OutputLog::new();
        let mut r = Renderer::default();
        r.render_entries(&mut log, vec![entry("a")]);
        assert!(r.render_standalone(&mut log, "\n \n").is_none());
        assert_eq!(log.len(), 1);
        assert!(r.last_rendered().is_some());
    }

    #[test]
    fn line_written_after_load_takes_its_depth() {
        let mut log = OutputLog::new();
        let mut r = Renderer::default();
        let mut e = entry("M-x");
        e.finalize(
            "Loading outer...\nLoading inner...done\nLoading outer...done\nOK\n",
            ChangeState::None,
            vec![
                LoadEvent::top_level("outer").at(0),
                LoadEvent::nested("outer", "inner").at(17),
            ],
        );
        r.render_entries(&mut log, vec![e]);
        assert_eq!(
            kinds(&log)[1..],
            [
                LineKind::Load { depth: 0 },
                LineKind::Load { depth: 1 },
                LineKind::Message,
                LineKind::Message,
            ]
        );
    }

    #[test]
    fn short_load_id_does_not_tag_unrelated_message() {
        let mut log = OutputLog::new();
        let mut r = Renderer::default();
        let mut e = entry("C-g");
        e.finalize(
            "Loading cl...done\nMark cleared\nCancelled\n",
            ChangeState::None,
            vec![LoadEvent::top_level("x"), LoadEvent::nested("x", "cl")],
        );
        r.render_entries(&mut log, vec![e]);
        assert_eq!(
            kinds(&log)[1..],
            [
                LineKind::Load { depth: 0 },
                LineKind::Load { depth: 1 },
                LineKind::Message,
                LineKind::Message,
            ]
        );
        let text = log.to_plain_lines(Visibility::all());
        assert_eq!(text[1], "  x");
        assert_eq!(text[2], "    Loading cl...done");
        assert_eq!(text[3], "  Mark cleared");
    }

    #[test]
    fn silent_load_after_last_line_is_shown() {
        let mut log = OutputLog::new();
        let mut r = Renderer::default();
        let mut e = entry("M-x");
        e.finalize("Saved\n", ChangeState::None, vec![LoadEvent::top_level("lib").at(6)]);
        r.render_entries(&mut log, vec![e]);
        assert_eq!(kinds(&log)[1..], [LineKind::Message, LineKind::Load { depth: 0 }]);
        assert_eq!(log.line(2).map(LogLine::plain_text).as_deref(), Some("  lib"));
    }

    #[test]
    fn spans_report_line_starts() {
        let spans: Vec<(usize, &str)> = message_spans("a\n\n  \nbc  \nd").collect();
        assert_eq!(spans, vec![(0, "a"), (6, "bc"), (11, "d")]);
    }

    #[test]
    fn folded_count_accumulates_across_three_flushes() {
        let mut log = OutputLog::new();
        let mut r = Renderer::default();
        for _ in 0..3 {
            r.render_entries(&mut log, vec![entry("a")]);
        }
        assert_eq!(log.len(), 1);
        assert_eq!(r.last_rendered().map(|l| l.entry.repeat_count), Some(3));
    }
}
