#![forbid(unsafe_code)]

//! The rendered, append-only output log.
//!
//! Each [`LogLine`] is a sequence of tagged [`Span`]s so presentation layers
//! can style keys, commands, context labels, messages, and loads without
//! re-parsing text. Lines are grouped into [`Block`]s at render time: one
//! block per entry, or a standalone block for messages seen with no entry.
//!
//! # Addressing
//!
//! Lines are addressed by index from the current front. The log also counts
//! every line ever trimmed from the front ([`OutputLog::trimmed`]), so
//! `trimmed() + index` is a stable absolute line number across retention.
//!
//! # Layout
//!
//! ```text
//! 3 x C-n             next-line                     [main.rs]
//!   Mark set
//!     Loading lib...
//! ```
//!
//! Command lines pad the repeat label and keys to `key_column` and the
//! command to `command_column` (display columns). Labels that do not fit are
//! cut on a grapheme boundary and end in `…`.

use std::collections::VecDeque;

use interlog_core::{ChangeState, LogEntry, Visibility};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Indentation of message lines.
const MESSAGE_INDENT: &str = "  ";

/// Extra indentation per load depth.
const LOAD_INDENT: &str = "  ";

/// What a span of text represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanTag {
    /// `N x ` prefix of a repeated command.
    Repeat,
    /// Key description.
    Keys,
    /// Command identifier.
    Command,
    /// Context label.
    Context,
    /// Message text.
    Message,
    /// Message text that reports a load.
    Load,
}

/// A tagged run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// What the text represents.
    pub tag: SpanTag,
    /// Text, including any layout padding.
    pub text: String,
}

impl Span {
    fn new(tag: SpanTag, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
        }
    }
}

/// Kind of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// The keys/command/context line of an entry.
    Command {
        /// Occurrences represented by the line.
        repeat: u32,
        /// Observable effect, for styling.
        change: ChangeState,
    },
    /// A plain message line.
    Message,
    /// A message line that coincides with a load, indented by depth.
    Load {
        /// Nesting depth of the load.
        depth: usize,
    },
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Line kind.
    pub kind: LineKind,
    /// Tagged text, in display order.
    pub spans: Vec<Span>,
}

impl LogLine {
    /// A plain message line.
    #[must_use]
    pub fn message(text: &str) -> Self {
        Self {
            kind: LineKind::Message,
            spans: vec![Span::new(SpanTag::Message, format!("{MESSAGE_INDENT}{text}"))],
        }
    }

    /// A message line reporting a load at `depth`.
    #[must_use]
    pub fn load(text: &str, depth: usize) -> Self {
        let indent = LOAD_INDENT.repeat(depth);
        Self {
            kind: LineKind::Load { depth },
            spans: vec![Span::new(
                SpanTag::Load,
                format!("{MESSAGE_INDENT}{indent}{text}"),
            )],
        }
    }

    /// True for command lines.
    #[must_use]
    pub fn is_command(&self) -> bool {
        matches!(self.kind, LineKind::Command { .. })
    }

    /// Whether this line is shown under `vis`.
    #[must_use]
    pub fn is_visible(&self, vis: Visibility) -> bool {
        match self.kind {
            LineKind::Command { .. } => vis.contains(Visibility::COMMANDS),
            LineKind::Message => vis.contains(Visibility::MESSAGES),
            LineKind::Load { .. } => vis.contains(Visibility::LOADS),
        }
    }

    /// Full text of the line, trailing padding removed.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            out.push_str(&span.text);
        }
        out.truncate(out.trim_end().len());
        out
    }

    /// Text with hidden spans dropped, or `None` if the line is hidden.
    #[must_use]
    pub fn plain_text_with(&self, vis: Visibility) -> Option<String> {
        if !self.is_visible(vis) {
            return None;
        }
        let mut out = String::new();
        for span in &self.spans {
            let shown = match span.tag {
                SpanTag::Repeat => vis.contains(Visibility::REPEATS),
                SpanTag::Context => vis.contains(Visibility::CONTEXT),
                _ => true,
            };
            if shown {
                out.push_str(&span.text);
            }
        }
        out.truncate(out.trim_end().len());
        Some(out)
    }
}

/// Kind of a rendered block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Rendered from an entry.
    Entry,
    /// Messages observed while no entry was pending.
    Standalone,
}

/// Lines emitted together by one flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block kind.
    pub kind: BlockKind,
    /// Index of the first line at emission time.
    pub start: usize,
    /// Emitted lines.
    pub lines: Vec<LogLine>,
}

/// Column layout for command lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineLayout {
    /// Display column where the command starts.
    pub key_column: usize,
    /// Display width of the command field.
    pub command_column: usize,
}

impl Default for LineLayout {
    fn default() -> Self {
        Self {
            key_column: 20,
            command_column: 30,
        }
    }
}

impl LineLayout {
    /// Build the command line for `entry`.
    #[must_use]
    pub fn command_line(&self, entry: &LogEntry) -> LogLine {
        let mut spans = Vec::with_capacity(4);
        let mut used = 0;
        if entry.repeat_count > 1 {
            let prefix = format!("{} x ", entry.repeat_count);
            used = prefix.width();
            spans.push(Span::new(SpanTag::Repeat, prefix));
        }
        let keys_max = self.key_column.saturating_sub(1).saturating_sub(used);
        let mut keys = truncate_to_width(&entry.key_description(), keys_max);
        pad_to_width(&mut keys, self.key_column.saturating_sub(used));
        spans.push(Span::new(SpanTag::Keys, keys));

        let mut command = truncate_to_width(entry.command.label(), self.command_column.saturating_sub(1));
        pad_to_width(&mut command, self.command_column);
        spans.push(Span::new(SpanTag::Command, command));

        if !entry.context.is_empty() {
            spans.push(Span::new(SpanTag::Context, format!("[{}]", entry.context)));
        }
        LogLine {
            kind: LineKind::Command {
                repeat: entry.repeat_count,
                change: entry.change,
            },
            spans,
        }
    }
}

/// Cut `text` to at most `max` display columns, ending in `…` when cut.
#[must_use]
pub fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_owned();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let w = grapheme.width();
        if used + w > max - 1 {
            break;
        }
        out.push_str(grapheme);
        used += w;
    }
    out.push('…');
    out
}

fn pad_to_width(text: &mut String, width: usize) {
    let current = text.width();
    if current < width {
        text.extend(std::iter::repeat_n(' ', width - current));
    }
}

/// Append-only output lines with front trimming.
#[derive(Debug, Clone, Default)]
pub struct OutputLog {
    lines: VecDeque<LogLine>,
    trimmed: usize,
}

impl OutputLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if the log holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines ever removed from the front.
    #[must_use]
    pub fn trimmed(&self) -> usize {
        self.trimmed
    }

    /// Absolute number of the line after the last one.
    #[must_use]
    pub fn end_absolute(&self) -> usize {
        self.trimmed + self.lines.len()
    }

    /// Line at `idx`.
    #[must_use]
    pub fn line(&self, idx: usize) -> Option<&LogLine> {
        self.lines.get(idx)
    }

    /// All lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &LogLine> + '_ {
        self.lines.iter()
    }

    /// Lines shown under `vis`, with their indices.
    pub fn visible_lines(&self, vis: Visibility) -> impl Iterator<Item = (usize, &LogLine)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .filter(move |(_, line)| line.is_visible(vis))
    }

    /// Visible text, one string per shown line.
    #[must_use]
    pub fn to_plain_lines(&self, vis: Visibility) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|line| line.plain_text_with(vis))
            .collect()
    }

    /// Append a line.
    pub fn push(&mut self, line: LogLine) {
        self.lines.push_back(line);
    }

    /// Remove every line from absolute line `start` to the end.
    ///
    /// Returns the number of removed lines, or `None` if `start` has been
    /// trimmed or lies past the end.
    pub fn erase_from_absolute(&mut self, start: usize) -> Option<usize> {
        let idx = start.checked_sub(self.trimmed)?;
        if idx > self.lines.len() {
            return None;
        }
        let removed = self.lines.len() - idx;
        self.lines.truncate(idx);
        Some(removed)
    }

    /// Drop the oldest lines so at most `max` remain; returns how many went.
    pub fn trim_front(&mut self, max: usize) -> usize {
        if self.lines.len() <= max {
            return 0;
        }
        let excess = self.lines.len() - max;
        self.lines.drain(..excess);
        self.trimmed += excess;
        excess
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.trimmed += self.lines.len();
        self.lines.clear();
    }
}
