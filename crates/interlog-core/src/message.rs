#![forbid(unsafe_code)]

//! The host's message stream and the cursor that consumes it.
//!
//! Hosts keep a global, append-only log of status messages. The aggregator
//! attributes new text to whatever interaction happened around it, so it must
//! read each byte exactly once. [`MessageCursor`] remembers the absolute
//! offset it has consumed up to; [`MessageStream`] abstracts the host log.
//!
//! # Invariants
//!
//! 1. Offsets are absolute: truncating old text never shifts them.
//! 2. `drain` returns exactly the bytes in `[cursor, end)` and moves the
//!    cursor to `end`; a second drain without writes returns `""`.
//! 3. Unavailable streams (`end() == None`, failed reads) return `""` and
//!    leave the cursor where it was.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | stream unavailable | empty drain, cursor unchanged |
//! | text before cursor was truncated | resume at oldest retained offset |
//! | end moved backwards (host reset) | cursor snaps to new end, empty drain |

use std::ops::Range;
use std::sync::{Arc, RwLock};

/// A global append-only text stream addressed by absolute byte offsets.
pub trait MessageStream {
    /// Absolute offset one past the last byte ever appended.
    ///
    /// `None` when the stream cannot be read right now.
    fn end(&self) -> Option<usize>;

    /// Oldest offset still retained.
    fn start(&self) -> Option<usize> {
        Some(0)
    }

    /// Text in `range`, or `None` if any of it is unavailable.
    fn read(&self, range: Range<usize>) -> Option<String>;
}

impl<T: MessageStream + ?Sized> MessageStream for &T {
    fn end(&self) -> Option<usize> {
        (**self).end()
    }

    fn start(&self) -> Option<usize> {
        (**self).start()
    }

    fn read(&self, range: Range<usize>) -> Option<String> {
        (**self).read(range)
    }
}

#[derive(Debug, Default)]
struct BufferInner {
    text: String,
    /// Absolute offset of `text[0]`.
    base: usize,
    capacity: Option<usize>,
}

impl BufferInner {
    fn end(&self) -> usize {
        self.base + self.text.len()
    }

    fn enforce_capacity(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        if self.text.len() <= capacity {
            return;
        }
        let mut cut = self.text.len() - capacity;
        while !self.text.is_char_boundary(cut) {
            cut += 1;
        }
        self.text.drain(..cut);
        self.base += cut;
    }
}

/// In-memory message stream shared between a host and its aggregator.
///
/// Clones share the same underlying text.
#[derive(Debug, Clone, Default)]
pub struct MessageBuffer {
    inner: Arc<RwLock<BufferInner>>,
}

impl MessageBuffer {
    /// Create an empty, unbounded buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer that retains at most `max_bytes` of recent text.
    #[must_use]
    pub fn with_capacity(max_bytes: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(BufferInner {
                capacity: Some(max_bytes),
                ..BufferInner::default()
            })),
        }
    }

    /// Append raw text.
    pub fn push_str(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Ok(mut inner) = self.inner.write() {
            inner.text.push_str(text);
            inner.enforce_capacity();
        }
    }

    /// Append one message line, adding the trailing newline.
    pub fn message(&self, line: &str) {
        if let Ok(mut inner) = self.inner.write() {
            inner.text.push_str(line);
            inner.text.push('\n');
            inner.enforce_capacity();
        }
    }

    /// Retained text.
    #[must_use]
    pub fn contents(&self) -> String {
        self.inner
            .read()
            .map(|inner| inner.text.clone())
            .unwrap_or_default()
    }
}

impl MessageStream for MessageBuffer {
    fn end(&self) -> Option<usize> {
        self.inner.read().ok().map(|inner| inner.end())
    }

    fn start(&self) -> Option<usize> {
        self.inner.read().ok().map(|inner| inner.base)
    }

    fn read(&self, range: Range<usize>) -> Option<String> {
        let inner = self.inner.read().ok()?;
        let start = range.start.checked_sub(inner.base)?;
        let end = range.end.checked_sub(inner.base)?;
        inner.text.get(start..end).map(str::to_owned)
    }
}

/// Consumption position within a [`MessageStream`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageCursor {
    offset: usize,
}

impl MessageCursor {
    /// Cursor at the beginning of the stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute offset consumed up to.
    #[must_use]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Return everything appended since the previous drain.
    pub fn drain(&mut self, stream: &impl MessageStream) -> String {
        let Some(end) = stream.end() else {
            return String::new();
        };
        if end < self.offset {
            crate::debug!(
                cursor = self.offset,
                end,
                "message stream moved backwards, resetting cursor"
            );
            self.offset = end;
            return String::new();
        }
        if end == self.offset {
            return String::new();
        }
        let start = match stream.start() {
            Some(oldest) if oldest > self.offset => {
                crate::trace!(
                    skipped = oldest - self.offset,
                    "message text truncated before it was read"
                );
                oldest.min(end)
            }
            _ => self.offset,
        };
        match stream.read(start..end) {
            Some(text) => {
                self.offset = end;
                text
            }
            None => String::new(),
        }
    }

    /// Consume everything currently in the stream without returning it.
    pub fn skip_to_end(&mut self, stream: &impl MessageStream) {
        if let Some(end) = stream.end() {
            self.offset = end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unavailable;

    impl MessageStream for Unavailable {
        fn end(&self) -> Option<usize> {
            None
        }

        fn read(&self, _range: Range<usize>) -> Option<String> {
            None
        }
    }

    #[test]
    fn drain_returns_new_text_once() {
        let buf = MessageBuffer::new();
        let mut cursor = MessageCursor::new();
        buf.message("hello");
        assert_eq!(cursor.drain(&buf), "hello\n");
        assert_eq!(cursor.drain(&buf), "");
    }

    #[test]
    fn drain_concatenation_equals_stream() {
        let buf = MessageBuffer::new();
        let mut cursor = MessageCursor::new();
        let mut seen = String::new();
        for part in ["a", "bc", "", "déf", "\n"] {
            buf.push_str(part);
            seen.push_str(&cursor.drain(&buf));
        }
        assert_eq!(seen, buf.contents());
    }

    #[test]
    fn skip_to_end_ignores_history() {
        let buf = MessageBuffer::new();
        buf.message("old");
        let mut cursor = MessageCursor::new();
        cursor.skip_to_end(&buf);
        buf.message("new");
        assert_eq!(cursor.drain(&buf), "new\n");
    }

    #[test]
    fn unavailable_stream_drains_empty() {
        let mut cursor = MessageCursor::new();
        assert_eq!(cursor.drain(&Unavailable), "");
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn truncated_stream_resumes_at_oldest() {
        let buf = MessageBuffer::with_capacity(4);
        let mut cursor = MessageCursor::new();
        buf.push_str("abcdefgh");
        assert_eq!(buf.start(), Some(4));
        assert_eq!(cursor.drain(&buf), "efgh");
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn capacity_cut_respects_char_boundary() {
        let buf = MessageBuffer::with_capacity(3);
        buf.push_str("aéé");
        // "aéé" is 5 bytes; cutting 2 would split 'é', so 3 are dropped.
        assert_eq!(buf.contents(), "é");
        assert_eq!(buf.end(), Some(5));
    }

    #[test]
    fn backwards_end_resets_cursor() {
        let long = MessageBuffer::new();
        long.push_str("0123456789");
        let mut cursor = MessageCursor::new();
        cursor.drain(&long);
        let short = MessageBuffer::new();
        short.push_str("xy");
        assert_eq!(cursor.drain(&short), "");
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn clones_share_text() {
        let a = MessageBuffer::new();
        let b = a.clone();
        b.message("shared");
        assert_eq!(a.contents(), "shared\n");
    }
}
