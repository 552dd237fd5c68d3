#![forbid(unsafe_code)]

//! Interaction entry model.
//!
//! A [`LogEntry`] is one captured interactive occurrence: the keys the user
//! pressed, the command they resolved to, the context that was focused, and
//! the message text observed around it. Entries are mutable while pending
//! (post-text, change state, and loads are attached after the command runs)
//! and absorb later identical occurrences by bumping [`LogEntry::repeat_count`].
//!
//! # Merge rule
//!
//! A pending entry absorbs a new occurrence iff:
//!
//! 1. keys, command, and context label are equal,
//! 2. the new occurrence has no pre-text,
//! 3. the entry has no post-text,
//! 4. the entry recorded no resource loads.
//!
//! Merging only increments the count; text and loads are never concatenated.
//! The cross-flush variant ([`LogEntry::folds_into`]) additionally requires
//! both sides to be free of text and equal [`ChangeState`].

use std::fmt;

use crate::load_tree::load_depths;

/// Display text of the masking sentinel.
pub const MASKED_LABEL: &str = "<masked>";

/// Display text of the "no bound action" sentinel.
pub const UNBOUND_LABEL: &str = "<unbound>";

/// One input-event descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyToken {
    /// A real key descriptor as reported by the host (e.g. `C-x`).
    Key(String),
    /// Stand-in for input captured while the host was reading a secret.
    Masked,
}

impl KeyToken {
    /// Text shown for this token.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Key(key) => key,
            Self::Masked => MASKED_LABEL,
        }
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for KeyToken {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for KeyToken {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

/// The action an event resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandId {
    /// A named command.
    Named(String),
    /// The keys were not bound to anything.
    #[default]
    Unbound,
    /// Replaced during sensitive input.
    Masked,
}

impl CommandId {
    /// Build a command id from an optional host name; empty names are unbound.
    #[must_use]
    pub fn from_host(name: Option<&str>) -> Self {
        match name {
            Some(name) if !name.trim().is_empty() => Self::Named(name.to_owned()),
            _ => Self::Unbound,
        }
    }

    /// Text shown for this command.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Unbound => UNBOUND_LABEL,
            Self::Masked => MASKED_LABEL,
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for CommandId {
    fn from(name: &str) -> Self {
        Self::from_host(Some(name))
    }
}

/// Did the event touch shared state, and did that show up on the echo surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeState {
    /// Nothing observable changed.
    #[default]
    None,
    /// Shared state was mutated.
    Mutated,
    /// The mutation was output on the ephemeral echo surface.
    Echoed,
}

/// A raw resource-load notification, in the order loads happened.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadEvent {
    /// Resource that triggered the load, if the host knows it.
    pub parent: Option<String>,
    /// Resource that was loaded.
    pub child: String,
    /// Message position when the load was noted.
    ///
    /// Hooks record an absolute stream offset; [`LogEntry::finalize`] expects
    /// it relative to the post-text it is given (see [`Self::relative_to`]).
    /// `None` means the start of that text.
    pub offset: Option<usize>,
}

impl LoadEvent {
    /// A load with no known trigger.
    #[must_use]
    pub fn top_level(child: impl Into<String>) -> Self {
        Self {
            parent: None,
            child: child.into(),
            offset: None,
        }
    }

    /// A load triggered by `parent`.
    #[must_use]
    pub fn nested(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            child: child.into(),
            offset: None,
        }
    }

    /// Set the message position of the load.
    #[must_use]
    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Rebase an absolute stream offset onto text of `len` bytes starting at
    /// stream offset `origin`, clamping into the text.
    #[must_use]
    pub fn relative_to(mut self, origin: usize, len: usize) -> Self {
        self.offset = self.offset.map(|at| at.saturating_sub(origin).min(len));
        self
    }
}

/// A load after depth reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadedResource {
    /// Loaded resource identifier.
    pub id: String,
    /// Reported trigger, kept for display.
    pub parent: Option<String>,
    /// Nesting depth, 0 for top-level loads.
    pub depth: usize,
    /// Byte offset into the entry's post-text where the load was noted.
    pub offset: usize,
}

/// One interaction event, mutable while pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Input-event descriptors, in order.
    pub keys: Vec<KeyToken>,
    /// Resolved command.
    pub command: CommandId,
    /// Focused context at capture time.
    pub context: String,
    /// Messages observed since the previous capture point.
    pub pre_text: String,
    /// Messages produced while the command ran.
    pub post_text: String,
    /// Observable effect of the command.
    pub change: ChangeState,
    /// Loads that happened while the command ran, with depths.
    pub loads: Vec<LoadedResource>,
    /// Number of real occurrences folded into this entry (always >= 1).
    pub repeat_count: u32,
}

impl LogEntry {
    /// Create an entry for a fresh occurrence.
    #[must_use]
    pub fn new(
        keys: Vec<KeyToken>,
        command: CommandId,
        context: impl Into<String>,
        pre_text: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            command,
            context: context.into(),
            pre_text: pre_text.into(),
            post_text: String::new(),
            change: ChangeState::None,
            loads: Vec::new(),
            repeat_count: 1,
        }
    }

    /// Space-separated key description.
    #[must_use]
    pub fn key_description(&self) -> String {
        let mut out = String::new();
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(key.label());
        }
        out
    }

    /// Same keys, command, and context.
    #[must_use]
    pub fn same_event(&self, keys: &[KeyToken], command: &CommandId, context: &str) -> bool {
        self.keys == keys && self.command == *command && self.context == context
    }

    /// Whether a new occurrence with `pre_text` can be absorbed by this entry.
    #[must_use]
    pub fn absorbs(
        &self,
        keys: &[KeyToken],
        command: &CommandId,
        context: &str,
        pre_text: &str,
    ) -> bool {
        pre_text.is_empty()
            && self.post_text.is_empty()
            && self.loads.is_empty()
            && self.same_event(keys, command, context)
    }

    /// Whether this entry, about to render, can replace `rendered` on screen.
    #[must_use]
    pub fn folds_into(&self, rendered: &LogEntry) -> bool {
        self.is_plain()
            && rendered.is_plain()
            && self.change == rendered.change
            && self.same_event(&rendered.keys, &rendered.command, &rendered.context)
    }

    /// No text on either side and no loads.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.pre_text.is_empty() && self.post_text.is_empty() && self.loads.is_empty()
    }

    /// Count one more identical occurrence.
    pub fn bump(&mut self) {
        self.repeat_count = self.repeat_count.saturating_add(1);
    }

    /// Attach what happened while the command ran.
    ///
    /// Text is appended and loads are extended; depths are reconstructed from
    /// `events` alone, which is the full load record of one execution. Event
    /// offsets are positions in `post_text` and are clamped to it.
    pub fn finalize(&mut self, post_text: &str, change: ChangeState, events: Vec<LoadEvent>) {
        let base = self.post_text.len();
        self.post_text.push_str(post_text);
        self.change = change;
        if events.is_empty() {
            return;
        }
        let depths = load_depths(&events);
        self.loads
            .extend(events.into_iter().zip(depths).map(|(event, depth)| LoadedResource {
                offset: base + event.offset.unwrap_or(0).min(post_text.len()),
                id: event.child,
                parent: event.parent,
                depth,
            }));
    }
}
