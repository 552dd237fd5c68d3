#![forbid(unsafe_code)]

//! Read positions of open views onto the output log.
//!
//! A view's cursor is a line index in `0..=len`; `len` means "at the end of
//! the log". After each flush, views that were at the end before the flush
//! are moved to the new end (tail-follow). Views that scrolled back stay
//! where they are, and are shifted down when retention trims lines above
//! them.
//!
//! Closed views are simply gone: operations on their ids return `None` or
//! `false` and are otherwise ignored.

/// Identifier of an open view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    /// Raw id value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct View {
    id: ViewId,
    cursor: usize,
}

/// All open views.
#[derive(Debug, Clone, Default)]
pub struct ViewRegistry {
    views: Vec<View>,
    next_id: u64,
}

impl ViewRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// True if no view is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Open a view with its cursor at `cursor`.
    pub fn open(&mut self, cursor: usize) -> ViewId {
        let id = ViewId(self.next_id);
        self.next_id += 1;
        self.views.push(View { id, cursor });
        tracing::trace!(view = id.0, cursor, "view opened");
        id
    }

    /// Close a view. Returns `false` if it was not open.
    pub fn close(&mut self, id: ViewId) -> bool {
        let before = self.views.len();
        self.views.retain(|v| v.id != id);
        before != self.views.len()
    }

    /// Cursor of a view.
    #[must_use]
    pub fn cursor(&self, id: ViewId) -> Option<usize> {
        self.find(id).map(|v| v.cursor)
    }

    /// Whether a view sits at the end of a log of `len` lines.
    #[must_use]
    pub fn is_at_end(&self, id: ViewId, len: usize) -> Option<bool> {
        self.find(id).map(|v| v.cursor >= len)
    }

    /// Move a view to `line`, clamped to `len`.
    pub fn scroll_to(&mut self, id: ViewId, line: usize, len: usize) -> bool {
        match self.find_mut(id) {
            Some(view) => {
                view.cursor = line.min(len);
                true
            }
            None => false,
        }
    }

    /// Move a view to the end of a log of `len` lines.
    pub fn scroll_to_end(&mut self, id: ViewId, len: usize) -> bool {
        self.scroll_to(id, len, len)
    }

    /// Ids of views at the end of a log of `len` lines.
    #[must_use]
    pub fn at_end(&self, len: usize) -> Vec<ViewId> {
        self.views
            .iter()
            .filter(|v| v.cursor >= len)
            .map(|v| v.id)
            .collect()
    }

    /// Move the listed views to `end`; ids that were closed are skipped.
    ///
    /// Returns the ids that were moved.
    pub fn follow(&mut self, ids: &[ViewId], end: usize) -> Vec<ViewId> {
        let mut moved = Vec::with_capacity(ids.len());
        for view in &mut self.views {
            if ids.contains(&view.id) {
                view.cursor = end;
                moved.push(view.id);
            }
        }
        moved
    }

    /// Keep every cursor within `0..=len` after lines were erased at the end.
    pub fn clamp(&mut self, len: usize) {
        for view in &mut self.views {
            view.cursor = view.cursor.min(len);
        }
    }

    /// Account for `removed` lines trimmed from the front.
    pub fn shift_for_trim(&mut self, removed: usize) {
        for view in &mut self.views {
            view.cursor = view.cursor.saturating_sub(removed);
        }
    }

    fn find(&self, id: ViewId) -> Option<&View> {
        self.views.iter().find(|v| v.id == id)
    }

    fn find_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.iter_mut().find(|v| v.id == id)
    }
}
