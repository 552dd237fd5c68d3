#![forbid(unsafe_code)]

//! Which parts of the output log a presentation layer shows.

use bitflags::bitflags;

bitflags! {
    /// Visibility toggles for output lines and spans.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct Visibility: u8 {
        /// Command lines.
        const COMMANDS = 1 << 0;
        /// Context label span on command lines.
        const CONTEXT  = 1 << 1;
        /// Plain message lines.
        const MESSAGES = 1 << 2;
        /// Load lines.
        const LOADS    = 1 << 3;
        /// `N x` repeat prefix on command lines.
        const REPEATS  = 1 << 4;
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::all()
    }
}
