#![forbid(unsafe_code)]

//! Logging macros for the core crate.
//!
//! With the `tracing` feature, `debug!` and `trace!` are re-exported from
//! `tracing`. Without it they expand to nothing, so the cursor's diagnostic
//! call sites compile either way and the core carries no logging dependency.

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
mod noop_macros {
    /// Discards its arguments when tracing is disabled.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// Discards its arguments when tracing is disabled.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }
}
