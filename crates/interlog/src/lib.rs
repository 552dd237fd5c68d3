#![forbid(unsafe_code)]

//! interlog public facade crate.
//!
//! Records interaction events from a live host (keys, commands, status
//! messages, nested resource loads) and renders them into a deduplicated,
//! size-bounded timeline. This crate re-exports the stable surface of the
//! internal crates and offers a prelude for hosts wiring the aggregator into
//! their event loop.
//!
//! ```ignore
//! use interlog::prelude::*;
//!
//! let mut agg = Aggregator::new(my_host, Options::from_env())?;
//! agg.enable(Instant::now());
//! // pre-command hook
//! agg.record(["C-x", "C-s"], Some("save-buffer"), "main.rs");
//! // post-command hook
//! agg.post_command(ChangeState::Echoed);
//! // event loop
//! agg.tick(Instant::now());
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use interlog_core::{
    ChangeState, CommandId, HostProbe, KeyToken, LoadChain, LoadEvent, LoadedResource, LogEntry,
    MessageBuffer, MessageCursor, MessageStream, Visibility, load_depths,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use interlog_runtime::{
    Aggregator, AggregatorStats, Block, BlockKind, FlushReport, InterlogError, LineKind, LogLine,
    Options, OutputLog, RecordOutcome, RetentionOutcome, SharedAggregator, SimHost, Simulator,
    Span, SpanTag, TickReport, ViewId,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for interlog hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Rejected configuration.
    #[cfg(feature = "runtime")]
    Config(InterlogError),
    /// Host integration failure with message.
    Host(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "runtime")]
            Self::Config(err) => write!(f, "{err}"),
            Self::Host(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "runtime")]
            Self::Config(err) => Some(err),
            Self::Host(_) => None,
        }
    }
}

#[cfg(feature = "runtime")]
impl From<InterlogError> for Error {
    fn from(err: InterlogError) -> Self {
        Self::Config(err)
    }
}

/// Standard result type for interlog APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ChangeState, Error, HostProbe, KeyToken, MessageBuffer, MessageStream, Result, Visibility,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{Aggregator, Options, SharedAggregator, TickReport};

    pub use crate::core;
    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use interlog_core as core;
#[cfg(feature = "runtime")]
pub use interlog_runtime as runtime;

#[cfg(all(test, feature = "runtime"))]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_and_displays() {
        let opts = Options::default().with_retention_interval(std::time::Duration::ZERO);
        let err: Error = opts.validate().map_err(Error::from).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid option `retention_interval`: must be greater than zero"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn prelude_builds_an_aggregator() {
        use crate::prelude::*;

        fn build() -> Result<Aggregator<SimHost>> {
            Ok(Aggregator::new(SimHost::new(), Options::default())?)
        }
        let mut agg = build().expect("valid options");
        agg.enable(std::time::Instant::now());
        assert!(agg.is_enabled());
    }
}
