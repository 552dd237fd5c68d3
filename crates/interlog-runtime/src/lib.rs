#![forbid(unsafe_code)]

//! interlog runtime
//!
//! This crate turns the host-agnostic pieces of `interlog-core` into a
//! running aggregator: capture into a pending buffer, idle-triggered flushes
//! into a tagged output log, and periodic retention.
//!
//! # Key Components
//!
//! - [`Aggregator`] - owns all state; capture, flush, retention, views
//! - [`SharedAggregator`] - non-reentrant handle for host hooks
//! - [`PendingBuffer`] - same-tick merge of identical occurrences
//! - [`Renderer`] - cross-flush merge and block formatting
//! - [`OutputLog`] - tagged lines with front trimming
//! - [`ViewRegistry`] - per-view read positions and tail-follow
//! - [`RetentionManager`] - bounds the log size
//! - [`Timers`] - cooperative idle and periodic timers
//! - [`simulator::Simulator`] - deterministic host for tests
//!
//! # How it fits together
//! The host calls [`Aggregator::record`] before each event and
//! [`Aggregator::post_command`] after it, and calls [`Aggregator::tick`] from
//! its event loop. Nothing here blocks or spawns threads.

pub mod aggregator;
pub mod config;
pub mod debug_trace;
pub mod error;
pub mod output;
pub mod pending;
pub mod render;
pub mod retention;
pub mod simulator;
pub mod timer;
pub mod views;

pub use aggregator::{Aggregator, AggregatorStats, FlushReport, SharedAggregator, TickReport};
pub use config::{DEFAULT_IDLE_THRESHOLD, DEFAULT_RETENTION_INTERVAL, DEFAULT_RETENTION_MAX, Options};
pub use error::{InterlogError, Result};
pub use output::{Block, BlockKind, LineKind, LineLayout, LogLine, OutputLog, Span, SpanTag};
pub use pending::{PendingBuffer, RecordOutcome};
pub use render::{RenderedEntry, Renderer};
pub use retention::{RetentionManager, RetentionOutcome};
pub use simulator::{SimHost, Simulator};
pub use timer::{CancelToken, TimerId, TimerKind, Timers};
pub use views::{ViewId, ViewRegistry};
