#![forbid(unsafe_code)]

//! Core: interaction entry model, load-tree depth reconstruction, and the
//! message cursor that consumes the host's message stream.
//!
//! Everything here is host-agnostic and free of timers. The runtime crate
//! (`interlog-runtime`) composes these pieces into the pending buffer,
//! flush/render engine, and retention manager.

pub mod entry;
pub mod host;
pub mod load_tree;
pub mod logging;
pub mod message;
pub mod visibility;

pub use entry::{ChangeState, CommandId, KeyToken, LoadEvent, LoadedResource, LogEntry};
pub use host::HostProbe;
pub use load_tree::{LoadChain, load_depths};
pub use message::{MessageBuffer, MessageCursor, MessageStream};
pub use visibility::Visibility;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, trace};
