#![forbid(unsafe_code)]

//! Load-tree depth reconstruction from a flat load log.
//!
//! Hosts report loads after the fact, one `(parent?, child)` pair at a time,
//! and never expose the call stack. [`LoadChain`] rebuilds nesting from the
//! order alone by keeping the chain of resources that are (probably) still
//! open, innermost first.
//!
//! # Rules
//!
//! For each `(parent, child)`:
//!
//! | Case | New chain | Depth |
//! |------|-----------|-------|
//! | no parent | `[child]` | 0 |
//! | parent at index `i` in chain | `[child] ++ chain[i..]` | len − 1 |
//! | parent not in chain (sibling) | `[child, parent] ++ chain[1..]` | len − 1 |
//!
//! The sibling case keeps the old chain's tail under the reported parent even
//! if that parent was never observed opening. It is a heuristic and is kept
//! exactly as stated; when the chain is empty it yields depth 1.
//!
//! # Example
//!
//! ```
//! use interlog_core::entry::LoadEvent;
//! use interlog_core::load_tree::load_depths;
//!
//! let loads = [
//!     LoadEvent::top_level("A"),
//!     LoadEvent::nested("A", "B"),
//!     LoadEvent::nested("A", "C"),
//!     LoadEvent::top_level("D"),
//! ];
//! assert_eq!(load_depths(&loads), vec![0, 1, 1, 0]);
//! ```

use crate::entry::LoadEvent;

/// Active ancestor chain, innermost resource first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadChain {
    chain: Vec<String>,
}

impl LoadChain {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one load and return its depth.
    pub fn observe(&mut self, parent: Option<&str>, child: &str) -> usize {
        match parent {
            None => {
                self.chain.clear();
                self.chain.push(child.to_owned());
            }
            Some(parent) => match self.chain.iter().position(|id| id == parent) {
                Some(idx) => {
                    // Everything opened inside the ancestor has closed.
                    self.chain.drain(..idx);
                    self.chain.insert(0, child.to_owned());
                }
                None => {
                    let rest = if self.chain.is_empty() {
                        Vec::new()
                    } else {
                        self.chain.split_off(1)
                    };
                    self.chain.clear();
                    self.chain.push(child.to_owned());
                    self.chain.push(parent.to_owned());
                    self.chain.extend(rest);
                }
            },
        }
        self.depth()
    }

    /// Depth of the innermost resource (0 when empty).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.chain.len().saturating_sub(1)
    }

    /// Current chain, innermost first.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.chain
    }
}

/// Reconstruct one depth per load, in input order.
#[must_use]
pub fn load_depths(events: &[LoadEvent]) -> Vec<usize> {
    let mut chain = LoadChain::new();
    events
        .iter()
        .map(|event| chain.observe(event.parent.as_deref(), &event.child))
        .collect()
}
