//! Construction-scope tracking.
//!
//! The tracer records which named scopes are open while a design is being
//! built. Every signal captures the open stack plus its own leaf entry as its
//! backtrace, which is later the sole input to hierarchical naming.

use crate::signal::BacktraceEntry;
use fhdl_common::Ident;
use std::collections::HashMap;

/// Default leaf name for signals created without one.
pub const DEFAULT_LEAF_NAME: &str = "sig";

/// Scope stack plus per-name instance counters.
#[derive(Debug, Default, Clone)]
pub struct Tracer {
    stack: Vec<BacktraceEntry>,
    scope_counts: HashMap<Ident, u32>,
    leaf_counts: HashMap<Ident, u32>,
}

impl Tracer {
    /// Creates a tracer with no open scopes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new instance of the scope `name` and returns its entry.
    pub fn enter(&mut self, name: Ident) -> BacktraceEntry {
        let index = bump(&mut self.scope_counts, name);
        let entry = BacktraceEntry { name, index };
        self.stack.push(entry);
        entry
    }

    /// Re-opens a scope instance previously returned by [`enter`](Self::enter).
    pub fn reenter(&mut self, entry: BacktraceEntry) {
        self.stack.push(entry);
    }

    /// Closes the innermost scope.
    pub fn exit(&mut self) -> Option<BacktraceEntry> {
        self.stack.pop()
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Builds the backtrace of a new signal with leaf name `leaf`.
    pub fn trace(&mut self, leaf: Ident) -> Vec<BacktraceEntry> {
        let index = bump(&mut self.leaf_counts, leaf);
        let mut backtrace = self.stack.clone();
        backtrace.push(BacktraceEntry { name: leaf, index });
        backtrace
    }
}

fn bump(counts: &mut HashMap<Ident, u32>, name: Ident) -> u32 {
    let slot = counts.entry(name).or_insert(0);
    let index = *slot;
    *slot += 1;
    index
}

/// Strips a single leading underscore from a name, keeping dunder names.
pub fn remove_underscore(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'_' && bytes[1] != b'_' {
        &name[1..]
    } else {
        name
    }
}
