//! Hierarchical signal naming.
//!
//! Computes one identifier per signal from the scopes that were open when
//! the signal was created:
//! 1. **Generations**: signals are grouped by how many `related` links lead
//!    to their root; each generation is named on its own and prefixed with
//!    the parent's name
//! 2. **Trie naming**: only the scope names needed to tell signals apart are
//!    kept
//! 3. **Instance numbers**: scopes entered several times are split by
//!    instance when names still collide
//! 4. **Creation order**: signals with identical paths get a numeric suffix
//! 5. **Namespace**: reserved words and explicit overrides share a usage
//!    counter, later claimants get `_<n>`
//!
//! # Usage
//!
//! ```ignore
//! use fhdl_namer::Namer;
//! let namer = Namer::build(&design, signals, fhdl_common::VERILOG_KEYWORDS.iter().copied())?;
//! let name = namer.get_name(sig)?;
//! ```

#![warn(missing_docs)]

mod error;
mod namespace;
mod tree;

pub use error::NamerError;
pub use namespace::Namer;
