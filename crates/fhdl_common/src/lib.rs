//! Shared foundational types for the fhdl elaboration toolkit.
//!
//! This crate provides interned identifiers for scope and signal names,
//! content hashing for generated artifacts, the reserved-keyword list, and the internal-error type used
//! when an invariant of the toolkit itself is violated.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod keywords;
pub mod result;

pub use hash::ContentHash;
pub use ident::{is_identifier, Ident, Interner};
pub use keywords::{is_keyword, VERILOG_KEYWORDS};
pub use result::{FhdlResult, InternalError};
