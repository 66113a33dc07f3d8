//! Elaboration options loaded from TOML.
//!
//! Options that are plain data (module name, code-generation toggles,
//! attribute translation, memory decomposition passes) live in
//! [`ElabOptions`]. Platform hooks are code and are passed separately.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_options, load_options_from_str, validate_options};
pub use types::*;
