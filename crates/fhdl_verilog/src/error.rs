//! Error types for Verilog emission and conversion.

use fhdl_config::ConfigError;
use fhdl_ir::{IrError, SpecialKind};
use fhdl_lower::LowerError;
use fhdl_namer::NamerError;

/// Errors raised while printing a lowered fragment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    /// Shape inference or a tree query failed.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// A printed signal has no name.
    #[error(transparent)]
    Namer(#[from] NamerError),

    /// A special survived lowering and nothing can print it.
    #[error("special {kind} failed to implement Verilog emission")]
    NoEmitter {
        /// Kind of the offending special.
        kind: SpecialKind,
    },

    /// An attribute tag is missing from the translation table.
    #[error("no translation for attribute tag '{tag}'")]
    UnknownAttribute {
        /// The untranslated tag.
        tag: String,
    },

    /// Synchronous statements reference a domain the fragment does not declare.
    #[error("synchronous statements for undeclared clock domain '{domain}'")]
    MissingClockDomain {
        /// Domain name.
        domain: String,
    },

    /// A special's data cannot be printed.
    #[error("cannot emit {kind}: {reason}")]
    InvalidSpecial {
        /// Kind of the offending special.
        kind: SpecialKind,
        /// Description of the problem.
        reason: String,
    },
}

/// Errors returned by [`convert`](crate::convert).
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The options are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The fragment could not be built or inspected.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// A lowering pass failed.
    #[error(transparent)]
    Lower(#[from] LowerError),

    /// Naming failed.
    #[error(transparent)]
    Namer(#[from] NamerError),

    /// Printing failed.
    #[error(transparent)]
    Emit(#[from] EmitError),
}
