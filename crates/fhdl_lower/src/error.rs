//! Error types for lowering.

use fhdl_ir::{IrError, SpecialKind};

/// Errors raised while lowering a fragment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LowerError {
    /// An IR construction rule was broken by a rewritten statement.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// A special has no generic lowering and no override was registered.
    #[error("{kind} is not implemented: {reason}")]
    NotImplemented {
        /// Kind of the offending special.
        kind: SpecialKind,
        /// What the platform would have to provide.
        reason: String,
    },

    /// A statement or special names a clock domain that is not declared.
    #[error("unresolved clock domain \"{domain}\" (available: {})", .available.join(", "))]
    UnresolvedClockDomain {
        /// Requested domain.
        domain: String,
        /// Declared domains, sorted.
        available: Vec<String>,
    },

    /// The reset of a reset-less domain was requested.
    #[error("attempted to get reset signal of resetless domain '{domain}'")]
    ResetLessDomain {
        /// The reset-less domain.
        domain: String,
    },

    /// A memory port's write granularity does not divide the word width.
    #[error("memory '{memory}': write granularity {granularity} does not divide width {width}")]
    Granularity {
        /// Memory name.
        memory: String,
        /// Word width.
        width: u32,
        /// Offending port granularity.
        granularity: u32,
    },

    /// A special's parameters cannot describe hardware.
    #[error("invalid {kind}: {reason}")]
    InvalidSpecial {
        /// Kind of the offending special.
        kind: SpecialKind,
        /// Description of the problem.
        reason: String,
    },
}
