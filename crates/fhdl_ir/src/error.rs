//! Construction and inference errors.

use thiserror::Error;

/// Errors raised while building or inspecting the value/statement model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    /// An assignment target is not a signal, slice, part, concatenation or
    /// array of those.
    #[error("unsupported assignment target: {kind}")]
    UnsupportedTarget {
        /// Kind of the offending expression.
        kind: &'static str,
    },

    /// A slice whose stop precedes its start.
    #[error("inverted slice [{start}:{stop}]")]
    InvertedSlice {
        /// First bit.
        start: u32,
        /// One past the last bit.
        stop: u32,
    },

    /// A slice reaching past the end of the sliced value.
    #[error("slice [{start}:{stop}] out of range for a {width}-bit value")]
    SliceOutOfRange {
        /// First bit.
        start: u32,
        /// One past the last bit.
        stop: u32,
        /// Width of the sliced value.
        width: u32,
    },

    /// An array mux with no choices.
    #[error("array has no elements")]
    EmptyArray,

    /// A value range with no members.
    #[error("empty range {min}..{max}")]
    EmptyRange {
        /// Inclusive lower bound.
        min: i64,
        /// Exclusive upper bound.
        max: i64,
    },

    /// A signal declared with zero width.
    #[error("signal `{name}` must have a positive width")]
    ZeroWidth {
        /// Name the signal was declared with.
        name: String,
    },

    /// A value that must be a power of two is not.
    #[error("{0} is not a power of 2")]
    NotPowerOfTwo(u64),

    /// A computed width does not fit the width type.
    #[error("width overflow computing {what}")]
    WidthOverflow {
        /// Description of the value being sized.
        what: String,
    },

    /// An expression kind that is not valid at this stage of elaboration.
    #[error("unknown expression kind `{kind}` in {context}")]
    UnknownExpressionKind {
        /// Kind of the offending expression.
        kind: &'static str,
        /// Where it was encountered.
        context: &'static str,
    },

    /// A concatenation mixing variable and non-variable signals as a target.
    #[error("concatenation mixes variable and non-variable targets")]
    MixedVariableTargets,
}
