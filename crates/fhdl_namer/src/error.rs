//! Error types for naming.

use fhdl_common::InternalError;
use fhdl_ir::SignalId;

/// Errors raised while naming signals or looking names up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamerError {
    /// The signal was not part of the set the namer was built from.
    #[error("signal {0:?} has no name in this namespace")]
    SignalNotFound(SignalId),

    /// A computed or overridden name is not a legal identifier.
    #[error("'{name}' is not a valid identifier")]
    InvalidIdentifier {
        /// The offending name.
        name: String,
    },

    /// The naming tree was inconsistent with the signal backtraces.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
