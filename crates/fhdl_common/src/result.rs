//! Result type for toolkit invariant violations.

/// Result of an operation that can only fail because of a toolkit bug.
///
/// User mistakes (bad assignment targets, unresolvable specials, unknown
/// clock domains) have dedicated error enums in the crate that detects them.
/// `FhdlResult` is reserved for states the algorithms guarantee can never
/// happen, such as a name collision surviving the namer's final tie-break.
pub type FhdlResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in fhdl, not a problem with the design.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the violated invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("duplicate name `a`");
        assert_eq!(format!("{err}"), "internal error: duplicate name `a`");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "broken".to_string().into();
        assert_eq!(err.message, "broken");
    }
}
