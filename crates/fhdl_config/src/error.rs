//! Error types for option loading and validation.

/// Errors that can occur when loading or validating elaboration options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the options file.
    #[error("failed to read options: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse options: {0}")]
    ParseError(String),

    /// An option value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(format!("{err}"), "failed to parse options: expected '=' at line 3");
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("bad name".to_string());
        assert_eq!(format!("{err}"), "validation error: bad name");
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(format!("{err}").starts_with("failed to read options:"));
    }
}
