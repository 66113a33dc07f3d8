//! Error types for save-file generation.

use fhdl_namer::NamerError;

/// Errors raised while building or writing a save file.
#[derive(Debug, thiserror::Error)]
pub enum GtkwError {
    /// A traced signal has no name.
    #[error(transparent)]
    Namer(#[from] NamerError),

    /// Writing the save file failed.
    #[error("failed to write save file: {0}")]
    Io(#[from] std::io::Error),
}
