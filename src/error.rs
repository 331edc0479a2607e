//! Custom error types and result handling for scanbind operations.
//!
//! All operations return a [`Result<T>`] which is a type alias for `std::result::Result<T, Error>`.
//! Every [`Error`] belongs to one [`ErrorKind`], which is what a front-end should use to
//! decide how to present a failed job to the user.
//!
use std::path::PathBuf;

/// Type alias for Results with scanbind errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of failures, used for user-facing presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Filesystem precondition failed: missing input, temp directory, temp file, credentials.
    FileOperation,
    /// The OCR collaborator rejected the batch as a whole.
    Ocr,
    /// Unexpected fault while classifying or assembling content.
    EpubProcessing,
    /// Anything else; the message preserves the original cause.
    Application,
}

/// Comprehensive error type for all scanbind operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O errors from the standard library
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Image decoding and encoding errors
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// EPUB generation errors
    #[error(transparent)]
    Epub(#[from] epub_builder::Error),
    /// Settings (de)serialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Async task join errors
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Semaphore(#[from] tokio::sync::AcquireError),
    #[error(transparent)]
    ConfigBuilder(#[from] crate::scanbind::ScanbindConfigBuilderError),
    /// Error for invalid file or directory paths
    #[error("The given path '{0:?}' is invalid: {1}")]
    InvalidPath(PathBuf, String),
    /// A filesystem precondition failed (missing input, temp directory, credentials)
    #[error("File operation failed: {0}")]
    FileOperation(String),
    /// The OCR collaborator failed structurally for the whole batch
    #[error("OCR failed: {0}")]
    Ocr(String),
    /// Unexpected fault while classifying or assembling content
    #[error("EPUB processing failed: {0}")]
    EpubProcessing(String),
    /// Error for unsupported operations or formats (e.g., unknown image extension)
    #[error("Unsupported: {0}")]
    Unsupported(String),
    /// Other errors that don't fit into specific categories
    #[error("Application error: {0}")]
    Application(String),
}

impl Error {
    /// Returns the presentation category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_)
            | Error::Image(_)
            | Error::InvalidPath(..)
            | Error::FileOperation(_)
            | Error::Unsupported(_) => ErrorKind::FileOperation,
            Error::Ocr(_) => ErrorKind::Ocr,
            Error::Epub(_) | Error::EpubProcessing(_) => ErrorKind::EpubProcessing,
            Error::Json(_)
            | Error::Join(_)
            | Error::Semaphore(_)
            | Error::ConfigBuilder(_)
            | Error::Application(_) => ErrorKind::Application,
        }
    }

    /// Builds a [`Error::FileOperation`] naming the path and the underlying cause.
    pub(crate) fn file_op(path: &std::path::Path, cause: impl std::fmt::Display) -> Self {
        Error::FileOperation(format!("'{}': {}", path.display(), cause))
    }
}

// Basic From<String> conversion for convenience
impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::Application(error)
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Error::Application(error.to_string())
    }
}
