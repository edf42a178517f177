use std::{fmt, io};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all strata write-side operations.
///
/// Errors propagate upward with `?`; the cycle driver aborts the cycle on
/// anything fatal. The one *recoverable* failure in the write path is a
/// [`FieldPathErrorKind::NotBindable`] field-path error, which encoders are
/// expected to swallow (falling back to staged bucket hints) rather than
/// propagate.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while streaming a snapshot or delta blob.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A hash-key field path could not be resolved against the live state.
    ///
    /// `kind` distinguishes the recoverable [`FieldPathErrorKind::NotBindable`]
    /// case from fatal malformed-path and type-mismatch cases.
    #[error("field path error ({kind}) at \"{path}\": {detail}")]
    FieldPath {
        kind: FieldPathErrorKind,
        path: String,
        detail: String,
    },

    /// A type name was not registered with the state engine.
    #[error("unknown type \"{0}\"")]
    UnknownType(String),

    /// Invalid user input or API parameter (bad schema, non-power-of-two
    /// shard count, record/schema mismatch).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal operation failed; indicates a bug or corrupted staging
    /// state rather than bad input.
    #[error("an internal operation failed: {0}")]
    Internal(String),
}

/// Failure kinds for hash-key field-path binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPathErrorKind {
    /// A path segment names a type or field absent from the bound state.
    /// Recoverable: encoders log a warning and keep the staged bucket hints.
    NotBindable,
    /// The path itself is malformed (empty, or it traverses *through* a
    /// non-reference field). Fatal.
    Malformed,
    /// The path resolved, but its leaf is not a hashable field type. Fatal.
    TypeMismatch,
}

impl fmt::Display for FieldPathErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPathErrorKind::NotBindable => write!(f, "not bindable"),
            FieldPathErrorKind::Malformed => write!(f, "malformed"),
            FieldPathErrorKind::TypeMismatch => write!(f, "type mismatch"),
        }
    }
}
