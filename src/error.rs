//! Error types for the `SQLite` reader library

use thiserror::Error;

/// Result type alias for operations that can fail with our Error type
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur when reading `SQLite` databases
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header fields out of range, cell offsets out of page, unknown serial
    /// types, truncated varints or records.
    #[error("malformed database file: {0}")]
    Malformed(String),

    /// A schema entry's declared type disagrees with its SQL text.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Query references a table or column that does not exist.
    #[error("unknown table or column: {0}")]
    UnknownName(String),

    /// SQL construct outside the supported subset.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<core::str::Utf8Error> for Error {
    fn from(err: core::str::Utf8Error) -> Self {
        Self::Malformed(format!("invalid UTF-8 in text field: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let malformed = Error::Malformed("cell offset 9000 out of page".to_string());
        let unknown = Error::UnknownName("companies".to_string());
        let unsupported = Error::Unsupported("JOIN".to_string());

        assert_eq!(
            malformed.to_string(),
            "malformed database file: cell offset 9000 out of page"
        );
        assert_eq!(unknown.to_string(), "unknown table or column: companies");
        assert_eq!(unsupported.to_string(), "unsupported: JOIN");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_error.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_utf8_error_conversion() {
        let bad = core::str::from_utf8(&[0xff, 0xfe]).unwrap_err();
        let err: Error = bad.into();
        assert!(matches!(err, Error::Malformed(_)));
    }
}
