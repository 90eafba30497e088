use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for initfs operations
pub type Result<T> = std::result::Result<T, InitFsError>;

/// Unified error type for all initfs operations
#[derive(Debug, Error)]
pub enum InitFsError {
    // Load errors
    #[error("Source is neither an archive file nor an unpacked directory: {0}")]
    InvalidSource(PathBuf),

    #[error("Directory does not contain a repack manifest: {0}")]
    NotAnArchiveDirectory(PathBuf),

    // Manifest errors
    #[error("Malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("Value of \"{field}\" cannot be stored on one manifest line: {value:?}")]
    UnencodableValue { field: &'static str, value: String },

    // Extraction errors
    #[error("Flag \"{0}\" not found or contained no value")]
    MissingField(&'static str),

    #[error("Unsafe file name in archive: {0}")]
    UnsafePath(String),

    #[error("Top-level entry {0} does not carry a file record")]
    UnexpectedEntry(usize),

    // Binary layer errors
    #[error("Invalid archive format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported value type: 0x{0:02x}")]
    UnsupportedType(u8),

    #[error("Invalid key material length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for InitFsError {
    fn from(err: toml::de::Error) -> Self {
        InitFsError::Config(err.to_string())
    }
}

impl From<tempfile::PersistError> for InitFsError {
    fn from(err: tempfile::PersistError) -> Self {
        InitFsError::Io(err.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_names_flag() {
        let err = InitFsError::MissingField("payload");
        assert_eq!(
            err.to_string(),
            "Flag \"payload\" not found or contained no value"
        );
    }

    #[test]
    fn test_unencodable_value_is_quoted() {
        let err = InitFsError::UnencodableValue {
            field: "fs",
            value: "a\nb".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Value of \"fs\" cannot be stored on one manifest line: \"a\\nb\""
        );
    }

    #[test]
    fn test_io_passthrough() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: InitFsError = io_err.into();
        match err {
            InitFsError::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::PermissionDenied),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
