use thiserror::Error;

/// Top-level error type for the Meeting Notes client.
///
/// Covers the local concerns shared by every crate: configuration, files and
/// serialization. Network and session failures have their own error types in
/// `minutes-api`, `minutes-session` and `minutes-chat`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MinutesError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<toml::de::Error> for MinutesError {
    fn from(err: toml::de::Error) -> Self {
        MinutesError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MinutesError {
    fn from(err: toml::ser::Error) -> Self {
        MinutesError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MinutesError {
    fn from(err: serde_json::Error) -> Self {
        MinutesError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Meeting Notes operations.
pub type Result<T> = std::result::Result<T, MinutesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MinutesError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MinutesError = io_err.into();
        assert!(matches!(err, MinutesError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let parse_err = toml::from_str::<toml::Value>("not = [valid").unwrap_err();
        let err: MinutesError = parse_err.into();
        assert!(matches!(err, MinutesError::Config(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: MinutesError = parse_err.into();
        assert!(matches!(err, MinutesError::Serialization(_)));
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(MinutesError, &str)> = vec![
            (
                MinutesError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                MinutesError::Storage("read-only".to_string()),
                "Storage error: read-only",
            ),
            (
                MinutesError::Serialization("eof".to_string()),
                "Serialization error: eof",
            ),
            (
                MinutesError::InvalidInput("empty".to_string()),
                "Invalid input: empty",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }
}
