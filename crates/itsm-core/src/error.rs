use thiserror::Error;

/// Top-level error type for the ITSM console.
///
/// Covers the ambient failures of the process: configuration and file
/// access. Chat-level failures live in `itsm_chat::ChatError`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConsoleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConsoleError {
    fn from(err: toml::de::Error) -> Self {
        ConsoleError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ConsoleError {
    fn from(err: toml::ser::Error) -> Self {
        ConsoleError::Config(err.to_string())
    }
}

/// A specialized `Result` type for console operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConsoleError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ConsoleError = io_err.into();
        match &err {
            ConsoleError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected Io variant"),
        }
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let console_err: ConsoleError = err.unwrap_err().into();
        assert!(matches!(console_err, ConsoleError::Config(_)));
    }

    #[test]
    fn test_error_from_toml_ser() {
        #[derive(serde::Serialize)]
        struct Bare(u8);
        // A bare integer is not a TOML document.
        let err = toml::to_string(&Bare(1)).unwrap_err();
        let console_err: ConsoleError = err.into();
        assert!(matches!(console_err, ConsoleError::Config(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
