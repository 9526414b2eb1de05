//! services/shell/src/error.rs
//!
//! Defines the primary error type for the host service.

use crate::config::ConfigError;

/// The primary error type for the `shell` service.
///
/// Only start-up can fail; once serving, port failures are logged where
/// they happen.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_failures_convert() {
        let err: ShellError = ConfigError::MissingVar("DATABASE_URL".into()).into();
        assert!(matches!(err, ShellError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error:"));

        let err: ShellError = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken").into();
        assert_eq!(err.to_string(), "IO error: taken");
    }
}
