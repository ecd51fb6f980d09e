//! Centralized error handling for notestyle
//!
//! This module provides a unified error type that covers all error scenarios
//! in the engine: pattern construction, image resolution, and configuration.
//!
//! Only construction errors are fatal. Resolution errors are logged by the
//! resolver and never reach the editing surface.

use log::warn;
use std::fmt;
use std::io;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Custom Result Type Alias
// ─────────────────────────────────────────────────────────────────────────────

/// A specialized `Result` type for the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// The centralized error type for the engine.
#[derive(Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // File I/O Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic I/O error wrapper
    Io(io::Error),

    // ─────────────────────────────────────────────────────────────────────────
    // Construction Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// A pattern in the pattern library failed to compile
    Pattern {
        name: &'static str,
        source: regex::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// An image file could not be decoded
    ImageDecode {
        path: String,
        source: image::ImageError,
    },

    /// A remote image could not be fetched
    Fetch { url: String, message: String },

    /// A representative frame could not be extracted from a video
    VideoFrame { path: PathBuf, message: String },

    /// The source path does not point at anything displayable
    UnsupportedSource(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to load configuration file
    ConfigLoad {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to save configuration file
    ConfigSave {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to parse configuration (invalid JSON/format)
    ConfigParse {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration directory not found or inaccessible
    ConfigDirNotFound,

    // ─────────────────────────────────────────────────────────────────────────
    // Application Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic application error with a message
    Application(String),
}

// Implement From traits for convenient error conversion
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigParse {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageDecode {
            path: String::new(),
            source: err,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Display trait implementation for readable log messages
// ─────────────────────────────────────────────────────────────────────────────
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),

            Error::Pattern { name, source } => {
                write!(f, "Pattern '{}' failed to compile: {}", name, source)
            }

            Error::ImageDecode { path, source } => {
                if path.is_empty() {
                    write!(f, "Failed to decode image: {}", source)
                } else {
                    write!(f, "Failed to decode image '{}': {}", path, source)
                }
            }
            Error::Fetch { url, message } => {
                write!(f, "Failed to fetch '{}': {}", url, message)
            }
            Error::VideoFrame { path, message } => {
                write!(
                    f,
                    "Failed to extract a frame from '{}': {}",
                    path.display(),
                    message
                )
            }
            Error::UnsupportedSource(source) => {
                write!(f, "Unsupported attachment source: {}", source)
            }

            Error::ConfigLoad { path, source } => {
                write!(
                    f,
                    "Failed to load configuration from '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::ConfigSave { path, source } => {
                write!(
                    f,
                    "Failed to save configuration to '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::ConfigParse { message, .. } => {
                write!(f, "Invalid configuration format: {}", message)
            }
            Error::ConfigDirNotFound => {
                write!(f, "Configuration directory not found")
            }

            Error::Application(msg) => write!(f, "{}", msg),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// std::error::Error trait implementation for error chaining
// ─────────────────────────────────────────────────────────────────────────────
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Pattern { source, .. } => Some(source),
            Error::ImageDecode { source, .. } => Some(source),
            Error::ConfigLoad { source, .. } => Some(source.as_ref()),
            Error::ConfigSave { source, .. } => Some(source.as_ref()),
            Error::ConfigParse { source, .. } => source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::Fetch { .. }
            | Error::VideoFrame { .. }
            | Error::UnsupportedSource(_)
            | Error::ConfigDirNotFound
            | Error::Application(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Graceful Degradation Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for Result to support graceful degradation.
pub trait ResultExt<T> {
    /// If the result is an error, log it at warning level and return the provided default.
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T;

    /// If the result is an error, log it at warning level and return `None`.
    fn ok_or_warn(self, context: &str) -> Option<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                warn!("{}: {}. Using default.", context, err);
                default
            }
        }
    }

    fn ok_or_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("{}: {}", context, err);
                None
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_creation() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test error");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_pattern_error_display() {
        let source = regex::Regex::new("(unclosed").unwrap_err();
        let err = Error::Pattern {
            name: "broken",
            source,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("broken"));
        assert!(msg.contains("failed to compile"));
    }

    #[test]
    fn test_fetch_error_display() {
        let err = Error::Fetch {
            url: "https://example.com/a.png".to_string(),
            message: "timed out".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("https://example.com/a.png"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_result: std::result::Result<String, _> = serde_json::from_str("invalid json");
        let err = Error::from(json_result.unwrap_err());
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_display_config_dir_not_found() {
        let err = Error::ConfigDirNotFound;
        assert_eq!(format!("{}", err), "Configuration directory not found");
    }

    #[test]
    fn test_error_source_chaining() {
        use std::error::Error as StdError;
        let err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "not found"));
        assert!(err.source().is_some());

        let err = Error::UnsupportedSource("x.doc".to_string());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_unwrap_or_warn_default() {
        let ok: Result<i32> = Ok(42);
        assert_eq!(ok.unwrap_or_warn_default(0, "ctx"), 42);

        let err: Result<i32> = Err(Error::Application("test".to_string()));
        assert_eq!(err.unwrap_or_warn_default(0, "ctx"), 0);
    }

    #[test]
    fn test_ok_or_warn() {
        let err: Result<i32> = Err(Error::Application("test".to_string()));
        assert_eq!(err.ok_or_warn("ctx"), None);

        let ok: Result<i32> = Ok(7);
        assert_eq!(ok.ok_or_warn("ctx"), Some(7));
    }
}
