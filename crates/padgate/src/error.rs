//! Error types for padgate.
//!
//! This module defines all error types used throughout the padgate crate.
//! Faults are surfaced, not recovered: a broken bus query or an unspawnable
//! acquisition program terminates the process with a non-zero exit status.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// The main error type for padgate operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Bus scan errors ===
    /// The bus enumeration utility could not be started.
    #[error("failed to run bus scanner {path}: {source}")]
    ScannerSpawn {
        /// Path to the scanner program (usually `i2cdetect`).
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The bus enumeration utility exited with a failure status.
    #[error("bus scanner exited with {status}: {stderr}")]
    ScannerExit {
        /// The scanner's exit status.
        status: ExitStatus,
        /// Captured standard error output.
        stderr: String,
    },

    /// The bus enumeration output could not be parsed.
    #[error("unparseable bus scan output: {message}")]
    ScanParse {
        /// Description of what was malformed.
        message: String,
    },

    // === Configuration errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// A device address string was not valid.
    #[error("invalid device address '{input}': expected a 7-bit hex address like 0x28")]
    InvalidAddress {
        /// The offending input.
        input: String,
    },

    // === Handoff errors ===
    /// The acquisition program could not be started.
    #[error("failed to start acquisition program {program}: {source}")]
    AcquisitionSpawn {
        /// Path to the acquisition program.
        program: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for padgate operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new scan parse error.
    #[must_use]
    pub fn scan_parse(message: impl Into<String>) -> Self {
        Self::ScanParse {
            message: message.into(),
        }
    }

    /// Create a new configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error came from the bus scanner.
    #[must_use]
    pub fn is_scanner_error(&self) -> bool {
        matches!(
            self,
            Self::ScannerSpawn { .. } | Self::ScannerExit { .. } | Self::ScanParse { .. }
        )
    }
}
