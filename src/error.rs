//! # Error Types
//!
//! This module defines error types used throughout the etiqueta library.

use thiserror::Error;

/// Main error type for etiqueta operations
#[derive(Debug, Error)]
pub enum EtiquetaError {
    /// Format name is not in the symbology registry
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Payload violates the symbology's length or charset rule
    #[error("Invalid {format} value: {reason}")]
    InvalidCodeValue {
        format: &'static str,
        reason: String,
    },

    /// A label request that can never be printed (empty code, zero copies)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Printer name is not currently registered with the host OS
    #[error("Printer unavailable: {0}")]
    PrinterUnavailable(String),

    /// The open/write/close sequence of a job failed partway
    #[error("Spooler error: {0}")]
    Spooler(String),

    /// Rasterization failed even after font fallback
    #[error("Render failure: {0}")]
    Render(String),

    /// Row selection string could not be parsed
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Archive could not be written
    #[error("Export error: {0}")]
    Export(String),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// Malformed batch input
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtiquetaError {
    pub(crate) fn invalid_code(format: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidCodeValue {
            format,
            reason: reason.into(),
        }
    }
}
