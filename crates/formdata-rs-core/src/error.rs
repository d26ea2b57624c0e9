//! Core error types for formdata-rs.
//!
//! [`FormDataError`] covers every way a multipart decode can be rejected:
//! malformed structure, size caps, count caps, and temp-file I/O. Each variant
//! maps to an HTTP status code via [`FormDataError::status_code`] so that the
//! surrounding framework can turn it into a response without inspecting
//! messages.

use thiserror::Error;

/// The primary error type for formdata-rs.
///
/// All variants are recoverable at the framework boundary. The decoder never
/// retries and never panics on these conditions.
#[derive(Error, Debug)]
pub enum FormDataError {
    // ── Parsing ──────────────────────────────────────────────────────

    /// The multipart body is malformed, truncated, or the body stream failed.
    #[error("Parse error: {0}")]
    Parse(String),

    // ── Limits ───────────────────────────────────────────────────────

    /// A field or file exceeded its configured size cap.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// The number of fields (or files) exceeded its configured cap.
    #[error("Too many fields: {0}")]
    TooManyFields(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// Writing a temporary file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl FormDataError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `Parse` -> 400
    /// - `PayloadTooLarge`, `TooManyFields` -> 413
    /// - `Io`, `Configuration` -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Parse(_) => 400,
            Self::PayloadTooLarge(_) | Self::TooManyFields(_) => 413,
            Self::Io(_) | Self::Configuration(_) => 500,
        }
    }

    /// Returns `true` for failures that belong to the parse category:
    /// malformed input as well as I/O failures while decoding.
    pub const fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Io(_))
    }

    /// Returns `true` when a configured limit rejected the body.
    pub const fn is_limit_error(&self) -> bool {
        matches!(self, Self::PayloadTooLarge(_) | Self::TooManyFields(_))
    }
}

/// A convenience type alias for `Result<T, FormDataError>`.
pub type FormDataResult<T> = Result<T, FormDataError>;
