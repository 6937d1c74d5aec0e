//! Descriptor error types

use thiserror::Error;

/// Errors produced while parsing a `VID:PID` device filter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    /// Filter is not of the form `VID:PID`
    #[error("Invalid filter format '{0}', expected VID:PID (e.g. '0x0483:0x572b')")]
    Format(String),

    /// One side of the filter is not a 1-4 digit hex number
    #[error("Invalid {field} '{value}', expected 1-4 hex digits")]
    HexId { field: &'static str, value: String },
}

/// Type alias for filter parsing results
pub type Result<T> = std::result::Result<T, FilterParseError>;
