//! Error and Result types for SNBT parsing.
use thiserror::Error;

/// Convenience type for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Parse errors, with byte offsets into the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("snbt: unexpected end of input")]
    Eof,

    #[error("snbt: expected {expected} at byte {offset}")]
    Expected { expected: &'static str, offset: usize },

    #[error("snbt: trailing characters at byte {offset}")]
    TrailingInput { offset: usize },

    #[error("snbt: number out of range at byte {offset}")]
    NumberOutOfRange { offset: usize },

    #[error("snbt: invalid escape sequence at byte {offset}")]
    InvalidEscape { offset: usize },

    #[error("snbt: unterminated string at byte {offset}")]
    UnterminatedString { offset: usize },

    #[error("snbt: type mismatch at byte {offset}: expected {expected}, found {found}")]
    TypeMismatch {
        offset: usize,
        expected: &'static str,
        found: &'static str,
    },
}
