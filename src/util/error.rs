//! Error types for the MDX/MDL codec.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::Interpolation;

/// Four-character chunk tag as it appears on disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// Build a tag from its ASCII spelling.
    #[inline]
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }

    /// Raw tag bytes.
    #[inline]
    pub const fn bytes(&self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}

/// Main error type for model codec operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Stream ended before a fixed-size read completed
    #[error("Truncated input at offset {offset} while reading {context}")]
    TruncatedInput { offset: u64, context: &'static str },

    /// Invalid magic bytes at start of file
    #[error("Invalid MDX file: expected MDLX magic, found {found}")]
    InvalidMagic { found: Tag },

    /// Mandatory tag mismatch
    #[error("Unexpected tag at offset {offset}: expected {expected}, found {found}")]
    UnexpectedTag { expected: Tag, found: Tag, offset: u64 },

    /// Declared and consumed byte counts disagree
    #[error("Size mismatch in {tag}: declared {declared} bytes, consumed {consumed}")]
    SizeMismatch { tag: Tag, declared: u64, consumed: u64 },

    /// A member of a size-delimited group overran the group's remaining budget
    #[error("Oversized member in {tag}: {consumed} bytes with only {remaining} remaining")]
    OversizedMember { tag: Tag, remaining: u64, consumed: u64 },

    /// Tag not recognized by the dispatch table
    #[error("Unknown chunk {tag} at offset {offset}")]
    UnknownChunk { tag: Tag, offset: u64 },

    /// Text form failed to match the grammar
    #[error("Parse error at line {line}, column {column}: {message}")]
    Grammar { line: usize, column: usize, message: String },

    /// Curve evaluation requested for an interpolation mode the value type cannot support
    #[error("Unsupported interpolation {interpolation:?} for {context}")]
    UnsupportedInterpolation { interpolation: Interpolation, context: &'static str },

    /// Field holds a value outside its documented domain
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: i64 },

    /// Value the text form has no spelling for
    #[error("Cannot write {what} {value:?} as text: {reason}")]
    Unrepresentable { what: String, value: String, reason: &'static str },

    /// Source resolver could not produce a stream
    #[error("Stream unavailable: {0}")]
    StreamUnavailable(String),

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a grammar error at the given position.
    pub fn grammar(line: usize, column: usize, msg: impl Into<String>) -> Self {
        Self::Grammar { line, column, message: msg.into() }
    }

    /// Create an invalid value error.
    pub fn invalid(field: &'static str, value: impl Into<i64>) -> Self {
        Self::InvalidValue { field, value: value.into() }
    }

    /// Whether this error aborts a whole read.
    ///
    /// `UnknownChunk` is the only recoverable condition; it is reported as a
    /// diagnostic unless resynchronization is disabled.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::TruncatedInput { .. }
                | Self::InvalidMagic { .. }
                | Self::UnexpectedTag { .. }
                | Self::SizeMismatch { .. }
                | Self::OversizedMember { .. }
        )
    }
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;
