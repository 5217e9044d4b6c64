//! Error types for encoding and decoding

use thiserror::Error;

/// Failure while encoding a message into a [`Writer`](crate::Writer).
///
/// All variants are fatal for the message being encoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The byte store would grow past its hard ceiling
    #[error("buffer overflow: {requested} bytes requested, limit is {limit}")]
    BufferOverflow { requested: usize, limit: usize },

    /// A string longer than a 2-byte length prefix can describe
    #[error("string too long: {0} bytes (max 65535)")]
    StringTooLong(usize),

    /// A byte blob longer than a 4-byte length prefix can describe
    #[error("bytes too long: {0} bytes")]
    BytesTooLong(usize),

    /// A sequence with more elements than its count prefix can describe
    #[error("too many elements: {0}")]
    TooManyElements(usize),

    /// A length-prefixed span longer than its 4-byte size can describe
    #[error("span too long: {0} bytes")]
    SpanTooLong(usize),

    /// Compressing a wrapped message set failed
    #[error("compression failed: {0}")]
    Compression(String),
}

/// Failure while decoding from a [`Reader`](crate::Reader).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes remain than the field needs
    #[error("underrun: needed {needed} bytes, {remaining} remaining")]
    Underrun { needed: usize, remaining: usize },

    /// A top-level decode left bytes behind
    #[error("{0} trailing bytes after decode")]
    TrailingData(usize),

    /// A record declares more bytes than its enclosing span holds.
    ///
    /// Message set decoders recover from this by dropping the tail.
    #[error("incomplete record: declared {declared} bytes, {available} available")]
    IncompleteRecord { declared: usize, available: usize },

    /// A negative or otherwise unusable element count
    #[error("invalid length: {0}")]
    InvalidLength(i32),

    /// A string field is not UTF-8
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// An API key outside the catalog
    #[error("unknown API key: {0}")]
    UnknownApiKey(i16),

    /// The attribute bits name a codec this crate does not know
    #[error("unknown compression codec: {0}")]
    UnknownCompression(i8),

    /// The compressed payload of a wrapper message is corrupt
    #[error("decompression failed: {0}")]
    Decompression(String),
}

impl From<std::str::Utf8Error> for DecodeError {
    fn from(_: std::str::Utf8Error) -> Self {
        DecodeError::InvalidUtf8
    }
}
