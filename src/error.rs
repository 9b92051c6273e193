//! Error types for streaming list decoding

use std::io;
use thiserror::Error;

use crate::transport::WireFormat;

/// Errors produced by the external transport.
///
/// The engine never retries these; they surface unchanged through
/// [`ListError::Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O failure while connecting or reading the response stream
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// The server answered with a non-success status
    #[error("server responded with status {code}")]
    Status { code: u16 },
    /// Any other transport-level failure
    #[error("transport error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors indicating a corrupted or unsupported wire stream.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The stream claimed the binary encoding but the magic prefix did not match
    #[error("invalid magic prefix {found:02x?}")]
    InvalidMagic { found: [u8; 4] },
    /// The first response byte matched neither the binary magic nor a JSON object
    #[error("unrecognized leading byte 0x{first:02x}")]
    UnknownFormat { first: u8 },
    /// A varint ran past 64 bits without terminating
    #[error("varint exceeds 64 bits")]
    VarintOverflow,
    /// A field tag with field number zero
    #[error("illegal field tag {field_number} (wire type {wire_type})")]
    IllegalTag { field_number: u64, wire_type: u8 },
    /// An end-group wire type, which never appears in these messages
    #[error("unexpected end-group tag for field {field_number}")]
    EndGroupTag { field_number: u64 },
    /// A known field carried the wrong wire type
    #[error("wrong wire type {wire_type} for field {field}")]
    UnexpectedWireType { field: &'static str, wire_type: u8 },
    /// A length prefix that cannot fit in memory or overruns the enclosing window
    #[error("length prefix {length} overruns the enclosing window")]
    LengthOverflow { length: u64 },
    /// The list decoder was handed a window without a declared length
    #[error("list payload window has no declared length")]
    UnknownLength,
    /// A read below the window cursor; the decoders never backtrack,
    /// so this always indicates a framing bug or corrupted lengths
    #[error("out-of-order window access: offset {requested} is below cursor {cursor}")]
    OutOfOrderAccess { requested: usize, cursor: usize },
    /// The stream ended before a declared length was satisfied
    #[error("unexpected end of stream at offset {offset}")]
    UnexpectedEof { offset: usize },
    /// A nested in-memory message ended mid-field
    #[error("nested message truncated")]
    TruncatedMessage,
    /// A decoded string was not valid UTF-8
    #[error("invalid UTF-8 in string field: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// The JSON document structure was malformed
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specific item's self-decode failed.
///
/// Wraps the underlying cause. Items already delivered before the failure
/// are not retracted.
#[derive(Debug, Error)]
#[error("item decode failed: {source}")]
pub struct ItemDecodeError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl ItemDecodeError {
    /// Wrap the underlying cause of an item decode failure.
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Top-level error for a streaming list decode.
///
/// Any error aborts the in-progress decode immediately. Callback events
/// fired before the failure are not undone: a failed decode is "a prefix
/// of results, then an error", never all-or-nothing.
#[derive(Debug, Error)]
pub enum ListError {
    /// The transport failed to connect or the stream read failed
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The stream is corrupted or uses an unsupported encoding
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// One item's self-decode failed
    #[error(transparent)]
    Item(#[from] ItemDecodeError),
    /// The server chose a wire format excluded by the request configuration
    #[error("response encoded as {0}, which this request does not accept")]
    UnsupportedFormat(WireFormat),
}
