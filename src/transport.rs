//! External transport contract
//!
//! The engine does not speak HTTP itself. It consumes a transport that
//! issues one list request with content negotiation and yields a readable
//! byte stream; everything after the first response byte is the engine's
//! job. Request deadlines and cancellation also live in the transport:
//! canceling its read surfaces as a transport error on the next blocking
//! read and aborts the decode.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use crate::error::TransportError;

/// Content type of the binary list encoding.
pub const CONTENT_TYPE_PROTOBUF: &str = "application/vnd.kubernetes.protobuf";
/// Content type of the text list encoding.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// The two wire formats a list response can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Protobuf,
    Json,
}

impl WireFormat {
    /// The content type requested for this format.
    pub fn content_type(self) -> &'static str {
        match self {
            WireFormat::Protobuf => CONTENT_TYPE_PROTOBUF,
            WireFormat::Json => CONTENT_TYPE_JSON,
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Protobuf => f.write_str("protobuf"),
            WireFormat::Json => f.write_str("json"),
        }
    }
}

/// Options forwarded with a list request. All values are opaque to the
/// engine; the transport implementation serializes them into the request.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Server-side request timeout
    pub timeout: Option<Duration>,
    /// Resource-version hint for the read
    pub resource_version: Option<String>,
    /// Continuation token from a previous page
    pub continue_token: Option<String>,
    /// Maximum number of items per page
    pub limit: Option<i64>,
    /// Label selector restricting the listed objects
    pub label_selector: Option<String>,
    /// Field selector restricting the listed objects
    pub field_selector: Option<String>,
}

/// One list request: which resource collection to enumerate, and how.
#[derive(Debug, Clone)]
pub struct ListRequest {
    /// Resource collection name, e.g. `pods`
    pub resource: String,
    /// Namespace to list within; `None` lists across all namespaces
    pub namespace: Option<String>,
    /// Request options
    pub options: ListOptions,
}

impl ListRequest {
    /// Request listing the named resource collection cluster-wide.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            namespace: None,
            options: ListOptions::default(),
        }
    }

    /// Restrict the request to one namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Attach request options.
    pub fn with_options(mut self, options: ListOptions) -> Self {
        self.options = options;
        self
    }
}

/// A transport that can issue a list request and produce the response
/// byte stream.
///
/// Implementations authenticate, connect, apply the request options and
/// the `accept` content types, and hand back a blocking reader over the
/// response body. The reader is dropped by the engine on every exit path.
pub trait ListTransport {
    /// The response byte stream.
    type Stream: Read;

    /// Issue the request, negotiating the given accept content types.
    ///
    /// # Errors
    /// Any connection or request failure, surfaced unchanged to the
    /// caller of the decode.
    fn stream(&self, request: &ListRequest, accept: &str) -> Result<Self::Stream, TransportError>;
}
