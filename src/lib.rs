//! Streaming decoder for large list API responses
//!
//! This library decodes Kubernetes-style list responses incrementally,
//! delivering metadata and items through callbacks as they are parsed.
//! Memory use is bounded by the largest single item, not the response
//! size. Both the binary protobuf envelope encoding and the JSON encoding
//! are supported; the format is sniffed from the first response bytes.
//!
//! The entry point is [`stream_list`]: give it a [`ListTransport`] that
//! produces the response byte stream, a [`ListRequest`], and a
//! [`ListParams`] implementation with your item callbacks.

pub mod error;
pub mod json;
pub mod meta;
pub mod params;
pub mod proto;
pub mod stream;
pub mod transport;
pub mod window;

pub use error::{ItemDecodeError, ListError, ProtocolError, TransportError};
pub use json::decode_json_list;
pub use meta::{ListMeta, TypeMeta};
pub use params::{JsonDecode, ListParams, ProtoDecode};
pub use proto::{
    decode_envelope, decode_list, decode_list_parallel, EnvelopePayload, PipelineConfig,
    ENCODING_PREFIX,
};
pub use stream::{stream_list, DecodeMode, StreamListConfig};
pub use transport::{
    ListOptions, ListRequest, ListTransport, WireFormat, CONTENT_TYPE_JSON,
    CONTENT_TYPE_PROTOBUF,
};
pub use window::ByteWindow;
