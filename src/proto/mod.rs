//! Binary (protobuf) decoding path
//!
//! The binary response body is a four-byte magic prefix followed by an
//! envelope message whose raw payload carries the list record itself.
//! [`decode_envelope`] walks the envelope, [`decode_list`] walks the list
//! record sequentially, and [`decode_list_parallel`] does the same framing
//! while handing item payloads to a pool of decode workers.

mod envelope;
mod list;
mod pipeline;
pub(crate) mod varint;

pub use envelope::{decode_envelope, EnvelopePayload};
pub use list::decode_list;
pub use pipeline::{decode_list_parallel, PipelineConfig};

/// Magic prefix identifying the binary encoding ("k8s" and a NUL).
pub const ENCODING_PREFIX: [u8; 4] = [0x6b, 0x38, 0x73, 0x00];
