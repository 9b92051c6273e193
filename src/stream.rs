//! Stream orchestration
//!
//! [`stream_list`] is the crate's entry point: it opens the response
//! stream through a [`ListTransport`], sniffs the encoding from the first
//! bytes of the body, and runs the matching decoder, delivering metadata
//! and items through the caller's [`ListParams`] as they arrive.

use std::io::Read;

use tracing::debug;

use crate::error::{ListError, ProtocolError, TransportError};
use crate::json::decode_json_list;
use crate::meta::TypeMeta;
use crate::params::{JsonDecode, ListParams, ProtoDecode};
use crate::proto::{
    decode_envelope, decode_list, decode_list_parallel, EnvelopePayload, PipelineConfig,
    ENCODING_PREFIX,
};
use crate::transport::{
    ListRequest, ListTransport, WireFormat, CONTENT_TYPE_JSON, CONTENT_TYPE_PROTOBUF,
};
use crate::window::ByteWindow;

/// How item payloads of a binary response are decoded.
#[derive(Debug, Clone, Default)]
pub enum DecodeMode {
    /// Decode each item on the calling thread, preserving stream order.
    #[default]
    Sequential,
    /// Decode items on a worker pool; delivery order is unspecified.
    Parallel(PipelineConfig),
}

/// Configuration for [`stream_list`].
#[derive(Debug, Clone, Default)]
pub struct StreamListConfig {
    accept: Option<WireFormat>,
    decode: DecodeMode,
}

impl StreamListConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the negotiation to one wire format. The default accepts
    /// both and lets the server choose.
    pub fn with_accept(mut self, format: WireFormat) -> Self {
        self.accept = Some(format);
        self
    }

    /// Decode binary item payloads on a worker pool.
    pub fn with_parallel_decode(mut self, config: PipelineConfig) -> Self {
        self.decode = DecodeMode::Parallel(config);
        self
    }

    fn accept_header(&self) -> String {
        match self.accept {
            Some(format) => format.content_type().to_string(),
            None => format!("{CONTENT_TYPE_PROTOBUF},{CONTENT_TYPE_JSON}"),
        }
    }

    fn ensure_accepted(&self, format: WireFormat) -> Result<(), ListError> {
        match self.accept {
            Some(expected) if expected != format => Err(ListError::UnsupportedFormat(format)),
            _ => Ok(()),
        }
    }
}

/// Stream one list response through the caller's callbacks.
///
/// The body's encoding is detected from its first byte: the binary magic
/// prefix selects the protobuf decoder, an opening brace selects the JSON
/// decoder. Leading ASCII whitespace is skipped before sniffing. Memory
/// use is bounded by the largest single item plus the decode queue,
/// independent of the response size.
///
/// # Errors
/// Returns the first failure encountered: transport errors from the
/// stream, protocol errors from framing, or an item error from the
/// caller's decode hooks. A body whose first byte matches neither
/// encoding fails with [`ProtocolError::UnknownFormat`], and a detected
/// format excluded by [`StreamListConfig::with_accept`] fails with
/// [`ListError::UnsupportedFormat`].
pub fn stream_list<T, P>(
    transport: &T,
    request: &ListRequest,
    params: &P,
    config: &StreamListConfig,
) -> Result<(), ListError>
where
    T: ListTransport,
    P: ListParams + Sync,
    P::Item: ProtoDecode + JsonDecode + Send,
{
    let mut stream = transport.stream(request, &config.accept_header())?;

    let first = loop {
        match read_one(&mut stream)? {
            None => return Err(ProtocolError::UnexpectedEof { offset: 0 }.into()),
            Some(b' ' | b'\t' | b'\r' | b'\n') => continue,
            Some(byte) => break byte,
        }
    };

    if first == ENCODING_PREFIX[0] {
        config.ensure_accepted(WireFormat::Protobuf)?;
        let mut magic = [first, 0, 0, 0];
        stream
            .read_exact(&mut magic[1..])
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => {
                    ListError::Protocol(ProtocolError::UnexpectedEof { offset: 1 })
                }
                _ => ListError::Transport(TransportError::Io(e)),
            })?;
        if magic != ENCODING_PREFIX {
            return Err(ProtocolError::InvalidMagic { found: magic }.into());
        }
        debug!(resource = %request.resource, format = %WireFormat::Protobuf, "decoding list stream");
        let mut window = ByteWindow::new(stream);
        let mut sink = ListEnvelopeSink {
            params,
            decode: &config.decode,
        };
        decode_envelope(&mut window, &mut sink)
    } else if first == b'{' {
        config.ensure_accepted(WireFormat::Json)?;
        debug!(resource = %request.resource, format = %WireFormat::Json, "decoding list stream");
        let prefix = [first];
        decode_json_list((&prefix[..]).chain(stream), params)
    } else {
        Err(ProtocolError::UnknownFormat { first }.into())
    }
}

fn read_one<R: Read>(stream: &mut R) -> Result<Option<u8>, ListError> {
    let mut byte = [0u8];
    loop {
        match stream.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::Io(e).into()),
        }
    }
}

/// Routes the envelope's fields into the caller's callbacks and the
/// configured list decoder.
struct ListEnvelopeSink<'a, P> {
    params: &'a P,
    decode: &'a DecodeMode,
}

impl<P> EnvelopePayload for ListEnvelopeSink<'_, P>
where
    P: ListParams + Sync,
    P::Item: ProtoDecode + Send,
{
    fn on_raw<R: Read>(&mut self, payload: &mut ByteWindow<R>) -> Result<(), ListError> {
        match self.decode {
            DecodeMode::Sequential => decode_list(payload, self.params),
            DecodeMode::Parallel(config) => decode_list_parallel(payload, self.params, config),
        }
    }

    fn on_type_meta(&mut self, meta: TypeMeta) {
        self.params.on_type_meta(&meta);
    }

    fn on_content_encoding(&mut self, encoding: String) {
        debug!(%encoding, "response declared a content encoding");
    }

    fn on_content_type(&mut self, content_type: String) {
        debug!(%content_type, "response declared a content type");
    }
}
