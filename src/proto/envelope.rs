//! Outer envelope decoder for the binary encoding
//!
//! The binary response wraps the list record in a small envelope message:
//! type metadata, the raw list payload, and optional content-encoding and
//! content-type hints. The decoder walks the envelope's fields in whatever
//! order the encoder emitted them and hands the raw payload to the
//! supplied handler as a bounded sub-window, never buffering it.

use std::io::Read;

use crate::error::ListError;
use crate::meta::TypeMeta;
use crate::proto::varint::{expect_len_delimited, read_length, try_read_tag};
use crate::window::ByteWindow;

/// Receiver for the envelope's contents.
///
/// [`on_raw`](Self::on_raw) is the only required method; the engine does
/// not interpret the payload, it only carves out the sub-window. The
/// handler must consume the sub-window to its declared end before
/// returning, or the envelope walk that follows will misread the stream.
pub trait EnvelopePayload {
    /// The envelope's raw list payload, as a bounded sub-window.
    fn on_raw<R: Read>(&mut self, payload: &mut ByteWindow<R>) -> Result<(), ListError>;

    /// Type metadata, when the envelope carries it.
    fn on_type_meta(&mut self, _meta: TypeMeta) {}

    /// Content-encoding hint, when present. Reported, never applied.
    fn on_content_encoding(&mut self, _encoding: String) {}

    /// Content-type hint, when present.
    fn on_content_type(&mut self, _content_type: String) {}
}

/// Field numbers of the envelope message.
const FIELD_TYPE_META: u64 = 1;
const FIELD_RAW: u64 = 2;
const FIELD_CONTENT_ENCODING: u64 = 3;
const FIELD_CONTENT_TYPE: u64 = 4;

/// Decode the envelope from `window`, reporting each recognized field to
/// the handler as it is parsed.
///
/// The walk stops at a clean end of stream or at the first unknown field
/// number; either way the remainder of the window is drained so the
/// stream is left fully consumed.
///
/// # Errors
/// Malformed varints, illegal tags, wrong wire types for known fields,
/// and length prefixes that overrun the stream are protocol errors; raw
/// I/O failures are transport errors. Errors from the handler propagate
/// unchanged.
pub fn decode_envelope<R, H>(window: &mut ByteWindow<R>, handler: &mut H) -> Result<(), ListError>
where
    R: Read,
    H: EnvelopePayload,
{
    let mut idx = 0usize;
    while let Some((field_number, wire_type)) = try_read_tag(window, &mut idx)? {
        match field_number {
            FIELD_TYPE_META => {
                expect_len_delimited("typeMeta", wire_type)?;
                let post = field_end(window, &mut idx)?;
                let buf = window.range(idx, post)?;
                handler.on_type_meta(TypeMeta::decode_protobuf(&buf)?);
                idx = post;
            }
            FIELD_RAW => {
                expect_len_delimited("raw", wire_type)?;
                let post = field_end(window, &mut idx)?;
                let mut payload = window.sub_window(idx, post)?;
                handler.on_raw(&mut payload)?;
                idx = post;
            }
            FIELD_CONTENT_ENCODING => {
                expect_len_delimited("contentEncoding", wire_type)?;
                let post = field_end(window, &mut idx)?;
                handler.on_content_encoding(read_string(window, idx, post)?);
                idx = post;
            }
            FIELD_CONTENT_TYPE => {
                expect_len_delimited("contentType", wire_type)?;
                let post = field_end(window, &mut idx)?;
                handler.on_content_type(read_string(window, idx, post)?);
                idx = post;
            }
            _ => break,
        }
    }
    window.drain()
}

/// Read a field's length prefix and return the absolute end offset.
fn field_end<R: Read>(window: &mut ByteWindow<R>, idx: &mut usize) -> Result<usize, ListError> {
    let len = read_length(window, idx)?;
    idx.checked_add(len)
        .ok_or_else(|| crate::error::ProtocolError::LengthOverflow { length: len as u64 }.into())
}

fn read_string<R: Read>(
    window: &mut ByteWindow<R>,
    start: usize,
    end: usize,
) -> Result<String, ListError> {
    let bytes = window.range(start, end)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| crate::error::ProtocolError::InvalidUtf8(e).into())
}
