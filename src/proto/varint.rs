//! Varint and field-tag reading for the length-delimited binary encoding
//!
//! Two families of helpers: streaming reads that pull bytes through a
//! [`ByteWindow`] while tracking an absolute index, and slice reads used on
//! nested messages that have already been extracted into memory.

use std::io::Read;

use crate::error::{ListError, ProtocolError};
use crate::window::ByteWindow;

/// Length-delimited wire type (the only one these messages carry).
pub(crate) const WIRE_TYPE_LEN_DELIMITED: u8 = 2;
/// End-group wire type; always a protocol error in this format.
pub(crate) const WIRE_TYPE_END_GROUP: u8 = 4;

/// Read a varint from the window starting at `*idx`, advancing the index
/// past it. Overflow past 64 bits is a protocol error.
pub(crate) fn read_varint<R: Read>(
    window: &mut ByteWindow<R>,
    idx: &mut usize,
) -> Result<u64, ListError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        if shift >= 64 {
            return Err(ProtocolError::VarintOverflow.into());
        }
        let byte = window.byte_at(*idx)?;
        *idx += 1;
        value |= u64::from(byte & 0x7F) << shift;
        if byte < 0x80 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Read a field tag at `*idx`, or `None` when the stream ends cleanly at
/// the tag boundary. A stream that ends in the middle of the tag varint is
/// a protocol error.
pub(crate) fn try_read_tag<R: Read>(
    window: &mut ByteWindow<R>,
    idx: &mut usize,
) -> Result<Option<(u64, u8)>, ListError> {
    let first = match window.next_byte(*idx)? {
        Some(byte) => byte,
        None => return Ok(None),
    };
    *idx += 1;
    let mut value = u64::from(first & 0x7F);
    let mut shift: u32 = 7;
    if first >= 0x80 {
        loop {
            if shift >= 64 {
                return Err(ProtocolError::VarintOverflow.into());
            }
            let byte = window.byte_at(*idx)?;
            *idx += 1;
            value |= u64::from(byte & 0x7F) << shift;
            if byte < 0x80 {
                break;
            }
            shift += 7;
        }
    }
    split_tag(value).map(Some).map_err(ListError::from)
}

/// Split a raw tag into `(field_number, wire_type)`, rejecting field
/// number zero and the end-group wire type.
pub(crate) fn split_tag(tag: u64) -> Result<(u64, u8), ProtocolError> {
    let field_number = tag >> 3;
    let wire_type = (tag & 0x7) as u8;
    if wire_type == WIRE_TYPE_END_GROUP {
        return Err(ProtocolError::EndGroupTag { field_number });
    }
    if field_number == 0 {
        return Err(ProtocolError::IllegalTag {
            field_number,
            wire_type,
        });
    }
    Ok((field_number, wire_type))
}

/// Read a length prefix and convert it to a usable `usize`.
pub(crate) fn read_length<R: Read>(
    window: &mut ByteWindow<R>,
    idx: &mut usize,
) -> Result<usize, ListError> {
    let length = read_varint(window, idx)?;
    usize::try_from(length).map_err(|_| ProtocolError::LengthOverflow { length }.into())
}

/// Require the length-delimited wire type for a named field.
pub(crate) fn expect_len_delimited(
    field: &'static str,
    wire_type: u8,
) -> Result<(), ProtocolError> {
    if wire_type != WIRE_TYPE_LEN_DELIMITED {
        return Err(ProtocolError::UnexpectedWireType { field, wire_type });
    }
    Ok(())
}

// --- slice-based reads for nested in-memory messages ---

/// Decode a varint from the front of `buf`, advancing it.
pub(crate) fn take_varint(buf: &mut &[u8]) -> Result<u64, ProtocolError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        if shift >= 64 {
            return Err(ProtocolError::VarintOverflow);
        }
        let Some((&byte, rest)) = buf.split_first() else {
            return Err(ProtocolError::TruncatedMessage);
        };
        *buf = rest;
        value |= u64::from(byte & 0x7F) << shift;
        if byte < 0x80 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Take a length-prefixed byte run from the front of `buf`.
pub(crate) fn take_length_delimited<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], ProtocolError> {
    let length = take_varint(buf)?;
    let length = usize::try_from(length).map_err(|_| ProtocolError::LengthOverflow { length })?;
    if length > buf.len() {
        return Err(ProtocolError::TruncatedMessage);
    }
    let (head, rest) = buf.split_at(length);
    *buf = rest;
    Ok(head)
}

/// Skip one field of the given wire type in an in-memory message.
pub(crate) fn skip_field(buf: &mut &[u8], wire_type: u8) -> Result<(), ProtocolError> {
    match wire_type {
        0 => take_varint(buf).map(drop),
        1 => take_fixed(buf, 8),
        WIRE_TYPE_LEN_DELIMITED => take_length_delimited(buf).map(drop),
        5 => take_fixed(buf, 4),
        other => Err(ProtocolError::UnexpectedWireType {
            field: "unknown field",
            wire_type: other,
        }),
    }
}

fn take_fixed(buf: &mut &[u8], width: usize) -> Result<(), ProtocolError> {
    if buf.len() < width {
        return Err(ProtocolError::TruncatedMessage);
    }
    *buf = &buf[width..];
    Ok(())
}
