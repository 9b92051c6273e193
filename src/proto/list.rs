//! List record decoder
//!
//! The envelope's raw payload is a list record: field 1 is the list
//! metadata, field 2 repeats once per item. Items are delivered in stream
//! order, one fully materialized item at a time.

use std::io::Read;

use bytes::Bytes;

use crate::error::{ListError, ProtocolError};
use crate::meta::ListMeta;
use crate::params::{ListParams, ProtoDecode};
use crate::proto::varint::{expect_len_delimited, read_length, read_varint, split_tag};
use crate::window::ByteWindow;

const FIELD_LIST_META: u64 = 1;
const FIELD_ITEM: u64 = 2;

/// Walk the list record in `window`, reporting metadata to `params` and
/// passing each item's encoded bytes to `deliver`.
///
/// The window must be bounded; the list record always arrives as a
/// length-delimited envelope field. An unknown field number ends the walk
/// and the remainder of the window is drained.
pub(super) fn walk_list<R, P>(
    window: &mut ByteWindow<R>,
    params: &P,
    mut deliver: impl FnMut(Bytes) -> Result<(), ListError>,
) -> Result<(), ListError>
where
    R: Read,
    P: ListParams,
{
    let len = window
        .declared_len()
        .ok_or(ProtocolError::UnknownLength)?;

    let mut idx = 0usize;
    while idx < len {
        let tag = read_varint(window, &mut idx)?;
        let (field_number, wire_type) = split_tag(tag)?;
        match field_number {
            FIELD_LIST_META => {
                expect_len_delimited("metadata", wire_type)?;
                let post = field_end(window, &mut idx, len)?;
                let buf = window.range(idx, post)?;
                params.on_list_meta(&ListMeta::decode_protobuf(&buf)?);
                idx = post;
            }
            FIELD_ITEM => {
                expect_len_delimited("items", wire_type)?;
                let post = field_end(window, &mut idx, len)?;
                let buf = window.range(idx, post)?;
                deliver(buf)?;
                idx = post;
            }
            _ => return window.drain(),
        }
    }
    window.drain()
}

/// Read a field's length prefix and return the absolute end offset,
/// rejecting prefixes that overrun the record.
fn field_end<R: Read>(
    window: &mut ByteWindow<R>,
    idx: &mut usize,
    len: usize,
) -> Result<usize, ListError> {
    let field_len = read_length(window, idx)?;
    let post = idx
        .checked_add(field_len)
        .ok_or(ProtocolError::LengthOverflow {
            length: field_len as u64,
        })?;
    if post > len {
        return Err(ProtocolError::UnexpectedEof { offset: len }.into());
    }
    Ok(post)
}

/// Decode the list record sequentially: each item is decoded on the
/// framing thread and handed to [`ListParams::on_object`] before the next
/// item's bytes are read.
///
/// # Errors
/// Framing failures are protocol or transport errors. A failure from
/// [`ProtoDecode::merge_protobuf`] aborts the stream with
/// [`ListError::Item`].
pub fn decode_list<R, P>(window: &mut ByteWindow<R>, params: &P) -> Result<(), ListError>
where
    R: Read,
    P: ListParams,
    P::Item: ProtoDecode,
{
    walk_list(window, params, |buf| {
        let mut item = params.object_factory();
        item.merge_protobuf(&buf)?;
        params.on_object(item);
        Ok(())
    })
}
