//! Type and list metadata carried by list responses
//!
//! Both structures exist in two encodings: nested length-delimited
//! messages inside the binary envelope, and plain JSON objects in the text
//! encoding. The protobuf decoders here only understand the handful of
//! fields the engine reports; everything else is skipped.

use serde::Deserialize;

use crate::error::ProtocolError;
use crate::proto::varint::{skip_field, split_tag, take_length_delimited, take_varint};

/// API group/version and kind of the listed resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypeMeta {
    pub api_version: String,
    pub kind: String,
}

impl TypeMeta {
    /// Decode from the nested binary message: field 1 = apiVersion,
    /// field 2 = kind, both strings.
    pub(crate) fn decode_protobuf(mut buf: &[u8]) -> Result<Self, ProtocolError> {
        let mut meta = Self::default();
        while !buf.is_empty() {
            let (field_number, wire_type) = split_tag(take_varint(&mut buf)?)?;
            match field_number {
                1 => meta.api_version = take_string(&mut buf, "apiVersion", wire_type)?,
                2 => meta.kind = take_string(&mut buf, "kind", wire_type)?,
                _ => skip_field(&mut buf, wire_type)?,
            }
        }
        Ok(meta)
    }
}

/// Pagination and consistency markers of one list response.
///
/// All values are opaque to the decoder; they are simply carried through
/// to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListMeta {
    /// Consistency marker for the whole list
    pub resource_version: String,
    /// Continuation token when the response is one page of a larger list
    #[serde(rename = "continue")]
    pub continue_token: Option<String>,
    /// Items left beyond this page, when the server reports it
    pub remaining_item_count: Option<i64>,
}

impl ListMeta {
    /// Decode from the nested binary message: field 2 = resourceVersion,
    /// field 3 = continue, field 4 = remainingItemCount. Field 1 is the
    /// long-deprecated self-link and is skipped along with anything else.
    pub(crate) fn decode_protobuf(mut buf: &[u8]) -> Result<Self, ProtocolError> {
        let mut meta = Self::default();
        while !buf.is_empty() {
            let (field_number, wire_type) = split_tag(take_varint(&mut buf)?)?;
            match field_number {
                2 => meta.resource_version = take_string(&mut buf, "resourceVersion", wire_type)?,
                3 => meta.continue_token = Some(take_string(&mut buf, "continue", wire_type)?),
                4 => {
                    if wire_type != 0 {
                        return Err(ProtocolError::UnexpectedWireType {
                            field: "remainingItemCount",
                            wire_type,
                        });
                    }
                    meta.remaining_item_count = Some(take_varint(&mut buf)? as i64);
                }
                _ => skip_field(&mut buf, wire_type)?,
            }
        }
        Ok(meta)
    }
}

fn take_string(
    buf: &mut &[u8],
    field: &'static str,
    wire_type: u8,
) -> Result<String, ProtocolError> {
    if wire_type != crate::proto::varint::WIRE_TYPE_LEN_DELIMITED {
        return Err(ProtocolError::UnexpectedWireType { field, wire_type });
    }
    let bytes = take_length_delimited(buf)?;
    Ok(String::from_utf8(bytes.to_vec())?)
}
