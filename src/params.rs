//! Callback contract and item self-decode capabilities
//!
//! The engine never interprets an item's bytes itself. Items are
//! constructed by the caller's factory and then asked to decode themselves
//! from the exact byte range (binary) or deserializer position (JSON) the
//! engine hands them.

use serde::de::DeserializeOwned;
use serde::Deserializer;

use crate::error::ItemDecodeError;
use crate::meta::{ListMeta, TypeMeta};

/// Binary self-decode capability: populate an item in place from one
/// protobuf-encoded byte range.
pub trait ProtoDecode {
    /// Merge the fields encoded in `buf` into this item.
    fn merge_protobuf(&mut self, buf: &[u8]) -> Result<(), ItemDecodeError>;
}

/// JSON self-decode capability: populate an item in place from a
/// deserializer positioned at the item's value.
///
/// Implemented for every `DeserializeOwned` type, so deriving
/// `serde::Deserialize` is enough.
pub trait JsonDecode {
    fn decode_json<'de, D>(&mut self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>;
}

impl<T: DeserializeOwned> JsonDecode for T {
    fn decode_json<'de, D>(&mut self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        *self = T::deserialize(deserializer)?;
        Ok(())
    }
}

/// The callback contract for one streaming list decode.
///
/// One instance serves exactly one decode. All callbacks are invoked
/// synchronously from whichever thread produced the event: the framing
/// thread for metadata, and (in the parallel decode mode) any worker
/// thread for [`on_object`](Self::on_object), which is why the receivers
/// take `&self`. Sequential decodes deliver items in wire order; the
/// parallel mode makes no ordering guarantee between items.
///
/// Metadata ordering is an encoder choice: the list-metadata event may
/// arrive before or after item events, so callers must not assume
/// metadata precedes items.
pub trait ListParams {
    /// The caller's opaque item type.
    type Item;

    /// Construct one empty item for the engine to fill.
    ///
    /// Called once per item (the text decoder may construct one extra
    /// throwaway item while probing for the end of the array), so it
    /// should be cheap and side-effect free.
    fn object_factory(&self) -> Self::Item;

    /// Type metadata for the response. At most one call per decode; the
    /// text decoder guarantees exactly one, with default contents when the
    /// document never names its apiVersion and kind.
    fn on_type_meta(&self, _meta: &TypeMeta) {}

    /// List metadata. At most one call per decode, before or after items
    /// depending on the encoder's field order.
    fn on_list_meta(&self, _meta: &ListMeta) {}

    /// One fully decoded item.
    fn on_object(&self, item: Self::Item);
}
