//! Text (JSON) decoding path
//!
//! A JSON list response is a single object with `apiVersion`, `kind`,
//! `metadata`, and `items` members, in any order. The decoder drives
//! [`serde_json`]'s streaming deserializer directly, so each item is
//! materialized and delivered before the next one is parsed and the whole
//! `items` array is never buffered.

use std::cell::Cell;
use std::fmt;
use std::io::Read;

use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

use crate::error::{ItemDecodeError, ListError, ProtocolError};
use crate::meta::{ListMeta, TypeMeta};
use crate::params::{JsonDecode, ListParams};

/// Decode a JSON list document from `reader`, reporting metadata and items
/// to `params` as they are parsed.
///
/// Type metadata is reported exactly once: as soon as both `apiVersion`
/// and `kind` have been seen, or at the end of the document with whatever
/// subset was present. Unknown members are skipped. Content past the
/// closing brace is ignored.
///
/// # Errors
/// Structural failures, including invalid JSON and an `items` member that
/// is not an array, are protocol errors. A failure while decoding an
/// individual item aborts the stream with [`ListError::Item`].
pub fn decode_json_list<R, P>(reader: R, params: &P) -> Result<(), ListError>
where
    R: Read,
    P: ListParams,
    P::Item: JsonDecode,
{
    let item_failed = Cell::new(false);
    let mut de = serde_json::Deserializer::from_reader(reader);
    let document = ListDocument {
        params,
        item_failed: &item_failed,
    };
    document.deserialize(&mut de).map_err(|e| {
        // serde_json reports every failure through one error type, so the
        // item seed flags its own failures to keep the classes apart. An
        // EOF is always stream corruption, even when it surfaces inside
        // an item.
        if item_failed.get() && !e.is_eof() {
            ListError::Item(ItemDecodeError::new(e))
        } else {
            ListError::Protocol(ProtocolError::Json(e))
        }
    })
}

struct ListDocument<'a, P> {
    params: &'a P,
    item_failed: &'a Cell<bool>,
}

impl<'de, P> DeserializeSeed<'de> for ListDocument<'_, P>
where
    P: ListParams,
    P::Item: JsonDecode,
{
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de, P> Visitor<'de> for ListDocument<'_, P>
where
    P: ListParams,
    P::Item: JsonDecode,
{
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON list document")
    }

    fn visit_map<A>(self, mut map: A) -> Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut api_version: Option<String> = None;
        let mut kind: Option<String> = None;
        let mut type_meta_emitted = false;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "apiVersion" => {
                    api_version = Some(map.next_value()?);
                }
                "kind" => {
                    kind = Some(map.next_value()?);
                }
                "metadata" => {
                    let meta: ListMeta = map.next_value()?;
                    self.params.on_list_meta(&meta);
                }
                "items" => {
                    map.next_value_seed(ItemArray {
                        params: self.params,
                        item_failed: self.item_failed,
                    })?;
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
            if !type_meta_emitted {
                if let (Some(v), Some(k)) = (api_version.as_deref(), kind.as_deref()) {
                    self.params.on_type_meta(&TypeMeta {
                        api_version: v.to_string(),
                        kind: k.to_string(),
                    });
                    type_meta_emitted = true;
                }
            }
        }

        if !type_meta_emitted {
            self.params.on_type_meta(&TypeMeta {
                api_version: api_version.unwrap_or_default(),
                kind: kind.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

struct ItemArray<'a, P> {
    params: &'a P,
    item_failed: &'a Cell<bool>,
}

impl<'de, P> DeserializeSeed<'de> for ItemArray<'_, P>
where
    P: ListParams,
    P::Item: JsonDecode,
{
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, P> Visitor<'de> for ItemArray<'_, P>
where
    P: ListParams,
    P::Item: JsonDecode,
{
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of list items")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        loop {
            let mut item = self.params.object_factory();
            let decoded = seq.next_element_seed(ItemInPlace {
                item: &mut item,
                item_failed: self.item_failed,
            })?;
            match decoded {
                Some(()) => self.params.on_object(item),
                None => return Ok(()),
            }
        }
    }
}

/// Decodes one item into a caller-provided slot, flagging failures so the
/// outer error can be classified as an item error rather than a document
/// error.
struct ItemInPlace<'a, T> {
    item: &'a mut T,
    item_failed: &'a Cell<bool>,
}

impl<'de, T> DeserializeSeed<'de> for ItemInPlace<'_, T>
where
    T: JsonDecode,
{
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        self.item.decode_json(deserializer).map_err(|e| {
            self.item_failed.set(true);
            e
        })
    }
}
