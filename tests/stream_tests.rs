//! End-to-end tests driving `stream_list` over in-memory transports with
//! hand-encoded binary and JSON bodies.

use std::io::Cursor;
use std::sync::Mutex;

use serde::Deserialize;

use streamlist::{
    stream_list, ItemDecodeError, ListError, ListMeta, ListParams, ListRequest, ListTransport,
    PipelineConfig, ProtoDecode, ProtocolError, StreamListConfig, TransportError, TypeMeta,
    WireFormat, ENCODING_PREFIX,
};

// --- wire encoding helpers ---

fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            return out;
        }
    }
}

fn field(field_number: u64, payload: &[u8]) -> Vec<u8> {
    let mut out = encode_varint((field_number << 3) | 2);
    out.extend_from_slice(&encode_varint(payload.len() as u64));
    out.extend_from_slice(payload);
    out
}

fn string_field(field_number: u64, value: &str) -> Vec<u8> {
    field(field_number, value.as_bytes())
}

/// Encode a Pod-shaped item: field 1 is the name.
fn pod_bytes(name: &str) -> Vec<u8> {
    string_field(1, name)
}

/// Build a complete binary response body: magic prefix, envelope with
/// type metadata and the raw list record.
fn binary_body(resource_version: &str, items: &[Vec<u8>]) -> Vec<u8> {
    let mut list_meta = string_field(2, resource_version);
    list_meta.extend_from_slice(&string_field(3, "next-page"));

    let mut record = field(1, &list_meta);
    for item in items {
        record.extend_from_slice(&field(2, item));
    }

    let mut type_meta = string_field(1, "v1");
    type_meta.extend_from_slice(&string_field(2, "PodList"));

    let mut body = ENCODING_PREFIX.to_vec();
    body.extend_from_slice(&field(1, &type_meta));
    body.extend_from_slice(&field(2, &record));
    body.extend_from_slice(&string_field(4, "application/vnd.kubernetes.protobuf"));
    body
}

// --- test item and callbacks ---

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct Pod {
    #[serde(default)]
    name: String,
}

impl ProtoDecode for Pod {
    fn merge_protobuf(&mut self, mut buf: &[u8]) -> Result<(), ItemDecodeError> {
        while !buf.is_empty() {
            let tag = take_varint(&mut buf)?;
            match tag >> 3 {
                1 => {
                    let len = take_varint(&mut buf)? as usize;
                    if len > buf.len() {
                        return Err(ItemDecodeError::new("name field overruns the item"));
                    }
                    self.name = String::from_utf8(buf[..len].to_vec())
                        .map_err(ItemDecodeError::new)?;
                    buf = &buf[len..];
                }
                _ => return Err(ItemDecodeError::new("unexpected field in item")),
            }
        }
        Ok(())
    }
}

fn take_varint(buf: &mut &[u8]) -> Result<u64, ItemDecodeError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let (&byte, rest) = buf
            .split_first()
            .ok_or_else(|| ItemDecodeError::new("truncated varint in item"))?;
        *buf = rest;
        value |= u64::from(byte & 0x7F) << shift;
        if byte < 0x80 {
            return Ok(value);
        }
        shift += 7;
    }
}

#[derive(Debug, Default)]
struct Collector {
    type_metas: Mutex<Vec<TypeMeta>>,
    list_metas: Mutex<Vec<ListMeta>>,
    pods: Mutex<Vec<Pod>>,
}

impl ListParams for Collector {
    type Item = Pod;

    fn object_factory(&self) -> Pod {
        Pod::default()
    }

    fn on_type_meta(&self, meta: &TypeMeta) {
        self.type_metas.lock().unwrap().push(meta.clone());
    }

    fn on_list_meta(&self, meta: &ListMeta) {
        self.list_metas.lock().unwrap().push(meta.clone());
    }

    fn on_object(&self, item: Pod) {
        self.pods.lock().unwrap().push(item);
    }
}

struct MockTransport(Vec<u8>);

impl ListTransport for MockTransport {
    type Stream = Cursor<Vec<u8>>;

    fn stream(&self, _request: &ListRequest, _accept: &str) -> Result<Self::Stream, TransportError> {
        Ok(Cursor::new(self.0.clone()))
    }
}

/// Transport that always fails to connect.
struct DownTransport;

impl ListTransport for DownTransport {
    type Stream = Cursor<Vec<u8>>;

    fn stream(&self, _request: &ListRequest, _accept: &str) -> Result<Self::Stream, TransportError> {
        Err(TransportError::Status { code: 503 })
    }
}

fn run(body: Vec<u8>, config: StreamListConfig) -> Result<Collector, ListError> {
    let transport = MockTransport(body);
    let request = ListRequest::new("pods").with_namespace("default");
    let collector = Collector::default();
    stream_list(&transport, &request, &collector, &config)?;
    Ok(collector)
}

// --- binary path ---

#[test]
fn binary_stream_delivers_metadata_then_items_in_order() {
    let body = binary_body(
        "100",
        &[pod_bytes("pod-a"), pod_bytes("pod-b"), pod_bytes("pod-c")],
    );
    let collector = run(body, StreamListConfig::new()).unwrap();

    let type_metas = collector.type_metas.into_inner().unwrap();
    assert_eq!(type_metas.len(), 1);
    assert_eq!(type_metas[0].api_version, "v1");
    assert_eq!(type_metas[0].kind, "PodList");

    let list_metas = collector.list_metas.into_inner().unwrap();
    assert_eq!(list_metas.len(), 1);
    assert_eq!(list_metas[0].resource_version, "100");
    assert_eq!(list_metas[0].continue_token.as_deref(), Some("next-page"));

    let names: Vec<_> = collector
        .pods
        .into_inner()
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["pod-a", "pod-b", "pod-c"]);
}

#[test]
fn binary_stream_with_no_items_reports_metadata_only() {
    let body = binary_body("42", &[]);
    let collector = run(body, StreamListConfig::new()).unwrap();
    assert!(collector.pods.into_inner().unwrap().is_empty());
    assert_eq!(
        collector.list_metas.into_inner().unwrap()[0].resource_version,
        "42"
    );
}

#[test]
fn truncated_item_length_fails_without_panicking() {
    // The record claims a 50-byte item but the body ends after 10 bytes.
    let mut record = field(1, &string_field(2, "100"));
    record.extend_from_slice(&encode_varint((2 << 3) | 2));
    record.extend_from_slice(&encode_varint(50));
    record.extend_from_slice(&[0u8; 10]);

    let mut body = ENCODING_PREFIX.to_vec();
    body.extend_from_slice(&field(2, &record));

    let err = run(body, StreamListConfig::new()).unwrap_err();
    assert!(matches!(
        err,
        ListError::Protocol(ProtocolError::UnexpectedEof { .. })
    ));
}

#[test]
fn parallel_decode_delivers_the_same_item_set() {
    let items: Vec<Vec<u8>> = (0..300).map(|i| pod_bytes(&format!("pod-{i}"))).collect();
    let body = binary_body("7", &items);

    let config = StreamListConfig::new().with_parallel_decode(
        PipelineConfig::new().with_workers(4).with_queue_capacity(16),
    );
    let collector = run(body, config).unwrap();

    let mut names: Vec<_> = collector
        .pods
        .into_inner()
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    names.sort();
    let mut expected: Vec<_> = (0..300).map(|i| format!("pod-{i}")).collect();
    expected.sort();
    assert_eq!(names, expected);
}

#[test]
fn parallel_decode_surfaces_item_errors() {
    // Field 9 inside the item makes merge_protobuf fail.
    let bad_item = field(9, b"unknown");
    let mut items = vec![pod_bytes("ok")];
    items.push(bad_item);
    items.extend((0..50).map(|i| pod_bytes(&format!("pod-{i}"))));
    let body = binary_body("7", &items);

    let config =
        StreamListConfig::new().with_parallel_decode(PipelineConfig::new().with_workers(2));
    let err = run(body, config).unwrap_err();
    assert!(matches!(err, ListError::Item(_)));
}

// --- text path ---

#[test]
fn json_stream_delivers_metadata_and_items() {
    let body = br#"{
        "apiVersion": "v1",
        "kind": "PodList",
        "metadata": {"resourceVersion": "100", "remainingItemCount": 5},
        "items": [{"name": "pod-a"}, {"name": "pod-b"}]
    }"#;
    let collector = run(body.to_vec(), StreamListConfig::new()).unwrap();

    assert_eq!(collector.type_metas.into_inner().unwrap()[0].kind, "PodList");
    let list_metas = collector.list_metas.into_inner().unwrap();
    assert_eq!(list_metas[0].remaining_item_count, Some(5));
    let names: Vec<_> = collector
        .pods
        .into_inner()
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["pod-a", "pod-b"]);
}

#[test]
fn json_item_error_aborts_the_stream() {
    let body = br#"{"items": [{"name": "ok"}, {"name": 12}]}"#;
    let err = run(body.to_vec(), StreamListConfig::new()).unwrap_err();
    assert!(matches!(err, ListError::Item(_)));
}

// --- dispatch and negotiation ---

#[test]
fn format_is_sniffed_from_the_first_byte() {
    let json = run(
        br#"{"items": []}"#.to_vec(),
        StreamListConfig::new(),
    );
    assert!(json.is_ok());

    let binary = run(binary_body("1", &[]), StreamListConfig::new());
    assert!(binary.is_ok());
}

#[test]
fn html_error_page_is_an_unknown_format() {
    let err = run(b"<html>oops</html>".to_vec(), StreamListConfig::new()).unwrap_err();
    assert!(matches!(
        err,
        ListError::Protocol(ProtocolError::UnknownFormat { first: b'<' })
    ));
}

#[test]
fn accept_restriction_is_enforced_against_the_body() {
    let err = run(
        binary_body("1", &[]),
        StreamListConfig::new().with_accept(WireFormat::Json),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ListError::UnsupportedFormat(WireFormat::Protobuf)
    ));

    let err = run(
        br#"{"items": []}"#.to_vec(),
        StreamListConfig::new().with_accept(WireFormat::Protobuf),
    )
    .unwrap_err();
    assert!(matches!(err, ListError::UnsupportedFormat(WireFormat::Json)));
}

#[test]
fn transport_failure_surfaces_unchanged() {
    let collector = Collector::default();
    let err = stream_list(
        &DownTransport,
        &ListRequest::new("pods"),
        &collector,
        &StreamListConfig::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ListError::Transport(TransportError::Status { code: 503 })
    ));
}
