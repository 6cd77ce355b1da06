#![allow(dead_code)]

use bytes::Bytes;
use ferrous_tap_domain::dnstap::{
    ordinal_of, DNSTAP_TYPES, MESSAGE_TYPES, SOCKET_FAMILIES, SOCKET_PROTOCOLS,
};
use ferrous_tap_domain::{ControlFrame, Frame};
use ferrous_tap_infrastructure::protobuf::MessageEncoder;
use std::net::IpAddr;

/// NOERROR response to `example.com A` answering 10.0.0.5 with TTL 300.
pub fn example_dns_response() -> Vec<u8> {
    let mut wire = vec![
        0xBE, 0xEF, // id
        0x81, 0x80, // QR RD RA, NOERROR
        0x00, 0x01, // QDCOUNT
        0x00, 0x01, // ANCOUNT
        0x00, 0x00, 0x00, 0x00,
    ];
    wire.extend_from_slice(b"\x07example\x03com\x00");
    wire.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
    wire.extend_from_slice(&[0xC0, 0x0C]);
    wire.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
    wire.extend_from_slice(&300u32.to_be_bytes());
    wire.extend_from_slice(&[0x00, 0x04, 10, 0, 0, 5]);
    wire
}

/// Query for `example.com A`.
pub fn example_dns_query() -> Vec<u8> {
    let mut wire = vec![
        0xBE, 0xEF, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    wire.extend_from_slice(b"\x07example\x03com\x00");
    wire.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
    wire
}

fn enum_ordinal(table: &[&str], name: &str) -> u64 {
    ordinal_of(table, name).unwrap()
}

/// Embedded dnstap message with the given type name and a response.
pub fn client_response_message(message_type: &str) -> MessageEncoder {
    let query_addr: IpAddr = "10.0.0.1".parse().unwrap();
    let response_addr: IpAddr = "10.0.0.53".parse().unwrap();
    MessageEncoder::new()
        .varint(1, enum_ordinal(MESSAGE_TYPES, message_type))
        .varint(2, enum_ordinal(SOCKET_FAMILIES, "SOCKET_FAMILY_INET"))
        .varint(3, enum_ordinal(SOCKET_PROTOCOLS, "SOCKET_PROTOCOL_UDP"))
        .ip(4, query_addr)
        .ip(5, response_addr)
        .varint(6, 53124)
        .varint(7, 53)
        .varint(12, 1_700_000_000)
        .fixed32(13, 500_000_000)
        .bytes(14, &example_dns_response())
}

/// Complete dnstap envelope around [`client_response_message`].
pub fn envelope(identity: &[u8], message_type: &str) -> Bytes {
    MessageEncoder::new()
        .bytes(1, identity)
        .bytes(2, b"bind 9.18")
        .varint(15, enum_ordinal(DNSTAP_TYPES, "TYPE_MESSAGE"))
        .embedded(14, client_response_message(message_type))
        .finish()
}

pub fn data_frame(payload: Bytes) -> Bytes {
    Frame::data(payload).unwrap().encode()
}

/// READY, START, the given data frames, STOP.
pub fn sender_stream(content_type: &str, payloads: &[Bytes]) -> Vec<u8> {
    let mut wire = Vec::new();
    wire.extend_from_slice(&ControlFrame::ready(content_type).encode());
    wire.extend_from_slice(&ControlFrame::start(content_type).encode());
    for payload in payloads {
        wire.extend_from_slice(&data_frame(payload.clone()));
    }
    wire.extend_from_slice(&ControlFrame::stop().encode());
    wire
}
