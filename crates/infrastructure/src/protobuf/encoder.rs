use bytes::{BufMut, Bytes, BytesMut};
use ferrous_tap_domain::WireType;
use std::net::IpAddr;

use super::varint::{encode_signed, encode_tag, encode_varint};

/// Builds protobuf wire data field by field.
///
/// Used by fixtures and tools that need to produce telemetry payloads.
#[derive(Debug, Default, Clone)]
pub struct MessageEncoder {
    buf: BytesMut,
}

impl MessageEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn varint(mut self, field_id: u32, value: u64) -> Self {
        encode_tag(field_id, WireType::Varint, &mut self.buf);
        encode_varint(value, &mut self.buf);
        self
    }

    pub fn signed_varint(self, field_id: u32, value: i64) -> Self {
        self.varint(field_id, encode_signed(value))
    }

    pub fn fixed32(mut self, field_id: u32, value: u32) -> Self {
        encode_tag(field_id, WireType::Fixed32, &mut self.buf);
        self.buf.put_u32_le(value);
        self
    }

    pub fn fixed64(mut self, field_id: u32, value: u64) -> Self {
        encode_tag(field_id, WireType::Fixed64, &mut self.buf);
        self.buf.put_u64_le(value);
        self
    }

    pub fn bytes(mut self, field_id: u32, value: &[u8]) -> Self {
        encode_tag(field_id, WireType::LengthDelimited, &mut self.buf);
        encode_varint(value.len() as u64, &mut self.buf);
        self.buf.put_slice(value);
        self
    }

    pub fn ip(self, field_id: u32, addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => self.bytes(field_id, &v4.octets()),
            IpAddr::V6(v6) => self.bytes(field_id, &v6.octets()),
        }
    }

    pub fn embedded(self, field_id: u32, message: MessageEncoder) -> Self {
        let inner = message.finish();
        self.bytes(field_id, &inner)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_is_length_prefixed() {
        let inner = MessageEncoder::new().varint(1, 6);
        let wire = MessageEncoder::new().embedded(14, inner).finish();
        assert_eq!(&wire[..], &[0x72, 0x02, 0x08, 0x06]);
    }

    #[test]
    fn test_fixed_values_little_endian() {
        let wire = MessageEncoder::new().fixed32(9, 0x0102_0304).finish();
        assert_eq!(&wire[..], &[0x4D, 0x04, 0x03, 0x02, 0x01]);
    }
}
