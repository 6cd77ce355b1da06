use bytes::Bytes;
use ferrous_tap_domain::dnstap::name_of;
use ferrous_tap_domain::{
    DecodeError, DecodedMessage, FieldDescriptor, FieldKind, FieldValue, Schema, UnknownField,
    WireType, WireValue,
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use super::varint::{decode_signed, read_tag, read_varint};

/// Called for every tag read: schema name, field id, wire type and the
/// field name when the schema knows the id.
pub type WireTypeObserver =
    Arc<dyn Fn(&'static str, u32, WireType, Option<&'static str>) + Send + Sync>;

/// Applies a [`Schema`] to protobuf wire bytes.
///
/// Stateless apart from the optional observer, so one instance is shared by
/// every connection.
#[derive(Clone, Default)]
pub struct WireDecoder {
    observer: Option<WireTypeObserver>,
}

impl WireDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: WireTypeObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Decodes `buf` against `schema`.
    ///
    /// Payload slices of length-delimited fields share `buf`'s storage.
    pub fn decode_message(
        &self,
        buf: &Bytes,
        schema: &Schema,
    ) -> Result<DecodedMessage, DecodeError> {
        let mut message = DecodedMessage::new(schema.name());
        let mut pos = 0;

        while pos < buf.len() {
            let (field_id, code, used) = read_tag(&buf[pos..])?;
            pos += used;

            let wire_type = WireType::from_code(code).ok_or(DecodeError::UnsupportedWireType {
                id: field_id,
                wire_type: code,
            })?;
            let descriptor = schema.field(field_id);

            if let Some(observer) = &self.observer {
                observer(schema.name(), field_id, wire_type, descriptor.map(|d| d.name));
            }

            let (raw, used) = read_wire_value(buf, pos, wire_type)?;
            pos += used;

            match descriptor {
                Some(descriptor) => {
                    let value = self.interpret(descriptor, raw)?;
                    message.record(descriptor, value);
                }
                None => message.record_unknown(UnknownField { id: field_id, raw }),
            }
        }

        Ok(message)
    }

    fn interpret(
        &self,
        descriptor: &FieldDescriptor,
        raw: WireValue,
    ) -> Result<FieldValue, DecodeError> {
        match (&descriptor.kind, raw) {
            (FieldKind::Varint, WireValue::Varint(v)) => Ok(FieldValue::Unsigned(v)),
            (FieldKind::SignedVarint, WireValue::Varint(v)) => {
                Ok(FieldValue::Signed(decode_signed(v)))
            }
            (FieldKind::Enum(table), WireValue::Varint(v)) => Ok(FieldValue::Enum {
                ordinal: v,
                name: name_of(table, v),
            }),
            (FieldKind::Fixed32, WireValue::Fixed32(v)) => Ok(FieldValue::Fixed32(v)),
            (FieldKind::Fixed64, WireValue::Fixed64(v)) => Ok(FieldValue::Fixed64(v)),
            (FieldKind::Bytes, WireValue::LengthDelimited(b)) => Ok(FieldValue::Bytes(b)),
            (FieldKind::IpAddress, WireValue::LengthDelimited(b)) => {
                decode_ip(descriptor.name, &b).map(FieldValue::Ip)
            }
            (FieldKind::Embedded(schema), WireValue::LengthDelimited(b)) => {
                self.decode_message(&b, schema).map(FieldValue::Message)
            }
            (FieldKind::DnsWireMessage, WireValue::LengthDelimited(b)) => {
                Ok(FieldValue::DnsWire(b))
            }
            (kind, raw) => match kind.expected_wire_type() {
                Some(expected) => Err(DecodeError::TypeMismatch {
                    field: descriptor.name,
                    id: descriptor.id,
                    expected,
                    actual: raw.wire_type(),
                }),
                None => Ok(FieldValue::Raw(raw)),
            },
        }
    }
}

fn read_wire_value(
    buf: &Bytes,
    pos: usize,
    wire_type: WireType,
) -> Result<(WireValue, usize), DecodeError> {
    let rest = &buf[pos..];
    match wire_type {
        WireType::Varint => {
            let (value, used) = read_varint(rest)?;
            Ok((WireValue::Varint(value), used))
        }
        WireType::Fixed64 => {
            let bytes = take_fixed::<8>(rest)?;
            Ok((WireValue::Fixed64(u64::from_le_bytes(bytes)), 8))
        }
        WireType::Fixed32 => {
            let bytes = take_fixed::<4>(rest)?;
            Ok((WireValue::Fixed32(u32::from_le_bytes(bytes)), 4))
        }
        WireType::LengthDelimited => {
            let (len, used) = read_varint(rest)?;
            let available = rest.len() - used;
            let len = usize::try_from(len)
                .ok()
                .filter(|&len| len <= available)
                .ok_or(DecodeError::Truncated {
                    needed: usize::try_from(len).unwrap_or(usize::MAX),
                    available,
                })?;
            let start = pos + used;
            Ok((
                WireValue::LengthDelimited(buf.slice(start..start + len)),
                used + len,
            ))
        }
    }
}

fn take_fixed<const N: usize>(rest: &[u8]) -> Result<[u8; N], DecodeError> {
    rest.get(..N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(DecodeError::Truncated {
            needed: N,
            available: rest.len(),
        })
}

fn decode_ip(field: &'static str, bytes: &[u8]) -> Result<IpAddr, DecodeError> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Ok(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        return Ok(IpAddr::V6(Ipv6Addr::from(octets)));
    }
    Err(DecodeError::InvalidAddress {
        field,
        len: bytes.len(),
    })
}
