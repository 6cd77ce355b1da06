use bytes::BufMut;
use ferrous_tap_domain::{DecodeError, WireType};

/// A u64 never needs more than ten 7-bit groups.
pub const MAX_VARINT_LEN: usize = 10;

/// Reads a LEB128 varint, returning the value and the number of bytes used.
pub fn read_varint(buf: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut value: u64 = 0;
    for (idx, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        // The tenth group holds only bit 63.
        if idx == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(DecodeError::VarintOverflow);
        }
        value |= u64::from(byte & 0x7F) << (7 * idx);
        if byte & 0x80 == 0 {
            return Ok((value, idx + 1));
        }
    }

    if buf.len() >= MAX_VARINT_LEN {
        return Err(DecodeError::VarintOverflow);
    }
    Err(DecodeError::Truncated {
        needed: buf.len() + 1,
        available: buf.len(),
    })
}

/// Splits a tag into `(field_id, wire_type_code, bytes_used)`.
///
/// The wire type code is returned raw so callers can report unsupported codes.
pub fn read_tag(buf: &[u8]) -> Result<(u32, u8, usize), DecodeError> {
    let (tag, used) = read_varint(buf)?;
    Ok(((tag >> 3) as u32, (tag & 0x07) as u8, used))
}

/// Low bit carries the sign, the rest the magnitude; negatives are stored
/// offset by one so that zero has a single encoding.
pub fn decode_signed(raw: u64) -> i64 {
    let magnitude = (raw >> 1) as i64;
    if raw & 1 == 1 {
        -magnitude - 1
    } else {
        magnitude
    }
}

pub fn encode_signed(value: i64) -> u64 {
    if value < 0 {
        (((-(value + 1)) as u64) << 1) | 1
    } else {
        (value as u64) << 1
    }
}

pub fn encode_varint(mut value: u64, out: &mut impl BufMut) {
    while value >= 0x80 {
        out.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.put_u8(value as u8);
}

pub fn encode_tag(field_id: u32, wire_type: WireType, out: &mut impl BufMut) {
    encode_varint(
        (u64::from(field_id) << 3) | u64::from(wire_type.code()),
        out,
    );
}
