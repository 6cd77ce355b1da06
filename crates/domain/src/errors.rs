use thiserror::Error;

use crate::schema::WireType;

/// Violations of the Frame Streams length-prefix rules.
///
/// Always fatal for the connection that produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("Invalid {kind} frame length: {length}")]
    InvalidLength { kind: &'static str, length: u32 },

    #[error("{kind} frame of {length} bytes exceeds maximum of {max} bytes")]
    FrameTooLarge {
        kind: &'static str,
        length: u32,
        max: u32,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("Unexpected control frame type {control_type} while {phase}")]
    UnexpectedControlType {
        control_type: u32,
        phase: &'static str,
    },

    #[error("Data frame received while {phase}")]
    UnexpectedDataFrame { phase: &'static str },

    #[error("Content type mismatch: expected {expected}, received {received}")]
    TypeMismatch { expected: String, received: String },

    #[error("Control frame carries no content type")]
    MissingContentType,

    #[error("Unexpected control field type {0}")]
    UnexpectedFieldType(u32),

    #[error("Malformed control frame: {0}")]
    MalformedControl(String),
}

/// Errors raised while walking protobuf wire data.
///
/// Fatal for the current frame only; the connection keeps reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Field {field} (id {id}) expects wire type {expected}, got {actual}")]
    TypeMismatch {
        field: &'static str,
        id: u32,
        expected: WireType,
        actual: WireType,
    },

    #[error("Varint longer than 10 bytes")]
    VarintOverflow,

    #[error("Unsupported wire type {wire_type} for field id {id}")]
    UnsupportedWireType { id: u32, wire_type: u8 },

    #[error("Field {field} holds {len} bytes, not an IPv4 or IPv6 address")]
    InvalidAddress { field: &'static str, len: usize },
}

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by collaborators outside the ingest pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid DNS message: {0}")]
    InvalidDnsMessage(String),
}
