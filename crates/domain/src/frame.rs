//! Frame Streams frames.
//!
//! Every frame on the wire starts with a 4 byte big-endian length. A non-zero
//! length introduces a data frame of exactly that many bytes. A zero length is
//! the escape for a control frame and is followed by a second 4 byte control
//! length and the control payload:
//!
//! ```text
//! data:    | len (u32 BE, > 0) | payload ...              |
//! control: | 0 (u32 BE) | clen (u32 BE) | type (u32 BE) | fields ... |
//! field:   | field type (u32 BE) | flen (u32 BE) | bytes ... |
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::errors::{FramingError, HandshakeError};

pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Upper bound on a control frame payload, as fixed by the Frame Streams protocol.
pub const MAX_CONTROL_FRAME_LENGTH: u32 = 512;

pub const CONTROL_FIELD_CONTENT_TYPE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Control,
    Data,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Control => "control",
            FrameKind::Data => "data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

impl Frame {
    pub fn control(payload: impl Into<Bytes>) -> Self {
        Self {
            kind: FrameKind::Control,
            payload: payload.into(),
        }
    }

    /// An empty data payload cannot be expressed: a zero outer length is the
    /// control escape.
    pub fn data(payload: impl Into<Bytes>) -> Result<Self, FramingError> {
        let payload = payload.into();
        if payload.is_empty() {
            return Err(FramingError::InvalidLength {
                kind: FrameKind::Data.as_str(),
                length: 0,
            });
        }
        Ok(Self {
            kind: FrameKind::Data,
            payload,
        })
    }

    pub fn is_control(&self) -> bool {
        self.kind == FrameKind::Control
    }

    pub fn is_data(&self) -> bool {
        self.kind == FrameKind::Data
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Wire representation including the length prefix (and the escape for
    /// control frames).
    pub fn encode(&self) -> Bytes {
        let payload_len = self.payload.len() as u32;
        match self.kind {
            FrameKind::Data => {
                let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + self.payload.len());
                buf.put_u32(payload_len);
                buf.put_slice(&self.payload);
                buf.freeze()
            }
            FrameKind::Control => {
                let mut buf =
                    BytesMut::with_capacity(2 * LENGTH_PREFIX_SIZE + self.payload.len());
                buf.put_u32(0);
                buf.put_u32(payload_len);
                buf.put_slice(&self.payload);
                buf.freeze()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlType {
    Accept,
    Start,
    Stop,
    Ready,
    Finish,
    Unknown(u32),
}

impl ControlType {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => ControlType::Accept,
            2 => ControlType::Start,
            3 => ControlType::Stop,
            4 => ControlType::Ready,
            5 => ControlType::Finish,
            other => ControlType::Unknown(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            ControlType::Accept => 1,
            ControlType::Start => 2,
            ControlType::Stop => 3,
            ControlType::Ready => 4,
            ControlType::Finish => 5,
            ControlType::Unknown(code) => *code,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlType::Accept => "ACCEPT",
            ControlType::Start => "START",
            ControlType::Stop => "STOP",
            ControlType::Ready => "READY",
            ControlType::Finish => "FINISH",
            ControlType::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlType::Unknown(code) => write!(f, "UNKNOWN({})", code),
            known => f.write_str(known.as_str()),
        }
    }
}

/// Parsed control frame payload: the control type plus any content-type fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    pub control_type: ControlType,
    pub content_types: Vec<String>,
}

impl ControlFrame {
    pub fn new(control_type: ControlType) -> Self {
        Self {
            control_type,
            content_types: Vec::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_types.push(content_type.into());
        self
    }

    pub fn ready(content_type: impl Into<String>) -> Self {
        Self::new(ControlType::Ready).with_content_type(content_type)
    }

    pub fn accept(content_type: impl Into<String>) -> Self {
        Self::new(ControlType::Accept).with_content_type(content_type)
    }

    pub fn start(content_type: impl Into<String>) -> Self {
        Self::new(ControlType::Start).with_content_type(content_type)
    }

    pub fn stop() -> Self {
        Self::new(ControlType::Stop)
    }

    pub fn finish() -> Self {
        Self::new(ControlType::Finish)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_types.first().map(String::as_str)
    }

    pub fn encode_payload(&self) -> Bytes {
        let fields_len: usize = self
            .content_types
            .iter()
            .map(|ct| 2 * LENGTH_PREFIX_SIZE + ct.len())
            .sum();
        let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + fields_len);
        buf.put_u32(self.control_type.code());
        for content_type in &self.content_types {
            buf.put_u32(CONTROL_FIELD_CONTENT_TYPE);
            buf.put_u32(content_type.len() as u32);
            buf.put_slice(content_type.as_bytes());
        }
        buf.freeze()
    }

    pub fn to_frame(&self) -> Frame {
        Frame::control(self.encode_payload())
    }

    /// Full wire bytes: escape, control length, payload.
    pub fn encode(&self) -> Bytes {
        self.to_frame().encode()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, HandshakeError> {
        let (control_code, mut rest) = split_u32(payload).ok_or_else(|| {
            HandshakeError::MalformedControl(format!(
                "{} bytes is too short for a control type",
                payload.len()
            ))
        })?;

        let mut frame = ControlFrame::new(ControlType::from_code(control_code));

        while !rest.is_empty() {
            let (field_type, after_type) = split_u32(rest).ok_or_else(|| {
                HandshakeError::MalformedControl("truncated control field type".to_string())
            })?;
            if field_type != CONTROL_FIELD_CONTENT_TYPE {
                return Err(HandshakeError::UnexpectedFieldType(field_type));
            }
            let (field_len, after_len) = split_u32(after_type).ok_or_else(|| {
                HandshakeError::MalformedControl("truncated control field length".to_string())
            })?;
            let field_len = field_len as usize;
            if field_len > after_len.len() {
                return Err(HandshakeError::MalformedControl(format!(
                    "content type field declares {} bytes, {} available",
                    field_len,
                    after_len.len()
                )));
            }
            let value = std::str::from_utf8(&after_len[..field_len]).map_err(|e| {
                HandshakeError::MalformedControl(format!("content type is not UTF-8: {}", e))
            })?;
            frame.content_types.push(value.to_string());
            rest = &after_len[field_len..];
        }

        Ok(frame)
    }
}

fn split_u32(buf: &[u8]) -> Option<(u32, &[u8])> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return None;
    }
    let (head, tail) = buf.split_at(LENGTH_PREFIX_SIZE);
    Some((u32::from_be_bytes([head[0], head[1], head[2], head[3]]), tail))
}
