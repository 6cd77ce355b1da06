//! Turns arbitrarily split stream bytes into Frame Streams frames.
//!
//! Every frame starts with a 4 byte big-endian length. A non-zero length is
//! a data frame of exactly that many bytes. A zero length escapes a control
//! frame, whose own 4 byte length and payload follow.

use bytes::{Buf, Bytes, BytesMut};
use ferrous_tap_domain::frame::LENGTH_PREFIX_SIZE;
use ferrous_tap_domain::{Frame, FrameKind, FramingError, MAX_CONTROL_FRAME_LENGTH};

const DEFAULT_CAPACITY: usize = 64 * 1024;
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// Where the parser stands relative to the front of the buffer.
///
/// Length prefixes stay in the buffer until the whole frame is present so
/// that [`FrameReassembler::take_remaining`] returns the exact unconsumed
/// bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingOuterLength,
    AwaitingControlLength,
    AwaitingControl { length: u32 },
    AwaitingData { length: u32 },
}

pub struct FrameReassembler {
    buffer: BytesMut,
    state: State,
    max_frame_size: u32,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(DEFAULT_CAPACITY),
            state: State::AwaitingOuterLength,
            max_frame_size,
        }
    }

    pub fn append(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Minimum number of further bytes before the next frame can complete.
    ///
    /// Length prefixes already buffered are taken into account even when
    /// [`try_extract`](Self::try_extract) has not parsed them yet.
    pub fn bytes_needed(&self) -> usize {
        let control_target = || match self.peek_u32(LENGTH_PREFIX_SIZE) {
            Some(length) => 2 * LENGTH_PREFIX_SIZE + length as usize,
            None => 2 * LENGTH_PREFIX_SIZE,
        };
        let target = match self.state {
            State::AwaitingOuterLength => match self.peek_u32(0) {
                None => LENGTH_PREFIX_SIZE,
                Some(0) => control_target(),
                Some(length) => LENGTH_PREFIX_SIZE + length as usize,
            },
            State::AwaitingControlLength => control_target(),
            State::AwaitingControl { length } => 2 * LENGTH_PREFIX_SIZE + length as usize,
            State::AwaitingData { length } => LENGTH_PREFIX_SIZE + length as usize,
        };
        target.saturating_sub(self.buffer.len())
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Extracts the next complete frame, `Ok(None)` when more bytes are needed.
    ///
    /// A framing error leaves the reassembler unusable; the connection must
    /// be dropped.
    pub fn try_extract(&mut self) -> Result<Option<Frame>, FramingError> {
        loop {
            match self.state {
                State::AwaitingOuterLength => {
                    let Some(outer) = self.peek_u32(0) else {
                        return Ok(None);
                    };
                    self.state = if outer == 0 {
                        State::AwaitingControlLength
                    } else if outer > self.max_frame_size {
                        return Err(FramingError::FrameTooLarge {
                            kind: FrameKind::Data.as_str(),
                            length: outer,
                            max: self.max_frame_size,
                        });
                    } else {
                        State::AwaitingData { length: outer }
                    };
                }
                State::AwaitingControlLength => {
                    let Some(length) = self.peek_u32(LENGTH_PREFIX_SIZE) else {
                        return Ok(None);
                    };
                    if (length as usize) < LENGTH_PREFIX_SIZE {
                        return Err(FramingError::InvalidLength {
                            kind: FrameKind::Control.as_str(),
                            length,
                        });
                    }
                    if length > MAX_CONTROL_FRAME_LENGTH {
                        return Err(FramingError::FrameTooLarge {
                            kind: FrameKind::Control.as_str(),
                            length,
                            max: MAX_CONTROL_FRAME_LENGTH,
                        });
                    }
                    self.state = State::AwaitingControl { length };
                }
                State::AwaitingControl { length } => {
                    let Some(payload) = self.take_frame(2 * LENGTH_PREFIX_SIZE, length) else {
                        return Ok(None);
                    };
                    return Ok(Some(Frame::control(payload)));
                }
                State::AwaitingData { length } => {
                    let Some(payload) = self.take_frame(LENGTH_PREFIX_SIZE, length) else {
                        return Ok(None);
                    };
                    return Ok(Some(Frame {
                        kind: FrameKind::Data,
                        payload,
                    }));
                }
            }
        }
    }

    /// Bytes that have not formed a complete frame, including any partial
    /// length prefix. Resets the reassembler.
    pub fn take_remaining(&mut self) -> Bytes {
        self.state = State::AwaitingOuterLength;
        self.buffer.split().freeze()
    }

    fn peek_u32(&self, offset: usize) -> Option<u32> {
        let bytes = self.buffer.get(offset..offset + LENGTH_PREFIX_SIZE)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take_frame(&mut self, header_len: usize, length: u32) -> Option<Bytes> {
        let length = length as usize;
        if self.buffer.len() < header_len + length {
            return None;
        }
        self.buffer.advance(header_len);
        self.state = State::AwaitingOuterLength;
        Some(self.buffer.split_to(length).freeze())
    }
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}
