#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use ferrous_tap_application::ports::{Consumer, TapDecoder};
use ferrous_tap_domain::{ContentType, DecodeError, DecodedMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Records every callback so tests can assert on what the core delivered.
#[derive(Clone, Default)]
pub struct RecordingConsumer {
    accepted: Arc<Mutex<Vec<String>>>,
    consumed: Arc<Mutex<Vec<DecodedMessage>>>,
    finished: Arc<Mutex<Vec<Bytes>>>,
    reject_handshake: Arc<AtomicBool>,
    stop_after: Arc<Mutex<Option<usize>>>,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        let consumer = Self::default();
        consumer.reject_handshake.store(true, Ordering::SeqCst);
        consumer
    }

    /// `consume` returns false once this many records have been received.
    pub fn stopping_after(count: usize) -> Self {
        let consumer = Self::default();
        *consumer.stop_after.lock().unwrap() = Some(count);
        consumer
    }

    pub fn accepted(&self) -> Vec<String> {
        self.accepted.lock().unwrap().clone()
    }

    pub fn consumed(&self) -> Vec<DecodedMessage> {
        self.consumed.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<Bytes> {
        self.finished.lock().unwrap().clone()
    }
}

#[async_trait]
impl Consumer for RecordingConsumer {
    async fn accepted(&self, content_type: &ContentType) -> bool {
        self.accepted
            .lock()
            .unwrap()
            .push(content_type.as_str().to_string());
        !self.reject_handshake.load(Ordering::SeqCst)
    }

    async fn consume(&self, message: DecodedMessage) -> bool {
        let mut consumed = self.consumed.lock().unwrap();
        consumed.push(message);
        match *self.stop_after.lock().unwrap() {
            Some(limit) => consumed.len() < limit,
            None => true,
        }
    }

    async fn finished(&self, partial: Bytes) {
        self.finished.lock().unwrap().push(partial);
    }
}

/// Decoder that fails on payloads starting with 0xFF and otherwise yields an
/// empty message of the given schema.
pub struct StubDecoder {
    pub schema: &'static str,
}

impl TapDecoder for StubDecoder {
    fn decode(&self, payload: &Bytes) -> Result<DecodedMessage, DecodeError> {
        if payload.first() == Some(&0xFF) {
            return Err(DecodeError::Truncated {
                needed: 2,
                available: payload.len(),
            });
        }
        Ok(DecodedMessage::new(self.schema))
    }
}
