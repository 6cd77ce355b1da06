#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use ferrous_tap_application::ports::Consumer;
use ferrous_tap_domain::{ContentType, DecodedMessage};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct RecordingConsumer {
    accepted: Arc<Mutex<Vec<String>>>,
    consumed: Arc<Mutex<Vec<DecodedMessage>>>,
    finished: Arc<Mutex<Vec<Bytes>>>,
    reject: bool,
    stop_after: Option<usize>,
    delay: Option<Duration>,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn stopping_after(count: usize) -> Self {
        Self {
            stop_after: Some(count),
            ..Self::default()
        }
    }

    /// Sleeps inside every `consume` call.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
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
        !self.reject
    }

    async fn consume(&self, message: DecodedMessage) -> bool {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut consumed = self.consumed.lock().unwrap();
        consumed.push(message);
        match self.stop_after {
            Some(limit) => consumed.len() < limit,
            None => true,
        }
    }

    async fn finished(&self, partial: Bytes) {
        self.finished.lock().unwrap().push(partial);
    }
}
