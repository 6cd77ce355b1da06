use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat};
use ferrous_tap_application::ports::{Consumer, DnsMessageParser};
use ferrous_tap_domain::dnstap::*;
use ferrous_tap_domain::{ContentType, DecodedMessage, DnsMessageSummary, FieldValue};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::io::Write;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, trace};

use super::render::render_message;

/// One telemetry record flattened for JSON output.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TapRecord {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_address: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_address: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_port: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_port: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<DnsMessageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<DnsMessageSummary>,
}

impl TapRecord {
    pub fn from_message(
        id: u64,
        envelope: &DecodedMessage,
        parser: &dyn DnsMessageParser,
    ) -> Self {
        let inner = envelope.message(FIELD_MESSAGE);
        let text = |name: &str| inner.and_then(|m| m.enum_text(name));
        let ip = |name: &str| inner.and_then(|m| m.value(name)).and_then(FieldValue::as_ip);
        let number = |name: &str| inner.and_then(|m| m.value(name)).and_then(FieldValue::as_u64);
        let dns = |name: &str| {
            let wire = inner.and_then(|m| m.value(name)).and_then(FieldValue::as_bytes)?;
            match parser.parse(wire) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    debug!(field = name, error = %e, "Unparseable DNS message in record");
                    None
                }
            }
        };

        Self {
            id,
            identity: lossy_text(envelope, FIELD_IDENTITY),
            version: lossy_text(envelope, FIELD_VERSION),
            message_type: text(FIELD_TYPE),
            socket_family: text(FIELD_SOCKET_FAMILY),
            socket_protocol: text(FIELD_SOCKET_PROTOCOL),
            query_address: ip(FIELD_QUERY_ADDRESS),
            response_address: ip(FIELD_RESPONSE_ADDRESS),
            query_port: number(FIELD_QUERY_PORT),
            response_port: number(FIELD_RESPONSE_PORT),
            query_time: timestamp(number(FIELD_QUERY_TIME_SEC), number(FIELD_QUERY_TIME_NSEC)),
            response_time: timestamp(
                number(FIELD_RESPONSE_TIME_SEC),
                number(FIELD_RESPONSE_TIME_NSEC),
            ),
            query: dns(FIELD_QUERY_MESSAGE),
            response: dns(FIELD_RESPONSE_MESSAGE),
        }
    }
}

fn lossy_text(message: &DecodedMessage, name: &str) -> Option<String> {
    message
        .value(name)
        .and_then(FieldValue::as_bytes)
        .map(|b| String::from_utf8_lossy(b).into_owned())
}

fn timestamp(secs: Option<u64>, nanos: Option<u64>) -> Option<String> {
    let secs = i64::try_from(secs?).ok()?;
    let nanos = u32::try_from(nanos.unwrap_or(0)).ok()?;
    DateTime::from_timestamp(secs, nanos).map(|t| t.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

/// Writes one JSON object per accepted record.
///
/// Serialization happens on the calling task; the write itself runs on the
/// blocking pool so a slow writer never stalls runtime workers.
pub struct JsonLinesConsumer<W> {
    writer: Arc<Mutex<W>>,
    parser: Arc<dyn DnsMessageParser>,
    message_types: FxHashSet<String>,
    pretty: bool,
    serial: AtomicU64,
}

impl<W: Write + Send + 'static> JsonLinesConsumer<W> {
    pub fn new(writer: W, parser: Arc<dyn DnsMessageParser>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            parser,
            message_types: FxHashSet::default(),
            pretty: false,
            serial: AtomicU64::new(0),
        }
    }

    /// Only records whose embedded message type is listed are written.
    /// An empty list writes everything.
    pub fn with_message_types(mut self, types: impl IntoIterator<Item = String>) -> Self {
        self.message_types = types.into_iter().collect();
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn emitted(&self) -> u64 {
        self.serial.load(Ordering::Relaxed)
    }

    /// The writer back, once no write is still in flight.
    pub fn into_inner(self) -> Option<W> {
        Arc::try_unwrap(self.writer).ok()?.into_inner().ok()
    }

    fn wanted(&self, envelope: &DecodedMessage) -> bool {
        if self.message_types.is_empty() {
            return true;
        }
        envelope
            .message(FIELD_MESSAGE)
            .and_then(|m| m.enum_text(FIELD_TYPE))
            .is_some_and(|t| self.message_types.contains(&t))
    }

    fn encode_record(&self, record: &TapRecord) -> Result<Vec<u8>, String> {
        let mut line = if self.pretty {
            serde_json::to_vec_pretty(record)
        } else {
            serde_json::to_vec(record)
        }
        .map_err(|e| e.to_string())?;
        line.push(b'\n');
        Ok(line)
    }

    async fn write_line(&self, line: Vec<u8>) -> Result<(), String> {
        let writer = self.writer.clone();
        let written = tokio::task::spawn_blocking(move || {
            let mut writer = writer
                .lock()
                .map_err(|_| "output writer lock poisoned".to_string())?;
            writer.write_all(&line).map_err(|e| e.to_string())?;
            writer.flush().map_err(|e| e.to_string())
        })
        .await;

        match written {
            Ok(result) => result,
            Err(e) => Err(format!("output task failed: {}", e)),
        }
    }
}

#[async_trait]
impl<W: Write + Send + 'static> Consumer for JsonLinesConsumer<W> {
    async fn accepted(&self, content_type: &ContentType) -> bool {
        info!(content_type = %content_type, "Tap stream accepted");
        true
    }

    async fn consume(&self, message: DecodedMessage) -> bool {
        if tracing::enabled!(tracing::Level::TRACE) {
            trace!(record = %render_message(&message, self.parser.as_ref()), "Decoded record");
        }

        if !self.wanted(&message) {
            return true;
        }

        let id = self.serial.fetch_add(1, Ordering::Relaxed) + 1;
        let record = TapRecord::from_message(id, &message, self.parser.as_ref());
        let written = match self.encode_record(&record) {
            Ok(line) => self.write_line(line).await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to write record, stopping stream");
                false
            }
        }
    }

    async fn finished(&self, partial: Bytes) {
        debug!(leftover_bytes = partial.len(), "Tap stream finished");
    }
}
