mod fixtures;
mod helpers;

use bytes::Bytes;
use ferrous_tap_application::use_cases::DispatchRecordUseCase;
use ferrous_tap_application::IngestStats;
use ferrous_tap_domain::dnstap::FIELD_IDENTITY;
use ferrous_tap_domain::{
    ConnectionError, ContentType, ContentTypeCell, ControlFrame, DispatchMode, FieldValue,
    FramingError, HandshakeError, DNSTAP_CONTENT_TYPE,
};
use ferrous_tap_infrastructure::dnstap::DnstapDecoder;
use ferrous_tap_infrastructure::server::{ConnectionEnd, ConnectionHandler, ConnectionSettings};
use helpers::RecordingConsumer;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const PIPE_CAPACITY: usize = 64 * 1024;

fn make_handler(
    consumer: RecordingConsumer,
    mode: DispatchMode,
) -> (ConnectionHandler, Arc<IngestStats>) {
    let stats = Arc::new(IngestStats::new());
    let dispatch = Arc::new(DispatchRecordUseCase::new(
        Arc::new(DnstapDecoder::default()),
        Arc::new(consumer),
        stats.clone(),
    ));
    let settings = ConnectionSettings {
        dispatch_mode: mode,
        max_in_flight: 4,
        shutdown_grace: Duration::from_millis(500),
        ..ConnectionSettings::default()
    };
    let cell = Arc::new(ContentTypeCell::preset(ContentType::from(DNSTAP_CONTENT_TYPE)));
    (ConnectionHandler::new(1, settings, dispatch, cell), stats)
}

type ConnectionTask = JoinHandle<Result<ConnectionEnd, ConnectionError>>;

fn spawn(handler: ConnectionHandler) -> (DuplexStream, ConnectionTask) {
    let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
    (client, tokio::spawn(handler.run(server)))
}

fn identities(consumer: &RecordingConsumer) -> Vec<String> {
    consumer
        .consumed()
        .iter()
        .filter_map(|m| m.value(FIELD_IDENTITY).and_then(FieldValue::as_bytes).cloned())
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .collect()
}

fn envelopes(names: &[&str]) -> Vec<Bytes> {
    names
        .iter()
        .map(|name| fixtures::envelope(name.as_bytes(), "TYPE_CLIENT_RESPONSE"))
        .collect()
}

#[tokio::test]
async fn test_ready_start_stop_without_records() {
    let consumer = RecordingConsumer::new();
    let (handler, stats) = make_handler(consumer.clone(), DispatchMode::Ordered);
    let (mut client, task) = spawn(handler);

    client
        .write_all(&fixtures::sender_stream(DNSTAP_CONTENT_TYPE, &[]))
        .await
        .unwrap();
    let end = task.await.unwrap().unwrap();

    assert_eq!(end, ConnectionEnd::PeerStopped);
    assert_eq!(consumer.accepted(), vec![DNSTAP_CONTENT_TYPE.to_string()]);
    assert!(consumer.consumed().is_empty());
    assert_eq!(consumer.finished(), vec![Bytes::new()]);

    let mut replies = Vec::new();
    client.read_to_end(&mut replies).await.unwrap();
    let mut expected = ControlFrame::accept(DNSTAP_CONTENT_TYPE).encode().to_vec();
    expected.extend_from_slice(&ControlFrame::finish().encode());
    assert_eq!(replies, expected);

    let snap = stats.snapshot();
    assert_eq!(snap.connections_accepted, 1);
    assert_eq!(snap.connections_closed, 1);
    assert_eq!(snap.frames_received, 3);
}

#[tokio::test]
async fn test_ordered_mode_preserves_receipt_order() {
    let consumer = RecordingConsumer::slow(Duration::from_millis(5));
    let (handler, _) = make_handler(consumer.clone(), DispatchMode::Ordered);
    let (mut client, task) = spawn(handler);

    let names = ["ns1", "ns2", "ns3", "ns4", "ns5", "ns6"];
    client
        .write_all(&fixtures::sender_stream(DNSTAP_CONTENT_TYPE, &envelopes(&names)))
        .await
        .unwrap();

    assert_eq!(task.await.unwrap().unwrap(), ConnectionEnd::PeerStopped);
    assert_eq!(identities(&consumer), names);
}

#[tokio::test]
async fn test_concurrent_mode_delivers_every_record() {
    let consumer = RecordingConsumer::slow(Duration::from_millis(10));
    let (handler, stats) = make_handler(consumer.clone(), DispatchMode::Concurrent);
    let (mut client, task) = spawn(handler);

    let names = ["a", "b", "c", "d", "e", "f", "g"];
    client
        .write_all(&fixtures::sender_stream(DNSTAP_CONTENT_TYPE, &envelopes(&names)))
        .await
        .unwrap();

    assert_eq!(task.await.unwrap().unwrap(), ConnectionEnd::PeerStopped);
    let mut received = identities(&consumer);
    received.sort();
    assert_eq!(received, names);
    assert_eq!(stats.snapshot().records_consumed, names.len() as u64);
}

#[tokio::test]
async fn test_malformed_record_is_dropped_and_stream_continues() {
    let consumer = RecordingConsumer::new();
    let (handler, stats) = make_handler(consumer.clone(), DispatchMode::Ordered);
    let (mut client, task) = spawn(handler);

    let mut payloads = envelopes(&["before"]);
    // field 1 with wire type 7
    payloads.push(Bytes::from_static(&[0x0F, 0x00]));
    payloads.extend(envelopes(&["after"]));
    client
        .write_all(&fixtures::sender_stream(DNSTAP_CONTENT_TYPE, &payloads))
        .await
        .unwrap();

    assert_eq!(task.await.unwrap().unwrap(), ConnectionEnd::PeerStopped);
    assert_eq!(identities(&consumer), vec!["before", "after"]);
    assert_eq!(stats.snapshot().records_dropped, 1);
}

#[tokio::test]
async fn test_content_type_mismatch_closes_connection() {
    let consumer = RecordingConsumer::new();
    let (handler, stats) = make_handler(consumer.clone(), DispatchMode::Ordered);
    let (mut client, task) = spawn(handler);

    client
        .write_all(&ControlFrame::ready("protobuf:other.Type").encode())
        .await
        .unwrap();

    let result = task.await.unwrap();
    assert!(matches!(
        result,
        Err(ConnectionError::Handshake(HandshakeError::TypeMismatch { .. }))
    ));
    assert!(consumer.accepted().is_empty());
    assert_eq!(consumer.finished().len(), 1);
    assert_eq!(stats.snapshot().handshake_failures, 1);
}

#[tokio::test]
async fn test_data_before_handshake_is_rejected() {
    let consumer = RecordingConsumer::new();
    let (handler, _) = make_handler(consumer.clone(), DispatchMode::Ordered);
    let (mut client, task) = spawn(handler);

    client
        .write_all(&fixtures::data_frame(envelopes(&["early"]).remove(0)))
        .await
        .unwrap();

    let result = task.await.unwrap();
    assert!(matches!(
        result,
        Err(ConnectionError::Handshake(HandshakeError::UnexpectedDataFrame { .. }))
    ));
    assert!(consumer.consumed().is_empty());
}

#[tokio::test]
async fn test_oversized_control_frame_is_framing_error() {
    let consumer = RecordingConsumer::new();
    let (handler, _) = make_handler(consumer, DispatchMode::Ordered);
    let (mut client, task) = spawn(handler);

    client.write_all(&[0, 0, 0, 0, 0, 0, 4, 0]).await.unwrap();

    let result = task.await.unwrap();
    assert!(matches!(
        result,
        Err(ConnectionError::Framing(FramingError::FrameTooLarge { .. }))
    ));
}

#[tokio::test]
async fn test_consumer_rejecting_stream() {
    let consumer = RecordingConsumer::rejecting();
    let (handler, _) = make_handler(consumer.clone(), DispatchMode::Ordered);
    let (mut client, task) = spawn(handler);

    client
        .write_all(&fixtures::sender_stream(
            DNSTAP_CONTENT_TYPE,
            &envelopes(&["ignored"]),
        ))
        .await
        .unwrap();

    assert_eq!(task.await.unwrap().unwrap(), ConnectionEnd::ConsumerRejected);
    assert_eq!(consumer.accepted().len(), 1);
    assert!(consumer.consumed().is_empty());
}

#[tokio::test]
async fn test_consumer_stop_ends_connection() {
    let consumer = RecordingConsumer::stopping_after(1);
    let (handler, _) = make_handler(consumer.clone(), DispatchMode::Ordered);
    let (mut client, task) = spawn(handler);

    let mut wire = ControlFrame::ready(DNSTAP_CONTENT_TYPE).encode().to_vec();
    wire.extend_from_slice(&ControlFrame::start(DNSTAP_CONTENT_TYPE).encode());
    for payload in envelopes(&["one", "two", "three"]) {
        wire.extend_from_slice(&fixtures::data_frame(payload));
    }
    client.write_all(&wire).await.unwrap();

    let end = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(end, ConnectionEnd::ConsumerStopped);
    assert_eq!(identities(&consumer), vec!["one"]);
    assert_eq!(consumer.finished().len(), 1);
}

#[tokio::test]
async fn test_shutdown_signal_ends_idle_connection() {
    let consumer = RecordingConsumer::new();
    let (handler, _) = make_handler(consumer.clone(), DispatchMode::Concurrent);
    let token = CancellationToken::new();
    let (mut client, task) = spawn(handler.with_cancellation(token.clone()));

    let mut wire = ControlFrame::ready(DNSTAP_CONTENT_TYPE).encode().to_vec();
    wire.extend_from_slice(&ControlFrame::start(DNSTAP_CONTENT_TYPE).encode());
    client.write_all(&wire).await.unwrap();

    let mut accept = vec![0u8; ControlFrame::accept(DNSTAP_CONTENT_TYPE).encode().len()];
    client.read_exact(&mut accept).await.unwrap();
    token.cancel();

    assert_eq!(task.await.unwrap().unwrap(), ConnectionEnd::Shutdown);
    assert_eq!(consumer.finished(), vec![Bytes::new()]);
}

#[tokio::test]
async fn test_peer_close_hands_partial_frame_to_consumer() {
    let consumer = RecordingConsumer::new();
    let (handler, _) = make_handler(consumer.clone(), DispatchMode::Ordered);
    let (mut client, task) = spawn(handler);

    let mut wire = ControlFrame::ready(DNSTAP_CONTENT_TYPE).encode().to_vec();
    wire.extend_from_slice(&ControlFrame::start(DNSTAP_CONTENT_TYPE).encode());
    wire.extend_from_slice(&[0, 0, 0, 10, 1, 2, 3]);
    client.write_all(&wire).await.unwrap();

    let mut accept = vec![0u8; ControlFrame::accept(DNSTAP_CONTENT_TYPE).encode().len()];
    client.read_exact(&mut accept).await.unwrap();
    drop(client);

    assert_eq!(task.await.unwrap().unwrap(), ConnectionEnd::PeerClosed);
    assert_eq!(
        consumer.finished(),
        vec![Bytes::from_static(&[0, 0, 0, 10, 1, 2, 3])]
    );
}

#[tokio::test]
async fn test_record_larger_than_recv_size() {
    let consumer = RecordingConsumer::new();
    let stats = Arc::new(IngestStats::new());
    let dispatch = Arc::new(DispatchRecordUseCase::new(
        Arc::new(DnstapDecoder::default()),
        Arc::new(consumer.clone()),
        stats.clone(),
    ));
    let settings = ConnectionSettings {
        recv_size: 8,
        ..ConnectionSettings::default()
    };
    let cell = Arc::new(ContentTypeCell::new());
    let (mut client, task) = spawn(ConnectionHandler::new(7, settings, dispatch, cell));

    let identity = "n".repeat(4096);
    let payloads = envelopes(&[identity.as_str(), "small"]);
    client
        .write_all(&fixtures::sender_stream(DNSTAP_CONTENT_TYPE, &payloads))
        .await
        .unwrap();

    assert_eq!(task.await.unwrap().unwrap(), ConnectionEnd::PeerStopped);
    assert_eq!(identities(&consumer), vec![identity, "small".to_string()]);
    assert_eq!(stats.snapshot().frames_received, 5);
}
