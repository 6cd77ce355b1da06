mod fixtures;
mod helpers;

use ferrous_tap_application::use_cases::DispatchRecordUseCase;
use ferrous_tap_application::IngestStats;
use ferrous_tap_domain::config::IngestConfig;
use ferrous_tap_domain::{ContentTypeScope, ControlFrame, DNSTAP_CONTENT_TYPE};
use ferrous_tap_infrastructure::dnstap::DnstapDecoder;
use ferrous_tap_infrastructure::server::{ConnectionSettings, ContentTypePolicy, TapListener};
use helpers::RecordingConsumer;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;

fn bind(
    path: &Path,
    consumer: RecordingConsumer,
    policy: ContentTypePolicy,
) -> (TapListener, Arc<IngestStats>) {
    let stats = Arc::new(IngestStats::new());
    let dispatch = Arc::new(DispatchRecordUseCase::new(
        Arc::new(DnstapDecoder::default()),
        Arc::new(consumer),
        stats.clone(),
    ));
    let settings = ConnectionSettings {
        shutdown_grace: Duration::from_millis(200),
        ..ConnectionSettings::default()
    };
    let listener = TapListener::bind(path, true, settings, dispatch, policy).unwrap();
    (listener, stats)
}

async fn send_session(path: &Path, content_type: &str, records: usize) -> Vec<u8> {
    let payloads: Vec<_> = (0..records)
        .map(|i| fixtures::envelope(format!("ns{}", i).as_bytes(), "TYPE_CLIENT_RESPONSE"))
        .collect();
    let mut stream = UnixStream::connect(path).await.unwrap();
    stream
        .write_all(&fixtures::sender_stream(content_type, &payloads))
        .await
        .unwrap();
    let mut replies = Vec::new();
    stream.read_to_end(&mut replies).await.unwrap();
    replies
}

/// Sends only READY and collects whatever the receiver writes back before
/// closing.
async fn offer_ready(path: &Path, content_type: &str) -> Vec<u8> {
    let mut stream = UnixStream::connect(path).await.unwrap();
    stream
        .write_all(&ControlFrame::ready(content_type).encode())
        .await
        .unwrap();
    let mut replies = Vec::new();
    let _ = stream.read_to_end(&mut replies).await;
    replies
}

#[tokio::test]
async fn test_serves_sessions_and_removes_socket_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dnstap.sock");
    let consumer = RecordingConsumer::new();
    let (listener, stats) = bind(
        &path,
        consumer.clone(),
        ContentTypePolicy::from_config(&IngestConfig::default()),
    );
    assert_eq!(listener.local_path(), path.as_path());

    let token = CancellationToken::new();
    let server = tokio::spawn(listener.with_cancellation(token.clone()).run());

    let replies = send_session(&path, DNSTAP_CONTENT_TYPE, 2).await;
    assert!(replies.starts_with(&ControlFrame::accept(DNSTAP_CONTENT_TYPE).encode()));
    assert!(replies.ends_with(&ControlFrame::finish().encode()));

    send_session(&path, DNSTAP_CONTENT_TYPE, 1).await;

    token.cancel();
    server.await.unwrap().unwrap();

    assert!(!path.exists());
    assert_eq!(consumer.consumed().len(), 3);
    assert_eq!(consumer.accepted().len(), 2);
    let snap = stats.snapshot();
    assert_eq!(snap.connections_accepted, 2);
    assert_eq!(snap.connections_closed, 2);
}

#[tokio::test]
async fn test_stale_socket_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stale.sock");
    std::fs::write(&path, b"").unwrap();

    let (listener, _) = bind(
        &path,
        RecordingConsumer::new(),
        ContentTypePolicy::Connection(None),
    );
    drop(listener);
}

#[tokio::test]
async fn test_process_scope_locks_first_negotiated_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("process.sock");
    let consumer = RecordingConsumer::new();
    let ingest = IngestConfig {
        content_type: Some(String::new()),
        content_type_scope: ContentTypeScope::Process,
        ..IngestConfig::default()
    };
    let (listener, stats) = bind(&path, consumer.clone(), ContentTypePolicy::from_config(&ingest));

    let token = CancellationToken::new();
    let server = tokio::spawn(listener.with_cancellation(token.clone()).run());

    let first = send_session(&path, "protobuf:first.Type", 0).await;
    assert!(!first.is_empty());
    let second = offer_ready(&path, "protobuf:second.Type").await;
    assert!(second.is_empty());

    token.cancel();
    server.await.unwrap().unwrap();

    assert_eq!(consumer.accepted(), vec!["protobuf:first.Type".to_string()]);
    assert_eq!(stats.snapshot().handshake_failures, 1);
}
