use ferrous_tap_application::use_cases::DispatchRecordUseCase;
use ferrous_tap_domain::config::IngestConfig;
use ferrous_tap_domain::{ContentType, ContentTypeCell, ContentTypeScope};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixListener;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::connection::{ConnectionHandler, ConnectionSettings};

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Where each connection gets its content type cell from.
#[derive(Debug, Clone)]
pub enum ContentTypePolicy {
    /// Every connection shares one cell; the first negotiation fixes the
    /// type for the rest of the process.
    Process(Arc<ContentTypeCell>),
    /// Each connection negotiates independently, optionally pinned to a
    /// configured type.
    Connection(Option<ContentType>),
}

impl ContentTypePolicy {
    pub fn from_config(ingest: &IngestConfig) -> Self {
        let expected = ingest.expected_content_type().map(ContentType::from);
        match ingest.content_type_scope {
            ContentTypeScope::Process => Self::Process(Arc::new(match expected {
                Some(content_type) => ContentTypeCell::preset(content_type),
                None => ContentTypeCell::new(),
            })),
            ContentTypeScope::Connection => Self::Connection(expected),
        }
    }

    pub fn cell_for_connection(&self) -> Arc<ContentTypeCell> {
        match self {
            Self::Process(cell) => cell.clone(),
            Self::Connection(Some(content_type)) => {
                Arc::new(ContentTypeCell::preset(content_type.clone()))
            }
            Self::Connection(None) => Arc::new(ContentTypeCell::new()),
        }
    }
}

/// Accepts Frame Streams senders on a Unix socket, one task per connection.
pub struct TapListener {
    listener: UnixListener,
    path: PathBuf,
    settings: ConnectionSettings,
    dispatch: Arc<DispatchRecordUseCase>,
    content_types: ContentTypePolicy,
    shutdown: CancellationToken,
}

impl TapListener {
    /// Binds `path`, first removing a leftover socket file when
    /// `remove_stale` is set. Must be called inside a Tokio runtime.
    pub fn bind(
        path: impl AsRef<Path>,
        remove_stale: bool,
        settings: ConnectionSettings,
        dispatch: Arc<DispatchRecordUseCase>,
        content_types: ContentTypePolicy,
    ) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if remove_stale && path.exists() {
            info!(path = %path.display(), "Removing stale socket file");
            std::fs::remove_file(&path)?;
        }

        let listener = UnixListener::bind(&path)?;
        info!(path = %path.display(), "Listening for dnstap senders");

        Ok(Self {
            listener,
            path,
            settings,
            dispatch,
            content_types,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn local_path(&self) -> &Path {
        &self.path
    }

    /// Accepts connections until cancelled, then drains them and removes the
    /// socket file.
    pub async fn run(self) -> io::Result<()> {
        let mut connections: JoinSet<()> = JoinSet::new();
        let mut next_id: u64 = 0;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        next_id += 1;
                        let handler = ConnectionHandler::new(
                            next_id,
                            self.settings.clone(),
                            self.dispatch.clone(),
                            self.content_types.cell_for_connection(),
                        )
                        .with_cancellation(self.shutdown.child_token());
                        connections.spawn(async move {
                            // Outcome is logged by the handler.
                            let _ = handler.run(stream).await;
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
                Some(result) = connections.join_next(), if !connections.is_empty() => {
                    report_connection(result);
                }
            }
        }

        info!(
            open_connections = connections.len(),
            "Listener stopping, draining connections"
        );

        // Each connection spends up to one grace period on its own in-flight
        // records before it closes.
        let wait = self.settings.shutdown_grace * 2;
        let drained = tokio::time::timeout(wait, async {
            while let Some(result) = connections.join_next().await {
                report_connection(result);
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = connections.len(),
                "Connections still open after grace period, aborting"
            );
            connections.shutdown().await;
        }

        let TapListener { listener, path, .. } = self;
        drop(listener);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove socket file"),
        }

        let stats = self.dispatch.stats().snapshot();
        info!(
            connections = stats.connections_accepted,
            frames = stats.frames_received,
            consumed = stats.records_consumed,
            dropped = stats.records_dropped,
            handshake_failures = stats.handshake_failures,
            "Listener stopped"
        );
        Ok(())
    }
}

fn report_connection(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!(error = %e, "Connection task panicked");
        }
    }
}
