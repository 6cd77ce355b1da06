use ferrous_tap_application::use_cases::DispatchRecordUseCase;
use ferrous_tap_domain::frame::LENGTH_PREFIX_SIZE;
use ferrous_tap_domain::{Config, ConnectionError, ContentTypeCell, DispatchMode, FrameKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::dispatcher::Dispatcher;
use crate::fstrm::{FrameReassembler, HandshakeAction, HandshakeNegotiator};

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub recv_size: usize,
    pub max_frame_size: u32,
    pub dispatch_mode: DispatchMode,
    pub max_in_flight: usize,
    pub shutdown_grace: Duration,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            recv_size: config.server.recv_size,
            max_frame_size: config.server.max_frame_size,
            dispatch_mode: config.ingest.dispatch_mode,
            max_in_flight: config.ingest.max_in_flight,
            shutdown_grace: Duration::from_millis(config.ingest.shutdown_grace_ms),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Why a connection ended without a protocol error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// Sender sent STOP and was answered with FINISH.
    PeerStopped,
    /// Sender closed the stream.
    PeerClosed,
    /// `Consumer::accepted` returned false.
    ConsumerRejected,
    /// `Consumer::consume` returned false.
    ConsumerStopped,
    Shutdown,
}

struct ConnectionState {
    reassembler: FrameReassembler,
    negotiator: HandshakeNegotiator,
    dispatcher: Dispatcher,
    frames: u64,
}

/// Serves one Frame Streams connection: reassembles frames, runs the
/// handshake and hands data frames to the dispatcher.
pub struct ConnectionHandler {
    id: u64,
    settings: ConnectionSettings,
    dispatch: Arc<DispatchRecordUseCase>,
    content_types: Arc<ContentTypeCell>,
    shutdown: CancellationToken,
}

impl ConnectionHandler {
    pub fn new(
        id: u64,
        settings: ConnectionSettings,
        dispatch: Arc<DispatchRecordUseCase>,
        content_types: Arc<ContentTypeCell>,
    ) -> Self {
        Self {
            id,
            settings,
            dispatch,
            content_types,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn run<S>(self, mut stream: S) -> Result<ConnectionEnd, ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let stats = self.dispatch.stats().clone();
        let consumer = self.dispatch.consumer().clone();
        stats.record_connection_accepted();
        debug!(connection = self.id, "Connection accepted");

        let consumer_stop = self.shutdown.child_token();
        let mut state = ConnectionState {
            reassembler: FrameReassembler::with_max_frame_size(self.settings.max_frame_size),
            negotiator: HandshakeNegotiator::new(self.content_types.clone()),
            dispatcher: Dispatcher::new(
                self.settings.dispatch_mode,
                self.settings.max_in_flight,
                self.dispatch.clone(),
                self.id,
                consumer_stop.clone(),
            ),
            frames: 0,
        };

        let result = self.drive(&mut stream, &mut state, &consumer_stop).await;

        let ConnectionState {
            mut reassembler,
            negotiator,
            dispatcher,
            frames,
        } = state;
        let content_type = negotiator
            .negotiated()
            .map(ToString::to_string)
            .unwrap_or_default();
        dispatcher.shutdown(self.settings.shutdown_grace).await;
        if let Err(e) = stream.shutdown().await {
            debug!(connection = self.id, error = %e, "Stream shutdown failed");
        }
        let remaining = reassembler.take_remaining();
        let leftover = remaining.len();
        consumer.finished(remaining).await;
        stats.record_connection_closed();

        match &result {
            Ok(end) => info!(
                connection = self.id,
                end = ?end,
                content_type = %content_type,
                frames,
                leftover_bytes = leftover,
                "Connection closed"
            ),
            Err(ConnectionError::Handshake(e)) => {
                stats.record_handshake_failure();
                warn!(
                    connection = self.id,
                    error = %e,
                    phase = negotiator.phase().as_str(),
                    frames,
                    "Handshake failed, closing connection"
                );
            }
            Err(e) => warn!(connection = self.id, error = %e, frames, "Connection failed"),
        }

        result
    }

    async fn drive<S>(
        &self,
        stream: &mut S,
        state: &mut ConnectionState,
        consumer_stop: &CancellationToken,
    ) -> Result<ConnectionEnd, ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let stats = self.dispatch.stats();
        let recv_size = self.settings.recv_size.max(1);
        let max_read =
            (self.settings.max_frame_size as usize + 2 * LENGTH_PREFIX_SIZE).max(recv_size);
        let mut read_buf = vec![0u8; recv_size];

        loop {
            while let Some(frame) = state.reassembler.try_extract()? {
                state.frames += 1;
                stats.record_frame();

                match frame.kind {
                    FrameKind::Control => match state.negotiator.on_control(&frame.payload)? {
                        HandshakeAction::Reply(reply) => {
                            stream.write_all(&reply.encode()).await?;
                            stream.flush().await?;
                        }
                        HandshakeAction::Started(content_type) => {
                            info!(
                                connection = self.id,
                                content_type = %content_type,
                                "Tap stream started"
                            );
                            if !self.dispatch.consumer().accepted(&content_type).await {
                                return Ok(ConnectionEnd::ConsumerRejected);
                            }
                        }
                        HandshakeAction::Stopped(finish) => {
                            let written = async {
                                stream.write_all(&finish.encode()).await?;
                                stream.flush().await
                            }
                            .await;
                            if let Err(e) = written {
                                debug!(connection = self.id, error = %e, "Could not send FINISH");
                            }
                            return Ok(ConnectionEnd::PeerStopped);
                        }
                    },
                    FrameKind::Data => {
                        state.negotiator.check_data()?;
                        if !state.dispatcher.submit(frame.payload).await {
                            return Ok(self.stop_reason());
                        }
                    }
                }
            }

            // A frame larger than recv_size is read in as few calls as possible.
            let wanted = state.reassembler.bytes_needed().clamp(recv_size, max_read);
            if read_buf.len() < wanted {
                trace!(connection = self.id, wanted, "Growing read buffer for pending frame");
                read_buf.resize(wanted, 0);
            }

            let read = tokio::select! {
                biased;
                _ = consumer_stop.cancelled() => return Ok(self.stop_reason()),
                read = stream.read(&mut read_buf[..wanted]) => read?,
            };
            if read == 0 {
                return Ok(ConnectionEnd::PeerClosed);
            }
            state.reassembler.append(&read_buf[..read]);
        }
    }

    fn stop_reason(&self) -> ConnectionEnd {
        if self.shutdown.is_cancelled() {
            ConnectionEnd::Shutdown
        } else {
            ConnectionEnd::ConsumerStopped
        }
    }
}
