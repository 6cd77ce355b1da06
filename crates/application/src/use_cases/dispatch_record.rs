use crate::ports::{Consumer, TapDecoder};
use crate::stats::IngestStats;
use bytes::Bytes;
use ferrous_tap_domain::DecodeError;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Record decoded and handed to the consumer, which wants more.
    Consumed,
    /// Consumer asked to stop receiving records on this connection.
    Stop,
    /// Frame could not be decoded and was dropped.
    Dropped(DecodeError),
}

/// Decodes one data frame and forwards the record to the consumer.
pub struct DispatchRecordUseCase {
    decoder: Arc<dyn TapDecoder>,
    consumer: Arc<dyn Consumer>,
    stats: Arc<IngestStats>,
}

impl DispatchRecordUseCase {
    pub fn new(
        decoder: Arc<dyn TapDecoder>,
        consumer: Arc<dyn Consumer>,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self {
            decoder,
            consumer,
            stats,
        }
    }

    pub fn consumer(&self) -> &Arc<dyn Consumer> {
        &self.consumer
    }

    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    pub async fn execute(&self, payload: Bytes, connection_id: u64) -> DispatchOutcome {
        let message = match self.decoder.decode(&payload) {
            Ok(message) => message,
            Err(e) => {
                let dropped = self.stats.record_dropped();
                warn!(
                    connection = connection_id,
                    error = %e,
                    dropped,
                    frame_len = payload.len(),
                    "Dropping undecodable data frame"
                );
                return DispatchOutcome::Dropped(e);
            }
        };
        self.stats.record_decoded();

        if self.consumer.consume(message).await {
            self.stats.record_consumed();
            DispatchOutcome::Consumed
        } else {
            debug!(connection = connection_id, "Consumer requested stop");
            DispatchOutcome::Stop
        }
    }
}
