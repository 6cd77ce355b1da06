use bytes::Bytes;
use ferrous_tap_application::use_cases::{DispatchOutcome, DispatchRecordUseCase};
use ferrous_tap_domain::DispatchMode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

enum Inner {
    /// One worker drains a bounded queue, so records reach the consumer in
    /// receipt order.
    Ordered {
        queue: mpsc::Sender<Bytes>,
        worker: JoinHandle<()>,
    },
    /// Up to `max_in_flight` records are decoded and consumed at once;
    /// completion order is not preserved.
    Concurrent {
        permits: Arc<Semaphore>,
        tasks: JoinSet<()>,
    },
}

/// Per-connection decode and delivery of data frames.
///
/// Both modes are bounded: once the bound is reached [`submit`](Self::submit)
/// waits, which stops the connection from reading further frames.
pub struct Dispatcher {
    connection_id: u64,
    use_case: Arc<DispatchRecordUseCase>,
    consumer_stop: CancellationToken,
    inner: Inner,
}

impl Dispatcher {
    /// `consumer_stop` is cancelled by a worker when the consumer asks to
    /// stop; cancelling it from outside makes pending submits give up.
    pub fn new(
        mode: DispatchMode,
        max_in_flight: usize,
        use_case: Arc<DispatchRecordUseCase>,
        connection_id: u64,
        consumer_stop: CancellationToken,
    ) -> Self {
        let max_in_flight = max_in_flight.max(1);
        let inner = match mode {
            DispatchMode::Ordered => {
                let (queue, mut rx) = mpsc::channel::<Bytes>(max_in_flight);
                let worker_use_case = use_case.clone();
                let stop = consumer_stop.clone();
                let worker = tokio::spawn(async move {
                    while let Some(payload) = rx.recv().await {
                        let outcome = worker_use_case.execute(payload, connection_id).await;
                        if matches!(outcome, DispatchOutcome::Stop) {
                            stop.cancel();
                            break;
                        }
                    }
                });
                Inner::Ordered { queue, worker }
            }
            DispatchMode::Concurrent => Inner::Concurrent {
                permits: Arc::new(Semaphore::new(max_in_flight)),
                tasks: JoinSet::new(),
            },
        };

        Self {
            connection_id,
            use_case,
            consumer_stop,
            inner,
        }
    }

    /// Hands a data frame payload to the workers.
    ///
    /// Returns `false` once the consumer has stopped or the connection is
    /// being torn down.
    pub async fn submit(&mut self, payload: Bytes) -> bool {
        if self.consumer_stop.is_cancelled() {
            return false;
        }

        match &mut self.inner {
            Inner::Ordered { queue, .. } => tokio::select! {
                biased;
                _ = self.consumer_stop.cancelled() => false,
                sent = queue.send(payload) => sent.is_ok(),
            },
            Inner::Concurrent { permits, tasks } => {
                while let Some(result) = tasks.try_join_next() {
                    report_task(self.connection_id, result);
                }

                let permit = tokio::select! {
                    biased;
                    _ = self.consumer_stop.cancelled() => return false,
                    permit = permits.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return false,
                    },
                };

                let use_case = self.use_case.clone();
                let stop = self.consumer_stop.clone();
                let connection_id = self.connection_id;
                tasks.spawn(async move {
                    let _permit = permit;
                    let outcome = use_case.execute(payload, connection_id).await;
                    if matches!(outcome, DispatchOutcome::Stop) {
                        stop.cancel();
                    }
                });
                true
            }
        }
    }

    /// Lets in-flight records finish within `grace`, then aborts the rest.
    pub async fn shutdown(self, grace: Duration) {
        let connection_id = self.connection_id;
        match self.inner {
            Inner::Ordered { queue, mut worker } => {
                drop(queue);
                match tokio::time::timeout(grace, &mut worker).await {
                    Ok(result) => report_task(connection_id, result),
                    Err(_) => {
                        warn!(
                            connection = connection_id,
                            grace_ms = grace.as_millis() as u64,
                            "Dispatch worker still busy after grace period, aborting"
                        );
                        worker.abort();
                    }
                }
            }
            Inner::Concurrent { mut tasks, .. } => {
                let drained = tokio::time::timeout(grace, async {
                    while let Some(result) = tasks.join_next().await {
                        report_task(connection_id, result);
                    }
                })
                .await;

                if drained.is_err() {
                    warn!(
                        connection = connection_id,
                        in_flight = tasks.len(),
                        grace_ms = grace.as_millis() as u64,
                        "Dispatch tasks still running after grace period, aborting"
                    );
                    tasks.shutdown().await;
                }
            }
        }
    }
}

fn report_task(connection_id: u64, result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!(connection = connection_id, error = %e, "Dispatch task panicked");
        }
    }
}
