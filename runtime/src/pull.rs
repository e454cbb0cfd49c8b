//! Image pull with progress capture.
//!
//! The engine's progress stream is fanned out to two consumers running as
//! separate tasks: one parses each newline-delimited record and emits it as a
//! tracing event, the other accumulates the raw text. The producer drops both
//! senders when the source ends or fails, which terminates the consumers;
//! `pull` returns only after both have drained.

use std::sync::Arc;
use std::time::Duration;

use epi_core::error::{EpiError, Result};
use epi_core::log::PullProgress;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::engine::{ByteStream, ContainerEngine};

/// Buffered chunks per consumer before the producer waits.
const CHANNEL_DEPTH: usize = 64;

/// Result of an image pull: the aggregated progress text and the pull error,
/// if any. On failure `output` holds whatever was captured before the error.
#[derive(Debug)]
pub struct PullOutput {
    pub output: String,
    pub error: Option<EpiError>,
}

impl PullOutput {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Drop the partial output on failure.
    pub fn into_result(self) -> Result<String> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.output),
        }
    }
}

/// Pulls images through a container engine.
pub struct ImagePuller {
    engine: Arc<dyn ContainerEngine>,
    timeout: Option<Duration>,
}

impl ImagePuller {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self {
            engine,
            timeout: None,
        }
    }

    /// Abort the pull if the progress stream has not ended within `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pull `image`, returning the aggregated progress text and any error.
    pub async fn pull(&self, image: &str) -> PullOutput {
        tracing::debug!(image, "Pulling image");

        let source = match self.engine.pull_image(image).await {
            Ok(source) => source,
            Err(e) => {
                return PullOutput {
                    output: String::new(),
                    error: Some(e),
                }
            }
        };

        let (log_tx, log_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (text_tx, text_rx) = mpsc::channel(CHANNEL_DEPTH);

        let timeout = self.timeout;
        let producer = tokio::spawn(async move {
            let copy = fan_out(source, log_tx, text_tx);
            match timeout {
                Some(limit) => tokio::time::timeout(limit, copy)
                    .await
                    .unwrap_or_else(|_| {
                        Err(EpiError::Timeout(format!("image pull exceeded {limit:?}")))
                    }),
                None => copy.await,
            }
        });
        let logger = tokio::spawn(log_progress(image.to_string(), log_rx));
        let aggregator = tokio::spawn(aggregate(text_rx));

        let (logged, aggregated) = tokio::join!(logger, aggregator);

        let error = match producer.await {
            Ok(result) => result.err(),
            Err(e) => Some(EpiError::Execution(format!("image pull task failed: {e}"))),
        };
        match logged {
            Ok(records) => tracing::debug!(image, records, "Pull progress drained"),
            Err(e) => tracing::warn!(image, error = %e, "Pull progress logger failed"),
        }
        let output = aggregated.unwrap_or_else(|e| {
            tracing::warn!(image, error = %e, "Pull output aggregation failed");
            String::new()
        });

        if let Some(e) = &error {
            tracing::warn!(image, error = %e, "Image pull failed");
        }
        PullOutput { output, error }
    }
}

/// Copy every chunk of `source` to both senders. Both senders are dropped on
/// return, closing the consumers.
async fn fan_out(
    mut source: ByteStream,
    log_tx: mpsc::Sender<Vec<u8>>,
    text_tx: mpsc::Sender<Vec<u8>>,
) -> Result<()> {
    while let Some(item) = source.next().await {
        let chunk = item?;
        // a consumer that went away must not stall the other one
        let _ = log_tx.send(chunk.clone()).await;
        let _ = text_tx.send(chunk).await;
    }
    Ok(())
}

/// Emit one tracing event per progress record. Returns the number of records.
async fn log_progress(image: String, mut rx: mpsc::Receiver<Vec<u8>>) -> usize {
    let mut pending: Vec<u8> = Vec::new();
    let mut records = 0;

    while let Some(chunk) = rx.recv().await {
        pending.extend_from_slice(&chunk);
        while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = pending.drain(..=pos).collect();
            if emit_progress(&image, &line) {
                records += 1;
            }
        }
    }
    if emit_progress(&image, &pending) {
        records += 1;
    }
    records
}

fn emit_progress(image: &str, line: &[u8]) -> bool {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return false;
    }

    match PullProgress::parse(line) {
        Some(PullProgress {
            error: Some(error), ..
        }) => tracing::warn!(image, error = %error, "pulling"),
        Some(progress) => tracing::info!(
            image,
            id = progress.id.as_deref().unwrap_or_default(),
            status = progress.status.as_deref().unwrap_or_default(),
            progress = progress.progress.as_deref().unwrap_or_default(),
            "pulling"
        ),
        None => tracing::debug!(image, line, "pulling"),
    }
    true
}

async fn aggregate(mut rx: mpsc::Receiver<Vec<u8>>) -> String {
    let mut buf = Vec::new();
    while let Some(chunk) = rx.recv().await {
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
