//! Submission queue between the HTTP intake and the worker pool
//!
//! Unbounded FIFO: publishing never waits and nothing is dropped while the
//! consumer is alive.

use enroll_common::{EnrollError, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::models::EnrollmentRequest;

/// Create a connected publisher/consumer pair
pub fn channel() -> (EnrollmentPublisher, EnrollmentConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EnrollmentPublisher { tx }, EnrollmentConsumer { rx })
}

#[derive(Debug, Clone)]
pub struct EnrollmentPublisher {
    tx: mpsc::UnboundedSender<EnrollmentRequest>,
}

impl EnrollmentPublisher {
    /// Enqueue a request; success means accepted, not processed
    pub fn publish(&self, request: EnrollmentRequest) -> Result<()> {
        self.tx
            .send(request)
            .map_err(|_| EnrollError::Unexpected("Enrollment queue is closed".to_string()))
    }
}

#[derive(Debug)]
pub struct EnrollmentConsumer {
    rx: mpsc::UnboundedReceiver<EnrollmentRequest>,
}

impl EnrollmentConsumer {
    /// Next request in submission order
    ///
    /// Returns `None` once `shutdown` fires or every publisher is gone.
    pub async fn next(&mut self, shutdown: &CancellationToken) -> Option<EnrollmentRequest> {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            request = self.rx.recv() => request,
        }
    }

    /// Requests waiting to be picked up
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
