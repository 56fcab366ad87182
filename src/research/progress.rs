//! Progress events and the stream that carries them to the caller
//!
//! A run produces any number of [`ProgressEvent::Progress`] events followed by
//! exactly one terminal event, [`ProgressEvent::Done`] or
//! [`ProgressEvent::Failure`], after which the stream ends.
//!
//! Fractions are a rough indicator; sibling branches report interleaved and
//! the value may move backwards. Only the terminal events have fixed
//! fractions (1.0 for `Done`, 0.0 for `Failure`).

use crate::types::{AppError, ResearchReport, Result};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

/// Upper bound for non-terminal fractions
const MAX_PROGRESS: f64 = 0.99;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress { fraction: f64, status: String },
    Failure { reason: String },
    Done { answer: String, sources: Vec<String> },
}

impl ProgressEvent {
    pub fn fraction(&self) -> f64 {
        match self {
            ProgressEvent::Progress { fraction, .. } => *fraction,
            ProgressEvent::Failure { .. } => 0.0,
            ProgressEvent::Done { .. } => 1.0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Progress { .. })
    }

    /// SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::Progress { .. } => "progress",
            ProgressEvent::Failure { .. } => "failure",
            ProgressEvent::Done { .. } => "done",
        }
    }
}

/// Producer half, cloned into every branch of a run.
#[derive(Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<ProgressEvent>,
    cancel: CancellationToken,
}

impl ProgressSink {
    /// Report a status line. A vanished consumer cancels the run.
    pub async fn progress(&self, fraction: f64, status: impl Into<String>) {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, MAX_PROGRESS)
        } else {
            0.0
        };
        self.send(ProgressEvent::Progress {
            fraction,
            status: status.into(),
        })
        .await;
    }

    pub async fn failure(&self, reason: impl Into<String>) {
        self.send(ProgressEvent::Failure {
            reason: reason.into(),
        })
        .await;
    }

    pub async fn done(&self, report: ResearchReport) {
        self.send(ProgressEvent::Done {
            answer: report.answer,
            sources: report.sources,
        })
        .await;
    }

    async fn send(&self, event: ProgressEvent) {
        if self.tx.send(event).await.is_err() {
            self.cancel.cancel();
        }
    }
}

/// Consumer half of a run. Dropping it abandons the run.
pub struct ProgressStream {
    rx: mpsc::Receiver<ProgressEvent>,
    cancel: CancellationToken,
}

impl ProgressStream {
    /// Create a connected sink/stream pair sharing `cancel`.
    pub fn channel(capacity: usize, cancel: CancellationToken) -> (ProgressSink, ProgressStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            ProgressSink {
                tx,
                cancel: cancel.clone(),
            },
            ProgressStream { rx, cancel },
        )
    }

    /// Receive the next event; `None` once the run has ended.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Abandon the run without dropping the stream.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drain the stream and return the outcome.
    pub async fn into_report(mut self) -> Result<ResearchReport> {
        while let Some(event) = self.recv().await {
            match event {
                ProgressEvent::Progress { .. } => {}
                ProgressEvent::Done { answer, sources } => {
                    return Ok(ResearchReport { answer, sources });
                }
                ProgressEvent::Failure { reason } => return Err(AppError::Internal(reason)),
            }
        }
        Err(AppError::Internal(
            "Research run ended without a result".to_string(),
        ))
    }
}

impl Stream for ProgressStream {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for ProgressStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_fraction_is_clamped() {
        let (sink, mut stream) = ProgressStream::channel(4, CancellationToken::new());
        sink.progress(1.7, "overshoot").await;
        sink.progress(-0.2, "undershoot").await;
        sink.progress(f64::NAN, "nan").await;

        assert_eq!(stream.next().await.unwrap().fraction(), 0.99);
        assert_eq!(stream.next().await.unwrap().fraction(), 0.0);
        assert_eq!(stream.next().await.unwrap().fraction(), 0.0);
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels() {
        let cancel = CancellationToken::new();
        let (sink, stream) = ProgressStream::channel(1, cancel.clone());
        drop(stream);
        assert!(cancel.is_cancelled());
        sink.progress(0.5, "nobody listening").await;
    }

    #[tokio::test]
    async fn test_into_report() {
        let (sink, stream) = ProgressStream::channel(4, CancellationToken::new());
        sink.progress(0.1, "working").await;
        sink.done(ResearchReport {
            answer: "42".to_string(),
            sources: vec!["https://a.example".to_string()],
        })
        .await;
        drop(sink);

        let report = stream.into_report().await.unwrap();
        assert_eq!(report.answer, "42");
        assert_eq!(report.sources, vec!["https://a.example"]);
    }

    #[tokio::test]
    async fn test_failure_into_report_is_error() {
        let (sink, stream) = ProgressStream::channel(4, CancellationToken::new());
        sink.failure("oracle unavailable").await;
        drop(sink);

        let err = stream.into_report().await.unwrap_err();
        assert!(err.to_string().contains("oracle unavailable"));
    }

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::Done {
            answer: "a".to_string(),
            sources: vec![],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "done");
        assert_eq!(event.kind(), "done");
        assert!(event.is_terminal());
        assert_eq!(event.fraction(), 1.0);
    }
}
