//! Side channels of a run: request notifications and progress.

use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::entity::EntityKind;

/// Notified before every outgoing request.
pub trait RequestObserver: Send + Sync {
    fn on_request(&self, kind: EntityKind, url: &str);
}

/// Logs each request through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn on_request(&self, kind: EntityKind, url: &str) {
        tracing::info!(target: "insights_stream::request", node = %kind, "GET {}", url);
    }
}

/// Emitted once per completed entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub total: usize,
    pub loaded: usize,
    pub message: String,
}

impl Progress {
    pub fn new(total: usize, loaded: usize, kind: EntityKind) -> Self {
        Self {
            total,
            loaded,
            message: format!("{} {}s remaining", total.saturating_sub(loaded), kind),
        }
    }
}

/// Sending half of the progress channel. Sends after the receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Option<UnboundedSender<Progress>>,
}

impl ProgressSender {
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, progress: Progress) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(progress);
        }
    }
}

pub fn progress_channel() -> (ProgressSender, UnboundedReceiver<Progress>) {
    let (tx, rx) = unbounded_channel();
    (ProgressSender { tx: Some(tx) }, rx)
}

pub type ProgressStream = UnboundedReceiverStream<Progress>;
