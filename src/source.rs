use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::trace;

use crate::models::StatePayload;

/// How remote state reaches the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStrategy {
    /// Fixed-interval `GET /state`.
    #[default]
    Poll,
    /// Socket.IO `state-update` subscription.
    Push,
}

/// Outcome reported by a [`RemoteStateSource`].
#[derive(Debug, Clone)]
pub enum SourceUpdate {
    /// A full state payload.
    State(Box<StatePayload>),
    /// The companion server rejected the token. Sources stop after this.
    Unauthorized,
    /// Connection lost, the source is retrying on its own.
    Interrupted(String),
    /// Connectivity failure the user should hear about.
    Failed(String),
}

/// An update stamped with the sequence number issued when its request was
/// made.
#[derive(Debug, Clone)]
pub struct TaggedUpdate {
    pub seq: u64,
    pub update: SourceUpdate,
}

/// Monotonic request counter. Only a result carrying the latest issued
/// number is applied.
#[derive(Debug, Clone, Default)]
pub struct RequestSequence(Arc<AtomicU64>);

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_latest(&self, seq: u64) -> bool {
        self.latest() == seq
    }
}

/// Handle a source uses to report updates to its synchronizer.
#[derive(Debug, Clone)]
pub struct UpdateFeed {
    sender: mpsc::Sender<TaggedUpdate>,
    sequence: RequestSequence,
    cancel: CancellationToken,
}

impl UpdateFeed {
    pub fn new(
        sender: mpsc::Sender<TaggedUpdate>,
        sequence: RequestSequence,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sender,
            sequence,
            cancel,
        }
    }

    /// Stamp a request about to be made.
    pub fn issue(&self) -> u64 {
        self.sequence.issue()
    }

    /// Deliver an update. Returns `false` once the synchronizer is gone or
    /// stopping, which tells the source to wind down.
    pub async fn send(&self, seq: u64, update: SourceUpdate) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        trace!(seq, "Forwarding source update.");
        self.sender.send(TaggedUpdate { seq, update }).await.is_ok()
    }

    /// Issue and deliver in one step, for updates that are not answers to
    /// a request (push events).
    pub async fn push(&self, update: SourceUpdate) -> bool {
        let seq = self.issue();
        self.send(seq, update).await
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Something that keeps remote player state flowing into a session.
#[async_trait]
pub trait RemoteStateSource: Send + Sync {
    fn strategy(&self) -> SyncStrategy;

    /// Runs until the feed is cancelled, the source gives up, or the token
    /// is rejected.
    async fn run(&self, token: String, feed: UpdateFeed);
}
