use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::CompanionApi;
use crate::source::{RemoteStateSource, SourceUpdate, SyncStrategy, UpdateFeed};

/// Fetches the full state on a fixed interval. A failed tick is simply
/// retried on the next one.
pub struct PollingSource {
    api: Arc<dyn CompanionApi>,
    interval: Duration,
}

impl PollingSource {
    pub fn new(api: Arc<dyn CompanionApi>, interval: Duration) -> Self {
        Self { api, interval }
    }
}

#[async_trait]
impl RemoteStateSource for PollingSource {
    fn strategy(&self) -> SyncStrategy {
        SyncStrategy::Poll
    }

    async fn run(&self, token: String, feed: UpdateFeed) {
        info!(interval = ?self.interval, "Polling source started.");
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = feed.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let seq = feed.issue();
            let result = tokio::select! {
                biased;
                _ = feed.cancelled() => break,
                res = self.api.fetch_state(&token) => res,
            };

            let update = match result {
                Ok(state) => SourceUpdate::State(Box::new(state)),
                Err(e) if e.is_unauthorized() => {
                    warn!(seq, "State fetch rejected the token.");
                    SourceUpdate::Unauthorized
                }
                Err(e) => {
                    warn!(seq, error = %e, "State fetch failed, retrying on next tick.");
                    SourceUpdate::Failed(e.raw_message())
                }
            };
            let rejected = matches!(update, SourceUpdate::Unauthorized);

            if !feed.send(seq, update).await || rejected {
                break;
            }
        }
        debug!("Polling source finished.");
    }
}
