//! State Synchronizer: the only writer of a session's [`PlayerSnapshot`].

use std::sync::Arc;
use tokio::sync::{mpsc, RwLockWriteGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::events::SessionEvent;
use crate::presentation;
use crate::session::{revoke, SessionShared};
use crate::source::{SourceUpdate, TaggedUpdate, UpdateFeed};
use crate::state::{ConnectionState, PlayerSnapshot};
use crate::CompanionError;

/// Background tasks of a running synchronizer.
pub(crate) struct SyncHandle {
    cancel: CancellationToken,
    source_task: JoinHandle<()>,
    apply_task: JoinHandle<()>,
}

impl SyncHandle {
    /// Signal the tasks to stop without waiting for them.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) async fn join(self) -> Result<(), CompanionError> {
        self.cancel.cancel();
        self.apply_task.await?;
        self.source_task.await?;
        Ok(())
    }
}

/// Spawn the configured source and the task applying its updates.
pub(crate) fn start(shared: &Arc<SessionShared>, token: String) -> SyncHandle {
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel::<TaggedUpdate>(shared.settings.update_buffer_capacity);
    let feed = UpdateFeed::new(tx, shared.sequence.clone(), cancel.clone());

    info!(session = %shared.id, strategy = ?shared.source.strategy(), "Starting synchronizer.");

    let source = shared.source.clone();
    let source_task = tokio::spawn(async move {
        source.run(token, feed).await;
    });

    let apply_shared = shared.clone();
    let apply_cancel = cancel.clone();
    let apply_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = apply_cancel.cancelled() => break,
                maybe = rx.recv() => match maybe {
                    Some(tagged) => apply(&apply_shared, tagged).await,
                    None => {
                        debug!("Source finished, no further updates.");
                        break;
                    }
                },
            }
        }
        trace!("Synchronizer apply task finished.");
    });

    SyncHandle {
        cancel,
        source_task,
        apply_task,
    }
}

/// Apply one source update. A snapshot is only applied if it answers the
/// latest issued request.
pub(crate) async fn apply(shared: &Arc<SessionShared>, tagged: TaggedUpdate) {
    let TaggedUpdate { seq, update } = tagged;

    if !shared.connection_state().is_authenticated() {
        debug!(seq, "Ignoring update for an unauthenticated session.");
        return;
    }

    // A rejected token is never stale.
    match update {
        SourceUpdate::State(payload) => {
            let snapshot = PlayerSnapshot::from(payload.as_ref());
            if commit(shared, seq, snapshot).await {
                shared.last_connectivity_error.lock().take();
                shared.set_connection(ConnectionState::Synced);
            }
        }
        SourceUpdate::Unauthorized => {
            shared.notify_error("UNAUTHORIZED");
            revoke(shared).await;
        }
        SourceUpdate::Interrupted(message) => {
            debug!(seq, message = %message, "Realtime channel interrupted, snapshot retained.");
            shared.set_connection(ConnectionState::Degraded(message));
        }
        SourceUpdate::Failed(message) => {
            if shared.set_connection(ConnectionState::Degraded(message.clone())) {
                report_connectivity_error(shared, &message);
            }
        }
    }
}

fn is_current(shared: &SessionShared, seq: u64) -> bool {
    let latest = shared.sequence.latest();
    if latest != seq {
        debug!(seq, latest, "Discarding stale update.");
        shared.emit(SessionEvent::StaleUpdateDiscarded { seq, latest });
        return false;
    }
    true
}

/// Replace the snapshot wholesale and render it, if `seq` is still the
/// latest issued number.
async fn commit(shared: &SessionShared, seq: u64, snapshot: PlayerSnapshot) -> bool {
    let guard = shared.snapshot.write().await;
    if !is_current(shared, seq) || !shared.connection_state().is_authenticated() {
        return false;
    }
    publish(shared, guard, snapshot);
    true
}

fn publish(
    shared: &SessionShared,
    mut guard: RwLockWriteGuard<'_, Option<PlayerSnapshot>>,
    snapshot: PlayerSnapshot,
) {
    let presentation = presentation::map(&snapshot);
    shared.controls.lock().render(&presentation);
    trace!(
        status = snapshot.status.as_str(),
        now_playing = %presentation.now_playing_text,
        "Snapshot applied."
    );
    *guard = Some(snapshot.clone());
    drop(guard);

    shared.emit(SessionEvent::SnapshotUpdated(snapshot));
}

/// Write a locally predicted snapshot. Advances the sequence so responses to
/// requests issued earlier are discarded.
pub(crate) async fn apply_local<F>(shared: &Arc<SessionShared>, change: F)
where
    F: FnOnce(&mut PlayerSnapshot),
{
    // Read, issue and write under one lock so predictions stack.
    let guard = shared.snapshot.write().await;
    let mut next = match guard.as_ref() {
        Some(current) => current.clone(),
        None => return,
    };
    if !shared.connection_state().is_authenticated() {
        return;
    }
    change(&mut next);
    let seq = shared.sequence.issue();
    trace!(seq, "Applying optimistic snapshot.");
    publish(shared, guard, next);
}

/// One manual fetch outside the source's own schedule.
pub(crate) async fn refresh(shared: &Arc<SessionShared>) -> Result<(), CompanionError> {
    let token = shared
        .token
        .read()
        .await
        .clone()
        .ok_or(CompanionError::NotAuthenticated)?;
    let seq = shared.sequence.issue();
    let update = match shared.api.fetch_state(&token).await {
        Ok(state) => SourceUpdate::State(Box::new(state)),
        Err(e) if e.is_unauthorized() => SourceUpdate::Unauthorized,
        Err(e) => {
            warn!(seq, error = %e, "Manual refresh failed.");
            SourceUpdate::Failed(e.raw_message())
        }
    };
    if shared.sync.lock().is_none() {
        debug!(seq, "Synchronizer stopped, ignoring refresh result.");
        return Ok(());
    }
    apply(shared, TaggedUpdate { seq, update }).await;
    Ok(())
}

/// Notify a connectivity error unless it repeats the last one shown.
fn report_connectivity_error(shared: &SessionShared, message: &str) {
    {
        let mut last = shared.last_connectivity_error.lock();
        if last.as_deref() == Some(message) {
            debug!(message, "Suppressing repeated connectivity error.");
            return;
        }
        *last = Some(message.to_string());
    }
    shared.notify_error(message);
    shared.emit(SessionEvent::ConnectivityError(message.to_string()));
}
