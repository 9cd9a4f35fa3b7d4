use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::commands::PlayerCommand;
use crate::events::SessionEvent;
use crate::presentation::ControlId;
use crate::session::{revoke, SessionShared};
use crate::state::PlayerSnapshot;
use crate::sync;
use crate::CompanionError;

/// Turns control activations into player commands. Dispatches for the same
/// control run one at a time; different controls may interleave.
pub(crate) struct Dispatcher {
    lanes: BTreeMap<ControlId, Mutex<()>>,
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        Self {
            lanes: ControlId::PLAYER
                .iter()
                .map(|id| (*id, Mutex::new(())))
                .collect(),
        }
    }

    pub(crate) async fn dispatch(
        &self,
        shared: &Arc<SessionShared>,
        control: ControlId,
    ) -> Result<(), CompanionError> {
        let Some(lane) = self.lanes.get(&control) else {
            debug!(control = control.as_str(), "Control has no player command.");
            return Ok(());
        };
        let _lane = lane.lock().await;

        let token = shared
            .token
            .read()
            .await
            .clone()
            .ok_or(CompanionError::NotAuthenticated)?;

        // Read inside the lane so a second cycle sees the first one's result.
        let current = shared.snapshot.read().await.clone();
        let Some(command) = command_for(control, current.as_ref()) else {
            return Ok(());
        };

        if has_prediction(&command) {
            sync::apply_local(shared, |snapshot| predict(&command, snapshot)).await;
        }

        debug!(command = command.name(), "Sending command.");
        match shared.api.send_command(&token, &command).await {
            Ok(()) => {
                shared.emit(SessionEvent::CommandSent(command));
                Ok(())
            }
            Err(e) => {
                let message = e.raw_message();
                warn!(command = command.name(), error = %e, "Command failed.");
                shared.notify_error(&message);
                shared.emit(SessionEvent::CommandFailed { command, message });
                if e.is_unauthorized() {
                    revoke(shared).await;
                }
                Err(e)
            }
        }
    }
}

/// Command a control issues given the current snapshot.
pub(crate) fn command_for(
    control: ControlId,
    snapshot: Option<&PlayerSnapshot>,
) -> Option<PlayerCommand> {
    let command = match control {
        ControlId::PlayPause => PlayerCommand::PlayPause,
        ControlId::Skip => PlayerCommand::Next,
        ControlId::Rewind => PlayerCommand::Previous,
        ControlId::CycleRepeat => {
            let repeat = snapshot.map(|s| s.repeat).unwrap_or_default();
            PlayerCommand::RepeatMode(repeat.next())
        }
        ControlId::ThumbsUp => PlayerCommand::ToggleLike,
        ControlId::ThumbsDown => PlayerCommand::ToggleDislike,
        ControlId::Auth => return None,
    };
    Some(command)
}

fn has_prediction(command: &PlayerCommand) -> bool {
    !matches!(command, PlayerCommand::Next | PlayerCommand::Previous)
}

/// Local effect expected from a command once the player executes it.
pub(crate) fn predict(command: &PlayerCommand, snapshot: &mut PlayerSnapshot) {
    match command {
        PlayerCommand::PlayPause => snapshot.status = snapshot.status.toggled(),
        PlayerCommand::RepeatMode(mode) => snapshot.repeat = *mode,
        PlayerCommand::ToggleLike => snapshot.like = snapshot.like.after_toggle_like(),
        PlayerCommand::ToggleDislike => snapshot.like = snapshot.like.after_toggle_dislike(),
        PlayerCommand::Next | PlayerCommand::Previous => {}
    }
}
