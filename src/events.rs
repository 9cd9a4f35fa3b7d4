use crate::commands::PlayerCommand;
use crate::state::{ConnectionState, PlayerSnapshot};

// Event types broadcast by a session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ConnectionChanged(ConnectionState),
    SnapshotUpdated(PlayerSnapshot),
    StaleUpdateDiscarded { seq: u64, latest: u64 },
    /// A connectivity error was shown to the user.
    ConnectivityError(String),
    CommandSent(PlayerCommand),
    CommandFailed { command: PlayerCommand, message: String },
    Authorized,
    AuthorizationRevoked,
}

impl SessionEvent {
    // Get the name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::ConnectionChanged(_) => "connectionChanged",
            SessionEvent::SnapshotUpdated(_) => "snapshotUpdated",
            SessionEvent::StaleUpdateDiscarded { .. } => "staleUpdateDiscarded",
            SessionEvent::ConnectivityError(_) => "connectivityError",
            SessionEvent::CommandSent(_) => "commandSent",
            SessionEvent::CommandFailed { .. } => "commandFailed",
            SessionEvent::Authorized => "authorized",
            SessionEvent::AuthorizationRevoked => "authorizationRevoked",
        }
    }

    /// If this event carries a snapshot, returns it
    pub fn snapshot(&self) -> Option<&PlayerSnapshot> {
        match self {
            SessionEvent::SnapshotUpdated(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}
