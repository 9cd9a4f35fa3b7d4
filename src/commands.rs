use crate::state::RepeatMode;

// Player commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    PlayPause,
    Next,
    Previous,
    RepeatMode(RepeatMode),
    ToggleLike,
    ToggleDislike,
}

impl PlayerCommand {
    /// Name of the command on the wire
    pub fn name(&self) -> &'static str {
        match self {
            PlayerCommand::PlayPause => "playPause",
            PlayerCommand::Next => "next",
            PlayerCommand::Previous => "previous",
            PlayerCommand::RepeatMode(_) => "repeatMode",
            PlayerCommand::ToggleLike => "toggleLike",
            PlayerCommand::ToggleDislike => "toggleDislike",
        }
    }

    /// Optional `data` field of the command body
    pub fn data(&self) -> Option<serde_json::Value> {
        match self {
            PlayerCommand::RepeatMode(mode) => mode.to_i32().map(serde_json::Value::from),
            _ => None,
        }
    }
}
