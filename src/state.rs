use crate::models::StatePayload;

/// Unified representation of the player's transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Unknown,
    /// Paused (0)
    Paused,
    /// Playing (1)
    Playing,
    /// Buffering (2)
    Buffering,
}

impl PlaybackStatus {
    /// Convert from the integer `trackState` to enum value
    pub fn from_i32(state: i32) -> Self {
        match state {
            0 => PlaybackStatus::Paused,
            1 => PlaybackStatus::Playing,
            2 => PlaybackStatus::Buffering,
            _ => PlaybackStatus::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackStatus::Unknown => "UNKNOWN",
            PlaybackStatus::Paused => "PAUSED",
            PlaybackStatus::Playing => "PLAYING",
            PlaybackStatus::Buffering => "BUFFERING",
        }
    }

    /// Playing or about to play.
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackStatus::Playing | PlaybackStatus::Buffering)
    }

    /// Status expected after a play/pause toggle.
    pub fn toggled(self) -> Self {
        if self.is_active() {
            PlaybackStatus::Paused
        } else {
            PlaybackStatus::Playing
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Unknown,
    None,
    Playlist,
    Song,
}

impl RepeatMode {
    pub fn from_i32(mode: i32) -> Self {
        match mode {
            0 => RepeatMode::None,
            1 => RepeatMode::Playlist,
            2 => RepeatMode::Song,
            _ => RepeatMode::Unknown,
        }
    }

    /// Wire value; `Unknown` has none.
    pub fn to_i32(self) -> Option<i32> {
        match self {
            RepeatMode::Unknown => None,
            RepeatMode::None => Some(0),
            RepeatMode::Playlist => Some(1),
            RepeatMode::Song => Some(2),
        }
    }

    /// Next mode in the `None -> Playlist -> Song -> None` cycle.
    /// `Unknown` cycles as if it were `None`.
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Unknown | RepeatMode::None => RepeatMode::Playlist,
            RepeatMode::Playlist => RepeatMode::Song,
            RepeatMode::Song => RepeatMode::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LikeStatus {
    #[default]
    Unknown,
    Disliked,
    Neutral,
    Liked,
}

impl LikeStatus {
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => LikeStatus::Disliked,
            1 => LikeStatus::Neutral,
            2 => LikeStatus::Liked,
            _ => LikeStatus::Unknown,
        }
    }

    pub fn after_toggle_like(self) -> Self {
        match self {
            LikeStatus::Liked => LikeStatus::Neutral,
            _ => LikeStatus::Liked,
        }
    }

    pub fn after_toggle_dislike(self) -> Self {
        match self {
            LikeStatus::Disliked => LikeStatus::Neutral,
            _ => LikeStatus::Disliked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    pub title: Option<String>,
    pub author: String,
    pub album: Option<String>,
    pub art_url: Option<String>,
    pub duration_seconds: u64,
    pub video_id: Option<String>,
}

/// The latest known remote player state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerSnapshot {
    pub track: Option<Track>,
    pub status: PlaybackStatus,
    pub repeat: RepeatMode,
    pub like: LikeStatus,
    pub progress_seconds: f64,
    pub volume: u32,
    pub ad_playing: bool,
}

impl From<&StatePayload> for PlayerSnapshot {
    fn from(payload: &StatePayload) -> Self {
        let track = payload.video.as_ref().map(|video| Track {
            title: video.title.clone().filter(|t| !t.is_empty()),
            author: video.author.clone(),
            album: video.album.clone(),
            art_url: video.art_url().map(ToString::to_string),
            duration_seconds: video.duration_seconds,
            video_id: video.id.clone(),
        });
        let repeat = payload
            .player
            .queue
            .as_ref()
            .map_or(RepeatMode::Unknown, |q| RepeatMode::from_i32(q.repeat_mode));
        let like = payload
            .video
            .as_ref()
            .map_or(LikeStatus::Unknown, |v| LikeStatus::from_i32(v.like_status));

        Self {
            track,
            status: PlaybackStatus::from_i32(payload.player.track_state),
            repeat,
            like,
            progress_seconds: payload.player.video_progress,
            volume: payload.player.volume,
            ad_playing: payload.player.ad_playing,
        }
    }
}

/// Lifecycle of a session's link to the companion server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unauthenticated,
    Connecting,
    Synced,
    /// Last good snapshot retained despite a transport failure.
    Degraded(String),
}

impl ConnectionState {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, ConnectionState::Unauthenticated)
    }
}
