//! Pure mapping from a [`PlayerSnapshot`] to what the status bar shows.

use crate::state::{LikeStatus, PlayerSnapshot, RepeatMode};

/// Commands registered with the host editor.
pub mod host_commands {
    pub const PLAY_PAUSE: &str = "ytMusic.playPause";
    pub const SKIP: &str = "ytMusic.skip";
    pub const REWIND: &str = "ytMusic.rewind";
    pub const CYCLE_REPEAT: &str = "ytMusic.cycleRepeat";
    pub const THUMBS_UP: &str = "ytMusic.thumbsUp";
    pub const THUMBS_DOWN: &str = "ytMusic.thumbsDown";
    pub const AUTH: &str = "ytMusic.auth";
    pub const RESTART: &str = "ytMusic.restart";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlId {
    Rewind,
    PlayPause,
    Skip,
    CycleRepeat,
    ThumbsDown,
    ThumbsUp,
    Auth,
}

impl ControlId {
    /// Player controls in status bar order.
    pub const PLAYER: [ControlId; 6] = [
        ControlId::Rewind,
        ControlId::PlayPause,
        ControlId::Skip,
        ControlId::CycleRepeat,
        ControlId::ThumbsDown,
        ControlId::ThumbsUp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ControlId::Rewind => "rewind",
            ControlId::PlayPause => "playPause",
            ControlId::Skip => "skip",
            ControlId::CycleRepeat => "cycleRepeat",
            ControlId::ThumbsDown => "thumbsDown",
            ControlId::ThumbsUp => "thumbsUp",
            ControlId::Auth => "auth",
        }
    }

    /// Static description of the control.
    pub fn spec(self) -> ControlSpec {
        use host_commands::*;
        let (tooltip, command, kind) = match self {
            ControlId::Rewind => (
                "Previous Song",
                REWIND,
                ControlKind::Static {
                    text: "$(chevron-left)",
                },
            ),
            ControlId::PlayPause => (
                "Play / Pause",
                PLAY_PAUSE,
                ControlKind::Toggle {
                    off: "$(triangle-right)",
                    on: "$(primitive-square)",
                },
            ),
            ControlId::Skip => (
                "Next Song",
                SKIP,
                ControlKind::Static {
                    text: "$(chevron-right)",
                },
            ),
            ControlId::CycleRepeat => (REPEAT_NONE.tooltip, CYCLE_REPEAT, ControlKind::Repeat),
            ControlId::ThumbsDown => (
                "Thumbs Down",
                THUMBS_DOWN,
                ControlKind::Toggle {
                    off: "$(mui-thumbs-down)",
                    on: "$(mui-thumbs-down-solid)",
                },
            ),
            ControlId::ThumbsUp => (
                "Thumbs Up",
                THUMBS_UP,
                ControlKind::Toggle {
                    off: "$(mui-thumbs-up)",
                    on: "$(mui-thumbs-up-solid)",
                },
            ),
            ControlId::Auth => (
                "Authenticate with YouTube Music Desktop Player",
                AUTH,
                ControlKind::Static { text: "Authenticate YTMDP" },
            ),
        };
        ControlSpec {
            id: self,
            tooltip,
            command,
            kind,
        }
    }
}

/// How a control's text is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Static { text: &'static str },
    /// Text chosen by a boolean signal.
    Toggle { off: &'static str, on: &'static str },
    /// Tri-state repeat display.
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSpec {
    pub id: ControlId,
    pub tooltip: &'static str,
    pub command: &'static str,
    pub kind: ControlKind,
}

impl ControlSpec {
    pub fn initial_signal(&self) -> ButtonSignal {
        let (text, color) = match self.kind {
            ControlKind::Static { text } => (text, None),
            ControlKind::Toggle { off, .. } => (off, None),
            ControlKind::Repeat => (REPEAT_NONE.text, Some(REPEAT_NONE.color)),
        };
        ButtonSignal {
            text: text.to_string(),
            tooltip: self.tooltip.to_string(),
            color: color.map(ToString::to_string),
            visible: true,
        }
    }
}

/// Derived presentation state of one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSignal {
    pub text: String,
    pub tooltip: String,
    pub color: Option<String>,
    pub visible: bool,
}

impl ButtonSignal {
    pub fn apply(&mut self, update: &SignalUpdate) {
        self.text = update.text.to_string();
        if let Some(tooltip) = update.tooltip {
            self.tooltip = tooltip.to_string();
        }
        if let Some(color) = update.color {
            self.color = Some(color.to_string());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatDisplay {
    pub text: &'static str,
    pub color: &'static str,
    pub tooltip: &'static str,
}

const REPEAT_NONE: RepeatDisplay = RepeatDisplay {
    text: "$(sync)",
    color: "darkGrey",
    tooltip: "Not Repeating",
};

pub fn repeat_display(mode: RepeatMode) -> Option<RepeatDisplay> {
    match mode {
        RepeatMode::Unknown => None,
        RepeatMode::None => Some(REPEAT_NONE),
        RepeatMode::Playlist => Some(RepeatDisplay {
            text: "$(sync)",
            color: "white",
            tooltip: "Repeating Playlist",
        }),
        RepeatMode::Song => Some(RepeatDisplay {
            text: "$(issue-reopened)",
            color: "white",
            tooltip: "Repeating Song",
        }),
    }
}

/// A change to apply to one control's signal. `None` fields are left as
/// they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalUpdate {
    pub control: ControlId,
    pub text: &'static str,
    pub tooltip: Option<&'static str>,
    pub color: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub now_playing_text: String,
    pub play_pause: bool,
    pub thumbs_up: bool,
    pub thumbs_down: bool,
    /// `None` keeps the previous repeat display.
    pub repeat: Option<RepeatDisplay>,
}

impl Presentation {
    /// Boolean signal driving a toggle control.
    pub fn toggle_state(&self, control: ControlId) -> Option<bool> {
        match control {
            ControlId::PlayPause => Some(self.play_pause),
            ControlId::ThumbsUp => Some(self.thumbs_up),
            ControlId::ThumbsDown => Some(self.thumbs_down),
            _ => None,
        }
    }

    /// Resolve the signals through the control table.
    pub fn updates(&self) -> Vec<SignalUpdate> {
        ControlId::PLAYER
            .iter()
            .filter_map(|&control| match control.spec().kind {
                ControlKind::Static { .. } => None,
                ControlKind::Toggle { off, on } => {
                    let active = self.toggle_state(control)?;
                    Some(SignalUpdate {
                        control,
                        text: if active { on } else { off },
                        tooltip: None,
                        color: None,
                    })
                }
                ControlKind::Repeat => self.repeat.map(|display| SignalUpdate {
                    control,
                    text: display.text,
                    tooltip: Some(display.tooltip),
                    color: Some(display.color),
                }),
            })
            .collect()
    }
}

/// `"{title} - {author}"`, or empty without a titled track.
pub fn now_playing_text(snapshot: &PlayerSnapshot) -> String {
    match snapshot.track.as_ref() {
        Some(track) => match track.title.as_deref() {
            Some(title) => format!("{} - {}", title, track.author),
            None => String::new(),
        },
        None => String::new(),
    }
}

pub fn map(snapshot: &PlayerSnapshot) -> Presentation {
    Presentation {
        now_playing_text: now_playing_text(snapshot),
        play_pause: snapshot.status.is_active(),
        thumbs_up: snapshot.like == LikeStatus::Liked,
        thumbs_down: snapshot.like == LikeStatus::Disliked,
        repeat: repeat_display(snapshot.repeat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{PlaybackStatus, Track};

    fn snapshot_with(title: Option<&str>, author: &str) -> PlayerSnapshot {
        PlayerSnapshot {
            track: Some(Track {
                title: title.map(ToString::to_string),
                author: author.to_string(),
                ..Track::default()
            }),
            ..PlayerSnapshot::default()
        }
    }

    #[test]
    fn test_now_playing_text() {
        assert_eq!(now_playing_text(&snapshot_with(Some("Song A"), "Artist")), "Song A - Artist");
        assert_eq!(now_playing_text(&snapshot_with(None, "Artist")), "");
        assert_eq!(now_playing_text(&PlayerSnapshot::default()), "");
    }

    #[test]
    fn test_play_pause_signal() {
        for (status, expected) in [
            (PlaybackStatus::Playing, true),
            (PlaybackStatus::Buffering, true),
            (PlaybackStatus::Paused, false),
            (PlaybackStatus::Unknown, false),
        ] {
            let snapshot = PlayerSnapshot {
                status,
                ..PlayerSnapshot::default()
            };
            assert_eq!(map(&snapshot).play_pause, expected, "status {:?}", status);
        }
    }

    #[test]
    fn test_unknown_repeat_leaves_display_alone() {
        let presentation = map(&PlayerSnapshot::default());
        assert!(presentation.repeat.is_none());
        assert!(presentation
            .updates()
            .iter()
            .all(|u| u.control != ControlId::CycleRepeat));
    }

    #[test]
    fn test_static_controls_never_updated() {
        let snapshot = PlayerSnapshot {
            repeat: RepeatMode::Song,
            like: LikeStatus::Liked,
            ..PlayerSnapshot::default()
        };
        let updates = map(&snapshot).updates();
        assert!(updates.iter().all(|u| !matches!(u.control, ControlId::Rewind | ControlId::Skip)));
        assert_eq!(updates.len(), 4);
    }
}
