use serde::{Deserialize, Serialize};

/// Stable identity presented to the companion server when pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppIdentity {
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "appName")]
    pub app_name: String,
    #[serde(rename = "appVersion")]
    pub app_version: String,
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            app_id: "vscodeytmusic".to_string(),
            app_name: "VSCode YTMusic".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// Request bodies
#[derive(Debug, Serialize)]
pub(crate) struct TokenRequest<'a> {
    #[serde(rename = "appId")]
    pub(crate) app_id: &'a str,
    pub(crate) code: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommandRequest<'a> {
    pub(crate) command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<serde_json::Value>,
}

// Response types for API calls
#[derive(Debug, Deserialize)]
pub struct CodeResponse {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Error body returned by every endpoint. Newer servers put the sentinel in
/// `code` and a human string in `error`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// The most specific raw error string in the body, if any.
    pub fn raw(&self) -> Option<&str> {
        self.code.as_deref().or(self.error.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueuePayload {
    #[serde(rename = "repeatMode", default = "unknown_code")]
    pub repeat_mode: i32,
    #[serde(rename = "selectedItemIndex", default)]
    pub selected_item_index: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerPayload {
    #[serde(rename = "trackState", default = "unknown_code")]
    pub track_state: i32,
    #[serde(rename = "videoProgress", default)]
    pub video_progress: f64,
    #[serde(default)]
    pub volume: u32,
    #[serde(default)]
    pub muted: bool,
    #[serde(rename = "adPlaying", default)]
    pub ad_playing: bool,
    #[serde(default)]
    pub queue: Option<QueuePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(rename = "likeStatus", default = "unknown_code")]
    pub like_status: i32,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
    #[serde(rename = "durationSeconds", default)]
    pub duration_seconds: u64,
}

impl VideoPayload {
    /// Largest thumbnail by pixel area.
    pub fn art_url(&self) -> Option<&str> {
        self.thumbnails
            .iter()
            .max_by_key(|t| u64::from(t.width) * u64::from(t.height))
            .map(|t| t.url.as_str())
    }
}

/// Full state as served by `GET /state` and the `state-update` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatePayload {
    #[serde(default)]
    pub player: PlayerPayload,
    #[serde(default)]
    pub video: Option<VideoPayload>,
    #[serde(rename = "playlistId", default)]
    pub playlist_id: Option<String>,
}

fn unknown_code() -> i32 {
    -1
}

// Absent enum codes are unknown, never the zero variant.
impl Default for QueuePayload {
    fn default() -> Self {
        Self {
            repeat_mode: unknown_code(),
            selected_item_index: 0,
        }
    }
}

impl Default for PlayerPayload {
    fn default() -> Self {
        Self {
            track_state: unknown_code(),
            video_progress: 0.0,
            volume: 0,
            muted: false,
            ad_playing: false,
            queue: None,
        }
    }
}

impl Default for VideoPayload {
    fn default() -> Self {
        Self {
            id: None,
            title: None,
            author: String::new(),
            album: None,
            like_status: unknown_code(),
            thumbnails: Vec::new(),
            duration_seconds: 0,
        }
    }
}
