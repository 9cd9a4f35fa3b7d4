use serde_json::json;

use ytmd_companion::{
    ApiErrorBody, AppIdentity, LikeStatus, PlaybackStatus, PlayerSnapshot, RepeatMode,
    StatePayload,
};

// Test the identity sent when pairing
#[test]
fn test_app_identity_serialization() {
    let value = serde_json::to_value(AppIdentity::default()).unwrap();
    assert_eq!(value["appId"], "vscodeytmusic");
    assert_eq!(value["appName"], "VSCode YTMusic");
    assert_eq!(value["appVersion"], env!("CARGO_PKG_VERSION"));
}

// Test a full state payload as served by the companion server
#[test]
fn test_state_payload_normalization() {
    let payload: StatePayload = serde_json::from_value(json!({
        "player": {
            "trackState": 2,
            "videoProgress": 61.2,
            "volume": 35,
            "muted": false,
            "adPlaying": false,
            "queue": { "repeatMode": 1, "selectedItemIndex": 3, "items": [] }
        },
        "video": {
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "author": "Rick Astley",
            "album": "Whenever You Need Somebody",
            "likeStatus": 0,
            "durationSeconds": 213,
            "thumbnails": [
                { "url": "https://example.com/120.jpg", "width": 120, "height": 90 },
                { "url": "https://example.com/480.jpg", "width": 480, "height": 360 }
            ]
        },
        "playlistId": "RDAMVM"
    }))
    .unwrap();

    let snapshot = PlayerSnapshot::from(&payload);
    assert_eq!(snapshot.status, PlaybackStatus::Buffering);
    assert_eq!(snapshot.repeat, RepeatMode::Playlist);
    assert_eq!(snapshot.like, LikeStatus::Disliked);
    assert_eq!(snapshot.volume, 35);
    assert!((snapshot.progress_seconds - 61.2).abs() < f64::EPSILON);

    let track = snapshot.track.unwrap();
    assert_eq!(track.title.as_deref(), Some("Never Gonna Give You Up"));
    assert_eq!(track.author, "Rick Astley");
    assert_eq!(track.album.as_deref(), Some("Whenever You Need Somebody"));
    assert_eq!(track.duration_seconds, 213);
    assert_eq!(track.art_url.as_deref(), Some("https://example.com/480.jpg"));
    assert_eq!(track.video_id.as_deref(), Some("dQw4w9WgXcQ"));
}

// Missing fields map to Unknown rather than failing
#[test]
fn test_sparse_payload_is_unknown() {
    let payload: StatePayload = serde_json::from_value(json!({})).unwrap();
    let snapshot = PlayerSnapshot::from(&payload);
    assert_eq!(snapshot.status, PlaybackStatus::Unknown);
    assert_eq!(snapshot.repeat, RepeatMode::Unknown);
    assert_eq!(snapshot.like, LikeStatus::Unknown);
    assert!(snapshot.track.is_none());

    let payload: StatePayload = serde_json::from_value(json!({
        "player": { "trackState": -1 },
        "video": { "title": "", "author": "Nobody" }
    }))
    .unwrap();
    let snapshot = PlayerSnapshot::from(&payload);
    assert_eq!(snapshot.track.unwrap().title, None);
}

#[test]
fn test_wire_enums() {
    assert_eq!(PlaybackStatus::from_i32(0), PlaybackStatus::Paused);
    assert_eq!(PlaybackStatus::from_i32(1), PlaybackStatus::Playing);
    assert_eq!(PlaybackStatus::from_i32(7), PlaybackStatus::Unknown);
    assert_eq!(RepeatMode::from_i32(2), RepeatMode::Song);
    assert_eq!(RepeatMode::Song.to_i32(), Some(2));
    assert_eq!(RepeatMode::Unknown.to_i32(), None);
    assert_eq!(LikeStatus::from_i32(2), LikeStatus::Liked);
    assert_eq!(LikeStatus::from_i32(1), LikeStatus::Neutral);
}

#[test]
fn test_repeat_cycle() {
    for start in [RepeatMode::None, RepeatMode::Unknown] {
        let mut mode = start;
        let mut seen = Vec::new();
        for _ in 0..3 {
            mode = mode.next();
            seen.push(mode);
        }
        assert_eq!(seen, vec![RepeatMode::Playlist, RepeatMode::Song, RepeatMode::None]);
    }
}

#[test]
fn test_like_toggles_treat_unknown_as_neutral() {
    assert_eq!(LikeStatus::Unknown.after_toggle_like(), LikeStatus::Liked);
    assert_eq!(LikeStatus::Liked.after_toggle_like(), LikeStatus::Neutral);
    assert_eq!(LikeStatus::Disliked.after_toggle_like(), LikeStatus::Liked);
    assert_eq!(LikeStatus::Unknown.after_toggle_dislike(), LikeStatus::Disliked);
    assert_eq!(LikeStatus::Disliked.after_toggle_dislike(), LikeStatus::Neutral);
}

#[test]
fn test_error_body_prefers_code() {
    let body: ApiErrorBody = serde_json::from_value(json!({
        "error": "Unauthorized",
        "code": "UNAUTHORIZED",
        "message": "Token is invalid"
    }))
    .unwrap();
    assert_eq!(body.raw(), Some("UNAUTHORIZED"));

    let body: ApiErrorBody = serde_json::from_value(json!({ "error": "FORBIDDEN" })).unwrap();
    assert_eq!(body.raw(), Some("FORBIDDEN"));
}
