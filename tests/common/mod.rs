#![allow(dead_code)]

use async_trait::async_trait;
use mockall::mock;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use ytmd_companion::{
    Alignment, AppIdentity, CompanionApi, CompanionError, DisplayElement, DisplaySurface,
    KeyValueStore, MemoryStore, Notifier, PlayerCommand, RemoteStateSource, SessionBuilder,
    Settings, SourceUpdate, StatePayload, SyncStrategy, UpdateFeed,
};

pub const TOKEN_KEY: &str = "ytMusic.authToken";

mock! {
    pub Api {}

    #[async_trait]
    impl CompanionApi for Api {
        async fn request_code(&self, identity: &AppIdentity) -> Result<String, CompanionError>;
        async fn request_token(
            &self,
            identity: &AppIdentity,
            code: &str,
        ) -> Result<String, CompanionError>;
        async fn fetch_state(&self, token: &str) -> Result<StatePayload, CompanionError>;
        async fn send_command(
            &self,
            token: &str,
            command: &PlayerCommand,
        ) -> Result<(), CompanionError>;
    }
}

/// What the fake surface knows about one live element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementState {
    pub text: String,
    pub tooltip: String,
    pub color: Option<String>,
    pub command: String,
    pub visible: bool,
    pub priority: i32,
}

#[derive(Debug, Default)]
struct SurfaceLog {
    live: BTreeMap<String, ElementState>,
    created: Vec<String>,
    disposed: Vec<String>,
}

/// Display surface recording every element operation.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_ids(&self) -> Vec<String> {
        self.log.lock().unwrap().live.keys().cloned().collect()
    }

    pub fn element(&self, id: &str) -> Option<ElementState> {
        self.log.lock().unwrap().live.get(id).cloned()
    }

    pub fn created(&self) -> Vec<String> {
        self.log.lock().unwrap().created.clone()
    }

    pub fn disposed(&self) -> Vec<String> {
        self.log.lock().unwrap().disposed.clone()
    }
}

struct RecordingElement {
    id: String,
    log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingElement {
    fn update(&self, f: impl FnOnce(&mut ElementState)) {
        if let Some(state) = self.log.lock().unwrap().live.get_mut(&self.id) {
            f(state);
        }
    }
}

impl DisplayElement for RecordingElement {
    fn set_text(&mut self, text: &str) {
        self.update(|s| s.text = text.to_string());
    }

    fn set_tooltip(&mut self, tooltip: &str) {
        self.update(|s| s.tooltip = tooltip.to_string());
    }

    fn set_color(&mut self, color: Option<&str>) {
        self.update(|s| s.color = color.map(ToString::to_string));
    }

    fn set_command(&mut self, command: &str) {
        self.update(|s| s.command = command.to_string());
    }

    fn show(&mut self) {
        self.update(|s| s.visible = true);
    }

    fn hide(&mut self) {
        self.update(|s| s.visible = false);
    }

    fn dispose(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.live.remove(&self.id);
        log.disposed.push(self.id.clone());
    }
}

impl DisplaySurface for RecordingSurface {
    fn create(&self, id: &str, _alignment: Alignment, priority: i32) -> Box<dyn DisplayElement> {
        let mut log = self.log.lock().unwrap();
        log.live.insert(
            id.to_string(),
            ElementState {
                priority,
                ..ElementState::default()
            },
        );
        log.created.push(id.to_string());
        Box::new(RecordingElement {
            id: id.to_string(),
            log: self.log.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    errors: Arc<Mutex<Vec<String>>>,
    infos: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }
}

/// Source that forwards whatever the test sends, as push events.
pub struct ScriptedSource {
    updates: Mutex<Option<mpsc::UnboundedReceiver<SourceUpdate>>>,
}

impl ScriptedSource {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<SourceUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Arc::new(Self {
            updates: Mutex::new(Some(rx)),
        });
        (source, tx)
    }
}

#[async_trait]
impl RemoteStateSource for ScriptedSource {
    fn strategy(&self) -> SyncStrategy {
        SyncStrategy::Push
    }

    async fn run(&self, _token: String, feed: UpdateFeed) {
        let updates = self.updates.lock().unwrap().take();
        let Some(mut updates) = updates else {
            return;
        };
        loop {
            tokio::select! {
                biased;
                _ = feed.cancelled() => break,
                update = updates.recv() => match update {
                    Some(update) => {
                        if !feed.push(update).await {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    }
}

pub fn test_settings() -> Settings {
    Settings {
        host: "127.0.0.1".to_string(),
        port: 9863,
        poll_interval: Duration::from_secs(10),
        reconnect_attempts: 3,
        request_timeout: Duration::from_secs(10),
        approval_timeout: Duration::from_secs(30),
        min_backoff: Duration::from_millis(500),
        max_backoff: Duration::from_secs(5),
        update_buffer_capacity: 32,
        event_buffer_capacity: 100,
    }
}

/// Everything a test needs to drive and observe a session.
pub struct Harness {
    pub surface: RecordingSurface,
    pub notifier: RecordingNotifier,
    pub store: MemoryStore,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            surface: RecordingSurface::new(),
            notifier: RecordingNotifier::new(),
            store: MemoryStore::new(),
        }
    }

    pub fn with_token(token: &str) -> Self {
        let harness = Self::new();
        harness.store.set(TOKEN_KEY, token).unwrap();
        harness
    }

    pub fn builder(&self) -> SessionBuilder {
        SessionBuilder::new(
            Arc::new(self.surface.clone()),
            Arc::new(self.notifier.clone()),
            Arc::new(self.store.clone()),
        )
        .settings(test_settings())
    }

    pub fn stored_token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY)
    }
}

pub fn payload(value: Value) -> StatePayload {
    serde_json::from_value(value).unwrap()
}

/// State with a titled track.
pub fn playing(
    title: &str,
    author: &str,
    track_state: i32,
    like_status: i32,
    repeat_mode: i32,
) -> StatePayload {
    payload(json!({
        "player": {
            "trackState": track_state,
            "videoProgress": 12.5,
            "volume": 80,
            "queue": { "repeatMode": repeat_mode, "selectedItemIndex": 0 }
        },
        "video": {
            "id": "abc123",
            "title": title,
            "author": author,
            "likeStatus": like_status,
            "durationSeconds": 215,
            "thumbnails": [
                { "url": "https://example.com/small.jpg", "width": 60, "height": 60 },
                { "url": "https://example.com/large.jpg", "width": 544, "height": 544 }
            ]
        },
        "playlistId": "PL1"
    }))
}

/// Let spawned tasks run; with a paused clock this also fires due timers.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
