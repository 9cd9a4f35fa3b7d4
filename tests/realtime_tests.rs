use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ytmd_companion::{
    CompanionError, EnginePacket, EngineTransport, OpenHandshake, Outbound, RealtimeSource,
    RemoteStateSource, RequestSequence, Settings, SocketPacket, SourceUpdate, TaggedUpdate,
    UpdateFeed, REALTIME_NAMESPACE, STATE_UPDATE_EVENT, TRANSPORT_POLL_ERROR,
};

/// What one poll request answers with.
enum Step {
    Packets(Vec<EnginePacket>),
    Fail(&'static str),
}

/// Engine transport replaying a fixed script of poll results. Once the
/// script runs out every poll hangs until the source is cancelled.
#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    posts: Mutex<Vec<(String, Vec<Outbound>)>>,
    handshakes: AtomicUsize,
}

impl ScriptedTransport {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            ..Default::default()
        })
    }

    fn posts(&self) -> Vec<(String, Vec<Outbound>)> {
        self.posts.lock().unwrap().clone()
    }

    fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineTransport for ScriptedTransport {
    async fn poll(
        &self,
        sid: Option<&str>,
        _wait: Option<Duration>,
    ) -> Result<Vec<EnginePacket>, CompanionError> {
        if sid.is_none() {
            self.handshakes.fetch_add(1, Ordering::SeqCst);
        }
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Packets(packets)) => Ok(packets),
            Some(Step::Fail(message)) => Err(CompanionError::InvalidResponse(message.to_string())),
            None => futures::future::pending().await,
        }
    }

    async fn post(&self, sid: &str, packets: Vec<Outbound>) -> Result<(), CompanionError> {
        self.posts.lock().unwrap().push((sid.to_string(), packets));
        Ok(())
    }
}

fn settings(reconnect_attempts: u32) -> Settings {
    Settings {
        host: "127.0.0.1".to_string(),
        port: 9863,
        poll_interval: Duration::from_secs(10),
        reconnect_attempts,
        request_timeout: Duration::from_secs(10),
        approval_timeout: Duration::from_secs(30),
        min_backoff: Duration::from_millis(500),
        max_backoff: Duration::from_secs(5),
        update_buffer_capacity: 32,
        event_buffer_capacity: 100,
    }
}

fn open(sid: &str) -> Step {
    Step::Packets(vec![EnginePacket::Open(OpenHandshake {
        sid: sid.to_string(),
        upgrades: vec![],
        ping_interval: 25_000,
        ping_timeout: 20_000,
    })])
}

fn socket(packet: SocketPacket) -> EnginePacket {
    EnginePacket::Message(packet)
}

fn connected() -> EnginePacket {
    socket(SocketPacket::Connect {
        namespace: REALTIME_NAMESPACE.to_string(),
        data: Some(json!({ "sid": "socket-1" })),
    })
}

fn connect_error(message: &str) -> EnginePacket {
    socket(SocketPacket::ConnectError {
        namespace: REALTIME_NAMESPACE.to_string(),
        message: message.to_string(),
    })
}

fn server_disconnect() -> EnginePacket {
    socket(SocketPacket::Disconnect {
        namespace: REALTIME_NAMESPACE.to_string(),
    })
}

fn feed() -> (UpdateFeed, mpsc::Receiver<TaggedUpdate>, CancellationToken) {
    let (tx, rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    (
        UpdateFeed::new(tx, RequestSequence::new(), cancel.clone()),
        rx,
        cancel,
    )
}

async fn drain(rx: &mut mpsc::Receiver<TaggedUpdate>) -> Vec<SourceUpdate> {
    let mut updates = Vec::new();
    while let Some(tagged) = rx.recv().await {
        updates.push(tagged.update);
    }
    updates
}

fn describe(update: &SourceUpdate) -> String {
    match update {
        SourceUpdate::State(_) => "state".to_string(),
        SourceUpdate::Unauthorized => "unauthorized".to_string(),
        SourceUpdate::Interrupted(message) => format!("interrupted: {}", message),
        SourceUpdate::Failed(message) => format!("failed: {}", message),
    }
}

// Test that the token rides in the connect packet, state-update events reach
// the feed and engine pings are answered
#[tokio::test(start_paused = true)]
async fn test_state_updates_flow_and_pings_are_answered() {
    let transport = ScriptedTransport::new(vec![
        open("engine-1"),
        Step::Packets(vec![
            connected(),
            EnginePacket::Ping(String::new()),
            socket(SocketPacket::Event {
                namespace: REALTIME_NAMESPACE.to_string(),
                name: STATE_UPDATE_EVENT.to_string(),
                args: vec![json!({
                    "player": { "trackState": 1, "queue": { "repeatMode": 0 } },
                    "video": { "title": "Song A", "author": "Artist", "likeStatus": 1 }
                })],
            }),
        ]),
    ]);
    let source = Arc::new(RealtimeSource::with_transport(transport.clone(), &settings(3)));

    let (feed, mut rx, cancel) = feed();
    let task = tokio::spawn({
        let source = source.clone();
        async move { source.run("tok".to_string(), feed).await }
    });

    let update = rx.recv().await.unwrap();
    match update.update {
        SourceUpdate::State(payload) => {
            let video = payload.video.unwrap();
            assert_eq!(video.title.as_deref(), Some("Song A"));
            assert_eq!(payload.player.track_state, 1);
        }
        other => panic!("unexpected update {:?}", other),
    }

    tokio::time::sleep(Duration::from_millis(10)).await;
    let posts = transport.posts();
    assert_eq!(posts.len(), 2);
    assert_eq!(
        posts[0],
        (
            "engine-1".to_string(),
            vec![Outbound::Message(SocketPacket::connect(
                REALTIME_NAMESPACE,
                &json!({ "token": "tok" })
            ))]
        )
    );
    assert_eq!(posts[1], ("engine-1".to_string(), vec![Outbound::Pong(String::new())]));

    cancel.cancel();
    task.await.unwrap();
    assert_eq!(transport.handshakes(), 1);
    // a cancelled channel says goodbye
    assert_eq!(transport.posts().last().unwrap().1, vec![Outbound::Close]);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_connect_reports_unauthorized_and_stops() {
    let transport = ScriptedTransport::new(vec![
        open("engine-1"),
        Step::Packets(vec![connect_error("UNAUTHORIZED")]),
    ]);
    let source = RealtimeSource::with_transport(transport.clone(), &settings(3));

    let (feed, mut rx, _cancel) = feed();
    source.run("tok".to_string(), feed).await;

    let updates = drain(&mut rx).await;
    assert_eq!(updates.iter().map(describe).collect::<Vec<_>>(), vec!["unauthorized"]);
    assert_eq!(transport.handshakes(), 1);
}

// Test that every retry is announced and the last error is surfaced once the
// budget is spent
#[tokio::test(start_paused = true)]
async fn test_gives_up_after_reconnect_budget() {
    let transport = ScriptedTransport::new(vec![
        Step::Fail("connection refused"),
        Step::Fail("connection refused"),
        Step::Fail("connection refused"),
        open("engine-4"),
        Step::Packets(vec![connect_error("Server busy")]),
    ]);
    let source = RealtimeSource::with_transport(transport.clone(), &settings(3));

    let (feed, mut rx, _cancel) = feed();
    source.run("tok".to_string(), feed).await;

    let updates = drain(&mut rx).await;
    let interrupted = format!("interrupted: {}", TRANSPORT_POLL_ERROR);
    assert_eq!(
        updates.iter().map(describe).collect::<Vec<_>>(),
        vec![
            interrupted.clone(),
            interrupted.clone(),
            interrupted,
            "failed: Server busy".to_string(),
        ]
    );
    assert_eq!(transport.handshakes(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_successful_connect_resets_retry_budget() {
    let transport = ScriptedTransport::new(vec![
        Step::Fail("connection refused"),
        open("engine-2"),
        Step::Packets(vec![connected(), server_disconnect()]),
        Step::Fail("connection refused"),
    ]);
    let source = RealtimeSource::with_transport(transport.clone(), &settings(1));

    let (feed, mut rx, _cancel) = feed();
    source.run("tok".to_string(), feed).await;

    let updates = drain(&mut rx).await;
    assert_eq!(
        updates.iter().map(describe).collect::<Vec<_>>(),
        vec![
            format!("interrupted: {}", TRANSPORT_POLL_ERROR),
            "interrupted: io server disconnect".to_string(),
            format!("failed: {}", TRANSPORT_POLL_ERROR),
        ]
    );
    assert_eq!(transport.handshakes(), 3);
}
