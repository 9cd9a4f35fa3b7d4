use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use reqwest::{header::CONTENT_TYPE, Client};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::codec::{EngineCodec, EnginePacket, OpenHandshake, Outbound, SocketPacket};
use crate::error::{is_unauthorized_message, TRANSPORT_POLL_ERROR};
use crate::models::StatePayload;
use crate::settings::Settings;
use crate::source::{RemoteStateSource, SourceUpdate, SyncStrategy, UpdateFeed};
use crate::CompanionError;

pub const REALTIME_NAMESPACE: &str = "/api/v1/realtime";
pub const STATE_UPDATE_EVENT: &str = "state-update";

const BUFFER_CAPACITY: usize = 16 * 1024;

/// How one connection of the push channel ended.
enum ChannelEnd {
    Cancelled,
    Unauthorized,
    Closed(String),
}

/// Request surface of the Engine.IO polling transport.
#[async_trait]
pub trait EngineTransport: Send + Sync {
    /// One long-poll request. Without a `sid` this is the opening handshake.
    async fn poll(
        &self,
        sid: Option<&str>,
        wait: Option<Duration>,
    ) -> Result<Vec<EnginePacket>, CompanionError>;

    async fn post(&self, sid: &str, packets: Vec<Outbound>) -> Result<(), CompanionError>;
}

/// [`EngineTransport`] over plain HTTP requests to `/socket.io/`.
pub(crate) struct HttpTransport {
    client: Arc<Client>,
    origin: String,
}

impl HttpTransport {
    pub(crate) fn new(client: Arc<Client>, origin: String) -> Self {
        Self { client, origin }
    }

    fn endpoint(&self, sid: Option<&str>) -> Result<String, CompanionError> {
        let cache_buster = Uuid::new_v4().simple().to_string();
        let mut params = vec![
            ("EIO", "4"),
            ("transport", "polling"),
            ("t", cache_buster.as_str()),
        ];
        if let Some(sid) = sid {
            params.push(("sid", sid));
        }
        let query = serde_urlencoded::to_string(&params)?;
        Ok(format!("{}/socket.io/?{}", self.origin, query))
    }
}

#[async_trait]
impl EngineTransport for HttpTransport {
    async fn poll(
        &self,
        sid: Option<&str>,
        wait: Option<Duration>,
    ) -> Result<Vec<EnginePacket>, CompanionError> {
        let mut request = self.client.get(self.endpoint(sid)?);
        if let Some(wait) = wait {
            request = request.timeout(wait);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            error!(%status, body = %body_text, "Engine poll received unsuccessful status");
            return Err(CompanionError::InvalidResponse(format!(
                "Polling error status {}, body: {}",
                status, body_text
            )));
        }

        let mut stream = response.bytes_stream();
        let mut codec = EngineCodec::new();
        let mut buffer = BytesMut::with_capacity(BUFFER_CAPACITY);
        let mut packets = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            buffer.extend_from_slice(&chunk);
            while let Some(packet) = codec.decode(&mut buffer)? {
                packets.push(packet);
            }
        }
        while let Some(packet) = codec.decode_eof(&mut buffer)? {
            packets.push(packet);
        }
        trace!(count = packets.len(), "Decoded engine packets.");
        Ok(packets)
    }

    async fn post(&self, sid: &str, packets: Vec<Outbound>) -> Result<(), CompanionError> {
        let mut codec = EngineCodec::new();
        let mut body = BytesMut::new();
        for packet in packets {
            codec.encode(packet, &mut body)?;
        }
        trace!(sid, body = ?body, "Posting engine packets.");

        let response = self
            .client
            .post(self.endpoint(Some(sid))?)
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(body.freeze())
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            return Err(CompanionError::InvalidResponse(format!(
                "Posting packets failed with status {}, body: {}",
                status, body_text
            )));
        }
        Ok(())
    }
}

/// Push-based source: a Socket.IO subscription over the Engine.IO polling
/// transport. Lost connections are retried a bounded number of times.
pub struct RealtimeSource {
    transport: Arc<dyn EngineTransport>,
    namespace: String,
    reconnect_attempts: u32,
    min_backoff: Duration,
    max_backoff: Duration,
}

impl RealtimeSource {
    pub fn new(client: Arc<Client>, settings: &Settings) -> Self {
        let transport = HttpTransport::new(client, settings.origin());
        Self::with_transport(Arc::new(transport), settings)
    }

    /// Run the channel over a caller-supplied transport.
    pub fn with_transport(transport: Arc<dyn EngineTransport>, settings: &Settings) -> Self {
        Self {
            transport,
            namespace: REALTIME_NAMESPACE.to_string(),
            reconnect_attempts: settings.reconnect_attempts,
            min_backoff: settings.min_backoff,
            max_backoff: settings.max_backoff,
        }
    }

    async fn handshake(&self) -> Result<OpenHandshake, CompanionError> {
        let packets = self.transport.poll(None, None).await?;
        match packets.into_iter().next() {
            Some(EnginePacket::Open(open)) => Ok(open),
            other => Err(CompanionError::InvalidResponse(format!(
                "Expected engine OPEN packet, got {:?}",
                other
            ))),
        }
    }

    async fn connect_and_pump(
        &self,
        token: &str,
        feed: &UpdateFeed,
        connected: &mut bool,
    ) -> Result<ChannelEnd, CompanionError> {
        let open = tokio::select! {
            biased;
            _ = feed.cancelled() => return Ok(ChannelEnd::Cancelled),
            res = self.handshake() => res?,
        };
        debug!(sid = %open.sid, ping_interval = open.ping_interval, "Engine handshake complete.");

        let auth = json!({ "token": token });
        self.transport
            .post(
                &open.sid,
                vec![Outbound::Message(SocketPacket::connect(&self.namespace, &auth))],
            )
            .await?;

        let wait = Duration::from_millis(open.ping_interval + open.ping_timeout);
        loop {
            let packets = tokio::select! {
                biased;
                _ = feed.cancelled() => {
                    if let Err(e) = self.transport.post(&open.sid, vec![Outbound::Close]).await {
                        debug!(error = %e, "Close packet not delivered (ignored).");
                    }
                    return Ok(ChannelEnd::Cancelled);
                }
                res = self.transport.poll(Some(&open.sid), Some(wait)) => res?,
            };

            let mut replies = Vec::new();
            for packet in packets {
                let socket = match packet {
                    EnginePacket::Ping(data) => {
                        replies.push(Outbound::Pong(data));
                        continue;
                    }
                    EnginePacket::Close => {
                        return Ok(ChannelEnd::Closed("transport close".to_string()))
                    }
                    EnginePacket::Message(socket) => socket,
                    EnginePacket::Open(_)
                    | EnginePacket::Pong(_)
                    | EnginePacket::Upgrade
                    | EnginePacket::Noop => continue,
                };

                if socket.namespace() != self.namespace {
                    trace!(namespace = socket.namespace(), "Ignoring packet for other namespace.");
                    continue;
                }

                match socket {
                    SocketPacket::Connect { .. } => {
                        info!(namespace = %self.namespace, "Realtime channel connected.");
                        *connected = true;
                    }
                    SocketPacket::ConnectError { message, .. } => {
                        if is_unauthorized_message(&message) {
                            return Ok(ChannelEnd::Unauthorized);
                        }
                        return Err(CompanionError::from_remote(message));
                    }
                    SocketPacket::Disconnect { .. } => {
                        return Ok(ChannelEnd::Closed("io server disconnect".to_string()));
                    }
                    SocketPacket::Event { name, args, .. } if name == STATE_UPDATE_EVENT => {
                        let update = match args.into_iter().next() {
                            Some(payload) => match serde_json::from_value::<StatePayload>(payload) {
                                Ok(state) => SourceUpdate::State(Box::new(state)),
                                Err(e) => {
                                    warn!(error = %e, "Malformed state-update payload.");
                                    SourceUpdate::Failed(format!("Malformed state payload: {}", e))
                                }
                            },
                            None => continue,
                        };
                        if !feed.push(update).await {
                            return Ok(ChannelEnd::Cancelled);
                        }
                    }
                    SocketPacket::Event { name, .. } => {
                        trace!(event = %name, "Ignoring realtime event.");
                    }
                    SocketPacket::Unsupported { kind, .. } => {
                        trace!(kind, "Ignoring unsupported socket packet.");
                    }
                }
            }

            if !replies.is_empty() {
                self.transport.post(&open.sid, replies).await?;
            }
        }
    }
}

#[async_trait]
impl RemoteStateSource for RealtimeSource {
    fn strategy(&self) -> SyncStrategy {
        SyncStrategy::Push
    }

    async fn run(&self, token: String, feed: UpdateFeed) {
        info!(namespace = %self.namespace, "Realtime source started.");
        let mut failures = 0u32;
        let mut backoff = self.min_backoff;

        loop {
            if feed.is_cancelled() {
                break;
            }

            let mut connected = false;
            let end = self.connect_and_pump(&token, &feed, &mut connected).await;
            if connected {
                failures = 0;
                backoff = self.min_backoff;
            }

            let message = match end {
                Ok(ChannelEnd::Cancelled) => break,
                Ok(ChannelEnd::Unauthorized) => {
                    warn!("Realtime channel rejected the token.");
                    feed.push(SourceUpdate::Unauthorized).await;
                    break;
                }
                Ok(ChannelEnd::Closed(reason)) => {
                    info!(reason = %reason, "Realtime channel closed.");
                    reason
                }
                Err(e) => {
                    warn!(error = %e, "Realtime channel failed.");
                    match e {
                        CompanionError::RequestFailed(_) | CompanionError::InvalidResponse(_) => {
                            TRANSPORT_POLL_ERROR.to_string()
                        }
                        other => other.raw_message(),
                    }
                }
            };

            failures += 1;
            if failures > self.reconnect_attempts {
                error!(attempts = self.reconnect_attempts, "Giving up on realtime channel.");
                feed.push(SourceUpdate::Failed(message)).await;
                break;
            }
            if !feed.push(SourceUpdate::Interrupted(message)).await {
                break;
            }

            let delay = calculate_backoff_delay(backoff);
            debug!("Backing off for {:?}", delay);
            tokio::select! {
                biased;
                _ = feed.cancelled() => break,
                _ = sleep(delay) => {}
            }
            backoff = (backoff * 2).min(self.max_backoff);
        }
        debug!("Realtime source finished.");
    }
}

/// Helper to calculate backoff delay with jitter
fn calculate_backoff_delay(base_backoff: Duration) -> Duration {
    let jitter_factor = rand::random::<f32>() * 0.6 - 0.3; // -0.3 to +0.3
    let jitter = base_backoff.mul_f32(jitter_factor.abs());
    if jitter_factor >= 0.0 {
        base_backoff + jitter
    } else {
        base_backoff.saturating_sub(jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_stays_within_jitter_bounds() {
        let base = Duration::from_millis(1000);
        for _ in 0..100 {
            let delay = calculate_backoff_delay(base);
            assert!(delay >= Duration::from_millis(699), "{:?}", delay);
            assert!(delay <= Duration::from_millis(1301), "{:?}", delay);
        }
    }

    #[test]
    fn test_endpoint_carries_engine_query() {
        let settings = Settings {
            host: "127.0.0.1".to_string(),
            port: 9863,
            ..Settings::from_env()
        };
        let transport = HttpTransport::new(Arc::new(Client::new()), settings.origin());
        let url = transport.endpoint(Some("abc")).unwrap();
        assert!(url.starts_with("http://127.0.0.1:9863/socket.io/?EIO=4&transport=polling&t="));
        assert!(url.ends_with("&sid=abc"));
    }
}
