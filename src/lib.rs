//! Companion client that mirrors YouTube Music Desktop's player state into
//! an editor's status bar and sends transport commands back to the player.
//!
//! A [`CompanionSession`] is built from three host capabilities: a
//! [`DisplaySurface`] that creates status-bar elements, a [`Notifier`] for
//! one-shot messages and a [`KeyValueStore`] that persists the auth token.
//! Everything else (pairing, keeping the snapshot fresh, dispatching
//! commands, recovering from a rejected token) happens inside the session.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use ytmd_companion::*;
//! # async fn run(surface: Arc<dyn DisplaySurface>, notifier: Arc<dyn Notifier>) -> Result<(), CompanionError> {
//! let session = SessionBuilder::new(surface, notifier, Arc::new(MemoryStore::new()))
//!     .strategy(SyncStrategy::Push)
//!     .build()?;
//! session.start().await?;
//! session.toggle_play().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! This library uses the `tracing` crate for logging. To enable logs, you'll need to
//! initialize a tracing subscriber in your application.
//!
//! Example using `tracing_subscriber`:
//! ```no_run
//! use tracing::Level;
//! use tracing_subscriber::FmtSubscriber;
//!
//! // Create a subscriber with the desired log level
//! let subscriber = FmtSubscriber::builder()
//!     .with_max_level(Level::DEBUG) // Set to DEBUG, INFO, WARN, or ERROR
//!     .finish();
//!
//! // Initialize the global subscriber
//! tracing::subscriber::set_global_default(subscriber)
//!     .expect("Failed to set tracing subscriber");
//! ```
//!
//! The log levels control what information is displayed:
//! - `TRACE`: Shows all logs, including packet-level push channel traffic
//! - `DEBUG`: Shows state transitions, discarded updates and sent commands
//! - `INFO`: Shows high-level operations such as authorization and sync start
//! - `WARN`: Shows failed requests and rejected tokens
//! - `ERROR`: Shows critical failures such as an exhausted reconnect budget

mod auth;
pub use auth::AuthFlow;
mod client;
pub use client::{CompanionApi, CompanionClient};
mod codec;
pub use codec::{EngineCodec, EnginePacket, OpenHandshake, Outbound, SocketPacket};
mod commands;
pub use commands::PlayerCommand;
mod controls;
mod credentials;
pub use credentials::{CredentialStore, KeyValueStore, MemoryStore, KEY_NAMESPACE};
mod dispatch;
mod display;
pub use display::{Alignment, DisplayElement, DisplaySurface, Notifier};
mod error;
pub use error::{AuthError, CompanionError, TRANSPORT_POLL_ERROR};
mod events;
pub use events::SessionEvent;
pub mod messages;
mod models;
pub use models::{
    ApiErrorBody, AppIdentity, CodeResponse, PlayerPayload, QueuePayload, StatePayload, Thumbnail,
    TokenResponse, VideoPayload,
};
mod polling;
pub use polling::PollingSource;
pub mod presentation;
pub use presentation::{ButtonSignal, ControlId, Presentation};
mod realtime;
pub use realtime::{EngineTransport, RealtimeSource, REALTIME_NAMESPACE, STATE_UPDATE_EVENT};
mod session;
pub use session::{CompanionSession, SessionBuilder};
pub mod settings;
pub use settings::{Settings, SETTINGS};
mod source;
pub use source::{
    RemoteStateSource, RequestSequence, SourceUpdate, SyncStrategy, TaggedUpdate, UpdateFeed,
};
mod state;
pub use state::{ConnectionState, LikeStatus, PlaybackStatus, PlayerSnapshot, RepeatMode, Track};
mod sync;
