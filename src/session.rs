use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex as AsyncMutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::AuthFlow;
use crate::client::{CompanionApi, CompanionClient};
use crate::controls::ControlBoard;
use crate::credentials::{CredentialStore, KeyValueStore};
use crate::dispatch::Dispatcher;
use crate::display::{DisplaySurface, Notifier};
use crate::error::AuthError;
use crate::events::SessionEvent;
use crate::messages::user_facing;
use crate::models::AppIdentity;
use crate::polling::PollingSource;
use crate::presentation::{ButtonSignal, ControlId};
use crate::realtime::RealtimeSource;
use crate::settings::{Settings, SETTINGS};
use crate::source::{RemoteStateSource, RequestSequence, SyncStrategy};
use crate::state::{ConnectionState, PlayerSnapshot};
use crate::sync::{self, SyncHandle};
use crate::CompanionError;

/// State shared between a session and its background tasks.
pub(crate) struct SessionShared {
    pub(crate) id: Uuid,
    pub(crate) settings: Settings,
    pub(crate) identity: AppIdentity,
    pub(crate) api: Arc<dyn CompanionApi>,
    pub(crate) source: Arc<dyn RemoteStateSource>,
    pub(crate) credentials: CredentialStore,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) controls: Mutex<ControlBoard>,
    pub(crate) token: RwLock<Option<String>>,
    pub(crate) snapshot: RwLock<Option<PlayerSnapshot>>,
    pub(crate) sequence: RequestSequence,
    /// Last connectivity error shown, for duplicate suppression.
    pub(crate) last_connectivity_error: Mutex<Option<String>>,
    pub(crate) sync: Mutex<Option<SyncHandle>>,
    pub(crate) connection_tx: watch::Sender<ConnectionState>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
}

impl SessionShared {
    pub(crate) fn connection_state(&self) -> ConnectionState {
        self.connection_tx.borrow().clone()
    }

    /// Move between authenticated states. Refused once the session is
    /// unauthenticated, which only [`establish`] may leave. Returns whether
    /// the session now holds `state`.
    pub(crate) fn set_connection(&self, state: ConnectionState) -> bool {
        let mut accepted = true;
        let changed = self.connection_tx.send_if_modified(|current| {
            if !current.is_authenticated() && state.is_authenticated() {
                accepted = false;
                return false;
            }
            if *current == state {
                return false;
            }
            *current = state.clone();
            true
        });
        if changed {
            debug!(session = %self.id, state = ?state, "Connection state changed.");
            self.emit(SessionEvent::ConnectionChanged(state));
        }
        accepted
    }

    fn begin_connecting(&self) {
        let changed = self.connection_tx.send_if_modified(|current| {
            if *current == ConnectionState::Connecting {
                return false;
            }
            *current = ConnectionState::Connecting;
            true
        });
        if changed {
            debug!(session = %self.id, "Connecting.");
            self.emit(SessionEvent::ConnectionChanged(ConnectionState::Connecting));
        }
    }

    /// Helper method to send events - discards send errors
    #[inline]
    pub(crate) fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn notify_error(&self, raw: &str) {
        self.notifier.error(&user_facing(raw));
    }
}

/// Tear the session down to the unauthenticated state. This is the only path
/// that deletes the stored token; repeated calls after the first are no-ops.
pub(crate) async fn revoke(shared: &Arc<SessionShared>) {
    let changed = shared.connection_tx.send_if_modified(|current| {
        if !current.is_authenticated() {
            return false;
        }
        *current = ConnectionState::Unauthenticated;
        true
    });
    if !changed {
        debug!(session = %shared.id, "Session already unauthenticated.");
        return;
    }
    warn!(session = %shared.id, "Token rejected, returning to authorization.");
    shared.emit(SessionEvent::ConnectionChanged(ConnectionState::Unauthenticated));

    // May run inside the sync task itself, so cancel without awaiting.
    if let Some(handle) = shared.sync.lock().take() {
        handle.cancel();
    }
    shared.sequence.issue();

    *shared.token.write().await = None;
    *shared.snapshot.write().await = None;
    shared.last_connectivity_error.lock().take();
    if let Err(e) = shared.credentials.clear_token() {
        warn!(error = %e, "Failed to delete stored token.");
    }
    shared.controls.lock().install_auth_control();
    shared.emit(SessionEvent::AuthorizationRevoked);
}

/// Enter the authenticated state with `token` and start syncing.
async fn establish(shared: &Arc<SessionShared>, token: String) {
    *shared.token.write().await = Some(token.clone());
    shared.begin_connecting();
    shared.controls.lock().install_player_controls();

    let handle = sync::start(shared, token);
    if let Some(previous) = shared.sync.lock().replace(handle) {
        debug!("Replacing running synchronizer.");
        previous.cancel();
    }
}

/// Parts a session is built from. Cloning it yields the parts for a fresh
/// session, which is how [`CompanionSession::restart`] works.
#[derive(Clone)]
pub struct SessionBuilder {
    surface: Arc<dyn DisplaySurface>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn KeyValueStore>,
    settings: Option<Settings>,
    strategy: SyncStrategy,
    identity: Option<AppIdentity>,
    api: Option<Arc<dyn CompanionApi>>,
    source: Option<Arc<dyn RemoteStateSource>>,
}

impl SessionBuilder {
    pub fn new(
        surface: Arc<dyn DisplaySurface>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            surface,
            notifier,
            store,
            settings: None,
            strategy: SyncStrategy::default(),
            identity: None,
            api: None,
            source: None,
        }
    }

    /// Overrides the environment-derived [`SETTINGS`].
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn strategy(mut self, strategy: SyncStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn identity(mut self, identity: AppIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn api(mut self, api: Arc<dyn CompanionApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// A custom source replaces the one chosen by the strategy.
    pub fn source(mut self, source: Arc<dyn RemoteStateSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn build(self) -> Result<CompanionSession, CompanionError> {
        let settings = self.settings.clone().unwrap_or_else(|| SETTINGS.clone());

        let mut http = None;
        let api: Arc<dyn CompanionApi> = match &self.api {
            Some(api) => api.clone(),
            None => {
                let client = CompanionClient::new(&settings)?;
                http = Some(client.http());
                Arc::new(client)
            }
        };

        let source: Arc<dyn RemoteStateSource> = match (&self.source, self.strategy) {
            (Some(source), _) => source.clone(),
            (None, SyncStrategy::Poll) => {
                Arc::new(PollingSource::new(api.clone(), settings.poll_interval))
            }
            (None, SyncStrategy::Push) => {
                let http = match http {
                    Some(http) => http,
                    None => CompanionClient::new(&settings)?.http(),
                };
                Arc::new(RealtimeSource::new(http, &settings))
            }
        };

        let (connection_tx, connection_rx) = watch::channel(ConnectionState::Unauthenticated);
        let (events, _) = broadcast::channel(settings.event_buffer_capacity);

        let shared = Arc::new(SessionShared {
            id: Uuid::new_v4(),
            identity: self.identity.clone().unwrap_or_default(),
            api,
            source,
            credentials: CredentialStore::new(self.store.clone()),
            notifier: self.notifier.clone(),
            controls: Mutex::new(ControlBoard::new(self.surface.clone())),
            token: RwLock::new(None),
            snapshot: RwLock::new(None),
            sequence: RequestSequence::new(),
            last_connectivity_error: Mutex::new(None),
            sync: Mutex::new(None),
            connection_tx,
            events,
            settings,
        });
        debug!(session = %shared.id, strategy = ?shared.source.strategy(), "Session built.");

        Ok(CompanionSession {
            shared,
            dispatcher: Dispatcher::new(),
            auth_in_flight: AsyncMutex::new(()),
            connection_rx,
            parts: self,
        })
    }
}

/// One companion session: owns the status bar elements, the token lifecycle
/// and the background synchronizer.
pub struct CompanionSession {
    shared: Arc<SessionShared>,
    dispatcher: Dispatcher,
    auth_in_flight: AsyncMutex<()>,
    connection_rx: watch::Receiver<ConnectionState>,
    parts: SessionBuilder,
}

impl CompanionSession {
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Resume with a stored token, or show only the `auth` control.
    pub async fn start(&self) -> Result<(), CompanionError> {
        match self.shared.credentials.token() {
            Some(token) => {
                info!(session = %self.shared.id, "Stored token found, connecting.");
                establish(&self.shared, token).await;
            }
            None => {
                info!(session = %self.shared.id, "No stored token, waiting for authorization.");
                self.shared.controls.lock().install_auth_control();
            }
        }
        Ok(())
    }

    /// Stop syncing and wait for the background tasks to finish. Responses
    /// still in flight are ignored.
    pub async fn stop(&self) -> Result<(), CompanionError> {
        let handle = self.shared.sync.lock().take();
        self.shared.sequence.issue();
        if let Some(handle) = handle {
            debug!(session = %self.shared.id, "Stopping synchronizer.");
            handle.join().await?;
        }
        Ok(())
    }

    /// Stop and remove every element this session created.
    pub async fn dispose(&self) -> Result<(), CompanionError> {
        self.stop().await?;
        self.shared.controls.lock().dispose_all();
        info!(session = %self.shared.id, "Session disposed.");
        Ok(())
    }

    /// Replace this session with a freshly built and started one.
    pub async fn restart(&mut self) -> Result<(), CompanionError> {
        info!(session = %self.shared.id, "Restarting session.");
        self.dispose().await?;
        let fresh = self.parts.clone().build()?;
        fresh.start().await?;
        *self = fresh;
        Ok(())
    }

    pub async fn toggle_play(&self) -> Result<(), CompanionError> {
        self.dispatcher.dispatch(&self.shared, ControlId::PlayPause).await
    }

    pub async fn skip(&self) -> Result<(), CompanionError> {
        self.dispatcher.dispatch(&self.shared, ControlId::Skip).await
    }

    pub async fn rewind(&self) -> Result<(), CompanionError> {
        self.dispatcher.dispatch(&self.shared, ControlId::Rewind).await
    }

    pub async fn cycle_repeat(&self) -> Result<(), CompanionError> {
        self.dispatcher.dispatch(&self.shared, ControlId::CycleRepeat).await
    }

    pub async fn thumbs_up(&self) -> Result<(), CompanionError> {
        self.dispatcher.dispatch(&self.shared, ControlId::ThumbsUp).await
    }

    pub async fn thumbs_down(&self) -> Result<(), CompanionError> {
        self.dispatcher.dispatch(&self.shared, ControlId::ThumbsDown).await
    }

    /// Run the pairing exchange. Calls made while one is already running
    /// return immediately.
    pub async fn authorize(&self) -> Result<(), CompanionError> {
        let Ok(_in_flight) = self.auth_in_flight.try_lock() else {
            debug!(session = %self.shared.id, "Authorization already in progress.");
            return Ok(());
        };

        let flow = AuthFlow::new(
            self.shared.api.clone(),
            self.shared.notifier.clone(),
            self.shared.identity.clone(),
        );
        match flow.request_authorization().await {
            Ok(token) => self.authenticate_with_token(&token).await,
            Err(e) => {
                warn!(error = %e, "Authorization failed.");
                self.shared.notify_error(&e.raw_message());
                if !self.shared.connection_state().is_authenticated() {
                    self.shared.controls.lock().install_auth_control();
                }
                Err(e.into())
            }
        }
    }

    /// Accept a token obtained elsewhere, skipping the pairing exchange.
    pub async fn authenticate_with_token(&self, token: &str) -> Result<(), CompanionError> {
        let token = token.trim();
        if token.is_empty() {
            let e = AuthError::Invalid("AUTHORIZATION_INVALID".to_string());
            self.shared.notify_error(&e.raw_message());
            return Err(e.into());
        }
        self.shared.credentials.store_token(token)?;
        self.shared.last_connectivity_error.lock().take();
        self.shared.emit(SessionEvent::Authorized);
        info!(session = %self.shared.id, "Authorized with the companion server.");
        establish(&self.shared, token.to_string()).await;
        Ok(())
    }

    /// Fetch the state once, outside the source's schedule.
    pub async fn refresh(&self) -> Result<(), CompanionError> {
        sync::refresh(&self.shared).await
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_rx.borrow().clone()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection_rx.clone()
    }

    pub async fn snapshot(&self) -> Option<PlayerSnapshot> {
        self.shared.snapshot.read().await.clone()
    }

    /// Current presentation of every control on the surface.
    pub fn signals(&self) -> BTreeMap<ControlId, ButtonSignal> {
        self.shared.controls.lock().signals()
    }

    pub fn now_playing_text(&self) -> String {
        self.shared.controls.lock().now_playing_text().to_string()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }
}

impl std::fmt::Debug for CompanionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompanionSession")
            .field("id", &self.shared.id)
            .field("strategy", &self.shared.source.strategy())
            .field("state", &*self.connection_rx.borrow())
            .finish()
    }
}

// Background tasks hold their own reference to the shared state, so they
// have to be told to stop.
impl Drop for CompanionSession {
    fn drop(&mut self) {
        if let Some(handle) = self.shared.sync.lock().take() {
            debug!(session = %self.shared.id, "Dropping session, cancelling synchronizer.");
            handle.cancel();
        }
    }
}
