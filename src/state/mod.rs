pub mod broadcast;
pub mod cricket;
pub mod ingestion;
pub mod lifecycle;

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use axum::extract::ws::Message;
use dashmap::{DashMap, DashSet};
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    dao::{match_store::MatchStore, models::MatchEntity},
    dto::events::{ServerEvent, SystemStatus},
    error::ServiceError,
    state::cricket::Match,
};

pub use self::broadcast::{Broadcaster, EventHub, NoopBroadcaster};

const EVENT_SYSTEM_STATUS: &str = "systemStatus";

pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a connected viewer.
pub struct ViewerConnection {
    pub id: String,
    pub tx: mpsc::UnboundedSender<Message>,
    /// Matches the viewer asked to follow. Empty means every match.
    pub joined: Arc<DashSet<String>>,
}

impl ViewerConnection {
    /// Register a fresh viewer following every match.
    pub fn new(id: String, tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id,
            tx,
            joined: Arc::new(DashSet::new()),
        }
    }

    /// Whether `event` should be relayed to this viewer.
    ///
    /// Events that carry no match (system status) always go through.
    pub fn wants(&self, event: &ServerEvent) -> bool {
        if self.joined.is_empty() {
            return true;
        }
        event
            .match_id
            .as_deref()
            .is_none_or(|id| self.joined.contains(id))
    }
}

/// Central application state storing persistent connections and database handles.
pub struct AppState {
    config: AppConfig,
    match_store: RwLock<Option<Arc<dyn MatchStore>>>,
    hub: Arc<EventHub>,
    broadcaster: Arc<dyn Broadcaster>,
    viewers: DashMap<String, ViewerConnection>,
    match_gates: DashMap<String, Arc<Mutex<()>>>,
    degraded: watch::Sender<bool>,
    mutation_timeout: Duration,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let hub = Arc::new(EventHub::new(config.broadcast_capacity));
        let broadcaster: Arc<dyn Broadcaster> = hub.clone();
        Self::build(config, hub, broadcaster)
    }

    /// Same as [`AppState::new`] but committed mutations are published to `broadcaster`
    /// instead of the transport hub.
    pub fn with_broadcaster(config: AppConfig, broadcaster: Arc<dyn Broadcaster>) -> SharedState {
        let hub = Arc::new(EventHub::new(config.broadcast_capacity));
        Self::build(config, hub, broadcaster)
    }

    fn build(
        config: AppConfig,
        hub: Arc<EventHub>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            mutation_timeout: config.mutation_timeout,
            config,
            match_store: RwLock::new(None),
            hub,
            broadcaster,
            viewers: DashMap::new(),
            match_gates: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current match store, if one is installed.
    pub async fn match_store(&self) -> Option<Arc<dyn MatchStore>> {
        let guard = self.match_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current match store, or [`ServiceError::Degraded`] while none is usable.
    pub async fn require_match_store(&self) -> Result<Arc<dyn MatchStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.match_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new match store implementation and leave degraded mode.
    pub async fn install_match_store(&self, store: Arc<dyn MatchStore>) {
        {
            let mut guard = self.match_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current match store and enter degraded mode.
    pub async fn clear_match_store(&self) {
        {
            let mut guard = self.match_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Whether a storage backend is installed and healthy.
    pub fn is_ready(&self) -> bool {
        !self.is_degraded()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        let changed = self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
        if !changed {
            return;
        }

        match ServerEvent::json(EVENT_SYSTEM_STATUS, None, &SystemStatus { degraded: value }) {
            Ok(event) => self.hub.publish(event),
            Err(err) => warn!(error = %err, "failed to serialize system status payload"),
        }
    }

    /// Broadcast hub feeding the WebSocket and SSE transports.
    pub fn event_hub(&self) -> &EventHub {
        &self.hub
    }

    /// Sink for events describing committed mutations.
    pub fn broadcaster(&self) -> &dyn Broadcaster {
        self.broadcaster.as_ref()
    }

    /// Registry of active viewer sockets keyed by their identifier.
    pub fn viewers(&self) -> &DashMap<String, ViewerConnection> {
        &self.viewers
    }

    fn match_gate(&self, id: &str) -> Arc<Mutex<()>> {
        self.match_gates
            .entry(id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the gate of `id` once no mutation holds or awaits it.
    fn release_gate(&self, id: &str) {
        self.match_gates
            .remove_if(id, |_, gate| Arc::strong_count(gate) == 1);
    }

    /// Serialized read-modify-write of one match.
    ///
    /// `work` runs on the freshly loaded aggregate while the per-match gate is held. When it
    /// fails nothing is written. On success the version is bumped and the document replaced
    /// only if nobody else committed in between, then the committed snapshot is returned.
    ///
    /// The mutation timeout bounds waiting for the gate and loading the document. Once the
    /// compare-and-swap is issued it runs to completion, so a write that reaches the store is
    /// always reported to the caller.
    pub async fn mutate_match<F, T>(&self, id: &str, work: F) -> Result<(Match, T), ServiceError>
    where
        F: FnOnce(&mut Match) -> Result<T, ServiceError>,
    {
        let gate = self.match_gate(id);
        let result = self.mutate_under_gate(&gate, id, work).await;
        drop(gate);
        self.release_gate(id);
        result
    }

    async fn mutate_under_gate<F, T>(
        &self,
        gate: &Mutex<()>,
        id: &str,
        work: F,
    ) -> Result<(Match, T), ServiceError>
    where
        F: FnOnce(&mut Match) -> Result<T, ServiceError>,
    {
        let load = async {
            let guard = gate.lock().await;
            let store = self.require_match_store().await?;
            let entity = store
                .find_match(id.to_owned())
                .await?
                .ok_or_else(|| ServiceError::NotFound("Match not found".into()))?;
            Ok::<_, ServiceError>((guard, store, entity))
        };
        let (_guard, store, entity) = match timeout(self.mutation_timeout, load).await {
            Ok(loaded) => loaded?,
            Err(_) => {
                warn!(match_id = %id, "match mutation timed out before loading");
                return Err(ServiceError::Timeout);
            }
        };

        let mut game = Match::try_from(entity)?;
        let previous_version = game.version;
        let value = work(&mut game)?;

        game.version = previous_version + 1;
        game.updated_at = SystemTime::now();
        let replaced = store
            .replace_match(MatchEntity::from(game.clone()), previous_version)
            .await?;
        if !replaced {
            return Err(ServiceError::Conflict(
                "Match was modified concurrently; reload and retry".into(),
            ));
        }
        debug!(match_id = %game.id, version = game.version, "match committed");
        Ok((game, value))
    }
}
