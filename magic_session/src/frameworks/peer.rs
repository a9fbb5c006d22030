// Bootstraps one peer and hands back a handle to its tick loop.

use crate::domain::cast::{CastController, EffectTuning};
use crate::domain::catalog::SpellCatalog;
use crate::domain::features::{FeaturePlacement, TileMap};
use crate::domain::ledger::Inventory;
use crate::domain::registry::ItemRegistry;
use crate::domain::state::World;
use crate::domain::{PlayerId, PlayerSpellState};
use crate::frameworks::config;
use crate::interface_adapters::net::{NetError, PeerLink};
use crate::interface_adapters::persistence::{PersistError, SaveStore};
use crate::use_cases::features::install_static_features;
use crate::use_cases::{FrameUpdate, LocalPlayer, PeerEvent, PeerSettings, SessionPeer, peer_task};

use glam::Vec2;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

const DEFAULT_MAX_MANA: u32 = 100;

#[derive(Debug)]
pub enum LaunchError {
    Persist(PersistError),
    Net(NetError),
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::Persist(err) => write!(f, "failed to load save: {err}"),
            LaunchError::Net(err) => write!(f, "failed to join relay: {err}"),
        }
    }
}

impl std::error::Error for LaunchError {}

pub struct PeerOptions {
    /// Relay base url, e.g. `ws://127.0.0.1:3001`.
    pub relay_url: String,
    pub session_id: String,
    pub player_id: PlayerId,
    pub location: String,
    pub position: Vec2,
    pub max_mana: u32,
    pub inventory: Inventory,
    pub world: World,
    pub placement: FeaturePlacement,
    pub altar_patch: TileMap,
    pub save: SaveStore,
    pub tick_interval: Duration,
    pub republish_interval: Duration,
}

impl PeerOptions {
    /// Options with placement, save directory and timing taken from the environment.
    pub fn new(
        relay_url: impl Into<String>,
        session_id: impl Into<String>,
        player_id: PlayerId,
        world: World,
        location: impl Into<String>,
    ) -> Self {
        Self {
            relay_url: relay_url.into(),
            session_id: session_id.into(),
            player_id,
            location: location.into(),
            position: Vec2::ZERO,
            max_mana: DEFAULT_MAX_MANA,
            inventory: Inventory::new(),
            world,
            placement: config::feature_placement(),
            altar_patch: TileMap::default(),
            save: SaveStore::new(config::save_dir()),
            tick_interval: config::TICK_INTERVAL,
            republish_interval: config::REPUBLISH_INTERVAL,
        }
    }
}

pub struct PeerHandle {
    pub player_id: PlayerId,
    events_tx: mpsc::Sender<PeerEvent>,
    frames_tx: broadcast::Sender<FrameUpdate>,
    shutdown: Arc<Notify>,
    task: JoinHandle<SessionPeer>,
    save: SaveStore,
}

impl PeerHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<FrameUpdate> {
        self.frames_tx.subscribe()
    }

    /// Queues an event for the next tick. False once the loop has stopped.
    pub async fn send(&self, event: PeerEvent) -> bool {
        self.events_tx.send(event).await.is_ok()
    }

    /// Current network-visible state of the local player, read between ticks.
    pub async fn local_state(&self) -> Option<PlayerSpellState> {
        let (reply, rx) = oneshot::channel();
        if !self.send(PeerEvent::Export { reply }).await {
            return None;
        }
        rx.await.ok()
    }

    /// Cached mirror of another player's state, as last received.
    pub async fn peer_state(&self, player_id: PlayerId) -> Option<PlayerSpellState> {
        let (reply, rx) = oneshot::channel();
        if !self.send(PeerEvent::PeerState { player_id, reply }).await {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Writes the local record back into the save, keeping other players' records.
    pub async fn save(&self) -> Result<bool, PersistError> {
        let Some(state) = self.local_state().await else {
            return Ok(false);
        };
        self.save.save_player(self.player_id, &state).await?;
        Ok(true)
    }

    /// Stops the loop and returns the final peer state.
    pub async fn stop(self) -> Option<SessionPeer> {
        self.shutdown.notify_one();
        self.task.await.ok()
    }
}

pub async fn launch_peer(options: PeerOptions) -> Result<PeerHandle, LaunchError> {
    let PeerOptions {
        relay_url,
        session_id,
        player_id,
        location,
        position,
        max_mana,
        inventory,
        mut world,
        placement,
        altar_patch,
        save,
        tick_interval,
        republish_interval,
    } = options;

    let records = save.load().await.map_err(LaunchError::Persist)?;
    let local = records.get(&player_id).cloned().unwrap_or_default();

    install_static_features(&placement, &mut world, &altar_patch);

    let mut player = LocalPlayer::from_record(local, location, position, max_mana);
    player.inventory = inventory;

    let controller = CastController::new(
        Arc::new(SpellCatalog::standard(&ItemRegistry::vanilla())),
        EffectTuning::default(),
    );
    let mut peer = SessionPeer::new(player_id, player, world, Arc::new(controller));
    peer.sync_mut().seed_peers(records);

    let (events_tx, events_rx) = mpsc::channel::<PeerEvent>(config::PEER_EVENT_CAPACITY);
    let link = PeerLink::connect(
        &relay_url,
        &session_id,
        player_id,
        events_tx.clone(),
        config::OUTBOUND_FRAME_CAPACITY,
    )
    .await
    .map_err(LaunchError::Net)?;

    let (frames_tx, _frames_rx) = broadcast::channel::<FrameUpdate>(config::FRAME_BROADCAST_CAPACITY);
    let shutdown = Arc::new(Notify::new());
    let task = tokio::spawn(peer_task(
        peer,
        events_rx,
        frames_tx.clone(),
        link,
        PeerSettings {
            tick_interval,
            republish_interval,
        },
        shutdown.clone(),
    ));

    info!(player_id, session_id = %session_id, "peer launched");
    Ok(PeerHandle {
        player_id,
        events_tx,
        frames_tx,
        shutdown,
        task,
        save,
    })
}
