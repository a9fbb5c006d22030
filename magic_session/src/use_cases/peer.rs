// One player's simulation and its fixed-tick loop.

use super::entity_sync::{
    EffectMessage, EntityMessage, EntitySync, ProjectileMessage, WorldMessage, is_entity_message,
};
use super::player_sync::{PlayerStateSync, ReceiveOutcome};
use super::types::{FrameUpdate, Notice, PeerEvent};
use crate::domain::cast::{CastContext, CastController, CastError, CastRequest};
use crate::domain::effects::ActiveEffectRuntime;
use crate::domain::ledger::{Inventory, ResourceLedger};
use crate::domain::ports::Transport;
use crate::domain::projectile::ThrownAxe;
use crate::domain::render::DrawList;
use crate::domain::spellbook::SpellBook;
use crate::domain::state::World;
use crate::domain::tuning::{AxeTuning, MAX_AXE_TIER};
use crate::domain::{EntityId, PlayerId, PlayerSpellState};
use glam::Vec2;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{Notify, broadcast, mpsc};
use tracing::{debug, info, warn};

/// Local player's canonical resources, seeded from the save record.
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    pub location: String,
    pub position: Vec2,
    pub ledger: ResourceLedger,
    pub spell_book: SpellBook,
    pub inventory: Inventory,
}

impl LocalPlayer {
    pub fn from_record(
        record: PlayerSpellState,
        location: impl Into<String>,
        position: Vec2,
        max_mana: u32,
    ) -> Self {
        Self {
            location: location.into(),
            position,
            ledger: ResourceLedger::new(max_mana, max_mana, record.free_points),
            spell_book: record.spell_book,
            inventory: Inventory::new(),
        }
    }
}

pub struct SessionPeer {
    player_id: PlayerId,
    player: LocalPlayer,
    world: World,
    effects: ActiveEffectRuntime,
    // Stand-ins for effects other peers simulate.
    replicas: ActiveEffectRuntime,
    controller: Arc<CastController>,
    sync: PlayerStateSync,
    entities: EntitySync,
    axe_tuning: AxeTuning,
    next_axe_id: EntityId,
}

impl SessionPeer {
    pub fn new(
        player_id: PlayerId,
        player: LocalPlayer,
        world: World,
        controller: Arc<CastController>,
    ) -> Self {
        Self {
            player_id,
            player,
            world,
            effects: ActiveEffectRuntime::new(),
            replicas: ActiveEffectRuntime::new(),
            controller,
            sync: PlayerStateSync::new(player_id),
            entities: EntitySync::new(player_id),
            axe_tuning: AxeTuning::default(),
            next_axe_id: 1,
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn player(&self) -> &LocalPlayer {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut LocalPlayer {
        &mut self.player
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn effects(&self) -> &ActiveEffectRuntime {
        &self.effects
    }

    pub fn replicas(&self) -> &ActiveEffectRuntime {
        &self.replicas
    }

    pub fn sync(&self) -> &PlayerStateSync {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut PlayerStateSync {
        &mut self.sync
    }

    /// Network-visible snapshot of the local player.
    pub fn local_state(&self) -> PlayerSpellState {
        PlayerSpellState {
            free_points: self.player.ledger.free_points,
            spell_book: self.player.spell_book.clone(),
        }
    }

    pub fn cast(&mut self, request: &CastRequest) -> Result<(), CastError> {
        let Some(location) = self.world.location(&self.player.location) else {
            warn!(
                player_id = self.player_id,
                location = %self.player.location,
                "caster location unavailable"
            );
            return Err(CastError::TargetInvalid);
        };

        let ctx = CastContext {
            caster: self.player_id,
            caster_position: self.player.position,
            location,
            ledger: &mut self.player.ledger,
            spell_book: &self.player.spell_book,
            inventory: &mut self.player.inventory,
        };
        let effect = self.controller.try_cast(ctx, request)?;
        let record = effect.record();
        let effect_id = self.effects.spawn(effect);
        self.entities
            .push(EntityMessage::Effect(EffectMessage::Started { effect_id, record }));
        Ok(())
    }

    /// Spawns an axe in the player's current location. None if that location is
    /// unknown or the tier is past the last one.
    pub fn throw_axe(&mut self, tier: u32, target: Vec2) -> Option<EntityId> {
        if tier > MAX_AXE_TIER {
            warn!(player_id = self.player_id, tier, "axe tier out of range");
            return None;
        }
        let location = self.world.location_mut(&self.player.location)?;
        let id = self.next_axe_id;
        self.next_axe_id += 1;
        let axe = ThrownAxe::thrown_by(
            id,
            self.player_id,
            self.player.position,
            tier,
            target,
            &self.axe_tuning,
        );
        let start = axe.position();
        location.projectiles.spawn(axe);
        self.entities
            .push(EntityMessage::Projectile(ProjectileMessage::Spawned {
                axe_id: id,
                location: self.player.location.clone(),
                tier,
                start,
                target,
            }));
        Some(id)
    }

    pub fn grant_points(&mut self, points: u32) {
        self.player.ledger.credit_points(points);
    }

    /// Learns `spell_id` at `level` for one free point. False when the spell or
    /// level does not exist, or no point is left.
    pub fn learn(&mut self, spell_id: &str, level: u32) -> bool {
        let exists = self
            .controller
            .catalog()
            .get(spell_id)
            .is_some_and(|spell| level <= spell.max_level);
        if !exists || self.player.spell_book.knows(spell_id, level) {
            return false;
        }
        if !self.player.ledger.spend_point() {
            return false;
        }
        self.player.spell_book.learn(spell_id, level);
        true
    }

    /// Routes one inbound message to the sync layer. Malformed frames are logged and dropped.
    pub fn handle_inbound(
        &mut self,
        message_type: &str,
        sender_id: PlayerId,
        payload: &[u8],
    ) -> Option<Notice> {
        if is_entity_message(message_type) {
            match self.entities.on_receive(message_type, sender_id, payload) {
                Ok(Some(message)) => self.apply_remote(sender_id, message),
                Ok(None) => {}
                Err(err) => warn!(
                    player_id = self.player_id,
                    sender_id,
                    message_type,
                    error = %err,
                    "dropping malformed entity message"
                ),
            }
            return None;
        }

        match self.sync.on_receive(message_type, sender_id, payload) {
            Ok(ReceiveOutcome::Replaced) => Some(Notice::PeerStateUpdated {
                player_id: sender_id,
            }),
            Ok(ReceiveOutcome::Ignored) => None,
            Err(err) => {
                warn!(
                    player_id = self.player_id,
                    sender_id,
                    message_type,
                    error = %err,
                    "dropping malformed peer message"
                );
                None
            }
        }
    }

    /// Applies another peer's entity update. Mirrors and replicas never touch
    /// the world; only the owner's reported changes do.
    fn apply_remote(&mut self, owner: PlayerId, message: EntityMessage) {
        match message {
            EntityMessage::Projectile(ProjectileMessage::Spawned {
                axe_id,
                location,
                tier,
                start,
                target,
            }) => {
                if tier > MAX_AXE_TIER {
                    warn!(player_id = self.player_id, owner, tier, "mirror tier out of range");
                    return;
                }
                let Some(location) = self.world.location_mut(&location) else {
                    debug!(
                        player_id = self.player_id,
                        owner,
                        location = %location,
                        "axe in unknown location"
                    );
                    return;
                };
                if location.projectiles.get(owner, axe_id).is_some() {
                    return;
                }
                location.projectiles.spawn(ThrownAxe::mirror(
                    axe_id,
                    owner,
                    start,
                    tier,
                    self.axe_tuning.damage_for_tier(tier),
                    target,
                    self.axe_tuning.speed,
                ));
            }
            EntityMessage::Projectile(ProjectileMessage::Moved {
                axe_id,
                location,
                position,
                dead,
            }) => {
                let Some(location) = self.world.location_mut(&location) else {
                    return;
                };
                if dead {
                    location.projectiles.remove(owner, axe_id);
                } else {
                    location.projectiles.move_mirror(owner, axe_id, position);
                }
            }
            EntityMessage::Effect(EffectMessage::Started { effect_id, record }) => {
                let known_level = self
                    .controller
                    .catalog()
                    .max_level_of(record.kind)
                    .is_some_and(|max| record.level <= max);
                if !known_level || self.world.location(&record.location).is_none() {
                    warn!(
                        player_id = self.player_id,
                        owner,
                        level = record.level,
                        location = %record.location,
                        "rejecting unplayable effect"
                    );
                    return;
                }
                if self.replicas.contains(owner, effect_id) {
                    return;
                }
                let replica = self.controller.tuning().replica(owner, &record);
                self.replicas.insert(effect_id, replica);
            }
            EntityMessage::Effect(EffectMessage::Ended { effect_id }) => {
                self.replicas.remove(owner, effect_id);
            }
            EntityMessage::World(WorldMessage::HostileDamaged {
                location,
                hostile_id,
                amount,
            }) => {
                let Some(location) = self.world.location_mut(&location) else {
                    return;
                };
                if let Some(hostile) = location.hostiles.iter_mut().find(|h| h.id == hostile_id) {
                    hostile.take_damage(amount.max(0), owner);
                }
            }
            EntityMessage::World(WorldMessage::Exploded {
                location,
                tile,
                radius,
            }) => {
                if let Some(location) = self.world.location_mut(&location) {
                    location.explode(tile, radius, owner);
                }
            }
        }
    }

    /// Cancels everything a departed player still had in flight.
    pub fn peer_left(&mut self, player_id: PlayerId) {
        let effects = self.effects.cancel_caster(player_id)
            + self.replicas.cancel_caster(player_id);
        let axes: usize = self
            .world
            .locations_mut()
            .map(|location| location.projectiles.remove_owner(player_id))
            .sum();
        self.sync.forget_peer(player_id);
        info!(
            player_id = self.player_id,
            departed = player_id,
            effects,
            axes,
            "peer left"
        );
    }

    /// One simulation step: effects first, then projectiles in every location.
    /// Whatever the local simulation changed is queued for the other peers.
    /// Returns how many local effects finished.
    pub fn step(&mut self, dt: f32) -> usize {
        let before = WorldMarks::take(&self.world, self.player_id);

        let finished = self.effects.tick(&mut self.world);
        self.replicas.tick(&mut self.world);
        let tuning = self.axe_tuning;
        for location in self.world.locations_mut() {
            location.update_projectiles(dt, &tuning);
        }

        for (_, effect_id) in self.effects.take_finished() {
            self.entities
                .push(EntityMessage::Effect(EffectMessage::Ended { effect_id }));
        }
        self.replicas.take_finished();
        before.queue_changes(&self.world, self.player_id, &mut self.entities);
        finished
    }

    /// Sprites for the player's current location only.
    pub fn draw(&mut self) -> DrawList {
        let mut out = DrawList::new();
        let here = self.player.location.as_str();
        self.effects.draw_in(here, &mut out);
        self.replicas.draw_in(here, &mut out);
        if let Some(location) = self.world.location_mut(here) {
            location.projectiles.draw(&mut out);
        }
        out
    }

    pub fn handle(&mut self, event: PeerEvent, notices: &mut Vec<Notice>) {
        match event {
            PeerEvent::Cast(request) => match self.cast(&request) {
                Ok(()) => {
                    info!(
                        player_id = self.player_id,
                        spell_id = %request.spell_id,
                        level = request.level,
                        "cast started"
                    );
                    notices.push(Notice::CastStarted {
                        spell_id: request.spell_id,
                    });
                }
                Err(err) => {
                    debug!(
                        player_id = self.player_id,
                        spell_id = %request.spell_id,
                        error = %err,
                        "cast rejected"
                    );
                    notices.push(Notice::cast_rejected(&request.spell_id, err));
                }
            },
            PeerEvent::ThrowAxe { tier, target } => {
                if let Some(axe_id) = self.throw_axe(tier, target) {
                    notices.push(Notice::AxeThrown { axe_id });
                }
            }
            PeerEvent::GrantPoints { points } => self.grant_points(points),
            PeerEvent::Learn { spell_id, level } => {
                if self.learn(&spell_id, level) {
                    notices.push(Notice::SpellLearned { spell_id, level });
                } else {
                    notices.push(Notice::LearnRejected { spell_id });
                }
            }
            PeerEvent::Inbound {
                message_type,
                sender_id,
                payload,
            } => {
                if let Some(notice) = self.handle_inbound(&message_type, sender_id, &payload) {
                    notices.push(notice);
                }
            }
            PeerEvent::PeerLeft { player_id } => self.peer_left(player_id),
            PeerEvent::Export { reply } => {
                let _ = reply.send(self.local_state());
            }
            PeerEvent::PeerState { player_id, reply } => {
                let _ = reply.send(self.sync.peer(player_id).cloned());
            }
        }
    }
}

/// What the world looked like before a step, so the step's own changes can be told apart.
struct WorldMarks {
    hostile_hp: HashMap<(String, EntityId), i32>,
    explosions: HashMap<String, usize>,
    axes: HashMap<(String, EntityId), Vec2>,
}

impl WorldMarks {
    fn take(world: &World, owner: PlayerId) -> Self {
        let mut marks = Self {
            hostile_hp: HashMap::new(),
            explosions: HashMap::new(),
            axes: HashMap::new(),
        };
        for location in world.locations() {
            for hostile in &location.hostiles {
                marks
                    .hostile_hp
                    .insert((location.name.clone(), hostile.id), hostile.hp);
            }
            marks
                .explosions
                .insert(location.name.clone(), location.explosions.len());
            for axe in location.projectiles.locals().filter(|a| a.owner() == owner) {
                marks
                    .axes
                    .insert((location.name.clone(), axe.id()), axe.position());
            }
        }
        marks
    }

    fn queue_changes(self, world: &World, owner: PlayerId, out: &mut EntitySync) {
        let mut axes = self.axes;
        for location in world.locations() {
            let name = &location.name;
            for hostile in &location.hostiles {
                let Some(&hp) = self.hostile_hp.get(&(name.clone(), hostile.id)) else {
                    continue;
                };
                if hostile.hp < hp {
                    out.push(EntityMessage::World(WorldMessage::HostileDamaged {
                        location: name.clone(),
                        hostile_id: hostile.id,
                        amount: hp - hostile.hp,
                    }));
                }
            }

            let seen = self.explosions.get(name).copied().unwrap_or(0);
            for explosion in location.explosions.iter().skip(seen) {
                if explosion.source != owner {
                    continue;
                }
                out.push(EntityMessage::World(WorldMessage::Exploded {
                    location: name.clone(),
                    tile: explosion.tile,
                    radius: explosion.radius,
                }));
            }

            for axe in location.projectiles.locals().filter(|a| a.owner() == owner) {
                let previous = axes.remove(&(name.clone(), axe.id()));
                if previous != Some(axe.position()) {
                    out.push(EntityMessage::Projectile(ProjectileMessage::Moved {
                        axe_id: axe.id(),
                        location: name.clone(),
                        position: axe.position(),
                        dead: false,
                    }));
                }
            }
        }

        // Axes the step removed.
        for ((location, axe_id), position) in axes {
            out.push(EntityMessage::Projectile(ProjectileMessage::Moved {
                axe_id,
                location,
                position,
                dead: true,
            }));
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PeerSettings {
    pub tick_interval: Duration,
    // Unconditional snapshot broadcast period.
    pub republish_interval: Duration,
}

/// Fixed-step loop for one peer. Runs until `shutdown` fires or every event
/// sender is gone, then hands the peer back for persistence.
pub async fn peer_task(
    mut peer: SessionPeer,
    mut events_rx: mpsc::Receiver<PeerEvent>,
    frames_tx: broadcast::Sender<FrameUpdate>,
    transport: Arc<dyn Transport>,
    settings: PeerSettings,
    shutdown: Arc<Notify>,
) -> SessionPeer {
    let mut tick: u64 = 0;
    let mut since_republish = Duration::ZERO;
    let mut interval = tokio::time::interval(settings.tick_interval);
    let dt = settings.tick_interval.as_secs_f32();

    info!(player_id = peer.player_id(), "peer loop started");

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                break;
            }
            _ = interval.tick() => {}
        }

        // Inbound events are applied between ticks, each one whole.
        let mut notices = Vec::new();
        let mut disconnected = false;
        loop {
            match events_rx.try_recv() {
                Ok(event) => peer.handle(event, &mut notices),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        peer.step(dt);

        let state = peer.local_state();
        since_republish += settings.tick_interval;
        if since_republish >= settings.republish_interval {
            peer.sync.republish(&state, transport.as_ref());
            since_republish = Duration::ZERO;
        } else {
            peer.sync.publish(&state, transport.as_ref());
        }
        peer.entities.flush(transport.as_ref());

        tick += 1;
        let _ = frames_tx.send(FrameUpdate {
            tick,
            sprites: peer.draw(),
            notices,
        });

        if disconnected {
            break;
        }
    }

    info!(player_id = peer.player_id(), tick, "peer loop stopped");
    peer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{METEOR, SHOCKWAVE, SpellCatalog};
    use crate::domain::cast::EffectTuning;
    use crate::domain::registry::ItemRegistry;
    use crate::domain::render::SpriteSheet;
    use crate::domain::state::{Hostile, Location};
    use crate::use_cases::entity_sync::{EFFECT_MESSAGE, PROJECTILE_MESSAGE, WORLD_MESSAGE};
    use crate::use_cases::player_sync::{SPELL_STATE_MESSAGE, encode_snapshot};
    use std::collections::HashSet;
    use std::sync::Mutex;

    const LOCAL: PlayerId = 1;
    const OTHER: PlayerId = 2;
    const IRIDIUM: i32 = 337;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, PlayerId, Vec<u8>)>>,
    }

    impl RecordingTransport {
        fn count(&self) -> usize {
            self.sent.lock().map(|s| s.len()).unwrap_or(0)
        }

        // Hands every recorded frame to `to`, in send order. Returns the message types.
        fn deliver(&self, to: &mut SessionPeer) -> Vec<String> {
            let frames = self
                .sent
                .lock()
                .map(|mut sent| std::mem::take(&mut *sent))
                .unwrap_or_default();
            frames
                .into_iter()
                .map(|(message_type, sender, payload)| {
                    to.handle_inbound(&message_type, sender, &payload);
                    message_type
                })
                .collect()
        }
    }

    impl Transport for RecordingTransport {
        fn broadcast(&self, message_type: &str, sender_id: PlayerId, payload: Vec<u8>) {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push((message_type.to_string(), sender_id, payload));
            }
        }
    }

    fn peer() -> SessionPeer {
        peer_as(LOCAL)
    }

    fn peer_as(player_id: PlayerId) -> SessionPeer {
        let mut world = World::new();
        let mut farm = Location::new("Farm", Vec2::new(2048.0, 2048.0));
        farm.spawn_hostile(Hostile::new(1, Vec2::new(600.0, 600.0), 500));
        world.insert_location(farm);

        let mut record = PlayerSpellState::default();
        record.free_points = 1;
        record.spell_book.learn(METEOR, 0);
        let mut player = LocalPlayer::from_record(record, "Farm", Vec2::new(100.0, 100.0), 100);
        player.inventory.add(IRIDIUM, 1);

        let controller = CastController::new(
            Arc::new(SpellCatalog::standard(&ItemRegistry::vanilla())),
            EffectTuning::default(),
        );
        SessionPeer::new(player_id, player, world, Arc::new(controller))
    }

    fn meteor_at(x: f32, y: f32) -> CastRequest {
        CastRequest {
            spell_id: METEOR.to_string(),
            level: 0,
            target: Vec2::new(x, y),
        }
    }

    #[test]
    fn when_meteor_cast_then_hostile_hit_once_after_sixteen_steps() {
        let mut peer = peer();
        peer.cast(&meteor_at(600.0, 600.0)).expect("cast accepted");

        let finished: usize = (0..40).map(|_| peer.step(1.0 / 60.0)).sum();

        assert_eq!(finished, 1);
        assert!(peer.effects().is_empty());
        let farm = peer.world().location("Farm").expect("farm");
        assert_eq!(farm.hostile(1).map(|h| h.hp), Some(200));
        assert_eq!(farm.explosions.len(), 1);
        assert_eq!(peer.player().inventory.count(IRIDIUM), 0);
    }

    #[test]
    fn when_peer_leaves_then_its_effects_and_axes_are_dropped_silently() {
        let mut peer = peer();
        peer.cast(&meteor_at(600.0, 600.0)).expect("cast accepted");
        peer.throw_axe(0, Vec2::new(600.0, 600.0)).expect("axe spawned");
        let frame = encode_snapshot(OTHER, &PlayerSpellState::default()).expect("encode");
        peer.handle_inbound(SPELL_STATE_MESSAGE, OTHER, &frame);

        peer.peer_left(OTHER);
        assert_eq!(peer.effects().len(), 1);
        assert!(peer.sync().peer(OTHER).is_none());

        peer.peer_left(LOCAL);
        assert!(peer.effects().is_empty());
        for _ in 0..20 {
            peer.step(1.0 / 60.0);
        }
        let farm = peer.world().location("Farm").expect("farm");
        assert!(farm.projectiles.is_empty());
        assert_eq!(farm.hostile(1).map(|h| h.hp), Some(500));
    }

    #[test]
    fn when_learning_then_points_spent_once_and_state_changes() {
        let mut peer = peer();
        let before = peer.local_state();

        assert!(peer.learn(SHOCKWAVE, 0));
        assert!(!peer.learn(SHOCKWAVE, 1));
        assert!(!peer.learn("arcane:unknown", 0));

        let after = peer.local_state();
        assert_ne!(before, after);
        assert_eq!(after.free_points, 0);
        assert!(after.spell_book.knows(SHOCKWAVE, 0));
    }

    #[test]
    fn when_cast_location_missing_then_rejected_as_target_invalid() {
        let mut peer = peer();
        peer.player_mut().location = "Void".to_string();

        assert_eq!(
            peer.cast(&meteor_at(10.0, 10.0)),
            Err(CastError::TargetInvalid)
        );
        assert_eq!(peer.player().inventory.count(IRIDIUM), 1);
    }

    #[test]
    fn when_owner_throws_and_casts_then_other_peer_mirrors_without_diverging() {
        let mut alice = peer_as(LOCAL);
        let mut bob = peer_as(OTHER);
        let wire = RecordingTransport::default();
        let dt = 1.0 / 60.0;

        let axe_id = alice
            .throw_axe(0, Vec2::new(600.0, 600.0))
            .expect("axe spawned");
        alice.cast(&meteor_at(600.0, 600.0)).expect("cast accepted");

        let mut types = HashSet::new();
        let mut saw_replica = false;
        let mut saw_mirror_sprite = false;
        for _ in 0..130 {
            alice.step(dt);
            alice.entities.flush(&wire);
            types.extend(wire.deliver(&mut bob));
            bob.step(dt);
            saw_replica |= bob.replicas().len() == 1;
            saw_mirror_sprite |= bob.draw().iter().any(|s| s.sheet == SpriteSheet::Tools);

            let a_farm = alice.world().location("Farm").expect("farm");
            let b_farm = bob.world().location("Farm").expect("farm");
            assert_eq!(
                a_farm.hostile(1).map(|h| h.hp),
                b_farm.hostile(1).map(|h| h.hp)
            );
            assert_eq!(a_farm.explosions, b_farm.explosions);
            match a_farm.projectiles.get(LOCAL, axe_id) {
                Some(axe) => {
                    let mirror = b_farm
                        .projectiles
                        .get(LOCAL, axe_id)
                        .expect("mirror follows the owner's axe");
                    assert!(mirror.is_mirror());
                    assert_eq!(mirror.position(), axe.position());
                }
                None => assert!(b_farm.projectiles.get(LOCAL, axe_id).is_none()),
            }
        }

        let farm = alice.world().location("Farm").expect("farm");
        assert!(farm.projectiles.is_empty());
        assert!(farm.hostile(1).is_some_and(|h| h.hp < 200));
        assert_eq!(farm.explosions.len(), 1);
        assert!(saw_replica);
        assert!(saw_mirror_sprite);
        assert!(bob.replicas().is_empty());
        for message_type in [PROJECTILE_MESSAGE, EFFECT_MESSAGE, WORLD_MESSAGE] {
            assert!(types.contains(message_type), "{message_type} never sent");
        }
    }

    #[test]
    fn when_owner_leaves_then_its_mirrors_and_replicas_go_without_damage() {
        let mut alice = peer_as(LOCAL);
        let mut bob = peer_as(OTHER);
        let wire = RecordingTransport::default();

        let axe_id = alice
            .throw_axe(1, Vec2::new(600.0, 600.0))
            .expect("axe spawned");
        alice.cast(&meteor_at(600.0, 600.0)).expect("cast accepted");
        alice.entities.flush(&wire);
        wire.deliver(&mut bob);

        let farm = bob.world().location("Farm").expect("farm");
        assert!(farm.projectiles.get(LOCAL, axe_id).is_some());
        assert_eq!(bob.replicas().len(), 1);

        bob.peer_left(LOCAL);
        for _ in 0..40 {
            bob.step(1.0 / 60.0);
        }

        let farm = bob.world().location("Farm").expect("farm");
        assert!(farm.projectiles.is_empty());
        assert!(bob.replicas().is_empty());
        assert_eq!(farm.hostile(1).map(|h| h.hp), Some(500));
        assert!(farm.explosions.is_empty());
    }

    #[test]
    fn when_axe_tier_is_past_the_last_then_throw_is_refused() {
        let mut peer = peer();

        assert_eq!(peer.throw_axe(u32::MAX / 2, Vec2::new(600.0, 600.0)), None);
        assert_eq!(peer.entities.pending(), 0);
        assert!(peer.throw_axe(MAX_AXE_TIER, Vec2::new(600.0, 600.0)).is_some());
        assert_eq!(peer.entities.pending(), 1);
    }

    #[test]
    fn when_effect_plays_in_another_location_then_it_is_not_drawn() {
        let mut peer = peer();
        peer.cast(&meteor_at(600.0, 600.0)).expect("cast accepted");
        assert!(peer.draw().iter().any(|s| s.sheet == SpriteSheet::Objects));

        peer.world
            .insert_location(Location::new("Mine", Vec2::new(1024.0, 1024.0)));
        peer.player_mut().location = "Mine".to_string();

        assert_eq!(peer.effects().len(), 1);
        assert!(peer.draw().is_empty());
    }

    #[tokio::test]
    async fn when_events_sent_then_loop_publishes_once_and_reports_notices() {
        let transport = Arc::new(RecordingTransport::default());
        let (events_tx, events_rx) = mpsc::channel(16);
        let (frames_tx, mut frames_rx) = broadcast::channel(256);
        let shutdown = Arc::new(Notify::new());
        let settings = PeerSettings {
            tick_interval: Duration::from_millis(2),
            republish_interval: Duration::from_secs(3600),
        };

        let handle = tokio::spawn(peer_task(
            peer(),
            events_rx,
            frames_tx,
            transport.clone(),
            settings,
            shutdown.clone(),
        ));

        events_tx
            .send(PeerEvent::Cast(meteor_at(5000.0, 5000.0)))
            .await
            .expect("loop running");

        let mut rejected = false;
        while !rejected {
            let frame = tokio::time::timeout(Duration::from_secs(2), frames_rx.recv())
                .await
                .expect("frame in time")
                .expect("channel open");
            rejected = frame
                .notices
                .iter()
                .any(|n| matches!(n, Notice::CastRejected { .. }));
        }

        drop(events_tx);
        let peer = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop stops")
            .expect("task ok");

        assert_eq!(transport.count(), 1);
        assert_eq!(peer.player().inventory.count(IRIDIUM), 1);
    }
}
