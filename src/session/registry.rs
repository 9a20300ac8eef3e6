//! Authoritative registry of rooms and participants.
//!
//! All mutation goes through `SessionRegistry` methods behind a single mutex,
//! so concurrent hits on the same room cannot lose an update. Outbound
//! delivery is a non-blocking push into each participant's channel endpoint;
//! a closed peer's send is dropped, never queued.

use std::collections::HashMap;

use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::combat::{BodyPart, MAX_HEALTH};
use crate::geom::Vec3;
use crate::util::time::unix_millis;
use crate::ws::protocol::{PoseState, ServerMsg};

/// A duel room never holds more than two participants.
pub const ROOM_CAPACITY: usize = 2;

const ROOM_CODE_LEN: usize = 4;
const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// One connected player identity (server-side).
struct Participant {
    name: Option<String>,
    /// Non-owning back-reference to the room this participant is in
    room_code: Option<String>,
    /// Authoritative health, mutated only by this registry
    health: i32,
    /// Last self-reported pose; display only
    last_state: Option<PoseState>,
    outbox: UnboundedSender<ServerMsg>,
}

/// A pairing of up to two participants for one match.
struct Room {
    members: Vec<Uuid>,
    started: bool,
    #[allow(dead_code)]
    created_at: u64,
}

/// Room lookup failures surfaced to the joiner as `error` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Room not found")]
    NotFound,
    #[error("Room is full")]
    Full,
}

#[derive(Default)]
struct RegistryInner {
    rooms: HashMap<String, Room>,
    participants: HashMap<Uuid, Participant>,
}

/// The single owner of all room/participant state.
pub struct SessionRegistry {
    inner: Mutex<RegistryInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Register a fresh connection and assign its identity.
    pub fn register(&self, outbox: UnboundedSender<ServerMsg>) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.lock();
        inner.participants.insert(
            id,
            Participant {
                name: None,
                room_code: None,
                health: MAX_HEALTH,
                last_state: None,
                outbox: outbox.clone(),
            },
        );
        let _ = outbox.send(ServerMsg::Connected { player_id: id });
        info!(player_id = %id, "Participant connected");
        id
    }

    /// Queue a message to one participant. No-op for unknown or closed peers.
    pub fn send_to(&self, id: Uuid, msg: ServerMsg) {
        let inner = self.inner.lock();
        push(&inner, id, msg);
    }

    /// Create a room with the sender as sole member. Always succeeds; the
    /// code is rejection-sampled until unique among live rooms.
    pub fn create_room(&self, id: Uuid, player_name: String) -> Option<String> {
        let mut inner = self.inner.lock();
        inner.participants.get(&id)?;
        detach_from_room(&mut inner, id);

        let code = generate_room_code(&inner.rooms);
        inner.rooms.insert(
            code.clone(),
            Room {
                members: vec![id],
                started: false,
                created_at: unix_millis(),
            },
        );
        if let Some(participant) = inner.participants.get_mut(&id) {
            participant.name = Some(player_name.clone());
            participant.room_code = Some(code.clone());
            participant.health = MAX_HEALTH;
        }
        push(&inner, id, ServerMsg::RoomCreated { room_code: code.clone() });
        info!(player_id = %id, room_code = %code, player_name = %player_name, "Room created");
        Some(code)
    }

    /// Join an existing room. On success the host hears about the joiner
    /// exactly once, and a full room starts the match for both members.
    pub fn join_room(&self, id: Uuid, code: &str, player_name: String) -> Result<(), JoinError> {
        let mut inner = self.inner.lock();
        if !inner.participants.contains_key(&id) {
            return Err(JoinError::NotFound);
        }

        let host = {
            let room = inner.rooms.get(code).ok_or(JoinError::NotFound)?;
            if room.members.len() >= ROOM_CAPACITY {
                return Err(JoinError::Full);
            }
            room.members.first().copied()
        };

        detach_from_room(&mut inner, id);

        if let Some(participant) = inner.participants.get_mut(&id) {
            participant.name = Some(player_name.clone());
            participant.room_code = Some(code.to_string());
            participant.health = MAX_HEALTH;
        }

        // Tell the host who is coming before membership changes hands.
        if let Some(host_id) = host {
            push(
                &inner,
                host_id,
                ServerMsg::OpponentJoined {
                    opponent_name: player_name.clone(),
                },
            );
        }

        let members = {
            let room = inner.rooms.get_mut(code).ok_or(JoinError::NotFound)?;
            room.members.push(id);
            if room.members.len() == ROOM_CAPACITY {
                room.started = true;
            }
            (room.members.len() == ROOM_CAPACITY).then(|| room.members.clone())
        };

        push(
            &inner,
            id,
            ServerMsg::RoomJoined {
                room_code: code.to_string(),
            },
        );
        info!(player_id = %id, room_code = %code, player_name = %player_name, "Joined room");

        if let Some(members) = members {
            for member in members {
                push(&inner, member, ServerMsg::GameStart);
            }
            info!(room_code = %code, "Game started");
        }
        Ok(())
    }

    /// Remove a participant on disconnect. Idempotent; safe to race with an
    /// in-flight message from the same connection.
    pub fn remove_participant(&self, id: Uuid) {
        let mut inner = self.inner.lock();
        if !inner.participants.contains_key(&id) {
            return;
        }
        detach_from_room(&mut inner, id);
        inner.participants.remove(&id);
        info!(player_id = %id, "Participant disconnected");
    }

    /// Relay a pose snapshot to the other room member, recording the
    /// sender's self-reported health for display.
    pub fn relay_pose(
        &self,
        id: Uuid,
        claimed_room: Option<&str>,
        state: PoseState,
        timestamp: u64,
    ) {
        let mut inner = self.inner.lock();
        let Some(code) = scoped_room(&inner, id, claimed_room) else {
            return;
        };
        if let Some(participant) = inner.participants.get_mut(&id) {
            participant.last_state = Some(state);
        }
        for other in other_members(&inner, &code, id) {
            push(
                &inner,
                other,
                ServerMsg::PlayerState {
                    player_id: id,
                    state,
                    timestamp,
                },
            );
        }
    }

    /// Relay a clash position to the other room member, unvalidated.
    pub fn relay_clash(&self, id: Uuid, claimed_room: Option<&str>, position: Vec3) {
        let inner = self.inner.lock();
        let Some(code) = scoped_room(&inner, id, claimed_room) else {
            return;
        };
        for other in other_members(&inner, &code, id) {
            push(&inner, other, ServerMsg::SaberClash { position });
        }
    }

    /// Authoritative hit application: recompute damage from the part name,
    /// debit the opponent, and end the match if health reaches zero.
    pub fn apply_hit(&self, id: Uuid, claimed_room: Option<&str>, part_name: &str) {
        let mut inner = self.inner.lock();
        let Some(code) = scoped_room(&inner, id, claimed_room) else {
            return;
        };
        let Some(victim) = other_members(&inner, &code, id).into_iter().next() else {
            return;
        };

        let damage = BodyPart::from_name(part_name)
            .map(BodyPart::damage)
            .unwrap_or_else(|| {
                debug!(player_id = %id, part_name = %part_name, "Unknown body part, zero damage");
                0
            });

        let new_health = {
            let Some(participant) = inner.participants.get_mut(&victim) else {
                return;
            };
            participant.health = (participant.health - damage).max(0);
            participant.health
        };

        push(
            &inner,
            victim,
            ServerMsg::PlayerHit {
                damage,
                part_name: part_name.to_string(),
            },
        );
        push(&inner, id, ServerMsg::PlayerDamaged { new_health });

        if new_health == 0 {
            if let Some(room) = inner.rooms.get_mut(&code) {
                room.started = false;
            }
            for member in members_of(&inner, &code) {
                push(&inner, member, ServerMsg::GameOver { winner: id });
            }
            info!(room_code = %code, winner = %id, "Game over");
        }
    }

    /// Rematch handshake: the sender's health resets to 100; once every
    /// member of a full room is back at 100, the room rearms and restarts.
    pub fn request_rematch(&self, id: Uuid, claimed_room: Option<&str>) {
        let mut inner = self.inner.lock();
        let Some(code) = scoped_room(&inner, id, claimed_room) else {
            return;
        };
        let members = members_of(&inner, &code);
        if members.len() < ROOM_CAPACITY {
            return;
        }
        if let Some(participant) = inner.participants.get_mut(&id) {
            participant.health = MAX_HEALTH;
        }

        let all_ready = members.iter().all(|member| {
            inner
                .participants
                .get(member)
                .is_some_and(|p| p.health == MAX_HEALTH)
        });
        if all_ready {
            if let Some(room) = inner.rooms.get_mut(&code) {
                room.started = true;
            }
            for member in members {
                push(&inner, member, ServerMsg::GameStart);
            }
            info!(room_code = %code, "Rematch started");
        }
    }

    /// Authoritative health of a participant, if still connected.
    pub fn health_of(&self, id: Uuid) -> Option<i32> {
        self.inner.lock().participants.get(&id).map(|p| p.health)
    }

    /// Whether the given room is currently in a running match.
    pub fn room_started(&self, code: &str) -> Option<bool> {
        self.inner.lock().rooms.get(code).map(|r| r.started)
    }

    pub fn room_count(&self) -> usize {
        self.inner.lock().rooms.len()
    }

    pub fn participant_count(&self) -> usize {
        self.inner.lock().participants.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fire-and-forget delivery; a closed outbox just drops the message.
fn push(inner: &RegistryInner, id: Uuid, msg: ServerMsg) {
    if let Some(participant) = inner.participants.get(&id) {
        if participant.outbox.send(msg).is_err() {
            debug!(player_id = %id, "Dropped message for closed connection");
        }
    }
}

/// Resolve a room-scoped message: the sender must be in a room and the
/// claimed code must match it, otherwise the message is silently ignored.
fn scoped_room(inner: &RegistryInner, id: Uuid, claimed: Option<&str>) -> Option<String> {
    let participant = inner.participants.get(&id)?;
    let code = participant.room_code.as_deref()?;
    if claimed != Some(code) {
        warn!(player_id = %id, claimed = ?claimed, "Room-scoped message with stale room code");
        return None;
    }
    inner.rooms.contains_key(code).then(|| code.to_string())
}

fn members_of(inner: &RegistryInner, code: &str) -> Vec<Uuid> {
    inner
        .rooms
        .get(code)
        .map(|room| room.members.clone())
        .unwrap_or_default()
}

fn other_members(inner: &RegistryInner, code: &str, id: Uuid) -> Vec<Uuid> {
    members_of(inner, code)
        .into_iter()
        .filter(|member| *member != id)
        .collect()
}

/// Pull a participant out of its room, notifying the remaining member and
/// deleting the room once empty.
fn detach_from_room(inner: &mut RegistryInner, id: Uuid) {
    let Some(code) = inner
        .participants
        .get(&id)
        .and_then(|p| p.room_code.clone())
    else {
        return;
    };
    if let Some(participant) = inner.participants.get_mut(&id) {
        participant.room_code = None;
    }
    if !inner.rooms.contains_key(&code) {
        return;
    }

    let remaining = other_members(inner, &code, id);
    for member in &remaining {
        push(inner, *member, ServerMsg::OpponentLeft);
    }

    let was_started = inner.rooms.get(&code).map(|r| r.started).unwrap_or(false);
    if was_started {
        // Leaving a running match forfeits it.
        if let Some(winner) = remaining.first() {
            push(inner, *winner, ServerMsg::GameOver { winner: *winner });
        }
    }

    if let Some(room) = inner.rooms.get_mut(&code) {
        room.members.retain(|member| *member != id);
        room.started = false;
        if room.members.is_empty() {
            inner.rooms.remove(&code);
            info!(room_code = %code, "Room deleted (empty)");
        }
    }
}

/// Rejection-sample a 4-character [A-Z0-9] code unique among live rooms.
fn generate_room_code(rooms: &HashMap<String, Room>) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let code: String = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_CHARS[rng.gen_range(0..ROOM_CODE_CHARS.len())] as char)
            .collect();
        if !rooms.contains_key(&code) {
            return code;
        }
    }
}
