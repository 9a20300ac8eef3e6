//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geom::Vec3;

/// Saber orientation angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SaberAngles {
    /// Tilt up/down
    pub x: f32,
    /// Swing left/right
    pub y: f32,
}

impl SaberAngles {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One sampled fighter pose, sent inside `player_state` frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseState {
    pub position: Vec3,
    /// Body yaw in radians
    pub rotation: f32,
    pub saber_rotation: SaberAngles,
    pub saber_on: bool,
    /// Sender's self-reported health; display only, never combat authority
    pub health: i32,
}

impl PoseState {
    /// Spawn pose used before any snapshot has arrived.
    pub fn initial() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -3.0),
            rotation: 0.0,
            saber_rotation: SaberAngles::default(),
            saber_on: true,
            health: 100,
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Open a new room and wait for an opponent
    #[serde(rename_all = "camelCase")]
    CreateRoom { player_name: String },

    /// Join an existing room by code (code travels in the envelope)
    #[serde(rename_all = "camelCase")]
    JoinRoom { player_name: String },

    /// Periodic pose snapshot, relayed verbatim to the opponent
    PlayerState { state: PoseState },

    /// Blade-on-blade clash position, relayed verbatim
    SaberClash { position: Vec3 },

    /// Claimed hit; the server recomputes damage from the part name
    #[serde(rename_all = "camelCase")]
    PlayerHit { damage: i32, part_name: String },

    /// Reset health to 100 and rearm the room once both sides have done so
    RequestRematch,

    /// Latency probe
    #[serde(rename_all = "camelCase")]
    Ping { client_timestamp: u64 },
}

/// Common fields every client frame carries alongside the tagged payload.
///
/// `player_id` is checked against the connection's assigned id (anti-spoof);
/// `room_code` must name the sender's current room for room-scoped messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_code: Option<String>,
    /// Sender's monotonic clock, milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(flatten)]
    pub msg: ClientMsg,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Delivered once per connection, assigns identity
    #[serde(rename_all = "camelCase")]
    Connected { player_id: Uuid },

    #[serde(rename_all = "camelCase")]
    RoomCreated { room_code: String },

    #[serde(rename_all = "camelCase")]
    RoomJoined { room_code: String },

    /// Sent to the host when a joiner arrives
    #[serde(rename_all = "camelCase")]
    OpponentJoined { opponent_name: String },

    /// Sent to the remaining member on peer disconnect
    OpponentLeft,

    /// Sent to both members once the room is full (or rearmed for a rematch)
    GameStart,

    /// Opponent pose snapshot, relayed from the other member
    #[serde(rename_all = "camelCase")]
    PlayerState {
        player_id: Uuid,
        state: PoseState,
        timestamp: u64,
    },

    /// Opponent-reported clash position
    SaberClash { position: Vec3 },

    /// You were hit: authoritative damage and the part that took it
    #[serde(rename_all = "camelCase")]
    PlayerHit { damage: i32, part_name: String },

    /// Your hit landed: opponent's new authoritative health
    #[serde(rename_all = "camelCase")]
    PlayerDamaged { new_health: i32 },

    /// Match ended; `winner` is the winning participant id
    GameOver { winner: Uuid },

    #[serde(rename_all = "camelCase")]
    Pong { client_timestamp: u64 },

    /// Malformed input or room-lookup failure
    Error { message: String },
}
