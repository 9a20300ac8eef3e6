//! The duel runtime: one object a presentation layer drives once per frame.
//!
//! Inbound `ServerMsg` frames go through `handle_server_msg`; each rendered
//! frame calls `frame` with the local position/yaw sample, which advances
//! the saber tracking and block countdowns, interpolates the remote
//! fighter, runs the collision resolver, and returns the wire frames to
//! send plus the events the UI should react to. All pacing (pose cadence,
//! ping cadence, block decay) is countdown state advanced by the caller's
//! clock; nothing here schedules callbacks.

use uuid::Uuid;

use crate::combat::rig::saber_segment;
use crate::combat::{
    check_body_hits, resolve_frame, BodyPart, CombatConfig, CombatEvent, FighterPose, FighterState,
};
use crate::geom::Vec3;
use crate::sync::RemoteStateBuffer;
use crate::ws::protocol::{ClientMsg, Envelope, PoseState, ServerMsg};

/// Pose snapshot cadence, milliseconds.
pub const POSE_SEND_INTERVAL_MS: u64 = 50;

/// Latency probe cadence, milliseconds.
pub const PING_INTERVAL_MS: u64 = 2000;

/// Whether combat events travel over the relay or apply locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelMode {
    Online,
    Offline,
}

/// Presentation-facing notifications out of the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum DuelEvent {
    RoomCreated { room_code: String },
    RoomJoined { room_code: String },
    OpponentJoined { opponent_name: String },
    OpponentLeft,
    MatchStarted,
    /// Our blade connected this frame
    HitLanded { damage: i32, part: BodyPart },
    /// A blade connected with us (authoritative damage already applied)
    HitTaken { damage: i32, part_name: String },
    /// Relay confirmation of our hit
    OpponentDamaged { new_health: i32 },
    /// Clash detected locally this frame
    Clash { position: Vec3 },
    /// Clash reported by the opponent's client
    RemoteClash { position: Vec3 },
    GameOver { won: bool },
    LatencyMeasured { rtt_ms: u64 },
    ServerError { message: String },
}

/// Wire frames and events produced by one rendered frame.
#[derive(Debug, Default)]
pub struct FrameOutput {
    pub outbound: Vec<Envelope>,
    pub events: Vec<DuelEvent>,
}

/// Client-side state for one duel, networked or solo.
pub struct DuelClient {
    mode: DuelMode,
    pub player_id: Option<Uuid>,
    pub room_code: Option<String>,
    pub is_host: bool,
    pub opponent_name: String,
    pub started: bool,
    pub game_over: bool,
    pub local: FighterState,
    pub remote: FighterState,
    pub last_rtt_ms: Option<u64>,
    buffer: RemoteStateBuffer,
    cfg: CombatConfig,
    /// Externally driven opponent pose for offline duels
    offline_remote_pose: FighterPose,
    next_pose_send_at: u64,
    next_ping_at: Option<u64>,
}

impl DuelClient {
    pub fn new_online() -> Self {
        Self::new(DuelMode::Online)
    }

    pub fn new_offline() -> Self {
        Self::new(DuelMode::Offline)
    }

    fn new(mode: DuelMode) -> Self {
        Self {
            mode,
            player_id: None,
            room_code: None,
            is_host: false,
            opponent_name: "Opponent".to_string(),
            started: false,
            game_over: false,
            local: FighterState::new(),
            remote: FighterState::new(),
            last_rtt_ms: None,
            buffer: RemoteStateBuffer::new(),
            cfg: CombatConfig::default(),
            offline_remote_pose: FighterPose::initial(),
            next_pose_send_at: 0,
            next_ping_at: None,
        }
    }

    pub fn mode(&self) -> DuelMode {
        self.mode
    }

    /// Wrap a payload in the common envelope fields.
    fn envelope(&self, msg: ClientMsg, now: u64) -> Envelope {
        Envelope {
            player_id: self.player_id,
            room_code: self.room_code.clone(),
            timestamp: Some(now),
            msg,
        }
    }

    pub fn create_room(&self, player_name: &str, now: u64) -> Envelope {
        self.envelope(
            ClientMsg::CreateRoom {
                player_name: player_name.to_string(),
            },
            now,
        )
    }

    /// Room codes are case-insensitive on entry; the wire carries uppercase.
    pub fn join_room(&self, code: &str, player_name: &str, now: u64) -> Envelope {
        Envelope {
            player_id: self.player_id,
            room_code: Some(code.to_uppercase()),
            timestamp: Some(now),
            msg: ClientMsg::JoinRoom {
                player_name: player_name.to_string(),
            },
        }
    }

    pub fn request_rematch(&self, now: u64) -> Option<Envelope> {
        self.room_code.as_ref()?;
        Some(self.envelope(ClientMsg::RequestRematch, now))
    }

    /// Begin a solo duel; the opponent pose is driven via
    /// [`DuelClient::drive_remote_pose`].
    pub fn start_offline(&mut self) {
        self.start_match();
    }

    /// Update the externally simulated opponent (offline duels only).
    pub fn drive_remote_pose(&mut self, pose: FighterPose) {
        self.offline_remote_pose = pose;
    }

    /// The opponent pose to render and collide against this frame.
    pub fn remote_render_pose(&self, now: u64) -> FighterPose {
        match self.mode {
            DuelMode::Online => FighterPose::from_state(&self.buffer.interpolated_pose(now)),
            DuelMode::Offline => self.offline_remote_pose,
        }
    }

    fn start_match(&mut self) {
        self.local.reset();
        self.remote.reset();
        self.buffer.clear();
        self.started = true;
        self.game_over = false;
        self.next_pose_send_at = 0;
    }

    fn finish(&mut self, won: bool, events: &mut Vec<DuelEvent>) {
        if self.game_over {
            return;
        }
        self.game_over = true;
        self.started = false;
        events.push(DuelEvent::GameOver { won });
    }

    /// Consume one relay frame, updating state and surfacing events.
    pub fn handle_server_msg(&mut self, msg: ServerMsg, now: u64) -> Vec<DuelEvent> {
        let mut events = Vec::new();
        match msg {
            ServerMsg::Connected { player_id } => {
                self.player_id = Some(player_id);
                self.next_ping_at = Some(now + PING_INTERVAL_MS);
            }
            ServerMsg::RoomCreated { room_code } => {
                self.room_code = Some(room_code.clone());
                self.is_host = true;
                events.push(DuelEvent::RoomCreated { room_code });
            }
            ServerMsg::RoomJoined { room_code } => {
                self.room_code = Some(room_code.clone());
                self.is_host = false;
                events.push(DuelEvent::RoomJoined { room_code });
            }
            ServerMsg::OpponentJoined { opponent_name } => {
                self.opponent_name = opponent_name.clone();
                events.push(DuelEvent::OpponentJoined { opponent_name });
            }
            ServerMsg::OpponentLeft => {
                if self.started && !self.game_over {
                    self.finish(true, &mut events);
                } else {
                    events.push(DuelEvent::OpponentLeft);
                }
            }
            ServerMsg::GameStart => {
                self.start_match();
                events.push(DuelEvent::MatchStarted);
            }
            ServerMsg::PlayerState {
                state, timestamp, ..
            } => {
                self.buffer.push(state, timestamp, now);
            }
            ServerMsg::PlayerHit { damage, part_name } => {
                self.local.apply_damage(damage);
                self.local.hits_taken += 1;
                events.push(DuelEvent::HitTaken { damage, part_name });
                if self.local.is_defeated() {
                    self.finish(false, &mut events);
                }
            }
            ServerMsg::PlayerDamaged { new_health } => {
                self.remote.health = new_health;
                events.push(DuelEvent::OpponentDamaged { new_health });
                if new_health <= 0 {
                    self.finish(true, &mut events);
                }
            }
            ServerMsg::SaberClash { position } => {
                self.local.clash_count += 1;
                events.push(DuelEvent::RemoteClash { position });
            }
            ServerMsg::GameOver { winner } => {
                let won = self.player_id == Some(winner);
                self.finish(won, &mut events);
            }
            ServerMsg::Pong { client_timestamp } => {
                let rtt_ms = now.saturating_sub(client_timestamp);
                self.last_rtt_ms = Some(rtt_ms);
                events.push(DuelEvent::LatencyMeasured { rtt_ms });
            }
            ServerMsg::Error { message } => {
                events.push(DuelEvent::ServerError { message });
            }
        }
        events
    }

    /// Advance one rendered frame.
    ///
    /// `position`/`yaw` are the local fighter sample for this frame; the
    /// saber orientation comes from the runtime's own tracking state.
    pub fn frame(&mut self, now: u64, delta_secs: f32, position: Vec3, yaw: f32) -> FrameOutput {
        let mut out = FrameOutput::default();

        // Latency probe runs for the whole connection, match or not.
        if self.mode == DuelMode::Online {
            if let Some(next_ping_at) = self.next_ping_at {
                if now >= next_ping_at {
                    out.outbound.push(self.envelope(
                        ClientMsg::Ping {
                            client_timestamp: now,
                        },
                        now,
                    ));
                    self.next_ping_at = Some(now + PING_INTERVAL_MS);
                }
            }
        }

        // Saber tracking and block decay tick every frame regardless; the
        // combat pass only runs while the match is live.
        self.local.update_saber(delta_secs);
        self.remote.tick_block(delta_secs);

        if !self.started || self.game_over {
            return out;
        }

        let local_pose = FighterPose::new(
            position,
            yaw,
            self.local.saber_rotation,
            self.local.saber_on,
        );
        let remote_pose = self.remote_render_pose(now);
        self.remote.saber_on = remote_pose.saber_on;

        // Swing speed: blade tip travel since the previous frame.
        self.local.track_swing(saber_segment(&local_pose).1);
        self.remote.track_swing(saber_segment(&remote_pose).1);

        let combat_events = resolve_frame(
            &self.cfg,
            &local_pose,
            &mut self.local,
            &remote_pose,
            &mut self.remote,
        );
        self.dispatch_combat(combat_events, true, now, &mut out);

        // Offline, the opponent swings back through the same resolver.
        if self.mode == DuelMode::Offline && !self.game_over {
            let return_hits =
                check_body_hits(&self.cfg, &remote_pose, &mut self.remote, &local_pose);
            self.dispatch_combat(return_hits, false, now, &mut out);
        }

        // Periodic pose snapshot toward the relay.
        if self.mode == DuelMode::Online && now >= self.next_pose_send_at {
            let state = PoseState {
                position,
                rotation: yaw,
                saber_rotation: self.local.saber_rotation,
                saber_on: self.local.saber_on,
                health: self.local.health,
            };
            out.outbound
                .push(self.envelope(ClientMsg::PlayerState { state }, now));
            self.next_pose_send_at = now + POSE_SEND_INTERVAL_MS;
        }

        out
    }

    /// Turn resolver events into wire traffic (online) or immediate damage
    /// (offline). `from_local` is false for the offline opponent's swings.
    fn dispatch_combat(
        &mut self,
        combat_events: Vec<CombatEvent>,
        from_local: bool,
        now: u64,
        out: &mut FrameOutput,
    ) {
        for event in combat_events {
            match event {
                CombatEvent::Hit { damage, part } => {
                    if from_local {
                        out.events.push(DuelEvent::HitLanded { damage, part });
                        match self.mode {
                            DuelMode::Online => {
                                out.outbound.push(self.envelope(
                                    ClientMsg::PlayerHit {
                                        damage,
                                        part_name: part.name().to_string(),
                                    },
                                    now,
                                ));
                            }
                            DuelMode::Offline => {
                                if self.remote.apply_damage(damage) == 0 {
                                    self.finish(true, &mut out.events);
                                }
                            }
                        }
                    } else {
                        // Offline opponent connected with us.
                        self.local.apply_damage(damage);
                        self.local.hits_taken += 1;
                        out.events.push(DuelEvent::HitTaken {
                            damage,
                            part_name: part.name().to_string(),
                        });
                        if self.local.is_defeated() {
                            self.finish(false, &mut out.events);
                        }
                    }
                }
                CombatEvent::Clash { position } => {
                    out.events.push(DuelEvent::Clash { position });
                    if self.mode == DuelMode::Online {
                        out.outbound
                            .push(self.envelope(ClientMsg::SaberClash { position }, now));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_online_client(now: u64) -> DuelClient {
        let mut client = DuelClient::new_online();
        client.handle_server_msg(
            ServerMsg::Connected {
                player_id: Uuid::new_v4(),
            },
            now,
        );
        client.handle_server_msg(
            ServerMsg::RoomCreated {
                room_code: "AB12".to_string(),
            },
            now,
        );
        client.handle_server_msg(ServerMsg::GameStart, now);
        client
    }

    fn outbound_kinds(out: &FrameOutput) -> Vec<&'static str> {
        out.outbound
            .iter()
            .map(|envelope| match envelope.msg {
                ClientMsg::CreateRoom { .. } => "create_room",
                ClientMsg::JoinRoom { .. } => "join_room",
                ClientMsg::PlayerState { .. } => "player_state",
                ClientMsg::SaberClash { .. } => "saber_clash",
                ClientMsg::PlayerHit { .. } => "player_hit",
                ClientMsg::RequestRematch => "request_rematch",
                ClientMsg::Ping { .. } => "ping",
            })
            .collect()
    }

    #[test]
    fn room_lifecycle_updates_identity_and_emits_events() {
        let mut client = DuelClient::new_online();
        let id = Uuid::new_v4();

        assert!(client
            .handle_server_msg(ServerMsg::Connected { player_id: id }, 0)
            .is_empty());
        assert_eq!(client.player_id, Some(id));

        let events = client.handle_server_msg(
            ServerMsg::RoomCreated {
                room_code: "ZX90".to_string(),
            },
            0,
        );
        assert_eq!(
            events,
            vec![DuelEvent::RoomCreated {
                room_code: "ZX90".to_string()
            }]
        );
        assert!(client.is_host);

        let events = client.handle_server_msg(ServerMsg::GameStart, 0);
        assert_eq!(events, vec![DuelEvent::MatchStarted]);
        assert!(client.started);
    }

    #[test]
    fn pose_snapshots_go_out_at_the_configured_cadence() {
        let mut client = started_online_client(1000);

        let out = client.frame(1000, 0.016, Vec3::new(0.0, 1.7, 3.0), 0.0);
        assert_eq!(outbound_kinds(&out), vec!["player_state"]);

        // Too soon: nothing.
        let out = client.frame(1016, 0.016, Vec3::new(0.0, 1.7, 3.0), 0.0);
        assert!(outbound_kinds(&out).is_empty());

        // Past the interval: next snapshot.
        let out = client.frame(1055, 0.016, Vec3::new(0.0, 1.7, 3.0), 0.0);
        assert_eq!(outbound_kinds(&out), vec!["player_state"]);
    }

    #[test]
    fn pings_fire_every_two_seconds_once_connected() {
        let mut client = started_online_client(1000);

        let out = client.frame(2999, 0.016, Vec3::ZERO, 0.0);
        assert!(!outbound_kinds(&out).contains(&"ping"));

        let out = client.frame(3000, 0.016, Vec3::ZERO, 0.0);
        assert!(outbound_kinds(&out).contains(&"ping"));

        // Pong updates the round-trip estimate.
        let events = client.handle_server_msg(
            ServerMsg::Pong {
                client_timestamp: 3000,
            },
            3085,
        );
        assert_eq!(events, vec![DuelEvent::LatencyMeasured { rtt_ms: 85 }]);
        assert_eq!(client.last_rtt_ms, Some(85));
    }

    #[test]
    fn incoming_snapshots_feed_the_interpolation_buffer() {
        let mut client = started_online_client(1000);
        let mut state = PoseState::initial();
        state.position = Vec3::new(0.0, 1.7, 0.0);
        client.handle_server_msg(
            ServerMsg::PlayerState {
                player_id: Uuid::new_v4(),
                state,
                timestamp: 1000,
            },
            1000,
        );
        state.position = Vec3::new(10.0, 1.7, 0.0);
        client.handle_server_msg(
            ServerMsg::PlayerState {
                player_id: Uuid::new_v4(),
                state,
                timestamp: 1100,
            },
            1100,
        );

        let pose = client.remote_render_pose(1150);
        assert!((pose.position.x - 5.0).abs() < 1e-4);
    }

    #[test]
    fn networked_hits_leave_damage_to_the_relay() {
        let mut client = started_online_client(1000);
        // Swing the blade through the opponent standing on it.
        let mut state = PoseState::initial();
        state.position = Vec3::new(0.4, 1.7, 0.3);
        state.saber_on = false;
        for (ts, x) in [(900, 0.4f32), (1000, 0.4)] {
            state.position.x = x;
            client.handle_server_msg(
                ServerMsg::PlayerState {
                    player_id: Uuid::new_v4(),
                    state,
                    timestamp: ts,
                },
                ts,
            );
        }

        // Two frames with the local fighter drifting so the blade tip moves.
        client.frame(1080, 0.016, Vec3::new(0.0, 1.7, -0.05), 0.0);
        let out = client.frame(1100, 0.016, Vec3::new(0.0, 1.7, 0.0), 0.0);

        let kinds = outbound_kinds(&out);
        assert!(kinds.contains(&"player_hit"));
        assert!(out
            .events
            .iter()
            .any(|e| matches!(e, DuelEvent::HitLanded { .. })));
        // Local model of the opponent is untouched until player_damaged.
        assert_eq!(client.remote.health, 100);

        let events = client.handle_server_msg(ServerMsg::PlayerDamaged { new_health: 60 }, 1100);
        assert_eq!(events, vec![DuelEvent::OpponentDamaged { new_health: 60 }]);
        assert_eq!(client.remote.health, 60);
    }

    #[test]
    fn offline_hits_apply_immediately_and_can_end_the_match() {
        let mut client = DuelClient::new_offline();
        client.start_offline();
        client.remote.health = 25;

        // Opponent stands on the local blade, saber retracted.
        let mut opponent = FighterPose::initial();
        opponent.position = Vec3::new(0.4, 1.7, 0.3);
        opponent.saber_on = false;
        client.drive_remote_pose(opponent);

        client.frame(0, 0.016, Vec3::new(0.0, 1.7, -0.05), 0.0);
        let out = client.frame(20, 0.016, Vec3::new(0.0, 1.7, 0.0), 0.0);

        assert!(out.outbound.is_empty());
        assert!(out
            .events
            .iter()
            .any(|e| matches!(e, DuelEvent::HitLanded { .. })));
        assert!(out.events.contains(&DuelEvent::GameOver { won: true }));
        assert_eq!(client.remote.health, 0);
        assert!(client.game_over);
    }

    #[test]
    fn taking_a_fatal_hit_loses_the_match() {
        let mut client = started_online_client(1000);
        client.local.health = 25;

        let events = client.handle_server_msg(
            ServerMsg::PlayerHit {
                damage: 25,
                part_name: "head".to_string(),
            },
            1000,
        );
        assert_eq!(
            events,
            vec![
                DuelEvent::HitTaken {
                    damage: 25,
                    part_name: "head".to_string()
                },
                DuelEvent::GameOver { won: false },
            ]
        );
        assert!(client.game_over);
        assert_eq!(client.local.hits_taken, 1);
    }

    #[test]
    fn opponent_leaving_mid_match_wins_the_duel() {
        let mut client = started_online_client(1000);
        let events = client.handle_server_msg(ServerMsg::OpponentLeft, 2000);
        assert_eq!(events, vec![DuelEvent::GameOver { won: true }]);

        // Outside a match it is only a lobby notification.
        let mut lobby_client = DuelClient::new_online();
        let events = lobby_client.handle_server_msg(ServerMsg::OpponentLeft, 0);
        assert_eq!(events, vec![DuelEvent::OpponentLeft]);
    }

    #[test]
    fn game_over_is_idempotent_across_server_and_local_paths() {
        let mut client = started_online_client(1000);
        let me = client.player_id.unwrap();
        client.local.health = 10;

        let events = client.handle_server_msg(
            ServerMsg::PlayerHit {
                damage: 15,
                part_name: "torso".to_string(),
            },
            1000,
        );
        assert!(events.contains(&DuelEvent::GameOver { won: false }));

        // The server's own game_over arrives afterwards; no duplicate event.
        let events = client.handle_server_msg(ServerMsg::GameOver { winner: me }, 1001);
        assert!(events.is_empty());
    }

    #[test]
    fn rematch_restores_both_fighters_and_rearms_the_duel() {
        let mut client = started_online_client(1000);
        client.local.apply_damage(100);
        client.game_over = true;
        client.started = false;

        let envelope = client.request_rematch(5000).unwrap();
        assert_eq!(envelope.msg, ClientMsg::RequestRematch);
        assert_eq!(envelope.room_code.as_deref(), Some("AB12"));

        let events = client.handle_server_msg(ServerMsg::GameStart, 6000);
        assert_eq!(events, vec![DuelEvent::MatchStarted]);
        assert!(client.started);
        assert!(!client.game_over);
        assert_eq!(client.local.health, 100);
        assert_eq!(client.remote.health, 100);
    }
}
