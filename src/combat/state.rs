//! Per-fighter combat bookkeeping: health, swing tracking, block push-back

use crate::geom::Vec3;
use crate::ws::protocol::SaberAngles;

/// Health every fighter starts a match with.
pub const MAX_HEALTH: i32 = 100;

/// How aggressively the saber chases its target orientation, per second.
pub const SABER_ROTATION_SMOOTHING: f32 = 12.0;

/// Mutable combat state for one fighter. Pure data plus derived metrics;
/// locally it is driven by input, remotely by interpolated snapshots.
#[derive(Debug, Clone)]
pub struct FighterState {
    /// Display health; the relay's value is the one that decides the match
    pub health: i32,
    pub saber_on: bool,
    /// Current saber orientation (tilt, swing)
    pub saber_rotation: SaberAngles,
    /// Orientation the saber is tracking toward
    pub target_saber_rotation: SaberAngles,
    /// Blade tip travel since the previous frame
    pub swing_speed: f32,
    last_tip: Option<Vec3>,
    /// Block window currently overriding target tracking
    pub is_blocked: bool,
    /// Remaining block window, seconds; counted down each frame tick
    pub block_time: f32,
    pub push_back: SaberAngles,
    pub hits_landed: u32,
    pub hits_taken: u32,
    pub clash_count: u32,
}

impl FighterState {
    pub fn new() -> Self {
        Self {
            health: MAX_HEALTH,
            saber_on: true,
            saber_rotation: SaberAngles::default(),
            target_saber_rotation: SaberAngles::default(),
            swing_speed: 0.0,
            last_tip: None,
            is_blocked: false,
            block_time: 0.0,
            push_back: SaberAngles::default(),
            hits_landed: 0,
            hits_taken: 0,
            clash_count: 0,
        }
    }

    /// Back to a fresh-match state (health, counters, block window).
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Clamp-at-zero damage application; returns the new health.
    pub fn apply_damage(&mut self, damage: i32) -> i32 {
        self.health = (self.health - damage).max(0);
        self.health
    }

    pub fn is_defeated(&self) -> bool {
        self.health == 0
    }

    /// Derive swing speed from blade tip travel since the last sample.
    pub fn track_swing(&mut self, tip: Vec3) {
        if let Some(last) = self.last_tip {
            self.swing_speed = tip.distance(last);
        }
        self.last_tip = Some(tip);
    }

    /// Advance the block countdown; the push-back vanishes when it expires.
    pub fn tick_block(&mut self, delta: f32) {
        if self.is_blocked {
            self.block_time -= delta;
            if self.block_time <= 0.0 {
                self.is_blocked = false;
                self.push_back = SaberAngles::default();
            }
        }
    }

    /// One frame of saber orientation tracking: decay the block window,
    /// then ease toward the target plus any active push-back.
    pub fn update_saber(&mut self, delta: f32) {
        self.tick_block(delta);
        let blend = SABER_ROTATION_SMOOTHING * delta;
        self.saber_rotation.x +=
            (self.target_saber_rotation.x + self.push_back.x - self.saber_rotation.x) * blend;
        self.saber_rotation.y +=
            (self.target_saber_rotation.y + self.push_back.y - self.saber_rotation.y) * blend;
    }

    /// Engage a block: the clamped push-back overrides target tracking for
    /// the given window.
    pub fn apply_push_back(&mut self, push: SaberAngles, duration: f32, max: f32) {
        self.push_back = SaberAngles::new(push.x.clamp(-max, max), push.y.clamp(-max, max));
        self.is_blocked = true;
        self.block_time = duration;
    }

    /// Strengthen an active push-back (clash), keeping it within the clamp.
    pub fn intensify_push_back(&mut self, factor: f32, duration: f32, max: f32) {
        self.push_back = SaberAngles::new(
            (self.push_back.x * factor).clamp(-max, max),
            (self.push_back.y * factor).clamp(-max, max),
        );
        self.block_time = duration;
    }
}

impl Default for FighterState {
    fn default() -> Self {
        Self::new()
    }
}
