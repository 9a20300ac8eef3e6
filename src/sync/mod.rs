//! Client-side buffering and time-delayed interpolation of the remote
//! fighter's pose.
//!
//! Snapshots are rendered a fixed delay in the past so irregular arrival
//! times smooth out; discrete fields (saber on, health) are never
//! interpolated. Arrival order is assumed non-decreasing in timestamp; an
//! out-of-order snapshot simply falls through to the newest-snapshot path.

use std::collections::VecDeque;

use crate::ws::protocol::{PoseState, SaberAngles};

/// How far in the past the remote fighter is rendered, milliseconds.
pub const INTERPOLATION_DELAY_MS: u64 = 100;

/// Snapshots older than this are pruned on every insert, milliseconds.
pub const BUFFER_RETENTION_MS: u64 = 1000;

/// One buffered snapshot with its origination timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPose {
    pub state: PoseState,
    pub timestamp: u64,
}

/// Append-ordered snapshot buffer for one remote fighter.
#[derive(Debug)]
pub struct RemoteStateBuffer {
    entries: VecDeque<TimedPose>,
    delay_ms: u64,
    retention_ms: u64,
}

impl RemoteStateBuffer {
    pub fn new() -> Self {
        Self::with_delay(INTERPOLATION_DELAY_MS)
    }

    pub fn with_delay(delay_ms: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            delay_ms,
            retention_ms: BUFFER_RETENTION_MS,
        }
    }

    /// Append a snapshot and prune everything older than the retention
    /// window relative to `now`.
    pub fn push(&mut self, state: PoseState, timestamp: u64, now: u64) {
        self.entries.push_back(TimedPose { state, timestamp });
        let cutoff = now.saturating_sub(self.retention_ms);
        self.entries.retain(|entry| entry.timestamp > cutoff);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Pose at `now` minus the interpolation delay.
    ///
    /// With fewer than two snapshots the most recent one is returned
    /// verbatim (or the spawn pose if none exist). When the render time
    /// falls outside the buffered range, the newest snapshot wins.
    pub fn interpolated_pose(&self, now: u64) -> PoseState {
        let render_time = now.saturating_sub(self.delay_ms);

        if self.entries.len() < 2 {
            return self
                .entries
                .back()
                .map(|entry| entry.state)
                .unwrap_or_else(PoseState::initial);
        }

        let mut bracket = None;
        for i in 0..self.entries.len() - 1 {
            let older = self.entries[i];
            let newer = self.entries[i + 1];
            if older.timestamp <= render_time && newer.timestamp >= render_time {
                bracket = Some((older, newer));
                break;
            }
        }

        let Some((older, newer)) = bracket else {
            return self.entries.back().map(|entry| entry.state).unwrap_or_else(PoseState::initial);
        };

        let span = newer.timestamp.saturating_sub(older.timestamp);
        let t = if span == 0 {
            0.0
        } else {
            (render_time - older.timestamp) as f32 / span as f32
        };

        PoseState {
            position: older.state.position.lerp(newer.state.position, t),
            rotation: older.state.rotation + (newer.state.rotation - older.state.rotation) * t,
            saber_rotation: SaberAngles::new(
                older.state.saber_rotation.x
                    + (newer.state.saber_rotation.x - older.state.saber_rotation.x) * t,
                older.state.saber_rotation.y
                    + (newer.state.saber_rotation.y - older.state.saber_rotation.y) * t,
            ),
            // Discrete fields take the later snapshot verbatim.
            saber_on: newer.state.saber_on,
            health: newer.state.health,
        }
    }
}

impl Default for RemoteStateBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec3;
    use assert_approx_eq::assert_approx_eq;

    fn pose_at_x(x: f32) -> PoseState {
        PoseState {
            position: Vec3::new(x, 0.0, 0.0),
            rotation: 0.0,
            saber_rotation: SaberAngles::default(),
            saber_on: true,
            health: 100,
        }
    }

    #[test]
    fn empty_buffer_yields_the_spawn_pose() {
        let buffer = RemoteStateBuffer::new();
        assert_eq!(buffer.interpolated_pose(5000), PoseState::initial());
    }

    #[test]
    fn single_snapshot_is_returned_verbatim() {
        let mut buffer = RemoteStateBuffer::new();
        let pose = pose_at_x(7.0);
        buffer.push(pose, 1000, 1000);
        assert_eq!(buffer.interpolated_pose(1200), pose);
    }

    #[test]
    fn midpoint_query_interpolates_linearly() {
        let mut buffer = RemoteStateBuffer::new();
        buffer.push(pose_at_x(0.0), 1000, 1000);
        buffer.push(pose_at_x(10.0), 1100, 1100);

        // Render time 1050 = now 1150 minus the 100 ms delay.
        let pose = buffer.interpolated_pose(1150);
        assert_approx_eq!(pose.position.x, 5.0, 1e-5);
    }

    #[test]
    fn interpolation_covers_rotation_and_saber_angles() {
        let mut buffer = RemoteStateBuffer::new();
        let mut older = pose_at_x(0.0);
        older.rotation = 1.0;
        older.saber_rotation = SaberAngles::new(0.0, -0.4);
        let mut newer = pose_at_x(4.0);
        newer.rotation = 2.0;
        newer.saber_rotation = SaberAngles::new(0.8, 0.0);

        buffer.push(older, 1000, 1000);
        buffer.push(newer, 1100, 1100);

        let pose = buffer.interpolated_pose(1125); // render time 1025
        assert_approx_eq!(pose.position.x, 1.0, 1e-5);
        assert_approx_eq!(pose.rotation, 1.25, 1e-5);
        assert_approx_eq!(pose.saber_rotation.x, 0.2, 1e-5);
        assert_approx_eq!(pose.saber_rotation.y, -0.3, 1e-5);
    }

    #[test]
    fn discrete_fields_come_from_the_later_snapshot() {
        let mut buffer = RemoteStateBuffer::new();
        let mut older = pose_at_x(0.0);
        older.saber_on = true;
        older.health = 100;
        let mut newer = pose_at_x(10.0);
        newer.saber_on = false;
        newer.health = 60;

        buffer.push(older, 1000, 1000);
        buffer.push(newer, 1100, 1100);

        let pose = buffer.interpolated_pose(1150);
        assert!(!pose.saber_on);
        assert_eq!(pose.health, 60);
    }

    #[test]
    fn query_outside_the_buffered_range_returns_the_newest() {
        let mut buffer = RemoteStateBuffer::new();
        buffer.push(pose_at_x(0.0), 1000, 1000);
        buffer.push(pose_at_x(10.0), 1100, 1100);

        // Render time far past the newest snapshot.
        let pose = buffer.interpolated_pose(5000);
        assert_approx_eq!(pose.position.x, 10.0, 1e-5);

        // Render time before the oldest snapshot: also the newest, since no
        // bracketing pair exists.
        let pose = buffer.interpolated_pose(900);
        assert_approx_eq!(pose.position.x, 10.0, 1e-5);
    }

    #[test]
    fn inserts_prune_expired_snapshots() {
        let mut buffer = RemoteStateBuffer::new();
        buffer.push(pose_at_x(1.0), 1000, 1000);
        buffer.push(pose_at_x(2.0), 1500, 1500);
        assert_eq!(buffer.len(), 2);

        // This insert arrives 1.2 s after the first snapshot's timestamp.
        buffer.push(pose_at_x(3.0), 2200, 2200);
        assert_eq!(buffer.len(), 2);
        assert_approx_eq!(buffer.interpolated_pose(4000).position.x, 3.0, 1e-5);
    }
}
