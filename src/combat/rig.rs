//! Fighter rig: body hitbox layout and blade segment derivation from a pose

use crate::geom::Vec3;
use crate::ws::protocol::{PoseState, SaberAngles};

use super::BodyPart;

/// Saber mount point in the fighter's local frame.
pub const SABER_MOUNT: Vec3 = Vec3::new(0.4, 1.1, 0.3);

pub const HILT_LENGTH: f32 = 0.3;
pub const BLADE_LENGTH: f32 = 1.2;
pub const GLOW_RADIUS: f32 = 0.035;

/// Radius every body hitbox presents to the blade proximity test.
const PART_RADIUS: f32 = 0.2;

/// One strikeable body region, positioned in the fighter's local frame.
#[derive(Debug, Clone, Copy)]
pub struct BodyHitbox {
    pub part: BodyPart,
    pub offset: Vec3,
    pub radius: f32,
}

/// The fighter's body, feet planted at the pose's ground position.
pub const BODY_HITBOXES: [BodyHitbox; 6] = [
    BodyHitbox {
        part: BodyPart::Head,
        offset: Vec3::new(0.0, 1.75, 0.0),
        radius: PART_RADIUS,
    },
    BodyHitbox {
        part: BodyPart::Torso,
        offset: Vec3::new(0.0, 1.2, 0.0),
        radius: PART_RADIUS,
    },
    BodyHitbox {
        part: BodyPart::LeftArm,
        offset: Vec3::new(-0.35, 1.3, 0.0),
        radius: PART_RADIUS,
    },
    BodyHitbox {
        part: BodyPart::RightArm,
        offset: Vec3::new(0.35, 1.3, 0.0),
        radius: PART_RADIUS,
    },
    BodyHitbox {
        part: BodyPart::LeftLeg,
        offset: Vec3::new(-0.12, 0.5, 0.0),
        radius: PART_RADIUS,
    },
    BodyHitbox {
        part: BodyPart::RightLeg,
        offset: Vec3::new(0.12, 0.5, 0.0),
        radius: PART_RADIUS,
    },
];

/// Everything the collision pass needs to place one fighter in the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FighterPose {
    /// Eye-level position; the body stands under it at ground level
    pub position: Vec3,
    /// Body yaw, radians
    pub yaw: f32,
    pub saber: SaberAngles,
    pub saber_on: bool,
}

impl FighterPose {
    pub fn new(position: Vec3, yaw: f32, saber: SaberAngles, saber_on: bool) -> Self {
        Self {
            position,
            yaw,
            saber,
            saber_on,
        }
    }

    pub fn from_state(state: &PoseState) -> Self {
        Self {
            position: state.position,
            yaw: state.rotation,
            saber: state.saber_rotation,
            saber_on: state.saber_on,
        }
    }

    /// Spawn placement before any snapshot has arrived.
    pub fn initial() -> Self {
        Self::from_state(&PoseState::initial())
    }

    /// Ground point the body stands on (the pose position is eye level).
    pub fn body_base(&self) -> Vec3 {
        Vec3::new(self.position.x, 0.0, self.position.z)
    }
}

/// World position of one body hitbox for the given pose.
pub fn part_world_position(pose: &FighterPose, hitbox: &BodyHitbox) -> Vec3 {
    pose.body_base().add(hitbox.offset.rotate_y(pose.yaw))
}

/// Blade segment (base, tip) in world space.
///
/// The blade points along the saber's +Y, tilted about X and swung about Z,
/// all carried by the body yaw.
pub fn saber_segment(pose: &FighterPose) -> (Vec3, Vec3) {
    let mount = pose.body_base().add(SABER_MOUNT.rotate_y(pose.yaw));
    let dir = Vec3::new(0.0, 1.0, 0.0)
        .rotate_z(pose.saber.y)
        .rotate_x(pose.saber.x)
        .rotate_y(pose.yaw);
    let base = mount.add(dir.scale(HILT_LENGTH / 2.0));
    let tip = mount.add(dir.scale(HILT_LENGTH / 2.0 + BLADE_LENGTH + GLOW_RADIUS / 2.0));
    (base, tip)
}
