//! Combat core: fighter state, body rig, and the per-frame resolver

pub mod resolver;
pub mod rig;
pub mod state;

pub use resolver::{check_body_hits, resolve_frame};
pub use rig::{saber_segment, FighterPose, BODY_HITBOXES};
pub use state::{FighterState, MAX_HEALTH};

use crate::geom::Vec3;

/// Body regions that can take a hit, with their authoritative damage values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyPart {
    Head,
    Torso,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl BodyPart {
    /// Parse a wire part name. Unknown names yield `None` (zero damage).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "head" => Some(Self::Head),
            "torso" => Some(Self::Torso),
            "leftArm" => Some(Self::LeftArm),
            "rightArm" => Some(Self::RightArm),
            "leftLeg" => Some(Self::LeftLeg),
            "rightLeg" => Some(Self::RightLeg),
            _ => None,
        }
    }

    /// Wire name of this part.
    pub fn name(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Torso => "torso",
            Self::LeftArm => "leftArm",
            Self::RightArm => "rightArm",
            Self::LeftLeg => "leftLeg",
            Self::RightLeg => "rightLeg",
        }
    }

    /// Damage dealt by a saber hit on this part.
    pub fn damage(self) -> i32 {
        match self {
            Self::Head => 25,
            Self::Torso => 15,
            Self::LeftArm | Self::RightArm | Self::LeftLeg | Self::RightLeg => 10,
        }
    }
}

/// Outcome of one frame of collision resolution, dispatched but never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CombatEvent {
    /// The local blade struck an opponent body part.
    Hit { damage: i32, part: BodyPart },
    /// Blade-on-blade impact with sufficient swing speed.
    Clash { position: Vec3 },
}

/// Tuning knobs for block/clash/hit detection.
#[derive(Debug, Clone, Copy)]
pub struct CombatConfig {
    /// Blade distance below which a block engages
    pub block_threshold: f32,
    /// Blade distance below which a fast contact counts as a clash
    pub clash_distance: f32,
    /// Minimum tip speed for a swing to be "live"
    pub min_swing_speed: f32,
    /// Global reach added to each body hitbox radius
    pub hit_radius: f32,
    /// Angular push-back per unit of blade overlap
    pub push_back_scale: f32,
    /// Push-back clamp, radians
    pub max_push_back: f32,
    /// Block push-back window, seconds
    pub block_duration: f32,
    /// Extended window after a clash, seconds
    pub clash_block_duration: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            block_threshold: 0.15,
            clash_distance: 0.12,
            min_swing_speed: 0.02,
            hit_radius: 0.08,
            push_back_scale: 15.0,
            max_push_back: std::f32::consts::FRAC_PI_4,
            block_duration: 0.1,
            clash_block_duration: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_names_round_trip() {
        for part in [
            BodyPart::Head,
            BodyPart::Torso,
            BodyPart::LeftArm,
            BodyPart::RightArm,
            BodyPart::LeftLeg,
            BodyPart::RightLeg,
        ] {
            assert_eq!(BodyPart::from_name(part.name()), Some(part));
        }
    }

    #[test]
    fn unknown_part_names_are_rejected() {
        assert_eq!(BodyPart::from_name("tail"), None);
        assert_eq!(BodyPart::from_name(""), None);
        assert_eq!(BodyPart::from_name("HEAD"), None);
    }

    #[test]
    fn damage_table_matches_the_authoritative_values() {
        assert_eq!(BodyPart::Head.damage(), 25);
        assert_eq!(BodyPart::Torso.damage(), 15);
        assert_eq!(BodyPart::LeftArm.damage(), 10);
        assert_eq!(BodyPart::RightLeg.damage(), 10);
    }
}
