//! Per-frame block/clash/hit resolution from blade and body geometry

use crate::geom::{closest_segment_distance, point_to_segment_distance};
use crate::ws::protocol::SaberAngles;

use super::rig::{part_world_position, saber_segment, FighterPose, BODY_HITBOXES};
use super::state::FighterState;
use super::{CombatConfig, CombatEvent};

/// Resolve one frame of combat between the local fighter and the opponent.
///
/// Blade-on-blade contact engages a symmetric push-back on both fighters
/// (doubled into a clash when either swing is live); a blocked frame never
/// also scores body hits. Otherwise a live local swing is tested against
/// the opponent's body. Events are returned for the caller to dispatch:
/// over the wire in a networked duel, directly to the opponent's health
/// offline.
pub fn resolve_frame(
    cfg: &CombatConfig,
    local_pose: &FighterPose,
    local: &mut FighterState,
    remote_pose: &FighterPose,
    remote: &mut FighterState,
) -> Vec<CombatEvent> {
    let mut events = Vec::new();

    if local_pose.saber_on && remote_pose.saber_on {
        let (local_base, local_tip) = saber_segment(local_pose);
        let (remote_base, remote_tip) = saber_segment(remote_pose);
        let contact = closest_segment_distance(local_base, local_tip, remote_base, remote_tip);

        if contact.distance < cfg.block_threshold {
            // Push direction in the local fighter's yaw frame: vertical
            // separation tilts the saber, lateral separation swings it.
            let dir = contact
                .on_first
                .sub(contact.on_second)
                .rotate_y(-local_pose.yaw)
                .normalized();
            let strength = (cfg.block_threshold - contact.distance) * cfg.push_back_scale;

            local.apply_push_back(
                SaberAngles::new(dir.y * strength, dir.x * strength),
                cfg.block_duration,
                cfg.max_push_back,
            );
            remote.apply_push_back(
                SaberAngles::new(-dir.y * strength, -dir.x * strength),
                cfg.block_duration,
                cfg.max_push_back,
            );

            let live_swing = local.swing_speed > cfg.min_swing_speed * 0.5
                || remote.swing_speed > cfg.min_swing_speed * 0.5;
            if contact.distance < cfg.clash_distance && live_swing {
                local.clash_count += 1;
                local.intensify_push_back(2.0, cfg.clash_block_duration, cfg.max_push_back);
                remote.intensify_push_back(2.0, cfg.clash_block_duration, cfg.max_push_back);
                events.push(CombatEvent::Clash {
                    position: contact.on_first,
                });
            }
            return events;
        }
    }

    events.extend(check_body_hits(cfg, local_pose, local, remote_pose));
    events
}

/// Test a live blade against every body hitbox of the opponent.
pub fn check_body_hits(
    cfg: &CombatConfig,
    attacker_pose: &FighterPose,
    attacker: &mut FighterState,
    victim_pose: &FighterPose,
) -> Vec<CombatEvent> {
    let mut events = Vec::new();
    if !attacker_pose.saber_on || attacker.swing_speed <= cfg.min_swing_speed {
        return events;
    }

    let (base, tip) = saber_segment(attacker_pose);
    for hitbox in &BODY_HITBOXES {
        let part_position = part_world_position(victim_pose, hitbox);
        if point_to_segment_distance(part_position, base, tip) < hitbox.radius + cfg.hit_radius {
            attacker.hits_landed += 1;
            events.push(CombatEvent::Hit {
                damage: hitbox.part.damage(),
                part: hitbox.part,
            });
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::BodyPart;
    use crate::geom::Vec3;

    fn upright(x: f32, z: f32) -> FighterPose {
        FighterPose::new(Vec3::new(x, 1.7, z), 0.0, SaberAngles::default(), true)
    }

    fn config() -> CombatConfig {
        CombatConfig::default()
    }

    #[test]
    fn near_parallel_blades_engage_a_block_on_both_fighters() {
        let cfg = config();
        let local_pose = upright(0.0, 0.0);
        // Same yaw, offset sideways: blades run parallel 0.13 apart.
        let remote_pose = upright(0.13, 0.0);
        let mut local = FighterState::new();
        let mut remote = FighterState::new();

        let events = resolve_frame(&cfg, &local_pose, &mut local, &remote_pose, &mut remote);

        assert!(events.is_empty());
        assert!(local.is_blocked);
        assert!(remote.is_blocked);
        // Symmetric, opposite push directions.
        assert!(local.push_back.y < 0.0);
        assert!(remote.push_back.y > 0.0);
        assert_eq!(local.push_back.y, -remote.push_back.y);
        assert_eq!(local.clash_count, 0);
    }

    #[test]
    fn close_fast_contact_registers_a_clash() {
        let cfg = config();
        let local_pose = upright(0.0, 0.0);
        let remote_pose = upright(0.05, 0.0);
        let mut local = FighterState::new();
        let mut remote = FighterState::new();
        local.swing_speed = cfg.min_swing_speed;

        let events = resolve_frame(&cfg, &local_pose, &mut local, &remote_pose, &mut remote);

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], CombatEvent::Clash { .. }));
        assert_eq!(local.clash_count, 1);
        assert_eq!(local.block_time, cfg.clash_block_duration);
        assert_eq!(remote.block_time, cfg.clash_block_duration);
    }

    #[test]
    fn slow_contact_blocks_without_clashing() {
        let cfg = config();
        let local_pose = upright(0.0, 0.0);
        let remote_pose = upright(0.05, 0.0);
        let mut local = FighterState::new();
        let mut remote = FighterState::new();

        let events = resolve_frame(&cfg, &local_pose, &mut local, &remote_pose, &mut remote);

        assert!(events.is_empty());
        assert!(local.is_blocked);
        assert_eq!(local.clash_count, 0);
    }

    #[test]
    fn retracted_sabers_never_block_or_clash() {
        let cfg = config();
        let local_pose = upright(0.0, 0.0);
        let mut remote_pose = upright(0.4, 0.3);
        remote_pose.saber_on = false;
        let mut local = FighterState::new();
        let mut remote = FighterState::new();
        local.swing_speed = 1.0;

        let events = resolve_frame(&cfg, &local_pose, &mut local, &remote_pose, &mut remote);

        assert!(!local.is_blocked);
        assert!(!remote.is_blocked);
        // A live swing through the opponent's body still scores.
        assert!(!events.is_empty());
    }

    #[test]
    fn live_swing_through_the_head_scores_head_damage() {
        let cfg = config();
        let local_pose = upright(0.0, 0.0);
        // Opponent stands with their centerline on the local blade
        // (mounted at +0.4/+0.3), saber retracted so no block interferes.
        let mut remote_pose = upright(0.4, 0.3);
        remote_pose.saber_on = false;
        let mut local = FighterState::new();
        let mut remote = FighterState::new();
        local.swing_speed = 0.1;

        let events = resolve_frame(&cfg, &local_pose, &mut local, &remote_pose, &mut remote);

        assert!(events.contains(&CombatEvent::Hit {
            damage: 25,
            part: BodyPart::Head
        }));
        assert_eq!(local.hits_landed as usize, events.len());
    }

    #[test]
    fn slow_swings_do_not_score_hits() {
        let cfg = config();
        let local_pose = upright(0.0, 0.0);
        let mut remote_pose = upright(0.4, 0.3);
        remote_pose.saber_on = false;
        let mut local = FighterState::new();
        let mut remote = FighterState::new();
        local.swing_speed = cfg.min_swing_speed; // not strictly above

        let events = resolve_frame(&cfg, &local_pose, &mut local, &remote_pose, &mut remote);
        assert!(events.is_empty());
        assert_eq!(local.hits_landed, 0);
    }

    #[test]
    fn distant_fighters_produce_no_events() {
        let cfg = config();
        let local_pose = upright(0.0, 0.0);
        let remote_pose = upright(5.0, 5.0);
        let mut local = FighterState::new();
        let mut remote = FighterState::new();
        local.swing_speed = 1.0;

        let events = resolve_frame(&cfg, &local_pose, &mut local, &remote_pose, &mut remote);
        assert!(events.is_empty());
        assert!(!local.is_blocked);
    }
}
