//! Ranged attacks: skill, range bands, aiming, and rate of fire

use crate::combat::attack::{ranged_power, Attack, RangedAttack};
use crate::combat::resolution::resolve_attack;
use crate::core::dice;
use crate::core::types::EntityId;
use crate::entity::AimState;
use crate::world::events::Event;
use crate::world::World;

/// Loudness of a shot, in perception-check units
const SHOT_VOLUME: i32 = 8;

/// The ranged template an entity could fire: its wielded weapon's first
/// ranged mode, or its own.
pub fn ranged_attack_of(world: &World, id: EntityId) -> Option<RangedAttack> {
    if let Some(weapon) = world.entity(id).wielded() {
        if let Some(attack) = world.entity(weapon).ranged_attacks.first() {
            return Some(attack.clone());
        }
    }
    world.entity(id).ranged_attacks.first().cloned()
}

/// Start (or continue) tracking a target. The accumulated bonus only
/// survives waits spent on the same target.
pub fn begin_aim(world: &mut World, shooter: EntityId, target: EntityId) {
    let entity = world.entity_mut(shooter);
    match entity.aim {
        Some(aim) if aim.target == target => {}
        _ => entity.aim = Some(AimState { target, bonus: 0 }),
    }
}

/// Distance penalty on effective skill: flat handling penalty at point
/// blank, log-scaled falloff beyond.
fn range_penalty(distance: i32, attack: &RangedAttack) -> i32 {
    if distance <= 1 {
        attack.bulk
    } else {
        ((distance as f32).ln() / 1.5f32.ln()).floor() as i32
    }
}

/// Fire at a target. Effective skill folds in target and part size, the
/// range penalty, and any accumulated aim; the hit margin buys extra
/// shots for weapons that cycle fast enough.
pub fn shoot(
    world: &mut World,
    shooter: EntityId,
    target: EntityId,
    target_part: Option<crate::core::types::PartId>,
) {
    let shooter_name = world.entity(shooter).name.clone();
    let Some(template) = ranged_attack_of(world, shooter) else {
        world.emit(Event::visual(format!(
            "The {shooter_name} has nothing to shoot with!"
        )));
        world.entity_mut(shooter).delay = world.config.base_action_delay;
        return;
    };
    let (Some(position), Some(target_position)) = (
        world.global_position(shooter),
        world.global_position(target),
    ) else {
        world.entity_mut(shooter).delay = world.config.base_action_delay;
        return;
    };
    let distance = position.distance(&target_position);
    if distance > template.max_range {
        world.emit(Event::visual(format!(
            "The {shooter_name}'s shot cannot reach that far."
        )));
        world.entity_mut(shooter).delay = world.config.base_action_delay;
        return;
    }
    let epsilon = world.config.visibility_epsilon;
    if world
        .map
        .visibility_between(position, target_position, epsilon)
        <= 0.0
    {
        world.emit(Event::visual(format!(
            "The {shooter_name} has no clear shot!"
        )));
        world.entity_mut(shooter).delay = world.config.base_action_delay;
        return;
    }

    let base_skill = world.entity(shooter).stats.dx;
    let mut size_adjustment = world.entity(target).stats.size;
    if let Some(part) = target_part {
        size_adjustment += world.entity(target).body.part(part).size;
    }
    let aim_bonus = match world.entity(shooter).aim {
        Some(aim) if aim.target == target => aim.bonus.min(template.accuracy),
        _ => 0,
    };
    let effective =
        base_skill + size_adjustment - range_penalty(distance, &template) + aim_bonus;

    // The shot is heard whether or not it lands.
    world.emit(
        Event::noise("a sharp report", SHOT_VOLUME, position).from_entity(shooter),
    );

    let roll = dice::roll_3d6(&mut world.rng);
    if roll > effective {
        let target_name = world.entity(target).name.clone();
        world.emit(Event::visual(format!(
            "{shooter_name} fires at {target_name} and misses!"
        )));
    } else {
        let margin = effective - roll;
        let extra = (margin / template.recoil.max(1)).min(template.rof as i32 - 1);
        let shots = 1 + extra.max(0);
        tracing::debug!(%shooter_name, shots, margin, "shots landed");
        for _ in 0..shots {
            if !world.entity(target).alive() {
                break;
            }
            let power = ranged_power(&template, &mut world.rng);
            resolve_attack(
                world,
                shooter,
                target,
                Attack {
                    power,
                    damage_type: template.damage_type,
                    target_part,
                },
            );
        }
    }

    // Firing spoils the steadied aim but keeps tracking the target.
    if let Some(aim) = &mut world.entity_mut(shooter).aim {
        aim.bonus = 0;
    }
    world.entity_mut(shooter).delay = world.config.base_action_delay;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::attack::{DamageType, Skill};
    use crate::core::config::SimConfig;
    use crate::core::types::{Material, MatterState, Point};
    use crate::entity::template::TemplateLibrary;
    use crate::entity::Entity;
    use crate::spatial::{Tile, TileMap};
    use serde_json::json;

    fn rifle_template() -> RangedAttack {
        RangedAttack {
            skill: Skill::Rifle,
            damage_type: DamageType::Pierce,
            power_dice: 6,
            power_mod: 0,
            accuracy: 4,
            bulk: 5,
            rof: 1,
            recoil: 2,
            max_range: 40,
        }
    }

    fn open_world(size: i32) -> World {
        let air = Material {
            name: "air".into(),
            state: MatterState::Gas,
            density: 0.0,
            hardness: 0,
            opacity: 0.0,
            texture: '.',
        };
        let stone = Material {
            name: "stone".into(),
            state: MatterState::Solid,
            density: 3.0,
            hardness: 6,
            opacity: 1.0,
            texture: '#',
        };
        let mut map = TileMap::new(size, size);
        for x in 0..size {
            for y in 0..size {
                map.set(
                    Point::new(x, y),
                    Tile::new(air.clone(), stone.clone(), air.clone()),
                );
            }
        }
        World::new(map, SimConfig::default(), 42)
    }

    fn spawn_shooter(world: &mut World, at: Point) -> EntityId {
        let mut library = TemplateLibrary::new();
        library.insert("marksman", json!({"bodyplan": "humanoid", "mind": true}));
        let data = library.compose(&["marksman"]).unwrap();
        let mut entity =
            Entity::from_template_data("Marksman", Some(at), &data, Material::flesh(), false);
        entity.ranged_attacks.push(rifle_template());
        world.add_entity(entity)
    }

    fn spawn_dummy(world: &mut World, at: Point) -> EntityId {
        let mut library = TemplateLibrary::new();
        library.insert("dummy", json!({"bodyplan": "humanoid"}));
        let data = library.compose(&["dummy"]).unwrap();
        let entity =
            Entity::from_template_data("Dummy", Some(at), &data, Material::flesh(), false);
        world.add_entity(entity)
    }

    #[test]
    fn test_range_penalty_shape() {
        let rifle = rifle_template();
        // Point blank pays the handling penalty.
        assert_eq!(range_penalty(1, &rifle), 5);
        // Log-scaled beyond: grows slowly with distance.
        let near = range_penalty(4, &rifle);
        let far = range_penalty(30, &rifle);
        assert!(near < far);
        assert!(far <= 9);
    }

    #[test]
    fn test_shot_emits_noise_and_resolves() {
        let mut world = open_world(20);
        let shooter = spawn_shooter(&mut world, Point::new(1, 1));
        let dummy = spawn_dummy(&mut world, Point::new(10, 1));

        shoot(&mut world, shooter, dummy, None);

        let events = world.drain_events();
        assert!(events.iter().any(|e| e.sound.is_some()));
        // Either a miss line or a damage line follows the report.
        assert!(events.len() >= 2);
        assert_eq!(world.entity(shooter).delay, 10);
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let mut world = open_world(60);
        let shooter = spawn_shooter(&mut world, Point::new(1, 1));
        let dummy = spawn_dummy(&mut world, Point::new(55, 1));

        shoot(&mut world, shooter, dummy, None);

        let events = world.drain_events();
        assert!(events.iter().any(|e| e.primary().contains("cannot reach")));
        assert_eq!(world.entity(dummy).hp, world.entity(dummy).hp_max());
    }

    #[test]
    fn test_aim_accumulates_and_caps() {
        let mut world = open_world(20);
        let shooter = spawn_shooter(&mut world, Point::new(1, 1));
        let dummy = spawn_dummy(&mut world, Point::new(10, 1));

        begin_aim(&mut world, shooter, dummy);
        for _ in 0..6 {
            if let Some(aim) = &mut world.entity_mut(shooter).aim {
                aim.bonus += 1;
            }
        }
        let aim = world.entity(shooter).aim.unwrap();
        assert_eq!(aim.target, dummy);
        assert_eq!(aim.bonus, 6);

        shoot(&mut world, shooter, dummy, None);
        // Tracking survives the shot, the steadied bonus does not.
        let aim = world.entity(shooter).aim.unwrap();
        assert_eq!(aim.bonus, 0);
    }

    #[test]
    fn test_retargeting_resets_aim() {
        let mut world = open_world(20);
        let shooter = spawn_shooter(&mut world, Point::new(1, 1));
        let first = spawn_dummy(&mut world, Point::new(10, 1));
        let second = spawn_dummy(&mut world, Point::new(1, 10));

        begin_aim(&mut world, shooter, first);
        world.entity_mut(shooter).aim.as_mut().unwrap().bonus = 3;
        begin_aim(&mut world, shooter, second);
        assert_eq!(world.entity(shooter).aim.unwrap().bonus, 0);
    }

    #[test]
    fn test_unarmed_shooter_is_narrated_noop() {
        let mut world = open_world(10);
        let dummy_a = spawn_dummy(&mut world, Point::new(1, 1));
        let dummy_b = spawn_dummy(&mut world, Point::new(2, 2));

        shoot(&mut world, dummy_a, dummy_b, None);

        let events = world.drain_events();
        assert!(events
            .iter()
            .any(|e| e.primary().contains("nothing to shoot with")));
    }
}
