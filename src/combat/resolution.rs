//! Attack resolution against anatomical targets
//!
//! An attack resolves in order: dodge, hardness, part selection, damage
//! type adjustment, per-part budget cap, hit point loss, major injury
//! (cripple / pulp / sever), and finally the death spiral once hit
//! points cross zero. Severing spawns a new free-standing entity.

use crate::combat::attack::{melee_power, Attack, DamageType, MeleeAttack};
use crate::core::dice;
use crate::core::types::{EntityId, PartId};
use crate::entity::body::PartFlag;
use crate::entity::{Entity, Vitality};
use crate::world::events::Event;
use crate::world::World;

/// Ceiling division for damage budgets
fn ceil_div(value: i32, divisor: u32) -> i32 {
    let divisor = divisor as i32;
    value / divisor + (value % divisor > 0) as i32
}

/// The melee template an entity would strike with: its wielded weapon's
/// first attack mode, or its own first natural attack.
pub fn melee_attack_of(world: &World, id: EntityId) -> Option<MeleeAttack> {
    if let Some(weapon) = world.entity(id).wielded() {
        if let Some(attack) = world.entity(weapon).melee_attacks.first() {
            return Some(attack.clone());
        }
    }
    world.entity(id).melee_attacks.first().cloned()
}

/// Whether an awake defender slips the incoming attack entirely
pub fn dodges(world: &mut World, id: EntityId) -> bool {
    let target = {
        let entity = world.entity(id);
        if !entity.alive() {
            return false;
        }
        entity.speed() as i32 + world.config.dodge_bonus
    };
    dice::roll_3d6(&mut world.rng) <= target
}

/// Roll damage for the attacker's current melee mode and deliver it.
/// Attacking with nothing to attack with is a narrated no-op.
pub fn send_melee_attack(
    world: &mut World,
    attacker: EntityId,
    defender: EntityId,
    target_part: Option<PartId>,
) {
    let Some(template) = melee_attack_of(world, attacker) else {
        let name = world.entity(attacker).name.clone();
        world.emit(Event::visual(format!(
            "The {name} has no way to attack!"
        )));
        world.entity_mut(attacker).delay = world.config.base_action_delay;
        return;
    };
    let st = world.entity(attacker).stats.st;
    let power = melee_power(st, &template, &mut world.rng);
    let attack = Attack {
        power,
        damage_type: template.damage_type,
        target_part,
    };
    resolve_attack(world, attacker, defender, attack);
    world.entity_mut(attacker).delay = world.config.base_action_delay;
}

/// Apply a resolved attack to the defender.
pub fn resolve_attack(world: &mut World, attacker: EntityId, defender: EntityId, attack: Attack) {
    // Dodge short-circuits everything else.
    if world.entity(defender).is_creature() && dodges(world, defender) {
        let attacker_name = world.entity(attacker).name.clone();
        let defender_name = world.entity(defender).name.clone();
        world.emit(
            Event::visual(format!(
                "{attacker_name} attacks the {defender_name}, but it dodges!"
            ))
            .from_entity(defender),
        );
        return;
    }

    let hardness = world.entity(defender).material.hardness;
    let raw = (attack.power - hardness).max(0);

    let part_id = attack
        .target_part
        .unwrap_or_else(|| world.random_part_of(defender));

    // Damage type interacts with what the part is made for.
    let multiplier = {
        let entity = world.entity(defender);
        let part = entity.body.part(part_id);
        match attack.damage_type {
            DamageType::Cut if part.has_flag(PartFlag::Cuttable) => world.config.cut_multiplier,
            DamageType::Pierce if entity.traits.injury_tolerance > 0 => world
                .config
                .pierce_tolerance_multiplier
                .powi(entity.traits.injury_tolerance),
            _ => 1.0,
        }
    };
    let uncapped = (raw as f32 * multiplier) as i32;

    // Parts with a divisor only absorb up to their remaining budget per
    // hit; the uncapped value still decides destruction below.
    let (threshold, applied) = {
        let entity = world.entity(defender);
        let hp_max = entity.hp_max();
        match entity.body.part(part_id).hp_divisor {
            Some(divisor) => {
                let threshold = ceil_div(hp_max, divisor);
                let budget = threshold - entity.body.part(part_id).damage;
                (Some(threshold), uncapped.min(budget.max(0)))
            }
            None => (None, uncapped),
        }
    };

    let was_alive = world.entity(defender).alive();
    {
        let entity = world.entity_mut(defender);
        entity.body.part_mut(part_id).damage += applied;
        entity.hp -= applied;
    }

    let attacker_name = world.entity(attacker).name.clone();
    let defender_name = world.entity(defender).name.clone();
    let part_name = world.entity(defender).body.part(part_id).name.clone();
    world.emit(
        Event::visual(format!(
            "{attacker_name} attacks {defender_name} in the {part_name} for {applied} damage!"
        ))
        .from_entity(attacker),
    );

    if let Some(threshold) = threshold {
        let part = world.entity(defender).body.part(part_id);
        if part.damage >= threshold && !part.has_flag(PartFlag::Crippled) {
            if uncapped > threshold * world.config.destroy_threshold_ratio {
                if attack.damage_type == DamageType::Cut {
                    sever_part(world, defender, part_id);
                    world.emit(Event::visual(format!(
                        "The {defender_name}'s {part_name} is severed by the attack!"
                    )));
                } else {
                    destroy_part(world, defender, part_id);
                    world.emit(Event::visual(format!(
                        "The {defender_name}'s {part_name} is pulped by the attack!"
                    )));
                }
            } else {
                world
                    .entity_mut(defender)
                    .body
                    .part_mut(part_id)
                    .add_flag(PartFlag::Crippled);
                world.emit(Event::visual(format!(
                    "The {defender_name}'s {part_name} is crippled by the blow!"
                )));
            }
        }
    }

    if was_alive && world.entity(defender).is_creature() && world.entity(defender).hp <= 0 {
        death_spiral(world, defender);
    }
}

/// Drop anything held by graspers in the given subtree, clearing the
/// holder references. Run before a subtree leaves the body.
fn release_subtree_grips(world: &mut World, owner: EntityId, part_id: PartId) {
    let held: Vec<EntityId> = world
        .entity(owner)
        .body
        .subtree(part_id)
        .into_iter()
        .filter_map(|id| world.entity(owner).body.part(id).held)
        .collect();
    for item in held {
        world.remove_from(owner, item);
    }
}

/// Remove a pulped part and its subtree outright.
fn destroy_part(world: &mut World, owner: EntityId, part_id: PartId) {
    release_subtree_grips(world, owner, part_id);
    world.entity_mut(owner).body.remove(part_id);
}

/// Detach a subtree into a new free-standing entity next to its former
/// owner.
fn sever_part(world: &mut World, owner: EntityId, part_id: PartId) {
    release_subtree_grips(world, owner, part_id);
    let original_size = world.entity(owner).body.part(part_id).size;
    let severed_body = world.entity_mut(owner).body.detach(part_id);
    let mut stump = Entity::from_severed_part(world.entity(owner), original_size, severed_body);
    stump.position = world.global_position(owner);
    let id = world.add_entity(stump);
    tracing::debug!(owner = %world.entity(owner).name, stump = %world.entity(id).name, "severed");
}

/// Toughness checks once hit points cross zero: each failure makes the
/// next check harder and sticks; running out of retries is death.
fn death_spiral(world: &mut World, id: EntityId) {
    let cap = world.config.death_check_cap;
    let name = world.entity(id).name.clone();
    while world.entity(id).death_checks < cap {
        let ht = world.entity(id).stats.ht;
        let penalty = world.entity(id).death_checks as i32;
        if dice::roll_3d6(&mut world.rng) <= ht - penalty {
            let downed_delay = world.config.downed_delay;
            let entity = world.entity_mut(id);
            if entity.vitality == Vitality::Alive {
                entity.vitality = Vitality::Unconscious;
                entity.delay = downed_delay;
                world.emit(Event::visual(format!("The {name} collapses!")));
            } else {
                world.emit(Event::visual(format!("The {name} evades death.")));
            }
            return;
        }
        world.entity_mut(id).death_checks += 1;
    }
    let downed_delay = world.config.downed_delay;
    let entity = world.entity_mut(id);
    entity.vitality = Vitality::Dead;
    entity.delay = downed_delay;
    entity.glyph.fg = [150, 150, 150];
    entity.glyph.bg = [200, 0, 0];
    world.emit(Event::visual(format!("The {name} is struck down.")));
}
