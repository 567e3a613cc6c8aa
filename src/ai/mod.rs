//! Goal-stack decision engine
//!
//! Each minded actor carries a stack of goals; the scheduler re-enters
//! the engine every turn. `think` expands the top of the stack until a
//! concrete action surfaces, then `perform_action` executes it. The
//! stack never runs dry: SURVIVE is restored as a floor whenever it
//! empties.

use ahash::AHashSet;
use rand::Rng;

use crate::combat::{ranged, resolution};
use crate::core::types::{Delta, EntityId, PartId, Point, MOORE_NEIGHBORHOOD};
use crate::world::World;

/// An abstract intention, or a concrete action ready to execute
#[derive(Debug, Clone, PartialEq)]
pub enum Goal {
    /// Floor goal: watch for hostiles, engage the nearest
    Survive,
    /// Bring a specific enemy down
    Kill(EntityId),
    /// Close to within `goal_distance` of the target
    Approach {
        target: EntityId,
        goal_distance: i32,
    },
    /// Walk toward a position until it can be seen clearly
    Investigate(Point),
    /// Already decided; execute as-is
    Act(Action),
}

/// A concrete action the actor can spend its turn on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Wait,
    Move(Delta),
    Strike {
        target: EntityId,
        part: Option<PartId>,
    },
    Shoot(EntityId),
}

/// Per-actor decision state
#[derive(Debug, Default)]
pub struct Mind {
    pub goals: Vec<Goal>,
    /// Enemies noticed at any point, whether currently visible or not
    pub known_hostiles: AHashSet<EntityId>,
}

impl Mind {
    pub fn new() -> Self {
        Self {
            goals: vec![Goal::Survive],
            known_hostiles: AHashSet::new(),
        }
    }
}

/// What one expansion step did with the top goal
enum Expansion {
    /// A concrete action surfaced
    Act(Action),
    /// The stack changed; look at the new top
    Continue,
}

/// Run one scheduler turn for a minded actor.
pub fn take_turn(world: &mut World, id: EntityId) {
    let mut mind = world
        .entity_mut(id)
        .mind
        .take()
        .expect("take_turn on mindless entity");
    let action = think(world, id, &mut mind);
    tracing::debug!(actor = %world.entity(id).name, ?action, "acting");
    perform_action(world, id, action);
    world.entity_mut(id).mind = Some(mind);
}

/// Drain the goal stack until a concrete action surfaces. The loop is
/// bounded: a stack that keeps rewriting itself without deciding
/// anything falls back to waiting.
fn think(world: &mut World, id: EntityId, mind: &mut Mind) -> Action {
    for _ in 0..world.config.max_goal_expansions {
        if mind.goals.is_empty() {
            mind.goals.push(Goal::Survive);
        }
        let top = mind.goals.last().cloned().expect("stack is non-empty");
        match process_goal(world, id, mind, top) {
            Expansion::Act(action) => return action,
            Expansion::Continue => {}
        }
    }
    tracing::warn!(
        actor = %world.entity(id).name,
        "goal stack produced no action within bounds"
    );
    Action::Wait
}

fn process_goal(world: &mut World, id: EntityId, mind: &mut Mind, goal: Goal) -> Expansion {
    match goal {
        Goal::Survive => expand_survive(world, id, mind),
        Goal::Kill(target) => expand_kill(world, id, mind, target),
        Goal::Approach {
            target,
            goal_distance,
        } => expand_approach(world, id, mind, target, goal_distance),
        Goal::Investigate(point) => expand_investigate(world, id, mind, point),
        Goal::Act(action) => {
            mind.goals.pop();
            Expansion::Act(action)
        }
    }
}

fn expand_survive(world: &mut World, id: EntityId, mind: &mut Mind) -> Expansion {
    let Some(position) = world.entity(id).position else {
        return Expansion::Act(Action::Wait);
    };

    // Note every visible creature from an unfriendly faction.
    for seen in world.visible_entities_from(position) {
        if seen == id {
            continue;
        }
        let other = world.entity(seen);
        if other.is_creature() && world.entity(id).factions.is_disjoint(&other.factions) {
            mind.known_hostiles.insert(seen);
        }
    }

    // Of the hostiles we know about, which are still live threats?
    let epsilon = world.config.visibility_epsilon;
    let mut threats: Vec<(i32, EntityId)> = mind
        .known_hostiles
        .iter()
        .filter(|&&h| world.entity(h).alive())
        .filter_map(|&h| {
            let hostile_position = world.global_position(h)?;
            let seen = world
                .map
                .visibility_between(position, hostile_position, epsilon)
                > 0.0;
            seen.then_some((position.distance(&hostile_position), h))
        })
        .collect();

    if threats.is_empty() {
        // Nothing to fight: idle, sometimes shuffling around.
        let mobile = !world.entity(id).traits.immobile;
        if mobile && world.rng.gen_range(0..10) < world.config.wander_chance {
            let step = MOORE_NEIGHBORHOOD[world.rng.gen_range(0..MOORE_NEIGHBORHOOD.len())];
            return Expansion::Act(Action::Move(step));
        }
        return Expansion::Act(Action::Wait);
    }

    threats.sort_by_key(|&(distance, _)| distance);
    let (_, nearest) = threats[0];
    // SURVIVE stays beneath the new goal.
    mind.goals.push(Goal::Kill(nearest));
    Expansion::Continue
}

fn expand_kill(world: &mut World, id: EntityId, mind: &mut Mind, target: EntityId) -> Expansion {
    if !world.entity(target).alive() {
        mind.goals.pop();
        return Expansion::Continue;
    }
    let (Some(position), Some(target_position)) = (
        world.entity(id).position,
        world.global_position(target),
    ) else {
        mind.goals.pop();
        return Expansion::Continue;
    };

    if ranged::ranged_attack_of(world, id).is_some() {
        let epsilon = world.config.visibility_epsilon;
        if world
            .map
            .visibility_between(position, target_position, epsilon)
            > 0.0
        {
            return Expansion::Act(Action::Shoot(target));
        }
        // No line of fire; close in instead.
    }

    let Some(melee) = resolution::melee_attack_of(world, id) else {
        // Nothing to fight with; give up on this target.
        mind.goals.pop();
        return Expansion::Continue;
    };

    let distance = position.distance(&target_position);
    if melee.reach.contains(&distance) {
        return Expansion::Act(Action::Strike { target, part: None });
    }
    if distance < melee.min_reach() {
        // Weapon too long for close quarters: back off if we can.
        if !world.entity(id).traits.immobile {
            let (dx, dy) = target_position.delta_to(&position);
            let away = (dx.signum(), dy.signum());
            return Expansion::Act(Action::Move(away));
        }
        return Expansion::Act(Action::Wait);
    }
    mind.goals.push(Goal::Approach {
        target,
        goal_distance: 1,
    });
    Expansion::Continue
}

fn expand_approach(
    world: &mut World,
    id: EntityId,
    mind: &mut Mind,
    target: EntityId,
    goal_distance: i32,
) -> Expansion {
    let (Some(position), Some(target_position)) = (
        world.entity(id).position,
        world.global_position(target),
    ) else {
        mind.goals.pop();
        return Expansion::Continue;
    };
    if position.distance(&target_position) <= goal_distance {
        mind.goals.pop();
        return Expansion::Continue;
    }
    match world.map.next_step_towards(position, target_position) {
        Some(next) => Expansion::Act(Action::Move(position.delta_to(&next))),
        // No path: stay put rather than grind against walls.
        None => Expansion::Act(Action::Wait),
    }
}

fn expand_investigate(world: &mut World, id: EntityId, mind: &mut Mind, point: Point) -> Expansion {
    let Some(position) = world.entity(id).position else {
        mind.goals.pop();
        return Expansion::Continue;
    };
    let epsilon = world.config.visibility_epsilon;
    let satisfied = position == point
        || world.entity(id).traits.immobile
        || world.map.visibility_between(position, point, epsilon)
            > world.config.investigate_visibility;
    if satisfied {
        mind.goals.pop();
        return Expansion::Continue;
    }
    match world.map.next_step_towards(position, point) {
        Some(next) => Expansion::Act(Action::Move(position.delta_to(&next))),
        None => {
            mind.goals.pop();
            Expansion::Continue
        }
    }
}

fn perform_action(world: &mut World, id: EntityId, action: Action) {
    match action {
        Action::Wait => {
            let delay = world.config.base_action_delay;
            let entity = world.entity_mut(id);
            entity.delay = delay;
            // Waiting on a tracked target steadies the aim.
            if let Some(aim) = &mut entity.aim {
                aim.bonus += 1;
            }
        }
        Action::Move(delta) => {
            world.entity_mut(id).aim = None;
            world.move_entity(id, delta);
        }
        Action::Strike { target, part } => {
            resolution::send_melee_attack(world, id, target, part);
        }
        Action::Shoot(target) => {
            ranged::shoot(world, id, target, None);
        }
    }
}
