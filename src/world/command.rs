//! Player commands
//!
//! The input collaborator translates keys into these symbols and hands
//! them over strictly between scheduler cycles. Illegal commands never
//! error: they degrade to narrative events, and most still cost time.

use crate::combat::{ranged, resolution};
use crate::core::types::{Delta, EntityId, PartId};
use crate::world::events::Event;
use crate::world::World;

/// A discrete order from the player
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerCommand {
    Move(Delta),
    Wait,
    /// Pass a single tick, for fine-grained timing
    Rest,
    PickUp(EntityId),
    Drop(EntityId),
    AttackDirection {
        direction: Delta,
        part: Option<PartId>,
    },
    Aim(EntityId),
    Fire {
        target: EntityId,
        part: Option<PartId>,
    },
}

/// Apply one player command. The caller runs `world.process()` after.
pub fn apply(world: &mut World, command: PlayerCommand) {
    let Some(player) = world.player() else {
        return;
    };
    match command {
        PlayerCommand::Move(delta) => {
            world.entity_mut(player).aim = None;
            world.move_entity(player, delta);
        }
        PlayerCommand::Wait => {
            let delay = world.config.base_action_delay;
            let entity = world.entity_mut(player);
            entity.delay = delay;
            if let Some(aim) = &mut entity.aim {
                aim.bonus += 1;
            }
        }
        PlayerCommand::Rest => {
            world.entity_mut(player).delay = 1;
        }
        PlayerCommand::PickUp(target) => {
            let name = world.entity(target).name.clone();
            if world.pick_up(player, target) {
                world.emit(Event::visual(format!("You grab the {name}.")));
            } else {
                world.emit(Event::visual(format!("Unable to pick up the {name}.")));
            }
        }
        PlayerCommand::Drop(target) => {
            let name = world.entity(target).name.clone();
            if world.drop_item(player, target) {
                world.emit(Event::visual(format!("You drop the {name}.")));
            }
        }
        PlayerCommand::AttackDirection { direction, part } => {
            let Some(position) = world.entity(player).position else {
                return;
            };
            let cell = position.offset(direction);
            match world.entities_at(cell).first().copied() {
                Some(target) => resolution::send_melee_attack(world, player, target, part),
                None => {
                    world.emit(Event::visual("Whoosh!"));
                    world.entity_mut(player).delay += world.config.base_action_delay;
                }
            }
        }
        PlayerCommand::Aim(target) => {
            ranged::begin_aim(world, player, target);
            world.entity_mut(player).delay = world.config.base_action_delay;
        }
        PlayerCommand::Fire { target, part } => {
            ranged::shoot(world, player, target, part);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimConfig;
    use crate::core::types::{Material, MatterState, Point};
    use crate::entity::template::TemplateLibrary;
    use crate::entity::Entity;
    use crate::spatial::{Tile, TileMap};
    use serde_json::json;

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

    fn library() -> TemplateLibrary {
        let mut library = TemplateLibrary::new();
        library.insert(
            "human",
            json!({
                "bodyplan": "humanoid",
                "mind": true,
                "melee_attacks": [{
                    "skill": "brawling", "quality": 0, "muscle": "thrust",
                    "damage_type": "bash", "damage_mod": -2,
                    "st_requirement": -1, "reach": [0, 1]
                }]
            }),
        );
        library.insert("rock", json!({}));
        library
    }

    fn spawn_player(world: &mut World, at: Point) -> EntityId {
        let data = library().compose(&["human"]).unwrap();
        let entity = Entity::from_template_data("Player", Some(at), &data, Material::flesh(), true);
        world.add_entity(entity)
    }

    #[test]
    fn test_move_command() {
        let mut world = open_world(10);
        let player = spawn_player(&mut world, Point::new(4, 4));
        apply(&mut world, PlayerCommand::Move((1, 0)));
        assert_eq!(world.entity(player).position, Some(Point::new(5, 4)));
        assert!(world.entity(player).delay > 0);
    }

    #[test]
    fn test_attack_empty_cell_whooshes() {
        let mut world = open_world(10);
        let player = spawn_player(&mut world, Point::new(4, 4));
        apply(
            &mut world,
            PlayerCommand::AttackDirection {
                direction: (0, 1),
                part: None,
            },
        );
        let events = world.drain_events();
        assert!(events.iter().any(|e| e.primary() == "Whoosh!"));
        assert_eq!(world.entity(player).delay, 10);
    }

    #[test]
    fn test_attack_direction_hits_occupant() {
        let mut world = open_world(10);
        let _player = spawn_player(&mut world, Point::new(4, 4));
        let data = library().compose(&["rock"]).unwrap();
        let rock = world.add_entity(Entity::from_template_data(
            "Boulder",
            Some(Point::new(4, 5)),
            &data,
            Material::flesh(),
            false,
        ));
        apply(
            &mut world,
            PlayerCommand::AttackDirection {
                direction: (0, 1),
                part: None,
            },
        );
        assert!(world.entity(rock).hp <= world.entity(rock).hp_max());
        let events = world.drain_events();
        assert!(events.iter().any(|e| e.primary().contains("attacks")));
    }

    #[test]
    fn test_wait_steadies_aim() {
        let mut world = open_world(10);
        let player = spawn_player(&mut world, Point::new(4, 4));
        let data = library().compose(&["rock"]).unwrap();
        let mark = world.add_entity(Entity::from_template_data(
            "Mark",
            Some(Point::new(8, 4)),
            &data,
            Material::flesh(),
            false,
        ));
        apply(&mut world, PlayerCommand::Aim(mark));
        apply(&mut world, PlayerCommand::Wait);
        apply(&mut world, PlayerCommand::Wait);
        assert_eq!(world.entity(player).aim.unwrap().bonus, 2);
        // Moving abandons the track.
        apply(&mut world, PlayerCommand::Move((0, 1)));
        assert!(world.entity(player).aim.is_none());
    }
}
