//! World state and the delay-based turn scheduler
//!
//! The world owns every entity, the tile map, the RNG, and the event
//! queue. Entities refer to each other and to the world by index only;
//! anything that touches more than one entity (movement, containment,
//! attacks, spawning) is a world operation, so there is exactly one
//! mutation path for shared state.

pub mod command;
pub mod events;
pub mod loader;

use ahash::AHashMap;
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

use crate::ai::Goal;
use crate::core::config::SimConfig;
use crate::core::dice;
use crate::core::types::{is_diagonal, Delta, EntityId, Glyph, Point, Tick};
use crate::entity::{Entity, Vitality};
use crate::spatial::TileMap;
use events::Event;

/// A sound waiting to be offered to nearby minds on the next tick
#[derive(Debug, Clone, Copy)]
struct SoundPing {
    position: Point,
    volume: i32,
    source: Option<EntityId>,
}

pub struct World {
    pub config: SimConfig,
    pub map: TileMap,
    pub rng: ChaCha8Rng,
    pub current_tick: Tick,
    entities: Vec<Entity>,
    /// Entity ids sorted by delay; stable order breaks ties
    pending: Vec<EntityId>,
    events: VecDeque<Event>,
    buckets: AHashMap<Point, Vec<EntityId>>,
    pending_sounds: Vec<SoundPing>,
    player: Option<EntityId>,
}

impl World {
    pub fn new(map: TileMap, config: SimConfig, seed: u64) -> Self {
        Self {
            config,
            map,
            rng: ChaCha8Rng::seed_from_u64(seed),
            current_tick: 0,
            entities: Vec::new(),
            pending: Vec::new(),
            events: VecDeque::new(),
            buckets: AHashMap::new(),
            pending_sounds: Vec::new(),
            player: None,
        }
    }

    // === entity arena ===

    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        if entity.is_player {
            self.player = Some(id);
        }
        if let Some(pos) = entity.position {
            self.buckets.entry(pos).or_default().push(id);
        }
        self.entities.push(entity);
        self.pending.push(id);
        id
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.index()]
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> {
        (0..self.entities.len() as u32).map(EntityId)
    }

    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    /// Anatomy-weighted random part of an entity's body
    pub fn random_part_of(&mut self, id: EntityId) -> crate::core::types::PartId {
        let Self { entities, rng, .. } = self;
        entities[id.index()].body.weighted_random_part(rng)
    }

    /// Resolve an entity's map position through its container chain.
    /// Containment is acyclic, so the walk always terminates.
    pub fn global_position(&self, id: EntityId) -> Option<Point> {
        let mut current = id;
        loop {
            let entity = &self.entities[current.index()];
            if let Some(pos) = entity.position {
                return Some(pos);
            }
            current = entity.container?;
        }
    }

    // === events ===

    pub fn emit(&mut self, event: Event) {
        if event.sound.is_some() {
            if let Some(position) = event.position {
                self.pending_sounds.push(SoundPing {
                    position,
                    volume: event.volume,
                    source: event.source,
                });
            }
        }
        tracing::trace!(event = event.primary(), "event");
        self.events.push_back(event);
    }

    /// Hand the queued narrative events to the presenter
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    // === scheduler ===

    fn sort_pending(&mut self) {
        let entities = &self.entities;
        // Stable by construction: ties keep their current sequence order.
        self.pending.sort_by_key(|id| entities[id.index()].delay);
    }

    /// Advance the world one tick: every delay drops by one, queued
    /// sounds are offered to minds once, then every ready non-player
    /// entity acts, re-sorting after each act since an update may change
    /// any entity's delay.
    pub fn tick(&mut self) {
        self.current_tick += 1;
        for entity in &mut self.entities {
            entity.delay -= 1;
        }
        self.offer_sounds();
        loop {
            self.sort_pending();
            let Some(&front) = self.pending.first() else {
                return;
            };
            let entity = &self.entities[front.index()];
            if entity.is_player || entity.delay > 0 {
                return;
            }
            self.update_entity(front);
        }
    }

    /// Run ticks until the player is next up and ready, then yield to
    /// the input loop. A playerless world (headless runs) is driven by
    /// calling `tick` directly instead.
    pub fn process(&mut self) {
        if self.player.is_none() {
            return;
        }
        loop {
            self.sort_pending();
            let Some(&front) = self.pending.first() else {
                return;
            };
            let entity = &self.entities[front.index()];
            if entity.is_player && entity.delay <= 0 {
                return;
            }
            self.tick();
        }
    }

    fn update_entity(&mut self, id: EntityId) {
        let entity = &self.entities[id.index()];
        let downed = entity.vitality != Vitality::Alive;
        let minded = entity.mind.is_some();
        tracing::trace!(name = %entity.name, tick = self.current_tick, "update");

        if downed {
            self.entities[id.index()].delay = self.config.downed_delay;
        } else if minded {
            crate::ai::take_turn(self, id);
        } else {
            // Inert objects sleep for a long, slightly uneven while.
            let delay = self.rng.gen_range(1000..10000);
            self.entities[id.index()].delay = delay;
        }
    }

    /// Offer last tick's sounds to every mind. A sound is noticed on a
    /// roll under intelligence plus volume minus distance, and only
    /// interrupts an actor that is not already committed to something.
    fn offer_sounds(&mut self) {
        let pings = std::mem::take(&mut self.pending_sounds);
        for ping in pings {
            for index in 0..self.entities.len() {
                let id = EntityId(index as u32);
                if ping.source == Some(id) {
                    continue;
                }
                let entity = &self.entities[index];
                if entity.mind.is_none() || !entity.alive() {
                    continue;
                }
                let Some(position) = entity.position else {
                    continue;
                };
                let target = entity.stats.iq + ping.volume - position.distance(&ping.position);
                if dice::roll_3d6(&mut self.rng) > target {
                    continue;
                }
                let name = self.entities[index].name.clone();
                let mind = self.entities[index]
                    .mind
                    .as_mut()
                    .expect("checked above");
                if matches!(mind.goals.last(), Some(Goal::Survive)) {
                    tracing::debug!(%name, position = ?ping.position, "investigating sound");
                    mind.goals.push(Goal::Investigate(ping.position));
                }
            }
        }
    }

    // === movement & spatial queries ===

    fn rebucket(&mut self, id: EntityId, from: Option<Point>, to: Option<Point>) {
        if let Some(from) = from {
            if let Some(bucket) = self.buckets.get_mut(&from) {
                bucket.retain(|&e| e != id);
            }
        }
        if let Some(to) = to {
            self.buckets.entry(to).or_default().push(id);
        }
    }

    /// Step an entity one cell. Impassable terrain costs a beat of
    /// hesitation instead of a move. Returns whether the move happened.
    pub fn move_entity(&mut self, id: EntityId, delta: Delta) -> bool {
        let Some(old) = self.entities[id.index()].position else {
            return false;
        };
        let destination = old.offset(delta);
        match self.map.get(destination).traversal_cost() {
            Some(cost) => {
                let cost = if is_diagonal(delta) {
                    (cost as f32 * 1.4) as i32
                } else {
                    cost
                };
                let speed = self.entities[id.index()].speed().max(0.25);
                let entity = &mut self.entities[id.index()];
                entity.position = Some(destination);
                entity.delay = (cost as f32 / speed).ceil() as i32;
                self.rebucket(id, Some(old), Some(destination));
                true
            }
            None => {
                self.entities[id.index()].delay = self.config.base_action_delay;
                false
            }
        }
    }

    pub fn entities_at(&self, point: Point) -> Vec<EntityId> {
        self.buckets.get(&point).cloned().unwrap_or_default()
    }

    /// Entities on or next to `id`'s cell, excluding `id` itself
    pub fn adjacent_entities(&self, id: EntityId) -> Vec<EntityId> {
        let Some(position) = self.entities[id.index()].position else {
            return Vec::new();
        };
        let mut found = self.entities_at(position);
        for neighbor in position.neighbors() {
            found.extend(self.entities_at(neighbor));
        }
        found.retain(|&e| e != id);
        found
    }

    /// Every entity whose global position has line of sight to `origin`
    pub fn visible_entities_from(&self, origin: Point) -> Vec<EntityId> {
        let epsilon = self.config.visibility_epsilon;
        self.ids()
            .filter_map(|id| {
                let position = self.global_position(id)?;
                let seen = self.map.visibility_between(origin, position, epsilon) > 0.0;
                seen.then_some(id)
            })
            .collect()
    }

    // === containment ===

    /// Put `target` inside `container`. Refuses self-containment and
    /// anything that would close a containment loop.
    pub fn insert_into(&mut self, container: EntityId, target: EntityId) -> bool {
        if container == target
            || self.entities[target.index()].container.is_some()
            || self.entities[container.index()].contents.contains(&target)
        {
            return false;
        }
        // Walk up from the container; finding the target would cycle.
        let mut cursor = Some(container);
        while let Some(current) = cursor {
            if current == target {
                return false;
            }
            cursor = self.entities[current.index()].container;
        }

        let old_position = self.entities[target.index()].position.take();
        self.rebucket(target, old_position, None);
        self.entities[target.index()].container = Some(container);
        self.entities[container.index()].contents.push(target);
        true
    }

    /// Take `target` out of `container`, dropping it at the container's
    /// global position and releasing any grasper holding it.
    pub fn remove_from(&mut self, container: EntityId, target: EntityId) -> bool {
        if !self.entities[container.index()].contents.contains(&target) {
            return false;
        }
        let drop_at = self.global_position(container);
        self.entities[target.index()].container = None;
        self.entities[target.index()].position = drop_at;
        self.rebucket(target, None, drop_at);
        self.entities[container.index()]
            .contents
            .retain(|&e| e != target);

        let body = &mut self.entities[container.index()].body;
        for part_id in body.parts() {
            if body.part(part_id).held == Some(target) {
                body.part_mut(part_id).held = None;
                break;
            }
        }
        true
    }

    /// Whether `target` consents to being picked up by `picker`:
    /// items always do, awake creatures dodge and then contest strength.
    fn can_be_picked_up(&mut self, picker: EntityId, target: EntityId) -> bool {
        if !self.entities[target.index()].is_creature()
            || !self.entities[target.index()].alive()
        {
            return true;
        }
        if crate::combat::resolution::dodges(self, target) {
            let name = self.entities[target.index()].name.clone();
            self.emit(Event::visual(format!("The {name} dodges the grab!")));
            return false;
        }
        self.entities[picker.index()].stats.st > self.entities[target.index()].stats.st
    }

    /// Grab an adjacent entity with a free grasper
    pub fn pick_up(&mut self, picker: EntityId, target: EntityId) -> bool {
        if picker == target {
            return false;
        }
        let Some(grasper) = self.entities[picker.index()].free_grasper() else {
            return false;
        };
        if !self.can_be_picked_up(picker, target) {
            return false;
        }
        if !self.insert_into(picker, target) {
            return false;
        }
        self.entities[picker.index()].body.part_mut(grasper).held = Some(target);
        self.entities[picker.index()].delay += self.config.base_action_delay;
        true
    }

    /// Drop something the actor is carrying
    pub fn drop_item(&mut self, actor: EntityId, target: EntityId) -> bool {
        if !self.remove_from(actor, target) {
            return false;
        }
        self.entities[actor.index()].delay += self.config.base_action_delay;
        true
    }

    // === presenter contracts ===

    /// Position-to-glyph layer for every visible entity, drawn in
    /// ascending size order so the largest thing in a cell wins.
    pub fn render_snapshot(&self, visible: &AHashMap<Point, f32>) -> AHashMap<Point, Glyph> {
        let mut order: Vec<EntityId> = self.ids().collect();
        order.sort_by_key(|id| self.entities[id.index()].stats.size);
        let mut grid = AHashMap::new();
        for id in order {
            let entity = &self.entities[id.index()];
            if let Some(position) = entity.position {
                if visible.contains_key(&position) {
                    grid.insert(position, entity.glyph.clone());
                }
            }
        }
        grid
    }

    /// Lines the examine view shows for a cell
    pub fn describe_at(&self, point: Point) -> Vec<String> {
        let mut lines: Vec<String> = self
            .entities_at(point)
            .into_iter()
            .map(|id| {
                let entity = &self.entities[id.index()];
                format!("{} {}/{}", entity.name, entity.hp, entity.hp_max())
            })
            .collect();
        lines.extend(self.map.get(point).describe());
        lines
    }

    /// Indented listing of everything an entity carries, recursively
    pub fn contents_tree(&self, id: EntityId) -> Vec<String> {
        fn walk(world: &World, id: EntityId, depth: usize, out: &mut Vec<String>) {
            for &child in &world.entities[id.index()].contents {
                out.push(format!(
                    "{}{}",
                    "  ".repeat(depth),
                    world.entities[child.index()].name
                ));
                walk(world, child, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        walk(self, id, 0, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Material, MatterState};
    use crate::entity::template::TemplateLibrary;
    use crate::spatial::Tile;
    use serde_json::json;

    fn air() -> Material {
        Material {
            name: "air".into(),
            state: MatterState::Gas,
            density: 0.0,
            hardness: 0,
            opacity: 0.0,
            texture: '.',
        }
    }

    fn stone() -> Material {
        Material {
            name: "stone".into(),
            state: MatterState::Solid,
            density: 3.0,
            hardness: 6,
            opacity: 1.0,
            texture: '#',
        }
    }

    fn open_world(size: i32) -> World {
        let mut map = TileMap::new(size, size);
        for x in 0..size {
            for y in 0..size {
                map.set(Point::new(x, y), Tile::new(air(), stone(), air()));
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
        library.insert("zombie", json!({"factions": ["monster"]}));
        library.insert("rock", json!({"display": {"character": "."}}));
        library
    }

    fn spawn(world: &mut World, name: &str, template: &[&str], at: Point) -> EntityId {
        let data = library().compose(template).unwrap();
        let entity = Entity::from_template_data(name, Some(at), &data, Material::flesh(), false);
        world.add_entity(entity)
    }

    #[test]
    fn test_scheduler_updates_ready_entities_in_stable_order() {
        let mut world = open_world(10);
        // Two hostile monsters flanking a bystander; one slow straggler.
        let a = spawn(&mut world, "First", &["human", "zombie"], Point::new(2, 2));
        let b = spawn(&mut world, "Second", &["human", "zombie"], Point::new(4, 2));
        let target = spawn(&mut world, "Bystander", &["human"], Point::new(3, 2));
        let c = spawn(&mut world, "Straggler", &["human", "zombie"], Point::new(8, 8));

        world.entity_mut(a).delay = 0;
        world.entity_mut(b).delay = 0;
        world.entity_mut(target).delay = 50;
        world.entity_mut(c).delay = 5;

        world.tick();

        // Both ready entities acted (their delays were reassigned), the
        // straggler only counted down.
        assert!(world.entity(a).delay > 0);
        assert!(world.entity(b).delay > 0);
        assert_eq!(world.entity(c).delay, 4);

        // Insertion order broke the tie: First acted before Second.
        let events = world.drain_events();
        let attackers: Vec<&str> = events
            .iter()
            .filter(|e| e.primary().contains("attacks"))
            .map(|e| {
                if e.primary().starts_with("First") {
                    "First"
                } else {
                    "Second"
                }
            })
            .collect();
        assert_eq!(attackers.first(), Some(&"First"));
    }

    #[test]
    fn test_process_yields_on_ready_player() {
        let mut world = open_world(10);
        let data = library().compose(&["human"]).unwrap();
        let player = world.add_entity(Entity::from_template_data(
            "Player",
            Some(Point::new(5, 5)),
            &data,
            Material::flesh(),
            true,
        ));
        world.entity_mut(player).delay = 3;
        let lurker = spawn(&mut world, "Lurker", &["human", "zombie"], Point::new(1, 1));
        world.entity_mut(lurker).delay = 1;

        world.process();

        assert!(world.entity(player).delay <= 0);
        // The lurker acted at least once while the player counted down.
        assert!(world.entity(lurker).delay > 0);
    }

    #[test]
    fn test_position_container_exclusivity() {
        let mut world = open_world(10);
        let sack = spawn(&mut world, "Sack", &["rock"], Point::new(1, 1));
        let pebble = spawn(&mut world, "Pebble", &["rock"], Point::new(2, 1));

        assert!(world.insert_into(sack, pebble));
        assert!(world.entity(pebble).position.is_none());
        assert_eq!(world.entity(pebble).container, Some(sack));
        assert_eq!(world.global_position(pebble), Some(Point::new(1, 1)));

        assert!(world.remove_from(sack, pebble));
        assert_eq!(world.entity(pebble).position, Some(Point::new(1, 1)));
        assert!(world.entity(pebble).container.is_none());
    }

    #[test]
    fn test_containment_rejects_cycles() {
        let mut world = open_world(10);
        let outer = spawn(&mut world, "Outer", &["rock"], Point::new(1, 1));
        let inner = spawn(&mut world, "Inner", &["rock"], Point::new(2, 1));

        assert!(world.insert_into(outer, inner));
        assert!(!world.insert_into(inner, outer));
        assert!(!world.insert_into(outer, outer));
    }

    #[test]
    fn test_move_rebuckets_and_charges_delay() {
        let mut world = open_world(10);
        let walker = spawn(&mut world, "Walker", &["human"], Point::new(3, 3));
        world.entity_mut(walker).delay = 0;

        assert!(world.move_entity(walker, (1, 1)));
        assert_eq!(world.entity(walker).position, Some(Point::new(4, 4)));
        assert!(world.entities_at(Point::new(3, 3)).is_empty());
        assert_eq!(world.entities_at(Point::new(4, 4)), vec![walker]);
        // Diagonal: cost 14 at speed 5 rounds up to 3.
        assert_eq!(world.entity(walker).delay, 3);
    }

    #[test]
    fn test_move_into_wall_hesitates() {
        let mut world = open_world(10);
        world
            .map
            .set(Point::new(4, 3), Tile::new(stone(), stone(), air()));
        let walker = spawn(&mut world, "Walker", &["human"], Point::new(3, 3));

        assert!(!world.move_entity(walker, (1, 0)));
        assert_eq!(world.entity(walker).position, Some(Point::new(3, 3)));
        assert_eq!(world.entity(walker).delay, 10);
    }

    #[test]
    fn test_pick_up_and_drop() {
        let mut world = open_world(10);
        let porter = spawn(&mut world, "Porter", &["human"], Point::new(3, 3));
        let rock = spawn(&mut world, "Rock", &["rock"], Point::new(3, 4));

        assert!(world.pick_up(porter, rock));
        assert_eq!(world.entity(rock).container, Some(porter));
        assert_eq!(world.entity(porter).wielded(), Some(rock));

        assert!(world.drop_item(porter, rock));
        assert!(world.entity(rock).container.is_none());
        assert_eq!(world.entity(rock).position, Some(Point::new(3, 3)));
        assert_eq!(world.entity(porter).wielded(), None);
    }

    #[test]
    fn test_snapshot_largest_wins_cell() {
        let mut world = open_world(10);
        spawn(&mut world, "Mouse", &["rock"], Point::new(2, 2));
        let ogre = spawn(&mut world, "Ogre", &["human"], Point::new(2, 2));
        world.entity_mut(ogre).stats.size = 2;
        world.entity_mut(ogre).glyph = Glyph::new('O', [255, 255, 255], [0, 0, 0]);

        let visible = world.map.visible_from(Point::new(2, 2), 0.1);
        let grid = world.render_snapshot(&visible);
        assert_eq!(grid.get(&Point::new(2, 2)).unwrap().ch, 'O');
    }
}
