//! Simulated objects: creatures, items, and severed pieces of both

pub mod body;
pub mod template;

use crate::ai::Mind;
use crate::combat::attack::{DamageType, MeleeAttack, Muscle, RangedAttack, Skill};
use crate::core::types::{EntityId, Glyph, Material, Point};
use crate::entity::body::{Body, PartFlag};
use crate::entity::template::{TemplateData, Traits};
use ahash::AHashSet;

pub use body::{Bodyplan, Part};
pub use template::{TemplateLibrary, merge};

/// Base stats. Strength scales damage and hit points, health anchors
/// toughness checks, dexterity and health together set speed,
/// intelligence gates perception.
#[derive(Debug, Clone, Copy)]
pub struct Stats {
    pub size: i32,
    pub st: i32,
    pub ht: i32,
    pub dx: i32,
    pub iq: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vitality {
    Alive,
    Unconscious,
    Dead,
}

/// Tracked shot preparation; waiting while aiming at the same target
/// accumulates a bonus up to the weapon's accuracy.
#[derive(Debug, Clone, Copy)]
pub struct AimState {
    pub target: EntityId,
    pub bonus: i32,
}

/// A simulated object. Everything on the map or inside something on the
/// map is an entity; having a `mind` is what makes one act.
#[derive(Debug)]
pub struct Entity {
    pub name: String,
    /// Grid position. Mutually exclusive with `container`: exactly one
    /// is set at any time.
    pub position: Option<Point>,
    /// The entity physically carrying this one
    pub container: Option<EntityId>,
    pub contents: Vec<EntityId>,
    /// Ticks until this entity may act again
    pub delay: i32,
    pub is_player: bool,
    pub stats: Stats,
    pub material: Material,
    pub factions: AHashSet<String>,
    pub traits: Traits,
    pub melee_attacks: Vec<MeleeAttack>,
    pub ranged_attacks: Vec<RangedAttack>,
    pub body: Body,
    pub hp: i32,
    /// Failed toughness checks so far; thresholds escalate with each
    pub death_checks: u32,
    pub vitality: Vitality,
    pub glyph: Glyph,
    pub aim: Option<AimState>,
    pub mind: Option<Mind>,
}

impl Entity {
    /// Initialize an entity from merged template data. The material is
    /// resolved by the caller against its library.
    pub fn from_template_data(
        name: &str,
        position: Option<Point>,
        data: &TemplateData,
        material: Material,
        is_player: bool,
    ) -> Self {
        let stats = Stats {
            size: data.attribute.size,
            st: data.attribute.st,
            ht: data.attribute.ht,
            dx: data.attribute.dx,
            iq: data.attribute.iq,
        };
        let mut entity = Self {
            name: name.to_string(),
            position,
            container: None,
            contents: Vec::new(),
            delay: 0,
            is_player,
            stats,
            material,
            factions: data.factions.iter().cloned().collect(),
            traits: data.traits,
            melee_attacks: data.melee_attacks.clone(),
            ranged_attacks: data.ranged_attacks.clone(),
            body: Body::construct(data.bodyplan),
            hp: 0,
            death_checks: 0,
            vitality: Vitality::Alive,
            glyph: data.display.glyph(),
            aim: None,
            mind: (data.mind && !is_player).then(Mind::new),
        };
        entity.hp = entity.hp_max();
        entity
    }

    /// Build the free-standing entity for a severed subtree.
    ///
    /// `original_size` is the severed root's size before the subtree was
    /// renormalized. The stump inherits scaled-down strength and, if its
    /// root was a lever, makes a passable improvised club.
    pub fn from_severed_part(owner: &Entity, original_size: i32, body: Body) -> Self {
        let root_name = body.part(body.root()).name.clone();
        let size = original_size + owner.stats.size;
        let st = (1.5f32.powi(size) * owner.stats.st as f32).ceil() as i32;
        let root_is_lever = body.part(body.root()).has_flag(PartFlag::Lever);

        let skill = if root_is_lever {
            if size > -2 {
                Skill::AxeMace2h
            } else {
                Skill::AxeMace
            }
        } else {
            Skill::Brawling
        };
        let reach_start = root_is_lever as i32;
        let reach_end = (size + 3).max(reach_start + 1);
        let improvised = MeleeAttack {
            skill,
            quality: -2,
            muscle: Muscle::Thrust,
            damage_type: DamageType::Bash,
            damage_mod: -1,
            st_requirement: (size * 2 + 14).max(1),
            reach: (reach_start..reach_end).collect(),
        };

        let mut entity = Self {
            name: format!("{} severed {}", owner.name, root_name),
            position: owner.position,
            container: None,
            contents: Vec::new(),
            delay: 0,
            is_player: false,
            stats: Stats {
                size,
                st,
                ht: 10,
                dx: 10,
                iq: 0,
            },
            material: owner.material.clone(),
            factions: AHashSet::new(),
            traits: Traits::default(),
            melee_attacks: vec![improvised],
            ranged_attacks: Vec::new(),
            body,
            hp: 0,
            death_checks: 0,
            vitality: Vitality::Alive,
            glyph: Glyph::new('%', [0, 0, 0], [200, 0, 0]),
            aim: None,
            mind: None,
        };
        entity.hp = entity.hp_max();
        entity
    }

    /// Maximum hit points: strength scaled by material density, plus any
    /// trait bonus. Derived, never stored.
    pub fn hp_max(&self) -> i32 {
        ((self.stats.st as f32 * self.material.density) as i32 + self.traits.extra_hp).max(1)
    }

    pub fn speed(&self) -> f32 {
        (self.stats.dx + self.stats.ht) as f32 / 4.0 + self.traits.speed_boost
    }

    pub fn alive(&self) -> bool {
        self.vitality == Vitality::Alive
    }

    /// Creatures dodge, think, and can be fought; furniture cannot.
    pub fn is_creature(&self) -> bool {
        self.is_player || self.mind.is_some()
    }

    /// First free grasping part, if any
    pub fn free_grasper(&self) -> Option<crate::core::types::PartId> {
        self.body
            .parts_with_flag(PartFlag::Grasper)
            .into_iter()
            .chain(self.body.parts_with_flag(PartFlag::SecondaryGrasper))
            .find(|&id| self.body.part(id).held.is_none())
    }

    /// The entity gripped by the primary grasper, if any
    pub fn wielded(&self) -> Option<EntityId> {
        self.body
            .parts_with_flag(PartFlag::Grasper)
            .into_iter()
            .find_map(|id| self.body.part(id).held)
    }

    /// Pairs of (grasping part, held entity), for status display
    pub fn held_entities(&self) -> Vec<(crate::core::types::PartId, EntityId)> {
        self.body
            .parts_with_flag(PartFlag::Grasper)
            .into_iter()
            .chain(self.body.parts_with_flag(PartFlag::SecondaryGrasper))
            .filter_map(|id| self.body.part(id).held.map(|held| (id, held)))
            .collect()
    }
}
