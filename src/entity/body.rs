//! Hierarchical anatomy
//!
//! A body is an arena of parts addressed by stable index; parent and
//! child links are indices into the same arena. Destroying a part only
//! unlinks it, so outstanding `PartId`s never dangle, and severing moves
//! a whole subtree into a freshly built arena for the new entity.

use crate::core::types::{EntityId, PartId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a part contributes to its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartFlag {
    /// Organs whose loss is lethal
    Vitals,
    /// Seat of consciousness
    Mind,
    Sight,
    /// Can hold an entity
    Grasper,
    SecondaryGrasper,
    /// Usable for unarmed strikes
    Striker,
    /// Long and rigid; severed levers make passable clubs
    Lever,
    Walker,
    Balancer,
    /// Cutting damage is amplified here
    Cuttable,
    /// Undifferentiated mass bodies
    Simple,
    /// Set once the part has taken its damage budget
    Crippled,
}

/// One node of the anatomy tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub name: String,
    /// Log-scale relative size, 0 = the body's trunk
    pub size: i32,
    /// Damage budget divisor; `None` means the part cannot be
    /// independently crippled or severed
    pub hp_divisor: Option<u32>,
    pub damage: i32,
    flags: Vec<PartFlag>,
    /// Entity gripped by this part, if it is a grasper
    pub held: Option<EntityId>,
    parent: Option<PartId>,
    children: Vec<PartId>,
}

impl Part {
    fn new(name: &str, size: i32, hp_divisor: Option<u32>, flags: &[PartFlag]) -> Self {
        Self {
            name: name.to_string(),
            size,
            hp_divisor,
            damage: 0,
            flags: flags.to_vec(),
            held: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn has_flag(&self, flag: PartFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn add_flag(&mut self, flag: PartFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }
}

/// Named template describing a fixed anatomy tree shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bodyplan {
    Humanoid,
    Carcinoid,
    SimpleMass,
}

/// Arena of parts forming one body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    parts: Vec<Part>,
    root: PartId,
}

impl Body {
    /// Build the fixed tree for a body plan. Two bodies built from the
    /// same plan are structurally identical until damaged.
    pub fn construct(plan: Bodyplan) -> Self {
        let mut body = Self {
            parts: Vec::new(),
            root: PartId(0),
        };
        use PartFlag::*;
        match plan {
            Bodyplan::Humanoid => {
                let torso = body.alloc(Part::new("torso", 0, None, &[Vitals]));
                let neck = body.alloc(Part::new("neck", -5, None, &[Cuttable]));
                let head = body.alloc(Part::new("head", -7, None, &[Mind]));
                let eyes = body.alloc(Part::new("eyes", -9, Some(10), &[Sight]));
                let l_arm = body.alloc(Part::new("left arm", -2, Some(2), &[Lever]));
                let r_arm = body.alloc(Part::new("right arm", -2, Some(2), &[Lever]));
                let l_hand = body.alloc(Part::new(
                    "left hand",
                    -4,
                    Some(3),
                    &[SecondaryGrasper, Striker],
                ));
                let r_hand =
                    body.alloc(Part::new("right hand", -4, Some(3), &[Grasper, Striker]));
                let l_leg = body.alloc(Part::new("left leg", -2, Some(2), &[Lever, Walker]));
                let r_leg = body.alloc(Part::new("right leg", -2, Some(2), &[Lever, Walker]));
                let l_foot =
                    body.alloc(Part::new("left foot", -4, Some(3), &[Balancer, Striker]));
                let r_foot =
                    body.alloc(Part::new("right foot", -4, Some(3), &[Balancer, Striker]));

                body.attach(torso, &[neck, l_arm, r_arm, l_leg, r_leg]);
                body.attach(neck, &[head]);
                body.attach(head, &[eyes]);
                body.attach(l_arm, &[l_hand]);
                body.attach(r_arm, &[r_hand]);
                body.attach(l_leg, &[l_foot]);
                body.attach(r_leg, &[r_foot]);
                body.root = torso;
            }
            Bodyplan::Carcinoid => {
                let thorax = body.alloc(Part::new("thorax", 0, None, &[Vitals]));
                let head = body.alloc(Part::new("head", -7, None, &[Mind]));
                let eyes = body.alloc(Part::new("eyes", -9, Some(10), &[Sight]));
                let l_arm = body.alloc(Part::new("left arm", -2, Some(2), &[Lever]));
                let r_arm = body.alloc(Part::new("right arm", -2, Some(2), &[Lever]));
                let l_hand = body.alloc(Part::new(
                    "left hand",
                    -4,
                    Some(3),
                    &[SecondaryGrasper, Striker],
                ));
                let r_hand =
                    body.alloc(Part::new("right hand", -4, Some(3), &[Grasper, Striker]));
                let legs = [
                    ("front left leg", &[Lever, Walker, Balancer][..]),
                    ("front right leg", &[Lever, Walker, Balancer][..]),
                    ("back left leg", &[Lever, Walker, Balancer][..]),
                    ("back right leg", &[Lever, Walker][..]),
                ];
                let leg_ids: Vec<PartId> = legs
                    .iter()
                    .map(|(name, flags)| body.alloc(Part::new(name, -2, Some(2), flags)))
                    .collect();

                let mut thorax_children = vec![head, l_arm, r_arm];
                thorax_children.extend(&leg_ids);
                body.attach(thorax, &thorax_children);
                body.attach(head, &[eyes]);
                body.attach(l_arm, &[l_hand]);
                body.attach(r_arm, &[r_hand]);
                body.root = thorax;
            }
            Bodyplan::SimpleMass => {
                let mass = body.alloc(Part::new("mass", 0, None, &[Simple]));
                body.root = mass;
            }
        }
        body
    }

    fn alloc(&mut self, part: Part) -> PartId {
        let id = PartId(self.parts.len() as u32);
        self.parts.push(part);
        id
    }

    fn attach(&mut self, parent: PartId, children: &[PartId]) {
        for &child in children {
            self.parts[child.index()].parent = Some(parent);
            self.parts[parent.index()].children.push(child);
        }
    }

    pub fn root(&self) -> PartId {
        self.root
    }

    pub fn part(&self, id: PartId) -> &Part {
        &self.parts[id.index()]
    }

    pub fn part_mut(&mut self, id: PartId) -> &mut Part {
        &mut self.parts[id.index()]
    }

    /// Preorder walk of the intact tree. Unlinked subtrees do not appear.
    pub fn parts(&self) -> Vec<PartId> {
        let mut out = Vec::with_capacity(self.parts.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.parts[id.index()].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn parts_with_flag(&self, flag: PartFlag) -> Vec<PartId> {
        self.parts()
            .into_iter()
            .filter(|&id| self.part(id).has_flag(flag))
            .collect()
    }

    pub fn contains_flag(&self, flag: PartFlag) -> bool {
        self.parts().iter().any(|&id| self.part(id).has_flag(flag))
    }

    /// Pick a part with probability proportional to 1.5^size, so trunks
    /// soak most of the blows aimed at nobody in particular.
    pub fn weighted_random_part(&self, rng: &mut impl Rng) -> PartId {
        let parts = self.parts();
        let weights: Vec<f32> = parts
            .iter()
            .map(|&id| 1.5f32.powi(self.part(id).size))
            .collect();
        let total: f32 = weights.iter().sum();
        let mut pick = rng.gen_range(0.0..total);
        for (id, weight) in parts.iter().zip(&weights) {
            if pick < *weight {
                return *id;
            }
            pick -= weight;
        }
        *parts.last().expect("body always has a root part")
    }

    /// Preorder walk of the subtree rooted at `id`
    pub fn subtree(&self, id: PartId) -> Vec<PartId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.parts[current.index()].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Unlink a part and its whole subtree from the body.
    pub fn remove(&mut self, id: PartId) {
        if let Some(parent) = self.parts[id.index()].parent.take() {
            self.parts[parent.index()].children.retain(|&c| c != id);
        }
    }

    /// Shift all sizes so the largest intact part sits at 0.
    pub fn normalize(&mut self) {
        let largest = self
            .parts()
            .iter()
            .map(|&id| self.part(id).size)
            .max()
            .unwrap_or(0);
        for id in self.parts() {
            self.part_mut(id).size -= largest;
        }
    }

    /// Copy the subtree rooted at `id` into a standalone body, then
    /// unlink it here. Held references are cleared in the copy; the
    /// caller decides what happens to anything the subtree was gripping.
    pub fn detach(&mut self, id: PartId) -> Body {
        let mut severed = Body {
            parts: Vec::new(),
            root: PartId(0),
        };
        let root = self.copy_subtree(id, None, &mut severed);
        severed.root = root;
        severed.normalize();
        self.remove(id);
        severed
    }

    fn copy_subtree(&self, id: PartId, parent: Option<PartId>, into: &mut Body) -> PartId {
        let mut copy = self.parts[id.index()].clone();
        copy.parent = parent;
        copy.children = Vec::new();
        copy.held = None;
        let new_id = into.alloc(copy);
        for &child in &self.parts[id.index()].children {
            let new_child = self.copy_subtree(child, Some(new_id), into);
            into.parts[new_id.index()].children.push(new_child);
        }
        new_id
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn walk(body: &Body, id: PartId, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let part = body.part(id);
            writeln!(f, "{}{} ({})", "|---".repeat(depth), part.name, part.size)?;
            for &child in &part.children {
                walk(body, child, depth + 1, f)?;
            }
            Ok(())
        }
        walk(self, self.root, 0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_humanoid_shape() {
        let body = Body::construct(Bodyplan::Humanoid);
        assert_eq!(body.parts().len(), 12);
        assert_eq!(body.part(body.root()).name, "torso");
        assert_eq!(body.parts_with_flag(PartFlag::Grasper).len(), 1);
        assert_eq!(body.parts_with_flag(PartFlag::Walker).len(), 2);
    }

    #[test]
    fn test_same_plan_same_structure() {
        let a = Body::construct(Bodyplan::Carcinoid);
        let b = Body::construct(Bodyplan::Carcinoid);
        let names = |body: &Body| -> Vec<String> {
            body.parts()
                .iter()
                .map(|&id| body.part(id).name.clone())
                .collect()
        };
        assert_eq!(names(&a), names(&b));
    }

    #[test]
    fn test_weighted_pick_favors_trunk() {
        let body = Body::construct(Bodyplan::Humanoid);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut torso_hits = 0;
        for _ in 0..1000 {
            let id = body.weighted_random_part(&mut rng);
            if body.part(id).name == "torso" {
                torso_hits += 1;
            }
        }
        // The torso is size 0, arms -2; it should take the majority.
        assert!(torso_hits > 300, "torso only hit {torso_hits}/1000");
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut body = Body::construct(Bodyplan::Humanoid);
        let arm = body.parts_with_flag(PartFlag::Lever)[0];
        let before = body.parts().len();
        body.remove(arm);
        // Arm plus its hand are gone from traversal.
        assert_eq!(body.parts().len(), before - 2);
        assert!(!body.parts().contains(&arm));
    }

    #[test]
    fn test_detach_keeps_subtree_and_normalizes() {
        let mut body = Body::construct(Bodyplan::Humanoid);
        let neck = body
            .parts()
            .into_iter()
            .find(|&id| body.part(id).name == "neck")
            .unwrap();
        let severed = body.detach(neck);

        // neck, head, eyes travel together
        assert_eq!(severed.parts().len(), 3);
        assert_eq!(severed.part(severed.root()).name, "neck");
        // Largest part of the severed body is rescaled to 0.
        let max_size = severed
            .parts()
            .iter()
            .map(|&id| severed.part(id).size)
            .max()
            .unwrap();
        assert_eq!(max_size, 0);
        // And the original body no longer reaches any of them.
        assert!(!body.contains_flag(PartFlag::Mind));
    }

    #[test]
    fn test_crippled_flag_idempotent() {
        let mut body = Body::construct(Bodyplan::Humanoid);
        let arm = body.parts_with_flag(PartFlag::Lever)[0];
        body.part_mut(arm).add_flag(PartFlag::Crippled);
        body.part_mut(arm).add_flag(PartFlag::Crippled);
        let count = body
            .part(arm)
            .flags
            .iter()
            .filter(|&&f| f == PartFlag::Crippled)
            .count();
        assert_eq!(count, 1);
    }
}
