//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Handle into the world's entity arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle into a body's part arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartId(pub u32);

impl PartId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Integer grid coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Offset between two grid coordinates
pub type Delta = (i32, i32);

/// The eight surrounding offsets, excluding the center
pub const MOORE_NEIGHBORHOOD: [Delta; 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, delta: Delta) -> Self {
        Self {
            x: self.x + delta.0,
            y: self.y + delta.1,
        }
    }

    pub fn delta_to(&self, other: &Self) -> Delta {
        (other.x - self.x, other.y - self.y)
    }

    /// Chebyshev distance: steps needed when diagonal moves are allowed
    pub fn distance(&self, other: &Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn neighbors(&self) -> impl Iterator<Item = Point> + '_ {
        MOORE_NEIGHBORHOOD.iter().map(|d| self.offset(*d))
    }
}

/// True for offsets that move on both axes at once
pub fn is_diagonal(delta: Delta) -> bool {
    delta.0 != 0 && delta.1 != 0
}

/// Rounds to the nearest integer, ties toward negative infinity
pub fn round_half_down(num: f32) -> i32 {
    (num - 0.5).ceil() as i32
}

/// The cells crossed walking from `a` to `b`, endpoints included.
///
/// Walks the longer axis one cell at a time and rounds the other axis
/// half-down. The rounding makes the walk direction-dependent, which is
/// why visibility queries evaluate both directions and keep the max.
pub fn line_between(a: Point, b: Point) -> Vec<Point> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;

    if dx == 0 && dy == 0 {
        return vec![a];
    }

    let steps = dx.abs().max(dy.abs());
    let x_step = dx as f32 / steps as f32;
    let y_step = dy as f32 / steps as f32;

    (0..=steps)
        .map(|i| {
            Point::new(
                a.x + round_half_down(i as f32 * x_step),
                a.y + round_half_down(i as f32 * y_step),
            )
        })
        .collect()
}

/// Colored character cell handed to the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glyph {
    pub ch: char,
    pub fg: [u8; 3],
    pub bg: [u8; 3],
}

impl Glyph {
    pub fn new(ch: char, fg: [u8; 3], bg: [u8; 3]) -> Self {
        Self { ch, fg, bg }
    }
}

impl Default for Glyph {
    fn default() -> Self {
        Self {
            ch: '*',
            fg: [255, 255, 255],
            bg: [0, 0, 0],
        }
    }
}

/// Physical phase of a material, which drives traversal and cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatterState {
    Solid,
    Liquid,
    Gas,
    Phantasmal,
    Void,
}

/// A substance entities and terrain are made of
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub state: MatterState,
    /// Hit-point scaling for entities made of this
    pub density: f32,
    /// Flat damage reduction against incoming attacks
    pub hardness: i32,
    /// 0.0 transparent, 1.0 fully opaque
    pub opacity: f32,
    /// Character the renderer uses for bare terrain of this material
    pub texture: char,
}

impl Material {
    /// Fallback material for entities constructed without template data
    pub fn flesh() -> Self {
        Self {
            name: "flesh".into(),
            state: MatterState::Solid,
            density: 1.0,
            hardness: 0,
            opacity: 1.0,
            texture: '#',
        }
    }
}
