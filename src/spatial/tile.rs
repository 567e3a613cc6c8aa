//! Per-cell terrain: materials plus stacked features

use crate::core::types::{Glyph, Material, MatterState, Point};
use ahash::AHashMap;
use serde::Deserialize;

/// Something sitting on a tile that modifies it: rubble, flowing water,
/// undergrowth. Features stack in z-index order and multiply the tile's
/// walk cost and visibility.
#[derive(Debug, Clone, Deserialize)]
pub struct TileFeature {
    pub name: String,
    pub z_index: i32,
    #[serde(default)]
    pub glyph: Option<Glyph>,
    /// Multiplier on traversal cost; 0 makes the tile free to cross
    #[serde(default = "one")]
    pub walkability: f32,
    /// Multiplier on light passing through the tile
    #[serde(default = "one")]
    pub visibility: f32,
}

fn one() -> f32 {
    1.0
}

/// A single map cell
#[derive(Debug, Clone)]
pub struct Tile {
    pub wall_material: Material,
    pub floor_material: Material,
    pub ceiling_material: Material,
    features: Vec<TileFeature>,
}

impl Tile {
    pub fn new(wall: Material, floor: Material, ceiling: Material) -> Self {
        Self {
            wall_material: wall,
            floor_material: floor,
            ceiling_material: ceiling,
            features: Vec::new(),
        }
    }

    pub fn features(&self) -> &[TileFeature] {
        &self.features
    }

    pub fn add_feature(&mut self, feature: TileFeature) {
        self.features.push(feature);
        self.features.sort_by_key(|f| f.z_index);
    }

    /// Movement point cost of moving through the tile, `None` if blocked
    pub fn traversal_cost(&self) -> Option<i32> {
        let base = match self.wall_material.state {
            MatterState::Gas => 10.0,
            MatterState::Liquid => 30.0,
            _ => return None,
        };
        let multiplier: f32 = self.features.iter().map(|f| f.walkability).product();
        Some((base * multiplier) as i32)
    }

    /// How likely a projectile is to strike the tile instead of passing
    pub fn cover(&self) -> i32 {
        (self.wall_material.state == MatterState::Solid) as i32
    }

    /// How much this cell blocks a sight ray crossing it
    pub fn opacity(&self) -> f32 {
        let base = if self.wall_material.state == MatterState::Solid {
            self.wall_material.opacity
        } else {
            0.0
        };
        let feature_pass: f32 = self.features.iter().map(|f| f.visibility).product();
        1.0 - (1.0 - base) * feature_pass
    }

    pub fn is_void(&self) -> bool {
        self.wall_material.state == MatterState::Void
    }

    /// Lines the examine view shows for this cell
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Wall: {}", self.wall_material.name),
            format!("Floor: {}", self.floor_material.name),
        ];
        lines.extend(self.features.iter().map(|f| f.name.clone()));
        lines
    }
}

fn void_material() -> Material {
    Material {
        name: "void".into(),
        state: MatterState::Void,
        density: 0.0,
        hardness: 0,
        opacity: 1.0,
        texture: '?',
    }
}

/// Sparse rectangular grid of tiles. Out-of-bounds queries resolve to an
/// impassable, opaque void sentinel instead of failing.
#[derive(Debug, Clone)]
pub struct TileMap {
    tiles: AHashMap<Point, Tile>,
    pub width: i32,
    pub height: i32,
    void: Tile,
}

impl TileMap {
    pub fn new(width: i32, height: i32) -> Self {
        let v = void_material();
        Self {
            tiles: AHashMap::new(),
            width,
            height,
            void: Tile::new(v.clone(), v.clone(), v),
        }
    }

    pub fn get(&self, point: Point) -> &Tile {
        self.tiles.get(&point).unwrap_or(&self.void)
    }

    pub fn get_mut(&mut self, point: Point) -> Option<&mut Tile> {
        self.tiles.get_mut(&point)
    }

    pub fn set(&mut self, point: Point, tile: Tile) {
        self.tiles.insert(point, tile);
    }

    pub fn cells(&self) -> impl Iterator<Item = (&Point, &Tile)> {
        self.tiles.iter()
    }

    /// Passable neighbors of a cell
    pub fn open_neighbors<'a>(&'a self, point: Point) -> impl Iterator<Item = Point> + 'a {
        point
            .neighbors()
            .filter(|n| self.tiles.contains_key(n))
            .filter(|n| self.get(*n).traversal_cost().is_some())
            .collect::<Vec<_>>()
            .into_iter()
    }
}
