//! Data file loading: materials, tile features, and character-grid maps
//!
//! A map arrives as a rectangular character grid plus a glyph-to-terrain
//! mapping. Terrain definitions name materials, optional features, and
//! an optional spawn directive naming an entity template.

use ahash::AHashMap;
use serde::Deserialize;

use crate::core::error::{CoreError, Result};
use crate::core::types::{Material, Point};
use crate::spatial::{Tile, TileFeature, TileMap};

/// Materials by name
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: AHashMap<String, Material>,
}

impl MaterialLibrary {
    /// Load from a JSON array of material definitions.
    pub fn load(text: &str) -> Result<Self> {
        let parsed: Vec<Material> = serde_json::from_str(text)?;
        let mut materials = AHashMap::new();
        for material in parsed {
            materials.insert(material.name.clone(), material);
        }
        Ok(Self { materials })
    }

    pub fn get(&self, name: &str) -> Result<&Material> {
        self.materials
            .get(name)
            .ok_or_else(|| CoreError::UnknownMaterial(name.to_string()))
    }
}

/// Tile features by name, from a JSON object
pub fn load_features(text: &str) -> Result<AHashMap<String, TileFeature>> {
    serde_json::from_str(text).map_err(Into::into)
}

/// One glyph's terrain definition
#[derive(Debug, Clone, Deserialize)]
pub struct TerrainDef {
    pub wall_material: String,
    pub floor_material: String,
    pub ceiling_material: String,
    #[serde(default)]
    pub features: Vec<String>,
    /// Entity template to place on this cell
    #[serde(default)]
    pub spawn: Option<String>,
}

/// An entity placement the map asked for
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPoint {
    pub position: Point,
    pub template: String,
}

/// Build the tile grid and placement list from a character-grid map.
pub fn load_map(
    materials: &MaterialLibrary,
    features: &AHashMap<String, TileFeature>,
    defs_text: &str,
    map_text: &str,
) -> Result<(TileMap, Vec<SpawnPoint>)> {
    let defs: AHashMap<char, TerrainDef> = serde_json::from_str(defs_text)?;

    let lines: Vec<&str> = map_text.lines().filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        return Err(CoreError::MalformedMap("map has no rows".into()));
    }
    let width = lines[0].chars().count();
    if let Some(bad) = lines.iter().find(|l| l.chars().count() != width) {
        return Err(CoreError::MalformedMap(format!(
            "ragged row: expected width {width}, got {}",
            bad.chars().count()
        )));
    }

    let mut map = TileMap::new(width as i32, lines.len() as i32);
    let mut spawns = Vec::new();

    for (y, line) in lines.iter().enumerate() {
        for (x, glyph) in line.chars().enumerate() {
            let def = defs.get(&glyph).ok_or(CoreError::UnknownGlyph(glyph))?;
            let mut tile = Tile::new(
                materials.get(&def.wall_material)?.clone(),
                materials.get(&def.floor_material)?.clone(),
                materials.get(&def.ceiling_material)?.clone(),
            );
            for feature_name in &def.features {
                let feature = features.get(feature_name).ok_or_else(|| {
                    CoreError::MalformedMap(format!("unknown feature: {feature_name}"))
                })?;
                tile.add_feature(feature.clone());
            }
            let position = Point::new(x as i32, y as i32);
            map.set(position, tile);
            if let Some(template) = &def.spawn {
                spawns.push(SpawnPoint {
                    position,
                    template: template.clone(),
                });
            }
        }
    }

    tracing::info!(
        width,
        height = lines.len(),
        spawns = spawns.len(),
        "map loaded"
    );
    Ok((map, spawns))
}
