pub mod pathfinding;
pub mod tile;
pub mod visibility;

pub use pathfinding::PathField;
pub use tile::{Tile, TileFeature, TileMap};
