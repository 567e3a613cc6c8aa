//! Line-of-sight via per-tile opacity accumulation
//!
//! A ray's visibility starts at 1.0 and is multiplied by each crossed
//! cell's transparency. The integer line walk rounds half-down, so a ray
//! A→B can thread cells the reverse ray misses; point-to-point queries
//! therefore take the max of both directions.

use crate::core::types::{line_between, Point};
use crate::spatial::tile::TileMap;
use ahash::AHashMap;

impl TileMap {
    /// Visibility of every cell seen from `origin`.
    ///
    /// Casts one ray to each cell of the map's outer border and records
    /// the running visibility at every cell crossed. Rays end once
    /// visibility drops below `epsilon`.
    pub fn visible_from(&self, origin: Point, epsilon: f32) -> AHashMap<Point, f32> {
        let mut visible = AHashMap::new();
        let mut targets = Vec::with_capacity(2 * (self.width + self.height) as usize);
        for x in 0..self.width {
            targets.push(Point::new(x, 0));
            targets.push(Point::new(x, self.height));
        }
        for y in 0..self.height {
            targets.push(Point::new(0, y));
            targets.push(Point::new(self.width, y));
        }

        for target in targets {
            let mut visibility = 1.0f32;
            for point in line_between(origin, target) {
                if visibility < epsilon {
                    break;
                }
                let entry = visible.entry(point).or_insert(0.0f32);
                *entry = entry.max(visibility);
                visibility *= 1.0 - self.get(point).opacity();
            }
        }
        visible
    }

    /// Visibility along the single ray from `a` to `b`.
    pub fn ray_visibility(&self, a: Point, b: Point, epsilon: f32) -> f32 {
        let mut visibility = 1.0f32;
        for point in line_between(a, b) {
            if visibility < epsilon {
                return 0.0;
            }
            if point == b {
                return visibility;
            }
            visibility *= 1.0 - self.get(point).opacity();
        }
        0.0
    }

    /// Mutual visibility of two points: the better of the two ray
    /// directions, since opacity accumulation is not symmetric cell by
    /// cell.
    pub fn visibility_between(&self, a: Point, b: Point, epsilon: f32) -> f32 {
        self.ray_visibility(a, b, epsilon)
            .max(self.ray_visibility(b, a, epsilon))
    }
}
