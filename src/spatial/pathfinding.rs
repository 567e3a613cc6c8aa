//! Cost-weighted best-first search over non-uniform terrain
//!
//! The search runs from the goal back toward the querying cell, so the
//! predecessor map reads out as "next step toward the goal" directly.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashMap;

use crate::core::types::{is_diagonal, Point};
use crate::spatial::tile::TileMap;

/// Entering a cell diagonally costs 1.4x its terrain cost
const DIAGONAL_COST_FACTOR: f32 = 1.4;

/// Node in the open set
#[derive(Debug, Clone)]
struct SearchNode {
    point: Point,
    priority: i32,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for SearchNode {}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other.priority.cmp(&self.priority)
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Octile-distance heuristic scaled to terrain cost units
fn heuristic_distance(a: Point, b: Point) -> i32 {
    let dx = (a.x - b.x).abs() as f32;
    let dy = (a.y - b.y).abs() as f32;
    ((dx + dy - dx.min(dy) * 0.6) * 10.0) as i32
}

/// Predecessor and cost maps produced by a search
#[derive(Debug, Default)]
pub struct PathField {
    came_from: AHashMap<Point, Point>,
    cost: AHashMap<Point, i32>,
}

impl PathField {
    /// The cell the search reached `point` from
    pub fn predecessor(&self, point: Point) -> Option<Point> {
        self.came_from.get(&point).copied()
    }

    /// Accumulated traversal cost to reach `point` from the search origin
    pub fn cost_to(&self, point: Point) -> Option<i32> {
        self.cost.get(&point).copied()
    }
}

impl TileMap {
    /// Search outward from `origin`, stopping early once `target` is
    /// settled. Cells never reached have no entry in the result.
    pub fn search_from(&self, origin: Point, target: Point) -> PathField {
        let mut field = PathField::default();
        let mut frontier = BinaryHeap::new();

        field.cost.insert(origin, 0);
        frontier.push(SearchNode {
            point: origin,
            priority: heuristic_distance(origin, target),
        });

        while let Some(current) = frontier.pop() {
            if current.point == target {
                break;
            }
            let current_cost = *field.cost.get(&current.point).unwrap_or(&i32::MAX);

            for neighbor in self.open_neighbors(current.point) {
                let Some(tile_cost) = self.get(neighbor).traversal_cost() else {
                    continue;
                };
                let step = current.point.delta_to(&neighbor);
                let step_cost = if is_diagonal(step) {
                    (tile_cost as f32 * DIAGONAL_COST_FACTOR) as i32
                } else {
                    tile_cost
                };
                let new_cost = current_cost + step_cost;

                if field.cost.get(&neighbor).map_or(true, |&c| new_cost < c) {
                    field.cost.insert(neighbor, new_cost);
                    field.came_from.insert(neighbor, current.point);
                    frontier.push(SearchNode {
                        point: neighbor,
                        priority: new_cost + heuristic_distance(neighbor, target),
                    });
                }
            }
        }

        field
    }

    /// First hop on the cheapest path from `start` toward `goal`.
    ///
    /// Searches from the goal backward so the predecessor of `start` is
    /// the next cell to move to. `None` means no path exists; callers
    /// treat that as "stay put".
    pub fn next_step_towards(&self, start: Point, goal: Point) -> Option<Point> {
        self.search_from(goal, start).predecessor(start)
    }
}
