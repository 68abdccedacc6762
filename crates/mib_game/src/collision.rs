//! Grid collision for level geometry.
//!
//! Levels are authored as a tile grid: solid cells block movement, and every
//! other gameplay object (hazards, goal, pickups) is addressed by cell too.
//! World space is y-up; cell (0, 0) has its bottom-left corner at `origin`.
//!
//! Movement uses **axis-separable move-and-slide**: resolve X first against the
//! grid, then resolve Y using the already-corrected X position. This prevents
//! diagonal tunneling and lets the player slide along walls.

use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize, Clone)]
pub struct CollisionLayer {
    pub cell_size: i32,
    #[serde(default)]
    pub origin: GridOrigin,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub solids: Vec<GridCell>,
    /// Filled rectangles, expanded into solid cells on load.
    #[serde(default)]
    pub rects: Vec<GridRect>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct GridOrigin {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct GridRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl GridRect {
    fn cells(self) -> impl Iterator<Item = GridCell> {
        (self.y..self.y + self.h).flat_map(move |y| (self.x..self.x + self.w).map(move |x| GridCell { x, y }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center_x: f32,
    pub center_y: f32,
    pub half_w: f32,
    pub half_h: f32,
}

impl Aabb {
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (self.center_x - other.center_x).abs() < self.half_w + other.half_w
            && (self.center_y - other.center_y).abs() < self.half_h + other.half_h
    }

    pub fn bottom(&self) -> f32 {
        self.center_y - self.half_h
    }

    pub fn top(&self) -> f32 {
        self.center_y + self.half_h
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CollisionMoveResult {
    pub aabb: Aabb,
    pub collided_y: bool,
    pub blocked_left: bool,
    pub blocked_right: bool,
    pub blocked_down: bool,
    pub blocked_up: bool,
}

#[derive(Debug, Clone)]
pub struct CollisionGrid {
    pub cell_size: i32,
    pub origin: GridOrigin,
    pub width: i32,
    pub height: i32,
    solids: HashSet<GridCell>,
}

impl CollisionGrid {
    pub fn from_layer(layer: &CollisionLayer) -> Self {
        let solids = layer
            .solids
            .iter()
            .copied()
            .chain(layer.rects.iter().flat_map(|r| r.cells()))
            .collect();
        Self {
            cell_size: layer.cell_size,
            origin: layer.origin,
            width: layer.width,
            height: layer.height,
            solids,
        }
    }

    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return false;
        }
        self.solids.contains(&GridCell { x, y })
    }

    pub fn solids_iter(&self) -> impl Iterator<Item = &GridCell> {
        self.solids.iter()
    }

    pub fn solid_count(&self) -> usize {
        self.solids.len()
    }

    /// World-space box covering one cell.
    pub fn cell_aabb(&self, cell: GridCell) -> Aabb {
        let half = self.cell_size as f32 * 0.5;
        Aabb {
            center_x: self.cell_left_world(cell.x) + half,
            center_y: self.cell_bottom_world(cell.y) + half,
            half_w: half,
            half_h: half,
        }
    }

    /// Bottom edge of the grid in world space. Anything falling below it is lost.
    pub fn floor_world(&self) -> f32 {
        self.origin.y as f32
    }

    /// (min_x, max_x) of the grid in world space.
    pub fn horizontal_bounds(&self) -> (f32, f32) {
        (self.cell_left_world(0), self.cell_left_world(self.width))
    }

    /// (min_y, max_y) of the grid in world space.
    pub fn vertical_bounds(&self) -> (f32, f32) {
        (self.cell_bottom_world(0), self.cell_bottom_world(self.height))
    }

    #[cfg(test)]
    pub fn move_and_collide(&self, aabb: Aabb, dx: f32, dy: f32) -> Aabb {
        self.move_and_collide_detailed(aabb, dx, dy).aabb
    }

    pub fn move_and_collide_detailed(&self, aabb: Aabb, dx: f32, dy: f32) -> CollisionMoveResult {
        const EPS: f32 = 0.0001;

        let resolved_x = self.resolve_axis_x(aabb, dx);
        let x_expected = aabb.center_x + dx;
        let collided_x = (resolved_x - x_expected).abs() > EPS;

        let mut moved = aabb;
        moved.center_x = resolved_x;
        let resolved_y = self.resolve_axis_y(moved, dy);
        let y_expected = aabb.center_y + dy;
        let collided_y = (resolved_y - y_expected).abs() > EPS;
        moved.center_y = resolved_y;

        CollisionMoveResult {
            aabb: moved,
            collided_y,
            blocked_left: collided_x && dx < 0.0,
            blocked_right: collided_x && dx > 0.0,
            blocked_down: collided_y && dy < 0.0,
            blocked_up: collided_y && dy > 0.0,
        }
    }

    fn resolve_axis_x(&self, aabb: Aabb, dx: f32) -> f32 {
        if dx == 0.0 {
            return aabb.center_x;
        }

        const EPS: f32 = 0.001;
        let mut candidate_x = aabb.center_x + dx;
        let y0 = self.world_to_cell_y(aabb.center_y - aabb.half_h + EPS);
        let y1 = self.world_to_cell_y(aabb.center_y + aabb.half_h - EPS);

        if dx > 0.0 {
            let x_cell = self.world_to_cell_x(candidate_x + aabb.half_w - EPS);
            for y in y0..=y1 {
                if self.is_solid(x_cell, y) {
                    candidate_x = candidate_x.min(self.cell_left_world(x_cell) - aabb.half_w);
                }
            }
            // Never push against the direction of travel.
            candidate_x = candidate_x.max(aabb.center_x);
        } else {
            let x_cell = self.world_to_cell_x(candidate_x - aabb.half_w + EPS);
            for y in y0..=y1 {
                if self.is_solid(x_cell, y) {
                    candidate_x = candidate_x.max(self.cell_left_world(x_cell + 1) + aabb.half_w);
                }
            }
            candidate_x = candidate_x.min(aabb.center_x);
        }

        candidate_x
    }

    fn resolve_axis_y(&self, aabb: Aabb, dy: f32) -> f32 {
        if dy == 0.0 {
            return aabb.center_y;
        }

        const EPS: f32 = 0.001;
        let mut candidate_y = aabb.center_y + dy;
        let x0 = self.world_to_cell_x(aabb.center_x - aabb.half_w + EPS);
        let x1 = self.world_to_cell_x(aabb.center_x + aabb.half_w - EPS);

        if dy > 0.0 {
            let y_cell = self.world_to_cell_y(candidate_y + aabb.half_h - EPS);
            for x in x0..=x1 {
                if self.is_solid(x, y_cell) {
                    candidate_y = candidate_y.min(self.cell_bottom_world(y_cell) - aabb.half_h);
                }
            }
            candidate_y = candidate_y.max(aabb.center_y);
        } else {
            let y_cell = self.world_to_cell_y(candidate_y - aabb.half_h + EPS);
            for x in x0..=x1 {
                if self.is_solid(x, y_cell) {
                    candidate_y = candidate_y.max(self.cell_bottom_world(y_cell + 1) + aabb.half_h);
                }
            }
            candidate_y = candidate_y.min(aabb.center_y);
        }

        candidate_y
    }

    fn world_to_cell_x(&self, world_x: f32) -> i32 {
        ((world_x - self.origin.x as f32) / self.cell_size as f32).floor() as i32
    }

    fn world_to_cell_y(&self, world_y: f32) -> i32 {
        ((world_y - self.origin.y as f32) / self.cell_size as f32).floor() as i32
    }

    fn cell_left_world(&self, x: i32) -> f32 {
        self.origin.x as f32 + (x * self.cell_size) as f32
    }

    fn cell_bottom_world(&self, y: i32) -> f32 {
        self.origin.y as f32 + (y * self.cell_size) as f32
    }
}

pub fn validate_collision_layer(layer: &CollisionLayer) -> Result<(), String> {
    if layer.cell_size <= 0 {
        return Err("Collision validation failed: cell_size must be > 0".to_string());
    }
    if layer.width <= 0 || layer.height <= 0 {
        return Err("Collision validation failed: width and height must be > 0".to_string());
    }

    let mut seen = HashSet::new();
    for cell in &layer.solids {
        if !cell_in_bounds(layer, *cell) {
            return Err(format!(
                "Collision validation failed: solid cell out of bounds ({}, {})",
                cell.x, cell.y
            ));
        }
        if !seen.insert(*cell) {
            return Err(format!(
                "Collision validation failed: duplicate solid cell ({}, {})",
                cell.x, cell.y
            ));
        }
    }
    for rect in &layer.rects {
        if rect.w <= 0 || rect.h <= 0 {
            return Err(format!(
                "Collision validation failed: empty rect at ({}, {})",
                rect.x, rect.y
            ));
        }
        let far = GridCell {
            x: rect.x + rect.w - 1,
            y: rect.y + rect.h - 1,
        };
        if !cell_in_bounds(layer, GridCell { x: rect.x, y: rect.y }) || !cell_in_bounds(layer, far) {
            return Err(format!(
                "Collision validation failed: rect out of bounds ({}, {}, {}x{})",
                rect.x, rect.y, rect.w, rect.h
            ));
        }
    }
    Ok(())
}

pub fn cell_in_bounds(layer: &CollisionLayer, cell: GridCell) -> bool {
    cell.x >= 0 && cell.x < layer.width && cell.y >= 0 && cell.y < layer.height
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(solids: Vec<GridCell>, rects: Vec<GridRect>) -> CollisionLayer {
        CollisionLayer {
            cell_size: 32,
            origin: GridOrigin { x: 0, y: 0 },
            width: 8,
            height: 8,
            solids,
            rects,
        }
    }

    #[test]
    fn rects_expand_into_solid_cells() {
        let grid = CollisionGrid::from_layer(&layer(
            vec![GridCell { x: 7, y: 7 }],
            vec![GridRect { x: 0, y: 0, w: 4, h: 2 }],
        ));
        assert_eq!(grid.solid_count(), 9);
        assert!(grid.is_solid(3, 1));
        assert!(!grid.is_solid(4, 0));
        assert!(grid.is_solid(7, 7));
    }

    #[test]
    fn validation_rejects_duplicate_cells() {
        let err = validate_collision_layer(&layer(
            vec![GridCell { x: 1, y: 1 }, GridCell { x: 1, y: 1 }],
            vec![],
        ))
        .expect_err("duplicate cells should fail");
        assert!(err.contains("duplicate solid cell"));
    }

    #[test]
    fn validation_rejects_rect_out_of_bounds() {
        let err = validate_collision_layer(&layer(vec![], vec![GridRect { x: 6, y: 0, w: 4, h: 1 }]))
            .expect_err("rect past the right edge");
        assert!(err.contains("rect out of bounds"));
    }

    #[test]
    fn move_and_collide_blocks_motion_into_wall() {
        let grid = CollisionGrid::from_layer(&layer(vec![GridCell { x: 2, y: 1 }], vec![]));
        let start = Aabb {
            center_x: 32.0 + 8.0,
            center_y: 32.0 + 8.0,
            half_w: 8.0,
            half_h: 8.0,
        };
        let moved = grid.move_and_collide(start, 40.0, 0.0);
        assert!(
            moved.center_x <= 64.0 - start.half_w + 0.001,
            "AABB should stop at left edge of wall cell"
        );
    }

    #[test]
    fn move_up_against_obstacle_does_not_push_downward() {
        let grid = CollisionGrid::from_layer(&layer(
            vec![GridCell { x: 2, y: 1 }],
            vec![GridRect { x: 0, y: 0, w: 4, h: 1 }],
        ));
        let start = Aabb {
            center_x: 48.0,
            center_y: 40.0,
            half_w: 8.0,
            half_h: 8.0,
        };
        let moved = grid.move_and_collide(start, 0.0, 10.0);
        assert!(moved.center_y >= start.center_y - 0.0001);
    }

    #[test]
    fn falling_onto_floor_sets_blocked_down() {
        let grid = CollisionGrid::from_layer(&layer(vec![], vec![GridRect { x: 0, y: 0, w: 8, h: 1 }]));
        let start = Aabb {
            center_x: 100.0,
            center_y: 50.0,
            half_w: 8.0,
            half_h: 8.0,
        };
        let result = grid.move_and_collide_detailed(start, 0.0, -30.0);
        assert!(result.blocked_down);
        assert!((result.aabb.bottom() - 32.0).abs() < 0.001);
    }

    #[test]
    fn cell_aabb_and_bounds_follow_origin() {
        let mut l = layer(vec![], vec![]);
        l.origin = GridOrigin { x: -64, y: 32 };
        let grid = CollisionGrid::from_layer(&l);
        let cell = grid.cell_aabb(GridCell { x: 1, y: 0 });
        assert_eq!(cell.center_x, -64.0 + 32.0 + 16.0);
        assert_eq!(cell.center_y, 48.0);
        assert_eq!(grid.horizontal_bounds(), (-64.0, -64.0 + 256.0));
        assert_eq!(grid.floor_world(), 32.0);
    }

    #[test]
    fn aabb_overlap_excludes_touching_edges() {
        let a = Aabb {
            center_x: 0.0,
            center_y: 0.0,
            half_w: 5.0,
            half_h: 5.0,
        };
        let touching = Aabb { center_x: 10.0, ..a };
        let inside = Aabb { center_x: 9.0, ..a };
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
    }
}
