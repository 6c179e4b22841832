//! Ray casting over the world grid
//!
//! Segments are rasterized with Bresenham's line algorithm and the resulting
//! cells are scanned, from the logical origin of the ray towards its end,
//! against a traversability predicate. The first cell failing the predicate
//! is the collision point.
//!
//! Rasterization is lazy and cells outside the grid always block, so a scan
//! never visits more cells than the grid is wide or high, however long the
//! ray.
//!
//! Ray endpoints are given in world coordinates; collision points are grid
//! cells.

use crate::world::World;
use log::debug;
use shared::Vec2;

/// Integer grid coordinates.
pub type GridPoint = (i32, i32);

/// Outcome of a ray cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RayCastResult {
    pub is_colliding: bool,
    /// First blocking cell, only meaningful when `is_colliding` is set
    pub colliding_pos: GridPoint,
}

impl RayCastResult {
    fn clear() -> Self {
        Self::default()
    }

    fn collision(at: GridPoint) -> Self {
        Self {
            is_colliding: true,
            colliding_pos: at,
        }
    }
}

/// Cells of a Bresenham line, produced on demand from either end.
///
/// Points are ordered low-to-high along the major axis, so the first point is
/// not necessarily `p0`. The cell at any position is computed directly, which
/// keeps both iteration directions identical to a single forward pass.
#[derive(Debug, Clone)]
pub struct BresenhamLine {
    x0: i64,
    y0: i64,
    delta_x: i64,
    delta_y: i64,
    y_step: i64,
    is_steep: bool,
    front: u64,
    back: u64,
}

impl BresenhamLine {
    /// Cell at position `i` along the major axis.
    fn point(&self, i: u64) -> GridPoint {
        let x = self.x0 + i as i64;
        // y offset of the incremental error walk: ceil((2 i dy - dx) / 2 dx)
        let y = if self.delta_x == 0 {
            self.y0
        } else {
            let num = 2 * i as i128 * self.delta_y as i128 - self.delta_x as i128;
            let den = 2 * self.delta_x as i128;
            let offset = num.div_euclid(den) + i128::from(num.rem_euclid(den) != 0);
            self.y0 + self.y_step * offset as i64
        };
        // both endpoints came from i32 cells, so every cell between them fits
        let (x, y) = (x as i32, y as i32);
        if self.is_steep {
            (y, x)
        } else {
            (x, y)
        }
    }
}

impl Iterator for BresenhamLine {
    type Item = GridPoint;

    fn next(&mut self) -> Option<GridPoint> {
        if self.front >= self.back {
            return None;
        }
        let point = self.point(self.front);
        self.front += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (usize::try_from(len).unwrap_or(usize::MAX), usize::try_from(len).ok())
    }
}

impl DoubleEndedIterator for BresenhamLine {
    fn next_back(&mut self) -> Option<GridPoint> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.point(self.back))
    }
}

/// Returns the cells of the line between two grid points.
pub fn bresenham_line(p0: GridPoint, p1: GridPoint) -> BresenhamLine {
    let (mut x0, mut y0) = (i64::from(p0.0), i64::from(p0.1));
    let (mut x1, mut y1) = (i64::from(p1.0), i64::from(p1.1));

    let is_steep = (y1 - y0).abs() > (x1 - x0).abs();
    // scan along the y axis for steep lines
    if is_steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }

    let delta_x = x1 - x0;
    BresenhamLine {
        x0,
        y0,
        delta_x,
        delta_y: (y1 - y0).abs(),
        y_step: if y0 < y1 { 1 } else { -1 },
        is_steep,
        front: 0,
        back: delta_x as u64 + 1,
    }
}

impl World {
    /// Scans the rasterized segment between two *grid* points, starting at
    /// `start`, and reports the first cell for which `traversable` is false.
    ///
    /// Cells outside the grid block whatever the predicate says. A NaN
    /// endpoint blocks at once.
    pub fn line_collision<F>(&self, start: Vec2, end: Vec2, traversable: F) -> RayCastResult
    where
        F: Fn(GridPoint) -> bool,
    {
        let origin = start.to_cell();
        if start.is_nan() || end.is_nan() {
            return RayCastResult::collision(origin);
        }
        let line = bresenham_line(origin, end.to_cell());

        // the rasterizer may have swapped the endpoints
        let reversed = line.clone().next() != Some(origin);
        let mut cells: Box<dyn Iterator<Item = GridPoint>> = if reversed {
            Box::new(line.rev())
        } else {
            Box::new(line)
        };

        let blocking = |&(x, y): &GridPoint| self.tile(x, y).is_none() || !traversable((x, y));
        match cells.find(blocking) {
            Some(cell) => {
                debug!("Ray from {:?} is colliding at {:?}", origin, cell);
                RayCastResult::collision(cell)
            }
            None => RayCastResult::clear(),
        }
    }

    /// Determines if the segment between two world points crosses a cell that
    /// is not traversable (not walkable, or outside the grid).
    pub fn line_through(&self, start: Vec2, end: Vec2) -> RayCastResult {
        self.line_through_with(start, end, |(x, y)| self.is_point_traversable(x, y))
    }

    /// Same as [`World::line_through`] with a custom traversability predicate.
    ///
    /// Coincident endpoints report a collision at the start cell without
    /// consulting the predicate.
    pub fn line_through_with<F>(&self, start: Vec2, end: Vec2, traversable: F) -> RayCastResult
    where
        F: Fn(GridPoint) -> bool,
    {
        let (start, end) = (self.world_to_grid(start), self.world_to_grid(end));
        if start == end {
            return RayCastResult::collision(start.to_cell());
        }
        self.line_collision(start, end, traversable)
    }

    /// Casts a ray from a world point along `dir` over `length` world units.
    pub fn cast_ray(&self, origin: Vec2, dir: Vec2, length: f32) -> RayCastResult {
        self.cast_ray_with(origin, dir, length, |(x, y)| self.is_point_traversable(x, y))
    }

    /// Same as [`World::cast_ray`] with a custom traversability predicate.
    ///
    /// A zero length or a zero (or NaN) direction reports a collision at the
    /// origin cell. Lengths beyond the world's width plus height are cut
    /// down to it, since such a ray leaves the grid anyway.
    pub fn cast_ray_with<F>(&self, origin: Vec2, dir: Vec2, length: f32, traversable: F) -> RayCastResult
    where
        F: Fn(GridPoint) -> bool,
    {
        let dir = dir.normalize();
        if length <= 0.0 || length.is_nan() || dir == Vec2::ZERO || dir.is_nan() {
            return RayCastResult::collision(self.world_to_grid(origin).to_cell());
        }
        let length = length.min(self.width() + self.height() + 1.0);
        let target = origin + dir * length;
        self.line_collision(self.world_to_grid(origin), self.world_to_grid(target), traversable)
    }
}
