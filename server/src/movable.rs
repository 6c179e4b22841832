use shared::{BoundingBox, Vec2, ACTOR_RADIUS};
use std::collections::VecDeque;
use std::time::Duration;

/// Distance under which a waypoint counts as reached.
const WAYPOINT_TOLERANCE: f32 = 1e-3;

/// Number of upcoming waypoints reported by default for telemetry.
pub const DEFAULT_NEXT_WAYPOINTS: usize = 2;

/// The moving part of an entity.
///
/// It accepts a path (nearest waypoint first) and advances its position
/// along it at constant speed.
#[derive(Debug, Clone)]
pub struct Movable {
    pub pos: Vec2,
    pub speed: f32,
    waypoints: VecDeque<Vec2>,
}

impl Movable {
    pub fn new(pos: Vec2, speed: f32) -> Self {
        Self {
            pos,
            speed,
            waypoints: VecDeque::new(),
        }
    }

    /// Replaces the current path, cancelling any motion in progress.
    pub fn set_path(&mut self, path: impl IntoIterator<Item = Vec2>) {
        self.waypoints.clear();
        self.waypoints.extend(path);
    }

    /// Moves along the path for `dt` and returns true if the position changed.
    ///
    /// Several waypoints may be consumed in a single call; the position never
    /// overshoots the waypoint it is heading to.
    pub fn advance(&mut self, dt: Duration) -> bool {
        let start = self.pos;
        let mut distance = self.speed * dt.as_secs_f32();

        while distance > 0.0 {
            let Some(&next) = self.waypoints.front() else {
                break;
            };
            let leg = next - self.pos;
            let leg_length = leg.length();

            // a degenerate leg counts as reached
            let degenerate = leg_length == 0.0 || leg_length.is_nan() || leg.normalize().is_nan();
            if degenerate
                || leg_length <= distance
                || (leg_length - distance).abs() < WAYPOINT_TOLERANCE
            {
                self.pos = next;
                self.waypoints.pop_front();
                if leg_length.is_nan() {
                    break;
                }
                distance -= leg_length;
            } else {
                self.pos += leg.normalize() * distance;
                break;
            }
        }
        self.pos != start
    }

    /// Up to `n` pending waypoints, nearest first.
    pub fn next_waypoints(&self, n: usize) -> Vec<Vec2> {
        self.waypoints.iter().take(n).copied().collect()
    }

    pub fn has_reached_destination(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_circle(self.pos, ACTOR_RADIUS)
    }
}
