use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};

///Represents a vector in 2D world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    ///Value along the x-axis.
    pub x: f32,
    ///Value along the y-axis.
    /// Grows downwards, matching the row order of the map raster.
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    ///Returns the magnitude of the vector.
    pub fn length(&self) -> f32 {
        self.square_length().sqrt()
    }

    ///Returns the squared magnitude of the vector.
    pub fn square_length(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    ///Returns the normalized vector, or the zero vector if the magnitude is zero.
    pub fn normalize(&self) -> Vec2 {
        let mag = self.length();
        if mag == 0.0 {
            Vec2::ZERO
        } else {
            Vec2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vec2 {
        Vec2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the squared euclidean distance between two points.
    pub fn square_distance(&self, other: &Vec2) -> f32 {
        (*other - *self).square_length()
    }

    ///Returns the euclidean distance between two points.
    pub fn distance(&self, other: &Vec2) -> f32 {
        self.square_distance(other).sqrt()
    }

    ///Returns true if any component is NaN.
    pub fn is_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }

    ///Returns true if neither component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    ///Floors both components to the integer cell containing the point.
    ///Callers must rule out NaN first, it lands in cell (0, 0).
    pub fn to_cell(&self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, other: Vec2) -> Vec2 {
        Vec2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Vec2) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, other: Vec2) -> Vec2 {
        Vec2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, scalar: f32) -> Vec2 {
        self.scale(scalar)
    }
}

///Axis-aligned bounding box. Containment includes shared edges, intersection
///requires a non-empty overlap: boxes that merely touch do not intersect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BoundingBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl BoundingBox {
    pub fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        BoundingBox {
            min: Vec2::new(min_x, min_y),
            max: Vec2::new(max_x, max_y),
        }
    }

    ///Square box of the given half extent around `center`.
    pub fn from_center(center: Vec2, half_extent: f32) -> Self {
        BoundingBox::new(
            center.x - half_extent,
            center.x + half_extent,
            center.y - half_extent,
            center.y + half_extent,
        )
    }

    ///Smallest box enclosing the circle.
    pub fn from_circle(center: Vec2, radius: f32) -> Self {
        BoundingBox::from_center(center, radius)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    ///Returns true if `other` lies entirely inside this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }

    ///Returns true if the boxes overlap. A box with a NaN bound overlaps
    ///nothing.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        other.min.x < self.max.x
            && other.max.x > self.min.x
            && other.min.y < self.max.y
            && other.max.y > self.min.y
    }

    ///Returns true if the point lies inside the box.
    pub fn contains_point(&self, point: &Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}
