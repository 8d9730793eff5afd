//! Integer-grid points and vectors
//!
//! All board coordinates live on an integer nanometre grid. Products that can
//! exceed the `i64` range (dot/cross/squared norms) are computed in `i128`.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A 2D point (or vector) on the integer grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Point) -> i128 {
        self.x as i128 * other.x as i128 + self.y as i128 * other.y as i128
    }

    /// Z component of the 3D cross product (positive when `other` is counter-clockwise)
    pub fn cross(self, other: Point) -> i128 {
        self.x as i128 * other.y as i128 - self.y as i128 * other.x as i128
    }

    pub fn squared_norm(self) -> i128 {
        self.dot(self)
    }

    pub fn norm(self) -> f64 {
        (self.squared_norm() as f64).sqrt()
    }

    pub fn distance(self, other: Point) -> f64 {
        (other - self).norm()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// Vector with the same direction scaled to `length`
    pub fn resize(self, length: i64) -> Point {
        let n = self.norm();
        if n == 0.0 {
            return Point::default();
        }
        let k = length as f64 / n;
        Point::new(round(self.x as f64 * k), round(self.y as f64 * k))
    }

    /// Rotated by +90 degrees (x, y) -> (-y, x)
    pub fn perpendicular(self) -> Point {
        Point::new(-self.y, self.x)
    }

    pub fn to_f64(self) -> [f64; 2] {
        [self.x as f64, self.y as f64]
    }

    pub fn from_f64(p: [f64; 2]) -> Point {
        Point::new(round(p[0]), round(p[1]))
    }
}

/// Round a floating-point coordinate to the grid
pub fn round(v: f64) -> i64 {
    v.round() as i64
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl Mul<i64> for Point {
    type Output = Point;
    fn mul(self, rhs: i64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl From<(i64, i64)> for Point {
    fn from(p: (i64, i64)) -> Self {
        Point::new(p.0, p.1)
    }
}
