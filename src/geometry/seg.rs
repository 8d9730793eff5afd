//! Straight segments and the intersection/projection primitives built on them

use super::point::{round, Point};
use serde::{Deserialize, Serialize};

/// A directed straight segment from `a` to `b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Seg {
    pub a: Point,
    pub b: Point,
}

/// Rounded integer division of two wide integers
pub(crate) fn div_round(n: i128, d: i128) -> i64 {
    if d == 0 {
        return 0;
    }
    let (n, d) = if d < 0 { (-n, -d) } else { (n, d) };
    let q = if n >= 0 { (n + d / 2) / d } else { (n - d / 2) / d };
    q as i64
}

fn orientation(a: Point, b: Point, c: Point) -> i32 {
    let v = (b - a).cross(c - a);
    v.signum() as i32
}

fn within_box(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

impl Seg {
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    pub fn vector(&self) -> Point {
        self.b - self.a
    }

    pub fn length(&self) -> f64 {
        self.vector().norm()
    }

    pub fn squared_length(&self) -> i128 {
        self.vector().squared_norm()
    }

    pub fn is_degenerate(&self) -> bool {
        self.a == self.b
    }

    pub fn reversed(&self) -> Seg {
        Seg::new(self.b, self.a)
    }

    pub fn center(&self) -> Point {
        Point::new((self.a.x + self.b.x) / 2, (self.a.y + self.b.y) / 2)
    }

    /// Sign of the side `p` lies on (+1 left of a->b, -1 right, 0 on the line)
    pub fn side(&self, p: Point) -> i32 {
        orientation(self.a, self.b, p)
    }

    /// Point of the segment closest to `p`
    pub fn nearest_point(&self, p: Point) -> Point {
        let d = self.vector();
        let l2 = d.squared_norm();
        if l2 == 0 {
            return self.a;
        }
        let t = (p - self.a).dot(d);
        if t <= 0 {
            return self.a;
        }
        if t >= l2 {
            return self.b;
        }
        Point::new(
            self.a.x + div_round(d.x as i128 * t, l2),
            self.a.y + div_round(d.y as i128 * t, l2),
        )
    }

    /// Projection of `p` onto the infinite line through the segment
    pub fn line_project(&self, p: Point) -> Point {
        let d = self.vector();
        let l2 = d.squared_norm();
        if l2 == 0 {
            return self.a;
        }
        let t = (p - self.a).dot(d);
        Point::new(
            self.a.x + div_round(d.x as i128 * t, l2),
            self.a.y + div_round(d.y as i128 * t, l2),
        )
    }

    /// Point-to-segment minimum distance
    pub fn distance_to_point(&self, p: Point) -> f64 {
        let d = self.vector();
        let l2 = d.squared_norm();
        if l2 == 0 {
            return p.distance(self.a);
        }
        let t = ((p - self.a).dot(d) as f64 / l2 as f64).clamp(0.0, 1.0);
        let cx = self.a.x as f64 + t * d.x as f64;
        let cy = self.a.y as f64 + t * d.y as f64;
        ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt()
    }

    /// Segment-to-segment minimum distance (zero when they touch or cross)
    pub fn distance_to_seg(&self, other: &Seg) -> f64 {
        if self.intersects(other) {
            return 0.0;
        }
        self.distance_to_point(other.a)
            .min(self.distance_to_point(other.b))
            .min(other.distance_to_point(self.a))
            .min(other.distance_to_point(self.b))
    }

    /// True when `p` lies exactly on the segment
    pub fn contains_point(&self, p: Point) -> bool {
        orientation(self.a, self.b, p) == 0 && within_box(self.a, self.b, p)
    }

    /// True when `other` lies completely on this segment
    pub fn contains_seg(&self, other: &Seg) -> bool {
        self.contains_point(other.a) && self.contains_point(other.b)
    }

    /// True when both endpoints of `other` lie on this segment's line
    pub fn collinear(&self, other: &Seg) -> bool {
        self.side(other.a) == 0 && self.side(other.b) == 0
    }

    pub fn intersects(&self, other: &Seg) -> bool {
        let o1 = orientation(self.a, self.b, other.a);
        let o2 = orientation(self.a, self.b, other.b);
        let o3 = orientation(other.a, other.b, self.a);
        let o4 = orientation(other.a, other.b, self.b);

        if o1 != o2 && o3 != o4 {
            return true;
        }
        (o1 == 0 && within_box(self.a, self.b, other.a))
            || (o2 == 0 && within_box(self.a, self.b, other.b))
            || (o3 == 0 && within_box(other.a, other.b, self.a))
            || (o4 == 0 && within_box(other.a, other.b, self.b))
    }

    /// Intersection point of two segments.
    ///
    /// For overlapping collinear segments the overlap point closest to `self.a` is returned.
    pub fn intersect(&self, other: &Seg) -> Option<Point> {
        if !self.intersects(other) {
            return None;
        }
        let r = self.vector();
        let s = other.vector();
        let denom = r.cross(s);

        if denom == 0 {
            let mut best: Option<Point> = None;
            for p in [self.a, self.b, other.a, other.b] {
                if self.contains_point(p) && other.contains_point(p) {
                    let closer = match best {
                        Some(q) => (p - self.a).squared_norm() < (q - self.a).squared_norm(),
                        None => true,
                    };
                    if closer {
                        best = Some(p);
                    }
                }
            }
            return best;
        }

        let t_num = (other.a - self.a).cross(s);
        Some(Point::new(
            self.a.x + div_round(r.x as i128 * t_num, denom),
            self.a.y + div_round(r.y as i128 * t_num, denom),
        ))
    }

    /// Intersection of the infinite lines through both segments
    pub fn line_intersection(&self, other: &Seg) -> Option<Point> {
        let r = self.vector();
        let s = other.vector();
        let denom = r.cross(s);
        if denom == 0 {
            return None;
        }
        let t_num = (other.a - self.a).cross(s);
        let x = self.a.x as f64 + r.x as f64 * (t_num as f64 / denom as f64);
        let y = self.a.y as f64 + r.y as f64 * (t_num as f64 / denom as f64);
        Some(Point::new(round(x), round(y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(ax: i64, ay: i64, bx: i64, by: i64) -> Seg {
        Seg::new(Point::new(ax, ay), Point::new(bx, by))
    }

    #[test]
    fn test_crossing_intersection() {
        let ip = seg(0, 0, 10, 10).intersect(&seg(0, 10, 10, 0));
        assert_eq!(ip, Some(Point::new(5, 5)));
    }

    #[test]
    fn test_collinear_overlap_prefers_start() {
        let ip = seg(0, 0, 10, 0).intersect(&seg(4, 0, 20, 0));
        assert_eq!(ip, Some(Point::new(4, 0)));
    }

    #[test]
    fn test_disjoint() {
        assert!(seg(0, 0, 10, 0).intersect(&seg(0, 1, 10, 1)).is_none());
        assert!((seg(0, 0, 10, 0).distance_to_seg(&seg(0, 3, 10, 3)) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_and_project() {
        let s = seg(0, 0, 10, 0);
        assert_eq!(s.nearest_point(Point::new(5, 7)), Point::new(5, 0));
        assert_eq!(s.nearest_point(Point::new(-5, 7)), Point::new(0, 0));
        assert_eq!(s.line_project(Point::new(-5, 7)), Point::new(-5, 0));
    }

    #[test]
    fn test_contains() {
        let s = seg(0, 0, 10, 10);
        assert!(s.contains_point(Point::new(3, 3)));
        assert!(!s.contains_point(Point::new(3, 4)));
        assert!(s.contains_seg(&seg(2, 2, 8, 8)));
    }
}
