//! Collision shapes of routable items
//!
//! Every item reduces to a core (polyline, point or polygon) plus a radius.
//! Clearance tests compare the core-to-core distance minus both radii with
//! the required clearance; obstacle hulls inflate the core by radius, clearance
//! and half the width of the trace that has to avoid it.

use crate::geometry::{circle_hull, polygon_hull, segment_hull, bbox_octagon, Point, PointChain, Seg};

/// Core geometry plus a radius
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Open polyline swept by a circle (segments and approximated arcs)
    Polyline { chain: PointChain, radius: i64 },
    Circle { center: Point, radius: i64 },
    /// Filled polygon (pads, keepouts)
    Polygon { outline: PointChain },
}

impl Shape {
    pub fn segment(seg: Seg, width: i64) -> Shape {
        Shape::Polyline {
            chain: PointChain::from_points([seg.a, seg.b]),
            radius: width / 2,
        }
    }

    pub fn radius(&self) -> i64 {
        match self {
            Shape::Polyline { radius, .. } | Shape::Circle { radius, .. } => *radius,
            Shape::Polygon { .. } => 0,
        }
    }

    fn core_points(&self) -> Vec<Point> {
        match self {
            Shape::Polyline { chain, .. } => chain.points().to_vec(),
            Shape::Circle { center, .. } => vec![*center],
            Shape::Polygon { outline } => outline.points().to_vec(),
        }
    }

    fn core_segments(&self) -> Vec<Seg> {
        match self {
            Shape::Polyline { chain, .. } => {
                if chain.point_count() == 1 {
                    vec![Seg::new(chain.point(0), chain.point(0))]
                } else {
                    chain.segments().collect()
                }
            }
            Shape::Circle { center, .. } => vec![Seg::new(*center, *center)],
            Shape::Polygon { outline } => outline.segments().collect(),
        }
    }

    /// Bounding box of the swept shape as (min, max)
    pub fn bbox(&self) -> (Point, Point) {
        let pts = self.core_points();
        let r = self.radius();
        let mut min = pts.first().copied().unwrap_or_default();
        let mut max = min;
        for p in &pts {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (Point::new(min.x - r, min.y - r), Point::new(max.x + r, max.y + r))
    }

    /// Distance between the two cores (zero when they overlap)
    pub fn core_distance(&self, other: &Shape) -> f64 {
        if let Shape::Polygon { outline } = self {
            if other.core_points().iter().any(|p| outline.point_inside(*p)) {
                return 0.0;
            }
        }
        if let Shape::Polygon { outline } = other {
            if self.core_points().iter().any(|p| outline.point_inside(*p)) {
                return 0.0;
            }
        }

        let ours = self.core_segments();
        let theirs = other.core_segments();
        let mut min_d = f64::MAX;
        for a in &ours {
            for b in &theirs {
                let d = a.distance_to_seg(b);
                if d < min_d {
                    min_d = d;
                    if min_d == 0.0 {
                        return 0.0;
                    }
                }
            }
        }
        min_d
    }

    /// Free space between the two shapes' outlines (negative when overlapping)
    pub fn gap(&self, other: &Shape) -> f64 {
        self.core_distance(other) - self.radius() as f64 - other.radius() as f64
    }

    /// True when the shapes come closer than `clearance`
    pub fn collides(&self, other: &Shape, clearance: i64) -> bool {
        self.gap(other) < clearance as f64
    }

    /// Point of the core geometry closest to `p`
    pub fn nearest_core_point(&self, p: Point) -> Point {
        self.core_segments()
            .iter()
            .map(|s| s.nearest_point(p))
            .min_by(|a, b| a.distance(p).total_cmp(&b.distance(p)))
            .unwrap_or(p)
    }

    /// True when `p` lies inside a filled polygon core
    pub fn core_contains(&self, p: Point) -> bool {
        matches!(self, Shape::Polygon { outline } if outline.point_inside(p))
    }

    /// Shortest move that takes a disc at `center` clear of this shape
    ///
    /// `fallback` gives the direction when the disc sits exactly on the core.
    pub fn pushout_vector(&self, center: Point, radius: i64, clearance: i64, fallback: Point) -> Point {
        let q = self.nearest_core_point(center);
        let required = (self.radius() + radius + clearance + 1) as f64;
        let d = center.distance(q);
        let (dir, amount) = if self.core_contains(center) {
            (q - center, d + required)
        } else {
            (center - q, required - d)
        };
        if amount <= 0.0 {
            return Point::default();
        }
        let dir = match (dir.is_zero(), fallback.is_zero()) {
            (false, _) => dir,
            (true, false) => fallback,
            (true, true) => Point::new(1, 0),
        };
        dir.resize(amount.ceil() as i64)
    }

    /// Octagonal hull inflated by `extra` beyond the shape's own outline
    pub fn hull(&self, extra: i64) -> PointChain {
        let r = self.radius() + extra;
        match self {
            Shape::Circle { center, .. } => circle_hull(*center, r),
            Shape::Polygon { outline } => polygon_hull(outline.points(), r),
            Shape::Polyline { chain, .. } => {
                if chain.point_count() <= 2 {
                    segment_hull(&Seg::new(chain.point(0), chain.point(-1)), r)
                } else {
                    bbox_octagon(chain.points(), r)
                }
            }
        }
    }
}
