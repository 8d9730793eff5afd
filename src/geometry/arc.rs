//! Circular arcs stored as start/end/center plus winding

use super::point::{round, Point};
use super::seg::Seg;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Minimal segment count for approximating a full circle
const MIN_SEGCOUNT_FOR_CIRCLE: f64 = 8.0;

/// Default maximum deviation between an arc and its polyline approximation
pub const DEFAULT_ARC_ERROR: i64 = 5_000;

/// A circular arc from `start` to `end` around `center`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arc {
    pub start: Point,
    pub end: Point,
    pub center: Point,
    /// Winding from start to end (counter-clockwise when false)
    pub clockwise: bool,
}

/// Number of segments needed to approximate an arc within `error_max`
///
/// At least two segments are always returned.
pub fn arc_to_segment_count(radius: i64, error_max: i64, arc_angle_deg: f64) -> usize {
    let radius = radius.max(1) as f64;
    let rel_error = (error_max as f64 / radius).min(1.0);
    let mut arc_increment = 180.0 / PI * (1.0 - rel_error).acos() * 2.0;
    arc_increment = arc_increment.min(360.0 / MIN_SEGCOUNT_FOR_CIRCLE);
    if arc_increment <= 0.0 {
        return 2;
    }
    let seg_count = (arc_angle_deg.abs() / arc_increment).round() as usize;
    seg_count.max(2)
}

impl Arc {
    pub fn new(start: Point, end: Point, center: Point, clockwise: bool) -> Self {
        Self { start, end, center, clockwise }
    }

    pub fn radius(&self) -> f64 {
        self.start.distance(self.center)
    }

    pub fn start_angle(&self) -> f64 {
        let v = self.start - self.center;
        (v.y as f64).atan2(v.x as f64)
    }

    pub fn end_angle(&self) -> f64 {
        let v = self.end - self.center;
        (v.y as f64).atan2(v.x as f64)
    }

    /// Signed sweep in radians (positive counter-clockwise)
    pub fn central_angle(&self) -> f64 {
        let mut sweep = self.end_angle() - self.start_angle();
        if self.clockwise {
            while sweep > 0.0 {
                sweep -= 2.0 * PI;
            }
        } else {
            while sweep < 0.0 {
                sweep += 2.0 * PI;
            }
        }
        sweep
    }

    pub fn length(&self) -> f64 {
        self.radius() * self.central_angle().abs()
    }

    pub fn chord(&self) -> Seg {
        Seg::new(self.start, self.end)
    }

    pub fn reversed(&self) -> Arc {
        Arc::new(self.end, self.start, self.center, !self.clockwise)
    }

    pub fn point_at(&self, angle: f64) -> Point {
        let r = self.radius();
        Point::new(
            self.center.x + round(r * angle.cos()),
            self.center.y + round(r * angle.sin()),
        )
    }

    pub fn mid(&self) -> Point {
        self.point_at(self.start_angle() + self.central_angle() / 2.0)
    }

    /// Polyline approximation including both endpoints
    pub fn to_points(&self, error_max: i64) -> Vec<Point> {
        let sweep = self.central_angle();
        let n = arc_to_segment_count(round(self.radius()), error_max, sweep.to_degrees());
        let a0 = self.start_angle();
        let mut pts = Vec::with_capacity(n + 1);
        pts.push(self.start);
        for i in 1..n {
            let p = self.point_at(a0 + sweep * i as f64 / n as f64);
            if pts.last() != Some(&p) {
                pts.push(p);
            }
        }
        if pts.last() != Some(&self.end) {
            pts.push(self.end);
        }
        pts
    }
}
