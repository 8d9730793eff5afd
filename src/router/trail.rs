//! Posture inference from the cursor trail
//!
//! The tracer records where the cursor has been since the start point and
//! compares that trail against the two candidate 45 degree paths (straight
//! first, diagonal first). The path enclosing the smaller area with the
//! trail is the one the user is "drawing". Once the cursor gets far enough
//! from the start the choice is locked, and unlocked again when it returns.

use super::direction::{AngleType, CornerMode, Direction45};
use crate::geometry::{Point, PointChain};
use tracing::trace;

/// How much better one posture's fit must be before switching to it
const AREA_RATIO_THRESHOLD: f64 = 1.3;
/// Hysteresis around the threshold
const AREA_RATIO_EPSILON: f64 = 0.25;
/// Below this many tolerances of travel the trail area is not trusted
const MIN_AREA_CUTOFF_DISTANCE_FACTOR: f64 = 6.0;
/// Travel (in tolerances) after which the posture is locked
const LOCK_DISTANCE_FACTOR: i64 = 30;
/// Coming back this close (in tolerances) unlocks it
const UNLOCK_DISTANCE_FACTOR: i64 = 4;

#[derive(Debug, Clone)]
pub struct MouseTrailTracer {
    trail: PointChain,
    tolerance: i64,
    direction: Direction45,
    initial_direction: Direction45,
    last_seg_direction: Direction45,
    forced: bool,
    manually_forced: bool,
    mouse_disabled: bool,
}

impl Default for MouseTrailTracer {
    fn default() -> Self {
        Self {
            trail: PointChain::new(),
            tolerance: 0,
            direction: Direction45::N,
            initial_direction: Direction45::N,
            last_seg_direction: Direction45::Undefined,
            forced: false,
            manually_forced: false,
            mouse_disabled: false,
        }
    }
}

impl MouseTrailTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.forced = false;
        self.manually_forced = false;
        self.trail.clear();
        self.direction = self.initial_direction;
        self.last_seg_direction = Direction45::Undefined;
    }

    pub fn set_tolerance(&mut self, tolerance: i64) {
        self.tolerance = tolerance.max(0);
    }

    /// Directions used before the trail says anything: the posture to start
    /// with and the direction of the segment the route continues, if any
    pub fn set_default_directions(&mut self, initial: Direction45, last_seg: Direction45) {
        self.initial_direction = initial;
        self.direction = initial;
        self.last_seg_direction = last_seg;
    }

    pub fn set_mouse_disabled(&mut self, disabled: bool) {
        self.mouse_disabled = disabled;
    }

    pub fn is_manually_forced(&self) -> bool {
        self.manually_forced
    }

    pub fn trail(&self) -> &PointChain {
        &self.trail
    }

    /// Records a cursor position, cutting off loops the cursor closed
    pub fn add_trail_point(&mut self, p: Point) {
        if self.trail.segment_count() == 0 {
            if self.trail.last() != Some(p) {
                self.trail.append(p);
            }
            return;
        }

        let Some(last) = self.trail.last() else { return };
        let s_new = crate::geometry::Seg::new(last, p);
        let n = self.trail.segment_count();
        if n > 2 {
            let limit = self.tolerance as f64;
            for i in 0..n - 2 {
                if self.trail.segment(i as isize).distance_to_seg(&s_new) <= limit {
                    self.trail = self.trail.slice(0, i as isize);
                    break;
                }
            }
        }
        self.trail.append(p);
        self.trail.simplify();
    }

    /// Rotates the posture by 45 degrees and pins it until `clear`
    pub fn flip_posture(&mut self) {
        self.direction = self.direction.right();
        self.forced = true;
        self.manually_forced = true;
    }

    /// Posture the user most likely wants for a route ending at `p`
    pub fn get_posture(&mut self, p: Point) -> Direction45 {
        if self.trail.point_count() < 2 || self.manually_forced {
            if !self.manually_forced && self.last_seg_direction.is_defined() {
                self.direction = self.last_seg_direction;
            }
            return self.direction;
        }

        let p0 = self.trail.point(0);
        if p0 == p {
            return self.direction;
        }

        let straight = Direction45::Undefined.build_initial_trace(p0, p, false, CornerMode::Mitered45);
        let diag = Direction45::Undefined.build_initial_trace(p0, p, true, CornerMode::Mitered45);
        let straight_dir = Direction45::from_seg(&straight.segment(0));
        let diag_dir = Direction45::from_seg(&diag.segment(0));

        let ref_length = p0.distance(p);
        let reversed = self.trail.reversed();
        let enclosed = |path: &PointChain| {
            let mut c = path.clone();
            c.append_chain(&reversed);
            c.set_closed(true);
            c.area().abs()
        };
        let area_s = enclosed(&straight);
        let area_d = enclosed(&diag);
        let ratio = area_s / (area_d + 1.0);

        let tolerance = self.tolerance as f64;
        if self.forced && ref_length < (UNLOCK_DISTANCE_FACTOR as f64) * tolerance {
            // dragged back to the start: forget the locked posture
            self.forced = false;
            self.trail.clear();
            self.trail.append(p0);
        }

        let mut area_ok = false;
        if ref_length > MIN_AREA_CUTOFF_DISTANCE_FACTOR * tolerance {
            let mut t = self.trail.clone();
            t.set_closed(true);
            area_ok = t.area().abs() > tolerance * ref_length;
        }

        let mut new_direction = self.direction;
        if !self.forced {
            new_direction = if area_ok && ratio > AREA_RATIO_THRESHOLD + AREA_RATIO_EPSILON {
                diag_dir
            } else if area_ok && ratio < (1.0 / AREA_RATIO_THRESHOLD) - AREA_RATIO_EPSILON {
                straight_dir
            } else if self.direction.is_diagonal() {
                diag_dir
            } else {
                straight_dir
            };
        }

        if !self.mouse_disabled && new_direction != self.direction {
            trace!(target: "pns", "[Trail] posture change {} -> {}", self.direction, new_direction);
            self.direction = new_direction;
        }

        // leaving an existing segment: prefer whichever posture meets it at the gentler angle
        let last = self.last_seg_direction;
        if last.is_defined() && last != straight_dir && last != diag_dir {
            let gentle = |d: Direction45| matches!(last.angle(d), AngleType::Obtuse | AngleType::Collinear);
            if gentle(straight_dir) {
                self.direction = straight_dir;
            } else if gentle(diag_dir) {
                self.direction = diag_dir;
            }
        }

        if !self.forced && ref_length > (LOCK_DISTANCE_FACTOR as f64) * tolerance {
            trace!(target: "pns", "[Trail] posture locked at {}", self.direction);
            self.forced = true;
        }

        self.direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracer() -> MouseTrailTracer {
        let mut t = MouseTrailTracer::new();
        t.set_tolerance(100);
        t.set_default_directions(Direction45::E, Direction45::Undefined);
        t.clear();
        t
    }

    #[test]
    fn test_no_trail_uses_default() {
        let mut t = tracer();
        t.add_trail_point(Point::new(0, 0));
        assert_eq!(t.get_posture(Point::new(5000, 3000)), Direction45::E);
    }

    #[test]
    fn test_last_segment_seeds_posture() {
        let mut t = tracer();
        t.set_default_directions(Direction45::E, Direction45::S);
        t.add_trail_point(Point::new(0, 0));
        assert_eq!(t.get_posture(Point::new(5000, 3000)), Direction45::S);
    }

    #[test]
    fn test_diagonal_trail_picks_diagonal() {
        let mut t = tracer();
        for i in 0..=20 {
            t.add_trail_point(Point::new(i * 150, i * 150));
        }
        for i in 1..=20 {
            t.add_trail_point(Point::new(3000 + i * 150, 3000));
        }
        let d = t.get_posture(Point::new(6000, 3000));
        assert!(d.is_diagonal(), "got {}", d);
    }

    #[test]
    fn test_straight_trail_picks_straight() {
        let mut t = tracer();
        t.set_default_directions(Direction45::NE, Direction45::Undefined);
        t.clear();
        for i in 0..=20 {
            t.add_trail_point(Point::new(i * 150, 0));
        }
        for i in 1..=20 {
            t.add_trail_point(Point::new(3000 + i * 150, i * 150));
        }
        let d = t.get_posture(Point::new(6000, 3000));
        assert_eq!(d, Direction45::E);
    }

    #[test]
    fn test_flip_is_sticky() {
        let mut t = tracer();
        t.add_trail_point(Point::new(0, 0));
        t.flip_posture();
        assert!(t.is_manually_forced());
        assert_eq!(t.get_posture(Point::new(5000, 3000)), Direction45::SE);
        t.clear();
        assert!(!t.is_manually_forced());
    }

    #[test]
    fn test_loop_in_trail_is_cut() {
        let mut t = tracer();
        for p in [(0, 0), (1000, 0), (1000, 1000), (0, 1000), (0, 50)] {
            t.add_trail_point(Point::new(p.0, p.1));
        }
        assert!(t.trail().point_count() <= 3);
    }
}
