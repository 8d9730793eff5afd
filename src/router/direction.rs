//! 45-degree posture model
//!
//! Classifies vectors into the eight compass directions, relates two
//! directions by the corner they form, and builds the initial two-segment
//! trace between two points for a given posture.
//!
//! Board coordinates grow to the right (x) and downwards (y), so north is `-y`.

use crate::geometry::{Arc, Point, PointChain, Seg, DEFAULT_ARC_ERROR};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// One of the eight compass directions, ordered clockwise starting at north
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compass {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

const ALL: [Compass; 8] = [
    Compass::N,
    Compass::NE,
    Compass::E,
    Compass::SE,
    Compass::S,
    Compass::SW,
    Compass::W,
    Compass::NW,
];

impl Compass {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Compass {
        ALL[i % 8]
    }

    pub fn is_diagonal(self) -> bool {
        self.index() % 2 == 1
    }

    /// Unit grid vector
    pub fn vector(self) -> Point {
        match self {
            Compass::N => Point::new(0, -1),
            Compass::NE => Point::new(1, -1),
            Compass::E => Point::new(1, 0),
            Compass::SE => Point::new(1, 1),
            Compass::S => Point::new(0, 1),
            Compass::SW => Point::new(-1, 1),
            Compass::W => Point::new(-1, 0),
            Compass::NW => Point::new(-1, -1),
        }
    }
}

/// Corner formed by two consecutive directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AngleType {
    Undefined,
    /// Same direction (no corner)
    Collinear,
    /// 45-degree turn
    Obtuse,
    /// 90-degree turn
    Right,
    /// 135-degree turn
    Acute,
    /// Full reversal
    HalfFull,
}

impl AngleType {
    fn bit(self) -> u8 {
        match self {
            AngleType::Undefined => 0x01,
            AngleType::Collinear => 0x02,
            AngleType::Obtuse => 0x04,
            AngleType::Right => 0x08,
            AngleType::Acute => 0x10,
            AngleType::HalfFull => 0x20,
        }
    }
}

/// Set of corner kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AngleMask(u8);

impl AngleMask {
    pub const NONE: AngleMask = AngleMask(0);

    pub fn contains(self, angle: AngleType) -> bool {
        self.0 & angle.bit() != 0
    }
}

impl From<AngleType> for AngleMask {
    fn from(a: AngleType) -> Self {
        AngleMask(a.bit())
    }
}

impl BitOr<AngleType> for AngleType {
    type Output = AngleMask;
    fn bitor(self, rhs: AngleType) -> AngleMask {
        AngleMask(self.bit() | rhs.bit())
    }
}

impl BitOr<AngleType> for AngleMask {
    type Output = AngleMask;
    fn bitor(self, rhs: AngleType) -> AngleMask {
        AngleMask(self.0 | rhs.bit())
    }
}

/// How the corner of an initial trace is shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerMode {
    #[default]
    Mitered45,
    Rounded45,
    Mitered90,
    Rounded90,
}

impl CornerMode {
    pub fn is_90(self) -> bool {
        matches!(self, CornerMode::Mitered90 | CornerMode::Rounded90)
    }
}

/// A routing posture: a compass direction or no preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Direction45 {
    Compass(Compass),
    #[default]
    Undefined,
}

impl Direction45 {
    pub const N: Direction45 = Direction45::Compass(Compass::N);
    pub const NE: Direction45 = Direction45::Compass(Compass::NE);
    pub const E: Direction45 = Direction45::Compass(Compass::E);
    pub const SE: Direction45 = Direction45::Compass(Compass::SE);
    pub const S: Direction45 = Direction45::Compass(Compass::S);
    pub const SW: Direction45 = Direction45::Compass(Compass::SW);
    pub const W: Direction45 = Direction45::Compass(Compass::W);
    pub const NW: Direction45 = Direction45::Compass(Compass::NW);

    /// Nearest compass direction of a vector (undefined for the zero vector)
    pub fn from_vector(v: Point) -> Direction45 {
        if v.is_zero() {
            return Direction45::Undefined;
        }
        let mut deg = (v.y as f64).atan2(v.x as f64).to_degrees();
        if deg < 0.0 {
            deg += 360.0;
        }
        // east = 0 deg, south = 90 deg with y pointing down
        let steps = ((deg / 45.0).round() as usize) % 8;
        Direction45::Compass(Compass::from_index(steps + 2))
    }

    pub fn from_seg(seg: &Seg) -> Direction45 {
        Self::from_vector(seg.vector())
    }

    /// Direction of an arc's chord
    pub fn from_arc(arc: &Arc) -> Direction45 {
        Self::from_vector(arc.end - arc.start)
    }

    pub fn is_defined(self) -> bool {
        !matches!(self, Direction45::Undefined)
    }

    pub fn is_diagonal(self) -> bool {
        matches!(self, Direction45::Compass(c) if c.is_diagonal())
    }

    pub fn compass(self) -> Option<Compass> {
        match self {
            Direction45::Compass(c) => Some(c),
            Direction45::Undefined => None,
        }
    }

    fn rotated(self, steps: usize) -> Direction45 {
        match self {
            Direction45::Compass(c) => Direction45::Compass(Compass::from_index(c.index() + steps)),
            Direction45::Undefined => Direction45::Undefined,
        }
    }

    /// Rotated 45 degrees clockwise
    pub fn right(self) -> Direction45 {
        self.rotated(1)
    }

    /// Rotated 45 degrees counter-clockwise
    pub fn left(self) -> Direction45 {
        self.rotated(7)
    }

    pub fn opposite(self) -> Direction45 {
        self.rotated(4)
    }

    /// Corner formed when turning from `self` to `other`
    pub fn angle(self, other: Direction45) -> AngleType {
        let (a, b) = match (self, other) {
            (Direction45::Compass(a), Direction45::Compass(b)) => (a, b),
            _ => return AngleType::Undefined,
        };
        match (a.index() as i32 - b.index() as i32).abs() {
            0 => AngleType::Collinear,
            1 | 7 => AngleType::Obtuse,
            2 | 6 => AngleType::Right,
            3 | 5 => AngleType::Acute,
            _ => AngleType::HalfFull,
        }
    }

    pub fn is_obtuse(self, other: Direction45) -> bool {
        self.angle(other) == AngleType::Obtuse
    }

    /// Builds the initial trace from `p0` to `p1`.
    ///
    /// With a defined direction the trace starts straight or diagonal as the
    /// direction does; an undefined direction uses `start_diagonal`. The result
    /// has at most two straight segments joined by the corner `mode` asks for.
    pub fn build_initial_trace(
        self,
        p0: Point,
        p1: Point,
        start_diagonal: bool,
        mode: CornerMode,
    ) -> PointChain {
        let d = p1 - p0;
        let (w, h) = (d.x.abs(), d.y.abs());
        let (sw, sh) = (d.x.signum(), d.y.signum());

        let start_diag = match self {
            Direction45::Compass(c) => c.is_diagonal(),
            Direction45::Undefined => start_diagonal,
        };

        let mid = if mode.is_90() {
            let horizontal_first = match self.compass() {
                Some(Compass::E) | Some(Compass::W) => true,
                Some(Compass::N) | Some(Compass::S) => false,
                _ => !start_diag,
            };
            if horizontal_first {
                Point::new(p1.x, p0.y)
            } else {
                Point::new(p0.x, p1.y)
            }
        } else {
            let (mp0, mp1) = if w > h {
                (Point::new((w - h) * sw, 0), Point::new(h * sw, h * sh))
            } else {
                (Point::new(0, sh * (h - w)), Point::new(sw * w, sh * w))
            };
            if start_diag {
                p0 + mp1
            } else {
                p0 + mp0
            }
        };

        let mut pl = PointChain::new();
        pl.append(p0);

        let rounded = matches!(mode, CornerMode::Rounded45 | CornerMode::Rounded90);
        if rounded && mid != p0 && mid != p1 {
            append_fillet(&mut pl, p0, mid, p1, mode.is_90());
        } else {
            pl.append(mid);
        }

        pl.append(p1);
        pl.simplify();
        pl
    }
}

/// Appends the straight lead-in and the tangent arc replacing the corner at `mid`
fn append_fillet(pl: &mut PointChain, p0: Point, mid: Point, p1: Point, right_angle: bool) {
    let d1 = mid - p0;
    let d2 = p1 - mid;
    let l1 = d1.norm();
    let l2 = d2.norm();
    let cross = d1.cross(d2);
    if cross == 0 {
        pl.append(mid);
        return;
    }

    let t = l1.min(l2);
    let turn: f64 = if right_angle { 90.0 } else { 45.0 };
    let radius = t / (turn.to_radians() / 2.0).tan();

    let u1 = [d1.x as f64 / l1, d1.y as f64 / l1];
    let u2 = [d2.x as f64 / l2, d2.y as f64 / l2];
    let arc_start = Point::from_f64([mid.x as f64 - u1[0] * t, mid.y as f64 - u1[1] * t]);
    let arc_end = Point::from_f64([mid.x as f64 + u2[0] * t, mid.y as f64 + u2[1] * t]);

    // normal pointing into the turn
    let n = if cross > 0 { [-u1[1], u1[0]] } else { [u1[1], -u1[0]] };
    let center = Point::from_f64([
        arc_start.x as f64 + n[0] * radius,
        arc_start.y as f64 + n[1] * radius,
    ]);

    pl.append(arc_start);
    pl.append_arc(Arc::new(arc_start, arc_end, center, cross < 0), DEFAULT_ARC_ERROR);
}

impl fmt::Display for Direction45 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction45::Compass(Compass::N) => "north",
            Direction45::Compass(Compass::NE) => "north-east",
            Direction45::Compass(Compass::E) => "east",
            Direction45::Compass(Compass::SE) => "south-east",
            Direction45::Compass(Compass::S) => "south",
            Direction45::Compass(Compass::SW) => "south-west",
            Direction45::Compass(Compass::W) => "west",
            Direction45::Compass(Compass::NW) => "north-west",
            Direction45::Undefined => "undefined",
        };
        f.write_str(name)
    }
}

/// True when every straight segment of `chain` lies on a permitted direction
///
/// Arc segments and very short segments are ignored.
pub fn chain_fits_posture(chain: &PointChain, orthogonal: bool) -> bool {
    for (i, s) in chain.segments().enumerate() {
        if chain.is_arc_segment(i) || s.length() < 10.0 {
            continue;
        }
        let v = s.vector();
        let mut deg = (v.y as f64).atan2(v.x as f64).to_degrees();
        if deg < 0.0 {
            deg += 360.0;
        }
        let step = if orthogonal { 90.0 } else { 45.0 };
        let rem = deg % step;
        if rem > 1.0 && rem < step - 1.0 {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(c: &PointChain) -> Vec<(i64, i64)> {
        c.points().iter().map(|p| (p.x, p.y)).collect()
    }

    #[test]
    fn test_from_vector() {
        assert_eq!(Direction45::from_vector(Point::new(10, 0)), Direction45::E);
        assert_eq!(Direction45::from_vector(Point::new(0, -3)), Direction45::N);
        assert_eq!(Direction45::from_vector(Point::new(5, 5)), Direction45::SE);
        assert_eq!(Direction45::from_vector(Point::new(-5, -5)), Direction45::NW);
        assert_eq!(Direction45::from_vector(Point::new(0, 0)), Direction45::Undefined);
    }

    #[test]
    fn test_angles() {
        assert_eq!(Direction45::E.angle(Direction45::E), AngleType::Collinear);
        assert_eq!(Direction45::E.angle(Direction45::NE), AngleType::Obtuse);
        assert_eq!(Direction45::E.angle(Direction45::N), AngleType::Right);
        assert_eq!(Direction45::E.angle(Direction45::NW), AngleType::Acute);
        assert_eq!(Direction45::E.angle(Direction45::W), AngleType::HalfFull);
        assert_eq!(Direction45::N.angle(Direction45::NW), AngleType::Obtuse);
        assert_eq!(Direction45::E.angle(Direction45::Undefined), AngleType::Undefined);
    }

    #[test]
    fn test_build_straight_first() {
        let c = Direction45::E.build_initial_trace(
            Point::new(0, 0),
            Point::new(10, 4),
            false,
            CornerMode::Mitered45,
        );
        assert_eq!(pts(&c), vec![(0, 0), (6, 0), (10, 4)]);
    }

    #[test]
    fn test_build_diagonal_first() {
        let c = Direction45::SE.build_initial_trace(
            Point::new(0, 0),
            Point::new(10, 4),
            false,
            CornerMode::Mitered45,
        );
        assert_eq!(pts(&c), vec![(0, 0), (4, 4), (10, 4)]);
    }

    #[test]
    fn test_build_pure_diagonal_is_single_segment() {
        let c = Direction45::E.build_initial_trace(
            Point::new(0, 0),
            Point::new(10, 10),
            false,
            CornerMode::Mitered45,
        );
        assert_eq!(pts(&c), vec![(0, 0), (10, 10)]);
    }

    #[test]
    fn test_build_orthogonal() {
        let c = Direction45::E.build_initial_trace(
            Point::new(0, 0),
            Point::new(10, 10),
            false,
            CornerMode::Mitered90,
        );
        assert_eq!(pts(&c), vec![(0, 0), (10, 0), (10, 10)]);
        let c = Direction45::N.build_initial_trace(
            Point::new(0, 0),
            Point::new(10, 10),
            false,
            CornerMode::Mitered90,
        );
        assert_eq!(pts(&c), vec![(0, 0), (0, 10), (10, 10)]);
    }

    #[test]
    fn test_build_rounded_has_arc() {
        let c = Direction45::E.build_initial_trace(
            Point::new(0, 0),
            Point::new(1_000_000, 400_000),
            false,
            CornerMode::Rounded45,
        );
        assert_eq!(c.first(), Some(Point::new(0, 0)));
        assert_eq!(c.last(), Some(Point::new(1_000_000, 400_000)));
        assert_eq!(c.arc_count(), 1);
    }

    #[test]
    fn test_posture_check() {
        let ok = PointChain::from_points([Point::new(0, 0), Point::new(100, 0), Point::new(200, 100)]);
        assert!(chain_fits_posture(&ok, false));
        assert!(!chain_fits_posture(&ok, true));
        let bad = PointChain::from_points([Point::new(0, 0), Point::new(100, 37)]);
        assert!(!chain_fits_posture(&bad, false));
    }
}
