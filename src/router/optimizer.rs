//! Line optimizer
//!
//! Cleans up traces after routing: merges collinear and obtuse runs,
//! replaces segment windows with cheaper 45 degree bridges, straightens
//! short pad-to-pad fan-outs and rebuilds pad exits. Every candidate is
//! checked against the node; a candidate that collides is dropped and the
//! line keeps its previous shape.
//!
//! Passes repeat until none of them finds an improvement, so running the
//! optimizer again on its own output changes nothing.

use super::direction::{chain_fits_posture, AngleType, CornerMode, Direction45};
use super::item::{Item, ItemId, KindMask, LayerRange, SolidShape};
use super::line::Line;
use super::node::{NodeArena, NodeId};
use crate::geometry::{Point, PointChain};
use std::ops::{BitOr, BitOrAssign};
use tracing::trace;

/// Optimization passes to run, combinable with `|`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OptimizationEffort(u32);

impl OptimizationEffort {
    pub const NONE: OptimizationEffort = OptimizationEffort(0);
    pub const MERGE_SEGMENTS: OptimizationEffort = OptimizationEffort(0x01);
    pub const MERGE_OBTUSE: OptimizationEffort = OptimizationEffort(0x02);
    pub const MERGE_COLINEAR: OptimizationEffort = OptimizationEffort(0x04);
    pub const FANOUT_CLEANUP: OptimizationEffort = OptimizationEffort(0x08);
    pub const SMART_PADS: OptimizationEffort = OptimizationEffort(0x10);

    pub fn contains(self, other: OptimizationEffort) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for OptimizationEffort {
    type Output = OptimizationEffort;
    fn bitor(self, rhs: OptimizationEffort) -> OptimizationEffort {
        OptimizationEffort(self.0 | rhs.0)
    }
}

impl BitOrAssign for OptimizationEffort {
    fn bitor_assign(&mut self, rhs: OptimizationEffort) {
        self.0 |= rhs.0;
    }
}

const MAX_PASSES: usize = 64;

/// Pad-to-pad fan-outs longer than this are left alone (10 mm)
const FANOUT_MAX_LENGTH: f64 = 10_000_000.0;

fn corner_weight(angle: AngleType) -> u32 {
    match angle {
        AngleType::Collinear => 0,
        AngleType::Obtuse => 1,
        AngleType::Right => 10,
        AngleType::Acute => 50,
        AngleType::HalfFull => 60,
        AngleType::Undefined => 100,
    }
}

/// Corner and length cost of a chain
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cost {
    corners: u32,
    length: f64,
}

impl Cost {
    fn of(chain: &PointChain) -> Cost {
        let mut corners = 0;
        let n = chain.segment_count();
        for i in 1..n {
            if chain.is_arc_segment(i - 1) || chain.is_arc_segment(i) {
                continue;
            }
            let d0 = Direction45::from_seg(&chain.segment(i as isize - 1));
            let d1 = Direction45::from_seg(&chain.segment(i as isize));
            corners += corner_weight(d0.angle(d1));
        }
        Cost { corners, length: chain.length() }
    }

    fn is_better_than(&self, other: &Cost) -> bool {
        (self.corners < other.corners && self.length <= other.length * 1.05)
            || (self.corners <= other.corners && self.length + 1.0 < other.length)
    }
}

pub struct Optimizer<'a> {
    arena: &'a NodeArena,
    node: NodeId,
    effort: OptimizationEffort,
    mask: KindMask,
}

impl<'a> Optimizer<'a> {
    pub fn new(arena: &'a NodeArena, node: NodeId) -> Self {
        Self { arena, node, effort: OptimizationEffort::MERGE_SEGMENTS, mask: KindMask::ANY }
    }

    pub fn set_effort(&mut self, effort: OptimizationEffort) {
        self.effort = effort;
    }

    /// Kinds of items a candidate must stay clear of
    pub fn set_collision_mask(&mut self, mask: KindMask) {
        self.mask = mask;
    }

    /// One-shot helper
    pub fn optimize_line(arena: &NodeArena, node: NodeId, line: &mut Line, effort: OptimizationEffort) -> bool {
        let mut opt = Optimizer::new(arena, node);
        opt.set_effort(effort);
        opt.optimize(line)
    }

    /// Runs the enabled passes until none improves the line; true if it changed
    pub fn optimize(&self, line: &mut Line) -> bool {
        if line.point_count() < 2 || self.effort.is_empty() {
            return false;
        }
        let original = line.chain.clone();

        for pass in 0..MAX_PASSES {
            let mut improved = false;
            if self.effort.contains(OptimizationEffort::MERGE_COLINEAR) {
                improved |= merge_colinear(line);
            }
            if self.effort.contains(OptimizationEffort::MERGE_OBTUSE) {
                improved |= self.merge_obtuse(line);
            }
            if self.effort.contains(OptimizationEffort::MERGE_SEGMENTS) {
                improved |= self.merge_full(line);
            }
            if self.effort.contains(OptimizationEffort::SMART_PADS) {
                improved |= self.smart_pads(line);
            }
            if self.effort.contains(OptimizationEffort::FANOUT_CLEANUP) {
                improved |= self.fanout_cleanup(line);
            }
            if !improved {
                trace!(target: "pns", "[Optimizer] settled after {} passes", pass);
                break;
            }
        }

        let changed = line.chain != original;
        if changed {
            line.links.clear();
        }
        changed
    }

    fn is_clear(&self, line: &Line) -> bool {
        self.arena.check_colliding(self.node, line, self.mask).is_none()
    }

    /// Accepts `chain` for `line` if it is valid, cheaper and clear
    fn try_accept(&self, line: &mut Line, mut chain: PointChain) -> bool {
        chain.simplify();
        if chain == line.chain || chain.self_intersects() || !chain_fits_posture(&chain, false) {
            return false;
        }
        if !Cost::of(&chain).is_better_than(&Cost::of(&line.chain)) {
            return false;
        }
        let mut candidate = line.clone();
        candidate.chain = chain;
        if !self.is_clear(&candidate) {
            return false;
        }
        line.chain = candidate.chain;
        true
    }

    /// Replaces a window of `step` segments with a two segment bridge
    fn merge_step(&self, line: &mut Line, step: usize) -> bool {
        let n = line.segment_count();
        if step < 2 || step > n {
            return false;
        }
        for i in 0..=(n - step) {
            if (i..i + step).any(|k| line.chain.is_arc_segment(k)) {
                continue;
            }
            let p0 = line.point(i as isize);
            let p1 = line.point((i + step) as isize);
            for diagonal in [false, true] {
                let bridge = Direction45::Undefined.build_initial_trace(p0, p1, diagonal, CornerMode::Mitered45);
                let mut chain = line.chain.slice(0, i as isize);
                chain.append_chain(&bridge);
                chain.append_chain(&line.chain.slice((i + step) as isize, -1));
                if self.try_accept(line, chain) {
                    return true;
                }
            }
        }
        false
    }

    fn merge_full(&self, line: &mut Line) -> bool {
        let mut changed = false;
        let mut step = line.segment_count();
        let mut budget = MAX_PASSES;
        while step >= 2 && budget > 0 {
            budget -= 1;
            if self.merge_step(line, step) {
                changed = true;
                step = step.min(line.segment_count());
            } else {
                step -= 1;
            }
        }
        changed
    }

    /// Removes the middle segment of obtuse staircases
    fn merge_obtuse(&self, line: &mut Line) -> bool {
        let mut changed = false;
        let mut i = 0;
        while i + 3 <= line.segment_count() {
            if (i..i + 3).any(|k| line.chain.is_arc_segment(k)) {
                i += 1;
                continue;
            }
            let s1 = line.segment(i as isize);
            let s2 = line.segment(i as isize + 2);
            let (d1, d2) = (Direction45::from_seg(&s1), Direction45::from_seg(&s2));
            if d1.is_obtuse(d2) {
                if let Some(ip) = s1.line_intersection(&s2) {
                    let keeps_heading = Direction45::from_vector(ip - s1.a) == d1
                        && Direction45::from_vector(s2.b - ip) == d2;
                    if keeps_heading {
                        let mut chain = line.chain.slice(0, i as isize);
                        chain.append(ip);
                        chain.append_chain(&line.chain.slice(i as isize + 3, -1));
                        if self.try_accept(line, chain) {
                            changed = true;
                            continue;
                        }
                    }
                }
            }
            i += 1;
        }
        changed
    }

    fn pad_at(&self, p: Point, line: &Line, kinds: KindMask) -> Option<(ItemId, Item)> {
        let joint = self.arena.find_joint(self.node, p, LayerRange::single(line.layer), line.net);
        joint
            .links
            .iter()
            .filter(|l| !line.contains_link(l.id))
            .find_map(|l| {
                let item = self.arena.get(self.node, l.id)?;
                item.of_kind(kinds).then(|| (l.id, item.clone()))
            })
    }

    /// Straightens a short line joining two pads/vias into a plain 45 degree path
    fn fanout_cleanup(&self, line: &mut Line) -> bool {
        if line.point_count() < 3 || line.length() >= FANOUT_MAX_LENGTH {
            return false;
        }
        let (p0, p1) = (line.point(0), line.point(-1));
        let start = self.pad_at(p0, line, KindMask::SOLID | KindMask::VIA);
        let end = self.pad_at(p1, line, KindMask::SOLID | KindMask::VIA);
        if start.is_none() || end.is_none() {
            return false;
        }
        for diagonal in [false, true] {
            let chain = Direction45::Undefined.build_initial_trace(p0, p1, diagonal, CornerMode::Mitered45);
            if self.try_accept(line, chain) {
                return true;
            }
        }
        false
    }

    fn smart_pads(&self, line: &mut Line) -> bool {
        let mut changed = false;
        for at_end in [false, true] {
            if line.point_count() < 2 {
                break;
            }
            if at_end {
                line.chain.reverse();
            }
            changed |= self.smart_pad_exit(line);
            if at_end {
                line.chain.reverse();
            }
        }
        changed
    }

    /// Rebuilds the first few segments leaving a pad as a straight breakout
    /// plus a 45 degree connection
    fn smart_pad_exit(&self, line: &mut Line) -> bool {
        let anchor = line.point(0);
        let Some((_, Item::Solid(pad))) = self.pad_at(anchor, line, KindMask::SOLID) else {
            return false;
        };
        if pad.anchor != anchor {
            return false;
        }

        let breakouts = breakout_points(&pad.shape, anchor, line.width);
        let mut best: Option<PointChain> = None;
        let mut best_cost = Cost::of(&line.chain);
        let reach = line.point_count().min(4);

        for n in 1..reach {
            if (0..n).any(|k| line.chain.is_arc_segment(k)) {
                break;
            }
            let target = line.point(n as isize);
            let rest = line.chain.slice(n as isize, -1);
            for b in &breakouts {
                for diagonal in [false, true] {
                    let mut chain = PointChain::from_points([anchor, *b]);
                    let bend = Direction45::Undefined.build_initial_trace(*b, target, diagonal, CornerMode::Mitered45);
                    chain.append_chain(&bend);
                    chain.append_chain(&rest);
                    chain.simplify();
                    if chain == line.chain || chain.self_intersects() || !chain_fits_posture(&chain, false) {
                        continue;
                    }
                    let cost = Cost::of(&chain);
                    if !cost.is_better_than(&best_cost) {
                        continue;
                    }
                    let mut candidate = line.clone();
                    candidate.chain = chain.clone();
                    if self.is_clear(&candidate) {
                        best_cost = cost;
                        best = Some(chain);
                    }
                }
            }
        }

        match best {
            Some(chain) => {
                line.chain = chain;
                true
            }
            None => false,
        }
    }
}

fn merge_colinear(line: &mut Line) -> bool {
    let before = line.point_count();
    line.chain.simplify();
    line.point_count() != before
}

/// Points just outside the pad edge in each compass direction the pad allows
fn breakout_points(shape: &SolidShape, anchor: Point, width: i64) -> Vec<Point> {
    let margin = width / 2;
    let (ex, ey, allow_diagonal) = match shape {
        SolidShape::Circle { radius, .. } => (*radius, *radius, true),
        SolidShape::Rect { half_width, half_height, .. } => (*half_width, *half_height, half_width == half_height),
        SolidShape::Polygon { outline } => {
            let (mut min, mut max) = (anchor, anchor);
            for p in outline {
                min = Point::new(min.x.min(p.x), min.y.min(p.y));
                max = Point::new(max.x.max(p.x), max.y.max(p.y));
            }
            ((max.x - min.x) / 2, (max.y - min.y) / 2, false)
        }
    };

    let mut out = vec![
        anchor + Point::new(ex + margin, 0),
        anchor + Point::new(-(ex + margin), 0),
        anchor + Point::new(0, ey + margin),
        anchor + Point::new(0, -(ey + margin)),
    ];
    if allow_diagonal {
        let e = ex.min(ey) + margin;
        for (sx, sy) in [(1, 1), (1, -1), (-1, 1), (-1, -1)] {
            out.push(anchor + Point::new(sx * e, sy * e));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::item::Solid;
    use crate::router::settings::DesignRules;

    fn line(points: &[(i64, i64)]) -> Line {
        let mut l = Line::new(200, 1, 0);
        l.chain = PointChain::from_points(points.iter().map(|&(x, y)| Point::new(x, y)));
        l
    }

    #[test]
    fn test_merge_colinear() {
        let arena = NodeArena::new(DesignRules::default());
        let mut l = line(&[(0, 0), (1000, 0), (2000, 0), (3000, 1000)]);
        assert!(Optimizer::optimize_line(&arena, arena.root(), &mut l, OptimizationEffort::MERGE_COLINEAR));
        assert_eq!(l.point_count(), 3);
    }

    #[test]
    fn test_merge_segments_removes_detour() {
        let arena = NodeArena::new(DesignRules::default());
        let mut l = line(&[(0, 0), (0, 2000), (3000, 2000), (3000, 0), (6000, 0)]);
        assert!(Optimizer::optimize_line(&arena, arena.root(), &mut l, OptimizationEffort::MERGE_SEGMENTS));
        assert_eq!(l.point(0), Point::new(0, 0));
        assert_eq!(l.point(-1), Point::new(6000, 0));
        assert!(l.length() < 6001.0);
    }

    #[test]
    fn test_obstacle_blocks_merge() {
        let mut arena = NodeArena::new(DesignRules { clearance: 100 });
        let root = arena.root();
        arena.add(
            root,
            Item::Solid(Solid {
                shape: SolidShape::Circle { center: Point::new(3000, 0), radius: 800 },
                layers: LayerRange::new(0, 31),
                net: 2,
                anchor: Point::new(3000, 0),
            }),
        );
        let original = line(&[(0, 0), (0, 2000), (6000, 2000), (6000, 0)]);
        let mut l = original.clone();
        Optimizer::optimize_line(&arena, root, &mut l, OptimizationEffort::MERGE_SEGMENTS);
        assert!(arena.check_colliding(root, &l, KindMask::ANY).is_none());
        assert_eq!(l.point(-1), original.point(-1));
    }

    #[test]
    fn test_merge_obtuse_staircase() {
        let arena = NodeArena::new(DesignRules::default());
        let mut l = line(&[(0, 0), (2000, 0), (2000, 500), (3000, 1500)]);
        assert!(Optimizer::optimize_line(&arena, arena.root(), &mut l, OptimizationEffort::MERGE_OBTUSE));
        assert_eq!(l.segment_count(), 2);
        assert_eq!(l.point(1), Point::new(1500, 0));
        assert_eq!(l.point(-1), Point::new(3000, 1500));
    }

    #[test]
    fn test_second_run_is_noop() {
        let arena = NodeArena::new(DesignRules::default());
        let effort =
            OptimizationEffort::MERGE_SEGMENTS | OptimizationEffort::MERGE_OBTUSE | OptimizationEffort::MERGE_COLINEAR;
        let mut l = line(&[(0, 0), (0, 2000), (1000, 3000), (3000, 3000), (3000, 0), (6000, 0)]);
        Optimizer::optimize_line(&arena, arena.root(), &mut l, effort);
        let once = l.clone();
        assert!(!Optimizer::optimize_line(&arena, arena.root(), &mut l, effort));
        assert_eq!(l, once);
    }

    #[test]
    fn test_effort_flags() {
        let e = OptimizationEffort::MERGE_SEGMENTS | OptimizationEffort::SMART_PADS;
        assert!(e.contains(OptimizationEffort::SMART_PADS));
        assert!(!e.contains(OptimizationEffort::MERGE_OBTUSE));
        assert!(!e.contains(OptimizationEffort::NONE));
    }
}
