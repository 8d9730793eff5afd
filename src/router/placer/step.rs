//! One routing step and the tail/head bookkeeping around it

use super::LinePlacer;
use crate::geometry::{Point, PointChain};
use crate::router::context::RouterContext;
use crate::router::direction::{chain_fits_posture, AngleType, CornerMode, Direction45};
use crate::router::item::KindMask;
use crate::router::node::NodeArena;
use crate::router::optimizer::{OptimizationEffort, Optimizer};
use crate::router::settings::RouterMode;
use tracing::trace;

/// Upper bound on head corrections per step
const CORRECTION_BUDGET: usize = 32;

/// Why a step has to be redone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// The head crossed the tail; the tail was cut back
    SelfIntersection,
    /// The head doubled back over the last tail segment
    Pullback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Accepted,
    Retry(Correction),
    Failed,
}

impl LinePlacer {
    /// Routes the head to `p`, correcting the tail as needed
    ///
    /// On failure the head reverts to the last one that routed.
    pub(super) fn route_step(&mut self, arena: &mut NodeArena, ctx: &RouterContext, p: Point) {
        ctx.debug.begin_group("route-step");

        let mut failed = true;
        let mut retrying = false;
        for _ in 0..CORRECTION_BUDGET {
            match self.step_attempt(arena, ctx, p, retrying) {
                StepOutcome::Accepted => {
                    failed = false;
                    break;
                }
                StepOutcome::Retry(reason) => {
                    trace!(target: "pns", "[Placer] retry step: {:?}", reason);
                    retrying = true;
                }
                StepOutcome::Failed => break,
            }
        }

        if failed {
            if self.last_head.point_count() > 0 {
                self.head = self.last_head.clone();
            } else {
                self.head.clear();
            }
        } else {
            self.last_head = self.head.clone();
        }

        if !failed && ctx.settings.follow_mouse {
            let node_arena: &NodeArena = arena;
            if !self.optimize_tail_head_transition(node_arena) {
                self.merge_head();
            }
        }

        ctx.debug.add_line(&self.tail.chain, "tail");
        ctx.debug.add_line(&self.head.chain, "head");
        ctx.debug.end_group();
    }

    fn step_attempt(&mut self, arena: &mut NodeArena, ctx: &RouterContext, p: Point, retrying: bool) -> StepOutcome {
        if !retrying && ctx.settings.follow_mouse {
            self.reduce_tail(arena, p);
        }

        let Some(new_head) = self.route_head(arena, ctx, p) else {
            return StepOutcome::Failed;
        };

        let free_angle = ctx.settings.free_angle && ctx.settings.mode == RouterMode::MarkObstacles;
        if !free_angle && !chain_fits_posture(&new_head.chain, false) {
            trace!(target: "pns", "[Placer] head breaks 45 degree discipline");
            return StepOutcome::Failed;
        }

        self.head = new_head;

        if self.handle_self_intersections() {
            return StepOutcome::Retry(Correction::SelfIntersection);
        }
        if self.handle_pullback() {
            return StepOutcome::Retry(Correction::Pullback);
        }
        StepOutcome::Accepted
    }

    /// Drops tail segments the cursor made redundant
    ///
    /// Walks the tail backwards looking for the earliest segment from whose
    /// start the cursor is reachable while keeping that segment's direction.
    pub(super) fn reduce_tail(&mut self, arena: &NodeArena, p: Point) -> bool {
        let n = self.tail.segment_count();
        if self.head.segment_count() < 1 || n < 2 {
            return false;
        }
        let Some(node) = self.node() else { return false };

        let mut reduce: Option<(usize, Point, Direction45)> = None;
        for i in (0..n).rev() {
            let s = self.tail.segment(i as isize);
            let dir = Direction45::from_seg(&s);
            let replacement = dir.build_initial_trace(s.a, p, false, CornerMode::Mitered45);
            if replacement.segment_count() < 1 {
                continue;
            }

            let candidate = self.tail.with_chain(replacement.clone());
            if arena.check_colliding(node, &candidate, KindMask::ANY).is_some() {
                break;
            }
            if Direction45::from_seg(&replacement.segment(0)) == dir {
                reduce = Some((i, s.a, dir));
            }
        }

        if let Some((i, start, dir)) = reduce {
            trace!(target: "pns", "[Placer] reduce tail to {} segments", i);
            self.p_start = start;
            self.direction = dir;
            self.tail.chain.remove(i as isize + 1, -1);
            self.head.clear();
            return true;
        }

        if self.tail.segment_count() == 0 {
            self.direction = self.initial_direction;
        }
        false
    }

    /// Cuts the tail back to where the head first crosses it
    pub(super) fn handle_self_intersections(&mut self) -> bool {
        if self.tail.point_count() < 2 || self.head.point_count() < 2 {
            return false;
        }

        if self.tail.point(0) == self.head.point(0) {
            self.p_start = self.tail.point(0);
            self.direction = self.initial_direction;
            self.tail.chain.clear();
            return true;
        }

        let ips = self.tail.chain.intersect(&self.head.chain);
        let Some(first) = ips.iter().min_by_key(|ip| ip.index_our) else {
            return false;
        };

        if first.p == self.head.point(0) || first.p == self.tail.point(-1) {
            return false;
        }

        let n = first.index_our;
        if n < 2 {
            self.p_start = self.tail.point(0);
            self.direction = self.initial_direction;
            self.tail.chain.clear();
            self.head.chain.clear();
            return true;
        }

        let last = self.tail.segment(n as isize - 1);
        self.p_start = last.a;
        self.direction = Direction45::from_seg(&last);
        self.tail.chain.remove(n as isize, -1);
        true
    }

    /// Retracts the last tail shape when the head turns back on it
    pub(super) fn handle_pullback(&mut self) -> bool {
        if self.head.point_count() < 2 {
            return false;
        }

        let n = self.tail.point_count();
        if n == 0 {
            return false;
        }
        if n == 1 {
            self.p_start = self.tail.point(0);
            self.tail.chain.clear();
            return true;
        }

        let first_head = first_shape_direction(&self.head.chain);
        let last_tail = last_shape_direction(&self.tail.chain);
        let angle = first_head.angle(last_tail);

        // the head leaves at a sharper turn than the posture allows
        let against_posture = self.direction.is_defined()
            && !matches!(self.direction.angle(first_head), AngleType::Collinear | AngleType::Obtuse);
        let doubles_back = matches!(angle, AngleType::Right | AngleType::Acute);

        if !(against_posture || doubles_back) {
            return false;
        }

        let Some(start) = self.tail.chain.last_shape_start() else { return false };
        self.direction = shape_direction_at(&self.tail.chain, start);
        self.p_start = self.tail.point(start as isize);

        self.tail.chain.remove_last_shape();
        if self.tail.point_count() < 2 {
            self.tail.chain.clear();
        }
        if self.tail.segment_count() == 0 {
            self.direction = self.initial_direction;
        }
        trace!(target: "pns", "[Placer] pullback, tail now {} pts", self.tail.point_count());
        true
    }

    /// Smooths the seam between tail and head, or cleans up a pad fanout
    pub(super) fn optimize_tail_head_transition(&mut self, arena: &NodeArena) -> bool {
        let Some(node) = self.node() else { return false };

        let mut whole = self.trace();
        if !self.trail.is_manually_forced()
            && Optimizer::optimize_line(arena, node, &mut whole, OptimizationEffort::FANOUT_CLEANUP)
        {
            if whole.segment_count() < 1 {
                return false;
            }
            self.p_start = whole.point(0);
            self.direction = whole.direction(0);
            self.head = whole;
            self.tail.chain.clear();
            return true;
        }

        if self.tail.shape_count() < 3 || self.head.point_count() == 0 {
            return false;
        }

        let threshold = self.tail.point_count().min(4) as isize;
        let mut opt_chain = self.tail.chain.slice(-threshold, -1);
        let head_end = 2.min(self.head.point_count() as isize - 1);
        opt_chain.append_chain(&self.head.chain.slice(0, head_end));

        let mut opt_line = self.tail.with_chain(opt_chain);
        if !Optimizer::optimize_line(arena, node, &mut opt_line, OptimizationEffort::MERGE_SEGMENTS) {
            return false;
        }
        if opt_line.segment_count() == 0 {
            return false;
        }

        self.head.chain.clear();
        self.tail.chain.replace(-threshold, -1, &opt_line.chain);
        self.tail.chain.simplify();
        self.p_start = opt_line.point(-1);
        self.direction = opt_line.direction(-1);
        true
    }

    /// Moves a settled head into the tail
    pub(super) fn merge_head(&mut self) -> bool {
        let forbidden = AngleType::Acute | AngleType::HalfFull | AngleType::Undefined;

        self.head.chain.simplify();
        self.tail.chain.simplify();

        let n_head = self.head.shape_count();
        let n_tail = self.tail.shape_count();
        if n_head < 3 {
            return false;
        }
        if n_tail > 0 && self.head.point(0) != self.tail.point(-1) {
            return false;
        }
        if self.head.count_corners(forbidden) != 0 {
            return false;
        }

        if n_tail > 0 {
            let dir_head = first_shape_direction(&self.head.chain);
            let dir_tail = last_shape_direction(&self.tail.chain);
            if forbidden.contains(dir_head.angle(dir_tail)) {
                return false;
            }
        }

        self.tail.chain.append_chain(&self.head.chain);
        self.tail.chain.simplify();

        self.p_start = self.tail.point(-1);
        self.direction = last_shape_direction(&self.tail.chain);
        self.head.chain.clear();
        trace!(target: "pns", "[Placer] merged head, tail now {} pts", self.tail.point_count());
        true
    }
}

/// Direction of the shape (segment or whole arc) starting at point `idx`
fn shape_direction_at(chain: &PointChain, idx: usize) -> Direction45 {
    if let Some(arc) = chain.arc_index(idx).and_then(|k| chain.arc(k)) {
        return Direction45::from_arc(&arc);
    }
    Direction45::from_seg(&chain.segment(idx as isize))
}

fn first_shape_direction(chain: &PointChain) -> Direction45 {
    if chain.segment_count() == 0 {
        return Direction45::Undefined;
    }
    shape_direction_at(chain, 0)
}

fn last_shape_direction(chain: &PointChain) -> Direction45 {
    match chain.last_shape_start() {
        Some(start) => shape_direction_at(chain, start),
        None => Direction45::Undefined,
    }
}
