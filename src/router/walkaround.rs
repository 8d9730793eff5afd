//! Walkaround: deflect a line around obstacles without moving them
//!
//! Each iteration finds the obstacle the line reaches first and replaces the
//! stretch inside its hull with the hull outline, travelled clockwise or
//! counter-clockwise. Both handednesses are computed independently so the
//! caller can pick.

use super::debug::DebugSink;
use super::item::KindMask;
use super::line::Line;
use super::node::{NodeArena, NodeId};
use crate::geometry::Point;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkaroundStatus {
    /// Clear of every obstacle
    Done,
    /// Progress stalled; the line holds the usable part
    AlmostDone,
    /// No usable progress
    Stuck,
}

#[derive(Debug, Clone)]
pub struct WalkaroundResult {
    pub status_cw: WalkaroundStatus,
    pub status_ccw: WalkaroundStatus,
    pub line_cw: Line,
    pub line_ccw: Line,
}

pub struct Walkaround<'a> {
    arena: &'a NodeArena,
    node: NodeId,
    solids_only: bool,
    iteration_limit: usize,
    cursor: Option<Point>,
    debug: &'a dyn DebugSink,
}

impl<'a> Walkaround<'a> {
    pub fn new(arena: &'a NodeArena, node: NodeId, debug: &'a dyn DebugSink) -> Self {
        Self { arena, node, solids_only: false, iteration_limit: 50, cursor: None, debug }
    }

    pub fn set_node(&mut self, node: NodeId) {
        self.node = node;
    }

    /// Only pads/solids count as obstacles
    pub fn set_solids_only(&mut self, solids_only: bool) {
        self.solids_only = solids_only;
    }

    pub fn set_iteration_limit(&mut self, limit: usize) {
        self.iteration_limit = limit.max(1);
    }

    /// Cut unfinished results at their closest approach to `cursor`
    pub fn set_approach_cursor(&mut self, cursor: Option<Point>) {
        self.cursor = cursor;
    }

    fn mask(&self) -> KindMask {
        if self.solids_only {
            KindMask::SOLID
        } else {
            KindMask::ANY
        }
    }

    fn walk(&self, initial: &Line, cw: bool) -> (WalkaroundStatus, Line) {
        let mut line = initial.clone();
        line.remove_via();
        line.clear_links();

        if line.segment_count() == 0 {
            return (WalkaroundStatus::Done, line);
        }

        let mut status = WalkaroundStatus::AlmostDone;
        for iter in 0..self.iteration_limit {
            let Some(obs) = self.arena.nearest_obstacle(self.node, &line, self.mask()) else {
                status = WalkaroundStatus::Done;
                break;
            };
            let Some(item) = self.arena.get(self.node, obs.item) else { break };
            let hull = item.hull(self.arena.clearance(), line.width);
            self.debug.add_line(&hull, "walk-hull");

            match line.walkaround(&hull, cw) {
                Some(path) if path != line.chain => {
                    trace!(
                        target: "pns",
                        "[Walkaround] iter {} cw={} around {} -> {} pts",
                        iter, cw, obs.item, path.point_count()
                    );
                    line.set_shape(path);
                }
                _ => {
                    if hull.point_inside(line.point(0)) {
                        trace!(target: "pns", "[Walkaround] start inside {}", obs.item);
                        return (WalkaroundStatus::Stuck, line);
                    }
                    // the end is unreachable: keep what leads up to the obstacle
                    line.clip_to(obs.ip_first);
                    status = WalkaroundStatus::AlmostDone;
                    break;
                }
            }
        }

        if status != WalkaroundStatus::Done {
            if let Some(cursor) = self.cursor {
                if let Some(p) = line.chain.nearest_point(cursor) {
                    line.clip_to(p);
                }
            }
            if line.segment_count() == 0 {
                status = WalkaroundStatus::Stuck;
            }
        }
        self.debug.add_line(&line.chain, if cw { "walk-cw" } else { "walk-ccw" });
        (status, line)
    }

    /// Walks around obstacles in both directions
    pub fn route(&self, initial: &Line) -> WalkaroundResult {
        self.debug.begin_group("walkaround");
        let (status_cw, line_cw) = self.walk(initial, true);
        let (status_ccw, line_ccw) = self.walk(initial, false);
        self.debug.end_group();
        trace!(target: "pns", "[Walkaround] cw {:?} ccw {:?}", status_cw, status_ccw);
        WalkaroundResult { status_cw, status_ccw, line_cw, line_ccw }
    }

    /// Best single result: the shorter finished walk, else the partial one
    /// ending closest to the target
    pub fn route_single(&self, initial: &Line) -> (WalkaroundStatus, Line) {
        let r = self.route(initial);
        let target = self.cursor.or_else(|| initial.chain.last()).unwrap_or_default();

        let done = |s: WalkaroundStatus| s == WalkaroundStatus::Done;
        match (done(r.status_cw), done(r.status_ccw)) {
            (true, true) => {
                if r.line_cw.length() <= r.line_ccw.length() {
                    (WalkaroundStatus::Done, r.line_cw)
                } else {
                    (WalkaroundStatus::Done, r.line_ccw)
                }
            }
            (true, false) => (WalkaroundStatus::Done, r.line_cw),
            (false, true) => (WalkaroundStatus::Done, r.line_ccw),
            (false, false) => {
                let partial = |s: WalkaroundStatus| s == WalkaroundStatus::AlmostDone;
                let dist = |l: &Line| l.chain.last().map_or(f64::MAX, |p| p.distance(target));
                match (partial(r.status_cw), partial(r.status_ccw)) {
                    (true, true) if dist(&r.line_ccw) < dist(&r.line_cw) => (WalkaroundStatus::AlmostDone, r.line_ccw),
                    (true, _) => (WalkaroundStatus::AlmostDone, r.line_cw),
                    (false, true) => (WalkaroundStatus::AlmostDone, r.line_ccw),
                    (false, false) => (WalkaroundStatus::Stuck, initial.clone()),
                }
            }
        }
    }
}
