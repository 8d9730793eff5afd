//! Head construction and per-mode head routing

use super::LinePlacer;
use crate::geometry::{Point, PointChain};
use crate::router::context::RouterContext;
use crate::router::direction::CornerMode;
use crate::router::item::{Item, KindMask, Via};
use crate::router::line::Line;
use crate::router::node::{NodeArena, NodeId};
use crate::router::optimizer::{OptimizationEffort, Optimizer};
use crate::router::settings::{OptimizerEffort, RouterMode};
use crate::router::shove::ShoveStatus;
use crate::router::walkaround::{Walkaround, WalkaroundStatus};
use tracing::{debug, trace};

const VIA_PUSHOUT_ITERATIONS: usize = 40;
/// Walkaround budget when dodging solids ahead of a shove
const SHOVE_WALK_ITERATIONS: usize = 10;

impl LinePlacer {
    /// Builds the straight 45 degree head from `p_start` to `p` into `head`
    ///
    /// Returns false only when a pending via has nowhere to go.
    pub(super) fn build_initial_line(
        &mut self,
        arena: &NodeArena,
        ctx: &RouterContext,
        p: Point,
        head: &mut Line,
        force_no_via: bool,
    ) -> bool {
        let guessed = self.trail.get_posture(p);
        let ortho = self.ortho(ctx);
        let mode = if ortho { CornerMode::Mitered45 } else { ctx.settings.corner_mode };
        let free_angle = ctx.settings.free_angle && ctx.settings.mode == RouterMode::MarkObstacles;

        let mut chain = PointChain::new();
        if self.p_start != p {
            chain = if free_angle {
                PointChain::from_points([self.p_start, p])
            } else if self.tail.point_count() == 0 {
                guessed.build_initial_trace(self.p_start, p, false, mode)
            } else {
                self.direction.build_initial_trace(self.p_start, p, false, mode)
            };

            if ortho && chain.segment_count() > 1 {
                let new_last = chain.segment(0).line_project(chain.point(-1));
                chain.remove(-1, -1);
                chain.set_point(1, new_last);
            }
        }

        head.layer = self.current_layer;
        head.set_shape(chain);

        if !self.placing_via || force_no_via {
            head.remove_via();
            return true;
        }

        let mut via = self.make_via(p);
        via.net = head.net;

        if ctx.settings.mode == RouterMode::MarkObstacles {
            head.append_via(via);
            return true;
        }

        let lead = p - self.p_start;
        let solids_only = ctx.settings.mode != RouterMode::Walkaround;
        let Some(node) = self.node() else { return false };
        match push_via_out(arena, node, &via, lead, solids_only, VIA_PUSHOUT_ITERATIONS) {
            Some(force) => {
                let end = p + force;
                head.set_shape(guessed.build_initial_trace(self.p_start, end, false, mode));
                true
            }
            None => {
                trace!(target: "pns", "[Placer] via at ({}, {}) cannot be placed", p.x, p.y);
                false
            }
        }
    }

    /// Head for `p` in the current router mode, or `None` on failure
    pub(super) fn route_head(&mut self, arena: &mut NodeArena, ctx: &RouterContext, p: Point) -> Option<Line> {
        match ctx.settings.mode {
            RouterMode::MarkObstacles => self.rh_mark_obstacles(arena, ctx, p),
            RouterMode::Walkaround => self.rh_walk_only(arena, ctx, p),
            RouterMode::Shove => self.rh_shove_only(arena, ctx, p),
        }
    }

    fn rh_mark_obstacles(&mut self, arena: &NodeArena, ctx: &RouterContext, p: Point) -> Option<Line> {
        let mut head = self.head.clone();
        self.build_initial_line(arena, ctx, p, &mut head, false);
        // obstacles are only flagged in this mode, never stopped at
        head.blocking_obstacle = None;
        Some(head)
    }

    fn rh_walk_only(&mut self, arena: &NodeArena, ctx: &RouterContext, p: Point) -> Option<Line> {
        let node = self.node()?;
        let mut init_track = self.head.clone();
        init_track.remove_via();
        init_track.clear_links();
        let mut walk_full = init_track.clone();

        let mut via_ok = false;
        let mut walk_p = p;
        let mut round = 0;

        // with a via pending, a second round re-aims the head at the point the
        // first round actually reached
        while round < 2 && (round == 0 || self.placing_via) {
            ctx.debug.begin_group(&format!("walk-round-{}", round));
            via_ok = self.build_initial_line(arena, ctx, walk_p, &mut init_track, round == 0);

            let hug_threshold = init_track.length() * ctx.settings.walkaround_hug_length_threshold;

            let mut walkaround = Walkaround::new(arena, node, ctx.debug);
            walkaround.set_solids_only(false);
            walkaround.set_iteration_limit(ctx.settings.walkaround_iteration_limit);
            let result = walkaround.route(&init_track);

            let mut status_cw = result.status_cw;
            let mut status_ccw = result.status_ccw;
            let mut chain_cw = result.line_cw.chain;
            let mut chain_ccw = result.line_ccw.chain;

            if status_cw == WalkaroundStatus::Done || status_ccw == WalkaroundStatus::Done {
                let len_cw = if status_cw == WalkaroundStatus::Done { chain_cw.length() } else { f64::MAX };
                let len_ccw = if status_ccw == WalkaroundStatus::Done { chain_ccw.length() } else { f64::MAX };
                let best = if len_cw < len_ccw { &chain_cw } else { &chain_ccw };
                walk_full.set_shape(best.clone());

                // a finished detour that wanders too far is not what the user is pointing at
                if len_cw.min(len_ccw) > hug_threshold {
                    for status in [&mut status_cw, &mut status_ccw] {
                        if *status == WalkaroundStatus::Done {
                            *status = WalkaroundStatus::AlmostDone;
                        }
                    }
                }
            }

            if status_cw == WalkaroundStatus::AlmostDone || status_ccw == WalkaroundStatus::AlmostDone {
                let hug = |chain: &mut PointChain| -> Option<(f64, Point)> {
                    let (dist, closest) = cursor_dist_minimum(chain, p, hug_threshold)?;
                    let idx = chain.split(closest)?;
                    *chain = chain.slice(0, idx as isize);
                    Some((dist, closest))
                };
                let cw = if status_cw == WalkaroundStatus::AlmostDone { hug(&mut chain_cw) } else { None };
                let ccw = if status_ccw == WalkaroundStatus::AlmostDone { hug(&mut chain_ccw) } else { None };

                match (cw, ccw) {
                    (Some((d_cw, p_cw)), Some((d_ccw, _))) if d_cw < d_ccw => {
                        walk_full.set_shape(chain_cw);
                        walk_p = p_cw;
                    }
                    (Some((_, p_cw)), None) => {
                        walk_full.set_shape(chain_cw);
                        walk_p = p_cw;
                    }
                    (_, Some((_, p_ccw))) => {
                        walk_full.set_shape(chain_ccw);
                        walk_p = p_ccw;
                    }
                    (None, None) => {
                        ctx.debug.end_group();
                        return None;
                    }
                }
            } else if status_cw != WalkaroundStatus::Done && status_ccw != WalkaroundStatus::Done {
                ctx.debug.end_group();
                trace!(target: "pns", "[Placer] walkaround stuck both ways");
                return None;
            }

            ctx.debug.end_group();
            round += 1;
        }

        let mut effort = if ctx.settings.optimizer_effort == OptimizerEffort::Low {
            OptimizationEffort::NONE
        } else {
            OptimizationEffort::MERGE_SEGMENTS
        };
        if ctx.settings.smart_pads && !ctx.settings.corner_mode.is_90() && !self.trail.is_manually_forced() {
            effort |= OptimizationEffort::SMART_PADS;
        }

        if self.placing_via && via_ok && walk_full.point_count() > 0 {
            let via = self.make_via(walk_full.point(-1));
            walk_full.append_via(via);
        }

        Optimizer::optimize_line(arena, node, &mut walk_full, effort);

        if arena.check_colliding(node, &walk_full, KindMask::ANY).is_some() {
            trace!(target: "pns", "[Placer] walkaround result still collides");
            return None;
        }
        Some(walk_full)
    }

    fn rh_shove_only(&mut self, arena: &mut NodeArena, ctx: &RouterContext, p: Point) -> Option<Line> {
        let mut init_track = self.head.clone();
        init_track.remove_via();
        init_track.clear_links();
        let via_ok = self.build_initial_line(arena, ctx, p, &mut init_track, false);

        let node = self.shove.as_ref()?.current_node();
        self.current_node = Some(node);

        let mut l2 = {
            let mut walkaround = Walkaround::new(arena, node, ctx.debug);
            walkaround.set_solids_only(true);
            walkaround.set_iteration_limit(SHOVE_WALK_ITERATIONS);
            let (status, mut walk_solids) = walkaround.route_single(&init_track);

            let mut optimizer = Optimizer::new(arena, node);
            optimizer.set_effort(OptimizationEffort::MERGE_SEGMENTS);
            optimizer.set_collision_mask(KindMask::SOLID);
            optimizer.optimize(&mut walk_solids);

            if status == WalkaroundStatus::Done {
                walk_solids
            } else {
                arena.clip_to_nearest_obstacle(node, &init_track)
            }
        };

        let mut l = self.tail.clone();
        l.chain.append_chain(&l2.chain);
        l.chain.simplify();
        l.clear_links();

        if l.point_count() == 0 || l2.point_count() == 0 {
            return None;
        }

        if self.placing_via && via_ok {
            let via = self.make_via(l.point(-1));
            l.append_via(via.clone());
            l2.append_via(via);
        }

        if l.has_loops() {
            trace!(target: "pns", "[Placer] shove candidate loops on itself");
            return None;
        }

        let do_not_touch = self.end_item.as_ref().and_then(|(id, _)| arena.find_owner(node, *id));
        let shove = self.shove.as_mut()?;
        shove.set_springback_do_not_touch_node(do_not_touch);

        let status = shove.shove_lines(arena, &l, ctx.debug);
        let node = shove.current_node();
        self.current_node = Some(node);

        match status {
            ShoveStatus::Ok | ShoveStatus::HeadModified => {
                if status == ShoveStatus::HeadModified {
                    let new_head = shove.new_head()?;
                    l2 = strip_tail(new_head, self.p_start)?;
                }

                let effort = if ctx.settings.smart_pads && !self.trail.is_manually_forced() {
                    OptimizationEffort::SMART_PADS
                } else {
                    OptimizationEffort::MERGE_OBTUSE
                };
                Optimizer::optimize_line(arena, node, &mut l2, effort);
                Some(l2)
            }
            ShoveStatus::Incomplete | ShoveStatus::Fail => {
                debug!(target: "pns", "[Placer] shove failed ({:?}), walking around instead", status);
                let mut walkaround = Walkaround::new(arena, node, ctx.debug);
                walkaround.set_solids_only(false);
                walkaround.set_iteration_limit(SHOVE_WALK_ITERATIONS);
                walkaround.set_approach_cursor(Some(p));
                let (_, walked) = walkaround.route_single(&init_track);
                let fallback = arena.clip_to_nearest_obstacle(node, &walked);
                ctx.debug.add_line(&fallback.chain, "shove-fallback");
                None
            }
        }
    }
}

/// The part of `line` from `p_start` on
fn strip_tail(line: &Line, p_start: Point) -> Option<Line> {
    let idx = line.chain.find(p_start)?;
    let mut out = line.with_chain(line.chain.slice(idx as isize, -1));
    out.via = line.via.clone();
    if out.point_count() == 0 {
        return None;
    }
    Some(out)
}

/// Point of `chain` closest to `cursor`, looking no further along the chain
/// than `length_threshold`
///
/// Candidates are segment starts, perpendicular feet of the cursor and the
/// point where the length budget runs out.
pub(super) fn cursor_dist_minimum(chain: &PointChain, cursor: Point, length_threshold: f64) -> Option<(f64, Point)> {
    let mut last = chain.last()?;
    let mut samples: Vec<Point> = Vec::new();
    let mut acc = 0.0;

    for s in chain.segments() {
        samples.push(s.a);
        let foot = s.nearest_point(cursor);
        if foot != s.a && foot != s.b {
            samples.push(foot);
        }
        acc += s.length();
        if acc > length_threshold {
            last = s.b;
            break;
        }
    }
    samples.push(last);

    samples
        .into_iter()
        .map(|q| (q.distance(cursor), q))
        .min_by(|a, b| a.0.total_cmp(&b.0))
}

/// Moves a via clear of obstacles along the shortest push-out vectors
///
/// Returns the total displacement, or `None` if `max_iterations` pushes did
/// not clear it.
pub(super) fn push_via_out(
    arena: &NodeArena,
    node: NodeId,
    via: &Via,
    lead: Point,
    solids_only: bool,
    max_iterations: usize,
) -> Option<Point> {
    let mask = if solids_only { KindMask::SOLID } else { KindMask::ANY };
    let clearance = arena.clearance();
    let radius = via.diameter / 2;
    let mut moved = via.clone();
    let mut force = Point::default();

    for iter in 0..max_iterations {
        let candidate = Item::Via(moved.clone());
        let Some(obstacle) = arena.check_colliding_item(node, &candidate, &[], mask) else {
            return Some(force);
        };
        let Some(item) = arena.get(node, obstacle) else { return Some(force) };

        let mut step = item.shape().pushout_vector(moved.pos, radius, clearance, lead);
        if iter > max_iterations / 2 && !lead.is_zero() {
            step = step + lead.resize(radius);
        }
        if step.is_zero() {
            return Some(force);
        }
        moved.pos = moved.pos + step;
        force = force + step;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::item::{LayerRange, Solid, SolidShape, ViaType};
    use crate::router::settings::DesignRules;

    #[test]
    fn test_cursor_minimum_on_detour() {
        let chain = PointChain::from_points([
            Point::new(0, 0),
            Point::new(0, 1000),
            Point::new(2000, 1000),
            Point::new(2000, 0),
        ]);
        let (d, q) = cursor_dist_minimum(&chain, Point::new(1000, 600), 10_000.0).expect("minimum");
        assert_eq!(q, Point::new(1000, 1000));
        assert!((d - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_cursor_minimum_respects_length_budget() {
        let chain = PointChain::from_points([Point::new(0, 0), Point::new(1000, 0), Point::new(1000, 5000)]);
        let (_, q) = cursor_dist_minimum(&chain, Point::new(1000, 5000), 500.0).expect("minimum");
        assert_eq!(q, Point::new(1000, 0));
    }

    #[test]
    fn test_via_pushed_clear_of_pad() {
        let mut arena = NodeArena::new(DesignRules { clearance: 100 });
        let root = arena.root();
        arena.add(
            root,
            Item::Solid(Solid {
                shape: SolidShape::Circle { center: Point::new(0, 0), radius: 500 },
                layers: LayerRange::new(0, 31),
                net: 2,
                anchor: Point::new(0, 0),
            }),
        );
        let via = Via {
            pos: Point::new(600, 0),
            diameter: 400,
            drill: 200,
            layers: LayerRange::new(0, 31),
            net: 1,
            via_type: ViaType::Through,
        };
        let force = push_via_out(&arena, root, &via, Point::new(1000, 0), true, 40).expect("pushed");
        assert!(force.x > 0);
        let mut moved = via.clone();
        moved.pos = via.pos + force;
        assert!(arena.check_colliding_item(root, &Item::Via(moved), &[], KindMask::ANY).is_none());
    }
}
