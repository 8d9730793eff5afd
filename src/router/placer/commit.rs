//! Fixing, undoing and committing placed track

use super::LinePlacer;
use crate::geometry::Point;
use crate::router::context::{commit_routing, RouterContext};
use crate::router::direction::Direction45;
use crate::router::item::{Item, ItemId, ItemKind, KindMask, NO_NET};
use crate::router::line::Line;
use crate::router::node::{NodeArena, NodeId};
use crate::router::optimizer::{OptimizationEffort, Optimizer};
use crate::router::settings::RouterMode;
use tracing::{debug, trace};

impl LinePlacer {
    /// Writes the current trace into the node
    ///
    /// Returns true when the route is finished: it reached an item of its
    /// own net, or `force_finish` was given. Otherwise the trace is fixed up
    /// to its last segment and routing continues from there.
    pub fn fix_route(
        &mut self,
        arena: &mut NodeArena,
        ctx: &RouterContext,
        p: Point,
        end_item: Option<ItemId>,
        force_finish: bool,
    ) -> bool {
        if self.idle {
            return false;
        }

        let mut fix_all = ctx.settings.fix_all_segments;
        let mut real_end = false;
        let mut pl = self.trace();

        let lookup = self.last_node.or(self.current_node).or(self.world);
        let mut end = match (end_item, lookup) {
            (Some(id), Some(node)) => arena.get(node, id).cloned().map(|item| (id, item)),
            _ => None,
        };

        if ctx.settings.mode == RouterMode::MarkObstacles {
            let mut adopted = None;
            if let Some((id, item)) = end.as_mut() {
                if self.current_net <= NO_NET {
                    // an unconnected trace adopts the net of what it lands on
                    self.current_net = item.net();
                    for line in [&mut pl, &mut self.head, &mut self.tail] {
                        line.net = self.current_net;
                    }
                } else if item.net() <= NO_NET {
                    // and an unconnected end item adopts the net of the trace
                    item.set_net(self.current_net);
                    adopted = Some(*id);
                    if let Some(last) = self.last_node.filter(|last| arena.contains(*last, *id)) {
                        arena.add_with_id(last, *id, item.clone());
                    }
                }
            }

            if !ctx.settings.allow_drc_violations {
                if let Some(world) = self.world {
                    let hits = arena.line_collisions(world, &pl, KindMask::ANY);
                    if hits.iter().any(|hit| Some(*hit) != adopted) {
                        debug!(target: "pns", "[Placer] fix refused: trace violates clearance");
                        return false;
                    }
                }
            }
        }

        if pl.segment_count() == 0 {
            return self.fix_via_only(arena, &pl);
        }

        let Some(last_node) = self.last_node else { return false };

        let chain = &pl.chain;
        let p_last = chain.point(-1);
        let p_pre_last = if chain.point_count() > 2 { chain.point(-2) } else { p_last };

        if let Some((_, item)) = &end {
            if self.current_net >= NO_NET && item.net() == self.current_net {
                real_end = true;
            }
        }
        if force_finish {
            real_end = true;
        }
        if !fix_all && chain.arc_count() > 0 {
            fix_all = true;
        }

        let last_dir_seg = if !fix_all && chain.segment_count() > 1 { chain.segment(-2) } else { chain.segment(-1) };
        let d_last = Direction45::from_seg(&last_dir_seg);

        let last_v = if real_end || self.placing_via || fix_all {
            chain.segment_count()
        } else {
            chain.segment_count().saturating_sub(1).max(1)
        };

        pl.net = self.current_net;
        pl.layer = self.current_layer;
        let mut last_item = None;
        for item in pl.linked_items(last_v) {
            last_item = Some(arena.add(last_node, item));
        }
        if let Some(via) = pl.via.clone() {
            arena.add(last_node, Item::Via(via));
        }

        if real_end {
            if let Some(id) = last_item {
                Self::simplify_new_line(arena, last_node, id);
            }
        }

        debug!(
            target: "pns",
            "[Placer] fix at ({}, {}): {} of {} segments (real end {}, via {})",
            p.x, p.y, last_v, pl.segment_count(), real_end, pl.ends_with_via()
        );

        if !real_end {
            let stage_p = if self.tail.segment_count() > 0 { self.tail.point(0) } else { self.p_start };
            let stage_node = self.current_node.unwrap_or(last_node);
            self.fixed_tail.add_stage(
                stage_p,
                self.current_layer,
                self.placing_via,
                self.initial_direction,
                stage_node,
            );

            self.set_initial_direction(d_last);
            self.current_start = if self.placing_via || fix_all { p_last } else { p_pre_last };

            self.start_item = None;
            self.placing_via = false;
            self.chained = !pl.ends_with_via();

            self.p_start = self.current_start;
            self.direction = self.initial_direction;

            self.head.clear();
            self.tail.clear();
            self.last_head.clear();

            self.current_node = Some(last_node);
            self.last_node = Some(arena.branch(last_node));

            let last_seg_dir = if pl.ends_with_via() { Direction45::Undefined } else { d_last };
            self.trail.clear();
            self.trail.set_tolerance(self.head.width);
            self.trail.add_trail_point(self.current_start);
            self.trail.set_default_directions(self.initial_direction, last_seg_dir);
        } else {
            self.idle = true;
        }

        if let Some(shove) = self.shove.as_mut() {
            shove.add_locked_springback_node(last_node);
        }

        self.placement_correct = true;
        real_end
    }

    /// Fix with no track: only a pending via can be placed
    fn fix_via_only(&mut self, arena: &mut NodeArena, pl: &Line) -> bool {
        if let Some(last) = self.last_node {
            let (_, added) = arena.updated_items(last);
            if let Some((id, _)) = added.iter().rev().find(|(_, item)| item.kind() == ItemKind::Segment) {
                Self::simplify_new_line(arena, last, *id);
            }
        }

        let Some(via) = pl.via.clone() else { return false };
        let Some(last) = self.last_node else { return false };

        arena.add(last, Item::Via(via));
        if let Some(shove) = self.shove.as_mut() {
            shove.add_locked_springback_node(last);
        }
        self.current_node = None;
        self.idle = true;
        self.placement_correct = true;
        true
    }

    /// Undoes the last fix
    ///
    /// Returns false if there is nothing to undo.
    pub fn unfix_route(&mut self, arena: &mut NodeArena, ctx: &RouterContext) -> bool {
        if self.idle || self.fixed_tail.stage_count() <= 1 {
            return false;
        }
        let Some(stage) = self.fixed_tail.pop_stage() else { return false };

        self.head.clear();
        self.tail.clear();
        self.last_head.clear();
        self.start_item = None;
        self.p_start = stage.p;
        self.current_start = stage.p;
        self.direction = stage.direction;
        self.initial_direction = stage.direction;
        self.placing_via = stage.placing_vias;
        self.current_layer = stage.layer;
        for line in [&mut self.head, &mut self.tail, &mut self.last_head] {
            line.layer = stage.layer;
        }

        self.trail.clear();
        self.trail.set_default_directions(self.initial_direction, self.direction);
        self.trail.add_trail_point(self.p_start);

        let mut current = stage.commit;
        if let Some(shove) = self.shove.as_mut() {
            shove.rewind_springback_to(arena, stage.commit);
            shove.unlock_springback_node(stage.commit);
            if ctx.settings.mode == RouterMode::Shove {
                current = shove.current_node();
            }
        }

        if let Some(last) = self.last_node.take() {
            arena.release(last);
        }
        arena.kill_children(current);
        self.current_node = Some(current);
        self.last_node = Some(arena.branch(current));

        debug!(
            target: "pns",
            "[Placer] unfix: back at ({}, {}), {} stages left",
            stage.p.x, stage.p.y, self.fixed_tail.stage_count()
        );
        true
    }

    /// Folds everything placed so far into the router world
    pub fn commit_placement(&mut self, arena: &mut NodeArena, ctx: &RouterContext) -> bool {
        if ctx.settings.mode == RouterMode::Shove {
            if let Some(shove) = self.shove.as_mut() {
                shove.rewind_to_last_locked_node(arena);
                let node = shove.current_node();
                if arena.is_alive(node) {
                    arena.kill_children(node);
                    self.last_node = Some(node);
                }
            }
        }

        let committed = match self.last_node {
            Some(node) => commit_routing(arena, node, ctx.iface),
            None => false,
        };
        self.last_node = None;
        self.current_node = None;
        self.world = None;
        self.shove = None;
        self.idle = true;
        committed
    }

    /// Throws away every speculative node of this gesture
    pub fn abort_placement(&mut self, arena: &mut NodeArena, ctx: &RouterContext) {
        arena.kill_children(ctx.world);
        self.last_node = None;
        self.current_node = None;
        self.world = None;
        self.shove = None;
        self.head.clear();
        self.tail.clear();
        self.last_head.clear();
        self.fixed_tail.clear();
        self.idle = true;
        debug!(target: "pns", "[Placer] placement aborted");
    }

    /// Tidies the line ending in `latest` after a route was finished
    ///
    /// Segments swallowed by an overlapping, collinear new segment are
    /// dropped, then the line is reassembled and its collinear runs merged.
    pub(super) fn simplify_new_line(arena: &mut NodeArena, node: NodeId, latest: ItemId) {
        let Some(latest_item) = arena.get(node, latest) else { return };
        debug_assert!(latest_item.is_linked(), "simplifying from a non-track item");

        let (_, added) = arena.updated_items(node);
        let mut cleanup: Vec<ItemId> = Vec::new();

        for (id, item) in &added {
            let Item::Segment(seg) = item else { continue };
            if cleanup.contains(id) {
                continue;
            }
            for anchor in [seg.seg.a, seg.seg.b] {
                let joint = arena.find_joint_for(node, anchor, item);
                if joint.is_line_corner() {
                    continue;
                }
                for link in &joint.links {
                    if link.id == *id || link.kind != ItemKind::Segment {
                        continue;
                    }
                    let Some(neighbor) = arena.get(node, link.id) else { continue };
                    if !neighbor.layers_overlap(item) || neighbor.width() != item.width() {
                        continue;
                    }
                    let Some(other) = neighbor.as_segment() else { continue };
                    if !seg.seg.contains_seg(&other.seg) {
                        continue;
                    }
                    let ja = arena.find_joint_for(node, neighbor.anchor(0), neighbor);
                    let jb = arena.find_joint_for(node, neighbor.anchor(1), neighbor);
                    let dangling = (ja.same_place(&joint) && jb.link_count() == 1)
                        || (jb.same_place(&joint) && ja.link_count() == 1);
                    if dangling && !cleanup.contains(&link.id) {
                        cleanup.push(link.id);
                    }
                }
            }
        }

        for id in &cleanup {
            trace!(target: "pns", "[Placer] drop overlapped {}", id);
            arena.remove(node, *id);
        }

        let Some(mut line) = arena.assemble_line(node, latest) else { return };
        let links = line.links.clone();
        let merged = Optimizer::optimize_line(arena, node, &mut line, OptimizationEffort::MERGE_COLINEAR);
        let simplified = line.chain.simplified();

        if merged || simplified.point_count() != line.point_count() {
            for id in &links {
                arena.remove(node, *id);
            }
            let mut replacement = line.with_chain(simplified);
            arena.add_line(node, &mut replacement);
        }
    }

    /// Removes other routes between the same two joints as `latest`
    pub(super) fn remove_loops(arena: &mut NodeArena, node: NodeId, latest: &mut Line) {
        if latest.segment_count() == 0 || latest.point(0) == latest.point(-1) {
            return;
        }

        arena.add_line(node, latest);
        let mut to_erase: Vec<ItemId> = Vec::new();

        for link in latest.links.clone() {
            let Some(ours) = arena.assemble_line(node, link) else { continue };
            let (mut a, mut b) = arena.find_line_ends(node, &ours);
            if a.pos == b.pos {
                (a, b) = arena.find_line_ends(node, latest);
            }

            for line in arena.find_lines_between_joints(node, &a, &b) {
                if line.contains_link(link) || line.segment_count() == 0 {
                    continue;
                }
                for id in line.links {
                    if !to_erase.contains(&id) {
                        to_erase.push(id);
                    }
                }
            }
        }

        for id in &to_erase {
            arena.remove(node, *id);
        }
        if !to_erase.is_empty() {
            debug!(target: "pns", "[Placer] removed {} items of looping routes", to_erase.len());
        }
        arena.remove_line(node, latest);
    }
}
