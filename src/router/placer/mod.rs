//! Interactive line placer
//!
//! The placer turns a stream of cursor positions into a trace. The trace is
//! kept as two lines: the `tail`, which stays put between moves, and the
//! `head`, which is rebuilt from `p_start` to the cursor on every move.
//! Fixing a route writes the trace into a node and pushes an undo stage.
//!
//! All node handles point into the caller's [`NodeArena`]. Between `start`
//! and `commit_placement`/`abort_placement` the placer owns a private branch
//! of the world and every speculative node below it.
//!
//! # Submodules
//!
//! - `head` - building and routing the head in each router mode
//! - `step` - one route step plus tail/head corrections
//! - `commit` - fixing, undoing and committing placed track

mod commit;
mod head;
mod step;

pub use step::{Correction, StepOutcome};

use super::context::RouterContext;
use super::direction::Direction45;
use super::fixed_tail::FixedTail;
use super::item::{Item, ItemId, ItemKind, LayerRange, NetCode, Segment, Via, ViaType, NO_NET};
use super::line::Line;
use super::node::{NodeArena, NodeId};
use super::settings::{RouterMode, SizesSettings};
use super::shove::Shove;
use super::topology;
use super::trail::MouseTrailTracer;
use crate::geometry::{Point, Seg};
use tracing::{debug, trace};

/// Copper layers a through via spans
const THROUGH_VIA_LAYERS: LayerRange = LayerRange { start: 0, end: 31 };

#[derive(Debug)]
pub struct LinePlacer {
    idle: bool,
    chained: bool,
    placement_correct: bool,
    placing_via: bool,
    ortho_mode: bool,

    current_net: NetCode,
    current_layer: i32,
    sizes: SizesSettings,

    p_start: Point,
    current_start: Point,
    current_end: Point,
    direction: Direction45,
    initial_direction: Direction45,

    head: Line,
    tail: Line,
    last_head: Line,
    current_trace: Line,

    start_item: Option<(ItemId, Item)>,
    end_item: Option<(ItemId, Item)>,

    /// Private branch of the router world
    world: Option<NodeId>,
    current_node: Option<NodeId>,
    /// Preview branch holding end-item splits and loop removal
    last_node: Option<NodeId>,
    shove: Option<Shove>,

    fixed_tail: FixedTail,
    trail: MouseTrailTracer,
}

impl Default for LinePlacer {
    fn default() -> Self {
        Self::new(SizesSettings::default())
    }
}

impl LinePlacer {
    pub fn new(sizes: SizesSettings) -> Self {
        let width = sizes.track_width;
        Self {
            idle: true,
            chained: false,
            placement_correct: false,
            placing_via: false,
            ortho_mode: false,
            current_net: NO_NET,
            current_layer: 0,
            sizes,
            p_start: Point::default(),
            current_start: Point::default(),
            current_end: Point::default(),
            direction: Direction45::N,
            initial_direction: Direction45::N,
            head: Line::new(width, NO_NET, 0),
            tail: Line::new(width, NO_NET, 0),
            last_head: Line::new(width, NO_NET, 0),
            current_trace: Line::new(width, NO_NET, 0),
            start_item: None,
            end_item: None,
            world: None,
            current_node: None,
            last_node: None,
            shove: None,
            fixed_tail: FixedTail::new(),
            trail: MouseTrailTracer::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn is_chained(&self) -> bool {
        self.chained
    }

    pub fn current_layer(&self) -> i32 {
        self.current_layer
    }

    pub fn current_net(&self) -> NetCode {
        self.current_net
    }

    pub fn current_start(&self) -> Point {
        self.p_start
    }

    pub fn current_end(&self) -> Point {
        self.current_end
    }

    pub fn direction(&self) -> Direction45 {
        self.direction
    }

    pub fn is_placing_via(&self) -> bool {
        self.placing_via
    }

    pub fn head(&self) -> &Line {
        &self.head
    }

    pub fn tail(&self) -> &Line {
        &self.tail
    }

    pub fn fixed_tail(&self) -> &FixedTail {
        &self.fixed_tail
    }

    pub fn sizes(&self) -> &SizesSettings {
        &self.sizes
    }

    pub fn set_ortho_mode(&mut self, ortho: bool) {
        self.ortho_mode = ortho;
    }

    /// Begins a route at `p`, optionally on `start_item` of the router world
    pub fn start(&mut self, arena: &mut NodeArena, ctx: &RouterContext, p: Point, start_item: Option<ItemId>) -> bool {
        self.placement_correct = false;
        self.current_start = p;
        self.current_end = p;
        self.start_item = start_item.and_then(|id| arena.get(ctx.world, id).cloned().map(|item| (id, item)));
        self.current_net = self.start_item.as_ref().map_or(NO_NET, |(_, item)| item.net().max(NO_NET));
        self.placing_via = false;
        self.chained = false;
        self.fixed_tail.clear();
        self.end_item = None;

        self.set_initial_direction(ctx.settings.initial_direction);

        debug!(
            target: "pns",
            "[Placer] start at ({}, {}) net {} layer {} mode {:?}",
            p.x, p.y, self.current_net, self.current_layer, ctx.settings.mode
        );

        self.init_placement(arena, ctx);

        let mut last_seg_dir = Direction45::Undefined;
        if let Some((_, Item::Segment(seg))) = &self.start_item {
            if p == seg.seg.a {
                last_seg_dir = Direction45::from_seg(&seg.seg).opposite();
            } else if p == seg.seg.b {
                last_seg_dir = Direction45::from_seg(&seg.seg);
            }
        }

        self.trail.clear();
        self.trail.add_trail_point(p);
        self.trail.set_tolerance(self.head.width);
        self.trail.set_default_directions(self.initial_direction, last_seg_dir);
        self.trail.set_mouse_disabled(!ctx.settings.auto_posture);

        let stage_node = match (ctx.settings.mode, &self.shove) {
            (RouterMode::Shove, Some(shove)) => Some(shove.current_node()),
            _ => self.current_node,
        };
        if let Some(node) = stage_node {
            self.fixed_tail.add_stage(self.current_start, self.current_layer, self.placing_via, self.direction, node);
        }
        true
    }

    fn init_placement(&mut self, arena: &mut NodeArena, ctx: &RouterContext) {
        self.idle = false;
        self.head.clear();
        self.tail.clear();
        self.last_head.clear();

        let width = self.start_width();
        for line in [&mut self.head, &mut self.tail, &mut self.last_head] {
            line.net = self.current_net;
            line.layer = self.current_layer;
            line.width = width;
        }

        self.p_start = self.current_start;
        self.direction = self.initial_direction;

        arena.kill_children(ctx.world);
        let root = arena.branch(ctx.world);
        if let Some((id, item)) = self.start_item.clone() {
            Self::split_segment_at(arena, root, id, &item, self.current_start);
        }

        self.world = Some(root);
        self.last_node = None;
        self.current_node = Some(root);

        let shove_root = arena.branch(root);
        self.shove = Some(Shove::new(shove_root, ctx.settings.shove_iteration_limit));
    }

    /// Explicit widths win; otherwise a route started on a track keeps its width
    fn start_width(&self) -> i64 {
        match &self.start_item {
            Some((_, Item::Segment(seg))) if !self.sizes.width_is_explicit => seg.width,
            Some((_, Item::Arc(arc))) if !self.sizes.width_is_explicit => arc.width,
            _ => self.sizes.track_width,
        }
    }

    /// Reroutes the head towards `p`; true if the trace reaches it
    pub fn move_to(&mut self, arena: &mut NodeArena, ctx: &RouterContext, p: Point, end_item: Option<ItemId>) -> bool {
        if self.idle {
            return false;
        }
        let Some(node) = self.current_node else { return false };

        let end = end_item.and_then(|id| arena.get(node, id).cloned().map(|item| (id, item)));
        let end_depth = end
            .as_ref()
            .and_then(|(id, _)| arena.find_owner(node, *id))
            .map(|owner| arena.depth(owner));

        if let Some(last) = self.last_node.take() {
            arena.release(last);
        }
        self.end_item = end;

        let reaches_end = self.route(arena, ctx, p);

        let current = self.trace();
        self.current_end = if current.point_count() == 0 { self.p_start } else { current.point(-1) };

        let Some(latest) = self.current_node else { return false };
        let last = arena.branch(latest);
        self.last_node = Some(last);

        if let (true, Some(depth), Some((id, item))) = (reaches_end, end_depth, self.end_item.clone()) {
            if arena.depth(latest) >= depth && current.segment_count() > 0 {
                Self::split_segment_at(arena, last, id, &item, current.point(-1));
                if ctx.settings.remove_loops {
                    let mut trace = current.clone();
                    Self::remove_loops(arena, last, &mut trace);
                }
            }
        }

        self.update_leading_ratline(arena, ctx, last, &current);
        self.trail.add_trail_point(p);
        trace!(
            target: "pns",
            "[Placer] move to ({}, {}): tail {} pts, head {} pts, reached {}",
            p.x, p.y, self.tail.point_count(), self.head.point_count(), reaches_end
        );
        reaches_end
    }

    fn route(&mut self, arena: &mut NodeArena, ctx: &RouterContext, p: Point) -> bool {
        self.route_step(arena, ctx, p);
        // the head may already be merged into the tail
        let trace = self.trace();
        trace.point_count() > 0 && trace.point(-1) == p
    }

    fn update_leading_ratline(&self, arena: &NodeArena, ctx: &RouterContext, node: NodeId, current: &Line) {
        if let Some(ratline) = topology::leading_ratline(arena, node, current) {
            ctx.iface.display_ratline(&ratline, self.current_net);
        }
    }

    /// Switches the routing layer
    ///
    /// Refused while chained, and when the route started on a track, since
    /// the layer of the start is then fixed.
    pub fn set_layer(&mut self, arena: &mut NodeArena, ctx: &RouterContext, layer: i32) -> bool {
        if self.idle {
            self.current_layer = layer;
            return true;
        }
        if self.chained {
            return false;
        }

        let free_start = match &self.start_item {
            None => true,
            Some((_, item)) => {
                matches!(item.kind(), ItemKind::Via | ItemKind::Solid) && item.layers().overlaps_layer(layer)
            }
        };
        if !free_start {
            return false;
        }

        self.current_layer = layer;
        self.p_start = self.current_start;
        self.direction = self.initial_direction;
        self.trail.clear();
        for line in [&mut self.head, &mut self.tail, &mut self.last_head] {
            line.clear();
            line.layer = layer;
        }
        let end = self.current_end;
        self.move_to(arena, ctx, end, None);
        true
    }

    /// Arms or disarms a via at the end of the head
    pub fn toggle_via(&mut self, enabled: bool) -> bool {
        self.placing_via = enabled;
        if !enabled {
            self.head.remove_via();
        }
        true
    }

    pub fn update_sizes(&mut self, sizes: SizesSettings) {
        self.sizes = sizes;
        if self.idle {
            return;
        }

        let start_is_segment = matches!(self.start_item, Some((_, Item::Segment(_))));
        if self.sizes.width_is_explicit || (!self.has_placed_anything() && !start_is_segment) {
            let width = self.sizes.track_width;
            for line in [&mut self.head, &mut self.tail, &mut self.last_head, &mut self.current_trace] {
                line.width = width;
            }
        }

        if let Some(via) = self.head.via.as_mut() {
            via.diameter = self.sizes.via_diameter;
            via.drill = self.sizes.via_drill;
        }
    }

    /// Swaps the handedness the posture tracer picks
    pub fn flip_posture(&mut self) {
        self.trail.flip_posture();
    }

    pub fn modified_nets(&self) -> Vec<NetCode> {
        vec![self.current_net]
    }

    /// Tail and head joined into one simplified line
    pub fn trace(&self) -> Line {
        let mut tmp = self.head.clone();
        tmp.set_shape(self.tail.chain.clone());
        tmp.chain.append_chain(&self.head.chain);
        tmp.chain.simplify();
        tmp
    }

    pub fn traces(&mut self) -> Vec<Line> {
        self.current_trace = self.trace();
        vec![self.current_trace.clone()]
    }

    /// Node showing the current state; with `loops_removed` the preview
    /// branch (end-item splits, removed loops) is preferred
    pub fn current_node(&self, loops_removed: bool) -> Option<NodeId> {
        if loops_removed && self.last_node.is_some() {
            return self.last_node;
        }
        self.current_node
    }

    pub fn has_placed_anything(&self) -> bool {
        self.placement_correct || self.fixed_tail.stage_count() > 1
    }

    fn set_initial_direction(&mut self, direction: Direction45) {
        self.initial_direction = direction;
        if self.tail.segment_count() == 0 {
            self.direction = direction;
        }
    }

    /// Node the head is currently routed against
    fn node(&self) -> Option<NodeId> {
        self.current_node.or(self.world)
    }

    fn ortho(&self, ctx: &RouterContext) -> bool {
        self.ortho_mode || ctx.settings.orthogonal
    }

    pub fn make_via(&self, p: Point) -> Via {
        let layers = match self.sizes.via_type {
            ViaType::Through => THROUGH_VIA_LAYERS,
            ViaType::BlindBuried | ViaType::Micro => self.sizes.via_layers,
        };
        Via {
            pos: p,
            diameter: self.sizes.via_diameter,
            drill: self.sizes.via_drill,
            layers,
            net: self.head.net,
            via_type: self.sizes.via_type,
        }
    }

    /// Splits the segment `item` of `node` in two at `p`, unless `p` already
    /// is a joint of it
    pub fn split_adjacent_segments(arena: &mut NodeArena, node: NodeId, item: Option<ItemId>, p: Point) -> bool {
        let Some(id) = item else { return false };
        let Some(found) = arena.get(node, id).cloned() else { return false };
        Self::split_segment_at(arena, node, id, &found, p)
    }

    fn split_segment_at(arena: &mut NodeArena, node: NodeId, id: ItemId, item: &Item, p: Point) -> bool {
        let Item::Segment(seg) = item else { return false };
        if !arena.contains(node, id) || !seg.seg.contains_point(p) {
            return false;
        }
        if arena.find_joint_for(node, p, item).link_count() >= 1 {
            return false;
        }

        let a = Segment::new(Seg::new(seg.seg.a, p), seg.width, seg.net, seg.layer);
        let b = Segment::new(Seg::new(p, seg.seg.b), seg.width, seg.net, seg.layer);
        arena.remove(node, id);
        arena.add(node, Item::Segment(a));
        arena.add(node, Item::Segment(b));
        trace!(target: "pns", "[Placer] split {} at ({}, {})", id, p.x, p.y);
        true
    }
}

#[cfg(test)]
mod tests;
