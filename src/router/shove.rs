//! Shove: push conflicting traces out of the way of a new line
//!
//! Every successful `shove_lines` call produces a fresh node branched from
//! the springback stack. Nodes left unlocked on the stack are popped again
//! (sprung back) as soon as the head no longer needs them, so traces return
//! to their original place when the cursor moves away.

use super::debug::DebugSink;
use super::item::KindMask;
use super::line::Line;
use super::node::{NodeArena, NodeId};
use super::shape::Shape;
use crate::geometry::PointChain;
use std::collections::VecDeque;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShoveStatus {
    Ok,
    /// The head itself had to change; read it back with `new_head`
    HeadModified,
    /// Iteration limit hit before everything settled
    Incomplete,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SpringbackTag {
    node: NodeId,
    locked: bool,
}

#[derive(Debug)]
pub struct Shove {
    root: NodeId,
    springback: Vec<SpringbackTag>,
    do_not_touch: Option<NodeId>,
    new_head: Option<Line>,
    iteration_limit: usize,
}

impl Shove {
    pub fn new(root: NodeId, iteration_limit: usize) -> Self {
        Self {
            root,
            springback: Vec::new(),
            do_not_touch: None,
            new_head: None,
            iteration_limit: iteration_limit.max(1),
        }
    }

    /// Node holding the latest shove result
    pub fn current_node(&self) -> NodeId {
        self.springback.last().map(|t| t.node).unwrap_or(self.root)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn new_head(&self) -> Option<&Line> {
        self.new_head.as_ref()
    }

    pub fn add_locked_springback_node(&mut self, node: NodeId) {
        self.springback.push(SpringbackTag { node, locked: true });
    }

    pub fn unlock_springback_node(&mut self, node: NodeId) {
        for tag in self.springback.iter_mut().filter(|t| t.node == node) {
            tag.locked = false;
        }
    }

    /// Never spring back past `node`
    pub fn set_springback_do_not_touch_node(&mut self, node: Option<NodeId>) {
        self.do_not_touch = node;
    }

    /// Drops `node` and everything above it from the stack; `node`'s children are released
    pub fn rewind_springback_to(&mut self, arena: &mut NodeArena, node: NodeId) -> bool {
        let Some(pos) = self.springback.iter().position(|t| t.node == node) else {
            return false;
        };
        arena.kill_children(node);
        self.springback.truncate(pos);
        true
    }

    /// Pops unlocked nodes until a locked one is on top
    pub fn rewind_to_last_locked_node(&mut self, arena: &mut NodeArena) -> bool {
        let mut popped = false;
        while let Some(tag) = self.springback.last().copied() {
            if tag.locked {
                break;
            }
            arena.release(tag.node);
            self.springback.pop();
            popped = true;
        }
        popped
    }

    fn reduce_springback(&mut self, arena: &mut NodeArena, head: &Line) -> NodeId {
        while let Some(tag) = self.springback.last().copied() {
            if !arena.is_alive(tag.node) {
                self.springback.pop();
                continue;
            }
            if Some(tag.node) == self.do_not_touch
                || tag.locked
                || arena.check_colliding(tag.node, head, KindMask::ANY).is_some()
            {
                break;
            }
            trace!(target: "pns", "[Shove] spring back {:?}", tag.node);
            arena.release(tag.node);
            self.springback.pop();
        }
        self.current_node()
    }

    /// Makes room for `head`, pushing other nets' traces aside
    pub fn shove_lines(&mut self, arena: &mut NodeArena, head: &Line, dbg: &dyn DebugSink) -> ShoveStatus {
        self.new_head = None;
        let parent = self.reduce_springback(arena, head);
        let node = arena.branch(parent);

        let mut head = head.clone();
        head.clear_links();
        let mut status = ShoveStatus::Ok;

        if let Some(obs) = arena.nearest_obstacle(node, &head, KindMask::SOLID | KindMask::VIA) {
            head.clip_to(obs.ip_first);
            if head.segment_count() == 0 {
                arena.release(node);
                return ShoveStatus::Fail;
            }
            status = ShoveStatus::HeadModified;
        }

        dbg.begin_group("shove");
        let result = self.main_loop(arena, node, &head, dbg);
        dbg.end_group();

        match result {
            Ok(()) => {
                self.springback.push(SpringbackTag { node, locked: false });
                if status == ShoveStatus::HeadModified {
                    self.new_head = Some(head);
                }
                debug!(target: "pns", "[Shove] {:?}, stack depth {}", status, self.springback.len());
                status
            }
            Err(st) => {
                arena.release(node);
                debug!(target: "pns", "[Shove] failed: {:?}", st);
                st
            }
        }
    }

    fn main_loop(
        &self,
        arena: &mut NodeArena,
        node: NodeId,
        head: &Line,
        dbg: &dyn DebugSink,
    ) -> Result<(), ShoveStatus> {
        let clearance = arena.clearance();
        let mut placed: Vec<Line> = vec![head.clone()];
        let mut queue: VecDeque<usize> = VecDeque::from([0]);
        let mut iterations = 0;

        let is_current = |arena: &NodeArena, l: &Line| l.links.iter().all(|id| arena.contains(node, *id));

        while let Some(pi) = queue.pop_front() {
            iterations += 1;
            if iterations > self.iteration_limit {
                return Err(ShoveStatus::Incomplete);
            }
            let pusher = placed[pi].clone();
            if !is_current(arena, &pusher) {
                continue;
            }

            for id in arena.line_collisions(node, &pusher, KindMask::ANY) {
                let Some(item) = arena.get(node, id) else { continue };
                if !item.is_linked() {
                    return Err(ShoveStatus::Fail);
                }
                let Some(obstacle) = arena.assemble_line(node, id) else {
                    return Err(ShoveStatus::Fail);
                };
                let keep_clear: Vec<&Line> = placed.iter().filter(|l| is_current(arena, l)).collect();
                let Some(mut shoved) = shove_line(&obstacle, &pusher, &keep_clear, clearance) else {
                    trace!(target: "pns", "[Shove] cannot move line through {}", id);
                    return Err(ShoveStatus::Fail);
                };
                dbg.add_line(&shoved.chain, "shoved");
                arena.remove_line(node, &obstacle);
                arena.add_line(node, &mut shoved);
                placed.push(shoved);
                queue.push_back(placed.len() - 1);
            }
        }

        if arena.check_colliding(node, head, KindMask::ANY).is_some() {
            return Err(ShoveStatus::Fail);
        }
        Ok(())
    }
}

fn touches(chain: &PointChain, hull: &PointChain) -> bool {
    !chain.intersect(hull).is_empty() || chain.points().iter().any(|p| hull.point_inside(*p))
}

/// Reroutes `obstacle` around the hulls of `pusher`, picking the shorter side
fn shove_line(obstacle: &Line, pusher: &Line, keep_clear: &[&Line], clearance: i64) -> Option<Line> {
    let extra = clearance + obstacle.width / 2 + 1;
    let mut hulls: Vec<PointChain> = pusher
        .chain
        .segments()
        .map(|s| Shape::segment(s, pusher.width).hull(extra))
        .collect();
    if let Some(v) = pusher.via_shape() {
        hulls.push(v.hull(extra));
    }

    let mut best: Option<Line> = None;
    for cw in [true, false] {
        let mut l = obstacle.clone();
        l.clear_links();
        let mut ok = true;
        for _pass in 0..3 {
            let mut changed = false;
            for h in &hulls {
                if !touches(&l.chain, h) {
                    continue;
                }
                match l.walkaround(h, cw) {
                    Some(path) if path != l.chain => {
                        l.chain = path;
                        changed = true;
                    }
                    Some(_) => {}
                    None => {
                        ok = false;
                        break;
                    }
                }
            }
            if !ok || !changed {
                break;
            }
        }
        if !ok {
            continue;
        }
        l.chain.simplify();
        if l.has_loops() {
            continue;
        }
        let body = l.shape();
        let blocked = keep_clear.iter().any(|p| {
            p.shape().collides(&body, clearance)
                || p.via_shape().map_or(false, |v| v.collides(&body, clearance))
        });
        if blocked {
            continue;
        }
        if best.as_ref().map_or(true, |b| l.length() < b.length()) {
            best = Some(l);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Seg};
    use crate::router::debug::NullDebugSink;
    use crate::router::item::{Item, LayerRange, Segment, Solid, SolidShape};
    use crate::router::settings::DesignRules;

    fn line(points: &[(i64, i64)], net: i32) -> Line {
        let mut l = Line::new(200, net, 0);
        l.chain = PointChain::from_points(points.iter().map(|&(x, y)| Point::new(x, y)));
        l
    }

    #[test]
    fn test_pushes_crossing_trace_aside() {
        let mut arena = NodeArena::new(DesignRules { clearance: 100 });
        let root = arena.root();
        // victim: horizontal trace of another net just above the head's path
        let victim = Seg::new(Point::new(0, -200), Point::new(10_000, -200));
        arena.add(root, Item::Segment(Segment::new(victim, 200, 2, 0)));
        let shove_root = arena.branch(root);
        let mut shove = Shove::new(shove_root, 100);

        let head = line(&[(2000, 0), (8000, 0)], 1);
        let status = shove.shove_lines(&mut arena, &head, &NullDebugSink);
        assert_eq!(status, ShoveStatus::Ok);
        let node = shove.current_node();
        assert_ne!(node, shove_root);
        assert!(arena.check_colliding(node, &head, KindMask::ANY).is_none());
        // the original is untouched in the root
        assert!(arena.check_colliding(root, &head, KindMask::ANY).is_some());
    }

    #[test]
    fn test_solid_blocks_shove() {
        let mut arena = NodeArena::new(DesignRules { clearance: 100 });
        let root = arena.root();
        arena.add(
            root,
            Item::Solid(Solid {
                shape: SolidShape::Circle { center: Point::new(5000, 0), radius: 500 },
                layers: LayerRange::new(0, 31),
                net: 3,
                anchor: Point::new(5000, 0),
            }),
        );
        let shove_root = arena.branch(root);
        let mut shove = Shove::new(shove_root, 100);
        let head = line(&[(0, 0), (10_000, 0)], 1);
        assert_eq!(shove.shove_lines(&mut arena, &head, &NullDebugSink), ShoveStatus::HeadModified);
        let clipped = shove.new_head().expect("clipped head");
        assert!(clipped.point(-1).x < 5000);
    }

    #[test]
    fn test_springback_when_head_moves_away() {
        let mut arena = NodeArena::new(DesignRules { clearance: 100 });
        let root = arena.root();
        let victim = Seg::new(Point::new(0, -200), Point::new(10_000, -200));
        arena.add(root, Item::Segment(Segment::new(victim, 200, 2, 0)));
        let shove_root = arena.branch(root);
        let mut shove = Shove::new(shove_root, 100);

        let head = line(&[(2000, 0), (8000, 0)], 1);
        assert_eq!(shove.shove_lines(&mut arena, &head, &NullDebugSink), ShoveStatus::Ok);
        let first = shove.current_node();

        let away = line(&[(2000, 5000), (8000, 5000)], 1);
        assert_eq!(shove.shove_lines(&mut arena, &away, &NullDebugSink), ShoveStatus::Ok);
        assert!(!arena.is_alive(first));
        assert_eq!(arena.parent(shove.current_node()), Some(shove_root));
    }

    #[test]
    fn test_locked_nodes_survive_rewind() {
        let mut arena = NodeArena::new(DesignRules::default());
        let root = arena.root();
        let shove_root = arena.branch(root);
        let mut shove = Shove::new(shove_root, 10);
        let fixed = arena.branch(shove_root);
        shove.add_locked_springback_node(fixed);
        let floating = arena.branch(fixed);
        shove.springback.push(SpringbackTag { node: floating, locked: false });

        assert!(shove.rewind_to_last_locked_node(&mut arena));
        assert_eq!(shove.current_node(), fixed);
        assert!(!arena.is_alive(floating));

        assert!(shove.rewind_springback_to(&mut arena, fixed));
        assert_eq!(shove.current_node(), shove_root);
        assert!(arena.is_alive(fixed));
    }
}
