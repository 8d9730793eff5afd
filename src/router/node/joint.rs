//! Joints and line assembly
//!
//! Joints are derived on demand from the items whose anchors coincide at a
//! point (same net, overlapping layers). A joint joining exactly two linked
//! items of equal width is a plain line corner, which is what lets
//! `assemble_line` walk from one segment to the whole trace.

use super::{NodeArena, NodeId};
use crate::geometry::{Point, PointChain};
use crate::router::item::{ArcItem, Item, ItemId, ItemKind, LayerRange, NetCode, Segment};
use crate::router::line::Line;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointLink {
    pub id: ItemId,
    pub kind: ItemKind,
    pub width: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub pos: Point,
    pub layers: LayerRange,
    pub net: NetCode,
    pub links: Vec<JointLink>,
}

impl Joint {
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Exactly two segments/arcs of equal width meet here and nothing else
    pub fn is_line_corner(&self) -> bool {
        self.links.len() == 2
            && self.links.iter().all(|l| matches!(l.kind, ItemKind::Segment | ItemKind::Arc))
            && self.links[0].width == self.links[1].width
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.links.iter().any(|l| l.id == id)
    }

    /// The other item of a line corner
    pub fn other_link(&self, id: ItemId) -> Option<ItemId> {
        if !self.is_line_corner() || !self.contains(id) {
            return None;
        }
        self.links.iter().map(|l| l.id).find(|l| *l != id)
    }

    /// Same point, net and layer span
    pub fn same_place(&self, other: &Joint) -> bool {
        self.pos == other.pos && self.net == other.net && self.layers.overlaps(&other.layers)
    }
}

impl NodeArena {
    /// Joint at `pos` for items of `net` touching `layers`
    pub fn find_joint(&self, node: NodeId, pos: Point, layers: LayerRange, net: NetCode) -> Joint {
        let mut links = Vec::new();
        for (id, item) in self.query_box(node, pos, pos, 0) {
            if item.net() != net || !item.layers().overlaps(&layers) {
                continue;
            }
            if item.anchors().contains(&pos) {
                links.push(JointLink { id, kind: item.kind(), width: item.width() });
            }
        }
        Joint { pos, layers, net, links }
    }

    pub fn find_joint_for(&self, node: NodeId, pos: Point, item: &Item) -> Joint {
        self.find_joint(node, pos, item.layers(), item.net())
    }

    /// Rebuilds the whole line `seed` belongs to by following line corners
    pub fn assemble_line(&self, node: NodeId, seed: ItemId) -> Option<Line> {
        let seed_item = self.get(node, seed)?;
        if !seed_item.is_linked() {
            return None;
        }

        // (id, item, reversed)
        let mut run: VecDeque<(ItemId, Item, bool)> = VecDeque::new();
        run.push_back((seed, seed_item.clone(), false));
        let mut visited: HashSet<ItemId> = HashSet::from([seed]);

        for forward in [true, false] {
            let mut cur = seed;
            let mut cur_item = seed_item.clone();
            let mut p = if forward { seed_item.anchor(1) } else { seed_item.anchor(0) };
            loop {
                let joint = self.find_joint_for(node, p, &cur_item);
                let Some(next) = joint.other_link(cur) else { break };
                if !visited.insert(next) {
                    break;
                }
                let Some(next_item) = self.get(node, next).cloned() else { break };
                let starts_here = next_item.anchor(0) == p;
                let (reversed, far) = if forward {
                    (!starts_here, if starts_here { next_item.anchor(1) } else { next_item.anchor(0) })
                } else {
                    (starts_here, if starts_here { next_item.anchor(1) } else { next_item.anchor(0) })
                };
                if forward {
                    run.push_back((next, next_item.clone(), reversed));
                } else {
                    run.push_front((next, next_item.clone(), reversed));
                }
                cur = next;
                cur_item = next_item;
                p = far;
            }
        }

        let mut chain = PointChain::new();
        let mut links = Vec::with_capacity(run.len());
        for (id, item, reversed) in &run {
            match item {
                Item::Segment(Segment { seg, .. }) => {
                    let s = if *reversed { seg.reversed() } else { *seg };
                    chain.append(s.a);
                    chain.append(s.b);
                }
                Item::Arc(ArcItem { arc, .. }) => {
                    let a = if *reversed { arc.reversed() } else { *arc };
                    chain.append(a.start);
                    chain.append_arc_default(a);
                }
                _ => {}
            }
            links.push(*id);
        }

        let mut line = Line::new(seed_item.width(), seed_item.net(), seed_item.layers().start);
        line.chain = chain;
        line.links = links;
        Some(line)
    }

    /// Joints at both ends of `line`
    pub fn find_line_ends(&self, node: NodeId, line: &Line) -> (Joint, Joint) {
        let layers = LayerRange::single(line.layer);
        (
            self.find_joint(node, line.point(0), layers, line.net),
            self.find_joint(node, line.point(-1), layers, line.net),
        )
    }

    /// Every assembled line running from joint `a` to joint `b` (either way)
    pub fn find_lines_between_joints(&self, node: NodeId, a: &Joint, b: &Joint) -> Vec<Line> {
        let mut seen: HashSet<ItemId> = HashSet::new();
        let mut lines = Vec::new();
        for link in &a.links {
            if !matches!(link.kind, ItemKind::Segment | ItemKind::Arc) || seen.contains(&link.id) {
                continue;
            }
            let Some(line) = self.assemble_line(node, link.id) else { continue };
            seen.extend(line.links.iter().copied());
            let (s, e) = (line.point(0), line.point(-1));
            if (s == a.pos && e == b.pos) || (s == b.pos && e == a.pos) {
                lines.push(line);
            }
        }
        lines
    }

    /// Adds the segments/arcs of `line` to `node` and records them as its links
    pub fn add_line(&mut self, node: NodeId, line: &mut Line) {
        line.links.clear();
        for item in line.linked_items(line.segment_count()) {
            let id = self.add(node, item);
            line.links.push(id);
        }
    }

    pub fn remove_line(&mut self, node: NodeId, line: &Line) {
        for id in &line.links {
            self.remove(node, *id);
        }
    }
}
