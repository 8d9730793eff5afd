//! Net connectivity queries used for previews

use super::item::{ItemId, NO_NET};
use super::line::Line;
use super::node::{NodeArena, NodeId};
use crate::geometry::{Point, PointChain};
use std::collections::{HashSet, VecDeque};

/// Items electrically reachable from the joints at `seeds` on `net`
pub fn connected_items(arena: &NodeArena, node: NodeId, seeds: &[Point], net: i32, layer: i32) -> HashSet<ItemId> {
    let mut seen: HashSet<ItemId> = HashSet::new();
    let mut queue: VecDeque<ItemId> = VecDeque::new();
    let layers = super::item::LayerRange::single(layer);

    for p in seeds {
        for link in arena.find_joint(node, *p, layers, net).links {
            if seen.insert(link.id) {
                queue.push_back(link.id);
            }
        }
    }

    while let Some(id) = queue.pop_front() {
        let Some(item) = arena.get(node, id) else { continue };
        let item = item.clone();
        for anchor in item.anchors() {
            for link in arena.find_joint_for(node, anchor, &item).links {
                if seen.insert(link.id) {
                    queue.push_back(link.id);
                }
            }
        }
    }
    seen
}

/// Straight preview from the end of `line` to the nearest anchor of the
/// same net that the line is not yet connected to
pub fn leading_ratline(arena: &NodeArena, node: NodeId, line: &Line) -> Option<PointChain> {
    if line.point_count() == 0 || line.net <= NO_NET {
        return None;
    }
    let start = line.point(0);
    let end = line.point(-1);
    let connected = connected_items(arena, node, &[start, end], line.net, line.layer);

    let mut best: Option<(f64, Point)> = None;
    for (id, item) in arena.items(node) {
        if item.net() != line.net || connected.contains(&id) || line.contains_link(id) {
            continue;
        }
        for anchor in item.anchors() {
            let d = anchor.distance(end);
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, anchor));
            }
        }
    }
    best.map(|(_, anchor)| PointChain::from_points([end, anchor]))
}
