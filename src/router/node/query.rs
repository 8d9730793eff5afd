//! Collision queries against a node's effective item set

use super::NodeArena;
use super::NodeId;
use crate::geometry::Point;
use crate::router::item::{Item, ItemId, KindMask, LayerRange, NetCode, NO_NET};
use crate::router::line::Line;
use crate::router::shape::Shape;

/// First obstacle met when travelling along a line
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub item: ItemId,
    /// First point where the line enters the obstacle's hull
    pub ip_first: Point,
    /// Path length from the line start to `ip_first`
    pub dist_first: f64,
}

/// Geometry being tested for clearance, with the identity it carries
struct CollisionQuery<'a> {
    shape: Shape,
    net: NetCode,
    layers: LayerRange,
    ignore: &'a [ItemId],
}

impl NodeArena {
    fn query_collisions(
        &self,
        node: NodeId,
        query: &CollisionQuery<'_>,
        mask: KindMask,
        first_only: bool,
    ) -> Vec<ItemId> {
        let clearance = self.clearance();
        let (min, max) = query.shape.bbox();
        let mut hits = Vec::new();
        for (id, item) in self.query_box(node, min, max, clearance) {
            if !item.of_kind(mask)
                || query.ignore.contains(&id)
                || !item.layers().overlaps(&query.layers)
                || (query.net > NO_NET && item.net() == query.net)
            {
                continue;
            }
            if query.shape.collides(&item.shape(), clearance) {
                hits.push(id);
                if first_only {
                    break;
                }
            }
        }
        hits
    }

    /// Items of `mask` violating clearance with `item`
    pub fn colliding_items(&self, node: NodeId, item: &Item, ignore: &[ItemId], mask: KindMask) -> Vec<ItemId> {
        let query = CollisionQuery { shape: item.shape(), net: item.net(), layers: item.layers(), ignore };
        self.query_collisions(node, &query, mask, false)
    }

    pub fn check_colliding_item(&self, node: NodeId, item: &Item, ignore: &[ItemId], mask: KindMask) -> Option<ItemId> {
        let query = CollisionQuery { shape: item.shape(), net: item.net(), layers: item.layers(), ignore };
        self.query_collisions(node, &query, mask, true).first().copied()
    }

    /// All items colliding with the line body or its via
    pub fn line_collisions(&self, node: NodeId, line: &Line, mask: KindMask) -> Vec<ItemId> {
        let mut hits = Vec::new();
        if line.point_count() > 0 {
            let query = CollisionQuery {
                shape: line.shape(),
                net: line.net,
                layers: LayerRange::single(line.layer),
                ignore: &line.links,
            };
            hits = self.query_collisions(node, &query, mask, false);
        }
        if let (Some(via), Some(shape)) = (&line.via, line.via_shape()) {
            let query = CollisionQuery { shape, net: line.net, layers: via.layers, ignore: &line.links };
            for id in self.query_collisions(node, &query, mask, false) {
                if !hits.contains(&id) {
                    hits.push(id);
                }
            }
        }
        hits
    }

    /// First item of `mask` colliding with `line`, if any
    pub fn check_colliding(&self, node: NodeId, line: &Line, mask: KindMask) -> Option<ItemId> {
        self.line_collisions(node, line, mask).first().copied()
    }

    /// Obstacle whose hull the line reaches first
    pub fn nearest_obstacle(&self, node: NodeId, line: &Line, mask: KindMask) -> Option<Obstacle> {
        let clearance = self.clearance();
        let mut best: Option<Obstacle> = None;

        for id in self.line_collisions(node, line, mask) {
            let Some(item) = self.get(node, id) else { continue };
            let hull = item.hull(clearance, line.width);

            let mut candidate: Option<(Point, f64)> = None;
            for ip in line.chain.intersect(&hull) {
                let seg = line.chain.segment(ip.index_our as isize);
                let d = line.chain.length_to_vertex(ip.index_our) + seg.a.distance(ip.p);
                if candidate.map_or(true, |(_, best_d)| d < best_d) {
                    candidate = Some((ip.p, d));
                }
            }

            let (p, d) = match candidate {
                Some(c) => c,
                None if line.point_count() > 0 && hull.point_inside(line.point(0)) => (line.point(0), 0.0),
                // only the via collides, or the whole line sits inside the hull
                None if line.point_count() > 0 => (line.point(-1), line.length()),
                None => continue,
            };

            if best.as_ref().map_or(true, |b| d < b.dist_first) {
                best = Some(Obstacle { item: id, ip_first: p, dist_first: d });
            }
        }
        best
    }

    /// Copy of `line` truncated where it first meets an obstacle
    pub fn clip_to_nearest_obstacle(&self, node: NodeId, line: &Line) -> Line {
        let mut clipped = line.clone();
        if let Some(obs) = self.nearest_obstacle(node, line, KindMask::ANY) {
            clipped.clip_to(obs.ip_first);
            clipped.blocking_obstacle = Some(obs.item);
        }
        clipped
    }

    /// Items on `layer` whose outline contains `p`
    pub fn hit_test(&self, node: NodeId, p: Point, layer: i32) -> Vec<ItemId> {
        let cursor = Shape::Circle { center: p, radius: 0 };
        self.query_box(node, p, p, 0)
            .into_iter()
            .filter(|(_, item)| item.layers().overlaps_layer(layer))
            .filter(|(_, item)| item.shape().gap(&cursor) <= 0.0)
            .map(|(id, _)| id)
            .collect()
    }
}
