//! Lines: net/width tagged point chains with an optional terminating via
//!
//! A line is not stored in a node as such. Nodes hold the segment and arc
//! items it decomposes into; `links` records those item ids once the line has
//! been added to (or assembled from) a node.

use super::direction::{AngleMask, Direction45};
use super::item::{ArcItem, Item, ItemId, NetCode, Segment, Via};
use super::shape::Shape;
use crate::geometry::{Point, PointChain, Seg};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Line {
    pub chain: PointChain,
    pub width: i64,
    pub net: NetCode,
    pub layer: i32,
    pub via: Option<Via>,
    pub links: Vec<ItemId>,
    /// Item the line was cut short at
    pub blocking_obstacle: Option<ItemId>,
}

impl Line {
    pub fn new(width: i64, net: NetCode, layer: i32) -> Self {
        Self { chain: PointChain::new(), width, net, layer, via: None, links: Vec::new(), blocking_obstacle: None }
    }

    /// Same width/net/layer as `self`, different geometry
    pub fn with_chain(&self, chain: PointChain) -> Line {
        Line {
            chain,
            width: self.width,
            net: self.net,
            layer: self.layer,
            via: None,
            links: Vec::new(),
            blocking_obstacle: None,
        }
    }

    pub fn point_count(&self) -> usize {
        self.chain.point_count()
    }

    pub fn segment_count(&self) -> usize {
        self.chain.segment_count()
    }

    pub fn shape_count(&self) -> usize {
        self.chain.shape_count()
    }

    pub fn point(&self, i: isize) -> Point {
        self.chain.point(i)
    }

    pub fn segment(&self, i: isize) -> Seg {
        self.chain.segment(i)
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn set_shape(&mut self, chain: PointChain) {
        self.chain = chain;
        self.links.clear();
    }

    pub fn clear(&mut self) {
        self.chain.clear();
        self.via = None;
        self.links.clear();
        self.blocking_obstacle = None;
    }

    /// Attaches `via` at the last point of the line
    pub fn append_via(&mut self, mut via: Via) {
        if let Some(end) = self.chain.last() {
            via.pos = end;
        }
        via.net = self.net;
        self.via = Some(via);
    }

    pub fn remove_via(&mut self) {
        self.via = None;
    }

    pub fn ends_with_via(&self) -> bool {
        self.via.is_some()
    }

    pub fn contains_link(&self, id: ItemId) -> bool {
        self.links.contains(&id)
    }

    pub fn clear_links(&mut self) {
        self.links.clear();
    }

    /// Collision shape of the trace body (without the via)
    pub fn shape(&self) -> Shape {
        Shape::Polyline { chain: self.chain.clone(), radius: self.width / 2 }
    }

    pub fn via_shape(&self) -> Option<Shape> {
        self.via.as_ref().map(|v| Shape::Circle { center: v.pos, radius: v.diameter / 2 })
    }

    /// Direction of segment `i` (negative counts from the end)
    pub fn direction(&self, i: isize) -> Direction45 {
        if self.segment_count() == 0 {
            return Direction45::Undefined;
        }
        Direction45::from_seg(&self.segment(i))
    }

    /// Number of corners whose angle is in `mask`
    pub fn count_corners(&self, mask: AngleMask) -> usize {
        let n = self.segment_count();
        (1..n)
            .filter(|&i| {
                let d0 = Direction45::from_seg(&self.chain.segment(i as isize - 1));
                let d1 = Direction45::from_seg(&self.chain.segment(i as isize));
                mask.contains(d0.angle(d1))
            })
            .count()
    }

    /// True if the trace crosses or touches itself
    pub fn has_loops(&self) -> bool {
        self.chain.self_intersects()
    }

    /// Truncates the line at `p`, which must lie on it; drops the via
    pub fn clip_to(&mut self, p: Point) {
        self.via = None;
        self.links.clear();
        if let Some(idx) = self.chain.split(p) {
            if idx + 1 < self.chain.point_count() {
                self.chain.remove(idx as isize + 1, -1);
            }
        }
    }

    pub fn length(&self) -> f64 {
        self.chain.length()
    }

    /// Board items for the first `seg_limit` segments
    ///
    /// Straight segments become `Segment` items; each arc run becomes a
    /// single `Arc` item, emitted whole once any of its segments is in range.
    pub fn linked_items(&self, seg_limit: usize) -> Vec<Item> {
        let mut out = Vec::new();
        let mut last_arc: Option<usize> = None;
        for i in 0..seg_limit.min(self.segment_count()) {
            match self.chain.arc_index(i) {
                Some(k) if last_arc == Some(k) => {}
                Some(k) => {
                    if let Some(arc) = self.chain.arc(k) {
                        out.push(Item::Arc(ArcItem { arc, width: self.width, net: self.net, layer: self.layer }));
                    }
                    last_arc = Some(k);
                }
                None => {
                    out.push(Item::Segment(Segment::new(self.segment(i as isize), self.width, self.net, self.layer)));
                    last_arc = None;
                }
            }
        }
        out
    }

    /// Reroutes the line around a closed obstacle `hull`
    ///
    /// The part between the first entry into and the last exit from the hull
    /// is replaced by the hull outline, travelled clockwise (screen
    /// coordinates, y down) when `cw` is set. Returns `None` when the line
    /// starts inside the hull or ends inside it, since no detour can help.
    pub fn walkaround(&self, hull: &PointChain, cw: bool) -> Option<PointChain> {
        let chain = &self.chain;
        if chain.point_count() < 2 {
            return Some(chain.clone());
        }
        if hull.point_inside(chain.point(0)) || hull.point_inside(chain.point(-1)) {
            return None;
        }

        let mut hits = chain.intersect(hull);
        if hits.len() < 2 {
            return Some(chain.clone());
        }
        hits.sort_by(|a, b| {
            let da = a.p.distance(chain.segment(a.index_our as isize).a);
            let db = b.p.distance(chain.segment(b.index_our as isize).a);
            a.index_our.cmp(&b.index_our).then(da.total_cmp(&db))
        });
        let entry = hits[0];
        let exit = hits[hits.len() - 1];
        if entry.p == exit.p {
            return Some(chain.clone());
        }

        let hn = hull.point_count();
        let forward = (hull.area() > 0.0) == cw;
        let mut detour: Vec<Point> = Vec::new();
        if entry.index_their != exit.index_their {
            if forward {
                let mut k = (entry.index_their + 1) % hn;
                loop {
                    detour.push(hull.point(k as isize));
                    if k == exit.index_their {
                        break;
                    }
                    k = (k + 1) % hn;
                }
            } else {
                let mut k = entry.index_their;
                loop {
                    detour.push(hull.point(k as isize));
                    if (k + hn - 1) % hn == exit.index_their {
                        break;
                    }
                    k = (k + hn - 1) % hn;
                }
            }
        }

        let mut out = chain.slice(0, entry.index_our as isize);
        out.append(entry.p);
        for p in detour {
            out.append(p);
        }
        out.append(exit.p);
        if exit.index_our + 1 < chain.point_count() {
            out.append_chain(&chain.slice(exit.index_our as isize + 1, -1));
        }
        out.simplify();
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::circle_hull;
    use crate::router::direction::AngleType;
    use crate::router::item::{LayerRange, ViaType};

    fn line(points: &[(i64, i64)]) -> Line {
        let mut l = Line::new(100, 1, 0);
        l.chain = PointChain::from_points(points.iter().map(|&(x, y)| Point::new(x, y)));
        l
    }

    #[test]
    fn test_count_corners() {
        let l = line(&[(0, 0), (100, 0), (200, 100), (200, 300), (100, 300)]);
        assert_eq!(l.count_corners(AngleType::Obtuse.into()), 2);
        assert_eq!(l.count_corners(AngleType::Right.into()), 1);
        assert_eq!(l.count_corners(AngleType::Acute | AngleType::HalfFull), 0);
    }

    #[test]
    fn test_clip_to() {
        let mut l = line(&[(0, 0), (1000, 0), (1000, 1000)]);
        l.clip_to(Point::new(1000, 400));
        assert_eq!(l.point(-1), Point::new(1000, 400));
        assert_eq!(l.point_count(), 3);
    }

    #[test]
    fn test_append_via_follows_end() {
        let mut l = line(&[(0, 0), (1000, 0)]);
        l.append_via(Via {
            pos: Point::new(0, 0),
            diameter: 600,
            drill: 300,
            layers: LayerRange::new(0, 31),
            net: 0,
            via_type: ViaType::Through,
        });
        assert!(l.ends_with_via());
        assert_eq!(l.via.as_ref().map(|v| v.pos), Some(Point::new(1000, 0)));
        assert_eq!(l.via.as_ref().map(|v| v.net), Some(1));
    }

    #[test]
    fn test_walkaround_both_sides() {
        let l = line(&[(0, 0), (10_000, 0)]);
        let hull = circle_hull(Point::new(5000, 0), 1000);
        let a = l.walkaround(&hull, true).expect("detour");
        let b = l.walkaround(&hull, false).expect("detour");
        assert_eq!(a.point(-1), Point::new(10_000, 0));
        assert_eq!(b.point(-1), Point::new(10_000, 0));
        let a_side = a.points().iter().any(|p| p.y > 0);
        let b_side = b.points().iter().any(|p| p.y > 0);
        assert_ne!(a_side, b_side);
        for c in [&a, &b] {
            for p in c.points() {
                assert!(!hull.point_inside(*p));
            }
        }
    }

    #[test]
    fn test_walkaround_start_inside() {
        let l = line(&[(5000, 0), (10_000, 0)]);
        let hull = circle_hull(Point::new(5000, 0), 1000);
        assert!(l.walkaround(&hull, true).is_none());
    }
}
