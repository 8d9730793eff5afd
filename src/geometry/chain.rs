//! Ordered point chains with embedded arcs
//!
//! A `PointChain` is the geometric backbone of every trace: a polyline whose
//! segments may be tagged as belonging to a circular arc (approximated by the
//! chain's own vertices). Indices follow the convention used throughout the
//! router: negative indices count from the end (`-1` is the last point).

use super::arc::{Arc, DEFAULT_ARC_ERROR};
use super::point::Point;
use super::seg::Seg;
use serde::{Deserialize, Serialize};

/// A crossing between two chains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intersection {
    /// Segment index in the chain `intersect` was called on
    pub index_our: usize,
    /// Segment index in the other chain
    pub index_their: usize,
    pub p: Point,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointChain {
    points: Vec<Point>,
    /// Arc tag for each segment (`points.len() - 1` entries)
    seg_arcs: Vec<Option<usize>>,
    arcs: Vec<Arc>,
    closed: bool,
}

impl PointChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Self {
        let mut chain = Self::new();
        for p in points {
            chain.append(p);
        }
        chain
    }

    pub fn closed_polygon<I: IntoIterator<Item = Point>>(points: I) -> Self {
        let mut chain = Self::from_points(points);
        chain.closed = true;
        chain
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    fn index(&self, i: isize) -> usize {
        if i < 0 {
            (self.points.len() as isize + i).max(0) as usize
        } else {
            i as usize
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn segment_count(&self) -> usize {
        if self.points.len() < 2 {
            return 0;
        }
        self.points.len() - 1 + usize::from(self.closed)
    }

    /// Number of shapes: straight segments count individually, each arc run counts once
    pub fn shape_count(&self) -> usize {
        let mut count = 0;
        let mut last_arc = None;
        for tag in &self.seg_arcs {
            match tag {
                Some(k) if last_arc == Some(*k) => {}
                Some(k) => {
                    count += 1;
                    last_arc = Some(*k);
                }
                None => {
                    count += 1;
                    last_arc = None;
                }
            }
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point(&self, i: isize) -> Point {
        self.points[self.index(i)]
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Moves a vertex; any arc tag on the adjacent segments is dropped
    pub fn set_point(&mut self, i: isize, p: Point) {
        let idx = self.index(i);
        self.points[idx] = p;
        if idx > 0 {
            self.seg_arcs[idx - 1] = None;
        }
        if idx < self.seg_arcs.len() {
            self.seg_arcs[idx] = None;
        }
    }

    pub fn segment(&self, i: isize) -> Seg {
        let n = self.segment_count() as isize;
        let idx = if i < 0 { (n + i).max(0) as usize } else { i as usize };
        let a = self.points[idx];
        let b = self.points[(idx + 1) % self.points.len()];
        Seg::new(a, b)
    }

    pub fn segments(&self) -> impl Iterator<Item = Seg> + '_ {
        (0..self.segment_count()).map(move |i| self.segment(i as isize))
    }

    pub fn length(&self) -> f64 {
        self.segments().map(|s| s.length()).sum()
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.seg_arcs.clear();
        self.arcs.clear();
        self.closed = false;
    }

    /// Appends a vertex, skipping exact duplicates of the last one
    pub fn append(&mut self, p: Point) {
        if self.points.last() == Some(&p) {
            return;
        }
        if !self.points.is_empty() {
            self.seg_arcs.push(None);
        }
        self.points.push(p);
    }

    /// Appends another chain; a shared junction point is only stored once
    pub fn append_chain(&mut self, other: &PointChain) {
        if other.points.is_empty() {
            return;
        }
        let offset = self.arcs.len();
        self.arcs.extend(other.arcs.iter().copied());

        let skip_first = self.points.last() == other.points.first();
        if !skip_first && !self.points.is_empty() {
            self.seg_arcs.push(None);
        }
        if !skip_first {
            self.points.push(other.points[0]);
        }
        for (i, p) in other.points.iter().enumerate().skip(1) {
            self.points.push(*p);
            self.seg_arcs.push(other.seg_arcs[i - 1].map(|k| k + offset));
        }
        self.compact_arcs();
    }

    /// Appends an arc approximated within `error_max`
    pub fn append_arc(&mut self, arc: Arc, error_max: i64) {
        let pts = arc.to_points(error_max);
        if pts.len() < 2 {
            return;
        }
        let k = self.arcs.len();
        self.arcs.push(arc);
        if self.points.last() != Some(&pts[0]) {
            if !self.points.is_empty() {
                self.seg_arcs.push(None);
            }
            self.points.push(pts[0]);
        }
        for p in pts.into_iter().skip(1) {
            if self.points.last() == Some(&p) {
                continue;
            }
            self.points.push(p);
            self.seg_arcs.push(Some(k));
        }
    }

    pub fn append_arc_default(&mut self, arc: Arc) {
        self.append_arc(arc, DEFAULT_ARC_ERROR);
    }

    /// Arc index owning segment `seg`, if any
    pub fn arc_index(&self, seg: usize) -> Option<usize> {
        self.seg_arcs.get(seg).copied().flatten()
    }

    pub fn is_arc_segment(&self, seg: usize) -> bool {
        self.arc_index(seg).is_some()
    }

    /// True when the vertex touches an arc segment on either side
    pub fn is_pt_on_arc(&self, pt: usize) -> bool {
        (pt > 0 && self.is_arc_segment(pt - 1)) || self.is_arc_segment(pt)
    }

    pub fn arc_count(&self) -> usize {
        let mut seen: Vec<usize> = self.seg_arcs.iter().flatten().copied().collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }

    /// The arc `k` trimmed to the vertices actually present in the chain
    pub fn arc(&self, k: usize) -> Option<Arc> {
        let first = self.seg_arcs.iter().position(|t| *t == Some(k))?;
        let last = self.seg_arcs.iter().rposition(|t| *t == Some(k))?;
        let base = self.arcs.get(k)?;
        Some(Arc::new(self.points[first], self.points[last + 1], base.center, base.clockwise))
    }

    /// Point index where the last shape (segment or arc run) begins
    pub fn last_shape_start(&self) -> Option<usize> {
        if self.points.len() < 2 {
            return None;
        }
        let mut i = self.seg_arcs.len() - 1;
        if let Some(k) = self.seg_arcs[i] {
            while i > 0 && self.seg_arcs[i - 1] == Some(k) {
                i -= 1;
            }
        }
        Some(i)
    }

    /// Removes the last shape, keeping its first vertex
    pub fn remove_last_shape(&mut self) {
        if let Some(start) = self.last_shape_start() {
            self.points.truncate(start + 1);
            self.seg_arcs.truncate(start);
            self.compact_arcs();
        }
    }

    /// Removes vertices `start..=end`
    pub fn remove(&mut self, start: isize, end: isize) {
        if self.points.is_empty() {
            return;
        }
        let s = self.index(start);
        let e = self.index(end).min(self.points.len() - 1);
        if s > e {
            return;
        }
        let mut tags = Vec::with_capacity(self.seg_arcs.len());
        if s > 0 {
            tags.extend_from_slice(&self.seg_arcs[..s - 1]);
            if e + 1 < self.points.len() {
                let before = self.seg_arcs[s - 1];
                let after = self.seg_arcs[e];
                tags.push(if before == after { before } else { None });
            }
        }
        if e + 1 < self.points.len() {
            tags.extend_from_slice(&self.seg_arcs[e + 1..]);
        }
        self.points.drain(s..=e);
        self.seg_arcs = tags;
        self.compact_arcs();
    }

    /// Copy of vertices `start..=end`
    pub fn slice(&self, start: isize, end: isize) -> PointChain {
        let mut out = PointChain::new();
        if self.points.is_empty() {
            return out;
        }
        let s = self.index(start);
        let e = self.index(end).min(self.points.len() - 1);
        if s > e {
            return out;
        }
        out.points.extend_from_slice(&self.points[s..=e]);
        out.seg_arcs.extend_from_slice(&self.seg_arcs[s..e]);
        out.arcs = self.arcs.clone();
        out.compact_arcs();
        out
    }

    /// Replaces vertices `start..=end` with `with`
    pub fn replace(&mut self, start: isize, end: isize, with: &PointChain) {
        let s = self.index(start);
        let e = self.index(end);
        let head = if s > 0 { self.slice(0, s as isize - 1) } else { PointChain::new() };
        let tail = if e + 1 < self.points.len() {
            self.slice(e as isize + 1, -1)
        } else {
            PointChain::new()
        };
        let mut out = head;
        out.append_chain(with);
        out.append_chain(&tail);
        out.closed = self.closed;
        *self = out;
    }

    pub fn find(&self, p: Point) -> Option<usize> {
        self.points.iter().position(|q| *q == p)
    }

    /// Inserts `p` as a vertex if it lies on the chain; returns its vertex index
    pub fn split(&mut self, p: Point) -> Option<usize> {
        if let Some(i) = self.find(p) {
            return Some(i);
        }
        let n = self.points.len().saturating_sub(1);
        for i in 0..n {
            if self.segment(i as isize).contains_point(p) {
                let tag = self.seg_arcs[i];
                self.points.insert(i + 1, p);
                self.seg_arcs.insert(i, tag);
                return Some(i + 1);
            }
        }
        None
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
        self.seg_arcs.reverse();
        for arc in &mut self.arcs {
            *arc = arc.reversed();
        }
    }

    pub fn reversed(&self) -> PointChain {
        let mut c = self.clone();
        c.reverse();
        c
    }

    /// Removes duplicate vertices and vertices in the middle of straight collinear runs
    pub fn simplify(&mut self) {
        if self.points.len() < 2 {
            return;
        }
        let mut pts: Vec<Point> = Vec::with_capacity(self.points.len());
        let mut tags: Vec<Option<usize>> = Vec::with_capacity(self.seg_arcs.len());

        for (i, p) in self.points.iter().enumerate() {
            let incoming = if i > 0 { self.seg_arcs[i - 1] } else { None };
            if pts.last() == Some(p) {
                continue;
            }
            if pts.len() >= 2 && incoming.is_none() && tags.last() == Some(&None) {
                let a = pts[pts.len() - 2];
                let m = pts[pts.len() - 1];
                if Seg::new(a, *p).contains_point(m) {
                    pts.pop();
                    tags.pop();
                }
            }
            if !pts.is_empty() {
                tags.push(incoming);
            }
            pts.push(*p);
        }

        self.points = pts;
        self.seg_arcs = tags;
        self.compact_arcs();
    }

    pub fn simplified(&self) -> PointChain {
        let mut c = self.clone();
        c.simplify();
        c
    }

    /// All crossings between this chain and `other`, ordered by our segment index
    pub fn intersect(&self, other: &PointChain) -> Vec<Intersection> {
        let mut out: Vec<Intersection> = Vec::new();
        for (i, a) in self.segments().enumerate() {
            for (j, b) in other.segments().enumerate() {
                if let Some(p) = a.intersect(&b) {
                    let duplicate = out.iter().any(|x| x.p == p && x.index_our + 1 >= i);
                    if !duplicate {
                        out.push(Intersection { index_our: i, index_their: j, p });
                    }
                }
            }
        }
        out
    }

    /// True when two non-adjacent segments touch, or a vertex repeats
    pub fn self_intersects(&self) -> bool {
        let n = self.points.len().saturating_sub(1);
        for i in 0..n {
            let a = self.segment(i as isize);
            for j in (i + 2)..n {
                if self.closed && i == 0 && j == n - 1 {
                    continue;
                }
                if a.intersects(&self.segment(j as isize)) {
                    return true;
                }
            }
        }
        false
    }

    /// Closest point on the chain to `p`
    pub fn nearest_point(&self, p: Point) -> Option<Point> {
        let mut best: Option<(i128, Point)> = None;
        for s in self.segments() {
            let q = s.nearest_point(p);
            let d = (q - p).squared_norm();
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, q));
            }
        }
        best.map(|(_, q)| q).or_else(|| self.first())
    }

    /// Euclidean distance from `p` to the chain's edges
    pub fn distance_to_point(&self, p: Point) -> f64 {
        if self.points.len() == 1 {
            return self.points[0].distance(p);
        }
        self.segments()
            .map(|s| s.distance_to_point(p))
            .fold(f64::MAX, f64::min)
    }

    /// Path length from the start to vertex `idx`
    pub fn length_to_vertex(&self, idx: usize) -> f64 {
        self.segments().take(idx).map(|s| s.length()).sum()
    }

    /// Even-odd containment test (boundary points count as outside)
    pub fn point_inside(&self, p: Point) -> bool {
        if self.points.len() < 3 || self.point_on_edge(p) {
            return false;
        }
        let mut inside = false;
        let n = self.points.len();
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            if (pi.y > p.y) != (pj.y > p.y) {
                let x_cross = pj.x as f64
                    + (p.y - pj.y) as f64 * (pi.x - pj.x) as f64 / (pi.y - pj.y) as f64;
                if (p.x as f64) < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    pub fn point_on_edge(&self, p: Point) -> bool {
        let n = self.points.len();
        if n == 1 {
            return self.points[0] == p;
        }
        (0..n).any(|i| Seg::new(self.points[i], self.points[(i + 1) % n]).contains_point(p))
    }

    /// Signed shoelace area treating the chain as closed
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut acc: i128 = 0;
        for i in 0..n {
            acc += self.points[i].cross(self.points[(i + 1) % n]);
        }
        acc as f64 / 2.0
    }

    /// Bounding box as (min, max)
    pub fn bbox(&self) -> Option<(Point, Point)> {
        let first = *self.points.first()?;
        let (mut min, mut max) = (first, first);
        for p in &self.points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some((min, max))
    }

    /// Drops arcs no longer referenced by any segment and renumbers the tags
    fn compact_arcs(&mut self) {
        let mut used: Vec<usize> = self.seg_arcs.iter().flatten().copied().collect();
        used.sort_unstable();
        used.dedup();
        if used.len() == self.arcs.len() {
            return;
        }
        let arcs: Vec<Arc> = used.iter().filter_map(|k| self.arcs.get(*k).copied()).collect();
        for tag in self.seg_arcs.iter_mut().flatten() {
            if let Ok(pos) = used.binary_search(tag) {
                *tag = pos;
            }
        }
        self.arcs = arcs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(pts: &[(i64, i64)]) -> PointChain {
        PointChain::from_points(pts.iter().map(|&(x, y)| Point::new(x, y)))
    }

    #[test]
    fn test_simplify_collinear() {
        let mut c = chain(&[(0, 0), (5, 0), (10, 0), (10, 10), (10, 10)]);
        c.simplify();
        assert_eq!(c.points(), &[Point::new(0, 0), Point::new(10, 0), Point::new(10, 10)]);
    }

    #[test]
    fn test_simplify_keeps_reversal() {
        let mut c = chain(&[(0, 0), (10, 0), (5, 0)]);
        c.simplify();
        assert_eq!(c.point_count(), 3);
    }

    #[test]
    fn test_negative_indices_and_remove() {
        let mut c = chain(&[(0, 0), (10, 0), (10, 10), (20, 10)]);
        assert_eq!(c.point(-1), Point::new(20, 10));
        assert_eq!(c.segment(-1), Seg::new(Point::new(10, 10), Point::new(20, 10)));
        c.remove(2, -1);
        assert_eq!(c.point_count(), 2);
        assert_eq!(c.point(-1), Point::new(10, 0));
    }

    #[test]
    fn test_split_and_slice() {
        let mut c = chain(&[(0, 0), (10, 0), (10, 10)]);
        let idx = c.split(Point::new(4, 0)).unwrap();
        assert_eq!(idx, 1);
        let s = c.slice(0, idx as isize);
        assert_eq!(s.points(), &[Point::new(0, 0), Point::new(4, 0)]);
        assert!(c.split(Point::new(3, 3)).is_none());
    }

    #[test]
    fn test_intersections_ordered() {
        let a = chain(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        let b = chain(&[(5, -5), (5, 15)]);
        let ips = a.intersect(&b);
        assert_eq!(ips.len(), 2);
        assert_eq!(ips[0].index_our, 0);
        assert_eq!(ips[0].p, Point::new(5, 0));
        assert_eq!(ips[1].p, Point::new(5, 10));
    }

    #[test]
    fn test_arc_runs_count_as_one_shape() {
        let mut c = chain(&[(0, 0), (100, 0)]);
        c.append_arc(
            Arc::new(Point::new(100, 0), Point::new(200, 100), Point::new(100, 100), false),
            1,
        );
        assert!(c.segment_count() > 2);
        assert_eq!(c.shape_count(), 2);
        assert_eq!(c.arc_count(), 1);
        let arc = c.arc(0).unwrap();
        assert_eq!(arc.start, Point::new(100, 0));
        assert_eq!(arc.end, Point::new(200, 100));

        c.remove_last_shape();
        assert_eq!(c.point_count(), 2);
        assert_eq!(c.arc_count(), 0);
    }

    #[test]
    fn test_point_inside_and_area() {
        let sq = PointChain::closed_polygon(
            [(0, 0), (10, 0), (10, 10), (0, 10)].iter().map(|&(x, y)| Point::new(x, y)),
        );
        assert!(sq.point_inside(Point::new(5, 5)));
        assert!(!sq.point_inside(Point::new(15, 5)));
        assert!(!sq.point_inside(Point::new(10, 5)));
        assert_eq!(sq.area(), 100.0);
    }

    #[test]
    fn test_self_intersects() {
        assert!(chain(&[(0, 0), (10, 0), (10, 10), (5, -5)]).self_intersects());
        assert!(!chain(&[(0, 0), (10, 0), (10, 10)]).self_intersects());
    }
}
