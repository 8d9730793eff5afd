//! Octagonal hulls used as walkaround/shove obstacles
//!
//! Hull edges are kept on multiples of 45 degrees whenever the core shape
//! allows it, so paths that hug a hull stay representable in 45-degree mode.

use super::chain::PointChain;
use super::point::Point;
use super::seg::Seg;

/// tan(22.5 deg), used to size the octagon corners
const TAN_22_5: f64 = 0.414_213_562_373_095_1;

/// Corner offset of an octagon circumscribing a circle of radius `r`
fn octagon_corner(r: i64) -> i64 {
    (r as f64 * TAN_22_5).ceil() as i64
}

/// Octagon with axis-aligned and diagonal edges circumscribing a circle
pub fn octagon(center: Point, r: i64) -> Vec<Point> {
    let c = octagon_corner(r);
    [
        (r, -c),
        (r, c),
        (c, r),
        (-c, r),
        (-r, c),
        (-r, -c),
        (-c, -r),
        (c, -r),
    ]
    .iter()
    .map(|&(dx, dy)| Point::new(center.x + dx, center.y + dy))
    .collect()
}

/// Andrew's monotone chain; returns a counter-clockwise hull without repeated vertices
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = points.to_vec();
    pts.sort();
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Point> = Vec::with_capacity(pts.len());
    for p in &pts {
        while lower.len() >= 2
            && (lower[lower.len() - 1] - lower[lower.len() - 2]).cross(*p - lower[lower.len() - 2]) <= 0
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2
            && (upper[upper.len() - 1] - upper[upper.len() - 2]).cross(*p - upper[upper.len() - 2]) <= 0
        {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

fn is_compass(v: Point) -> bool {
    v.x == 0 || v.y == 0 || v.x.abs() == v.y.abs()
}

/// Octagon around the bounding box of `pts`, inflated by `r`
pub fn bbox_octagon(pts: &[Point], r: i64) -> PointChain {
    let mut min = pts[0];
    let mut max = pts[0];
    for p in pts {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    let corners = [min, Point::new(max.x, min.y), max, Point::new(min.x, max.y)];
    hull_of_octagons(&corners, r)
}

fn hull_of_octagons(cores: &[Point], r: i64) -> PointChain {
    let mut all = Vec::with_capacity(cores.len() * 8);
    for p in cores {
        all.extend(octagon(*p, r));
    }
    let mut chain = PointChain::closed_polygon(convex_hull(&all));
    chain.simplify();
    chain.set_closed(true);
    chain
}

/// Hull of a circle
pub fn circle_hull(center: Point, r: i64) -> PointChain {
    PointChain::closed_polygon(octagon(center, r))
}

/// Hull of a segment inflated by `r`
pub fn segment_hull(seg: &Seg, r: i64) -> PointChain {
    if seg.is_degenerate() || is_compass(seg.vector()) {
        hull_of_octagons(&[seg.a, seg.b], r)
    } else {
        bbox_octagon(&[seg.a, seg.b], r)
    }
}

/// Hull of a polygon inflated by `r`
pub fn polygon_hull(outline: &[Point], r: i64) -> PointChain {
    let n = outline.len();
    let compass = (0..n).all(|i| is_compass(outline[(i + 1) % n] - outline[i]));
    if compass {
        hull_of_octagons(outline, r)
    } else {
        bbox_octagon(outline, r)
    }
}
