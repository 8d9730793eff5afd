//! Routable board items
//!
//! Items are a tagged union matched by kind: segments and arcs (the linked
//! items that make up traces), vias, and solids (pads, holes, keepouts) that
//! are always treated as fixed obstacles.

use super::shape::Shape;
use crate::geometry::{Arc, Point, PointChain, Seg, DEFAULT_ARC_ERROR};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Net code; `NO_NET` (zero or negative) means the item is not connected to any net
pub type NetCode = i32;

pub const NO_NET: NetCode = 0;

/// Stable identity of an item inside a node tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inclusive span of copper layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerRange {
    pub start: i32,
    pub end: i32,
}

impl LayerRange {
    pub fn new(a: i32, b: i32) -> Self {
        Self { start: a.min(b), end: a.max(b) }
    }

    pub fn single(layer: i32) -> Self {
        Self { start: layer, end: layer }
    }

    pub fn overlaps(&self, other: &LayerRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn overlaps_layer(&self, layer: i32) -> bool {
        layer >= self.start && layer <= self.end
    }

    pub fn is_multilayer(&self) -> bool {
        self.start != self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Segment,
    Arc,
    Via,
    Solid,
}

/// Set of item kinds used to filter collision queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindMask(u8);

impl KindMask {
    pub const SEGMENT: KindMask = KindMask(0x01);
    pub const ARC: KindMask = KindMask(0x02);
    pub const VIA: KindMask = KindMask(0x04);
    pub const SOLID: KindMask = KindMask(0x08);
    pub const LINKED: KindMask = KindMask(0x03);
    pub const ANY: KindMask = KindMask(0x0f);

    pub fn contains(self, kind: ItemKind) -> bool {
        let bit = match kind {
            ItemKind::Segment => 0x01,
            ItemKind::Arc => 0x02,
            ItemKind::Via => 0x04,
            ItemKind::Solid => 0x08,
        };
        self.0 & bit != 0
    }
}

impl BitOr for KindMask {
    type Output = KindMask;
    fn bitor(self, rhs: KindMask) -> KindMask {
        KindMask(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub seg: Seg,
    pub width: i64,
    pub net: NetCode,
    pub layer: i32,
}

impl Segment {
    pub fn new(seg: Seg, width: i64, net: NetCode, layer: i32) -> Self {
        Self { seg, width, net, layer }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcItem {
    pub arc: Arc,
    pub width: i64,
    pub net: NetCode,
    pub layer: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViaType {
    #[default]
    Through,
    BlindBuried,
    Micro,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub pos: Point,
    pub diameter: i64,
    pub drill: i64,
    pub layers: LayerRange,
    pub net: NetCode,
    #[serde(default)]
    pub via_type: ViaType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SolidShape {
    Circle { center: Point, radius: i64 },
    Rect { center: Point, half_width: i64, half_height: i64 },
    Polygon { outline: Vec<Point> },
}

/// Pads, holes and keepouts: never moved by the router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    pub shape: SolidShape,
    pub layers: LayerRange,
    #[serde(default)]
    pub net: NetCode,
    /// Connection point (pad center)
    pub anchor: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Segment(Segment),
    Arc(ArcItem),
    Via(Via),
    Solid(Solid),
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Segment(_) => ItemKind::Segment,
            Item::Arc(_) => ItemKind::Arc,
            Item::Via(_) => ItemKind::Via,
            Item::Solid(_) => ItemKind::Solid,
        }
    }

    pub fn of_kind(&self, mask: KindMask) -> bool {
        mask.contains(self.kind())
    }

    /// Segments and arcs are linked into lines
    pub fn is_linked(&self) -> bool {
        matches!(self, Item::Segment(_) | Item::Arc(_))
    }

    pub fn net(&self) -> NetCode {
        match self {
            Item::Segment(s) => s.net,
            Item::Arc(a) => a.net,
            Item::Via(v) => v.net,
            Item::Solid(s) => s.net,
        }
    }

    pub fn set_net(&mut self, net: NetCode) {
        match self {
            Item::Segment(s) => s.net = net,
            Item::Arc(a) => a.net = net,
            Item::Via(v) => v.net = net,
            Item::Solid(s) => s.net = net,
        }
    }

    pub fn layers(&self) -> LayerRange {
        match self {
            Item::Segment(s) => LayerRange::single(s.layer),
            Item::Arc(a) => LayerRange::single(a.layer),
            Item::Via(v) => v.layers,
            Item::Solid(s) => s.layers,
        }
    }

    pub fn layers_overlap(&self, other: &Item) -> bool {
        self.layers().overlaps(&other.layers())
    }

    /// Trace width for linked items, zero otherwise
    pub fn width(&self) -> i64 {
        match self {
            Item::Segment(s) => s.width,
            Item::Arc(a) => a.width,
            _ => 0,
        }
    }

    /// Connection points: both ends of a segment/arc, the center of a via or pad
    pub fn anchors(&self) -> Vec<Point> {
        match self {
            Item::Segment(s) => vec![s.seg.a, s.seg.b],
            Item::Arc(a) => vec![a.arc.start, a.arc.end],
            Item::Via(v) => vec![v.pos],
            Item::Solid(s) => vec![s.anchor],
        }
    }

    pub fn anchor(&self, n: usize) -> Point {
        let anchors = self.anchors();
        anchors[n.min(anchors.len() - 1)]
    }

    /// True when `net` and ours are the same real net (same-net items never collide)
    pub fn same_net(&self, net: NetCode) -> bool {
        net > NO_NET && self.net() == net
    }

    pub fn shape(&self) -> Shape {
        match self {
            Item::Segment(s) => Shape::segment(s.seg, s.width),
            Item::Arc(a) => Shape::Polyline {
                chain: PointChain::from_points(a.arc.to_points(DEFAULT_ARC_ERROR)),
                radius: a.width / 2,
            },
            Item::Via(v) => Shape::Circle { center: v.pos, radius: v.diameter / 2 },
            Item::Solid(s) => match &s.shape {
                SolidShape::Circle { center, radius } => Shape::Circle { center: *center, radius: *radius },
                SolidShape::Rect { center, half_width, half_height } => Shape::Polygon {
                    outline: PointChain::closed_polygon([
                        Point::new(center.x - half_width, center.y - half_height),
                        Point::new(center.x + half_width, center.y - half_height),
                        Point::new(center.x + half_width, center.y + half_height),
                        Point::new(center.x - half_width, center.y + half_height),
                    ]),
                },
                SolidShape::Polygon { outline } => Shape::Polygon {
                    outline: PointChain::closed_polygon(outline.iter().copied()),
                },
            },
        }
    }

    /// Obstacle hull seen by a trace of `walker_width` at `clearance`
    pub fn hull(&self, clearance: i64, walker_width: i64) -> PointChain {
        self.shape().hull(clearance + walker_width / 2 + 1)
    }

    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            Item::Segment(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_via(&self) -> Option<&Via> {
        match self {
            Item::Via(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemKind::Segment => "segment",
            ItemKind::Arc => "arc",
            ItemKind::Via => "via",
            ItemKind::Solid => "solid",
        };
        f.write_str(name)
    }
}
