//! Per-node R-tree entries
//!
//! Each node level indexes only the items it owns; shadowing of ancestor
//! items is resolved by the caller while walking up the lineage.

use crate::geometry::Point;
use crate::router::item::{Item, ItemId};
use rstar::{RTreeObject, AABB};

/// Item id plus its bounding box, as stored in a node's R-tree
#[derive(Clone, Debug, PartialEq)]
pub(super) struct IndexedItem {
    pub id: ItemId,
    pub min: [i64; 2],
    pub max: [i64; 2],
}

impl IndexedItem {
    pub fn new(id: ItemId, item: &Item) -> Self {
        let (min, max) = item.shape().bbox();
        Self { id, min: [min.x, min.y], max: [max.x, max.y] }
    }
}

impl RTreeObject for IndexedItem {
    type Envelope = AABB<[i64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

/// Query envelope of a box grown by `margin` on every side
pub(super) fn envelope(min: Point, max: Point, margin: i64) -> AABB<[i64; 2]> {
    AABB::from_corners([min.x - margin, min.y - margin], [max.x + margin, max.y + margin])
}
