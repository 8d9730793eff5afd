//! Branchable board snapshots
//!
//! Nodes live in an arena and are addressed by generation-stamped handles.
//! The root is the persisted board; every other node is a speculative
//! overlay holding its own added items plus the ids of ancestor items it
//! hides. The effective item set of a node is found by walking its parent
//! chain, never by copying.
//!
//! # Submodules
//! - `index` - R-tree entries for the items a node owns
//! - `query` - Collision checks, nearest obstacle and hit testing
//! - `joint` - Joints and line assembly from linked items

mod index;
mod joint;
mod query;

pub use joint::{Joint, JointLink};
pub use query::Obstacle;

use super::error::{Result, RouterError};
use super::item::{Item, ItemId};
use super::settings::DesignRules;
use crate::geometry::Point;
use index::IndexedItem;
use indexmap::IndexMap;
use rstar::RTree;
use std::collections::HashSet;

/// Handle to a node; stale once the node is released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Default)]
struct NodeData {
    parent: Option<NodeId>,
    depth: usize,
    items: IndexMap<ItemId, Item>,
    /// Ancestor items hidden from this node and its descendants
    removed: HashSet<ItemId>,
    index: RTree<IndexedItem>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

#[derive(Debug)]
pub struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    next_item: u64,
    rules: DesignRules,
}

impl NodeArena {
    pub fn new(rules: DesignRules) -> Self {
        let root = NodeId { index: 0, generation: 0 };
        Self {
            slots: vec![Slot { generation: 0, data: Some(NodeData::default()) }],
            free: Vec::new(),
            root,
            next_item: 1,
            rules,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn rules(&self) -> DesignRules {
        self.rules
    }

    pub fn set_rules(&mut self, rules: DesignRules) {
        self.rules = rules;
    }

    pub fn clearance(&self) -> i64 {
        self.rules.clearance
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_ref()
    }

    fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_mut()
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.data(id).is_some()
    }

    pub fn check(&self, id: NodeId) -> Result<()> {
        if self.is_alive(id) {
            Ok(())
        } else {
            Err(RouterError::StaleNode(id))
        }
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).and_then(|d| d.parent)
    }

    /// Distance from the root (root is 0)
    pub fn depth(&self, id: NodeId) -> usize {
        self.data(id).map(|d| d.depth).unwrap_or(0)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.data(id).map(|d| d.children.clone()).unwrap_or_default()
    }

    /// Node ids from `id` up to and including the root
    fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            match self.data(n) {
                Some(d) => {
                    out.push(n);
                    cur = d.parent;
                }
                None => break,
            }
        }
        out
    }

    /// Creates an empty overlay on top of `id`
    pub fn branch(&mut self, id: NodeId) -> NodeId {
        debug_assert!(self.is_alive(id), "branching a released node");
        let depth = self.depth(id) + 1;
        let data = NodeData { parent: Some(id), depth, ..Default::default() };

        let child = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.data = Some(data);
                NodeId { index, generation: slot.generation }
            }
            None => {
                self.slots.push(Slot { generation: 0, data: Some(data) });
                NodeId { index: self.slots.len() as u32 - 1, generation: 0 }
            }
        };

        if let Some(parent) = self.data_mut(id) {
            parent.children.push(child);
        }
        child
    }

    fn free_subtree(&mut self, id: NodeId) {
        let children = self.children(id);
        for c in children {
            self.free_subtree(c);
        }
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation && slot.data.is_some() {
                slot.data = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
            }
        }
    }

    /// Releases every descendant of `id`
    pub fn kill_children(&mut self, id: NodeId) {
        let children = match self.data_mut(id) {
            Some(d) => std::mem::take(&mut d.children),
            None => return,
        };
        for c in children {
            self.free_subtree(c);
        }
    }

    /// Releases `id` and its descendants; the root cannot be released
    pub fn release(&mut self, id: NodeId) {
        if self.is_root(id) || !self.is_alive(id) {
            return;
        }
        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.data_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }
        self.free_subtree(id);
    }

    pub fn alloc_item_id(&mut self) -> ItemId {
        let id = ItemId(self.next_item);
        self.next_item += 1;
        id
    }

    pub fn add(&mut self, node: NodeId, item: Item) -> ItemId {
        let id = self.alloc_item_id();
        self.add_with_id(node, id, item);
        id
    }

    /// Adds `item` under an existing id (used when folding deltas)
    pub fn add_with_id(&mut self, node: NodeId, id: ItemId, item: Item) {
        let Some(d) = self.data_mut(node) else {
            debug_assert!(false, "adding to a released node");
            return;
        };
        d.removed.remove(&id);
        if let Some(old) = d.items.get(&id) {
            let stale = IndexedItem::new(id, old);
            d.index.remove(&stale);
        }
        d.index.insert(IndexedItem::new(id, &item));
        d.items.insert(id, item);
    }

    /// Hides `id` from `node`; returns false when it was not visible there
    pub fn remove(&mut self, node: NodeId, id: ItemId) -> bool {
        if !self.contains(node, id) {
            return false;
        }
        let inherited = self.parent(node).is_some_and(|parent| self.contains(parent, id));
        let Some(d) = self.data_mut(node) else { return false };
        if let Some(item) = d.items.shift_remove(&id) {
            d.index.remove(&IndexedItem::new(id, &item));
        }
        // a copy further up the lineage must stay hidden
        if inherited {
            d.removed.insert(id);
        }
        true
    }

    pub fn replace(&mut self, node: NodeId, old: ItemId, item: Item) -> ItemId {
        self.remove(node, old);
        self.add(node, item)
    }

    /// Looks `id` up through the parent chain
    pub fn get(&self, node: NodeId, id: ItemId) -> Option<&Item> {
        for n in self.lineage(node) {
            let d = self.data(n)?;
            if let Some(item) = d.items.get(&id) {
                return Some(item);
            }
            if d.removed.contains(&id) {
                return None;
            }
        }
        None
    }

    pub fn contains(&self, node: NodeId, id: ItemId) -> bool {
        self.get(node, id).is_some()
    }

    /// Level of the lineage that owns the visible copy of `id`
    pub fn find_owner(&self, node: NodeId, id: ItemId) -> Option<NodeId> {
        for n in self.lineage(node) {
            let d = self.data(n)?;
            if d.items.contains_key(&id) {
                return Some(n);
            }
            if d.removed.contains(&id) {
                return None;
            }
        }
        None
    }

    /// Effective item set, root items first
    pub fn items(&self, node: NodeId) -> Vec<(ItemId, &Item)> {
        let mut shadow: HashSet<ItemId> = HashSet::new();
        let mut levels: Vec<Vec<(ItemId, &Item)>> = Vec::new();
        for n in self.lineage(node) {
            let Some(d) = self.data(n) else { break };
            levels.push(
                d.items
                    .iter()
                    .filter(|(id, _)| !shadow.contains(*id))
                    .map(|(id, item)| (*id, item))
                    .collect(),
            );
            shadow.extend(d.items.keys().copied());
            shadow.extend(d.removed.iter().copied());
        }
        levels.into_iter().rev().flatten().collect()
    }

    pub fn item_count(&self, node: NodeId) -> usize {
        self.items(node).len()
    }

    /// Visible items whose bounding boxes touch `min..max` grown by `margin`
    pub fn query_box(&self, node: NodeId, min: Point, max: Point, margin: i64) -> Vec<(ItemId, &Item)> {
        let env = index::envelope(min, max, margin);
        let mut shadow: HashSet<ItemId> = HashSet::new();
        let mut levels: Vec<Vec<(ItemId, &Item)>> = Vec::new();
        for n in self.lineage(node) {
            let Some(d) = self.data(n) else { break };
            let mut hits: Vec<(ItemId, &Item)> = d
                .index
                .locate_in_envelope_intersecting(&env)
                .filter(|e| !shadow.contains(&e.id))
                .filter_map(|e| d.items.get(&e.id).map(|item| (e.id, item)))
                .collect();
            hits.sort_by_key(|(id, _)| *id);
            levels.push(hits);
            shadow.extend(d.items.keys().copied());
            shadow.extend(d.removed.iter().copied());
        }
        levels.into_iter().rev().flatten().collect()
    }

    /// Changes of `node` relative to the root: (removed root items, added items)
    pub fn updated_items(&self, node: NodeId) -> (Vec<ItemId>, Vec<(ItemId, Item)>) {
        let mut shadow: HashSet<ItemId> = HashSet::new();
        let mut hidden: HashSet<ItemId> = HashSet::new();
        let mut levels: Vec<Vec<(ItemId, Item)>> = Vec::new();
        for n in self.lineage(node) {
            if self.is_root(n) {
                break;
            }
            let Some(d) = self.data(n) else { break };
            levels.push(
                d.items
                    .iter()
                    .filter(|(id, _)| !shadow.contains(*id))
                    .map(|(id, item)| (*id, item.clone()))
                    .collect(),
            );
            shadow.extend(d.items.keys().copied());
            hidden.extend(d.removed.iter().copied());
            shadow.extend(d.removed.iter().copied());
        }
        let added: Vec<(ItemId, Item)> = levels.into_iter().rev().flatten().collect();

        let mut removed: Vec<ItemId> = match self.data(self.root) {
            Some(root) => hidden.into_iter().filter(|id| root.items.contains_key(id)).collect(),
            None => Vec::new(),
        };
        removed.sort();
        (removed, added)
    }

    /// Folds `child` into its parent and releases all of the parent's children
    pub fn commit(&mut self, child: NodeId) -> bool {
        let Some(parent) = self.parent(child) else {
            return false;
        };
        let (items, removed) = match self.data_mut(child) {
            Some(d) => (std::mem::take(&mut d.items), std::mem::take(&mut d.removed)),
            None => return false,
        };
        for id in removed {
            self.remove(parent, id);
        }
        for (id, item) in items {
            self.add_with_id(parent, id, item);
        }
        self.kill_children(parent);
        true
    }

    /// Applies the changes of `node` to the root and drops every overlay
    pub fn commit_to_root(&mut self, node: NodeId) -> (Vec<ItemId>, Vec<(ItemId, Item)>) {
        let (removed, added) = self.updated_items(node);
        let root = self.root;
        for id in &removed {
            self.remove(root, *id);
        }
        for (id, item) in &added {
            self.add_with_id(root, *id, item.clone());
        }
        self.kill_children(root);
        (removed, added)
    }

    /// Number of live nodes including the root
    pub fn live_nodes(&self) -> usize {
        self.slots.iter().filter(|s| s.data.is_some()).count()
    }
}
