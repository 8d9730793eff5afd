//! What every placer operation gets handed: settings, the world node, the
//! editor-side interface and a debug sink

use super::debug::DebugSink;
use super::item::{Item, ItemId, NetCode};
use super::node::{NodeArena, NodeId};
use super::settings::RoutingSettings;
use crate::geometry::PointChain;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Callbacks into the editor that hosts the router
pub trait RouterIface {
    fn display_ratline(&self, _ratline: &PointChain, _net: NetCode) {}
    fn item_added(&self, _id: ItemId, _item: &Item) {}
    fn item_removed(&self, _id: ItemId) {}
    /// Called once after a batch of added/removed notifications
    fn commit(&self) {}
}

impl<T: RouterIface + ?Sized> RouterIface for Rc<T> {
    fn display_ratline(&self, ratline: &PointChain, net: NetCode) {
        (**self).display_ratline(ratline, net);
    }

    fn item_added(&self, id: ItemId, item: &Item) {
        (**self).item_added(id, item);
    }

    fn item_removed(&self, id: ItemId) {
        (**self).item_removed(id);
    }

    fn commit(&self) {
        (**self).commit();
    }
}

#[derive(Debug, Default)]
pub struct NullIface;

impl RouterIface for NullIface {}

/// Remembers everything it is told
#[derive(Debug, Default)]
pub struct RecordingIface {
    pub ratlines: RefCell<Vec<(PointChain, NetCode)>>,
    pub added: RefCell<Vec<ItemId>>,
    pub removed: RefCell<Vec<ItemId>>,
    pub commits: RefCell<usize>,
}

impl RecordingIface {
    pub fn last_ratline(&self) -> Option<PointChain> {
        self.ratlines.borrow().last().map(|(c, _)| c.clone())
    }

    /// Empties every log
    pub fn clear(&self) {
        self.ratlines.borrow_mut().clear();
        self.added.borrow_mut().clear();
        self.removed.borrow_mut().clear();
        *self.commits.borrow_mut() = 0;
    }
}

impl RouterIface for RecordingIface {
    fn display_ratline(&self, ratline: &PointChain, net: NetCode) {
        self.ratlines.borrow_mut().push((ratline.clone(), net));
    }

    fn item_added(&self, id: ItemId, _item: &Item) {
        self.added.borrow_mut().push(id);
    }

    fn item_removed(&self, id: ItemId) {
        self.removed.borrow_mut().push(id);
    }

    fn commit(&self) {
        *self.commits.borrow_mut() += 1;
    }
}

/// Read-only view handed to placer operations
#[derive(Clone, Copy)]
pub struct RouterContext<'a> {
    pub settings: &'a RoutingSettings,
    pub world: NodeId,
    pub iface: &'a dyn RouterIface,
    pub debug: &'a dyn DebugSink,
}

impl<'a> RouterContext<'a> {
    pub fn new(
        settings: &'a RoutingSettings,
        world: NodeId,
        iface: &'a dyn RouterIface,
        debug: &'a dyn DebugSink,
    ) -> Self {
        Self { settings, world, iface, debug }
    }
}

/// Folds `node` and its ancestors into the world and tells the editor what changed
pub fn commit_routing(arena: &mut NodeArena, node: NodeId, iface: &dyn RouterIface) -> bool {
    if !arena.is_alive(node) {
        return false;
    }
    let (removed, added) = arena.commit_to_root(node);
    debug!(target: "pns", "[Router] commit: {} removed, {} added", removed.len(), added.len());
    for id in &removed {
        iface.item_removed(*id);
    }
    for (id, item) in &added {
        iface.item_added(*id, item);
    }
    iface.commit();
    true
}
