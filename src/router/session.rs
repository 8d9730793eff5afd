//! One board plus the placer working on it
//!
//! `RoutingSession` is the owner the outside world talks to: it holds the
//! node arena, the active settings and at most one placement gesture, and
//! hands the placer a fresh [`RouterContext`] for every call.

use super::context::{NullIface, RouterContext, RouterIface};
use super::debug::{DebugSink, TracingDebugSink};
use super::error::{Result, RouterError};
use super::item::{Item, ItemId, ItemKind, NetCode};
use super::line::Line;
use super::node::{NodeArena, NodeId};
use super::placer::LinePlacer;
use super::settings::{RoutingSettings, SizesSettings};
use crate::geometry::Point;
use tracing::{debug, info};

pub struct RoutingSession {
    arena: NodeArena,
    settings: RoutingSettings,
    sizes: SizesSettings,
    layer: i32,
    placer: Option<LinePlacer>,
    iface: Box<dyn RouterIface>,
    debug: Box<dyn DebugSink>,
}

/// Runs `$body` with the active placer and a context built from disjoint
/// session fields
macro_rules! with_placer {
    ($session:expr, $placer:ident, $arena:ident, $ctx:ident => $body:expr) => {{
        let world = $session.arena.root();
        match $session.placer.as_mut() {
            Some($placer) => {
                let $ctx =
                    RouterContext::new(&$session.settings, world, $session.iface.as_ref(), $session.debug.as_ref());
                let $arena = &mut $session.arena;
                Some($body)
            }
            None => None,
        }
    }};
}

impl RoutingSession {
    /// Session over an already populated arena
    pub fn new(arena: NodeArena, settings: RoutingSettings, sizes: SizesSettings) -> Self {
        Self {
            arena,
            settings,
            sizes,
            layer: 0,
            placer: None,
            iface: Box::new(NullIface),
            debug: Box::new(TracingDebugSink),
        }
    }

    pub fn with_iface(mut self, iface: Box<dyn RouterIface>) -> Self {
        self.iface = iface;
        self
    }

    pub fn with_debug_sink(mut self, debug: Box<dyn DebugSink>) -> Self {
        self.debug = debug;
        self
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn world(&self) -> NodeId {
        self.arena.root()
    }

    pub fn settings(&self) -> &RoutingSettings {
        &self.settings
    }

    /// Replaces the settings after validating them; clearance changes reach
    /// the arena immediately, everything else the next move
    pub fn set_settings(&mut self, settings: RoutingSettings) -> Result<()> {
        settings.validate()?;
        self.arena.set_rules(settings.rules());
        self.settings = settings;
        Ok(())
    }

    pub fn sizes(&self) -> &SizesSettings {
        &self.sizes
    }

    pub fn update_sizes(&mut self, sizes: SizesSettings) -> Result<()> {
        if sizes.track_width <= 0 {
            return Err(RouterError::InvalidSetting {
                key: "track_width".into(),
                reason: "must be positive".into(),
            });
        }
        if sizes.via_drill >= sizes.via_diameter {
            return Err(RouterError::InvalidSetting {
                key: "via_drill".into(),
                reason: "must be smaller than the via diameter".into(),
            });
        }
        if let Some(placer) = self.placer.as_mut() {
            placer.update_sizes(sizes.clone());
        }
        self.sizes = sizes;
        Ok(())
    }

    pub fn layer(&self) -> i32 {
        self.placer.as_ref().map_or(self.layer, |p| p.current_layer())
    }

    pub fn is_routing(&self) -> bool {
        self.placer.as_ref().is_some_and(|p| !p.is_idle())
    }

    pub fn placer(&self) -> Option<&LinePlacer> {
        self.placer.as_ref()
    }

    /// Item under `p` on `layer` to start or end a route on
    ///
    /// Pads and vias win over tracks. With `net` given, only items of that
    /// net qualify.
    pub fn pick_item(&self, p: Point, layer: i32, net: Option<NetCode>) -> Option<ItemId> {
        let node = self.placer.as_ref().and_then(|pl| pl.current_node(false)).unwrap_or(self.arena.root());
        self.arena
            .hit_test(node, p, layer)
            .into_iter()
            .filter_map(|id| self.arena.get(node, id).map(|item| (id, item)))
            .filter(|(_, item)| net.map_or(true, |n| item.net() == n))
            .min_by_key(|(id, item)| (pick_priority(item), *id))
            .map(|(id, _)| id)
    }

    /// Starts a new gesture at `p`; refused while one is in progress
    pub fn start_routing(&mut self, p: Point, start_item: Option<ItemId>) -> Result<bool> {
        if self.is_routing() {
            return Ok(false);
        }
        if let Some(id) = start_item {
            if !self.arena.contains(self.arena.root(), id) {
                return Err(RouterError::UnknownItem(id));
            }
        }

        let mut placer = LinePlacer::new(self.sizes.clone());
        let world = self.arena.root();
        let ctx = RouterContext::new(&self.settings, world, self.iface.as_ref(), self.debug.as_ref());
        placer.set_layer(&mut self.arena, &ctx, self.layer);
        let started = placer.start(&mut self.arena, &ctx, p, start_item);
        info!(target: "pns", "[Router] start routing at ({}, {}) on layer {}: {}", p.x, p.y, self.layer, started);
        self.placer = Some(placer);
        Ok(started)
    }

    /// Moves the cursor; true if the trace reaches `p`
    pub fn move_to(&mut self, p: Point, end_item: Option<ItemId>) -> bool {
        with_placer!(self, placer, arena, ctx => placer.move_to(arena, &ctx, p, end_item)).unwrap_or(false)
    }

    /// Fixes the trace at `p`; a finished route is committed to the board
    pub fn fix_route(&mut self, p: Point, end_item: Option<ItemId>, force_finish: bool) -> bool {
        let fixed = with_placer!(self, placer, arena, ctx => placer.fix_route(arena, &ctx, p, end_item, force_finish))
            .unwrap_or(false);
        if self.placer.as_ref().is_some_and(|pl| pl.is_idle()) {
            self.finish(true);
        }
        fixed
    }

    pub fn unfix_route(&mut self) -> bool {
        with_placer!(self, placer, arena, ctx => placer.unfix_route(arena, &ctx)).unwrap_or(false)
    }

    /// Commits everything fixed so far and ends the gesture
    pub fn stop_routing(&mut self) -> bool {
        self.finish(true)
    }

    /// Drops every uncommitted change of the gesture
    pub fn abort_routing(&mut self) {
        self.finish(false);
    }

    fn finish(&mut self, commit: bool) -> bool {
        let result = with_placer!(self, placer, arena, ctx => {
            if commit {
                placer.commit_placement(arena, &ctx)
            } else {
                placer.abort_placement(arena, &ctx);
                false
            }
        });
        if let Some(placer) = self.placer.take() {
            self.layer = placer.current_layer();
        }
        debug!(target: "pns", "[Router] gesture ended (commit {}), {} live nodes", commit, self.arena.live_nodes());
        result.unwrap_or(false)
    }

    pub fn set_layer(&mut self, layer: i32) -> bool {
        match with_placer!(self, placer, arena, ctx => placer.set_layer(arena, &ctx, layer)) {
            Some(switched) => switched,
            None => {
                self.layer = layer;
                true
            }
        }
    }

    /// Arms or disarms a via and reroutes to the current end
    pub fn toggle_via(&mut self, enabled: bool) -> bool {
        with_placer!(self, placer, arena, ctx => {
            let end = placer.current_end();
            placer.toggle_via(enabled);
            placer.move_to(arena, &ctx, end, None);
            true
        })
        .unwrap_or(false)
    }

    pub fn flip_posture(&mut self) -> bool {
        with_placer!(self, placer, arena, ctx => {
            let end = placer.current_end();
            placer.flip_posture();
            placer.move_to(arena, &ctx, end, None);
            true
        })
        .unwrap_or(false)
    }

    /// Trace of the gesture in progress
    pub fn trace(&self) -> Option<Line> {
        self.placer.as_ref().filter(|p| !p.is_idle()).map(|p| p.trace())
    }

    /// Items of the committed board
    pub fn items(&self) -> Vec<(ItemId, &Item)> {
        self.arena.items(self.arena.root())
    }
}

fn pick_priority(item: &Item) -> u8 {
    match item.kind() {
        ItemKind::Solid => 0,
        ItemKind::Via => 1,
        ItemKind::Segment | ItemKind::Arc => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::context::RecordingIface;
    use crate::router::item::{LayerRange, Solid, SolidShape};
    use crate::router::settings::{DesignRules, RouterMode};
    use std::rc::Rc;

    fn board() -> (NodeArena, ItemId, ItemId) {
        let mut arena = NodeArena::new(DesignRules { clearance: 100 });
        let root = arena.root();
        let mut pad = |x: i64, net: NetCode| {
            arena.add(
                root,
                Item::Solid(Solid {
                    shape: SolidShape::Circle { center: Point::new(x, 0), radius: 300 },
                    layers: LayerRange::new(0, 31),
                    net,
                    anchor: Point::new(x, 0),
                }),
            )
        };
        let a = pad(0, 1);
        let b = pad(10_000, 1);
        (arena, a, b)
    }

    fn session(arena: NodeArena) -> RoutingSession {
        let settings = RoutingSettings { mode: RouterMode::Walkaround, clearance: 100, ..Default::default() };
        let sizes = SizesSettings { track_width: 200, via_diameter: 400, via_drill: 200, ..Default::default() };
        RoutingSession::new(arena, settings, sizes)
    }

    #[test]
    fn test_pick_prefers_pads_and_filters_net() {
        let (arena, a, _) = board();
        let s = session(arena);
        assert_eq!(s.pick_item(Point::new(100, 0), 0, None), Some(a));
        assert_eq!(s.pick_item(Point::new(100, 0), 0, Some(2)), None);
        assert_eq!(s.pick_item(Point::new(5000, 5000), 0, None), None);
    }

    #[test]
    fn test_route_pad_to_pad_commits() {
        let (arena, a, b) = board();
        let iface = Rc::new(RecordingIface::default());
        let mut s = session(arena).with_iface(Box::new(Rc::clone(&iface)));
        let before = s.items().len();

        assert_eq!(s.start_routing(Point::new(0, 0), Some(a)).ok(), Some(true));
        assert!(s.is_routing());
        s.move_to(Point::new(10_000, 0), Some(b));
        assert!(s.fix_route(Point::new(10_000, 0), Some(b), false));

        assert!(!s.is_routing());
        assert!(s.trace().is_none());
        assert_eq!(*iface.commits.borrow(), 1);
        assert!(s.items().len() > before);
        assert_eq!(s.arena().live_nodes(), 1);
    }

    #[test]
    fn test_abort_leaves_board_untouched() {
        let (arena, a, _) = board();
        let mut s = session(arena);
        let before = s.items().len();
        assert_eq!(s.start_routing(Point::new(0, 0), Some(a)).ok(), Some(true));
        s.move_to(Point::new(4000, 3000), None);
        s.abort_routing();
        assert_eq!(s.items().len(), before);
        assert_eq!(s.arena().live_nodes(), 1);
        assert!(!s.is_routing());
    }

    #[test]
    fn test_second_start_is_refused() {
        let (arena, a, _) = board();
        let mut s = session(arena);
        assert_eq!(s.start_routing(Point::new(0, 0), Some(a)).ok(), Some(true));
        assert_eq!(s.start_routing(Point::new(0, 0), Some(a)).ok(), Some(false));
    }

    #[test]
    fn test_unknown_start_item_is_an_error() {
        let (arena, _, _) = board();
        let mut s = session(arena);
        assert!(matches!(s.start_routing(Point::new(0, 0), Some(ItemId(999))), Err(RouterError::UnknownItem(_))));
    }

    #[test]
    fn test_layer_survives_between_gestures() {
        let (arena, _, _) = board();
        let mut s = session(arena);
        assert!(s.set_layer(3));
        assert_eq!(s.start_routing(Point::new(3000, 3000), None).ok(), Some(true));
        assert_eq!(s.layer(), 3);
        s.abort_routing();
        assert_eq!(s.layer(), 3);
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        let (arena, _, _) = board();
        let mut s = session(arena);
        let bad = SizesSettings { via_drill: 500, via_diameter: 400, ..s.sizes().clone() };
        assert!(s.update_sizes(bad).is_err());
    }
}
