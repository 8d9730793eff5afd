use super::*;
use crate::geometry::PointChain;
use crate::router::context::RecordingIface;
use crate::router::debug::NullDebugSink;
use crate::router::item::{KindMask, Solid, SolidShape};
use crate::router::settings::{DesignRules, RoutingSettings};

fn sizes() -> SizesSettings {
    SizesSettings { track_width: 200, via_diameter: 400, via_drill: 200, ..Default::default() }
}

fn settings(mode: RouterMode) -> RoutingSettings {
    RoutingSettings { mode, clearance: 100, ..Default::default() }
}

fn arena() -> NodeArena {
    NodeArena::new(DesignRules { clearance: 100 })
}

fn pad(arena: &mut NodeArena, x: i64, y: i64, r: i64, net: NetCode) -> ItemId {
    let root = arena.root();
    arena.add(
        root,
        Item::Solid(Solid {
            shape: SolidShape::Circle { center: Point::new(x, y), radius: r },
            layers: LayerRange::new(0, 31),
            net,
            anchor: Point::new(x, y),
        }),
    )
}

fn chain(points: &[(i64, i64)]) -> PointChain {
    PointChain::from_points(points.iter().map(|&(x, y)| Point::new(x, y)))
}

#[test]
fn test_move_builds_straight_then_diagonal_head() {
    let mut arena = arena();
    let s = settings(RouterMode::MarkObstacles);
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    assert!(placer.start(&mut arena, &ctx, Point::new(0, 0), None));
    assert!(placer.move_to(&mut arena, &ctx, Point::new(10_000, 4000), None));

    let trace = placer.trace();
    assert_eq!(trace.point_count(), 3);
    assert_eq!(trace.point(0), Point::new(0, 0));
    assert_eq!(trace.point(1), Point::new(6000, 0));
    assert_eq!(trace.point(-1), Point::new(10_000, 4000));
    assert_eq!(placer.current_end(), Point::new(10_000, 4000));
}

#[test]
fn test_fix_then_unfix_restores_start() {
    let mut arena = arena();
    let s = settings(RouterMode::MarkObstacles);
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(0, 0), None);
    let before = (placer.current_start(), placer.direction(), placer.current_layer(), placer.is_placing_via());

    placer.move_to(&mut arena, &ctx, Point::new(10_000, 4000), None);
    assert!(!placer.fix_route(&mut arena, &ctx, Point::new(10_000, 4000), None, false));
    assert!(placer.has_placed_anything());
    assert!(placer.is_chained());
    assert_eq!(placer.fixed_tail().stage_count(), 2);
    // the last segment stays floating
    assert_eq!(placer.current_start(), Point::new(6000, 0));
    let fixed_node = placer.current_node(false).expect("node");
    let fixed_segments = arena.items(fixed_node).iter().filter(|(_, i)| i.kind() == ItemKind::Segment).count();
    assert_eq!(fixed_segments, 1);

    assert!(placer.unfix_route(&mut arena, &ctx));
    let after = (placer.current_start(), placer.direction(), placer.current_layer(), placer.is_placing_via());
    assert_eq!(before, after);
    let node = placer.current_node(false).expect("node");
    assert_eq!(arena.items(node).len(), 0);
    assert!(!arena.is_alive(fixed_node));

    assert!(!placer.unfix_route(&mut arena, &ctx));
}

#[test]
fn test_real_end_finishes_and_commits() {
    let mut arena = arena();
    let start_pad = pad(&mut arena, 0, 0, 300, 1);
    let end_pad = pad(&mut arena, 10_000, 0, 300, 1);
    let s = settings(RouterMode::MarkObstacles);
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(0, 0), Some(start_pad));
    assert_eq!(placer.current_net(), 1);
    assert!(placer.move_to(&mut arena, &ctx, Point::new(10_000, 0), Some(end_pad)));

    assert!(placer.fix_route(&mut arena, &ctx, Point::new(10_000, 0), Some(end_pad), false));
    assert!(placer.is_idle());

    assert!(placer.commit_placement(&mut arena, &ctx));
    assert_eq!(iface.added.borrow().len(), 1);
    assert_eq!(*iface.commits.borrow(), 1);
    assert_eq!(arena.item_count(arena.root()), 3);
    assert_eq!(arena.live_nodes(), 1);
}

#[test]
fn test_fix_on_netless_pad_adopts_net_and_finishes() {
    let mut arena = arena();
    let start_pad = pad(&mut arena, 0, 0, 300, 1);
    let end_pad = pad(&mut arena, 10_000, 0, 300, NO_NET);
    let s = settings(RouterMode::MarkObstacles);
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(0, 0), Some(start_pad));
    placer.move_to(&mut arena, &ctx, Point::new(10_000, 0), Some(end_pad));

    assert!(placer.fix_route(&mut arena, &ctx, Point::new(10_000, 0), Some(end_pad), false));
    assert!(placer.is_idle());

    assert!(placer.commit_placement(&mut arena, &ctx));
    assert_eq!(arena.get(arena.root(), end_pad).map(|i| i.net()), Some(1));
    assert_eq!(arena.item_count(arena.root()), 3);
}

#[test]
fn test_walkaround_goes_around_pad() {
    let mut arena = arena();
    pad(&mut arena, 5000, 0, 1000, 7);
    let s = settings(RouterMode::Walkaround);
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(0, 0), None);
    placer.move_to(&mut arena, &ctx, Point::new(10_000, 0), None);

    let trace = placer.trace();
    assert_eq!(trace.point(0), Point::new(0, 0));
    assert_eq!(trace.point(-1), Point::new(10_000, 0));
    assert!(trace.point_count() > 2);
    let node = placer.current_node(false).expect("node");
    assert!(arena.check_colliding(node, &trace, KindMask::ANY).is_none());
}

#[test]
fn test_abort_releases_speculative_nodes() {
    let mut arena = arena();
    let s = settings(RouterMode::Shove);
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(0, 0), None);
    placer.move_to(&mut arena, &ctx, Point::new(3000, 3000), None);
    assert!(arena.live_nodes() > 1);

    placer.abort_placement(&mut arena, &ctx);
    assert!(placer.is_idle());
    assert_eq!(arena.live_nodes(), 1);
    assert_eq!(arena.item_count(arena.root()), 0);
}

#[test]
fn test_layer_change_refused_while_chained() {
    let mut arena = arena();
    let s = settings(RouterMode::MarkObstacles);
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    assert!(placer.set_layer(&mut arena, &ctx, 2));
    placer.start(&mut arena, &ctx, Point::new(0, 0), None);
    assert_eq!(placer.current_layer(), 2);
    assert!(placer.set_layer(&mut arena, &ctx, 1));

    placer.move_to(&mut arena, &ctx, Point::new(5000, 2000), None);
    placer.fix_route(&mut arena, &ctx, Point::new(5000, 2000), None, false);
    assert!(!placer.set_layer(&mut arena, &ctx, 0));
    assert_eq!(placer.current_layer(), 1);
}

#[test]
fn test_split_segment_in_the_middle_only() {
    let mut arena = arena();
    let root = arena.root();
    let id = arena.add(
        root,
        Item::Segment(Segment::new(Seg::new(Point::new(0, 0), Point::new(1000, 0)), 200, 1, 0)),
    );
    assert!(!LinePlacer::split_adjacent_segments(&mut arena, root, Some(id), Point::new(1000, 0)));
    assert!(!LinePlacer::split_adjacent_segments(&mut arena, root, Some(id), Point::new(500, 10)));
    assert!(LinePlacer::split_adjacent_segments(&mut arena, root, Some(id), Point::new(500, 0)));
    assert_eq!(arena.item_count(root), 2);
    assert!(!arena.contains(root, id));
}

fn started(arena: &mut NodeArena, s: &RoutingSettings) -> LinePlacer {
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(s, arena.root(), &iface, &dbg);
    let mut placer = LinePlacer::new(sizes());
    placer.start(arena, &ctx, Point::new(0, 0), None);
    placer
}

#[test]
fn test_merge_head_into_tail() {
    let mut arena = arena();
    let mut placer = started(&mut arena, &settings(RouterMode::MarkObstacles));
    placer.tail.set_shape(chain(&[(0, 0), (1000, 0)]));
    placer.head.set_shape(chain(&[(1000, 0), (2000, 0), (3000, 1000), (4000, 1000)]));

    assert!(placer.merge_head());
    assert_eq!(placer.head.point_count(), 0);
    assert_eq!(placer.tail.point(-1), Point::new(4000, 1000));
    assert_eq!(placer.p_start, Point::new(4000, 1000));
    assert_eq!(placer.direction, Direction45::E);
}

#[test]
fn test_merge_refused_when_head_detached() {
    let mut arena = arena();
    let mut placer = started(&mut arena, &settings(RouterMode::MarkObstacles));
    placer.tail.set_shape(chain(&[(0, 0), (1000, 0)]));
    placer.head.set_shape(chain(&[(1500, 0), (2000, 0), (3000, 1000), (4000, 1000)]));
    assert!(!placer.merge_head());
    assert_eq!(placer.head.point_count(), 4);
}

#[test]
fn test_pullback_on_right_angle() {
    let mut arena = arena();
    let mut placer = started(&mut arena, &settings(RouterMode::MarkObstacles));
    placer.tail.set_shape(chain(&[(0, 0), (1000, 0)]));
    placer.head.set_shape(chain(&[(1000, 0), (1000, 1000)]));
    placer.direction = Direction45::E;

    assert!(placer.handle_pullback());
    assert_eq!(placer.p_start, Point::new(0, 0));
    assert_eq!(placer.tail.point_count(), 0);
    assert_eq!(placer.direction, placer.initial_direction);
}

#[test]
fn test_self_intersection_resets_to_start() {
    let mut arena = arena();
    let mut placer = started(&mut arena, &settings(RouterMode::MarkObstacles));
    placer.tail.set_shape(chain(&[(0, 0), (2000, 0), (2000, 2000)]));
    placer.head.set_shape(chain(&[(2000, 2000), (1000, 1000), (1000, -1000)]));

    assert!(placer.handle_self_intersections());
    assert_eq!(placer.p_start, Point::new(0, 0));
    assert_eq!(placer.tail.point_count(), 0);
    assert_eq!(placer.head.point_count(), 0);
}

#[test]
fn test_reduce_tail_keeps_earliest_direction() {
    let mut arena = arena();
    let mut placer = started(&mut arena, &settings(RouterMode::MarkObstacles));
    placer.tail.set_shape(chain(&[(0, 0), (1000, 0), (1000, 1000)]));
    placer.head.set_shape(chain(&[(1000, 1000), (2000, 1000)]));

    assert!(placer.reduce_tail(&arena, Point::new(3000, 0)));
    assert_eq!(placer.tail.point_count(), 1);
    assert_eq!(placer.p_start, Point::new(0, 0));
    assert_eq!(placer.direction, Direction45::E);
    assert_eq!(placer.head.point_count(), 0);
}

#[test]
fn test_toggle_via_and_sizes() {
    let mut arena = arena();
    let s = settings(RouterMode::MarkObstacles);
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(0, 0), None);
    placer.toggle_via(true);
    placer.move_to(&mut arena, &ctx, Point::new(4000, 0), None);
    let via = placer.head().via.clone().expect("via");
    assert_eq!(via.pos, Point::new(4000, 0));
    assert_eq!(via.layers, LayerRange::new(0, 31));

    placer.update_sizes(SizesSettings { via_diameter: 600, track_width: 300, ..sizes() });
    assert_eq!(placer.head().via.as_ref().map(|v| v.diameter), Some(600));
    assert_eq!(placer.head().width, 300);

    placer.toggle_via(false);
    assert!(placer.head().via.is_none());
    assert_eq!(placer.modified_nets(), vec![NO_NET]);
}

#[test]
fn test_flip_posture_leaves_direction_alone() {
    let mut arena = arena();
    let mut placer = started(&mut arena, &settings(RouterMode::MarkObstacles));
    let (direction, initial) = (placer.direction, placer.initial_direction);

    placer.flip_posture();
    assert_eq!(placer.direction, direction);
    assert_eq!(placer.initial_direction, initial);
}

#[test]
fn test_mark_obstacles_drops_blocking_obstacle() {
    let mut arena = arena();
    let blocker = pad(&mut arena, 2000, 0, 500, 7);
    let s = settings(RouterMode::MarkObstacles);
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(0, 0), None);
    placer.head.blocking_obstacle = Some(blocker);

    assert!(placer.move_to(&mut arena, &ctx, Point::new(4000, 0), None));
    assert_eq!(placer.head().point(-1), Point::new(4000, 0));
    assert_eq!(placer.head().blocking_obstacle, None);
}
