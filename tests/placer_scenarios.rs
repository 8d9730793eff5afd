// End-to-end placement scenarios driven through the public API
use std::rc::Rc;
use trace_router::geometry::{Point, Seg};
use trace_router::router::direction::chain_fits_posture;
use trace_router::router::{
    CornerMode, Item, ItemId, ItemKind, KindMask, LayerRange, LinePlacer, NodeArena, NullDebugSink, RecordingIface,
    RouterContext, RouterMode, RoutingSession, RoutingSettings, Segment, SizesSettings, Solid, SolidShape,
};

const CLEARANCE: i64 = 100;

fn sizes() -> SizesSettings {
    SizesSettings { track_width: 200, via_diameter: 400, via_drill: 200, ..Default::default() }
}

fn settings(mode: RouterMode) -> RoutingSettings {
    RoutingSettings { mode, clearance: CLEARANCE, ..Default::default() }
}

fn add_pad(arena: &mut NodeArena, x: i64, y: i64, r: i64, net: i32) -> ItemId {
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

fn new_arena() -> NodeArena {
    NodeArena::new(settings(RouterMode::Walkaround).rules())
}

#[test]
fn test_mitered_90_route_has_two_orthogonal_segments() {
    let mut arena = new_arena();
    let s = RoutingSettings { corner_mode: CornerMode::Mitered90, ..settings(RouterMode::MarkObstacles) };
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    assert!(placer.start(&mut arena, &ctx, Point::new(0, 0), None));
    assert!(placer.move_to(&mut arena, &ctx, Point::new(10_000, 4000), None));

    let trace = placer.trace();
    assert_eq!(trace.point_count(), 3);
    assert_eq!(trace.point(0), Point::new(0, 0));
    assert_eq!(trace.point(-1), Point::new(10_000, 4000));
    assert!(chain_fits_posture(&trace.chain, true));
}

#[test]
fn test_walkaround_detours_around_foreign_pad() {
    let mut arena = new_arena();
    add_pad(&mut arena, 5000, 0, 1000, 7);
    let s = settings(RouterMode::Walkaround);
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(0, 0), None);
    placer.move_to(&mut arena, &ctx, Point::new(10_000, 0), None);

    let trace = placer.trace();
    assert_eq!(trace.point(0), Point::new(0, 0));
    assert_eq!(trace.point(-1), Point::new(10_000, 0));
    assert!(arena.check_colliding(arena.root(), &trace, KindMask::ANY).is_none());
    assert!(chain_fits_posture(&trace.chain, false));
}

#[test]
fn test_mark_obstacles_goes_straight_through() {
    let mut arena = new_arena();
    add_pad(&mut arena, 5000, 0, 1000, 7);
    let s = RoutingSettings { allow_drc_violations: true, ..settings(RouterMode::MarkObstacles) };
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(0, 0), None);
    assert!(placer.move_to(&mut arena, &ctx, Point::new(10_000, 0), None));

    let trace = placer.trace();
    assert_eq!(trace.point_count(), 2);
    assert!(arena.check_colliding(arena.root(), &trace, KindMask::ANY).is_some());
}

#[test]
fn test_pad_to_pad_session_commits_one_segment() {
    let mut arena = new_arena();
    let a = add_pad(&mut arena, 0, 0, 300, 1);
    let b = add_pad(&mut arena, 10_000, 0, 300, 1);
    let iface = Rc::new(RecordingIface::default());
    let mut session = RoutingSession::new(arena, settings(RouterMode::MarkObstacles), sizes())
        .with_iface(Box::new(Rc::clone(&iface)));

    assert!(session.start_routing(Point::new(0, 0), Some(a)).unwrap());
    assert!(session.move_to(Point::new(10_000, 0), Some(b)));
    assert!(session.fix_route(Point::new(10_000, 0), Some(b), false));
    assert!(!session.is_routing());

    let segments: Vec<_> = session.items().into_iter().filter(|(_, i)| i.kind() == ItemKind::Segment).collect();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].1.net(), 1);
    assert_eq!(iface.added.borrow().len(), 1);
    assert_eq!(*iface.commits.borrow(), 1);
}

#[test]
fn test_fix_then_unfix_round_trip() {
    let mut arena = new_arena();
    let s = settings(RouterMode::MarkObstacles);
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(0, 0), None);
    let before = (placer.current_start(), placer.direction(), placer.current_layer(), placer.is_placing_via());

    placer.move_to(&mut arena, &ctx, Point::new(10_000, 4000), None);
    assert!(!placer.fix_route(&mut arena, &ctx, Point::new(10_000, 4000), None, false));
    assert_eq!(placer.fixed_tail().stage_count(), 2);

    assert!(placer.unfix_route(&mut arena, &ctx));
    let after = (placer.current_start(), placer.direction(), placer.current_layer(), placer.is_placing_via());
    assert_eq!(before, after);
    assert_eq!(placer.fixed_tail().stage_count(), 1);
    assert!(!placer.unfix_route(&mut arena, &ctx));
}

#[test]
fn test_forced_finish_commits_unterminated_trace() {
    let arena = new_arena();
    let mut session = RoutingSession::new(arena, settings(RouterMode::MarkObstacles), sizes());

    assert!(session.start_routing(Point::new(0, 0), None).unwrap());
    session.move_to(Point::new(5000, 0), None);
    assert!(session.fix_route(Point::new(5000, 0), None, true));
    assert!(!session.is_routing());
    assert_eq!(session.items().len(), 1);
}

#[test]
fn test_route_starting_mid_track_splits_it() {
    let mut arena = new_arena();
    let root = arena.root();
    let track = arena.add(
        root,
        Item::Segment(Segment::new(Seg::new(Point::new(0, 0), Point::new(10_000, 0)), 300, 4, 0)),
    );
    let mut session = RoutingSession::new(arena, settings(RouterMode::MarkObstacles), sizes());

    assert!(session.start_routing(Point::new(5000, 0), Some(track)).unwrap());
    assert_eq!(session.placer().map(|p| p.current_net()), Some(4));
    // the start track keeps its width
    assert_eq!(session.trace().map(|t| t.width), Some(300));

    session.move_to(Point::new(5000, 3000), None);
    assert!(session.fix_route(Point::new(5000, 3000), None, true));

    let segments = session.items().into_iter().filter(|(_, i)| i.kind() == ItemKind::Segment).count();
    // two halves of the split track plus the new stub
    assert_eq!(segments, 3);
    assert!(!session.arena().contains(session.world(), track));
}

#[test]
fn test_abort_in_every_mode_leaves_world_untouched() {
    for mode in [RouterMode::MarkObstacles, RouterMode::Walkaround, RouterMode::Shove] {
        let mut arena = new_arena();
        add_pad(&mut arena, 5000, 2000, 500, 9);
        let mut session = RoutingSession::new(arena, settings(mode), sizes());

        session.start_routing(Point::new(0, 0), None).unwrap();
        session.move_to(Point::new(8000, 3000), None);
        session.abort_routing();

        assert_eq!(session.items().len(), 1, "{:?}", mode);
        assert_eq!(session.arena().live_nodes(), 1, "{:?}", mode);
    }
}

#[test]
fn test_walkaround_move_reports_reaching_cursor() {
    let mut arena = new_arena();
    add_pad(&mut arena, 5000, 5000, 1500, 7);
    let s = settings(RouterMode::Walkaround);
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);
    let cursor = Point::new(10_000, 10_000);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(0, 0), None);
    let reached = placer.move_to(&mut arena, &ctx, cursor, None);

    let trace = placer.trace();
    assert_eq!(trace.point(-1), cursor);
    assert!(reached);
    assert_eq!(placer.current_end(), cursor);
    assert!(arena.check_colliding(arena.root(), &trace, KindMask::ANY).is_none());
}

fn add_track(arena: &mut NodeArena, a: (i64, i64), b: (i64, i64), net: i32) -> ItemId {
    let root = arena.root();
    let seg = Seg::new(Point::new(a.0, a.1), Point::new(b.0, b.1));
    arena.add(root, Item::Segment(Segment::new(seg, 200, net, 0)))
}

fn route_over_detour(remove_loops: bool) -> (NodeArena, Vec<ItemId>) {
    let mut arena = new_arena();
    let a = add_pad(&mut arena, 0, 0, 300, 1);
    let b = add_pad(&mut arena, 10_000, 0, 300, 1);
    let detour = vec![
        add_track(&mut arena, (0, 0), (0, 3000), 1),
        add_track(&mut arena, (0, 3000), (10_000, 3000), 1),
        add_track(&mut arena, (10_000, 3000), (10_000, 0), 1),
    ];

    let s = RoutingSettings { remove_loops, ..settings(RouterMode::MarkObstacles) };
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(0, 0), Some(a));
    assert!(placer.move_to(&mut arena, &ctx, Point::new(10_000, 0), Some(b)));

    let preview = placer.current_node(true).expect("preview node");
    let visible = detour.iter().filter(|id| arena.contains(preview, **id)).count();
    assert_eq!(visible, if remove_loops { 0 } else { 3 });

    assert!(placer.fix_route(&mut arena, &ctx, Point::new(10_000, 0), Some(b), false));
    assert!(placer.commit_placement(&mut arena, &ctx));
    (arena, detour)
}

#[test]
fn test_new_route_replaces_looping_detour() {
    let (arena, detour) = route_over_detour(true);
    let root = arena.root();
    assert!(detour.iter().all(|id| !arena.contains(root, *id)));

    let segments: Vec<_> = arena.items(root).into_iter().filter(|(_, i)| i.kind() == ItemKind::Segment).collect();
    assert_eq!(segments.len(), 1);
    let line = arena.assemble_line(root, segments[0].0).expect("line");
    assert_eq!(line.point(0), Point::new(0, 0));
    assert_eq!(line.point(-1), Point::new(10_000, 0));
}

#[test]
fn test_detour_kept_without_loop_removal() {
    let (arena, detour) = route_over_detour(false);
    let root = arena.root();
    assert!(detour.iter().all(|id| arena.contains(root, *id)));
    let segments = arena.items(root).into_iter().filter(|(_, i)| i.kind() == ItemKind::Segment).count();
    assert_eq!(segments, 4);
}

#[test]
fn test_shove_mode_pushes_foreign_track_aside() {
    let mut arena = new_arena();
    let victim = add_track(&mut arena, (0, -200), (10_000, -200), 2);
    let s = settings(RouterMode::Shove);
    let iface = RecordingIface::default();
    let dbg = NullDebugSink;
    let ctx = RouterContext::new(&s, arena.root(), &iface, &dbg);

    let mut placer = LinePlacer::new(sizes());
    placer.start(&mut arena, &ctx, Point::new(2000, 0), None);
    assert!(placer.move_to(&mut arena, &ctx, Point::new(8000, 0), None));

    let trace = placer.trace();
    assert_eq!(trace.point(-1), Point::new(8000, 0));
    let node = placer.current_node(false).expect("node");
    assert!(!arena.contains(node, victim));
    assert!(arena.check_colliding(node, &trace, KindMask::ANY).is_none());
    // the board itself is untouched until the route is committed
    assert!(arena.contains(arena.root(), victim));
    assert!(arena.check_colliding(arena.root(), &trace, KindMask::ANY).is_some());

    assert!(placer.fix_route(&mut arena, &ctx, Point::new(8000, 0), None, true));
    assert!(placer.commit_placement(&mut arena, &ctx));
    assert!(iface.removed.borrow().contains(&victim));
    assert!(!arena.contains(arena.root(), victim));
}
