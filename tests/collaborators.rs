// Walkaround, shove and optimizer working together on a shared arena
use trace_router::geometry::{Point, PointChain, Seg};
use trace_router::router::optimizer::{OptimizationEffort, Optimizer};
use trace_router::router::{
    commit_routing, DesignRules, Item, KindMask, LayerRange, Line, LinePlacer, NodeArena, NullDebugSink,
    RecordingDebugSink, RecordingIface, RouterContext, RouterMode, RoutingSettings, Segment, Shove, ShoveStatus,
    SizesSettings, Solid, SolidShape, Walkaround, WalkaroundStatus,
};

fn line(points: &[(i64, i64)], net: i32) -> Line {
    let mut l = Line::new(200, net, 0);
    l.chain = PointChain::from_points(points.iter().map(|&(x, y)| Point::new(x, y)));
    l
}

fn pad(arena: &mut NodeArena, x: i64, y: i64, r: i64, net: i32) {
    let root = arena.root();
    arena.add(
        root,
        Item::Solid(Solid {
            shape: SolidShape::Circle { center: Point::new(x, y), radius: r },
            layers: LayerRange::new(0, 31),
            net,
            anchor: Point::new(x, y),
        }),
    );
}

#[test]
fn test_walkaround_result_survives_optimization() {
    let mut arena = NodeArena::new(DesignRules { clearance: 100 });
    pad(&mut arena, 5000, 0, 1000, 3);
    let root = arena.root();
    let sink = NullDebugSink;

    let result = Walkaround::new(&arena, root, &sink).route(&line(&[(0, 0), (10_000, 0)], 1));
    assert_eq!(result.status_cw, WalkaroundStatus::Done);
    assert_eq!(result.status_ccw, WalkaroundStatus::Done);

    for walked in [result.line_cw, result.line_ccw] {
        let mut optimized = walked.clone();
        let effort = OptimizationEffort::MERGE_SEGMENTS | OptimizationEffort::MERGE_COLINEAR;
        Optimizer::optimize_line(&arena, root, &mut optimized, effort);

        assert_eq!(optimized.point(0), Point::new(0, 0));
        assert_eq!(optimized.point(-1), Point::new(10_000, 0));
        assert!(optimized.length() <= walked.length() + 1.0);
        assert!(arena.check_colliding(root, &optimized, KindMask::ANY).is_none());
    }
}

#[test]
fn test_walkaround_reports_to_debug_sink_only() {
    let mut arena = NodeArena::new(DesignRules { clearance: 100 });
    pad(&mut arena, 5000, 0, 1000, 3);
    let root = arena.root();

    let quiet = NullDebugSink;
    let recording = RecordingDebugSink::default();
    let a = Walkaround::new(&arena, root, &quiet).route(&line(&[(0, 0), (10_000, 0)], 1));
    let b = Walkaround::new(&arena, root, &recording).route(&line(&[(0, 0), (10_000, 0)], 1));

    assert_eq!(a.line_cw, b.line_cw);
    assert_eq!(a.line_ccw, b.line_ccw);
}

#[test]
fn test_shoved_branch_commits_to_root() {
    let mut arena = NodeArena::new(DesignRules { clearance: 100 });
    let root = arena.root();
    let victim = arena.add(
        root,
        Item::Segment(Segment::new(Seg::new(Point::new(0, -200), Point::new(10_000, -200)), 200, 2, 0)),
    );
    let shove_root = arena.branch(root);
    let mut shove = Shove::new(shove_root, 100);

    let head = line(&[(2000, 0), (8000, 0)], 1);
    assert_eq!(shove.shove_lines(&mut arena, &head, &NullDebugSink), ShoveStatus::Ok);

    let iface = RecordingIface::default();
    assert!(commit_routing(&mut arena, shove.current_node(), &iface));
    assert!(iface.removed.borrow().contains(&victim));
    assert!(!iface.added.borrow().is_empty());
    assert_eq!(*iface.commits.borrow(), 1);
    assert!(arena.check_colliding(root, &head, KindMask::ANY).is_none());
    assert!(!arena.is_alive(shove_root));
}

#[test]
fn test_placer_shows_ratline_to_unconnected_pad() {
    let mut arena = NodeArena::new(DesignRules { clearance: 100 });
    let root = arena.root();
    let start = arena.add(
        root,
        Item::Solid(Solid {
            shape: SolidShape::Circle { center: Point::new(0, 0), radius: 300 },
            layers: LayerRange::new(0, 31),
            net: 1,
            anchor: Point::new(0, 0),
        }),
    );
    pad(&mut arena, 10_000, 5000, 300, 1);

    let s = RoutingSettings { mode: RouterMode::MarkObstacles, clearance: 100, ..Default::default() };
    let (iface, dbg) = (RecordingIface::default(), NullDebugSink);
    let ctx = RouterContext::new(&s, root, &iface, &dbg);
    let sizes = SizesSettings { track_width: 200, via_diameter: 400, via_drill: 200, ..Default::default() };

    let mut placer = LinePlacer::new(sizes);
    placer.start(&mut arena, &ctx, Point::new(0, 0), Some(start));
    placer.move_to(&mut arena, &ctx, Point::new(4000, 0), None);

    let ratline = iface.last_ratline().expect("ratline");
    assert_eq!(ratline.first(), Some(Point::new(4000, 0)));
    assert_eq!(ratline.last(), Some(Point::new(10_000, 5000)));
}
