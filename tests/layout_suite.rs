use std::path::Path;

use graphview::config::{LayoutSettings, parse_graph};
use graphview::geometry::{Point, Rect};
use graphview::graph::{Edge, EdgeKey, Graph, Node};
use graphview::layout::{Layout, LayoutError, LayoutKind, get_layout};

fn load_fixture(name: &str) -> Graph {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    parse_graph(&input).expect("fixture parse failed")
}

/// Last emission of a run, with at most `max` ticks for force layouts.
fn settle(layout: &mut Layout, graph: Graph, max: usize) -> Graph {
    let result = layout.run(graph).expect("layout failed");
    result.into_snapshots().take(max).last().expect("no emission")
}

fn assert_complete(graph: &Graph, context: &str) {
    for node in &graph.nodes {
        let position = node.position.unwrap_or_else(|| panic!("{context}: {} unplaced", node.id));
        let size = node.dimension.unwrap_or_else(|| panic!("{context}: {} unsized", node.id));
        assert!(position.is_finite(), "{context}: {} at {position:?}", node.id);
        assert!(size.width.is_finite() && size.height.is_finite(), "{context}: {}", node.id);
    }
    for edge in &graph.edges {
        assert!(edge.points.len() >= 2, "{context}: edge {} has {:?}", edge.id_str(), edge.points);
        assert!(edge.points.iter().all(Point::is_finite), "{context}: edge {}", edge.id_str());
    }
}

fn rect(node: &Node) -> Rect {
    Rect::from_center(node.position.unwrap(), node.dimension.unwrap())
}

#[test]
fn layout_all_fixtures() {
    // (fixture, layouts expected to accept it)
    let cases: [(&str, &[LayoutKind]); 4] = [
        ("chain.json", &LayoutKind::ALL),
        ("cycle.json", &LayoutKind::ALL),
        ("multigraph.json", &LayoutKind::ALL),
        (
            "clusters.json5",
            &[LayoutKind::RankCluster, LayoutKind::Force, LayoutKind::ConstraintForce],
        ),
    ];
    let settings = LayoutSettings::default();
    for (fixture, kinds) in cases {
        for kind in kinds {
            let mut layout = Layout::new(*kind, &settings);
            let graph = settle(&mut layout, load_fixture(fixture), 60);
            assert_complete(&graph, &format!("{fixture}/{kind}"));
            layout.dispose();
        }
    }
}

#[test]
fn rank_family_is_deterministic() {
    let settings = LayoutSettings::default();
    for kind in [LayoutKind::Rank, LayoutKind::RankCluster, LayoutKind::RankCurved] {
        let a = settle(&mut Layout::new(kind, &settings), load_fixture("cycle.json"), 1);
        let b = settle(&mut Layout::new(kind, &settings), load_fixture("cycle.json"), 1);
        assert_eq!(a, b, "{kind}");
    }
}

#[test]
fn rank_family_rejects_edges_to_missing_nodes() {
    let mut layout = get_layout("rank", &LayoutSettings::default()).unwrap();
    let err = layout.run(load_fixture("clusters.json5")).unwrap_err();
    assert_eq!(
        err,
        LayoutError::MissingNode {
            edge: "ops".to_string(),
            node: "backend".to_string()
        }
    );
}

#[test]
fn registry_errors_name_the_input() {
    let err = get_layout("doesNotExist", &LayoutSettings::default()).unwrap_err();
    assert!(err.to_string().contains("doesNotExist"));
    for kind in LayoutKind::ALL {
        let layout = get_layout(kind.name(), &LayoutSettings::default()).unwrap();
        assert_eq!(layout.kind(), kind);
    }
}

#[test]
fn multigraph_keeps_parallel_edges_apart() {
    let mut layout = get_layout("rank", &LayoutSettings::default()).unwrap();
    assert!(layout.is_multigraph());
    let graph = settle(&mut layout, load_fixture("multigraph.json"), 1);
    assert_eq!(graph.edge_labels.len(), 3);
    assert!(graph.edge_labels.contains_key(&EdgeKey::new("a", "b", Some("first"))));
    assert!(graph.edge_labels.contains_key(&EdgeKey::new("a", "b", Some("second"))));

    let mut settings = LayoutSettings::default();
    settings.rank.multigraph = false;
    let mut layout = Layout::new(LayoutKind::Rank, &settings);
    assert!(!layout.is_multigraph());
    let graph = settle(&mut layout, load_fixture("multigraph.json"), 1);
    assert_eq!(graph.edge_labels.len(), 2);
}

#[test]
fn clusters_round_trip_through_rank_cluster() {
    let mut layout = get_layout("rank-cluster", &LayoutSettings::default()).unwrap();
    let graph = settle(&mut layout, load_fixture("clusters.json5"), 1);
    let backend = rect(&graph.cluster("backend").unwrap().node);
    let storage = rect(&graph.cluster("storage").unwrap().node);
    for id in ["api", "db", "cache"] {
        let node = rect(graph.node(id).unwrap());
        assert!(backend.x <= node.x && backend.right() >= node.right(), "{id}");
        assert!(backend.y <= node.y && backend.bottom() >= node.bottom(), "{id}");
    }
    assert!(backend.x <= storage.x && backend.right() >= storage.right());
    assert!(!backend.contains(graph.node("client").unwrap().position.unwrap()));
}

#[test]
fn curved_routes_have_four_points_and_default_names() {
    let mut settings = LayoutSettings::default();
    settings.rank.multigraph = false;
    let mut layout = Layout::new(LayoutKind::RankCurved, &settings);
    assert!(!layout.is_multigraph());
    let graph = settle(&mut layout, load_fixture("chain.json"), 1);
    for edge in &graph.edges {
        assert_eq!(edge.points.len(), 4, "{}", edge.id_str());
        let label = &graph.edge_labels[&EdgeKey::new(&edge.source, &edge.target, None)];
        assert_eq!(label.points, edge.points);
    }
    let key = EdgeKey::new("start", "parse", None);
    assert_eq!(key.to_string(), "start\u{1}parse\u{1}\u{0}");
}

#[test]
fn force_drag_pins_the_node() {
    let mut layout = get_layout("force", &LayoutSettings::default()).unwrap();
    let first = {
        let mut ticks = layout.run(load_fixture("chain.json")).unwrap().into_snapshots();
        ticks.next().unwrap()
    };
    let start = first.node("start").unwrap().position.unwrap();
    layout.on_drag_start("start", start);
    layout.on_drag("start", Point::new(start.x + 50.0, start.y));
    let dragged = layout.ticks().expect("stream resumes").nth(3).unwrap();
    let p = dragged.node("start").unwrap().position.unwrap();
    assert!((p.x - (start.x + 50.0)).abs() < 1e-9 && (p.y - start.y).abs() < 1e-9);
    layout.on_drag_end("start", p);
}

#[test]
fn disposed_streams_stop() {
    for name in ["force", "constraint-force"] {
        let mut layout = get_layout(name, &LayoutSettings::default()).unwrap();
        {
            let mut ticks = layout.run(load_fixture("chain.json")).unwrap().into_snapshots();
            assert!(ticks.next().is_some(), "{name}");
        }
        assert!(layout.ticks().is_some(), "{name}");
        layout.dispose();
        assert!(layout.ticks().is_none(), "{name}");
    }
}

#[test]
fn force_streams_cool_down() {
    let mut layout = get_layout("force", &LayoutSettings::default()).unwrap();
    let count = layout.run(load_fixture("chain.json")).unwrap().into_snapshots().count();
    assert!(count > 10 && count < 10_000, "{count}");
    assert_eq!(layout.ticks().map(Iterator::count), Some(0));
}

#[test]
fn constraint_force_filters_dangling_edges_and_routes_group_links() {
    let mut graph = load_fixture("clusters.json5");
    graph.add_edge(Edge::new("client", "nowhere").with_id("dangling"));
    let mut layout = get_layout("constraint-force", &LayoutSettings::default()).unwrap();
    let out = settle(&mut layout, graph, 20);
    assert!(out.edge("dangling").is_none());
    let ops = out.edge("ops").expect("group link kept");
    assert_eq!(ops.points.len(), 2);
    let backend = rect(&out.cluster("backend").unwrap().node);
    let end = ops.points[1];
    let on_border = (end.x - backend.x).abs() < 1e-6
        || (end.x - backend.right()).abs() < 1e-6
        || (end.y - backend.y).abs() < 1e-6
        || (end.y - backend.bottom()).abs() < 1e-6;
    assert!(on_border || end == backend.center(), "{end:?} vs {backend:?}");
}

#[test]
fn update_edge_reroutes_rank_edges() {
    let mut layout = get_layout("rank", &LayoutSettings::default()).unwrap();
    let mut graph = settle(&mut layout, load_fixture("chain.json"), 1);
    graph.node_mut("emit").unwrap().position = Some(Point::new(-400.0, 0.0));
    let graph = layout
        .update_edge(graph, "e-check-emit")
        .unwrap()
        .into_snapshots()
        .next()
        .unwrap();
    assert_eq!(graph.edge("e-check-emit").unwrap().points[1].x, -400.0);
}
