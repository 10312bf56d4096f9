use std::time::{Duration, Instant};

use graphview::config::{LayoutSettings, MinimapConfig, ViewportConfig, parse_graph};
use graphview::geometry::{AffineTransform, Point};
use graphview::graph::{Edge, EdgeKey, EdgeLabel, Graph, Node};
use graphview::layout::{LayoutKind, get_layout};
use graphview::path::Curve;
use graphview::reconcile::{DominantBaseline, Reconciler};
use graphview::viewport::Viewport;

fn parallel(first: &[(f64, f64)], second: &[(f64, f64)]) -> Graph {
    let mut graph = Graph::new();
    graph
        .add_node(Node::new("a").with_position(0.0, 0.0).with_dimension(20.0, 20.0))
        .add_node(Node::new("b").with_position(100.0, 0.0).with_dimension(20.0, 20.0))
        .add_edge(Edge::new("a", "b").with_id("p"))
        .add_edge(Edge::new("a", "b").with_id("q"));
    for (id, raw) in [("p", first), ("q", second)] {
        graph.edge_labels.insert(
            EdgeKey::new("a", "b", Some(id)),
            EdgeLabel {
                source: "a".into(),
                target: "b".into(),
                name: Some(id.into()),
                points: raw.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            },
        );
    }
    graph
}

#[test]
fn parallel_edges_never_swap_old_lines() {
    let mut reconciler = Reconciler::default().with_curve(Curve::Linear);
    let now = Instant::now();
    let before = reconciler.apply(
        &parallel(&[(10.0, 0.0), (90.0, 0.0)], &[(10.0, 5.0), (90.0, 5.0)]),
        true,
        now,
    );
    let after = reconciler.apply(
        &parallel(&[(10.0, 1.0), (90.0, 1.0)], &[(10.0, 6.0), (90.0, 6.0)]),
        true,
        now,
    );
    for id in ["p", "q"] {
        assert_eq!(after.edge(id).unwrap().old_line, before.edge(id).unwrap().line, "{id}");
    }
    assert_eq!(after.edge("q").unwrap().old_line, "M10,5L90,5");
}

#[test]
fn simple_graphs_match_by_endpoints() {
    let mut graph = Graph::new();
    graph
        .add_node(Node::new("a").with_position(0.0, 0.0))
        .add_node(Node::new("b").with_position(50.0, 0.0))
        .add_edge(Edge::new("a", "b").with_id("x"));
    graph.edge_labels.insert(
        EdgeKey::new("a", "b", None),
        EdgeLabel {
            source: "a".into(),
            target: "b".into(),
            name: None,
            points: vec![Point::new(0.0, 0.0), Point::new(50.0, 0.0)],
        },
    );
    let mut reconciler = Reconciler::default();
    let frame = reconciler.apply(&graph, false, Instant::now());
    assert_eq!(frame.edges.len(), 1);
    assert_eq!(frame.edges[0].id, "x");
    let again = reconciler.apply(&graph, false, Instant::now());
    assert_eq!(again.edges[0].old_line, frame.edges[0].line);
}

#[test]
fn midpoints_and_text_direction() {
    let mut reconciler = Reconciler::default().with_curve(Curve::Linear);
    let frame = reconciler.apply(
        &parallel(
            &[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)],
            &[(30.0, 0.0), (20.0, 0.0), (10.0, 0.0), (0.0, 0.0)],
        ),
        true,
        Instant::now(),
    );
    let odd = frame.edge("p").unwrap();
    assert_eq!(odd.mid_point, Point::new(10.0, 0.0));
    assert_eq!(odd.text_transform, "translate(10,0)");
    assert_eq!(odd.dominant_baseline, DominantBaseline::TextAfterEdge);

    let even = frame.edge("q").unwrap();
    assert_eq!(even.mid_point, Point::new(15.0, 0.0));
    assert_eq!(even.dominant_baseline, DominantBaseline::TextBeforeEdge);
    assert_eq!(even.text_path, "M0,0L10,0L20,0L30,0");
    assert_eq!(even.line, "M30,0L20,0L10,0L0,0");
}

#[test]
fn seen_nodes_animate_after_debounce() {
    let mut reconciler = Reconciler::default();
    let graph = parallel(&[(10.0, 0.0), (90.0, 0.0)], &[(10.0, 5.0), (90.0, 5.0)]);
    let start = Instant::now();
    let frame = reconciler.apply(&graph, true, start);
    assert!(frame.nodes.iter().all(|n| !n.animate));
    let frame = reconciler.apply(&graph, true, start + Duration::from_millis(501));
    assert!(frame.nodes.iter().all(|n| n.animate));
}

#[test]
fn force_stream_reconciles_every_tick() {
    let graph = parse_graph(
        r#"{"nodes": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
            "edges": [{"source": "a", "target": "b"}, {"source": "b", "target": "c"}]}"#,
    )
    .unwrap();
    let mut layout = get_layout("force", &LayoutSettings::default()).unwrap();
    let multigraph = layout.is_multigraph();
    let mut reconciler = Reconciler::default();
    let now = Instant::now();
    let mut previous: Option<String> = None;
    for snapshot in layout.run(graph).unwrap().into_snapshots().take(10) {
        let frame = reconciler.apply(&snapshot, multigraph, now);
        assert_eq!(frame.edges.len(), 2);
        let edge = frame.edge("e1").unwrap();
        if let Some(line) = &previous {
            assert_eq!(&edge.old_line, line);
        }
        previous = Some(edge.line.clone());
    }
}

#[test]
fn zoom_to_fit_uses_reconciled_bounds() {
    let config = ViewportConfig {
        width: 300.0,
        height: 300.0,
        minimap: Some(MinimapConfig::default()),
        ..Default::default()
    };
    let mut reconciler = Reconciler::new(&config);
    let frame = reconciler.apply(
        &parallel(&[(10.0, 0.0), (90.0, 0.0)], &[(10.0, 5.0), (90.0, 5.0)]),
        true,
        Instant::now(),
    );
    // nodes span 120 x 20, plus the minimap margin on every side
    assert_eq!(frame.bounds.width(), 320.0);
    assert_eq!(frame.bounds.height(), 220.0);

    let mut viewport = Viewport::new(&config);
    viewport.zoom_to_fit(&frame.bounds);
    assert_eq!(viewport.zoom_level(), 300.0 / 320.0);
    viewport.center(&frame.bounds);
    let center = viewport.transform.apply(frame.bounds.center());
    assert!((center.x - 150.0).abs() < 1e-9 && (center.y - 150.0).abs() < 1e-9);
}

#[test]
fn transforms_compose_and_serialize() {
    let t = AffineTransform::translate(10.0, 20.0).compose(&AffineTransform::scale(2.0, 2.0));
    assert_eq!(t.apply(Point::new(1.0, 1.0)), Point::new(12.0, 22.0));
    assert_eq!(t.to_svg(), "matrix(2,0,0,2,10,20)");
    let inverse = t.inverse().unwrap();
    assert_eq!(inverse.apply(Point::new(12.0, 22.0)), Point::new(1.0, 1.0));
    assert_eq!(
        AffineTransform::scale(1.0 / 3.0, 1.0 / 3.0).smooth(100.0).to_svg(),
        "matrix(0.33,0,0,0.33,0,0)"
    );
}

#[test]
fn parallel_edges_render_under_every_layout() {
    let input = r#"{"nodes": [{"id": "a"}, {"id": "b"}],
        "edges": [{"id": "x", "source": "a", "target": "b"}, {"id": "y", "source": "a", "target": "b"}]}"#;
    for kind in LayoutKind::ALL {
        let mut layout = get_layout(kind.name(), &LayoutSettings::default()).unwrap();
        assert!(layout.is_multigraph(), "{kind}");
        let multigraph = layout.is_multigraph();
        let mut reconciler = Reconciler::default();
        let now = Instant::now();
        for snapshot in layout.run(parse_graph(input).unwrap()).unwrap().into_snapshots().take(3) {
            let frame = reconciler.apply(&snapshot, multigraph, now);
            let mut ids: Vec<&str> = frame.edges.iter().map(|e| e.id.as_str()).collect();
            ids.sort_unstable();
            assert_eq!(ids, ["x", "y"], "{kind}");
        }
    }
}
