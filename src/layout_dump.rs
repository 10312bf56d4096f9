use crate::config::Config;
use crate::graph::Graph;
use crate::layout::{Layout, LayoutKind};
use crate::reconcile::{Frame, GraphBounds, Reconciler};
use crate::viewport::Viewport;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// Last reconciled frame of a layout run plus the fitted viewport.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDump {
    pub layout: String,
    /// Emissions reconciled before this frame was taken.
    pub ticks: usize,
    pub viewport: ViewportDump,
    pub frame: Frame,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportDump {
    pub transform: String,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
    pub bounds: GraphBounds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimap_scale: Option<f64>,
}

impl FrameDump {
    pub fn new(kind: LayoutKind, ticks: usize, frame: Frame, viewport: &Viewport) -> Self {
        let bounds = frame.bounds;
        FrameDump {
            layout: kind.to_string(),
            ticks,
            viewport: ViewportDump {
                transform: viewport.to_svg(),
                zoom: viewport.zoom_level(),
                width: viewport.width,
                height: viewport.height,
                bounds,
                minimap_scale: viewport.minimap_scale(&bounds),
            },
            frame,
        }
    }
}

/// Runs `kind` over `graph`, reconciles every emission in order (at most
/// `ticks` of them) and applies the viewport's automatic fit to the last
/// frame.
pub fn layout_frame(graph: Graph, kind: LayoutKind, config: &Config, ticks: Option<usize>) -> anyhow::Result<FrameDump> {
    let mut layout = Layout::new(kind, &config.layout);
    let multigraph = layout.is_multigraph();
    let mut reconciler = Reconciler::new(&config.viewport);
    let mut last = None;
    let mut count = 0;
    {
        let result = layout.run(graph)?;
        for snapshot in result.into_snapshots().take(ticks.unwrap_or(usize::MAX)) {
            last = Some(reconciler.apply(&snapshot, multigraph, Instant::now()));
            count += 1;
        }
    }
    layout.dispose();
    let frame = last.ok_or_else(|| anyhow::anyhow!("layout `{kind}` produced no frame"))?;
    tracing::debug!(layout = %kind, ticks = count, "layout finished");

    let mut viewport = Viewport::new(&config.viewport);
    viewport.auto_fit(&frame.bounds);
    Ok(FrameDump::new(kind, count, frame, &viewport))
}

pub fn write_frame_dump(path: Option<&Path>, dump: &FrameDump) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_graph;

    const SAMPLE: &str = r#"{
        nodes: [{ id: "a" }, { id: "b", dimension: { width: 60, height: 40 } }, { id: "c" }],
        edges: [{ source: "a", target: "b" }, { id: "bc", source: "b", target: "c" }],
        clusters: [{ id: "k", childNodeIds: ["a", "b"] }],
    }"#;

    #[test]
    fn every_layout_produces_a_frame() {
        for kind in LayoutKind::ALL {
            let graph = parse_graph(SAMPLE).unwrap();
            let dump = layout_frame(graph, kind, &Config::default(), Some(5)).unwrap();
            assert!((1..=5).contains(&dump.ticks), "{kind}");
            assert_eq!(dump.frame.nodes.len(), 3, "{kind}");
            assert_eq!(dump.frame.edges.len(), 2, "{kind}");
            assert!(dump.viewport.zoom <= 1.0);
        }
    }

    #[test]
    fn rank_layouts_emit_once() {
        let graph = parse_graph(SAMPLE).unwrap();
        let dump = layout_frame(graph, LayoutKind::Rank, &Config::default(), None).unwrap();
        assert_eq!(dump.ticks, 1);
    }

    #[test]
    fn auto_fit_is_opt_in() {
        let graph = parse_graph(SAMPLE).unwrap();
        let dump = layout_frame(graph, LayoutKind::Rank, &Config::default(), None).unwrap();
        assert_eq!(dump.viewport.transform, "matrix(1,0,0,1,0,0)");

        let mut config = Config::default();
        config.viewport.width = 50.0;
        config.viewport.height = 50.0;
        config.viewport.auto_zoom = true;
        config.viewport.auto_center = true;
        let graph = parse_graph(SAMPLE).unwrap();
        let dump = layout_frame(graph, LayoutKind::Rank, &config, None).unwrap();
        assert!(dump.viewport.zoom < 1.0);
        assert_ne!(dump.viewport.transform, "matrix(1,0,0,1,0,0)");
    }

    #[test]
    fn dump_uses_camel_case_and_matrix_transform() {
        let viewport = Viewport::default();
        let dump = FrameDump::new(LayoutKind::RankCurved, 1, Frame::default(), &viewport);
        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["layout"], "rank-curved");
        assert_eq!(json["viewport"]["transform"], "matrix(1,0,0,1,0,0)");
        assert!(json["viewport"].get("minimapScale").is_none());
        assert!(json["frame"]["bounds"].get("minX").is_some());
    }
}
