use graphview::config::{Config, parse_graph};
use graphview::layout::LayoutKind;
use graphview::layout_dump::{FrameDump, layout_frame};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

/// Force layouts run in the caller's thread; without a cap they tick until
/// cooled, which can take a few hundred frames.
const DEFAULT_MAX_TICKS: usize = 300;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphviewOptions {
    layout: Option<String>,
    max_ticks: Option<usize>,
    minimap: Option<bool>,
    width: Option<f64>,
    height: Option<f64>,
    #[serde(default)]
    config: Config,
}

fn build_frame(graph_json: &str, options: GraphviewOptions) -> Result<FrameDump, String> {
    let kind: LayoutKind = options
        .layout
        .as_deref()
        .unwrap_or("rank")
        .parse()
        .map_err(|error: graphview::LayoutError| error.to_string())?;
    let mut config = options.config;
    if let Some(width) = options.width {
        config.viewport.width = width;
    }
    if let Some(height) = options.height {
        config.viewport.height = height;
    }
    if options.minimap == Some(true) && config.viewport.minimap.is_none() {
        config.viewport.minimap = Some(Default::default());
    }
    let graph = parse_graph(graph_json).map_err(|error| error.to_string())?;
    let ticks = options.max_ticks.unwrap_or(DEFAULT_MAX_TICKS);
    layout_frame(graph, kind, &config, Some(ticks)).map_err(|error| format!("{error:#}"))
}

/// Lays out a `{nodes, edges, clusters}` graph and returns the reconciled
/// frame plus viewport as JSON (fitted when `autoZoom`/`autoCenter` are set).
#[wasm_bindgen]
pub fn layout_graph_json(graph_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<GraphviewOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        GraphviewOptions::default()
    };
    let dump = build_frame(graph_json, options).map_err(|error| JsValue::from_str(&error))?;
    serde_json::to_string(&dump).map_err(|error| JsValue::from_str(&error.to_string()))
}

#[cfg(test)]
mod tests {
    use crate::{GraphviewOptions, build_frame};

    const GRAPH: &str = r#"{
        "nodes": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
        "clusters": [{"id": "k", "childNodeIds": ["a", "b"]}],
        "edges": [{"source": "a", "target": "b"}, {"source": "b", "target": "c"}]
    }"#;

    #[test]
    fn lays_out_with_clusters_and_minimap() {
        let options: GraphviewOptions =
            serde_json::from_str(r#"{"layout": "rank-cluster", "minimap": true, "width": 640}"#).unwrap();
        let dump = build_frame(GRAPH, options).expect("rank-cluster layout should succeed");
        assert_eq!(dump.layout, "rank-cluster");
        assert_eq!(dump.frame.clusters.len(), 1);
        assert_eq!(dump.viewport.width, 640.0);
        assert!(dump.viewport.minimap_scale.is_some());
    }

    #[test]
    fn unknown_layout_is_reported() {
        let options = GraphviewOptions {
            layout: Some("doesNotExist".to_string()),
            ..Default::default()
        };
        let error = build_frame(GRAPH, options).unwrap_err();
        assert!(error.contains("doesNotExist"));
    }
}
