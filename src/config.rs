use crate::geometry::Dimension;
use crate::graph::Graph;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Direction ranks advance in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "TB")]
    TopToBottom,
    #[serde(rename = "BT")]
    BottomToTop,
    #[default]
    #[serde(rename = "LR")]
    LeftToRight,
    #[serde(rename = "RL")]
    RightToLeft,
}

impl Orientation {
    /// Parses a direction token; `TD` is accepted as an alias of `TB`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "TB" | "TD" => Some(Self::TopToBottom),
            "BT" => Some(Self::BottomToTop),
            "LR" => Some(Self::LeftToRight),
            "RL" => Some(Self::RightToLeft),
            _ => None,
        }
    }

    /// Ranks run along `y` for vertical orientations and along `x` otherwise.
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::TopToBottom | Self::BottomToTop)
    }
}

/// Corner the horizontal coordinate assignment aligns toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Align {
    #[serde(rename = "UL")]
    UpLeft,
    #[serde(rename = "UR")]
    UpRight,
    #[serde(rename = "DL")]
    DownLeft,
    #[serde(rename = "DR")]
    DownRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acyclicer {
    Greedy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ranker {
    #[default]
    NetworkSimplex,
    TightTree,
    LongestPath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RankSettings {
    pub orientation: Orientation,
    pub margin_x: f64,
    pub margin_y: f64,
    pub edge_padding: f64,
    pub rank_padding: f64,
    pub node_padding: f64,
    pub multigraph: bool,
    pub compound: bool,
    pub align: Option<Align>,
    pub acyclicer: Option<Acyclicer>,
    pub ranker: Ranker,
    /// Offset of the curved-route control points along the rank axis.
    pub curve_distance: f64,
}

impl Default for RankSettings {
    fn default() -> Self {
        Self {
            orientation: Orientation::LeftToRight,
            margin_x: 20.0,
            margin_y: 20.0,
            edge_padding: 100.0,
            rank_padding: 100.0,
            node_padding: 50.0,
            multigraph: true,
            compound: true,
            align: None,
            acyclicer: None,
            ranker: Ranker::NetworkSimplex,
            curve_distance: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForceSettings {
    /// Many-body strength; negative values repel.
    pub charge_strength: f64,
    pub collide_radius: f64,
    pub link_distance: f64,
    /// Cooling parameter a run starts from.
    pub alpha: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    /// Alpha target while a node is dragged.
    pub drag_alpha_target: f64,
    pub velocity_decay: f64,
    pub seed: u64,
    /// Hard cap on emitted ticks per run; `0` means until cooled.
    pub max_ticks: usize,
}

impl Default for ForceSettings {
    fn default() -> Self {
        Self {
            charge_strength: -150.0,
            collide_radius: 5.0,
            link_distance: 100.0,
            alpha: 0.5,
            alpha_min: 0.001,
            alpha_decay: 1.0 - 0.001f64.powf(1.0 / 300.0),
            drag_alpha_target: 0.3,
            velocity_decay: 0.4,
            seed: 1,
            max_ticks: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConstraintSettings {
    pub link_distance: f64,
    pub avoid_overlaps: bool,
    pub group_padding: f64,
    pub view_dimensions: Option<Dimension>,
    pub alpha: f64,
    pub alpha_decay: f64,
    pub convergence_threshold: f64,
    pub seed: u64,
    pub max_ticks: usize,
}

impl Default for ConstraintSettings {
    fn default() -> Self {
        Self {
            link_distance: 150.0,
            avoid_overlaps: true,
            group_padding: 5.0,
            view_dimensions: Some(Dimension::new(600.0, 600.0)),
            alpha: 0.5,
            alpha_decay: 0.01,
            convergence_threshold: 0.01,
            seed: 1,
            max_ticks: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutSettings {
    pub rank: RankSettings,
    pub force: ForceSettings,
    pub constraint: ConstraintSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MinimapConfig {
    pub max_width: f64,
    pub max_height: f64,
    /// Margin added around the graph bounds while the minimap is shown.
    pub margin: f64,
}

impl Default for MinimapConfig {
    fn default() -> Self {
        Self {
            max_width: 150.0,
            max_height: 150.0,
            margin: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewportConfig {
    pub width: f64,
    pub height: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_speed: f64,
    pub pan_on_zoom: bool,
    /// Center the graph after every new frame.
    pub auto_center: bool,
    /// Zoom to fit after every new frame.
    pub auto_zoom: bool,
    pub minimap: Option<MinimapConfig>,
    /// Delay before freshly laid-out nodes count as "seen" for animation.
    pub animation_debounce_ms: u64,
    /// Rounding precision of the serialized transform.
    pub transform_precision: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            min_zoom: 0.1,
            max_zoom: 4.0,
            zoom_speed: 0.1,
            pan_on_zoom: true,
            auto_center: false,
            auto_zoom: false,
            minimap: None,
            animation_debounce_ms: 500,
            transform_precision: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub layout: LayoutSettings,
    pub viewport: ViewportConfig,
}

/// Loads a JSON or JSON5 config file; missing fields keep their defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("invalid config {}", path.display()))
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    match serde_json::from_str::<Config>(contents) {
        Ok(config) => Ok(config),
        Err(json_err) => json5::from_str::<Config>(contents)
            .map_err(|json5_err| anyhow::anyhow!("{json_err}; as JSON5: {json5_err}")),
    }
}

/// Parses a `{nodes, edges, clusters}` graph from JSON or JSON5.
pub fn parse_graph(contents: &str) -> anyhow::Result<Graph> {
    match serde_json::from_str::<Graph>(contents) {
        Ok(graph) => Ok(graph),
        Err(json_err) => json5::from_str::<Graph>(contents)
            .map_err(|json5_err| anyhow::anyhow!("{json_err}; as JSON5: {json5_err}")),
    }
}
