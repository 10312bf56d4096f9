use crate::config::{MinimapConfig, Orientation, load_config, parse_graph};
use crate::layout::LayoutKind;
use crate::layout_dump::{layout_frame, write_frame_dump};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "graphview", version, about = "Lay out a graph and dump the reconciled frame")]
pub struct Args {
    /// Input graph (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Layout strategy
    #[arg(short = 'l', long = "layout", value_enum, default_value_t = LayoutKind::Rank)]
    pub layout: LayoutKind,

    /// Rank direction for the rank layouts (TB, TD, BT, LR, RL)
    #[arg(long = "orientation", value_parser = parse_orientation)]
    pub orientation: Option<Orientation>,

    /// Output file for the frame JSON. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Stop force layouts after this many ticks
    #[arg(long = "ticks")]
    pub ticks: Option<usize>,

    /// Zoom to fit and center the viewport on the final frame
    #[arg(long = "fit")]
    pub fit: bool,

    /// Reserve minimap margin around the graph bounds
    #[arg(long = "minimap")]
    pub minimap: bool,

    /// Viewport width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f64>,

    /// Viewport height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f64>,
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.viewport.width = width;
    }
    if let Some(height) = args.height {
        config.viewport.height = height;
    }
    if let Some(orientation) = args.orientation {
        config.layout.rank.orientation = orientation;
    }
    if args.fit {
        config.viewport.auto_zoom = true;
        config.viewport.auto_center = true;
    }
    if args.minimap && config.viewport.minimap.is_none() {
        config.viewport.minimap = Some(MinimapConfig::default());
    }

    let input = read_input(args.input.as_deref())?;
    let graph = parse_graph(&input).context("invalid graph input")?;
    let dump = layout_frame(graph, args.layout, &config, args.ticks)?;
    write_frame_dump(args.output.as_deref(), &dump)
}

fn parse_orientation(token: &str) -> Result<Orientation, String> {
    Orientation::from_token(token).ok_or_else(|| format!("unknown orientation `{token}` (expected TB, BT, LR or RL)"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
