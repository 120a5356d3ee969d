use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use campaign_graph::controller::{LayoutController, LayoutOptions, NodePosition, NodeTypeConfig};
use campaign_graph::graph::{
    EntityLinks, GenericNode, GraphData, LinkExtractor, NodeExtractor, RawGraph,
    RawGraphExtractor, TreeExtractor,
};
use campaign_graph::physics::SimulationState;
use campaign_graph::spatial::QuadCell;
use clap::{Parser, ValueEnum};
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PayloadFormat {
    /// An entity with its linked characters, factions, locations, quests and notes.
    Links,
    /// A node with nested children.
    Tree,
    /// A flat node list plus connections.
    Graph,
}

/// Lay out a campaign entity graph and print the settled positions as JSON.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Payload file, or `-` for stdin.
    input: PathBuf,

    #[arg(long, value_enum, default_value_t = PayloadFormat::Graph)]
    format: PayloadFormat,

    /// Layout options as JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Node styles as JSON, keyed by entity type.
    #[arg(long)]
    styles: Option<PathBuf>,

    #[arg(long)]
    width: Option<f32>,

    #[arg(long)]
    height: Option<f32>,

    /// Keep nodes inside the frame.
    #[arg(long)]
    bounded: bool,

    #[arg(long)]
    max_ticks: Option<usize>,

    /// Hit-test a screen point after the layout settles, as `X,Y`.
    #[arg(long, value_parser = parse_point)]
    click: Option<(f32, f32)>,

    /// Include the spatial index cells in the output.
    #[arg(long)]
    cells: bool,

    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct NodeReport<'a> {
    #[serde(flatten)]
    position: &'a NodePosition,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
}

#[derive(Serialize)]
struct LayoutReport<'a> {
    state: SimulationState,
    ticks: usize,
    nodes: BTreeMap<&'a str, NodeReport<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clicked: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cells: Option<Vec<QuadCell>>,
}

fn parse_point(raw: &str) -> std::result::Result<(f32, f32), String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got `{raw}`"))?;
    let x = x
        .trim()
        .parse::<f32>()
        .map_err(|error| format!("invalid x `{x}`: {error}"))?;
    let y = y
        .trim()
        .parse::<f32>()
        .map_err(|error| format!("invalid y `{y}`: {error}"))?;
    Ok((x, y))
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read payload from stdin")?;
        return Ok(raw);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn extract_graph(format: PayloadFormat, raw: &str) -> Result<GraphData> {
    let graph = match format {
        PayloadFormat::Links => LinkExtractor.extract(&EntityLinks::from_json(raw)?),
        PayloadFormat::Tree => TreeExtractor.extract(&GenericNode::from_json(raw)?),
        PayloadFormat::Graph => RawGraphExtractor.extract(&RawGraph::from_json(raw)?),
    };
    Ok(graph)
}

fn load_options(args: &Args) -> Result<LayoutOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let raw = read_input(path)?;
            serde_json::from_str::<LayoutOptions>(&raw)
                .with_context(|| format!("failed to parse layout options in {}", path.display()))?
        }
        None => LayoutOptions::default(),
    };

    if let Some(width) = args.width {
        options.width = width;
    }
    if let Some(height) = args.height {
        options.height = height;
    }
    if args.bounded {
        options.show_controls = true;
    }
    if args.max_ticks.is_some() {
        options.max_ticks = args.max_ticks;
    }

    options
        .simulation
        .validate()
        .context("rejected simulation settings")?;
    Ok(options)
}

fn load_styles(path: Option<&Path>) -> Result<NodeTypeConfig> {
    let Some(path) = path else {
        return Ok(NodeTypeConfig::campaign());
    };
    let raw = read_input(path)?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse node styles in {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let options = load_options(&args)?;
    let styles = load_styles(args.styles.as_deref())?;

    let raw = read_input(&args.input)?;
    let graph = extract_graph(args.format, &raw)
        .with_context(|| format!("failed to decode {:?} payload", args.format))?;

    let mut controller = LayoutController::from_graph(graph, options).with_styles(styles);
    let ticks = controller.run(usize::MAX);
    log::info!(
        "laid out {} node(s) in {ticks} tick(s), final state {:?}",
        controller.node_count(),
        controller.state()
    );

    let clicked = args.click.and_then(|(x, y)| controller.click(x, y));
    let cells = args.cells.then(|| controller.cells());

    let nodes = controller
        .positions()
        .iter()
        .map(|(id, position)| {
            let style = controller.style_for(position.kind);
            (
                id.as_str(),
                NodeReport {
                    position,
                    color: style.map(|style| style.color.as_str()),
                    label: style.map(|style| style.label.as_str()),
                },
            )
        })
        .collect();

    let report = LayoutReport {
        state: controller.state(),
        ticks: controller.tick_count(),
        nodes,
        clicked,
        cells,
    };

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("failed to encode layout")?;
    println!("{json}");
    Ok(())
}
