//! Owns a simulation for one graph and answers the host's questions about it:
//! where every node is and which node sits under a pointer.

mod interaction;
mod viewport;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::{EntityKind, GraphData, NodeExtractor};
use crate::physics::{ForceSimulation, SimulationConfig, SimulationState};
use crate::spatial::{Point, QuadCell, QuadTree, Rectangle};

pub use viewport::{MAX_ZOOM, MIN_ZOOM, Viewport};

const DEFAULT_WIDTH: f32 = 800.0;
const DEFAULT_HEIGHT: f32 = 600.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub width: f32,
    pub height: f32,
    /// Keeps every node inside the frame.
    pub show_controls: bool,
    pub hit_radius: f32,
    /// Safety bound for layouts that never settle. `None` runs until converged.
    pub max_ticks: Option<usize>,
    pub simulation: SimulationConfig,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            show_controls: false,
            hit_radius: 12.0,
            max_ticks: Some(5_000),
            simulation: SimulationConfig::default(),
        }
    }
}

impl LayoutOptions {
    pub fn frame(&self) -> Rectangle {
        let width = if self.width.is_finite() && self.width > 0.0 {
            self.width
        } else {
            DEFAULT_WIDTH
        };
        let height = if self.height.is_finite() && self.height > 0.0 {
            self.height
        } else {
            DEFAULT_HEIGHT
        };
        Rectangle::new(0.0, 0.0, width, height)
    }

    fn hit_radius(&self) -> f32 {
        if self.hit_radius.is_finite() {
            self.hit_radius.max(0.0)
        } else {
            0.0
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub color: String,
    pub label: String,
}

impl NodeStyle {
    pub fn new(color: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            label: label.into(),
        }
    }
}

/// Presentation lookup keyed by entity kind. Layout never reads it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeTypeConfig(BTreeMap<EntityKind, NodeStyle>);

impl NodeTypeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn campaign() -> Self {
        let mut styles = Self::new();
        styles.insert(EntityKind::Character, NodeStyle::new("#e07a5f", "Character"));
        styles.insert(EntityKind::Faction, NodeStyle::new("#81b29a", "Faction"));
        styles.insert(EntityKind::Location, NodeStyle::new("#3d85c6", "Location"));
        styles.insert(EntityKind::Quest, NodeStyle::new("#f2cc8f", "Quest"));
        styles.insert(EntityKind::Note, NodeStyle::new("#9e9e9e", "Note"));
        styles
    }

    pub fn insert(&mut self, kind: EntityKind, style: NodeStyle) {
        self.0.insert(kind, style);
    }

    pub fn style_for(&self, kind: EntityKind) -> Option<&NodeStyle> {
        self.0.get(&kind)
    }
}

/// Published per-node snapshot handed to the renderer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodePosition {
    pub x: f32,
    pub y: f32,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub name: String,
}

pub struct LayoutController {
    options: LayoutOptions,
    styles: NodeTypeConfig,
    graph: GraphData,
    simulation: ForceSimulation,
    positions: BTreeMap<String, NodePosition>,
    hit_index: QuadTree,
    viewport: Viewport,
    selected: Option<String>,
    on_node_click: Option<Box<dyn FnMut(&str)>>,
}

impl LayoutController {
    pub fn new<P, E>(payload: &P, extractor: &E, options: LayoutOptions) -> Self
    where
        P: ?Sized,
        E: NodeExtractor<P> + ?Sized,
    {
        Self::from_graph(extractor.extract(payload), options)
    }

    /// Takes ownership of an extracted graph. Connections with an unknown
    /// endpoint are dropped rather than failing the whole layout.
    pub fn from_graph(mut graph: GraphData, options: LayoutOptions) -> Self {
        let dropped = graph.drop_dangling_connections();
        if dropped > 0 {
            log::warn!("layout dropped {dropped} dangling connection(s)");
        }
        log::debug!(
            "loaded graph with {} node(s) and {} connection(s)",
            graph.len(),
            graph.connections.len()
        );

        let frame = options.frame();
        let simulation = ForceSimulation::new(
            &graph,
            frame,
            options.show_controls,
            options.simulation,
        );

        let mut controller = Self {
            options,
            styles: NodeTypeConfig::default(),
            graph,
            simulation,
            positions: BTreeMap::new(),
            hit_index: QuadTree::new(frame),
            viewport: Viewport::default(),
            selected: None,
            on_node_click: None,
        };
        controller.publish();
        controller
    }

    pub fn with_styles(mut self, styles: NodeTypeConfig) -> Self {
        self.styles = styles;
        self
    }

    pub fn on_node_click(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_node_click = Some(Box::new(callback));
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn graph(&self) -> &GraphData {
        &self.graph
    }

    pub fn simulation(&self) -> &ForceSimulation {
        &self.simulation
    }

    pub fn frame(&self) -> Rectangle {
        self.options.frame()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn state(&self) -> SimulationState {
        self.simulation.state()
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    pub fn tick_count(&self) -> usize {
        self.simulation.tick_count()
    }

    pub fn style_for(&self, kind: EntityKind) -> Option<&NodeStyle> {
        self.styles.style_for(kind)
    }

    pub fn start(&mut self) -> bool {
        self.simulation.start()
    }

    pub fn stop(&mut self) {
        self.simulation.stop();
    }

    /// Re-seeds from the original node set, discarding all simulation history.
    pub fn reset(&mut self) {
        self.simulation = ForceSimulation::new(
            &self.graph,
            self.options.frame(),
            self.options.show_controls,
            self.options.simulation,
        );
        self.publish();
        log::debug!("layout reset");
    }

    /// Advances the simulation by one tick and republishes positions.
    ///
    /// Anything but a running simulation makes this a silent no-op, so a
    /// driver may keep calling it after `stop`.
    pub fn tick(&mut self) -> bool {
        if self.simulation.state() != SimulationState::Running {
            return false;
        }
        if let Some(max_ticks) = self.options.max_ticks
            && self.simulation.tick_count() >= max_ticks
        {
            log::info!("layout hit the {max_ticks} tick bound before converging");
            self.simulation.stop();
            return false;
        }

        let running = self.simulation.tick();
        self.publish();
        running
    }

    /// Starts if needed and ticks serially until the layout stops running or
    /// `max_ticks` more ticks have been taken. Returns the ticks taken.
    pub fn run(&mut self, max_ticks: usize) -> usize {
        self.start();
        let before = self.simulation.tick_count();
        for _ in 0..max_ticks {
            if !self.tick() {
                break;
            }
        }
        self.simulation.tick_count() - before
    }

    pub fn positions(&self) -> &BTreeMap<String, NodePosition> {
        &self.positions
    }

    pub fn position(&self, id: &str) -> Option<&NodePosition> {
        self.positions.get(id)
    }

    pub fn hit_index(&self) -> &QuadTree {
        &self.hit_index
    }

    /// Cells of the tree the simulation builds from the current positions.
    pub fn cells(&self) -> Vec<QuadCell> {
        self.simulation.build_index().cells()
    }

    fn publish(&mut self) {
        self.positions.clear();
        for node in self.simulation.nodes() {
            let Some(meta) = self.graph.node(&node.id) else {
                continue;
            };
            self.positions.insert(
                node.id.clone(),
                NodePosition {
                    x: node.x(),
                    y: node.y(),
                    kind: meta.kind,
                    name: meta.name.clone(),
                },
            );
        }

        let boundary = Rectangle::bounding(
            self.positions.values().map(|position| (position.x, position.y)),
            self.options.hit_radius() + 1.0,
            1.0,
        )
        .unwrap_or_else(|| self.options.frame());

        self.hit_index = QuadTree::new(boundary);
        for (id, position) in &self.positions {
            if !self
                .hit_index
                .insert(Point::new(id.clone(), position.x, position.y))
            {
                log::warn!("hit index rejected node {id} at ({}, {})", position.x, position.y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::graph::GenericNode;

    fn graph() -> GraphData {
        let mut graph = GraphData::new();
        graph.insert_node(GenericNode::new("aria", "Aria Vell", EntityKind::Character));
        graph.insert_node(GenericNode::new("guild", "Ember Guild", EntityKind::Faction));
        graph.insert_node(GenericNode::new("port", "Saltmarsh", EntityKind::Location));
        graph.connect("aria", "guild");
        graph.connect("aria", "port");
        graph
    }

    #[test]
    fn empty_graph_never_ticks() {
        let mut controller =
            LayoutController::from_graph(GraphData::new(), LayoutOptions::default());
        assert_eq!(controller.node_count(), 0);
        assert!(!controller.start());
        assert!(!controller.tick());
        assert_eq!(controller.run(100), 0);
        assert_eq!(controller.state(), SimulationState::Seeded);
    }

    #[test]
    fn dangling_connections_are_dropped() {
        let mut data = graph();
        data.connect("aria", "nobody");
        let controller = LayoutController::from_graph(data, LayoutOptions::default());
        assert_eq!(controller.graph().connections.len(), 2);
        assert_eq!(controller.simulation().springs().len(), 2);
        assert_eq!(controller.node_count(), 3);
    }

    #[test]
    fn stopped_controller_ignores_ticks() {
        let mut controller = LayoutController::from_graph(graph(), LayoutOptions::default());
        assert!(controller.start());
        assert!(controller.tick());
        controller.stop();

        let before = controller.positions().clone();
        assert!(!controller.tick());
        assert!(!controller.tick());
        assert_eq!(controller.positions(), &before);
        assert_eq!(controller.tick_count(), 1);
    }

    #[test]
    fn reset_restores_the_seeded_layout() {
        let mut controller = LayoutController::from_graph(graph(), LayoutOptions::default());
        let seeded = controller.positions().clone();
        controller.run(25);
        assert_ne!(controller.positions(), &seeded);

        controller.reset();
        assert_eq!(controller.state(), SimulationState::Seeded);
        assert_eq!(controller.tick_count(), 0);
        assert_eq!(controller.positions(), &seeded);
    }

    #[test]
    fn tick_bound_stops_the_layout() {
        let options = LayoutOptions {
            max_ticks: Some(3),
            ..LayoutOptions::default()
        };
        let mut controller = LayoutController::from_graph(graph(), options);
        assert_eq!(controller.run(100), 3);
        assert_eq!(controller.state(), SimulationState::Stopped);
    }

    #[test]
    fn click_selects_and_reports_nodes() {
        let clicked = Rc::new(RefCell::new(Vec::new()));
        let mut controller = LayoutController::from_graph(graph(), LayoutOptions::default());
        let sink = Rc::clone(&clicked);
        controller.on_node_click(move |id| sink.borrow_mut().push(id.to_owned()));

        let guild = controller.position("guild").unwrap().clone();
        assert_eq!(controller.click(guild.x, guild.y).as_deref(), Some("guild"));
        assert_eq!(controller.selected(), Some("guild"));

        assert_eq!(controller.click(-5_000.0, -5_000.0), None);
        assert_eq!(controller.selected(), None);
        assert_eq!(*clicked.borrow(), vec!["guild".to_owned()]);
    }

    #[test]
    fn styles_are_looked_up_by_kind() {
        let controller = LayoutController::from_graph(graph(), LayoutOptions::default())
            .with_styles(NodeTypeConfig::campaign());
        assert_eq!(
            controller.style_for(EntityKind::Quest).map(|style| style.label.as_str()),
            Some("Quest")
        );
        assert!(
            LayoutController::from_graph(graph(), LayoutOptions::default())
                .style_for(EntityKind::Quest)
                .is_none()
        );
    }

    #[test]
    fn style_config_decodes_from_json() {
        let styles: NodeTypeConfig = serde_json::from_str(
            r##"{ "character": { "color": "#fff", "label": "Hero" } }"##,
        )
        .unwrap();
        assert_eq!(
            styles.style_for(EntityKind::Character),
            Some(&NodeStyle::new("#fff", "Hero"))
        );
        assert!(styles.style_for(EntityKind::Note).is_none());
    }

    #[test]
    fn invalid_frame_falls_back_to_defaults() {
        let options = LayoutOptions {
            width: f32::NAN,
            height: -10.0,
            ..LayoutOptions::default()
        };
        assert_eq!(options.frame(), Rectangle::new(0.0, 0.0, 800.0, 600.0));
    }
}
