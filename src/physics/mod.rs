//! Force-directed layout integrator.
//!
//! Each tick rebuilds a [`QuadTree`] from the current positions and uses
//! circular queries so repulsion only considers nodes within the cutoff radius.
//! Springs act along connections, a weak pull keeps the layout near the
//! viewport centre, and damping below one lets it settle.

mod config;
mod forces;

use std::collections::HashMap;
use std::f32::consts::TAU;

use glam::{Vec2, vec2};
use serde::Serialize;

use crate::graph::GraphData;
use crate::spatial::{Point, QuadTree, Rectangle};
use crate::util::stable_pair;

pub use config::SimulationConfig;
use forces::{RepulsionParams, SpringParams, accumulate_repulsion_for_node, spring_between};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationState {
    /// Positions initialised, nothing integrated yet.
    Seeded,
    Running,
    /// Kinetic energy stayed under the threshold long enough.
    Converged,
    /// Cancelled by the host. Terminal.
    Stopped,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationNode {
    pub id: String,
    pub position: Vec2,
    pub velocity: Vec2,
}

impl SimulationNode {
    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }
}

struct PhysicsScratch {
    forces: Vec<Vec2>,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
}

pub struct ForceSimulation {
    config: SimulationConfig,
    viewport: Rectangle,
    bounded: bool,
    nodes: Vec<SimulationNode>,
    springs: Vec<(usize, usize)>,
    degrees: Vec<usize>,
    index_by_id: HashMap<String, usize>,
    state: SimulationState,
    tick_count: usize,
    calm_ticks: usize,
    kinetic_energy: f32,
    scratch: PhysicsScratch,
}

impl ForceSimulation {
    /// Seeds one node per graph node around the viewport centre.
    ///
    /// Connections naming unknown ids are dropped with a warning.
    /// Self-connections are kept out of the spring list.
    pub fn new(
        graph: &GraphData,
        viewport: Rectangle,
        bounded: bool,
        config: SimulationConfig,
    ) -> Self {
        let config = config.sanitized();
        let node_count = graph.nodes.len();
        let mut nodes = Vec::with_capacity(node_count);
        let mut index_by_id = HashMap::with_capacity(node_count);

        for (index, id) in graph.nodes.keys().enumerate() {
            let position = seed_position(&config, viewport, id, index, node_count);
            index_by_id.insert(id.clone(), index);
            nodes.push(SimulationNode {
                id: id.clone(),
                position,
                velocity: Vec2::ZERO,
            });
        }

        let mut springs = Vec::with_capacity(graph.connections.len());
        let mut dropped = 0usize;
        for connection in &graph.connections {
            match (
                index_by_id.get(&connection.from),
                index_by_id.get(&connection.to),
            ) {
                (Some(&from), Some(&to)) if from != to => springs.push((from, to)),
                (Some(_), Some(_)) => {}
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            log::warn!("dropped {dropped} connection(s) with an endpoint missing from the graph");
        }

        let mut degrees = vec![0usize; node_count];
        for &(from, to) in &springs {
            degrees[from] += 1;
            degrees[to] += 1;
        }

        let mut simulation = Self {
            config,
            viewport,
            bounded,
            nodes,
            springs,
            degrees,
            index_by_id,
            state: SimulationState::Seeded,
            tick_count: 0,
            calm_ticks: 0,
            kinetic_energy: 0.0,
            scratch: PhysicsScratch {
                forces: Vec::new(),
                positions: Vec::new(),
                velocities: Vec::new(),
            },
        };
        if bounded {
            simulation.clamp_to_viewport();
        }

        log::debug!(
            "seeded simulation with {} node(s) and {} spring(s)",
            simulation.nodes.len(),
            simulation.springs.len()
        );
        simulation
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn viewport(&self) -> Rectangle {
        self.viewport
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn nodes(&self) -> &[SimulationNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&SimulationNode> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn springs(&self) -> &[(usize, usize)] {
        &self.springs
    }

    pub fn tick_count(&self) -> usize {
        self.tick_count
    }

    pub fn kinetic_energy(&self) -> f32 {
        self.kinetic_energy
    }

    /// Moves from `Seeded` to `Running`. Graphs with fewer than two nodes
    /// never run. Returns whether the simulation is running afterwards.
    pub fn start(&mut self) -> bool {
        if self.state == SimulationState::Seeded && self.nodes.len() >= 2 {
            self.state = SimulationState::Running;
            log::debug!("simulation running");
        }
        self.state == SimulationState::Running
    }

    pub fn stop(&mut self) {
        if self.state != SimulationState::Stopped {
            log::info!("simulation stopped after {} tick(s)", self.tick_count);
        }
        self.state = SimulationState::Stopped;
    }

    /// Places a node and zeroes its velocity. A converged layout starts
    /// running again so the rest of the graph can respond.
    pub fn set_position(&mut self, id: &str, x: f32, y: f32) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            return false;
        };
        if !x.is_finite() || !y.is_finite() {
            return false;
        }

        let mut position = vec2(x, y);
        if self.bounded {
            let (x, y) = self.viewport.clamp(position.x, position.y);
            position = vec2(x, y);
        }

        let node = &mut self.nodes[index];
        node.position = position;
        node.velocity = Vec2::ZERO;
        self.calm_ticks = 0;
        if self.state == SimulationState::Converged {
            self.state = SimulationState::Running;
        }
        true
    }

    pub fn build_index(&self) -> QuadTree<usize> {
        let boundary = index_boundary(&self.nodes, self.viewport, self.bounded, &self.config);
        index_nodes(&self.nodes, boundary, self.config.quadtree_capacity)
    }

    /// Advances one step. No-op unless running. Returns whether the
    /// simulation is still running afterwards.
    pub fn tick(&mut self) -> bool {
        if self.state != SimulationState::Running {
            return false;
        }

        self.step();
        self.tick_count += 1;

        if self.kinetic_energy < self.config.convergence_threshold {
            self.calm_ticks += 1;
        } else {
            self.calm_ticks = 0;
        }

        if self.calm_ticks >= self.config.convergence_ticks {
            self.state = SimulationState::Converged;
            log::info!(
                "layout converged after {} tick(s), kinetic energy {:.6}",
                self.tick_count,
                self.kinetic_energy
            );
        }

        self.state == SimulationState::Running
    }

    fn step(&mut self) {
        let node_count = self.nodes.len();
        let config = self.config;
        let dt = config.time_step;

        let tree = self.build_index();

        let scratch = &mut self.scratch;
        scratch.forces.clear();
        scratch.forces.resize(node_count, Vec2::ZERO);
        scratch.positions.clear();
        scratch.velocities.clear();
        for node in &self.nodes {
            scratch.positions.push(node.position);
            scratch.velocities.push(node.velocity);
        }

        let forces = &mut scratch.forces;
        let positions = &scratch.positions;
        let velocities = &scratch.velocities;

        let repulsion = RepulsionParams::from_config(&config);
        let mut neighbors = Vec::new();
        for (index, force) in forces.iter_mut().enumerate() {
            accumulate_repulsion_for_node(
                &tree,
                index,
                positions,
                repulsion,
                &mut neighbors,
                force,
            );
        }

        let spring = SpringParams {
            strength: config.spring_strength,
            damping: config.spring_damping,
            target_length: config.target_edge_length,
            min_distance: config.min_distance,
        };
        for &(from, to) in &self.springs {
            // damping is shared across edges so a hub sees at most `spring_damping` in total
            let degree = self.degrees[from].max(self.degrees[to]).max(1);
            let params = SpringParams {
                damping: spring.damping / degree as f32,
                ..spring
            };
            let correction = spring_between(from, to, positions, velocities, params);
            forces[from] += correction;
            forces[to] -= correction;
        }

        let (center_x, center_y) = self.viewport.center();
        let center = vec2(center_x, center_y);
        if config.center_pull > 0.0 {
            for (force, position) in forces.iter_mut().zip(positions.iter()) {
                *force -= (*position - center) * config.center_pull;
            }
        }

        let sleep_speed_sq = config.sleep_speed * config.sleep_speed;
        let sleep_force_sq = config.sleep_force * config.sleep_force;
        for (node, force) in self.nodes.iter_mut().zip(forces.iter()) {
            let force = force.clamp_length_max(config.max_force);
            let mut velocity = ((node.velocity + (force * dt)) * config.damping)
                .clamp_length_max(config.max_speed);

            if velocity.length_squared() < sleep_speed_sq && force.length_squared() < sleep_force_sq
            {
                velocity = Vec2::ZERO;
            }

            node.velocity = velocity;
            node.position += velocity * dt;
        }

        if config.recenter {
            self.recenter(center);
        }
        if self.bounded {
            self.clamp_to_viewport();
        }
        self.recover_non_finite(center);

        self.kinetic_energy = self
            .nodes
            .iter()
            .map(|node| node.velocity.length_squared())
            .sum();
    }

    fn recenter(&mut self, center: Vec2) {
        let node_count = self.nodes.len() as f32;

        let mut average_velocity = Vec2::ZERO;
        let mut centroid = Vec2::ZERO;
        for node in &self.nodes {
            average_velocity += node.velocity;
            centroid += node.position;
        }
        average_velocity /= node_count;
        centroid /= node_count;

        let shift = center - centroid;
        if !average_velocity.is_finite() || !shift.is_finite() {
            return;
        }

        for node in &mut self.nodes {
            node.velocity -= average_velocity;
            node.position += shift;
        }
    }

    fn clamp_to_viewport(&mut self) {
        for node in &mut self.nodes {
            let (x, y) = self.viewport.clamp(node.position.x, node.position.y);
            if x != node.position.x {
                node.velocity.x = 0.0;
            }
            if y != node.position.y {
                node.velocity.y = 0.0;
            }
            node.position = vec2(x, y);
        }
    }

    fn recover_non_finite(&mut self, center: Vec2) {
        for node in &mut self.nodes {
            if node.position.is_finite() && node.velocity.is_finite() {
                continue;
            }
            log::warn!("node {} left finite space, resetting to the centre", node.id);
            node.position = center;
            node.velocity = Vec2::ZERO;
        }
    }
}

fn index_boundary(
    nodes: &[SimulationNode],
    viewport: Rectangle,
    bounded: bool,
    config: &SimulationConfig,
) -> Rectangle {
    if bounded {
        return viewport;
    }

    Rectangle::bounding(
        nodes.iter().map(|node| (node.position.x, node.position.y)),
        config.boundary_margin,
        1.0,
    )
    .unwrap_or(viewport)
}

fn index_nodes(nodes: &[SimulationNode], boundary: Rectangle, capacity: usize) -> QuadTree<usize> {
    let mut tree = QuadTree::with_capacity(boundary, capacity);
    for (index, node) in nodes.iter().enumerate() {
        if !tree.insert(Point::new(index, node.position.x, node.position.y)) {
            log::warn!(
                "node {} at ({}, {}) fell outside the index boundary {:?}",
                node.id,
                node.position.x,
                node.position.y,
                boundary
            );
        }
    }
    tree
}

fn seed_position(
    config: &SimulationConfig,
    viewport: Rectangle,
    id: &str,
    index: usize,
    node_count: usize,
) -> Vec2 {
    let (center_x, center_y) = viewport.center();
    let center = vec2(center_x, center_y);
    if node_count <= 1 {
        return center;
    }

    let angle = (index as f32 / node_count as f32) * TAU;
    let radius = config.seed_radius * (node_count as f32).sqrt();
    let (jx, jy) = stable_pair(config.seed, id);
    let jitter = vec2(jx, jy) * (config.seed_radius * 0.5);
    center + (vec2(angle.cos(), angle.sin()) * radius) + jitter
}
