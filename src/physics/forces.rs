use glam::{Vec2, vec2};

use crate::spatial::{Point, QuadTree};

use super::SimulationConfig;

#[derive(Clone, Copy)]
pub(super) struct RepulsionParams {
    kernel: SimulationConfig,
    cutoff: f32,
    collision_distance: f32,
    collision_strength: f32,
    min_distance: f32,
}

impl RepulsionParams {
    pub(super) fn from_config(config: &SimulationConfig) -> Self {
        Self {
            kernel: *config,
            cutoff: config.repulsion_cutoff,
            collision_distance: config.collision_radius * 2.0,
            collision_strength: config.collision_strength,
            min_distance: config.min_distance,
        }
    }
}

#[derive(Clone, Copy)]
pub(super) struct SpringParams {
    pub(super) strength: f32,
    pub(super) damping: f32,
    pub(super) target_length: f32,
    pub(super) min_distance: f32,
}

/// Unit vector from `other` towards `index` and their floored distance.
///
/// Coincident nodes get a direction derived from the index pair; swapping the
/// pair flips it, so the two nodes are pushed in opposite directions.
pub(super) fn separation(
    index: usize,
    other: usize,
    delta: Vec2,
    min_distance: f32,
) -> (Vec2, f32) {
    let distance = delta.length();
    let direction = if distance > 0.0001 {
        delta / distance
    } else {
        let (low, high, sign) = if index < other {
            (index, other, 1.0)
        } else {
            (other, index, -1.0)
        };
        let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214 + 0.37)
            * std::f32::consts::TAU;
        vec2(angle.cos(), angle.sin()) * sign
    };
    (direction, distance.max(min_distance))
}

fn repulsion_between(
    index: usize,
    other: usize,
    point_a: Vec2,
    point_b: Vec2,
    params: RepulsionParams,
) -> Vec2 {
    let (direction, distance) = separation(index, other, point_a - point_b, params.min_distance);
    let mut force = direction * params.kernel.repulsion_at(distance);

    if distance < params.collision_distance {
        force += direction * ((params.collision_distance - distance) * params.collision_strength);
    }

    force
}

/// Sums repulsion on node `index` from every node within the cutoff radius.
pub(super) fn accumulate_repulsion_for_node<'a>(
    tree: &'a QuadTree<usize>,
    index: usize,
    positions: &[Vec2],
    params: RepulsionParams,
    neighbors: &mut Vec<&'a Point<usize>>,
    force: &mut Vec2,
) {
    let point = positions[index];
    neighbors.clear();
    tree.query_circle_into(point.x, point.y, params.cutoff, neighbors);

    for neighbor in neighbors.iter() {
        if neighbor.id == index {
            continue;
        }
        *force += repulsion_between(index, neighbor.id, point, positions[neighbor.id], params);
    }
}

/// Hooke spring along an edge plus damping of the endpoints' relative
/// velocity. Returns the force on `from`; `to` receives the negation.
pub(super) fn spring_between(
    from: usize,
    to: usize,
    positions: &[Vec2],
    velocities: &[Vec2],
    params: SpringParams,
) -> Vec2 {
    let (direction, distance) = separation(
        from,
        to,
        positions[from] - positions[to],
        params.min_distance,
    );

    let spring = (distance - params.target_length) * params.strength;
    let relative_velocity = velocities[from] - velocities[to];
    let damping_force = relative_velocity.dot(direction) * params.damping;

    -(direction * (spring + damping_force))
}
