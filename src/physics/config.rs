use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::spatial::DEFAULT_CAPACITY;

/// Tunables for [`ForceSimulation`](super::ForceSimulation).
///
/// Distances are in world units, forces in world units per tick².
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Numerator of the softened inverse-square repulsion `R / (d² + s)`.
    pub repulsion_strength: f32,
    pub repulsion_softening: f32,
    /// Nodes farther apart than this do not repel each other.
    pub repulsion_cutoff: f32,
    pub collision_radius: f32,
    pub collision_strength: f32,
    pub spring_strength: f32,
    pub spring_damping: f32,
    pub target_edge_length: f32,
    pub center_pull: f32,
    /// Velocity multiplier per tick, strictly below 1.
    pub damping: f32,
    pub time_step: f32,
    /// Separation floor used by every distance-dependent force.
    pub min_distance: f32,
    pub max_force: f32,
    pub max_speed: f32,
    pub sleep_speed: f32,
    pub sleep_force: f32,
    /// Sum of squared velocities under which a tick counts as calm.
    pub convergence_threshold: f32,
    /// Consecutive calm ticks before the layout is considered converged.
    pub convergence_ticks: usize,
    pub quadtree_capacity: usize,
    pub boundary_margin: f32,
    /// Keep the centroid on the viewport centre and cancel net drift.
    pub recenter: bool,
    pub seed: u64,
    pub seed_radius: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            repulsion_strength: 2_000.0,
            repulsion_softening: 100.0,
            repulsion_cutoff: 300.0,
            collision_radius: 8.0,
            collision_strength: 0.5,
            spring_strength: 0.08,
            spring_damping: 0.1,
            target_edge_length: 100.0,
            center_pull: 0.001,
            damping: 0.85,
            time_step: 1.0,
            min_distance: 0.5,
            max_force: 60.0,
            max_speed: 30.0,
            sleep_speed: 0.01,
            sleep_force: 0.02,
            convergence_threshold: 0.01,
            convergence_ticks: 10,
            quadtree_capacity: DEFAULT_CAPACITY,
            boundary_margin: 50.0,
            recenter: true,
            seed: 0,
            seed_radius: 60.0,
        }
    }
}

fn finite(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidConfig {
            field,
            reason: format!("must be finite, got {value}"),
        })
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig {
            field,
            reason: format!("must be greater than zero, got {value}"),
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig {
            field,
            reason: format!("must not be negative, got {value}"),
        })
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        non_negative("repulsion_strength", self.repulsion_strength)?;
        non_negative("repulsion_softening", self.repulsion_softening)?;
        positive("repulsion_cutoff", self.repulsion_cutoff)?;
        non_negative("collision_radius", self.collision_radius)?;
        non_negative("collision_strength", self.collision_strength)?;
        non_negative("spring_strength", self.spring_strength)?;
        non_negative("spring_damping", self.spring_damping)?;
        positive("target_edge_length", self.target_edge_length)?;
        non_negative("center_pull", self.center_pull)?;
        positive("damping", self.damping)?;
        if self.damping >= 1.0 {
            return Err(Error::InvalidConfig {
                field: "damping",
                reason: format!("must be below 1 for the layout to settle, got {}", self.damping),
            });
        }
        positive("time_step", self.time_step)?;
        positive("min_distance", self.min_distance)?;
        positive("max_force", self.max_force)?;
        positive("max_speed", self.max_speed)?;
        non_negative("sleep_speed", self.sleep_speed)?;
        non_negative("sleep_force", self.sleep_force)?;
        non_negative("convergence_threshold", self.convergence_threshold)?;
        non_negative("boundary_margin", self.boundary_margin)?;
        non_negative("seed_radius", self.seed_radius)?;
        if self.convergence_ticks == 0 {
            return Err(Error::InvalidConfig {
                field: "convergence_ticks",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.quadtree_capacity == 0 {
            return Err(Error::InvalidConfig {
                field: "quadtree_capacity",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    /// Copy with every value forced into a range the integrator can run with.
    /// Non-finite values fall back to the defaults.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let pick = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };

        Self {
            repulsion_strength: pick(self.repulsion_strength, defaults.repulsion_strength)
                .max(0.0),
            repulsion_softening: pick(self.repulsion_softening, defaults.repulsion_softening)
                .max(0.0),
            repulsion_cutoff: pick(self.repulsion_cutoff, defaults.repulsion_cutoff).max(1.0),
            collision_radius: pick(self.collision_radius, defaults.collision_radius).max(0.0),
            collision_strength: pick(self.collision_strength, defaults.collision_strength)
                .clamp(0.0, 4.0),
            spring_strength: pick(self.spring_strength, defaults.spring_strength).clamp(0.0, 0.4),
            spring_damping: pick(self.spring_damping, defaults.spring_damping).clamp(0.0, 0.45),
            target_edge_length: pick(self.target_edge_length, defaults.target_edge_length)
                .max(1.0),
            center_pull: pick(self.center_pull, defaults.center_pull).clamp(0.0, 0.1),
            damping: pick(self.damping, defaults.damping).clamp(0.05, 0.99),
            time_step: pick(self.time_step, defaults.time_step).clamp(0.05, 3.0),
            min_distance: pick(self.min_distance, defaults.min_distance).max(0.001),
            max_force: pick(self.max_force, defaults.max_force).max(0.001),
            max_speed: pick(self.max_speed, defaults.max_speed).max(0.001),
            sleep_speed: pick(self.sleep_speed, defaults.sleep_speed).max(0.0),
            sleep_force: pick(self.sleep_force, defaults.sleep_force).max(0.0),
            convergence_threshold: pick(
                self.convergence_threshold,
                defaults.convergence_threshold,
            )
            .max(0.0),
            convergence_ticks: self.convergence_ticks.max(1),
            quadtree_capacity: self.quadtree_capacity.max(1),
            boundary_margin: pick(self.boundary_margin, defaults.boundary_margin).max(0.0),
            recenter: self.recenter,
            seed: self.seed,
            seed_radius: pick(self.seed_radius, defaults.seed_radius).max(0.0),
        }
    }

    /// Repulsion magnitude at separation `distance`, continuous and zero at the cutoff.
    pub fn repulsion_at(&self, distance: f32) -> f32 {
        if distance > self.repulsion_cutoff {
            return 0.0;
        }
        let distance = distance.max(self.min_distance);
        let raw = self.repulsion_strength / ((distance * distance) + self.repulsion_softening);
        (raw - self.repulsion_offset()).max(0.0)
    }

    fn repulsion_offset(&self) -> f32 {
        let cutoff = self.repulsion_cutoff;
        let denominator = (cutoff * cutoff) + self.repulsion_softening;
        if denominator > 0.0 {
            self.repulsion_strength / denominator
        } else {
            0.0
        }
    }
}
