//! Force-directed layout for campaign entity graphs.
//!
//! A domain payload goes through a [`NodeExtractor`] into a neutral
//! [`GraphData`], a [`ForceSimulation`] settles it using a [`QuadTree`] for
//! neighbour queries, and a [`LayoutController`] drives ticks and hit-tests
//! pointer input against the published positions.

#![forbid(unsafe_code)]

pub mod controller;
pub mod error;
pub mod graph;
pub mod physics;
pub mod spatial;
mod util;

pub use controller::{
    LayoutController, LayoutOptions, NodePosition, NodeStyle, NodeTypeConfig, Viewport,
};
pub use error::{Error, Result};
pub use graph::{Connection, EntityKind, GenericNode, GraphData, NodeExtractor};
pub use physics::{ForceSimulation, SimulationConfig, SimulationNode, SimulationState};
pub use spatial::{Point, QuadTree, Rectangle};
