//! Domain payload to neutral graph mapping.

mod extract;
mod model;

pub use extract::{
    EntityLinks, EntityRef, LinkExtractor, NodeExtractor, RawGraph, RawGraphExtractor,
    TreeExtractor, extract_links, extract_tree,
};
pub use model::{Connection, EntityKind, GenericNode, GraphData};
