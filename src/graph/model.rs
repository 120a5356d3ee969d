use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Closed set of entity kinds a campaign graph can contain.
///
/// Only the adapters and the caller's style lookup look at this tag; layout
/// treats it as an opaque label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Character,
    Faction,
    Location,
    Quest,
    Note,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        Self::Character,
        Self::Faction,
        Self::Location,
        Self::Quest,
        Self::Note,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Faction => "faction",
            Self::Location => "location",
            Self::Quest => "quest",
            Self::Note => "note",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenericNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<GenericNode>,
}

impl GenericNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn with_children(mut self, children: Vec<GenericNode>) -> Self {
        self.children = children;
        self
    }

    pub fn detached(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            children: Vec::new(),
        }
    }
}

/// Edge between two node ids. Duplicates and self-connections are allowed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
}

impl Connection {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

/// Domain-neutral graph: nodes keyed by id plus the connections between them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
    pub nodes: BTreeMap<String, GenericNode>,
    pub connections: Vec<Connection>,
}

impl GraphData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GenericNode> {
        self.nodes.get(id)
    }

    /// Adds or replaces the node with the same id.
    pub fn insert_node(&mut self, node: GenericNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn connect(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.connections.push(Connection::new(from, to));
    }

    /// Connections naming an id that is not a node.
    pub fn dangling_connections(&self) -> impl Iterator<Item = &Connection> + '_ {
        self.connections.iter().filter(|connection| {
            !self.nodes.contains_key(&connection.from) || !self.nodes.contains_key(&connection.to)
        })
    }

    pub fn drop_dangling_connections(&mut self) -> usize {
        let before = self.connections.len();
        let nodes = &self.nodes;
        self.connections.retain(|connection| {
            nodes.contains_key(&connection.from) && nodes.contains_key(&connection.to)
        });
        before - self.connections.len()
    }

    /// Ids directly connected to `id` in either direction, sorted and deduplicated.
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let mut neighbors = self
            .connections
            .iter()
            .filter_map(|connection| {
                if connection.is_self_loop() {
                    None
                } else if connection.from == id {
                    Some(connection.to.as_str())
                } else if connection.to == id {
                    Some(connection.from.as_str())
                } else {
                    None
                }
            })
            .filter(|neighbor| self.nodes.contains_key(*neighbor))
            .collect::<Vec<_>>();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }
}
