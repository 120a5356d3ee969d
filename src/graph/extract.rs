use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::model::{Connection, EntityKind, GenericNode, GraphData};

/// Turns a domain payload into a [`GraphData`].
///
/// Implementations must not emit a connection whose endpoints are missing from
/// the node map.
pub trait NodeExtractor<P: ?Sized> {
    fn extract(&self, payload: &P) -> GraphData;
}

impl<P, F> NodeExtractor<P> for F
where
    P: ?Sized,
    F: Fn(&P) -> GraphData,
{
    fn extract(&self, payload: &P) -> GraphData {
        self(payload)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Entity plus everything linked to it, grouped by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityLinks {
    pub center: GenericNode,
    #[serde(default)]
    pub characters: Vec<EntityRef>,
    #[serde(default)]
    pub factions: Vec<EntityRef>,
    #[serde(default)]
    pub locations: Vec<EntityRef>,
    #[serde(default)]
    pub quests: Vec<EntityRef>,
    #[serde(default)]
    pub notes: Vec<EntityRef>,
}

impl EntityLinks {
    pub fn new(center: GenericNode) -> Self {
        Self {
            center,
            characters: Vec::new(),
            factions: Vec::new(),
            locations: Vec::new(),
            quests: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn linked(&self, kind: EntityKind) -> &[EntityRef] {
        match kind {
            EntityKind::Character => &self.characters,
            EntityKind::Faction => &self.factions,
            EntityKind::Location => &self.locations,
            EntityKind::Quest => &self.quests,
            EntityKind::Note => &self.notes,
        }
    }
}

/// Star layout: the centre entity connected to each linked entity.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinkExtractor;

impl NodeExtractor<EntityLinks> for LinkExtractor {
    fn extract(&self, payload: &EntityLinks) -> GraphData {
        extract_links(payload)
    }
}

pub fn extract_links(payload: &EntityLinks) -> GraphData {
    let mut graph = GraphData::new();
    let center = payload.center.detached();
    let center_id = center.id.clone();
    graph.insert_node(center);

    for kind in EntityKind::ALL {
        for linked in payload.linked(kind) {
            graph.insert_node(GenericNode::new(linked.id.clone(), linked.name.clone(), kind));
            graph.connect(center_id.clone(), linked.id.clone());
        }
    }

    graph
}

/// Hierarchy layout: every parent connected to each of its children.
#[derive(Clone, Copy, Debug, Default)]
pub struct TreeExtractor;

impl NodeExtractor<GenericNode> for TreeExtractor {
    fn extract(&self, payload: &GenericNode) -> GraphData {
        extract_tree(payload)
    }
}

pub fn extract_tree(root: &GenericNode) -> GraphData {
    let mut graph = GraphData::new();
    walk_tree(root, &mut graph);
    graph
}

fn walk_tree(node: &GenericNode, graph: &mut GraphData) {
    graph.insert_node(node.detached());
    for child in &node.children {
        walk_tree(child, graph);
        graph.connect(node.id.clone(), child.id.clone());
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGraph {
    #[serde(default)]
    pub nodes: Vec<GenericNode>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl RawGraph {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Passes a flat graph through, dropping connections to unknown ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawGraphExtractor;

impl NodeExtractor<RawGraph> for RawGraphExtractor {
    fn extract(&self, payload: &RawGraph) -> GraphData {
        let mut graph = GraphData::new();
        for node in &payload.nodes {
            // nested children are part of the flat graph too
            walk_tree(node, &mut graph);
        }
        graph.connections.extend(payload.connections.iter().cloned());
        let dropped = graph.drop_dangling_connections();
        if dropped > 0 {
            log::warn!("dropped {dropped} connection(s) referencing unknown node ids");
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn links() -> EntityLinks {
        let mut links = EntityLinks::new(GenericNode::new("c1", "Aria", EntityKind::Character));
        links.characters = vec![EntityRef::new("c2", "Bren"), EntityRef::new("c3", "Cato")];
        links.factions = vec![EntityRef::new("f1", "Ember Guild")];
        links.locations = vec![EntityRef::new("l1", "Saltmarsh")];
        links.quests = vec![EntityRef::new("q1", "The Drowned Bell")];
        links.notes = vec![EntityRef::new("n1", "Session 4")];
        links
    }

    fn edge_set(graph: &GraphData) -> BTreeSet<(String, String)> {
        graph
            .connections
            .iter()
            .map(|connection| (connection.from.clone(), connection.to.clone()))
            .collect()
    }

    #[test]
    fn links_fold_every_collection_into_a_star() {
        let graph = extract_links(&links());
        assert_eq!(graph.len(), 7);
        assert_eq!(graph.connections.len(), 6);
        assert!(graph.connections.iter().all(|connection| connection.from == "c1"));
        assert_eq!(graph.node("f1").unwrap().kind, EntityKind::Faction);
        assert_eq!(graph.node("n1").unwrap().kind, EntityKind::Note);
        assert_eq!(graph.dangling_connections().count(), 0);
    }

    #[test]
    fn links_deduplicate_nodes_but_keep_each_link() {
        let mut payload = links();
        payload.characters.push(EntityRef::new("c2", "Bren Ashford"));
        let graph = extract_links(&payload);

        assert_eq!(graph.len(), 7);
        assert_eq!(graph.node("c2").unwrap().name, "Bren Ashford");
        assert_eq!(
            graph
                .connections
                .iter()
                .filter(|connection| connection.to == "c2")
                .count(),
            2
        );
    }

    #[test]
    fn links_ignore_source_ordering() {
        let first = extract_links(&links());
        let mut shuffled = links();
        shuffled.characters.reverse();
        shuffled.characters.push(EntityRef::new("c2", "Bren"));
        shuffled.characters.rotate_left(1);
        let second = extract_links(&shuffled);

        assert_eq!(
            first.nodes.keys().collect::<Vec<_>>(),
            second.nodes.keys().collect::<Vec<_>>()
        );
        assert_eq!(edge_set(&first), edge_set(&second));
        assert_eq!(first, extract_links(&links()));
    }

    #[test]
    fn tree_connects_each_parent_to_its_children() {
        let root = GenericNode::new("world", "World", EntityKind::Location).with_children(vec![
            GenericNode::new("north", "North", EntityKind::Location).with_children(vec![
                GenericNode::new("keep", "Keep", EntityKind::Location),
                GenericNode::new("guard", "Guard", EntityKind::Faction),
            ]),
            GenericNode::new("south", "South", EntityKind::Location),
        ]);

        let graph = TreeExtractor.extract(&root);
        assert_eq!(graph.len(), 5);
        assert!(graph.nodes.values().all(|node| node.children.is_empty()));
        assert_eq!(
            edge_set(&graph),
            BTreeSet::from([
                ("north".to_owned(), "guard".to_owned()),
                ("north".to_owned(), "keep".to_owned()),
                ("world".to_owned(), "north".to_owned()),
                ("world".to_owned(), "south".to_owned()),
            ])
        );
    }

    #[test]
    fn closures_are_extractors() {
        let extractor = |names: &Vec<String>| {
            let mut graph = GraphData::new();
            for name in names {
                graph.insert_node(GenericNode::new(name.clone(), name.clone(), EntityKind::Note));
            }
            graph
        };
        let names = vec!["a".to_owned(), "b".to_owned(), "a".to_owned()];
        assert_eq!(extractor.extract(&names).len(), 2);
    }

    #[test]
    fn links_payload_decodes_from_json() {
        let payload = EntityLinks::from_json(
            r#"{
                "center": { "id": "c1", "name": "Aria", "type": "character" },
                "factions": [{ "id": "f1", "name": "Ember Guild" }]
            }"#,
        )
        .unwrap();
        assert_eq!(payload.factions.len(), 1);
        assert!(payload.quests.is_empty());

        let dragon = r#"{ "center": { "id": "x", "name": "X", "type": "dragon" } }"#;
        let error = EntityLinks::from_json(dragon).unwrap_err();
        assert!(error.to_string().starts_with("invalid graph payload"));
    }

    #[test]
    fn raw_graph_drops_dangling_connections() {
        let raw = RawGraph::from_json(
            r#"{
                "nodes": [
                    { "id": "a", "name": "A", "type": "quest" },
                    { "id": "b", "name": "B", "type": "note" }
                ],
                "connections": [
                    { "from": "a", "to": "b" },
                    { "from": "a", "to": "zz" }
                ]
            }"#,
        )
        .unwrap();
        let graph = RawGraphExtractor.extract(&raw);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.connections, vec![Connection::new("a", "b")]);
    }
}
