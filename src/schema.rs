//! Schema Draft Model
//!
//! The node/edge document handed to the diagram editor. Field names and
//! defaults follow what the editor's node-link canvas expects.

use serde::{Deserialize, Serialize};

pub const DEFAULT_NODE_KIND: &str = "defaultNodeKind";
pub const DEFAULT_EDGE_KIND: &str = "defaultEdgeKind";

/// The four element kinds the model is asked to produce.
///
/// `NodeData::category` stays a plain string: anything the model returns is
/// passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeCategory {
    #[default]
    EntityType,
    ConceptType,
    Relation,
    EventType,
}

impl NodeCategory {
    pub const ALL: [NodeCategory; 4] = [
        NodeCategory::EntityType,
        NodeCategory::ConceptType,
        NodeCategory::Relation,
        NodeCategory::EventType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeCategory::EntityType => "EntityType",
            NodeCategory::ConceptType => "ConceptType",
            NodeCategory::Relation => "Relation",
            NodeCategory::EventType => "EventType",
        }
    }

    /// Lookup by exact name. Returns `None` for anything outside the four kinds.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    /// Diagonal layout used when the model gives no coordinates.
    pub fn diagonal(index: usize) -> Self {
        let i = index as i64;
        Self {
            x: 100 + 150 * i,
            y: 100 + 100 * i,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeData {
    pub label: String,
    pub category: String,
    #[serde(default)]
    pub props: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", default = "default_node_kind")]
    pub kind: String,
    pub data: NodeData,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    #[serde(default = "default_animated")]
    pub animated: bool,
    #[serde(rename = "type", default = "default_edge_kind")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchemaDraft {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl SchemaDraft {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Fallback `type` values for nodes and edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftDefaults {
    pub node_kind: String,
    pub edge_kind: String,
}

impl Default for DraftDefaults {
    fn default() -> Self {
        Self {
            node_kind: DEFAULT_NODE_KIND.to_string(),
            edge_kind: DEFAULT_EDGE_KIND.to_string(),
        }
    }
}

fn default_node_kind() -> String {
    DEFAULT_NODE_KIND.to_string()
}

fn default_edge_kind() -> String {
    DEFAULT_EDGE_KIND.to_string()
}

fn default_animated() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_serializes_kind_as_type() {
        let node = Node {
            id: "e1".to_string(),
            kind: "cyberNode".to_string(),
            data: NodeData {
                label: "Supplier".to_string(),
                category: "EntityType".to_string(),
                props: vec!["name".to_string()],
            },
            position: Position { x: 100, y: 100 },
        };
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "cyberNode");
        assert!(value.get("kind").is_none());
        assert_eq!(value["position"], json!({ "x": 100, "y": 100 }));
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let draft: SchemaDraft = serde_json::from_value(json!({
            "nodes": [{
                "id": "n1",
                "data": { "label": "Order", "category": "EntityType" },
                "position": { "x": 1, "y": 2 }
            }],
            "edges": [{ "id": "l1", "source": "n1", "target": "ghost", "label": "has" }]
        }))
        .unwrap();

        assert_eq!(draft.nodes[0].kind, DEFAULT_NODE_KIND);
        assert!(draft.nodes[0].data.props.is_empty());
        assert!(draft.edges[0].animated);
        assert_eq!(draft.edges[0].kind, DEFAULT_EDGE_KIND);
    }

    #[test]
    fn test_diagonal_positions() {
        assert_eq!(Position::diagonal(0), Position { x: 100, y: 100 });
        assert_eq!(Position::diagonal(1), Position { x: 250, y: 200 });
        assert_eq!(Position::diagonal(3), Position { x: 550, y: 400 });
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(NodeCategory::parse("EventType"), Some(NodeCategory::EventType));
        assert_eq!(NodeCategory::parse("eventtype"), None);
        assert_eq!(NodeCategory::default().as_str(), "EntityType");
    }
}
