use crate::{GraphError, Value};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Node identifiers are assigned by the editor and treated as opaque strings.
pub type NodeId = String;

/// Conventional port names. Any string is a legal port; these are the
/// ones most kinds agree on.
pub mod port {
    pub const INPUT: &str = "input";
    pub const REFERENCE: &str = "reference";
    pub const VALUE_INPUT: &str = "valueInput";
    pub const OUTPUT: &str = "output";
}

/// A pipeline graph: nodes plus directed data-flow edges.
///
/// The graph is a read-only snapshot for the duration of a run. Edges may
/// form cycles at construction time; acyclicity is checked when a run
/// starts, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub name: String,
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn add_node(&mut self, node: NodeSpec) -> NodeId {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    pub fn connect(
        &mut self,
        source: impl Into<NodeId>,
        source_port: impl Into<String>,
        target: impl Into<NodeId>,
        target_port: impl Into<String>,
    ) {
        self.edges.push(Edge {
            source: source.into(),
            source_port: source_port.into(),
            target: target.into(),
            target_port: target_port.into(),
        });
    }

    pub fn find_node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges whose target is the given node, in declaration order.
    pub fn incoming_edges<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    /// Check that every edge endpoint names a node in the graph.
    ///
    /// A dangling endpoint is a configuration error, fatal before any
    /// node executes.
    pub fn validate(&self) -> Result<(), GraphError> {
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(GraphError::UnknownNodeReference {
                        node_id: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A configured unit of work in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    /// Tag selecting the handler, e.g. "ifcNode", "filterNode".
    pub kind: String,
    /// Free-form configuration bag interpreted by the matching handler.
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl NodeSpec {
    pub fn new(id: impl Into<NodeId>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A directed data-flow connection between two node ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: NodeId,
    #[serde(default = "default_source_port")]
    pub source_port: String,
    pub target: NodeId,
    #[serde(default = "default_target_port")]
    pub target_port: String,
}

fn default_source_port() -> String {
    port::OUTPUT.to_string()
}

fn default_target_port() -> String {
    port::INPUT.to_string()
}
