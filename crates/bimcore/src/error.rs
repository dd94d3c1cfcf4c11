use crate::NodeId;
use thiserror::Error;

/// Top-level error returned by `execute()` and the runtime facade.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("A run is already in progress")]
    AlreadyRunning,

    #[error("Node '{node_id}' failed: {source}")]
    NodeFailed {
        node_id: NodeId,
        #[source]
        source: HandlerError,
    },

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Structural problems with the graph itself, detected before or during
/// input resolution. All fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Cyclic graph detected")]
    CyclicGraph,

    #[error("Edge references unknown node '{node_id}'")]
    UnknownNodeReference { node_id: NodeId },

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Graph not found: {0}")]
    GraphNotFound(String),
}

/// Errors raised inside a node handler. Any of these aborts the whole
/// run; a handler wanting a non-fatal failure returns the soft-error
/// sentinel value instead.
#[derive(Error, Debug, Clone)]
pub enum HandlerError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{port}': expected {expected}, got {actual}")]
    InvalidInputType {
        port: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Cancelled")]
    Cancelled,
}
