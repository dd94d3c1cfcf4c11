//! Core abstractions for the BIM pipeline engine
//!
//! This crate provides the graph model, the dynamic value type flowing
//! along edges, the handler trait that node kinds implement, and the
//! event side channel. It contains no execution logic.

mod error;
mod events;
mod graph;
mod handler;
mod model;
mod value;

pub use error::{EngineError, GraphError, HandlerError};
pub use events::{EventBus, NodeSink, NodeStatusPatch, RunEvent, RunId};
pub use graph::{port, Edge, Graph, NodeId, NodeSpec};
pub use handler::{ElementsInput, HandlerContext, NodeHandler};
pub use model::{BoundingBox, Clash, ClashSet, Classification, Element, Model, QuantityReport};
pub use value::Value;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
