use crate::{HandlerError, NodeId, NodeSink, Value};
use async_trait::async_trait;
use std::collections::HashMap;

/// Trait implemented by every node kind.
///
/// Both pure transforms and collaborator-backed operations use the same
/// async signature; a synchronous kind simply returns without awaiting.
/// Returning `Err` aborts the whole run. A non-fatal failure is
/// expressed by returning `Value::Error { .. }`, which is cached and
/// flows downstream like any other value.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Kind tag this handler is registered under, e.g. "filterNode".
    fn kind(&self) -> &str;

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError>;

    /// Optional load-time check of a node's configuration bag.
    fn validate_properties(&self, _properties: &HashMap<String, Value>) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Everything a handler gets for one dispatch: resolved inputs, the
/// node's configuration, the progress sink, and the run's cancellation
/// token. Long-running handlers should poll the token; cancellation is
/// cooperative only.
pub struct HandlerContext {
    pub node_id: NodeId,
    pub properties: HashMap<String, Value>,
    pub inputs: HashMap<String, Value>,
    pub sink: NodeSink,
    pub cancellation: tokio_util::sync::CancellationToken,
}

impl HandlerContext {
    pub fn require_input(&self, port: &str) -> Result<&Value, HandlerError> {
        self.inputs
            .get(port)
            .ok_or_else(|| HandlerError::MissingInput(port.to_string()))
    }

    pub fn input(&self, port: &str) -> Option<&Value> {
        self.inputs.get(port)
    }

    pub fn require_property(&self, name: &str) -> Result<&Value, HandlerError> {
        self.properties
            .get(name)
            .ok_or_else(|| HandlerError::Configuration(format!("Missing property: {}", name)))
    }

    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    pub fn property_f64(&self, name: &str) -> Option<f64> {
        self.properties.get(name).and_then(Value::as_f64)
    }

    pub fn property_bool(&self, name: &str) -> Option<bool> {
        self.properties.get(name).and_then(Value::as_bool)
    }

    /// Typed accessor for element-list inputs, with the soft-error
    /// sentinel surfaced separately so handlers can pass it through.
    pub fn elements_input(&self, port: &str) -> Result<ElementsInput<'_>, HandlerError> {
        let value = self.require_input(port)?;
        match value {
            Value::Error { .. } => Ok(ElementsInput::SoftError(value.clone())),
            Value::Elements(elements) => Ok(ElementsInput::Elements(elements)),
            other => Err(HandlerError::InvalidInputType {
                port: port.to_string(),
                expected: "elements".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }
}

/// An element-list input, or the upstream soft error to propagate.
pub enum ElementsInput<'a> {
    Elements(&'a [crate::Element]),
    SoftError(Value),
}
