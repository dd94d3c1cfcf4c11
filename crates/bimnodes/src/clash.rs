use crate::collab::ViewerCapability;
use async_trait::async_trait;
use bimcore::{port, ElementsInput, HandlerContext, HandlerError, NodeHandler, Value};
use std::sync::Arc;

/// Clash analysis between the element sets on "input" and "reference",
/// delegated to the viewer capability. "tolerance" widens each box
/// before the intersection test (model units).
pub struct ClashHandler {
    viewer: Arc<dyn ViewerCapability>,
}

impl ClashHandler {
    pub fn new(viewer: Arc<dyn ViewerCapability>) -> Self {
        Self { viewer }
    }
}

#[async_trait]
impl NodeHandler for ClashHandler {
    fn kind(&self) -> &str {
        "clashNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let set_a = match ctx.elements_input(port::INPUT)? {
            ElementsInput::SoftError(err) => return Ok(err),
            ElementsInput::Elements(elements) => elements,
        };
        let set_b = match ctx.elements_input(port::REFERENCE)? {
            ElementsInput::SoftError(err) => return Ok(err),
            ElementsInput::Elements(elements) => elements,
        };
        let tolerance = ctx.property_f64("tolerance").unwrap_or(0.01);

        ctx.sink.progress(0.0, "Detecting clashes");
        let result = self.viewer.detect_clashes(set_a, set_b, tolerance).await;
        ctx.sink.progress(100.0, "Clash detection finished");

        match result {
            Ok(set) => {
                tracing::info!(
                    clashes = set.clashes.len(),
                    pairs = set.checked_pairs,
                    "Clash detection complete"
                );
                Ok(Value::ClashResults(set))
            }
            Err(e) => Err(HandlerError::ExecutionFailed(format!(
                "Clash detection failed: {}",
                e
            ))),
        }
    }
}
