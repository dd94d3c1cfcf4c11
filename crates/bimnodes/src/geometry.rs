use crate::collab::ViewerCapability;
use async_trait::async_trait;
use bimcore::{port, HandlerContext, HandlerError, NodeHandler, Value};
use std::sync::Arc;

/// Heavy geometry extraction through the viewer capability, with
/// incremental progress on the sink. "classFilter" is a comma-separated
/// list of IFC classes; empty means everything.
pub struct GeometryExtractHandler {
    viewer: Arc<dyn ViewerCapability>,
}

impl GeometryExtractHandler {
    pub fn new(viewer: Arc<dyn ViewerCapability>) -> Self {
        Self { viewer }
    }
}

#[async_trait]
impl NodeHandler for GeometryExtractHandler {
    fn kind(&self) -> &str {
        "geometryNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        if ctx.cancellation.is_cancelled() {
            return Err(HandlerError::Cancelled);
        }
        let input = ctx.require_input(port::INPUT)?;
        if input.is_soft_error() {
            return Ok(input.clone());
        }
        let model = input.as_model().ok_or_else(|| HandlerError::InvalidInputType {
            port: port::INPUT.to_string(),
            expected: "model".to_string(),
            actual: input.type_name().to_string(),
        })?;

        let class_filter: Vec<String> = ctx
            .property_str("classFilter")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        ctx.sink.loading(true);
        let sink = ctx.sink.clone();
        let result = self
            .viewer
            .extract_geometry(model, &class_filter, &move |pct, msg| {
                sink.progress(pct, msg)
            })
            .await;
        ctx.sink.loading(false);

        match result {
            Ok(elements) => Ok(Value::Elements(elements)),
            Err(e) => Err(HandlerError::ExecutionFailed(format!(
                "Geometry extraction failed: {}",
                e
            ))),
        }
    }
}
