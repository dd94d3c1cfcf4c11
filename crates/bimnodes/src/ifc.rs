use crate::collab::ModelLoader;
use async_trait::async_trait;
use bimcore::{HandlerContext, HandlerError, NodeHandler, Value};
use std::sync::Arc;

/// Model source: loads the file named by the "file" property through
/// the model-loader collaborator, streaming load progress to the sink.
///
/// A load failure becomes a soft error so one bad file reference does
/// not abort an otherwise healthy pipeline; downstream kinds pass the
/// sentinel through instead of processing.
pub struct IfcLoadHandler {
    loader: Arc<dyn ModelLoader>,
}

impl IfcLoadHandler {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl NodeHandler for IfcLoadHandler {
    fn kind(&self) -> &str {
        "ifcNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let path = ctx
            .property_str("file")
            .ok_or_else(|| HandlerError::Configuration("Missing property: file".to_string()))?;

        ctx.sink.loading(true);
        let sink = ctx.sink.clone();
        let result = self
            .loader
            .load(path, &move |pct, msg| sink.progress(pct, msg))
            .await;
        ctx.sink.loading(false);

        match result {
            Ok(model) => {
                tracing::info!(
                    model = %model.name,
                    elements = model.element_count(),
                    "Model loaded"
                );
                Ok(Value::Model(model))
            }
            Err(e) => {
                let message = format!("Failed to load model: {}", e);
                ctx.sink.error(&message);
                Ok(Value::soft_error(message))
            }
        }
    }
}
