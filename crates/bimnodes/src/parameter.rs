use async_trait::async_trait;
use bimcore::{HandlerContext, HandlerError, NodeHandler, Value};

/// Literal passthrough: emits the node's configured "value" property.
pub struct ParameterHandler;

#[async_trait]
impl NodeHandler for ParameterHandler {
    fn kind(&self) -> &str {
        "parameterNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        Ok(ctx.properties.get("value").cloned().unwrap_or(Value::Null))
    }
}
