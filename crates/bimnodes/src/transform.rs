use async_trait::async_trait;
use bimcore::{
    port, BoundingBox, ElementsInput, HandlerContext, HandlerError, NodeHandler, Value,
};

/// Geometric transform over element bounding boxes: translation by
/// "offsetX"/"offsetY"/"offsetZ" and uniform "scale" about each box
/// center. Elements without geometry pass through unchanged.
pub struct TransformHandler;

#[async_trait]
impl NodeHandler for TransformHandler {
    fn kind(&self) -> &str {
        "transformNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let elements = match ctx.elements_input(port::INPUT)? {
            ElementsInput::SoftError(err) => return Ok(err),
            ElementsInput::Elements(elements) => elements,
        };

        let offset = [
            ctx.property_f64("offsetX").unwrap_or(0.0),
            ctx.property_f64("offsetY").unwrap_or(0.0),
            ctx.property_f64("offsetZ").unwrap_or(0.0),
        ];
        let scale = ctx.property_f64("scale").unwrap_or(1.0);
        if scale <= 0.0 {
            return Err(HandlerError::Configuration(
                "'scale' must be positive".to_string(),
            ));
        }

        let transformed = elements
            .iter()
            .map(|e| {
                let mut e = e.clone();
                if let Some(bounds) = e.bounds {
                    e.bounds = Some(scaled(&bounds, scale).translated(offset));
                }
                e
            })
            .collect();

        Ok(Value::Elements(transformed))
    }
}

fn scaled(bounds: &BoundingBox, factor: f64) -> BoundingBox {
    let c = bounds.center();
    let mut min = [0.0; 3];
    let mut max = [0.0; 3];
    for i in 0..3 {
        min[i] = c[i] + (bounds.min[i] - c[i]) * factor;
        max[i] = c[i] + (bounds.max[i] - c[i]) * factor;
    }
    BoundingBox { min, max }
}
