use async_trait::async_trait;
use bimcore::{
    port, BoundingBox, ElementsInput, HandlerContext, HandlerError, NodeHandler, Value,
};
use std::collections::HashSet;

/// Spatial query over element bounding boxes.
///
/// The query box is configured through "minX".."maxZ"; mode "within"
/// keeps elements fully inside it, mode "intersects" (default) keeps
/// anything touching it. Elements without geometry never match.
pub struct SpatialQueryHandler;

#[async_trait]
impl NodeHandler for SpatialQueryHandler {
    fn kind(&self) -> &str {
        "spatialNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let elements = match ctx.elements_input(port::INPUT)? {
            ElementsInput::SoftError(err) => return Ok(err),
            ElementsInput::Elements(elements) => elements,
        };

        let query = BoundingBox::new(
            [
                require_f64(&ctx, "minX")?,
                require_f64(&ctx, "minY")?,
                require_f64(&ctx, "minZ")?,
            ],
            [
                require_f64(&ctx, "maxX")?,
                require_f64(&ctx, "maxY")?,
                require_f64(&ctx, "maxZ")?,
            ],
        );
        let mode = ctx.property_str("mode").unwrap_or("intersects");

        let matched = elements
            .iter()
            .filter(|e| {
                e.bounds.as_ref().is_some_and(|b| match mode {
                    "within" => query.contains(b),
                    _ => query.intersects(b),
                })
            })
            .cloned()
            .collect();

        Ok(Value::Elements(matched))
    }
}

/// Relationship query.
///
/// relation "containedIn" keeps elements whose storey equals the
/// "container" property. relation "hostedBy" keeps elements whose host
/// is one of the elements connected on the "reference" port.
pub struct RelationQueryHandler;

#[async_trait]
impl NodeHandler for RelationQueryHandler {
    fn kind(&self) -> &str {
        "relationNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let elements = match ctx.elements_input(port::INPUT)? {
            ElementsInput::SoftError(err) => return Ok(err),
            ElementsInput::Elements(elements) => elements,
        };

        match ctx.property_str("relation").unwrap_or("containedIn") {
            "containedIn" => {
                let container = ctx.property_str("container").ok_or_else(|| {
                    HandlerError::Configuration("Missing property: container".to_string())
                })?;
                let matched = elements
                    .iter()
                    .filter(|e| e.storey.as_deref() == Some(container))
                    .cloned()
                    .collect();
                Ok(Value::Elements(matched))
            }
            "hostedBy" => {
                let hosts = match ctx.elements_input(port::REFERENCE)? {
                    ElementsInput::SoftError(err) => return Ok(err),
                    ElementsInput::Elements(hosts) => hosts,
                };
                let host_ids: HashSet<&str> =
                    hosts.iter().map(|e| e.global_id.as_str()).collect();
                let matched = elements
                    .iter()
                    .filter(|e| {
                        e.host
                            .as_deref()
                            .is_some_and(|host| host_ids.contains(host))
                    })
                    .cloned()
                    .collect();
                Ok(Value::Elements(matched))
            }
            other => Err(HandlerError::Configuration(format!(
                "Unknown relation '{}'",
                other
            ))),
        }
    }
}

fn require_f64(ctx: &HandlerContext, name: &str) -> Result<f64, HandlerError> {
    ctx.property_f64(name)
        .ok_or_else(|| HandlerError::Configuration(format!("Missing numeric property: {}", name)))
}
