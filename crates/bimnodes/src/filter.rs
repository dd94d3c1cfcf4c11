use async_trait::async_trait;
use bimcore::{port, Element, ElementsInput, HandlerContext, HandlerError, NodeHandler, Value};
use std::collections::HashMap;

/// Filter an element set by IFC class, name substring, property value
/// and/or classification code. Criteria are optional and AND-combined.
///
/// Accepts either a loaded model or an element list on "input", so a
/// filter can hang directly off a model-source node.
pub struct FilterHandler;

#[async_trait]
impl NodeHandler for FilterHandler {
    fn kind(&self) -> &str {
        "filterNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let input = ctx.require_input(port::INPUT)?;
        let elements: &[Element] = match input {
            Value::Model(model) => &model.elements,
            _ => match ctx.elements_input(port::INPUT)? {
                ElementsInput::SoftError(err) => return Ok(err),
                ElementsInput::Elements(elements) => elements,
            },
        };

        let ifc_class = ctx.property_str("ifcClass");
        let name_contains = ctx.property_str("name");
        let property = ctx.property_str("property");
        let equals = ctx.property_str("equals");
        let classification = ctx.property_str("classification");

        if property.is_some() != equals.is_some() {
            return Err(HandlerError::Configuration(
                "'property' and 'equals' must be set together".to_string(),
            ));
        }

        let filtered: Vec<Element> = elements
            .iter()
            .filter(|e| ifc_class.map_or(true, |c| e.ifc_class == c))
            .filter(|e| name_contains.map_or(true, |n| e.name.contains(n)))
            .filter(|e| match (property, equals) {
                (Some(prop), Some(expected)) => e.property_anywhere(prop) == Some(expected),
                _ => true,
            })
            .filter(|e| {
                classification.map_or(true, |code| {
                    e.classification
                        .as_ref()
                        .is_some_and(|c| c.code.starts_with(code))
                })
            })
            .cloned()
            .collect();

        Ok(Value::Elements(filtered))
    }

    fn validate_properties(
        &self,
        properties: &HashMap<String, Value>,
    ) -> Result<(), HandlerError> {
        if properties.contains_key("property") != properties.contains_key("equals") {
            return Err(HandlerError::Configuration(
                "'property' and 'equals' must be set together".to_string(),
            ));
        }
        Ok(())
    }
}
