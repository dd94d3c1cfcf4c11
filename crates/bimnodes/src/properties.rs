use async_trait::async_trait;
use bimcore::{port, ElementsInput, HandlerContext, HandlerError, NodeHandler, Value};

/// Property get/set across an element set.
///
/// mode "get": emits one value per element (string or null) read from
/// "pset"/"property". mode "set": writes "property" into "pset" on
/// every element and emits the updated set; the value comes from the
/// "valueInput" port when connected, else from the "value" property.
pub struct PropertyHandler;

#[async_trait]
impl NodeHandler for PropertyHandler {
    fn kind(&self) -> &str {
        "propertyNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let elements = match ctx.elements_input(port::INPUT)? {
            ElementsInput::SoftError(err) => return Ok(err),
            ElementsInput::Elements(elements) => elements,
        };

        let mode = ctx.property_str("mode").unwrap_or("get");
        let pset = ctx
            .property_str("pset")
            .ok_or_else(|| HandlerError::Configuration("Missing property: pset".to_string()))?;
        let property = ctx.property_str("property").ok_or_else(|| {
            HandlerError::Configuration("Missing property: property".to_string())
        })?;

        match mode {
            "get" => {
                let values = elements
                    .iter()
                    .map(|e| match e.property(pset, property) {
                        Some(v) => Value::String(v.to_string()),
                        None => Value::Null,
                    })
                    .collect();
                Ok(Value::Array(values))
            }
            "set" => {
                let value = incoming_value(&ctx)?;
                let updated = elements
                    .iter()
                    .map(|e| {
                        let mut e = e.clone();
                        e.property_sets
                            .entry(pset.to_string())
                            .or_default()
                            .insert(property.to_string(), value.clone());
                        e
                    })
                    .collect();
                Ok(Value::Elements(updated))
            }
            other => Err(HandlerError::Configuration(format!(
                "Unknown mode '{}', expected 'get' or 'set'",
                other
            ))),
        }
    }
}

/// The value to write: "valueInput" port wins over the "value" property.
fn incoming_value(ctx: &HandlerContext) -> Result<String, HandlerError> {
    if let Some(value) = ctx.input(port::VALUE_INPUT) {
        return Ok(stringify(value));
    }
    ctx.property_str("value")
        .map(str::to_string)
        .ok_or_else(|| {
            HandlerError::Configuration(
                "Set mode needs a 'valueInput' connection or a 'value' property".to_string(),
            )
        })
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}
