use async_trait::async_trait;
use bimcore::{
    port, Classification, ElementsInput, HandlerContext, HandlerError, NodeHandler, Value,
};

/// Classification get/set.
///
/// mode "get": emits each element's classification code (or null).
/// mode "set": attaches a classification from "system" and "code"
/// (code may also arrive on the "valueInput" port) and emits the
/// updated element set.
pub struct ClassificationHandler;

#[async_trait]
impl NodeHandler for ClassificationHandler {
    fn kind(&self) -> &str {
        "classificationNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let elements = match ctx.elements_input(port::INPUT)? {
            ElementsInput::SoftError(err) => return Ok(err),
            ElementsInput::Elements(elements) => elements,
        };

        match ctx.property_str("mode").unwrap_or("get") {
            "get" => {
                let codes = elements
                    .iter()
                    .map(|e| match &e.classification {
                        Some(c) => Value::String(c.code.clone()),
                        None => Value::Null,
                    })
                    .collect();
                Ok(Value::Array(codes))
            }
            "set" => {
                let system = ctx.property_str("system").unwrap_or("Uniclass").to_string();
                let code = match ctx.input(port::VALUE_INPUT).and_then(Value::as_str) {
                    Some(code) => code.to_string(),
                    None => ctx
                        .property_str("code")
                        .ok_or_else(|| {
                            HandlerError::Configuration(
                                "Set mode needs a 'valueInput' connection or a 'code' property"
                                    .to_string(),
                            )
                        })?
                        .to_string(),
                };
                let description = ctx.property_str("description").map(str::to_string);

                let updated = elements
                    .iter()
                    .map(|e| {
                        let mut e = e.clone();
                        e.classification = Some(Classification {
                            system: system.clone(),
                            code: code.clone(),
                            description: description.clone(),
                        });
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
