use async_trait::async_trait;
use bimcore::{port, HandlerContext, HandlerError, NodeHandler, Value};

/// Serialize a result for external consumption.
///
/// "format" is "json" (default, works for any payload) or "csv"
/// (element lists and clash sets only). The serialized document is the
/// node's result; writing it to disk is the caller's concern.
pub struct ExportHandler;

#[async_trait]
impl NodeHandler for ExportHandler {
    fn kind(&self) -> &str {
        "exportNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let input = ctx.require_input(port::INPUT)?;
        if input.is_soft_error() {
            return Ok(input.clone());
        }

        match ctx.property_str("format").unwrap_or("json") {
            "json" => {
                let text = serde_json::to_string_pretty(input)
                    .map_err(|e| HandlerError::ExecutionFailed(format!("JSON export: {}", e)))?;
                Ok(Value::String(text))
            }
            "csv" => csv_export(input),
            other => Err(HandlerError::Configuration(format!(
                "Unknown export format '{}'",
                other
            ))),
        }
    }
}

fn csv_export(input: &Value) -> Result<Value, HandlerError> {
    match input {
        Value::Elements(elements) => {
            let mut out = String::from("globalId,ifcClass,name,storey\n");
            for e in elements {
                out.push_str(&format!(
                    "{},{},{},{}\n",
                    csv_field(&e.global_id),
                    csv_field(&e.ifc_class),
                    csv_field(&e.name),
                    csv_field(e.storey.as_deref().unwrap_or("")),
                ));
            }
            Ok(Value::String(out))
        }
        Value::ClashResults(set) => {
            let mut out = String::from("elementA,elementB,depth\n");
            for clash in &set.clashes {
                out.push_str(&format!(
                    "{},{},{}\n",
                    csv_field(&clash.element_a),
                    csv_field(&clash.element_b),
                    clash.depth.map(|d| d.to_string()).unwrap_or_default(),
                ));
            }
            Ok(Value::String(out))
        }
        other => Err(HandlerError::InvalidInputType {
            port: port::INPUT.to_string(),
            expected: "elements or clashResults".to_string(),
            actual: other.type_name().to_string(),
        }),
    }
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
