use crate::collab::QuantityWorker;
use async_trait::async_trait;
use bimcore::{
    port, Element, ElementsInput, HandlerContext, HandlerError, NodeHandler, QuantityReport, Value,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Aggregate base quantities over an already-extracted element set.
///
/// "quantity" selects what to sum: "count" or a quantity name such as
/// "Area" or "Volume". "groupBy" is optional: "ifcClass", "storey", or
/// a property name; without it a single "total" group is produced.
pub struct QuantityAggregateHandler;

#[async_trait]
impl NodeHandler for QuantityAggregateHandler {
    fn kind(&self) -> &str {
        "quantityNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let elements = match ctx.elements_input(port::INPUT)? {
            ElementsInput::SoftError(err) => return Ok(err),
            ElementsInput::Elements(elements) => elements,
        };
        let quantity = ctx.property_str("quantity").unwrap_or("count");
        let group_by = ctx.property_str("groupBy");

        Ok(Value::Quantities(aggregate(elements, quantity, group_by)))
    }
}

/// Quantity extraction delegated to the worker collaborator, correlated
/// by the opaque "messageId" stored on the node. Takes a loaded model
/// rather than extracted elements.
pub struct QuantityExtractHandler {
    worker: Arc<dyn QuantityWorker>,
}

impl QuantityExtractHandler {
    pub fn new(worker: Arc<dyn QuantityWorker>) -> Self {
        Self { worker }
    }
}

#[async_trait]
impl NodeHandler for QuantityExtractHandler {
    fn kind(&self) -> &str {
        "quantityExtractNode"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let input = ctx.require_input(port::INPUT)?;
        if input.is_soft_error() {
            return Ok(input.clone());
        }
        let model = input.as_model().ok_or_else(|| HandlerError::InvalidInputType {
            port: port::INPUT.to_string(),
            expected: "model".to_string(),
            actual: input.type_name().to_string(),
        })?;

        let quantity = ctx.property_str("quantity").unwrap_or("count").to_string();
        let group_by = ctx.property_str("groupBy").map(str::to_string);
        let message_id = ctx
            .property_str("messageId")
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        ctx.sink.loading(true);
        let result = self
            .worker
            .extract(model, &quantity, group_by.as_deref(), &message_id)
            .await;
        ctx.sink.loading(false);

        match result {
            Ok(report) => Ok(Value::Quantities(report)),
            Err(e) => Err(HandlerError::ExecutionFailed(format!(
                "Quantity extraction failed: {}",
                e
            ))),
        }
    }
}

/// Shared aggregation used by the sync handler and the sample worker.
pub(crate) fn aggregate(
    elements: &[Element],
    quantity: &str,
    group_by: Option<&str>,
) -> QuantityReport {
    let mut totals: HashMap<String, f64> = HashMap::new();

    for element in elements {
        let amount = if quantity.eq_ignore_ascii_case("count") {
            Some(1.0)
        } else {
            element.quantities.get(quantity).copied()
        };
        let Some(amount) = amount else {
            continue;
        };

        let key = match group_by {
            None => "total".to_string(),
            Some("ifcClass") => element.ifc_class.clone(),
            Some("storey") => element.storey.clone().unwrap_or_else(|| "(none)".to_string()),
            Some(prop) => element
                .property_anywhere(prop)
                .unwrap_or("(none)")
                .to_string(),
        };
        *totals.entry(key).or_insert(0.0) += amount;
    }

    QuantityReport {
        quantity: quantity.to_string(),
        totals,
        element_count: elements.len(),
    }
}
