//! BIM node-kind handler library
//!
//! One module per concern: pure data transforms run synchronously,
//! while the model-source, geometry, clash and quantity-extraction
//! kinds call out to the collaborators defined in [`collab`].

pub mod collab;

mod classification;
mod clash;
mod export;
mod filter;
mod geometry;
mod ifc;
mod parameter;
mod properties;
mod quantity;
mod query;
mod transform;

pub use classification::ClassificationHandler;
pub use clash::ClashHandler;
pub use export::ExportHandler;
pub use filter::FilterHandler;
pub use geometry::GeometryExtractHandler;
pub use ifc::IfcLoadHandler;
pub use parameter::ParameterHandler;
pub use properties::PropertyHandler;
pub use quantity::{QuantityAggregateHandler, QuantityExtractHandler};
pub use query::{RelationQueryHandler, SpatialQueryHandler};
pub use transform::TransformHandler;

use bimcore::port;
use bimruntime::{HandlerInfo, HandlerRegistry, PortSpec};
use collab::Collaborators;
use std::sync::Arc;

/// Register every built-in node kind with a registry.
pub fn register_all(registry: &mut HandlerRegistry, collaborators: &Collaborators) {
    registry.register_with_info(
        Arc::new(IfcLoadHandler::new(collaborators.loader.clone())),
        HandlerInfo {
            description: "Load a building model file".to_string(),
            category: "source".to_string(),
            inputs: vec![],
        },
    );
    registry.register_with_info(
        Arc::new(GeometryExtractHandler::new(collaborators.viewer.clone())),
        HandlerInfo {
            description: "Extract element geometry from a model".to_string(),
            category: "source".to_string(),
            inputs: vec![PortSpec::required(port::INPUT)],
        },
    );
    registry.register_with_info(
        Arc::new(ClashHandler::new(collaborators.viewer.clone())),
        HandlerInfo {
            description: "Detect clashes between two element sets".to_string(),
            category: "analysis".to_string(),
            inputs: vec![
                PortSpec::required(port::INPUT),
                PortSpec::required(port::REFERENCE),
            ],
        },
    );
    registry.register_with_info(
        Arc::new(QuantityExtractHandler::new(collaborators.worker.clone())),
        HandlerInfo {
            description: "Extract quantities from a model via the worker".to_string(),
            category: "analysis".to_string(),
            inputs: vec![PortSpec::required(port::INPUT)],
        },
    );
    registry.register_with_info(
        Arc::new(QuantityAggregateHandler),
        HandlerInfo {
            description: "Aggregate quantities over extracted elements".to_string(),
            category: "analysis".to_string(),
            inputs: vec![PortSpec::required(port::INPUT)],
        },
    );
    registry.register_with_info(
        Arc::new(FilterHandler),
        HandlerInfo {
            description: "Filter elements by class, name, property or classification"
                .to_string(),
            category: "transform".to_string(),
            inputs: vec![PortSpec::required(port::INPUT)],
        },
    );
    registry.register_with_info(
        Arc::new(TransformHandler),
        HandlerInfo {
            description: "Translate and scale element geometry".to_string(),
            category: "transform".to_string(),
            inputs: vec![PortSpec::required(port::INPUT)],
        },
    );
    registry.register_with_info(
        Arc::new(PropertyHandler),
        HandlerInfo {
            description: "Get or set element properties".to_string(),
            category: "transform".to_string(),
            inputs: vec![
                PortSpec::required(port::INPUT),
                PortSpec::optional(port::VALUE_INPUT),
            ],
        },
    );
    registry.register_with_info(
        Arc::new(ClassificationHandler),
        HandlerInfo {
            description: "Get or set element classifications".to_string(),
            category: "transform".to_string(),
            inputs: vec![
                PortSpec::required(port::INPUT),
                PortSpec::optional(port::VALUE_INPUT),
            ],
        },
    );
    registry.register_with_info(
        Arc::new(SpatialQueryHandler),
        HandlerInfo {
            description: "Query elements by spatial relation to a box".to_string(),
            category: "query".to_string(),
            inputs: vec![PortSpec::required(port::INPUT)],
        },
    );
    registry.register_with_info(
        Arc::new(RelationQueryHandler),
        HandlerInfo {
            description: "Query elements by containment or hosting relations".to_string(),
            category: "query".to_string(),
            inputs: vec![
                PortSpec::required(port::INPUT),
                PortSpec::optional(port::REFERENCE),
            ],
        },
    );
    registry.register_with_info(
        Arc::new(ExportHandler),
        HandlerInfo {
            description: "Serialize a result to JSON or CSV".to_string(),
            category: "export".to_string(),
            inputs: vec![PortSpec::required(port::INPUT)],
        },
    );
    registry.register_with_info(
        Arc::new(ParameterHandler),
        HandlerInfo {
            description: "Emit a literal configured value".to_string(),
            category: "general".to_string(),
            inputs: vec![],
        },
    );
}
