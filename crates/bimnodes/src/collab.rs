//! Collaborator interfaces consumed by the asynchronous node kinds,
//! plus deterministic in-process implementations used by the CLI and
//! tests. Real deployments wire these to an IFC parser, a viewer
//! capability, and a worker pool.

use async_trait::async_trait;
use bimcore::{BoundingBox, Clash, ClashSet, Element, Model, QuantityReport};
use std::collections::HashMap;
use thiserror::Error;

/// Progress callback threaded through long collaborator operations.
pub type ProgressFn<'a> = &'a (dyn Fn(f64, &str) + Send + Sync);

#[derive(Error, Debug, Clone)]
pub enum CollabError {
    #[error("Model not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Failed(String),
}

/// Loads a building model from a file reference.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, path: &str, on_progress: ProgressFn<'_>) -> Result<Model, CollabError>;
}

/// Geometry/viewer capability: heavy extraction and clash math.
#[async_trait]
pub trait ViewerCapability: Send + Sync {
    async fn extract_geometry(
        &self,
        model: &Model,
        class_filter: &[String],
        on_progress: ProgressFn<'_>,
    ) -> Result<Vec<Element>, CollabError>;

    async fn detect_clashes(
        &self,
        set_a: &[Element],
        set_b: &[Element],
        tolerance: f64,
    ) -> Result<ClashSet, CollabError>;
}

/// Quantity extraction delegated to a worker, correlated by an opaque
/// message id stored on the node.
#[async_trait]
pub trait QuantityWorker: Send + Sync {
    async fn extract(
        &self,
        model: &Model,
        quantity: &str,
        group_by: Option<&str>,
        message_id: &str,
    ) -> Result<QuantityReport, CollabError>;
}

/// In-process model loader producing a small deterministic model so the
/// engine can be exercised without an IFC parser.
pub struct SampleModelLoader;

#[async_trait]
impl ModelLoader for SampleModelLoader {
    async fn load(&self, path: &str, on_progress: ProgressFn<'_>) -> Result<Model, CollabError> {
        if path.contains("missing") {
            return Err(CollabError::NotFound(path.to_string()));
        }
        on_progress(10.0, "Opening model");
        let model = sample_model(path);
        on_progress(60.0, "Parsing elements");
        on_progress(100.0, "Model ready");
        Ok(model)
    }
}

/// In-process viewer capability over axis-aligned bounding boxes.
pub struct SampleViewer;

#[async_trait]
impl ViewerCapability for SampleViewer {
    async fn extract_geometry(
        &self,
        model: &Model,
        class_filter: &[String],
        on_progress: ProgressFn<'_>,
    ) -> Result<Vec<Element>, CollabError> {
        let total = model.elements.len().max(1);
        let mut extracted = Vec::new();
        for (i, element) in model.elements.iter().enumerate() {
            if !class_filter.is_empty() && !class_filter.iter().any(|c| c == &element.ifc_class) {
                continue;
            }
            if element.bounds.is_some() {
                extracted.push(element.clone());
            }
            if i % 8 == 0 {
                let pct = (i + 1) as f64 / total as f64 * 100.0;
                on_progress(pct, &format!("Extracting geometry {}/{}", i + 1, total));
            }
        }
        on_progress(100.0, "Geometry extracted");
        Ok(extracted)
    }

    async fn detect_clashes(
        &self,
        set_a: &[Element],
        set_b: &[Element],
        tolerance: f64,
    ) -> Result<ClashSet, CollabError> {
        let mut clashes = Vec::new();
        let mut checked_pairs = 0;
        for a in set_a {
            for b in set_b {
                if a.global_id == b.global_id {
                    continue;
                }
                checked_pairs += 1;
                let (Some(ba), Some(bb)) = (&a.bounds, &b.bounds) else {
                    continue;
                };
                if ba.inflated(tolerance).intersects(bb) {
                    clashes.push(Clash {
                        element_a: a.global_id.clone(),
                        element_b: b.global_id.clone(),
                        depth: Some(overlap_depth(ba, bb)),
                        position: Some(midpoint(ba, bb)),
                    });
                }
            }
        }
        Ok(ClashSet {
            clashes,
            tolerance,
            checked_pairs,
        })
    }
}

/// In-process quantity worker: aggregates base quantities directly.
pub struct SampleQuantityWorker;

#[async_trait]
impl QuantityWorker for SampleQuantityWorker {
    async fn extract(
        &self,
        model: &Model,
        quantity: &str,
        group_by: Option<&str>,
        message_id: &str,
    ) -> Result<QuantityReport, CollabError> {
        tracing::debug!(message_id, quantity, "Quantity extraction request");
        Ok(crate::quantity::aggregate(&model.elements, quantity, group_by))
    }
}

/// Bundle of collaborator handles handed to `register_all`.
#[derive(Clone)]
pub struct Collaborators {
    pub loader: std::sync::Arc<dyn ModelLoader>,
    pub viewer: std::sync::Arc<dyn ViewerCapability>,
    pub worker: std::sync::Arc<dyn QuantityWorker>,
}

impl Collaborators {
    /// The in-process sample stack.
    pub fn sample() -> Self {
        Self {
            loader: std::sync::Arc::new(SampleModelLoader),
            viewer: std::sync::Arc::new(SampleViewer),
            worker: std::sync::Arc::new(SampleQuantityWorker),
        }
    }
}

fn overlap_depth(a: &BoundingBox, b: &BoundingBox) -> f64 {
    (0..3)
        .map(|i| (a.max[i].min(b.max[i]) - a.min[i].max(b.min[i])).max(0.0))
        .fold(f64::INFINITY, f64::min)
}

fn midpoint(a: &BoundingBox, b: &BoundingBox) -> [f64; 3] {
    let ca = a.center();
    let cb = b.center();
    [
        (ca[0] + cb[0]) / 2.0,
        (ca[1] + cb[1]) / 2.0,
        (ca[2] + cb[2]) / 2.0,
    ]
}

/// Deterministic synthetic model: two storeys of walls, doors and a
/// slab, with base quantities and property sets filled in.
pub fn sample_model(name: &str) -> Model {
    let mut elements = Vec::new();
    for storey_idx in 0..2 {
        let storey = format!("Level {}", storey_idx + 1);
        let z = storey_idx as f64 * 3.0;

        for wall_idx in 0..4 {
            let x = wall_idx as f64 * 5.0;
            let id = format!("wall-{}-{}", storey_idx, wall_idx);
            elements.push(Element {
                global_id: id.clone(),
                ifc_class: "IfcWall".to_string(),
                name: format!("Wall {}", id),
                property_sets: psets(&[
                    ("Pset_WallCommon", "IsExternal", if wall_idx == 0 { "true" } else { "false" }),
                    ("Pset_WallCommon", "FireRating", "F30"),
                ]),
                classification: None,
                storey: Some(storey.clone()),
                host: None,
                bounds: Some(BoundingBox::new([x, 0.0, z], [x + 5.0, 0.3, z + 3.0])),
                quantities: quantities(&[("Area", 15.0), ("Volume", 4.5), ("Length", 5.0)]),
            });
        }

        let door_id = format!("door-{}", storey_idx);
        elements.push(Element {
            global_id: door_id.clone(),
            ifc_class: "IfcDoor".to_string(),
            name: format!("Door {}", door_id),
            property_sets: psets(&[("Pset_DoorCommon", "FireRating", "F30")]),
            classification: None,
            storey: Some(storey.clone()),
            host: Some(format!("wall-{}-0", storey_idx)),
            bounds: Some(BoundingBox::new([1.0, 0.0, z], [2.0, 0.3, z + 2.1])),
            quantities: quantities(&[("Area", 2.1)]),
        });

        elements.push(Element {
            global_id: format!("slab-{}", storey_idx),
            ifc_class: "IfcSlab".to_string(),
            name: format!("Slab {}", storey_idx),
            property_sets: HashMap::new(),
            classification: None,
            storey: Some(storey.clone()),
            host: None,
            bounds: Some(BoundingBox::new([0.0, 0.0, z - 0.2], [20.0, 10.0, z])),
            quantities: quantities(&[("Area", 200.0), ("Volume", 40.0)]),
        });
    }

    Model {
        name: name.to_string(),
        schema: "IFC4".to_string(),
        elements,
    }
}

fn psets(entries: &[(&str, &str, &str)]) -> HashMap<String, HashMap<String, String>> {
    let mut sets: HashMap<String, HashMap<String, String>> = HashMap::new();
    for (pset, key, value) in entries {
        sets.entry(pset.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }
    sets
}

fn quantities(entries: &[(&str, f64)]) -> HashMap<String, f64> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect()
}
