use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A loaded building model: the payload produced by a model-source node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub name: String,
    /// IFC schema version, e.g. "IFC4".
    pub schema: String,
    pub elements: Vec<Element>,
}

impl Model {
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }
}

/// A single building element with its extracted metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub global_id: String,
    /// IFC class, e.g. "IfcWall", "IfcDoor".
    pub ifc_class: String,
    pub name: String,
    /// Property sets: pset name -> property name -> value.
    #[serde(default)]
    pub property_sets: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    pub classification: Option<Classification>,
    /// Storey or spatial container this element belongs to.
    #[serde(default)]
    pub storey: Option<String>,
    /// Host element for openings, doors in walls, etc.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub bounds: Option<BoundingBox>,
    /// Base quantities as extracted from the model, keyed by quantity
    /// name ("Area", "Volume", "Length", ...).
    #[serde(default)]
    pub quantities: HashMap<String, f64>,
}

impl Element {
    pub fn property(&self, pset: &str, name: &str) -> Option<&str> {
        self.property_sets
            .get(pset)
            .and_then(|props| props.get(name))
            .map(String::as_str)
    }

    /// Look the property up in any property set, first match wins.
    pub fn property_anywhere(&self, name: &str) -> Option<&str> {
        self.property_sets
            .values()
            .find_map(|props| props.get(name))
            .map(String::as_str)
    }
}

/// Classification reference attached to an element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub system: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Axis-aligned bounding box in model coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && self.max[i] >= other.min[i])
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] && self.max[i] >= other.max[i])
    }

    /// Grow the box by `margin` on every side.
    pub fn inflated(&self, margin: f64) -> BoundingBox {
        BoundingBox {
            min: [
                self.min[0] - margin,
                self.min[1] - margin,
                self.min[2] - margin,
            ],
            max: [
                self.max[0] + margin,
                self.max[1] + margin,
                self.max[2] + margin,
            ],
        }
    }

    pub fn translated(&self, offset: [f64; 3]) -> BoundingBox {
        BoundingBox {
            min: [
                self.min[0] + offset[0],
                self.min[1] + offset[1],
                self.min[2] + offset[2],
            ],
            max: [
                self.max[0] + offset[0],
                self.max[1] + offset[1],
                self.max[2] + offset[2],
            ],
        }
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }
}

/// A single detected clash between two elements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Clash {
    pub element_a: String,
    pub element_b: String,
    /// Penetration depth in model units, if the capability reports one.
    #[serde(default)]
    pub depth: Option<f64>,
    #[serde(default)]
    pub position: Option<[f64; 3]>,
}

/// Result of a clash analysis between two element sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClashSet {
    pub clashes: Vec<Clash>,
    pub tolerance: f64,
    pub checked_pairs: usize,
}

/// Aggregated quantity totals, optionally grouped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuantityReport {
    /// Which quantity was aggregated ("count", "Area", "Volume", ...).
    pub quantity: String,
    /// Group key -> total. The single group "total" is used when no
    /// grouping property was configured.
    pub totals: HashMap<String, f64>,
    pub element_count: usize,
}
