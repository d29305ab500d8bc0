use std::collections::BTreeMap;

use egui::Pos2;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::model::{NodeType, PositionMap, Property, PropertyType, RelationshipType, SchemaDocument};
use super::validate::{validate_document, SchemaError};

// Wire shapes. Everything except the two top-level sections is optional on
// the way in and gets a default during normalisation.
#[derive(Deserialize)]
struct RawProperty {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type", deserialize_with = "falsy_as_missing")]
    kind: Option<PropertyType>,
    #[serde(default)]
    required: Option<bool>,
    #[serde(default)]
    description: Option<String>,
}

// An empty, null, false or zero type counts as absent and falls back to `str`
fn falsy_as_missing<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PropertyType>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(v) => PropertyType::deserialize(v).map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default)]
    name: String,
    #[serde(default)]
    labels: Option<Vec<String>>,
    #[serde(default)]
    properties: Option<Vec<RawProperty>>,
}

#[derive(Deserialize)]
struct RawRelationship {
    #[serde(default)]
    name: String,
    #[serde(default)]
    start_node: String,
    #[serde(default)]
    end_node: String,
    #[serde(default)]
    properties: Option<Vec<RawProperty>>,
}

#[derive(Deserialize, Serialize, Copy, Clone)]
struct RawPosition {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct RawDocument {
    nodes: Vec<RawNode>,
    relationships: Vec<RawRelationship>,
    #[serde(default)]
    positions: Option<BTreeMap<String, RawPosition>>,
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    nodes: &'a [NodeType],
    relationships: &'a [RelationshipType],
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    positions: BTreeMap<&'a str, RawPosition>,
}

/// A normalised document together with the layout it was saved with.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Imported {
    pub document: SchemaDocument,
    pub positions: PositionMap,
}

fn normalize_properties(raw: Option<Vec<RawProperty>>) -> Vec<Property> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|p| Property {
            name: p.name,
            kind: p.kind.unwrap_or_default(),
            required: p.required.unwrap_or(false),
            description: p.description.unwrap_or_default(),
        })
        .collect()
}

// Checked after narrowing to f32: large f64 values overflow to infinity
fn finite(p: Pos2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

pub fn import_value(value: Value) -> Result<Imported, SchemaError> {
    let obj = value
        .as_object()
        .ok_or_else(|| SchemaError::Malformed("top level must be a JSON object".into()))?;
    for section in ["nodes", "relationships"] {
        if !obj.contains_key(section) {
            return Err(SchemaError::MissingSection(section));
        }
    }
    let raw: RawDocument = serde_json::from_value(value).map_err(|e| SchemaError::Malformed(e.to_string()))?;

    let node_types = raw
        .nodes
        .into_iter()
        .map(|n| NodeType {
            labels: n.labels.unwrap_or_else(|| vec![n.name.clone()]),
            properties: normalize_properties(n.properties),
            name: n.name,
        })
        .collect();
    let relationship_types = raw
        .relationships
        .into_iter()
        .map(|r| RelationshipType {
            name: r.name,
            start_node: r.start_node,
            end_node: r.end_node,
            properties: normalize_properties(r.properties),
        })
        .collect();
    let document = SchemaDocument { node_types, relationship_types };
    validate_document(&document)?;

    let positions = raw
        .positions
        .unwrap_or_default()
        .into_iter()
        .map(|(name, p)| (name, Pos2::new(p.x as f32, p.y as f32)))
        .filter(|(name, p)| finite(*p) && document.contains_node(name))
        .collect();

    Ok(Imported { document, positions })
}

/// Parses and normalises a JSON document. A document missing `nodes` or
/// `relationships` is rejected; any other missing field is defaulted.
pub fn import_str(text: &str) -> Result<Imported, SchemaError> {
    let value: Value = serde_json::from_str(text).map_err(|e| SchemaError::Malformed(e.to_string()))?;
    import_value(value)
}

pub fn export_string(doc: &SchemaDocument, positions: &PositionMap) -> Result<String, serde_json::Error> {
    let positions = positions
        .iter()
        .filter(|(name, p)| doc.contains_node(name) && finite(**p))
        .map(|(name, p)| (name.as_str(), RawPosition { x: p.x as f64, y: p.y as f64 }))
        .collect();
    let out = DocumentOut {
        nodes: &doc.node_types,
        relationships: &doc.relationship_types,
        positions,
    };
    serde_json::to_string_pretty(&out)
}
