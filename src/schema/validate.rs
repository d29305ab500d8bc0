use std::collections::HashSet;

use thiserror::Error;

use super::model::{NodeType, Property, RelKey, RelationshipType, SchemaDocument};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("invalid {kind} name {name:?}: expected a letter or underscore followed by letters, digits or underscores")]
    InvalidName { kind: &'static str, name: String },
    #[error("node type {0:?} must have at least one label")]
    EmptyLabels(String),
    #[error("node type {0:?} has an empty label")]
    EmptyLabel(String),
    #[error("{owner}: invalid property name {property:?}")]
    InvalidProperty { owner: String, property: String },
    #[error("{owner}: duplicate property {property:?}")]
    DuplicateProperty { owner: String, property: String },
    #[error("node type {0:?} already exists")]
    DuplicateNode(String),
    #[error("relationship {rel:?}: {role} node {node:?} does not exist")]
    UnknownNode { rel: String, role: &'static str, node: String },
    #[error("relationship {0} already exists")]
    DuplicateRelationship(RelKey),
    #[error("node type {0:?} not found")]
    NodeNotFound(String),
    #[error("relationship {0} not found")]
    RelationshipNotFound(RelKey),
    #[error("document is missing the top-level {0:?} section")]
    MissingSection(&'static str),
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Identifier-shaped: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_properties(owner: &str, properties: &[Property]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for p in properties {
        if p.name.trim().is_empty() || !is_valid_name(&p.name) {
            return Err(SchemaError::InvalidProperty { owner: owner.to_string(), property: p.name.clone() });
        }
        if !seen.insert(p.name.as_str()) {
            return Err(SchemaError::DuplicateProperty { owner: owner.to_string(), property: p.name.clone() });
        }
    }
    Ok(())
}

pub fn validate_node(node: &NodeType) -> Result<(), SchemaError> {
    if !is_valid_name(&node.name) {
        return Err(SchemaError::InvalidName { kind: "node type", name: node.name.clone() });
    }
    if node.labels.is_empty() {
        return Err(SchemaError::EmptyLabels(node.name.clone()));
    }
    if node.labels.iter().any(|l| l.trim().is_empty()) {
        return Err(SchemaError::EmptyLabel(node.name.clone()));
    }
    validate_properties(&node.name, &node.properties)
}

// Shape plus referential integrity against the given document
pub fn validate_relationship(rel: &RelationshipType, doc: &SchemaDocument) -> Result<(), SchemaError> {
    if !is_valid_name(&rel.name) {
        return Err(SchemaError::InvalidName { kind: "relationship", name: rel.name.clone() });
    }
    if !doc.contains_node(&rel.start_node) {
        return Err(SchemaError::UnknownNode { rel: rel.name.clone(), role: "start", node: rel.start_node.clone() });
    }
    if !doc.contains_node(&rel.end_node) {
        return Err(SchemaError::UnknownNode { rel: rel.name.clone(), role: "end", node: rel.end_node.clone() });
    }
    validate_properties(&rel.name, &rel.properties)
}

/// Every invariant of a well-formed document: valid entities, unique node
/// names, unique relationship triples and no dangling endpoints.
pub fn validate_document(doc: &SchemaDocument) -> Result<(), SchemaError> {
    let mut names = HashSet::new();
    for node in &doc.node_types {
        validate_node(node)?;
        if !names.insert(node.name.as_str()) {
            return Err(SchemaError::DuplicateNode(node.name.clone()));
        }
    }
    let mut triples = HashSet::new();
    for rel in &doc.relationship_types {
        validate_relationship(rel, doc)?;
        let key = rel.key();
        if triples.contains(&key) {
            return Err(SchemaError::DuplicateRelationship(key));
        }
        triples.insert(key);
    }
    Ok(())
}
