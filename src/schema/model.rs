use std::collections::HashMap;
use std::fmt;

use egui::Pos2;
use serde::{Deserialize, Serialize};

// View-state positions keyed by node type name (world space)
pub type PositionMap = HashMap<String, Pos2>;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    #[default]
    #[serde(rename = "str", alias = "string")]
    Str,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "date")]
    Date,
}

impl PropertyType {
    pub const ALL: [PropertyType; 5] = [
        PropertyType::Str,
        PropertyType::Int,
        PropertyType::Float,
        PropertyType::Bool,
        PropertyType::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Str => "str",
            PropertyType::Int => "int",
            PropertyType::Float => "float",
            PropertyType::Bool => "bool",
            PropertyType::Date => "date",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub required: bool,
    pub description: String,
}

impl Property {
    pub fn new(name: impl Into<String>, kind: PropertyType, required: bool) -> Self {
        Self { name: name.into(), kind, required, description: String::new() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeType {
    pub name: String,
    pub labels: Vec<String>,
    pub properties: Vec<Property>,
}

impl NodeType {
    // A node type whose only label is its own name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self { labels: vec![name.clone()], name, properties: Vec::new() }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationshipType {
    pub name: String,
    pub start_node: String,
    pub end_node: String,
    pub properties: Vec<Property>,
}

impl RelationshipType {
    pub fn new(name: impl Into<String>, start_node: impl Into<String>, end_node: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_node: start_node.into(),
            end_node: end_node.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn key(&self) -> RelKey {
        RelKey {
            name: self.name.clone(),
            start_node: self.start_node.clone(),
            end_node: self.end_node.clone(),
        }
    }

    pub fn is_reflexive(&self) -> bool {
        self.start_node == self.end_node
    }

    pub fn touches(&self, node: &str) -> bool {
        self.start_node == node || self.end_node == node
    }
}

/// Identity of a relationship type: there is no surrogate id, the
/// `(name, start_node, end_node)` triple is the key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelKey {
    pub name: String,
    pub start_node: String,
    pub end_node: String,
}

impl RelKey {
    pub fn new(name: impl Into<String>, start_node: impl Into<String>, end_node: impl Into<String>) -> Self {
        Self { name: name.into(), start_node: start_node.into(), end_node: end_node.into() }
    }

    pub fn matches(&self, rel: &RelationshipType) -> bool {
        self.name == rel.name && self.start_node == rel.start_node && self.end_node == rel.end_node
    }
}

impl fmt::Display for RelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-[{}]->({})", self.start_node, self.name, self.end_node)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(rename = "nodes")]
    pub node_types: Vec<NodeType>,
    #[serde(rename = "relationships")]
    pub relationship_types: Vec<RelationshipType>,
}

impl SchemaDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, name: &str) -> Option<&NodeType> {
        self.node_types.iter().find(|n| n.name == name)
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.node(name).is_some()
    }

    pub fn relationship(&self, key: &RelKey) -> Option<&RelationshipType> {
        self.relationship_types.iter().find(|r| key.matches(r))
    }

    pub fn relationships_touching<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a RelationshipType> + 'a {
        self.relationship_types.iter().filter(move |r| r.touches(node))
    }

    pub fn node_count(&self) -> usize { self.node_types.len() }
    pub fn relationship_count(&self) -> usize { self.relationship_types.len() }

    /// The document an empty session starts from: two node types, a
    /// purchase relationship and a reflexive acquaintance relationship.
    pub fn example() -> Self {
        let person = NodeType::new("Person")
            .with_labels(["Person", "User"])
            .with_property(Property::new("name", PropertyType::Str, true).with_description("Name of the person"));
        let product = NodeType::new("Product")
            .with_labels(["Product", "Item"])
            .with_property(Property::new("id", PropertyType::Str, true).with_description("Product identifier"))
            .with_property(Property::new("price", PropertyType::Float, true).with_description("Unit price"));
        let buys = RelationshipType::new("BUYS", "Person", "Product")
            .with_property(Property::new("date", PropertyType::Date, false).with_description("Purchase date"));
        let knows = RelationshipType::new("KNOWS", "Person", "Person")
            .with_property(Property::new("since", PropertyType::Int, false).with_description("Years known"));
        Self {
            node_types: vec![person, product],
            relationship_types: vec![buys, knows],
        }
    }
}

// Partially filled entities handed to the form layer while a creation is pending
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDraft {
    pub node: NodeType,
    pub position: Option<Pos2>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RelationshipDraft {
    pub relationship: RelationshipType,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    Node(String),
    Relationship(RelKey),
    PendingNode(NodeDraft),
    PendingRelationship(RelationshipDraft),
}

impl Selection {
    pub fn is_node(&self, name: &str) -> bool {
        matches!(self, Selection::Node(n) if n == name)
    }

    pub fn is_relationship(&self, key: &RelKey) -> bool {
        matches!(self, Selection::Relationship(k) if k == key)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Selection::PendingNode(_) | Selection::PendingRelationship(_))
    }
}
