use egui::Pos2;

use super::model::{NodeType, PositionMap, RelKey, RelationshipType, SchemaDocument};
use super::validate::{validate_document, validate_node, validate_relationship, SchemaError};

/// Structural and positional edits. Canvas and forms never touch the
/// document directly; they hand one of these to the document owner.
#[derive(Clone, Debug, PartialEq)]
pub enum EditCommand {
    AddNode { node: NodeType, position: Option<Pos2> },
    // Replaces the node named `name`; a changed name is cascaded to
    // relationship endpoints and the position key
    UpdateNode { name: String, node: NodeType },
    DeleteNode { name: String },
    AddRelationship(RelationshipType),
    UpdateRelationship { key: RelKey, relationship: RelationshipType },
    DeleteRelationship(RelKey),
    SetPosition { name: String, position: Pos2 },
}

impl EditCommand {
    pub fn describe(&self) -> String {
        match self {
            EditCommand::AddNode { node, .. } => format!("add node {}", node.name),
            EditCommand::UpdateNode { name, .. } => format!("update node {}", name),
            EditCommand::DeleteNode { name } => format!("delete node {}", name),
            EditCommand::AddRelationship(rel) => format!("add relationship {}", rel.key()),
            EditCommand::UpdateRelationship { key, .. } => format!("update relationship {}", key),
            EditCommand::DeleteRelationship(key) => format!("delete relationship {}", key),
            EditCommand::SetPosition { name, .. } => format!("move node {}", name),
        }
    }
}

/// What an applied command touched, so the owner knows whom to notify.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Change {
    pub model: bool,
    pub positions: bool,
}

/// Result surfaced across the core boundary instead of an error type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditOutcome {
    pub success: bool,
    pub message: String,
}

impl EditOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

impl<T> From<Result<T, SchemaError>> for EditOutcome {
    fn from(res: Result<T, SchemaError>) -> Self {
        match res {
            Ok(_) => EditOutcome::ok("ok"),
            Err(e) => EditOutcome::failed(e.to_string()),
        }
    }
}

impl SchemaDocument {
    pub fn add_node(&mut self, node: NodeType) -> Result<(), SchemaError> {
        validate_node(&node)?;
        if self.contains_node(&node.name) {
            return Err(SchemaError::DuplicateNode(node.name));
        }
        self.node_types.push(node);
        Ok(())
    }

    // Rejected before any mutation if either endpoint is missing
    pub fn add_relationship(&mut self, rel: RelationshipType) -> Result<(), SchemaError> {
        validate_relationship(&rel, self)?;
        if self.relationship(&rel.key()).is_some() {
            return Err(SchemaError::DuplicateRelationship(rel.key()));
        }
        self.relationship_types.push(rel);
        Ok(())
    }

    /// Removes the node type and cascades to every relationship that
    /// starts or ends on it. Returns the removed relationships.
    pub fn remove_node(&mut self, name: &str) -> Result<Vec<RelationshipType>, SchemaError> {
        let idx = self
            .node_types
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| SchemaError::NodeNotFound(name.to_string()))?;
        self.node_types.remove(idx);
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.relationship_types)
            .into_iter()
            .partition(|r| r.touches(name));
        self.relationship_types = kept;
        Ok(removed)
    }

    pub fn remove_relationship(&mut self, key: &RelKey) -> Result<RelationshipType, SchemaError> {
        let idx = self
            .relationship_types
            .iter()
            .position(|r| key.matches(r))
            .ok_or_else(|| SchemaError::RelationshipNotFound(key.clone()))?;
        Ok(self.relationship_types.remove(idx))
    }

    pub fn update_node(&mut self, name: &str, node: NodeType) -> Result<(), SchemaError> {
        validate_node(&node)?;
        let idx = self
            .node_types
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| SchemaError::NodeNotFound(name.to_string()))?;
        if node.name != name && self.contains_node(&node.name) {
            return Err(SchemaError::DuplicateNode(node.name));
        }
        let new_name = node.name.clone();
        self.node_types[idx] = node;
        if new_name != name {
            for rel in &mut self.relationship_types {
                if rel.start_node == name { rel.start_node = new_name.clone(); }
                if rel.end_node == name { rel.end_node = new_name.clone(); }
            }
        }
        Ok(())
    }

    pub fn update_relationship(&mut self, key: &RelKey, rel: RelationshipType) -> Result<(), SchemaError> {
        validate_relationship(&rel, self)?;
        let idx = self
            .relationship_types
            .iter()
            .position(|r| key.matches(r))
            .ok_or_else(|| SchemaError::RelationshipNotFound(key.clone()))?;
        let new_key = rel.key();
        if new_key != *key && self.relationship(&new_key).is_some() {
            return Err(SchemaError::DuplicateRelationship(new_key));
        }
        self.relationship_types[idx] = rel;
        Ok(())
    }
}

/// Applies a command atomically: the edit runs against copies, the result
/// is validated as a whole, and only then replaces `doc`/`positions`.
pub fn apply(doc: &mut SchemaDocument, positions: &mut PositionMap, cmd: EditCommand) -> Result<Change, SchemaError> {
    let mut next = doc.clone();
    let mut next_positions = positions.clone();
    let mut change = Change::default();

    match cmd {
        EditCommand::AddNode { node, position } => {
            let name = node.name.clone();
            next.add_node(node)?;
            change.model = true;
            if let Some(p) = position {
                next_positions.insert(name, p);
                change.positions = true;
            }
        }
        EditCommand::UpdateNode { name, node } => {
            let new_name = node.name.clone();
            next.update_node(&name, node)?;
            change.model = true;
            if new_name != name {
                if let Some(p) = next_positions.remove(&name) {
                    next_positions.insert(new_name, p);
                    change.positions = true;
                }
            }
        }
        EditCommand::DeleteNode { name } => {
            let removed = next.remove_node(&name)?;
            log::debug!("deleting node {} cascaded to {} relationship(s)", name, removed.len());
            change.model = true;
            change.positions = next_positions.remove(&name).is_some();
        }
        EditCommand::AddRelationship(rel) => {
            next.add_relationship(rel)?;
            change.model = true;
        }
        EditCommand::UpdateRelationship { key, relationship } => {
            next.update_relationship(&key, relationship)?;
            change.model = true;
        }
        EditCommand::DeleteRelationship(key) => {
            next.remove_relationship(&key)?;
            change.model = true;
        }
        EditCommand::SetPosition { name, position } => {
            if !next.contains_node(&name) {
                return Err(SchemaError::NodeNotFound(name));
            }
            next_positions.insert(name, position);
            change.positions = true;
        }
    }

    validate_document(&next)?;
    *doc = next;
    *positions = next_positions;
    Ok(change)
}
