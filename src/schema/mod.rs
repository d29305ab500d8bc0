pub mod commands;
pub mod exchange;
pub mod model;
pub mod validate;

pub use commands::{apply, Change, EditCommand, EditOutcome};
pub use model::{
    NodeDraft, NodeType, PositionMap, Property, PropertyType, RelKey, RelationshipDraft, RelationshipType,
    SchemaDocument, Selection,
};
pub use validate::SchemaError;
