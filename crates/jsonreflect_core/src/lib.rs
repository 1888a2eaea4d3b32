//! Data model shared by the jsonreflect engine: type identities, the closed
//! schema node representation and the assembled document.

pub mod document;
pub mod identity;
pub mod schema;

pub use document::{DefinitionEntry, Document};
pub use identity::TypeIdentity;
pub use schema::{AdditionalProperties, Annotations, NodeKind, ObjectShape, PrimitiveKind, SchemaNode};
