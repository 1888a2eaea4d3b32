//! jsonreflect - JSON Schema generation from Rust type descriptors
//!
//! Types describe themselves through the [`Reflect`] trait, usually derived
//! with `#[derive(Reflect)]`. A [`Reflector`] walks the described type graph
//! once per distinct type, merges per-field metadata and produces a
//! [`Document`] with a deduplicated, stably named definitions table.
//!
//! ```ignore
//! use jsonreflect::{Reflect, ReflectOptions, Reflector};
//!
//! #[derive(Reflect)]
//! struct Pet {
//!     /// Display name
//!     name: String,
//!     #[schema(required, example = "3")]
//!     age: Option<u8>,
//! }
//!
//! let doc = Reflector::new(ReflectOptions::new()).reflect_type::<Pet>()?;
//! println!("{}", doc.to_canonical_string()?);
//! ```

// Lets the derive refer to `::jsonreflect` from inside this crate's tests
extern crate self as jsonreflect;

pub mod descriptor;
pub mod error;
pub mod naming;
pub mod options;
pub mod reflector;
pub mod registry;
mod std_impls;
pub mod tags;
pub mod walker;

// Re-export jsonreflect_core types so users don't need to depend on it directly
pub mod schema {
    pub use jsonreflect_core::schema::*;
}

pub mod document {
    pub use jsonreflect_core::document::*;
}

pub use jsonreflect_core::{
    AdditionalProperties, Annotations, DefinitionEntry, Document, NodeKind, ObjectShape,
    PrimitiveKind, SchemaNode, TypeIdentity,
};

pub use descriptor::{FieldDescriptor, Reflect, TypeDescriptor, TypeKind, TypeRef};
pub use error::{ReflectError, Result};
pub use naming::NameResolver;
pub use options::{FieldContext, FieldHook, ReflectConfig, ReflectOptions, TypeContext, TypeHook};
pub use reflector::Reflector;
pub use registry::{DefinitionRegistry, HoistPolicy};
pub use tags::{FieldMetadata, FieldShape, TagExtractor, ValueShape};
pub use walker::{TypeWalker, VisitStack};

// Re-export the derive; it shares the trait's name in the macro namespace
pub use jsonreflect_macro::Reflect;

// Re-export serde_json for hook implementations building literal values
pub use serde_json;
