//! Reflected document structure definitions

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::identity::TypeIdentity;
use crate::schema::SchemaNode;

/// Default location of shared definitions inside a document
pub const DEFAULT_DEFINITIONS_PREFIX: &str = "#/definitions/";

/// A hoisted, named definition
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionEntry {
    /// Unique definition name
    pub name: String,
    /// Resolved schema of the definition
    pub node: SchemaNode,
    /// Type the definition was produced from
    pub source: TypeIdentity,
}

/// Result of one reflect call: one schema per root plus the shared
/// definitions table, ordered by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// One node (possibly a reference) per reflected root, in input order
    pub roots: Vec<SchemaNode>,
    /// Definitions keyed and ordered by name
    pub definitions: BTreeMap<String, DefinitionEntry>,
    /// Prefix prepended to reference targets when rendering
    pub definitions_prefix: String,
}

impl Document {
    #[must_use]
    pub fn new(roots: Vec<SchemaNode>, definitions: BTreeMap<String, DefinitionEntry>) -> Self {
        Self {
            roots,
            definitions,
            definitions_prefix: DEFAULT_DEFINITIONS_PREFIX.to_string(),
        }
    }

    /// The first root, which is the only one for single-value reflection
    #[must_use]
    pub fn root(&self) -> Option<&SchemaNode> {
        self.roots.first()
    }

    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&SchemaNode> {
        self.definitions.get(name).map(|entry| &entry.node)
    }

    /// Definition names in document order
    pub fn definition_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Render the document. A single root renders as that root's schema with
    /// a `definitions` member; several roots render under `roots`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let prefix = self.definitions_prefix.as_str();
        let definitions: Map<String, Value> = self
            .definitions
            .iter()
            .map(|(name, entry)| (name.clone(), entry.node.to_value(prefix)))
            .collect();

        let mut out = if let [root] = self.roots.as_slice() {
            match root.to_value(prefix) {
                Value::Object(map) => map,
                other => Map::from_iter([("roots".to_string(), Value::Array(vec![other]))]),
            }
        } else {
            Map::from_iter([(
                "roots".to_string(),
                Value::Array(self.roots.iter().map(|r| r.to_value(prefix)).collect()),
            )])
        };

        if !definitions.is_empty() {
            out.insert("definitions".into(), Value::Object(definitions));
        }
        Value::Object(out)
    }

    /// Canonical text form: pretty JSON with sorted keys at every level, byte
    /// stable for identical inputs.
    pub fn to_canonical_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_value())
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
