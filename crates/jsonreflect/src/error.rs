//! Reflection errors

use thiserror::Error;

/// Failure of a reflect call. Every variant aborts the whole call; no partial
/// document is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReflectError {
    /// The type cannot be represented as a schema at all
    #[error("unsupported type kind for `{type_name}`: {reason}")]
    UnsupportedTypeKind { type_name: String, reason: String },

    /// Declared field metadata failed to parse or is inconsistent
    #[error("malformed field metadata at `{field_path}`: `{key}` = {raw_value:?}: {reason}")]
    MalformedFieldMetadata {
        /// Dot-separated ancestor chain, e.g. `Order.lines.sku`
        field_path: String,
        key: String,
        raw_value: String,
        reason: String,
    },

    /// Two distinct types could not be given distinct names
    #[error("cannot assign a unique definition name `{name}` to `{identity}` (taken by `{taken_by}`)")]
    NameCollisionUnresolvable {
        name: String,
        identity: String,
        taken_by: String,
    },

    /// A cycle was found through a type that cannot be named
    #[error("cycle through `{identity}` cannot be resolved to a named definition")]
    CycleWithoutResolution { identity: String },

    /// Acyclic nesting deeper than the configured limit
    #[error("type nesting exceeds depth limit {depth} at `{identity}`")]
    DepthLimitExceeded { identity: String, depth: usize },
}

impl ReflectError {
    pub(crate) fn malformed(
        field_path: &str,
        key: &str,
        raw_value: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedFieldMetadata {
            field_path: field_path.to_string(),
            key: key.to_string(),
            raw_value: raw_value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedTypeKind {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = ReflectError> = std::result::Result<T, E>;
