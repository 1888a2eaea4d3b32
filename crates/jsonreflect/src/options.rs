//! Reflection options: plain-data configuration plus caller hooks.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use jsonreflect_core::{SchemaNode, TypeIdentity};
use jsonreflect_core::document::DEFAULT_DEFINITIONS_PREFIX;
use serde::{Deserialize, Serialize};

use crate::descriptor::{FieldDescriptor, TypeDescriptor};
use crate::error::Result;
use crate::registry::HoistPolicy;
use crate::tags::FieldMetadata;

const DEFAULT_MAX_DEPTH: usize = 128;

/// Serializable configuration of a [`Reflector`](crate::Reflector)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReflectConfig {
    /// Prefixes removed from every definition name segment
    pub prefixes_to_strip: BTreeSet<String>,
    pub hoist_policy: HoistPolicy,
    /// Prepended to definition names in `$ref` targets
    pub definitions_prefix: String,
    /// Non-optional fields are required unless tagged `required = false`
    pub required_from_optionality: bool,
    /// Prefix definition names with the declaring module
    pub qualify_names: bool,
    /// Maximum nesting depth of acyclic type graphs
    pub max_depth: usize,
}

impl Default for ReflectConfig {
    fn default() -> Self {
        Self {
            prefixes_to_strip: BTreeSet::new(),
            hoist_policy: HoistPolicy::default(),
            definitions_prefix: DEFAULT_DEFINITIONS_PREFIX.to_string(),
            required_from_optionality: false,
            qualify_names: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ReflectConfig {
    /// Parse configuration from JSON text; missing keys take their defaults
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// What a type hook sees
#[derive(Debug)]
pub struct TypeContext<'a> {
    pub identity: &'a TypeIdentity,
    pub descriptor: &'a TypeDescriptor,
}

/// What a field hook sees
#[derive(Debug)]
pub struct FieldContext<'a> {
    /// Dot-separated field path, e.g. `Order.lines.sku`
    pub path: &'a str,
    /// Identity of the struct declaring the field
    pub parent: &'a TypeIdentity,
    pub field: &'a FieldDescriptor,
    /// Descriptor of the field's type
    pub descriptor: &'a TypeDescriptor,
}

/// Rewrites the node produced for a type before it is cached
pub type TypeHook = Arc<dyn Fn(&TypeContext<'_>, &mut SchemaNode) -> Result<()> + Send + Sync>;

/// Rewrites a field's metadata before it is merged into the field's node
pub type FieldHook = Arc<dyn Fn(&FieldContext<'_>, &mut FieldMetadata) -> Result<()> + Send + Sync>;

/// Configuration plus hooks. Hooks run in registration order.
#[derive(Clone, Default)]
pub struct ReflectOptions {
    pub config: ReflectConfig,
    pub type_hooks: Vec<TypeHook>,
    pub field_hooks: Vec<FieldHook>,
}

impl ReflectOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: ReflectConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefixes_to_strip.insert(prefix.into());
        self
    }

    #[must_use]
    pub const fn hoist_policy(mut self, policy: HoistPolicy) -> Self {
        self.config.hoist_policy = policy;
        self
    }

    #[must_use]
    pub fn definitions_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.definitions_prefix = prefix.into();
        self
    }

    #[must_use]
    pub const fn required_from_optionality(mut self, enabled: bool) -> Self {
        self.config.required_from_optionality = enabled;
        self
    }

    #[must_use]
    pub const fn qualify_names(mut self, enabled: bool) -> Self {
        self.config.qualify_names = enabled;
        self
    }

    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    #[must_use]
    pub fn intercept_type<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TypeContext<'_>, &mut SchemaNode) -> Result<()> + Send + Sync + 'static,
    {
        self.type_hooks.push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn intercept_field<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FieldContext<'_>, &mut FieldMetadata) -> Result<()> + Send + Sync + 'static,
    {
        self.field_hooks.push(Arc::new(hook));
        self
    }
}

impl fmt::Debug for ReflectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectOptions")
            .field("config", &self.config)
            .field("type_hooks", &self.type_hooks.len())
            .field("field_hooks", &self.field_hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ReflectConfig::default();
        assert!(config.qualify_names);
        assert!(!config.required_from_optionality);
        assert_eq!(config.definitions_prefix, "#/definitions/");
        assert_eq!(config.max_depth, 128);
        assert_eq!(config.hoist_policy, HoistPolicy::Named);
    }

    #[test]
    fn config_parses_partial_camel_case_json() {
        let config = ReflectConfig::from_json_str(
            r##"{"prefixesToStrip": ["JsonschemaGoTest"], "hoistPolicy": "shared", "definitionsPrefix": "#/components/schemas/"}"##,
        )
        .unwrap();
        assert!(config.prefixes_to_strip.contains("JsonschemaGoTest"));
        assert_eq!(config.hoist_policy, HoistPolicy::Shared);
        assert_eq!(config.definitions_prefix, "#/components/schemas/");
        assert!(config.qualify_names);
    }

    #[test]
    fn config_rejects_wrong_types() {
        assert!(ReflectConfig::from_json_str(r#"{"maxDepth": "deep"}"#).is_err());
    }

    #[test]
    fn builder_collects_hooks_in_order() {
        let options = ReflectOptions::new()
            .strip_prefix("Api")
            .strip_prefix("Api")
            .intercept_type(|_, _| Ok(()))
            .intercept_type(|_, node| {
                node.annotations.deprecated = true;
                Ok(())
            })
            .intercept_field(|_, _| Ok(()));
        assert_eq!(options.config.prefixes_to_strip.len(), 1);
        assert_eq!(options.type_hooks.len(), 2);
        assert_eq!(
            format!("{options:?}"),
            format!(
                "ReflectOptions {{ config: {:?}, type_hooks: 2, field_hooks: 1 }}",
                options.config
            )
        );
    }
}
