//! Descriptor to schema conversion.
//!
//! The walker visits each distinct composite type once. Nested composites
//! are emitted as placeholder references keyed by identity and recorded with
//! their use site in the [`DefinitionRegistry`]; whether a placeholder ends
//! up as a `$ref` or an inlined body is decided after the whole graph has
//! been seen.

use jsonreflect_core::{NodeKind, ObjectShape, PrimitiveKind, SchemaNode, TypeIdentity};
use tracing::{debug, trace};

use crate::descriptor::{FieldDescriptor, TypeDescriptor, TypeKind, TypeRef};
use crate::error::{ReflectError, Result};
use crate::options::{FieldContext, ReflectOptions, TypeContext};
use crate::registry::DefinitionRegistry;
use crate::tags::{FieldShape, TagExtractor};

/// Identities of the composite types currently being walked, outermost first
#[derive(Debug, Clone, Default)]
pub struct VisitStack {
    frames: Vec<TypeIdentity>,
}

impl VisitStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, identity: TypeIdentity) {
        self.frames.push(identity);
    }

    pub fn pop(&mut self) -> Option<TypeIdentity> {
        self.frames.pop()
    }

    #[must_use]
    pub fn contains(&self, identity: &TypeIdentity) -> bool {
        self.frames.contains(identity)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn frames(&self) -> &[TypeIdentity] {
        &self.frames
    }
}

pub struct TypeWalker<'a> {
    options: &'a ReflectOptions,
    registry: &'a mut DefinitionRegistry,
    stack: VisitStack,
    /// Nesting of non-wrapper types currently being walked
    depth: usize,
}

impl<'a> TypeWalker<'a> {
    pub fn new(options: &'a ReflectOptions, registry: &'a mut DefinitionRegistry) -> Self {
        Self {
            options,
            registry,
            stack: VisitStack::new(),
            depth: 0,
        }
    }

    #[must_use]
    pub const fn stack(&self) -> &VisitStack {
        &self.stack
    }

    /// Walk a root type. `site` distinguishes roots of one call.
    pub fn walk_root(&mut self, root: &TypeRef, site: &str) -> Result<SchemaNode> {
        let descriptor = root.resolve();
        let path = descriptor.label();
        self.walk(&descriptor, site, &path)
    }

    /// Produce the node for `descriptor` used at `site`. `path` is the field
    /// path reported in errors.
    pub fn walk(&mut self, descriptor: &TypeDescriptor, site: &str, path: &str) -> Result<SchemaNode> {
        self.walk_with(descriptor, site, path, false)
    }

    fn walk_with(
        &mut self,
        descriptor: &TypeDescriptor,
        site: &str,
        path: &str,
        inline: bool,
    ) -> Result<SchemaNode> {
        match &descriptor.kind {
            TypeKind::Optional(inner) => {
                Ok(self.walk_with(&inner.resolve(), site, path, inline)?.nullable())
            }
            TypeKind::Indirect(inner) => self.walk_with(&inner.resolve(), site, path, inline),
            _ => {
                if self.depth >= self.options.config.max_depth {
                    return Err(ReflectError::DepthLimitExceeded {
                        identity: descriptor.identity().to_string(),
                        depth: self.options.config.max_depth,
                    });
                }
                self.depth += 1;
                let result = if descriptor.kind.is_composite() {
                    self.walk_composite(descriptor, site, path, inline)
                } else {
                    self.walk_leaf(descriptor, site, path)
                        .and_then(|node| self.intercept(descriptor, None, node))
                };
                self.depth -= 1;
                result
            }
        }
    }

    fn walk_leaf(&mut self, descriptor: &TypeDescriptor, site: &str, path: &str) -> Result<SchemaNode> {
        let mut node = match &descriptor.kind {
            TypeKind::Primitive { kind, format } => {
                let node = SchemaNode::primitive(*kind);
                match format {
                    Some(format) => node.with_format(format.as_ref()),
                    None => node,
                }
            }
            TypeKind::Sequence(item) => {
                SchemaNode::array(self.walk(&item.resolve(), &format!("{site}[]"), path)?)
            }
            TypeKind::Map { key, value } => {
                check_map_key(descriptor, &key.resolve())?;
                let value = self.walk(&value.resolve(), &format!("{site}{{}}"), path)?;
                SchemaNode::object(ObjectShape::map_of(value))
            }
            TypeKind::Any => SchemaNode::any(),
            TypeKind::Unsupported(reason) => {
                return Err(ReflectError::unsupported(
                    descriptor.identity().to_string(),
                    reason.as_ref(),
                ));
            }
            TypeKind::Optional(_)
            | TypeKind::Indirect(_)
            | TypeKind::Struct(_)
            | TypeKind::Enum(_)
            | TypeKind::Union(_) => {
                return Err(ReflectError::unsupported(
                    descriptor.identity().to_string(),
                    "not a leaf type",
                ));
            }
        };
        if let Some(description) = &descriptor.description {
            node.annotations.description = Some(description.to_string());
        }
        Ok(node)
    }

    fn walk_composite(
        &mut self,
        descriptor: &TypeDescriptor,
        site: &str,
        path: &str,
        inline: bool,
    ) -> Result<SchemaNode> {
        let identity = descriptor.identity();
        let key = identity.key();

        if self.stack.contains(&identity) {
            if !identity.is_named() {
                return Err(ReflectError::CycleWithoutResolution { identity: key });
            }
            trace!(%identity, "cycle reference");
            self.registry.mark_cycle(&key);
            self.registry.record_use(&key, site);
            return Ok(SchemaNode::reference(key));
        }

        if self.registry.contains(&key) {
            trace!(%identity, "cache hit");
        } else {
            self.build(descriptor, &identity, path)?;
        }

        let embed = inline || !self.registry.is_candidate(&key);
        if embed
            && !self.registry.is_cycle_target(&key)
            && let Some(body) = self.registry.cached(&key)
        {
            return Ok(body.clone());
        }
        self.registry.record_use(&key, site);
        Ok(SchemaNode::reference(key))
    }

    /// Walk the body of a composite type and cache it
    fn build(&mut self, descriptor: &TypeDescriptor, identity: &TypeIdentity, path: &str) -> Result<()> {
        let key = identity.key();
        debug!(%identity, "walking type");
        self.registry.begin(identity.clone(), identity.is_named());
        self.stack.push(identity.clone());
        let body = self.walk_body(descriptor, identity, &key, path);
        self.stack.pop();

        let mut body = body?;
        if let Some(description) = &descriptor.description {
            body.annotations.description = Some(description.to_string());
        }
        let body = self.intercept(descriptor, Some(identity), body)?;
        let candidate = identity.is_named()
            && matches!(
                body.kind,
                NodeKind::Object(_) | NodeKind::Enum(_) | NodeKind::Union(_)
            );
        self.registry.complete(&key, body, candidate);
        Ok(())
    }

    fn walk_body(
        &mut self,
        descriptor: &TypeDescriptor,
        identity: &TypeIdentity,
        key: &str,
        path: &str,
    ) -> Result<SchemaNode> {
        match &descriptor.kind {
            TypeKind::Struct(fields) => self.walk_struct(identity, key, fields, path),
            TypeKind::Enum(values) => Ok(SchemaNode::enumeration(values.clone())),
            TypeKind::Union(alternatives) => {
                let mut nodes = Vec::with_capacity(alternatives.len());
                for (i, alternative) in alternatives.iter().enumerate() {
                    nodes.push(self.walk(&alternative.resolve(), &format!("{key}|{i}"), path)?);
                }
                Ok(SchemaNode::union(nodes))
            }
            _ => self.walk_leaf(descriptor, key, path),
        }
    }

    fn walk_struct(
        &mut self,
        parent: &TypeIdentity,
        key: &str,
        fields: &[FieldDescriptor],
        path: &str,
    ) -> Result<SchemaNode> {
        let mut shape = ObjectShape::default();

        for field in fields {
            let field_path = format!("{path}.{}", field.name);
            let field_ty = field.ty.resolve();
            let field_shape = FieldShape::of(&field_ty);
            let mut meta = TagExtractor::new(&field_path, &field_shape)
                .required_from_optionality(self.options.config.required_from_optionality)
                .extract(field)?;

            let context = FieldContext {
                path: &field_path,
                parent,
                field,
                descriptor: &field_ty,
            };
            for hook in &self.options.field_hooks {
                hook(&context, &mut meta)?;
            }
            if meta.skip {
                continue;
            }
            if shape.properties.contains_key(&meta.exposed_name) {
                return Err(ReflectError::malformed(
                    &field_path,
                    "name",
                    &meta.exposed_name,
                    "duplicate property name",
                ));
            }

            let site = format!("{key}.{}", field.name);
            let mut node = self.walk_with(&field_ty, &site, &field_path, meta.inline)?;
            node.annotations.merge(&meta.annotations());
            if meta.required {
                shape.required.push(meta.exposed_name.clone());
            }
            shape.properties.insert(meta.exposed_name, node);
        }

        Ok(SchemaNode::object(shape))
    }

    /// Run the type hooks over a freshly built node
    fn intercept(
        &self,
        descriptor: &TypeDescriptor,
        identity: Option<&TypeIdentity>,
        mut node: SchemaNode,
    ) -> Result<SchemaNode> {
        if self.options.type_hooks.is_empty() {
            return Ok(node);
        }
        let computed;
        let identity = match identity {
            Some(identity) => identity,
            None => {
                computed = descriptor.identity();
                &computed
            }
        };
        let context = TypeContext {
            identity,
            descriptor,
        };
        for hook in &self.options.type_hooks {
            hook(&context, &mut node)?;
        }
        Ok(node)
    }
}

/// Map keys render as JSON object keys, so they must be string-like
fn check_map_key(map: &TypeDescriptor, key: &TypeDescriptor) -> Result<()> {
    let mut key = key.clone();
    while let TypeKind::Optional(inner) | TypeKind::Indirect(inner) = &key.kind {
        key = inner.resolve();
    }
    let ok = match &key.kind {
        TypeKind::Primitive { kind, .. } => {
            matches!(kind, PrimitiveKind::String | PrimitiveKind::Integer)
        }
        TypeKind::Enum(values) => values.iter().all(serde_json::Value::is_string),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ReflectError::unsupported(
            map.identity().to_string(),
            format!("map key `{}` is not a string, integer or string enum", key.label()),
        ))
    }
}
