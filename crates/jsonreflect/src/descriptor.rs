//! Type descriptors: the explicit replacement for runtime type introspection.
//!
//! A [`TypeDescriptor`] states a type's name, declaring module, generic
//! arguments and structural kind. Descriptors come from the [`Reflect`] trait
//! (usually derived) or are assembled by hand with the builder methods. The
//! walker operates purely on descriptors, independent of how they were made.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use jsonreflect_core::{PrimitiveKind, TypeIdentity};
use serde_json::Value;

/// Types that can describe their own shape.
pub trait Reflect {
    fn descriptor() -> TypeDescriptor;
}

/// Lazily evaluated handle to a descriptor.
///
/// Field and element types are held behind this indirection so a
/// self-referential type can build its descriptor without recursing.
#[derive(Clone)]
pub struct TypeRef {
    build: Arc<dyn Fn() -> TypeDescriptor + Send + Sync>,
    /// Type of whatever produces the descriptor; `None` for a fixed value
    source: Option<TypeId>,
}

impl TypeRef {
    /// Handle to `T`'s descriptor
    #[must_use]
    pub fn of<T: Reflect + ?Sized + 'static>() -> Self {
        Self {
            build: Arc::new(T::descriptor),
            source: Some(TypeId::of::<T>()),
        }
    }

    #[must_use]
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> TypeDescriptor + Send + Sync + 'static,
    {
        Self {
            build: Arc::new(f),
            source: Some(TypeId::of::<F>()),
        }
    }

    #[must_use]
    pub fn from_descriptor(descriptor: TypeDescriptor) -> Self {
        Self {
            build: Arc::new(move || descriptor.clone()),
            source: None,
        }
    }

    /// Produce the descriptor
    #[must_use]
    pub fn resolve(&self) -> TypeDescriptor {
        (self.build)()
    }

    fn identity_in(&self, open: &mut Vec<Frame>) -> TypeIdentity {
        self.resolve().identity_in(self.source, open)
    }
}

/// An anonymous descriptor whose fingerprint is being computed
struct Frame {
    source: Option<TypeId>,
    shape: String,
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.resolve().identity())
    }
}

impl From<TypeDescriptor> for TypeRef {
    fn from(descriptor: TypeDescriptor) -> Self {
        Self::from_descriptor(descriptor)
    }
}

/// Structural kind of a described type
#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive {
        kind: PrimitiveKind,
        format: Option<Cow<'static, str>>,
    },
    /// Nullable, otherwise transparent wrapper (`Option<T>`)
    Optional(TypeRef),
    /// Transparent indirection (`Box<T>`, `Arc<T>`, `&T`, newtypes)
    Indirect(TypeRef),
    Sequence(TypeRef),
    Map {
        key: TypeRef,
        value: TypeRef,
    },
    Struct(Vec<FieldDescriptor>),
    /// Literal values, e.g. a unit-only enum
    Enum(Vec<Value>),
    /// Exactly one of several alternatives
    Union(Vec<TypeRef>),
    /// Any JSON value
    Any,
    /// A type with no schema representation
    Unsupported(Cow<'static, str>),
}

impl TypeKind {
    /// Struct, enum and union types are candidates for hoisting
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Struct(_) | Self::Enum(_) | Self::Union(_))
    }
}

/// One field slot of a struct descriptor.
///
/// `tags` are raw `key = value` metadata strings, validated at reflect time.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: Cow<'static, str>,
    pub ty: TypeRef,
    pub tags: Vec<(Cow<'static, str>, Cow<'static, str>)>,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            tags: Vec::new(),
        }
    }

    /// Attach a raw metadata tag
    #[must_use]
    pub fn tag(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    /// Last value given for `key`
    #[must_use]
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_ref())
    }
}

/// Description of a type's name, generic arguments and shape
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Declared name; `None` for anonymous types
    pub name: Option<Cow<'static, str>>,
    /// Declaring module path
    pub module: Option<Cow<'static, str>>,
    /// Resolved generic arguments
    pub args: Vec<TypeRef>,
    /// Type-level documentation
    pub description: Option<Cow<'static, str>>,
    pub kind: TypeKind,
}

impl TypeDescriptor {
    #[must_use]
    pub fn new(name: Option<Cow<'static, str>>, kind: TypeKind) -> Self {
        Self {
            name,
            module: None,
            args: Vec::new(),
            description: None,
            kind,
        }
    }

    #[must_use]
    pub fn primitive(name: impl Into<Cow<'static, str>>, kind: PrimitiveKind) -> Self {
        Self::new(Some(name.into()), TypeKind::Primitive { kind, format: None })
    }

    /// Named struct
    #[must_use]
    pub fn object(name: impl Into<Cow<'static, str>>, fields: Vec<FieldDescriptor>) -> Self {
        Self::new(Some(name.into()), TypeKind::Struct(fields))
    }

    /// Anonymous struct, identified by its shape
    #[must_use]
    pub fn anonymous(fields: Vec<FieldDescriptor>) -> Self {
        Self::new(None, TypeKind::Struct(fields))
    }

    #[must_use]
    pub fn enumeration(name: impl Into<Cow<'static, str>>, values: Vec<Value>) -> Self {
        Self::new(Some(name.into()), TypeKind::Enum(values))
    }

    /// Named enumeration of string literals
    #[must_use]
    pub fn string_enum(name: impl Into<Cow<'static, str>>, variants: &[&str]) -> Self {
        Self::enumeration(name, variants.iter().map(|v| Value::from(*v)).collect())
    }

    /// Anonymous single string literal
    #[must_use]
    pub fn literal(value: &str) -> Self {
        Self::new(None, TypeKind::Enum(vec![Value::from(value)]))
    }

    #[must_use]
    pub fn union(name: impl Into<Cow<'static, str>>, alternatives: Vec<TypeRef>) -> Self {
        Self::new(Some(name.into()), TypeKind::Union(alternatives))
    }

    #[must_use]
    pub fn optional(inner: TypeRef) -> Self {
        Self::new(None, TypeKind::Optional(inner))
    }

    #[must_use]
    pub fn indirect(inner: TypeRef) -> Self {
        Self::new(None, TypeKind::Indirect(inner))
    }

    /// Sequence type such as `Vec<T>`; `item` is also its generic argument
    #[must_use]
    pub fn sequence(name: impl Into<Cow<'static, str>>, item: TypeRef) -> Self {
        Self::new(Some(name.into()), TypeKind::Sequence(item.clone())).with_args(vec![item])
    }

    #[must_use]
    pub fn map(name: impl Into<Cow<'static, str>>, key: TypeRef, value: TypeRef) -> Self {
        Self::new(
            Some(name.into()),
            TypeKind::Map {
                key: key.clone(),
                value: value.clone(),
            },
        )
        .with_args(vec![key, value])
    }

    #[must_use]
    pub fn any(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Some(name.into()), TypeKind::Any)
    }

    #[must_use]
    pub fn unsupported(
        name: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(Some(name.into()), TypeKind::Unsupported(reason.into()))
    }

    #[must_use]
    pub fn with_module(mut self, module: impl Into<Cow<'static, str>>) -> Self {
        self.module = Some(module.into());
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<TypeRef>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the format of a primitive descriptor; ignored for other kinds
    #[must_use]
    pub fn with_format(mut self, format: impl Into<Cow<'static, str>>) -> Self {
        if let TypeKind::Primitive { format: slot, .. } = &mut self.kind {
            *slot = Some(format.into());
        }
        self
    }

    /// Canonical identity. Optional and indirect wrappers share the identity
    /// of what they point to.
    #[must_use]
    pub fn identity(&self) -> TypeIdentity {
        self.identity_in(None, &mut Vec::new())
    }

    /// Anonymous descriptors re-entered from the same source with the same
    /// shape become back references `#n`, counting enclosing anonymous
    /// frames outwards from zero.
    fn identity_in(&self, source: Option<TypeId>, open: &mut Vec<Frame>) -> TypeIdentity {
        match (&self.kind, &self.name) {
            (TypeKind::Optional(inner) | TypeKind::Indirect(inner), _) => inner.identity_in(open),
            (_, Some(name)) => TypeIdentity::named(
                self.module.as_deref(),
                name,
                self.args.iter().map(|arg| arg.identity_in(open)).collect(),
            ),
            (_, None) => {
                let shape = self.shape();
                if source.is_some()
                    && let Some(pos) = open
                        .iter()
                        .rposition(|frame| frame.source == source && frame.shape == shape)
                {
                    return TypeIdentity::structural(format!("#{}", open.len() - 1 - pos));
                }
                open.push(Frame { source, shape });
                let fingerprint = self.fingerprint(open);
                open.pop();
                TypeIdentity::structural(fingerprint)
            }
        }
    }

    /// Outline of an anonymous descriptor without descending into its parts
    fn shape(&self) -> String {
        match &self.kind {
            TypeKind::Struct(fields) => fields
                .iter()
                .map(|field| format!("{}{:?}", field.name, field.tags))
                .collect::<Vec<_>>()
                .join(","),
            TypeKind::Union(alternatives) => format!("oneOf/{}", alternatives.len()),
            TypeKind::Sequence(_) => "[]".to_string(),
            TypeKind::Map { .. } => "{}".to_string(),
            _ => String::new(),
        }
    }

    fn fingerprint(&self, open: &mut Vec<Frame>) -> String {
        let mut nested = |ty: &TypeRef| ty.identity_in(open).to_string();
        match &self.kind {
            TypeKind::Primitive { kind, format } => match format {
                Some(format) => format!("{}({format})", kind.as_str()),
                None => kind.as_str().to_string(),
            },
            TypeKind::Optional(inner) | TypeKind::Indirect(inner) => nested(inner),
            TypeKind::Sequence(item) => format!("[{}]", nested(item)),
            TypeKind::Map { key, value } => {
                let key = nested(key);
                format!("{{{key}: {}}}", nested(value))
            }
            TypeKind::Struct(fields) => {
                let body = fields
                    .iter()
                    .map(|field| {
                        let tags = field
                            .tags
                            .iter()
                            .map(|(k, v)| format!("{k}={v:?}"))
                            .collect::<Vec<_>>()
                            .join(" ");
                        format!("{}: {} `{tags}`", field.name, nested(&field.ty))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("struct {{{body}}}")
            }
            TypeKind::Enum(values) => format!("enum {}", Value::Array(values.clone())),
            TypeKind::Union(alternatives) => format!(
                "oneOf({})",
                alternatives.iter().map(nested).collect::<Vec<_>>().join(" | ")
            ),
            TypeKind::Any => "any".to_string(),
            TypeKind::Unsupported(reason) => format!("unsupported({reason})"),
        }
    }

    /// Human-readable label: the declared name, or `{anonymous}`
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.kind, &self.name) {
            (TypeKind::Optional(inner) | TypeKind::Indirect(inner), _) => inner.resolve().label(),
            (_, Some(name)) => name.to_string(),
            (_, None) => "{anonymous}".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf;

    impl Reflect for Leaf {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::object(
                "Leaf",
                vec![FieldDescriptor::new("value", TypeRef::of::<String>())],
            )
            .with_module("app::tree")
        }
    }

    struct Node;

    impl Reflect for Node {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::object(
                "Node",
                vec![FieldDescriptor::new("next", TypeRef::of::<Option<Box<Node>>>())],
            )
            .with_module("app::tree")
        }
    }

    #[test]
    fn self_referential_descriptor_builds_lazily() {
        let descriptor = Node::descriptor();
        let TypeKind::Struct(fields) = &descriptor.kind else {
            panic!("expected struct descriptor");
        };
        assert_eq!(fields[0].ty.resolve().identity(), descriptor.identity());
    }

    #[test]
    fn optional_and_indirect_are_transparent_for_identity() {
        let leaf = Leaf::descriptor().identity();
        assert_eq!(TypeRef::of::<Option<Leaf>>().resolve().identity(), leaf);
        assert_eq!(TypeRef::of::<Box<Leaf>>().resolve().identity(), leaf);
        assert_eq!(leaf.to_string(), "app::tree::Leaf");
    }

    #[test]
    fn generic_arguments_are_part_of_identity() {
        let page = |arg: TypeRef| {
            TypeDescriptor::object("Page", vec![FieldDescriptor::new("items", arg.clone())])
                .with_module("app")
                .with_args(vec![arg])
        };
        let a = page(TypeRef::of::<Leaf>()).identity();
        let b = page(TypeRef::of::<String>()).identity();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "app::Page<app::tree::Leaf>");
        assert_eq!(b.to_string(), "app::Page<String>");
    }

    #[test]
    fn anonymous_identity_depends_on_fields_and_tags() {
        let plain = TypeDescriptor::anonymous(vec![FieldDescriptor::new("a", TypeRef::of::<i32>())]);
        let tagged = TypeDescriptor::anonymous(vec![
            FieldDescriptor::new("a", TypeRef::of::<i32>()).tag("required", "true"),
        ]);
        assert!(!plain.identity().is_named());
        assert_ne!(plain.identity(), tagged.identity());
        assert_eq!(
            plain.identity(),
            TypeDescriptor::anonymous(vec![FieldDescriptor::new("a", TypeRef::of::<i32>())]).identity()
        );
    }

    #[test]
    fn self_nested_anonymous_fingerprint_uses_back_references() {
        fn looping() -> TypeDescriptor {
            TypeDescriptor::anonymous(vec![FieldDescriptor::new("inner", TypeRef::from_fn(looping))])
        }
        assert_eq!(
            looping().identity().to_string(),
            "struct {inner: struct {inner: #0 ``} ``}"
        );
    }

    #[test]
    fn branching_anonymous_self_nesting_stays_linear() {
        fn branching() -> TypeDescriptor {
            let side = || TypeDescriptor::optional(TypeRef::from_fn(branching)).into();
            TypeDescriptor::anonymous(vec![
                FieldDescriptor::new("l", side()),
                FieldDescriptor::new("r", side()),
            ])
        }
        let identity = branching().identity().to_string();
        assert_eq!(identity.matches("#0").count(), 4);
    }

    #[test]
    fn deep_anonymous_nesting_keeps_distinct_identities() {
        fn nest(depth: usize, leaf: TypeRef) -> TypeDescriptor {
            let innermost = TypeDescriptor::anonymous(vec![FieldDescriptor::new("v", leaf)]);
            (0..depth).fold(innermost, |inner, _| {
                TypeDescriptor::anonymous(vec![FieldDescriptor::new("v", inner.into())])
            })
        }
        let ints = nest(40, TypeRef::of::<i32>()).identity();
        let flags = nest(40, TypeRef::of::<bool>()).identity();
        assert_ne!(ints, flags);
    }

    #[test]
    fn tag_value_returns_last_occurrence() {
        let field = FieldDescriptor::new("x", TypeRef::of::<String>())
            .tag("description", "first")
            .tag("description", "second");
        assert_eq!(field.tag_value("description"), Some("second"));
        assert_eq!(field.tag_value("format"), None);
    }
}
