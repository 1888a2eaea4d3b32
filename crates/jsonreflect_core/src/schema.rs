//! Schema node definitions and their JSON rendering

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON Schema primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl PrimitiveKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

/// Policy for keys not listed in an object's properties
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AdditionalProperties {
    /// Not rendered; JSON Schema's permissive default applies
    #[default]
    Unspecified,
    /// `additionalProperties: false`
    Forbidden,
    /// Every additional value must match this schema (map types)
    Schema(Box<SchemaNode>),
}

/// Object shape: ordered properties, required names and the additional
/// properties policy
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectShape {
    /// Properties in declaration order
    pub properties: IndexMap<String, SchemaNode>,
    /// Required property names in declaration order
    pub required: Vec<String>,
    pub additional_properties: AdditionalProperties,
}

impl ObjectShape {
    /// Shape of a map type whose values match `value`
    #[must_use]
    pub fn map_of(value: SchemaNode) -> Self {
        Self {
            additional_properties: AdditionalProperties::Schema(Box::new(value)),
            ..Self::default()
        }
    }
}

/// The closed set of schema shapes
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Untyped value, renders as `{}`
    Any,
    Primitive(PrimitiveKind),
    Array(Box<SchemaNode>),
    Object(ObjectShape),
    /// Reference to a named definition
    Reference(String),
    /// Enumeration of literal values
    Enum(Vec<Value>),
    /// Exactly one of the alternatives
    Union(Vec<SchemaNode>),
}

/// Documentation and constraint metadata attached to a node.
///
/// Field metadata is merged into the node produced for the field's type, so a
/// use site can carry a description or examples the type itself does not.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotations {
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub default: Option<Value>,
    pub examples: Vec<Value>,
    pub deprecated: bool,
    /// Set for optional (pointer-like) types
    pub nullable: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
}

impl Annotations {
    /// Overlay `other` on top of `self`: values set in `other` win, flags are
    /// combined.
    pub fn merge(&mut self, other: &Annotations) {
        fn overlay<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
            if source.is_some() {
                target.clone_from(source);
            }
        }

        overlay(&mut self.title, &other.title);
        overlay(&mut self.description, &other.description);
        overlay(&mut self.format, &other.format);
        overlay(&mut self.default, &other.default);
        if !other.examples.is_empty() {
            self.examples.clone_from(&other.examples);
        }
        self.deprecated |= other.deprecated;
        self.nullable |= other.nullable;
        self.read_only |= other.read_only;
        self.write_only |= other.write_only;
        overlay(&mut self.pattern, &other.pattern);
        overlay(&mut self.minimum, &other.minimum);
        overlay(&mut self.maximum, &other.maximum);
        overlay(&mut self.min_length, &other.min_length);
        overlay(&mut self.max_length, &other.max_length);
        overlay(&mut self.min_items, &other.min_items);
        overlay(&mut self.max_items, &other.max_items);
    }

    /// True when nothing but nullability is set
    #[must_use]
    pub fn is_bare(&self) -> bool {
        let mut probe = self.clone();
        probe.nullable = false;
        probe == Self::default()
    }

    fn render_into(&self, out: &mut Map<String, Value>) {
        if let Some(title) = &self.title {
            out.insert("title".into(), Value::String(title.clone()));
        }
        if let Some(description) = &self.description {
            out.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(format) = &self.format {
            out.insert("format".into(), Value::String(format.clone()));
        }
        if let Some(default) = &self.default {
            out.insert("default".into(), default.clone());
        }
        if !self.examples.is_empty() {
            out.insert("examples".into(), Value::Array(self.examples.clone()));
        }
        if self.deprecated {
            out.insert("deprecated".into(), Value::Bool(true));
        }
        if self.read_only {
            out.insert("readOnly".into(), Value::Bool(true));
        }
        if self.write_only {
            out.insert("writeOnly".into(), Value::Bool(true));
        }
        if let Some(pattern) = &self.pattern {
            out.insert("pattern".into(), Value::String(pattern.clone()));
        }
        if let Some(minimum) = self.minimum {
            out.insert("minimum".into(), number_constraint(minimum));
        }
        if let Some(maximum) = self.maximum {
            out.insert("maximum".into(), number_constraint(maximum));
        }
        for (key, value) in [
            ("minLength", self.min_length),
            ("maxLength", self.max_length),
            ("minItems", self.min_items),
            ("maxItems", self.max_items),
        ] {
            if let Some(value) = value {
                out.insert(key.into(), Value::from(value));
            }
        }
    }
}

/// Render a numeric constraint as an integer when it has no fractional part,
/// so bounds read `0` rather than `0.0`.
fn number_constraint(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        // Whole and well inside the exactly representable range
        #[allow(clippy::cast_possible_truncation)]
        let int_val = value as i64;
        Value::from(int_val)
    } else {
        serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

fn type_value(kind: &str, nullable: bool) -> Value {
    if nullable && kind != "null" {
        Value::Array(vec![Value::from(kind), Value::from("null")])
    } else {
        Value::from(kind)
    }
}

fn literal_type(value: &Value) -> Option<&'static str> {
    match value {
        Value::String(_) => Some("string"),
        Value::Bool(_) => Some("boolean"),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some("integer"),
        Value::Number(_) => Some("number"),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// One reflected type's shape plus its annotations
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: NodeKind,
    pub annotations: Annotations,
}

impl SchemaNode {
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            annotations: Annotations::default(),
        }
    }

    #[must_use]
    pub fn any() -> Self {
        Self::new(NodeKind::Any)
    }

    #[must_use]
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(NodeKind::Primitive(kind))
    }

    #[must_use]
    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    #[must_use]
    pub fn integer() -> Self {
        Self::primitive(PrimitiveKind::Integer)
    }

    #[must_use]
    pub fn number() -> Self {
        Self::primitive(PrimitiveKind::Number)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::primitive(PrimitiveKind::Boolean)
    }

    #[must_use]
    pub fn null() -> Self {
        Self::primitive(PrimitiveKind::Null)
    }

    #[must_use]
    pub fn array(items: SchemaNode) -> Self {
        Self::new(NodeKind::Array(Box::new(items)))
    }

    #[must_use]
    pub fn object(shape: ObjectShape) -> Self {
        Self::new(NodeKind::Object(shape))
    }

    #[must_use]
    pub fn reference(target: impl Into<String>) -> Self {
        Self::new(NodeKind::Reference(target.into()))
    }

    #[must_use]
    pub fn enumeration(values: Vec<Value>) -> Self {
        Self::new(NodeKind::Enum(values))
    }

    #[must_use]
    pub fn union(alternatives: Vec<SchemaNode>) -> Self {
        Self::new(NodeKind::Union(alternatives))
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.annotations.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.annotations.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.annotations.nullable = true;
        self
    }

    /// Target definition name when this node is a reference
    #[must_use]
    pub fn reference_target(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Reference(target) => Some(target),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectShape> {
        match &self.kind {
            NodeKind::Object(shape) => Some(shape),
            _ => None,
        }
    }

    /// Render as a JSON Schema value. `definitions_prefix` is prepended to
    /// every reference target (e.g. `#/definitions/`).
    #[must_use]
    pub fn to_value(&self, definitions_prefix: &str) -> Value {
        let mut out = Map::new();
        let nullable = self.annotations.nullable;

        match &self.kind {
            NodeKind::Any => {}
            NodeKind::Primitive(kind) => {
                out.insert("type".into(), type_value(kind.as_str(), nullable));
            }
            NodeKind::Array(items) => {
                out.insert("type".into(), type_value("array", nullable));
                out.insert("items".into(), items.to_value(definitions_prefix));
            }
            NodeKind::Object(shape) => {
                out.insert("type".into(), type_value("object", nullable));
                if !shape.properties.is_empty() {
                    let properties = shape
                        .properties
                        .iter()
                        .map(|(name, node)| (name.clone(), node.to_value(definitions_prefix)))
                        .collect::<Map<_, _>>();
                    out.insert("properties".into(), Value::Object(properties));
                }
                if !shape.required.is_empty() {
                    out.insert(
                        "required".into(),
                        Value::Array(shape.required.iter().cloned().map(Value::String).collect()),
                    );
                }
                match &shape.additional_properties {
                    AdditionalProperties::Unspecified => {}
                    AdditionalProperties::Forbidden => {
                        out.insert("additionalProperties".into(), Value::Bool(false));
                    }
                    AdditionalProperties::Schema(value) => {
                        out.insert(
                            "additionalProperties".into(),
                            value.to_value(definitions_prefix),
                        );
                    }
                }
            }
            NodeKind::Reference(target) => {
                let reference = Value::Object(Map::from_iter([(
                    "$ref".to_string(),
                    Value::String(format!("{definitions_prefix}{target}")),
                )]));
                if self.annotations.is_bare() {
                    return reference;
                }
                // Annotations cannot sit next to $ref in older drafts
                out.insert("allOf".into(), Value::Array(vec![reference]));
            }
            NodeKind::Enum(values) => {
                let mut values = values.clone();
                let common = values
                    .first()
                    .and_then(literal_type)
                    .filter(|first| values.iter().all(|v| literal_type(v) == Some(*first)));
                if nullable && !values.contains(&Value::Null) {
                    values.push(Value::Null);
                }
                if let Some(common) = common {
                    out.insert("type".into(), type_value(common, nullable));
                }
                out.insert("enum".into(), Value::Array(values));
            }
            NodeKind::Union(alternatives) => {
                let mut rendered: Vec<Value> = alternatives
                    .iter()
                    .map(|alt| alt.to_value(definitions_prefix))
                    .collect();
                if nullable {
                    rendered.push(SchemaNode::null().to_value(definitions_prefix));
                }
                out.insert("oneOf".into(), Value::Array(rendered));
            }
        }

        self.annotations.render_into(&mut out);
        Value::Object(out)
    }
}
