//! Field metadata extraction.
//!
//! Turns the raw `key = value` tags of a field slot into [`FieldMetadata`],
//! validating literal values (examples, defaults) against the kind of value
//! the field holds. Any malformed or contradictory tag is a hard error that
//! names the field path.

use jsonreflect_core::{Annotations, PrimitiveKind};
use serde_json::Value;
use tracing::trace;

use crate::descriptor::{FieldDescriptor, TypeDescriptor, TypeKind};
use crate::error::{ReflectError, Result};

/// Tag value that hides a field when used as its name
pub const SKIP_SENTINEL: &str = "-";

/// Kind of JSON value a field holds, after peeling optional and indirect
/// wrappers
#[derive(Debug, Clone, PartialEq)]
pub enum ValueShape {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Array,
    Object,
    Enum(Vec<Value>),
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldShape {
    pub value: ValueShape,
    /// The field type is optional (`null` is accepted)
    pub nullable: bool,
}

impl FieldShape {
    #[must_use]
    pub fn of(descriptor: &TypeDescriptor) -> Self {
        let mut nullable = false;
        let mut current = descriptor.clone();
        loop {
            match &current.kind {
                TypeKind::Optional(inner) => {
                    nullable = true;
                    current = inner.resolve();
                }
                TypeKind::Indirect(inner) => current = inner.resolve(),
                _ => break,
            }
        }

        let value = match &current.kind {
            TypeKind::Primitive { kind, .. } => match kind {
                PrimitiveKind::String => ValueShape::String,
                PrimitiveKind::Integer => ValueShape::Integer,
                PrimitiveKind::Number => ValueShape::Number,
                PrimitiveKind::Boolean => ValueShape::Boolean,
                PrimitiveKind::Null => ValueShape::Null,
            },
            TypeKind::Sequence(_) => ValueShape::Array,
            TypeKind::Map { .. } | TypeKind::Struct(_) => ValueShape::Object,
            TypeKind::Enum(values) => ValueShape::Enum(values.clone()),
            TypeKind::Optional(_)
            | TypeKind::Indirect(_)
            | TypeKind::Union(_)
            | TypeKind::Any
            | TypeKind::Unsupported(_) => ValueShape::Any,
        };
        Self { value, nullable }
    }

    /// Convert a raw tag literal into a JSON value of this shape
    fn parse_literal(&self, raw: &str) -> std::result::Result<Value, String> {
        if self.nullable && raw == "null" {
            return Ok(Value::Null);
        }
        match &self.value {
            ValueShape::String => Ok(Value::String(raw.to_string())),
            ValueShape::Integer => raw
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| raw.parse::<u64>().map(Value::from))
                .map_err(|_| "expected an integer".to_string()),
            ValueShape::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| "expected a finite number".to_string()),
            ValueShape::Boolean => parse_bool(raw).map(Value::Bool),
            ValueShape::Null => {
                if raw == "null" {
                    Ok(Value::Null)
                } else {
                    Err("expected null".to_string())
                }
            }
            ValueShape::Array | ValueShape::Object => {
                let value: Value =
                    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
                self.check(&value)?;
                Ok(value)
            }
            ValueShape::Enum(_) => {
                let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw));
                self.check(&value)?;
                Ok(value)
            }
            ValueShape::Any => Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw))),
        }
    }

    /// Check an already-parsed JSON value against this shape
    fn check(&self, value: &Value) -> std::result::Result<(), String> {
        if value.is_null() && (self.nullable || self.value == ValueShape::Null) {
            return Ok(());
        }
        let ok = match &self.value {
            ValueShape::String => value.is_string(),
            ValueShape::Integer => value.is_i64() || value.is_u64(),
            ValueShape::Number => value.is_number(),
            ValueShape::Boolean => value.is_boolean(),
            ValueShape::Null => false,
            ValueShape::Array => value.is_array(),
            ValueShape::Object => value.is_object(),
            ValueShape::Enum(values) => {
                if !values.contains(value) {
                    return Err(format!("{value} is not one of {}", Value::Array(values.clone())));
                }
                true
            }
            ValueShape::Any => true,
        };
        if ok {
            Ok(())
        } else {
            Err(format!("{value} does not match the field type ({:?})", self.value))
        }
    }
}

fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err("expected `true` or `false`".to_string()),
    }
}

/// Metadata of one field, merged into the node produced for the field's type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMetadata {
    /// Property name in the schema
    pub exposed_name: String,
    pub required: bool,
    pub description: Option<String>,
    pub examples: Vec<Value>,
    pub format: Option<String>,
    pub default_value: Option<Value>,
    pub deprecated: bool,
    /// The field is left out of the object entirely
    pub skip: bool,
    /// Inline the field's named type at this use site instead of referencing it
    pub inline: bool,
    pub title: Option<String>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub read_only: bool,
    pub write_only: bool,
    pub nullable: bool,
}

impl FieldMetadata {
    /// The annotation overlay for the field's schema node
    #[must_use]
    pub fn annotations(&self) -> Annotations {
        Annotations {
            title: self.title.clone(),
            description: self.description.clone(),
            format: self.format.clone(),
            default: self.default_value.clone(),
            examples: self.examples.clone(),
            deprecated: self.deprecated,
            nullable: self.nullable,
            read_only: self.read_only,
            write_only: self.write_only,
            pattern: self.pattern.clone(),
            minimum: self.minimum,
            maximum: self.maximum,
            min_length: self.min_length,
            max_length: self.max_length,
            min_items: self.min_items,
            max_items: self.max_items,
        }
    }
}

/// Reads the declarative metadata of a single field slot
#[derive(Debug)]
pub struct TagExtractor<'a> {
    field_path: &'a str,
    shape: &'a FieldShape,
    required_from_optionality: bool,
}

impl<'a> TagExtractor<'a> {
    #[must_use]
    pub const fn new(field_path: &'a str, shape: &'a FieldShape) -> Self {
        Self {
            field_path,
            shape,
            required_from_optionality: false,
        }
    }

    /// Treat every non-optional field as required unless tagged otherwise
    #[must_use]
    pub const fn required_from_optionality(mut self, enabled: bool) -> Self {
        self.required_from_optionality = enabled;
        self
    }

    fn malformed(&self, key: &str, raw: &str, reason: impl Into<String>) -> ReflectError {
        ReflectError::malformed(self.field_path, key, raw, reason)
    }

    fn flag(&self, key: &str, raw: &str) -> Result<bool> {
        parse_bool(raw).map_err(|reason| self.malformed(key, raw, reason))
    }

    fn literal(&self, key: &str, raw: &str) -> Result<Value> {
        self.shape
            .parse_literal(raw)
            .map_err(|reason| self.malformed(key, raw, reason))
    }

    fn float(&self, key: &str, raw: &str) -> Result<f64> {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| self.malformed(key, raw, "expected a finite number"))
    }

    fn count(&self, key: &str, raw: &str) -> Result<u64> {
        raw.parse::<u64>()
            .map_err(|_| self.malformed(key, raw, "expected a non-negative integer"))
    }

    /// Parse a flag that may be repeated only with the same value
    fn marker(&self, slot: &mut Option<bool>, key: &str, raw: &str) -> Result<()> {
        let value = self.flag(key, raw)?;
        match *slot {
            Some(earlier) if earlier != value => {
                Err(self.malformed(key, raw, "conflicts with an earlier value"))
            }
            _ => {
                *slot = Some(value);
                Ok(())
            }
        }
    }

    /// Whether the field is hidden by `skip`/`hidden` or the skip sentinel name
    fn is_skipped(&self, field: &FieldDescriptor) -> Result<bool> {
        let mut sentinel = false;
        let mut skip = None;
        for (key, raw) in &field.tags {
            match key.as_ref() {
                "name" | "rename" if raw == SKIP_SENTINEL => sentinel = true,
                "skip" | "hidden" => self.marker(&mut skip, key, raw)?,
                _ => {}
            }
        }
        Ok(sentinel || skip == Some(true))
    }

    pub fn extract(&self, field: &FieldDescriptor) -> Result<FieldMetadata> {
        let mut meta = FieldMetadata {
            exposed_name: field.name.to_string(),
            ..FieldMetadata::default()
        };

        if self.is_skipped(field)? {
            meta.skip = true;
            return Ok(meta);
        }

        let mut required: Option<bool> = None;
        let mut optional: Option<bool> = None;

        for (key, raw) in &field.tags {
            let (key, raw) = (key.as_ref(), raw.as_ref());
            match key {
                "name" | "rename" => {
                    if raw.is_empty() {
                        return Err(self.malformed(key, raw, "name must not be empty"));
                    }
                    meta.exposed_name = raw.to_string();
                }
                "required" => self.marker(&mut required, key, raw)?,
                "optional" => self.marker(&mut optional, key, raw)?,
                "description" => meta.description = Some(raw.to_string()),
                "title" => meta.title = Some(raw.to_string()),
                "format" => meta.format = Some(raw.to_string()),
                "pattern" => meta.pattern = Some(raw.to_string()),
                "example" => {
                    let value = self.literal(key, raw)?;
                    meta.examples.push(value);
                }
                "examples" => {
                    let values: Vec<Value> = serde_json::from_str(raw).map_err(|e| {
                        self.malformed(key, raw, format!("expected a JSON array: {e}"))
                    })?;
                    for value in &values {
                        self.shape
                            .check(value)
                            .map_err(|reason| self.malformed(key, raw, reason))?;
                    }
                    meta.examples.extend(values);
                }
                "default" => meta.default_value = Some(self.literal(key, raw)?),
                "deprecated" => meta.deprecated = self.flag(key, raw)?,
                "inline" => meta.inline = self.flag(key, raw)?,
                "readOnly" | "read_only" => meta.read_only = self.flag(key, raw)?,
                "writeOnly" | "write_only" => meta.write_only = self.flag(key, raw)?,
                "nullable" => meta.nullable = self.flag(key, raw)?,
                "minimum" => meta.minimum = Some(self.float(key, raw)?),
                "maximum" => meta.maximum = Some(self.float(key, raw)?),
                "minLength" | "min_length" => meta.min_length = Some(self.count(key, raw)?),
                "maxLength" | "max_length" => meta.max_length = Some(self.count(key, raw)?),
                "minItems" | "min_items" => meta.min_items = Some(self.count(key, raw)?),
                "maxItems" | "max_items" => meta.max_items = Some(self.count(key, raw)?),
                "skip" | "hidden" => {}
                other => trace!(field = self.field_path, key = other, "ignoring unrecognised tag"),
            }
        }

        if required == Some(true) && optional == Some(true) {
            return Err(self.malformed("required", "true", "conflicts with `optional = true`"));
        }
        if let (Some(min), Some(max)) = (meta.minimum, meta.maximum)
            && min > max
        {
            return Err(self.malformed(
                "minimum",
                &min.to_string(),
                format!("greater than maximum {max}"),
            ));
        }
        if let (Some(min), Some(max)) = (meta.min_length, meta.max_length)
            && min > max
        {
            return Err(self.malformed(
                "minLength",
                &min.to_string(),
                format!("greater than maxLength {max}"),
            ));
        }
        if let (Some(min), Some(max)) = (meta.min_items, meta.max_items)
            && min > max
        {
            return Err(self.malformed(
                "minItems",
                &min.to_string(),
                format!("greater than maxItems {max}"),
            ));
        }

        meta.required = match required {
            Some(explicit) => explicit,
            None => {
                self.required_from_optionality && optional != Some(true) && !self.shape.nullable
            }
        };
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Reflect, TypeRef};
    use rstest::rstest;
    use serde_json::json;

    fn shape_of<T: Reflect + ?Sized + 'static>() -> FieldShape {
        FieldShape::of(&T::descriptor())
    }

    fn field<T: Reflect + ?Sized + 'static>(tags: &[(&'static str, &'static str)]) -> FieldDescriptor {
        tags.iter().fold(
            FieldDescriptor::new("prefix", TypeRef::of::<T>()),
            |field, (k, v)| field.tag(*k, *v),
        )
    }

    fn extract<T: Reflect + ?Sized + 'static>(tags: &[(&'static str, &'static str)]) -> Result<FieldMetadata> {
        let shape = shape_of::<T>();
        TagExtractor::new("My.prefix", &shape).extract(&field::<T>(tags))
    }

    #[test]
    fn copies_documentation_tags() {
        let meta = extract::<String>(&[
            ("required", "true"),
            ("example", "192.168.0.0/24"),
            ("description", "Prefix in CIDR notation"),
            ("format", "cidr"),
        ])
        .unwrap();
        assert!(meta.required);
        assert_eq!(meta.description.as_deref(), Some("Prefix in CIDR notation"));
        assert_eq!(meta.examples, vec![json!("192.168.0.0/24")]);
        assert_eq!(meta.format.as_deref(), Some("cidr"));
        assert_eq!(meta.exposed_name, "prefix");
    }

    #[rstest]
    #[case(&[("name", "-")])]
    #[case(&[("skip", "true")])]
    #[case(&[("hidden", "true"), ("example", "not validated")])]
    fn skip_markers_hide_the_field(#[case] tags: &[(&'static str, &'static str)]) {
        let meta = extract::<i32>(tags).unwrap();
        assert!(meta.skip);
    }

    #[test]
    fn repeating_a_marker_with_the_same_value_is_accepted() {
        let meta = extract::<String>(&[("required", "true"), ("required", "true")]).unwrap();
        assert!(meta.required);
    }

    #[test]
    fn explicit_required_wins_over_optionality() {
        let meta = extract::<Option<String>>(&[("required", "true")]).unwrap();
        assert!(meta.required);
    }

    #[rstest]
    #[case::default_policy(false, false)]
    #[case::optionality_policy(true, true)]
    fn untagged_required_follows_policy(#[case] from_optionality: bool, #[case] expected: bool) {
        let shape = shape_of::<String>();
        let meta = TagExtractor::new("T.f", &shape)
            .required_from_optionality(from_optionality)
            .extract(&field::<String>(&[]))
            .unwrap();
        assert_eq!(meta.required, expected);

        let shape = shape_of::<Option<String>>();
        let meta = TagExtractor::new("T.f", &shape)
            .required_from_optionality(from_optionality)
            .extract(&field::<Option<String>>(&[]))
            .unwrap();
        assert!(!meta.required);
    }

    #[rstest]
    #[case::integer_example(extract::<i64>(&[("example", "12")]), json!(12))]
    #[case::number_example(extract::<f64>(&[("example", "1.5")]), json!(1.5))]
    #[case::bool_example(extract::<bool>(&[("example", "true")]), json!(true))]
    #[case::null_for_optional(extract::<Option<i64>>(&[("example", "null")]), json!(null))]
    #[case::array_example(extract::<Vec<i64>>(&[("example", "[1, 2]")]), json!([1, 2]))]
    fn examples_are_converted_to_the_field_kind(
        #[case] meta: Result<FieldMetadata>,
        #[case] expected: Value,
    ) {
        assert_eq!(meta.unwrap().examples, vec![expected]);
    }

    #[rstest]
    #[case::integer(extract::<i32>(&[("example", "twelve")]), "example")]
    #[case::bool(extract::<bool>(&[("default", "yes")]), "default")]
    #[case::array(extract::<Vec<i32>>(&[("example", "{}")]), "example")]
    #[case::examples_element(extract::<i32>(&[("examples", "[1, \"two\"]")]), "examples")]
    #[case::examples_not_array(extract::<i32>(&[("examples", "1")]), "examples")]
    #[case::flag(extract::<i32>(&[("deprecated", "maybe")]), "deprecated")]
    #[case::conflict(extract::<i32>(&[("required", "true"), ("optional", "true")]), "required")]
    #[case::repeated_required(extract::<String>(&[("required", "true"), ("required", "false")]), "required")]
    #[case::repeated_optional(extract::<String>(&[("optional", "false"), ("optional", "true")]), "optional")]
    #[case::repeated_skip(extract::<String>(&[("skip", "true"), ("hidden", "false")]), "hidden")]
    #[case::bounds(extract::<i32>(&[("minimum", "5"), ("maximum", "1")]), "minimum")]
    #[case::length_bounds(extract::<String>(&[("minLength", "3"), ("maxLength", "2")]), "minLength")]
    #[case::item_bounds(extract::<Vec<i32>>(&[("minItems", "4"), ("maxItems", "1")]), "minItems")]
    #[case::count(extract::<String>(&[("minLength", "-1")]), "minLength")]
    #[case::empty_name(extract::<String>(&[("name", "")]), "name")]
    fn malformed_metadata_is_an_error(#[case] result: Result<FieldMetadata>, #[case] bad_key: &str) {
        match result {
            Err(ReflectError::MalformedFieldMetadata { field_path, key, .. }) => {
                assert_eq!(field_path, "My.prefix");
                assert_eq!(key, bad_key);
            }
            other => panic!("expected malformed metadata error, got {other:?}"),
        }
    }

    #[test]
    fn enum_literals_must_be_members() {
        struct Status;
        impl Reflect for Status {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::string_enum("Status", &["active", "retired"])
            }
        }

        let meta = extract::<Status>(&[("default", "active")]).unwrap();
        assert_eq!(meta.default_value, Some(json!("active")));
        assert!(extract::<Status>(&[("default", "gone")]).is_err());
    }

    #[test]
    fn constraints_and_flags_are_parsed() {
        let meta = extract::<String>(&[
            ("rename", "cidr"),
            ("minLength", "1"),
            ("max_length", "43"),
            ("pattern", "^[0-9./]+$"),
            ("readOnly", "true"),
            ("deprecated", "true"),
            ("header", "X-Ignored"),
        ])
        .unwrap();
        assert_eq!(meta.exposed_name, "cidr");
        assert_eq!((meta.min_length, meta.max_length), (Some(1), Some(43)));
        let annotations = meta.annotations();
        assert_eq!(annotations.pattern.as_deref(), Some("^[0-9./]+$"));
        assert!(annotations.read_only);
        assert!(annotations.deprecated);
    }
}
