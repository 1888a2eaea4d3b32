//! Attribute extraction for the derive.
//!
//! Doc comments, `#[serde(...)]` and `#[schema(...)]` attributes are turned
//! into raw `key = value` tags. Values are validated at reflect time, so the
//! derive only checks that keys are known and values are literals.

use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;

/// Schema keys that may be written as bare flags, e.g. `#[schema(required)]`
const FLAG_KEYS: &[&str] = &[
    "required",
    "optional",
    "deprecated",
    "skip",
    "inline",
    "read_only",
    "write_only",
    "nullable",
];

/// `#[schema(...)]` field key to the tag key understood at reflect time
fn tag_key(key: &str) -> Option<&'static str> {
    Some(match key {
        "rename" => "name",
        "required" => "required",
        "optional" => "optional",
        "description" => "description",
        "example" => "example",
        "examples" => "examples",
        "format" => "format",
        "default" => "default",
        "deprecated" => "deprecated",
        "skip" => "skip",
        "inline" => "inline",
        "title" => "title",
        "pattern" => "pattern",
        "minimum" => "minimum",
        "maximum" => "maximum",
        "min_length" => "minLength",
        "max_length" => "maxLength",
        "min_items" => "minItems",
        "max_items" => "maxItems",
        "read_only" => "readOnly",
        "write_only" => "writeOnly",
        "nullable" => "nullable",
        _ => return None,
    })
}

/// Concatenated doc comment lines, or `None` without doc comments
pub fn extract_doc_comment(attrs: &[syn::Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(syn::MetaNameValue {
                value:
                    syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(s),
                        ..
                    }),
                ..
            }) => {
                let line = s.value();
                Some(line.strip_prefix(' ').unwrap_or(&line).trim_end().to_string())
            }
            _ => None,
        })
        .collect();

    let text = lines.join("\n").trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// `r#type` -> `type`
pub fn strip_raw_prefix(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}

/// Split an identifier into lowercase words, on `_`, `-` and case changes
fn split_words(ident: &str) -> Vec<String> {
    let chars: Vec<char> = ident.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (i, &ch) in chars.iter().enumerate() {
        if ch == '_' || ch == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if ch.is_uppercase() && !current.is_empty() {
            let prev_lower = chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit();
            let next_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            // `userName` splits before `N`; `XMLParser` splits before `P`
            if prev_lower || (chars[i - 1].is_uppercase() && next_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Apply a serde `rename_all` convention to a field or variant name
pub fn rename_field(name: &str, rename_all: Option<&str>) -> String {
    let words = || split_words(name);
    match rename_all {
        Some("lowercase") => name.to_lowercase(),
        Some("UPPERCASE") => name.to_uppercase(),
        Some("camelCase") => words()
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
            .collect(),
        Some("PascalCase") => words().iter().map(|w| capitalize(w)).collect(),
        Some("snake_case") => words().join("_"),
        Some("SCREAMING_SNAKE_CASE") => words().join("_").to_uppercase(),
        Some("kebab-case") => words().join("-"),
        Some("SCREAMING-KEBAB-CASE") => words().join("-").to_uppercase(),
        _ => name.to_string(),
    }
}

/// Consume the value of a nested meta item this derive does not interpret
fn skip_value(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        content.parse::<proc_macro2::TokenStream>()?;
    }
    Ok(())
}

/// Render a literal (or negated numeric literal) as raw tag text
fn literal_text(expr: &syn::Expr) -> syn::Result<String> {
    match expr {
        syn::Expr::Lit(syn::ExprLit { lit, .. }) => match lit {
            syn::Lit::Str(s) => Ok(s.value()),
            syn::Lit::Int(i) => Ok(i.base10_digits().to_string()),
            syn::Lit::Float(f) => Ok(f.base10_digits().to_string()),
            syn::Lit::Bool(b) => Ok(b.value.to_string()),
            other => Err(syn::Error::new(other.span(), "expected a string, number or bool literal")),
        },
        syn::Expr::Unary(syn::ExprUnary {
            op: syn::UnOp::Neg(_),
            expr,
            ..
        }) => Ok(format!("-{}", literal_text(expr)?)),
        other => Err(syn::Error::new(other.span(), "expected a literal value")),
    }
}

/// Serde `rename` and `rename_all` of one attribute list
#[derive(Debug, Default, PartialEq, Eq)]
struct SerdeAttrs {
    rename: Option<String>,
    rename_all: Option<String>,
    skip: bool,
}

fn serde_attrs(attrs: &[syn::Attribute]) -> SerdeAttrs {
    let mut out = SerdeAttrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        // Malformed serde attributes are reported by serde's own derive
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                let s: syn::LitStr = meta.value()?.parse()?;
                out.rename = Some(s.value());
            } else if meta.path.is_ident("rename_all") && meta.input.peek(syn::Token![=]) {
                let s: syn::LitStr = meta.value()?.parse()?;
                out.rename_all = Some(s.value());
            } else if meta.path.is_ident("skip") {
                out.skip = true;
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        });
    }
    out
}

/// Type-level attributes
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ContainerAttrs {
    /// Declared name override
    pub name: Option<String>,
    pub rename_all: Option<String>,
    pub description: Option<String>,
}

pub fn parse_container(attrs: &[syn::Attribute]) -> syn::Result<ContainerAttrs> {
    let serde = serde_attrs(attrs);
    let mut out = ContainerAttrs {
        name: serde.rename,
        rename_all: serde.rename_all,
        description: extract_doc_comment(attrs),
    };

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("schema")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let s: syn::LitStr = meta.value()?.parse()?;
                out.name = Some(s.value());
                Ok(())
            } else if meta.path.is_ident("description") {
                let s: syn::LitStr = meta.value()?.parse()?;
                out.description = Some(s.value());
                Ok(())
            } else {
                Err(meta.error("unknown container attribute, expected `name` or `description`"))
            }
        })?;
    }
    Ok(out)
}

/// Field-level attributes as ordered raw tags. Later tags win, so doc
/// comments come first, then serde, then explicit `#[schema]` keys.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FieldAttrs {
    pub tags: Vec<(String, String)>,
}

impl FieldAttrs {
    fn push(&mut self, key: &str, value: impl Into<String>) {
        self.tags.push((key.to_string(), value.into()));
    }
}

/// Parse field or variant attributes. `ident` is the declared name and
/// `rename_all` the container's naming convention.
pub fn parse_field(
    attrs: &[syn::Attribute],
    ident: &str,
    rename_all: Option<&str>,
) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();

    if let Some(doc) = extract_doc_comment(attrs) {
        out.push("description", doc);
    }

    let serde = serde_attrs(attrs);
    let declared = strip_raw_prefix(ident);
    let exposed = serde
        .rename
        .unwrap_or_else(|| rename_field(declared, rename_all));
    if exposed != declared {
        out.push("name", exposed);
    }
    if serde.skip {
        out.push("skip", "true");
    }

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("schema")) {
        attr.parse_nested_meta(|meta| {
            let key = meta
                .path
                .get_ident()
                .map(ToString::to_string)
                .unwrap_or_default();
            let Some(tag) = tag_key(&key) else {
                return Err(meta.error(format!("unknown schema attribute `{key}`")));
            };
            if meta.input.peek(syn::Token![=]) {
                let expr: syn::Expr = meta.value()?.parse()?;
                out.push(tag, literal_text(&expr)?);
            } else if FLAG_KEYS.contains(&key.as_str()) {
                out.push(tag, "true");
            } else {
                return Err(meta.error(format!("`{key}` requires a value")));
            }
            Ok(())
        })?;
    }
    Ok(out)
}
